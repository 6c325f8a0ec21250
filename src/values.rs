// 🧱 Validated Values - small wrappers that refuse bad input
//
// Every entity setter funnels its raw input through one of these types.
// A value that exists has already been checked, so entities never hold
// a blank name or a negative price. Nothing is clamped or coerced.

use crate::error::ValueError;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// NAME (non-blank text)
// ============================================================================

/// Non-blank text (names, genres, scene names, locations)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Name(String);

impl Name {
    pub fn new(field: &'static str, text: impl Into<String>) -> Result<Self, ValueError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(ValueError::Blank { field });
        }
        Ok(Name(text))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Name {
    type Error = ValueError;

    fn try_from(text: String) -> Result<Self, Self::Error> {
        Name::new("name", text)
    }
}

impl From<Name> for String {
    fn from(name: Name) -> Self {
        name.0
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for Name {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Name {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

// ============================================================================
// PRICE (finite, >= 0)
// ============================================================================

/// Monetary amount, finite and never negative
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Price(f64);

impl Price {
    pub const ZERO: Price = Price(0.0);

    pub fn new(field: &'static str, value: f64) -> Result<Self, ValueError> {
        if !value.is_finite() {
            return Err(ValueError::NotFinite { field });
        }
        if value < 0.0 {
            return Err(ValueError::Negative { field, value });
        }
        Ok(Price(value))
    }

    /// Same as `new`, but zero is rejected too (stock unit prices)
    pub fn positive(field: &'static str, value: f64) -> Result<Self, ValueError> {
        let price = Price::new(field, value)?;
        if price.0 == 0.0 {
            return Err(ValueError::NotPositive { field, value });
        }
        Ok(price)
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for Price {
    type Error = ValueError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Price::new("price", value)
    }
}

impl From<Price> for f64 {
    fn from(price: Price) -> Self {
        price.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

// ============================================================================
// QUANTITY (integer, > 0)
// ============================================================================

/// Strictly positive count (stock capacity)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Quantity(u32);

impl Quantity {
    pub fn new(field: &'static str, value: u32) -> Result<Self, ValueError> {
        if value == 0 {
            return Err(ValueError::NotPositive {
                field,
                value: 0.0,
            });
        }
        Ok(Quantity(value))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for Quantity {
    type Error = ValueError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Quantity::new("quantity", value)
    }
}

impl From<Quantity> for u32 {
    fn from(quantity: Quantity) -> Self {
        quantity.0
    }
}

// ============================================================================
// RATE (finite, > 0)
// ============================================================================

/// Units of a stock consumed per ticket sold
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Rate(f64);

impl Rate {
    pub fn new(field: &'static str, value: f64) -> Result<Self, ValueError> {
        if !value.is_finite() {
            return Err(ValueError::NotFinite { field });
        }
        if value <= 0.0 {
            return Err(ValueError::NotPositive { field, value });
        }
        Ok(Rate(value))
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for Rate {
    type Error = ValueError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Rate::new("rate", value)
    }
}

impl From<Rate> for f64 {
    fn from(rate: Rate) -> Self {
        rate.0
    }
}

// ============================================================================
// AREA (square meters, > 0)
// ============================================================================

/// Surface in square meters
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Area(f64);

impl Area {
    pub fn new(field: &'static str, value: f64) -> Result<Self, ValueError> {
        if !value.is_finite() {
            return Err(ValueError::NotFinite { field });
        }
        if value <= 0.0 {
            return Err(ValueError::NotPositive { field, value });
        }
        Ok(Area(value))
    }

    pub fn square_meters(self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for Area {
    type Error = ValueError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Area::new("area", value)
    }
}

impl From<Area> for f64 {
    fn from(area: Area) -> Self {
        area.0
    }
}

// ============================================================================
// FIELD-LABELED DESERIALIZERS
// ============================================================================

/// `deserialize_with` targets for entity fields. The plain `TryFrom`
/// impls only know the value type; these keep the field's own label in
/// load errors and apply the same rules as the entity constructors.
pub(crate) mod labeled {
    use super::{Name, Price};
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};

    fn name<'de, D: Deserializer<'de>>(field: &'static str, deserializer: D) -> Result<Name, D::Error> {
        let text = String::deserialize(deserializer)?;
        Name::new(field, text).map_err(D::Error::custom)
    }

    pub fn festival_name<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Name, D::Error> {
        name("festival name", deserializer)
    }

    pub fn location<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Name, D::Error> {
        name("location", deserializer)
    }

    pub fn artist_name<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Name, D::Error> {
        name("artist name", deserializer)
    }

    pub fn genre<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Name, D::Error> {
        name("genre", deserializer)
    }

    pub fn scene<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Name, D::Error> {
        name("scene", deserializer)
    }

    pub fn ticket_type<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Name, D::Error> {
        name("ticket type", deserializer)
    }

    pub fn stock_name<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Name, D::Error> {
        name("stock name", deserializer)
    }

    /// Stock unit prices must be strictly positive
    pub fn stock_price<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Price, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Price::positive("stock price", value).map_err(D::Error::custom)
    }
}

// ============================================================================
// TESTS
// ============================================================================
