// 📦 Stock Entity - a consumable resource pool (cups, parking spots, ...)
//
// A "fixed" stock has a hard capacity: its quantity cannot change until it
// is unfixed, and ticket sales must never consume more than it holds.

use crate::entities::Benefit;
use crate::error::StockError;
use crate::values::{Name, Price, Quantity};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stock {
    /// Stable identity (UUID) - NEVER changes
    id: String,

    /// Unique within a festival
    #[serde(deserialize_with = "crate::values::labeled::stock_name")]
    name: Name,

    quantity: Quantity,

    /// Capacity-constrained; quantity is frozen while set
    fixed: bool,

    /// Unit price, strictly positive
    #[serde(deserialize_with = "crate::values::labeled::stock_price")]
    price: Price,

    #[serde(default)]
    benefits: Vec<Benefit>,
}

impl Stock {
    pub fn new(name: &str, quantity: u32, price: f64, fixed: bool) -> Result<Self, StockError> {
        Ok(Stock {
            id: uuid::Uuid::new_v4().to_string(),
            name: Name::new("stock name", name)?,
            quantity: Quantity::new("stock quantity", quantity)?,
            fixed,
            price: Price::positive("stock price", price)?,
            benefits: Vec::new(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn quantity(&self) -> u32 {
        self.quantity.get()
    }

    pub fn is_fixed(&self) -> bool {
        self.fixed
    }

    pub fn price(&self) -> f64 {
        self.price.value()
    }

    pub fn benefits(&self) -> &[Benefit] {
        &self.benefits
    }

    pub fn set_quantity(&mut self, quantity: u32) -> Result<(), StockError> {
        if self.fixed {
            return Err(StockError::Fixed(self.name.to_string()));
        }
        self.quantity = Quantity::new("stock quantity", quantity)?;
        Ok(())
    }

    /// Flips the fixed flag.
    ///
    /// Unfixing is always allowed. Fixing a stock that benefits draw on
    /// needs the consumption of every linked class, so it goes through
    /// `Festival::set_stock_fixed`.
    pub fn set_fixed(&mut self, fixed: bool) -> Result<(), StockError> {
        if fixed && !self.fixed && !self.benefits.is_empty() {
            return Err(StockError::Linked(self.name.to_string()));
        }
        self.fixed = fixed;
        Ok(())
    }

    /// Flag write for the festival, after it checked current consumption
    pub(crate) fn assign_fixed(&mut self, fixed: bool) {
        self.fixed = fixed;
    }

    pub fn set_price(&mut self, price: f64) -> Result<(), StockError> {
        self.price = Price::positive("stock price", price)?;
        Ok(())
    }

    pub fn set_name(&mut self, name: &str) -> Result<(), StockError> {
        self.name = Name::new("stock name", name)?;
        Ok(())
    }

    pub(crate) fn links_mut(&mut self) -> &mut Vec<Benefit> {
        &mut self.benefits
    }
}
