// 🎟️ Ticket Class Entity - a sellable kind of ticket (VIP, day pass, ...)
//
// The class owns its list of benefit links but never validates them: the
// connect/disconnect protocol lives in `Benefit`, and capacity rules that
// span several classes are checked by the festival.

use crate::entities::Benefit;
use crate::error::TicketClassError;
use crate::values::{Name, Price};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketClass {
    /// Stable identity (UUID) - NEVER changes
    id: String,

    /// Unique within a festival
    #[serde(deserialize_with = "crate::values::labeled::ticket_type")]
    type_name: Name,

    /// Tickets to sell
    quantity: u32,

    /// Unit price
    price: Price,

    #[serde(default)]
    benefits: Vec<Benefit>,
}

impl TicketClass {
    pub fn new(type_name: &str, quantity: u32, price: f64) -> Result<Self, TicketClassError> {
        Ok(TicketClass {
            id: uuid::Uuid::new_v4().to_string(),
            type_name: Name::new("ticket type", type_name)?,
            quantity,
            price: Price::new("ticket price", price)?,
            benefits: Vec::new(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn type_name(&self) -> &str {
        self.type_name.as_str()
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn price(&self) -> f64 {
        self.price.value()
    }

    /// Revenue if every ticket of this class sells
    pub fn revenue(&self) -> f64 {
        f64::from(self.quantity) * self.price.value()
    }

    pub fn benefits(&self) -> &[Benefit] {
        &self.benefits
    }

    /// Benefit drawing on the given stock, if any
    pub fn benefit_on(&self, stock_id: &str) -> Option<&Benefit> {
        self.benefits.iter().find(|b| b.stock_id() == stock_id)
    }

    /// Changes the quantity to sell.
    ///
    /// A class holding benefits cannot see the other classes drawing on the
    /// same stocks, so it only accepts a lower quantity here. Raise it
    /// through `Festival::set_ticket_quantity`.
    pub fn set_quantity(&mut self, quantity: u32) -> Result<(), TicketClassError> {
        if quantity > self.quantity && !self.benefits.is_empty() {
            return Err(TicketClassError::Linked(self.type_name.to_string()));
        }
        self.quantity = quantity;
        Ok(())
    }

    /// Quantity write for the festival, after it checked every fixed stock
    pub(crate) fn assign_quantity(&mut self, quantity: u32) {
        self.quantity = quantity;
    }

    pub fn set_price(&mut self, price: f64) -> Result<(), TicketClassError> {
        self.price = Price::new("ticket price", price)?;
        Ok(())
    }

    pub fn set_type_name(&mut self, type_name: &str) -> Result<(), TicketClassError> {
        self.type_name = Name::new("ticket type", type_name)?;
        Ok(())
    }

    pub(crate) fn links_mut(&mut self) -> &mut Vec<Benefit> {
        &mut self.benefits
    }
}
