// 🔗 Benefit - what a ticket class draws from a stock
//
// A benefit links exactly one ticket class to exactly one stock with a
// per-ticket consumption rate. Both endpoints keep a copy of the link in
// their own list; the link is identified by the (ticket class id, stock id)
// pair, so comparing benefits never walks into the endpoints' own lists.
//
// Lifecycle:
//   new()        → validated, but neither side knows about it yet
//   connect()    → registered on both sides
//   disconnect() → removed from both sides

use crate::entities::{Stock, TicketClass};
use crate::error::BenefitError;
use crate::values::Rate;
use serde::{Deserialize, Serialize};

/// Slack allowed when comparing fractional consumption to whole stock units
pub(crate) const CAPACITY_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Benefit {
    /// Id of the ticket class granting the benefit
    ticket_class: String,

    /// Id of the stock it is drawn from
    stock: String,

    /// Stock units consumed per ticket sold
    rate: Rate,
}

impl Benefit {
    /// Build a benefit without touching either side.
    ///
    /// When the stock is fixed, the class's current quantity must already
    /// fit: `rate * quantity <= stock quantity`.
    pub fn new(ticket_class: &TicketClass, stock: &Stock, rate: f64) -> Result<Self, BenefitError> {
        let rate = Rate::new("benefit rate", rate)?;
        check_capacity(ticket_class, stock, rate)?;

        Ok(Benefit {
            ticket_class: ticket_class.id().to_string(),
            stock: stock.id().to_string(),
            rate,
        })
    }

    pub fn ticket_class_id(&self) -> &str {
        &self.ticket_class
    }

    pub fn stock_id(&self) -> &str {
        &self.stock
    }

    pub fn rate(&self) -> f64 {
        self.rate.value()
    }

    /// Stock units consumed when `quantity` tickets are sold
    pub fn consumption(&self, quantity: u32) -> f64 {
        self.rate.value() * f64::from(quantity)
    }

    /// True when both benefits join the same ticket class and stock
    pub fn same_link(&self, other: &Benefit) -> bool {
        self.ticket_class == other.ticket_class && self.stock == other.stock
    }

    /// Register the benefit on both sides.
    ///
    /// Rejected when either side already holds a link for the same pair,
    /// so a second call never duplicates it.
    pub fn connect(&self, ticket_class: &mut TicketClass, stock: &mut Stock) -> Result<(), BenefitError> {
        self.check_endpoints(ticket_class, stock)?;

        let on_ticket = ticket_class.benefits().iter().any(|b| b.same_link(self));
        let on_stock = stock.benefits().iter().any(|b| b.same_link(self));
        if on_ticket || on_stock {
            return Err(BenefitError::AlreadyConnected {
                ticket_class: ticket_class.type_name().to_string(),
                stock: stock.name().to_string(),
            });
        }
        check_capacity(ticket_class, stock, self.rate)?;

        ticket_class.links_mut().push(self.clone());
        stock.links_mut().push(self.clone());
        Ok(())
    }

    /// Remove the benefit from both sides.
    ///
    /// Fails without touching anything if either side lacks it.
    pub fn disconnect(&self, ticket_class: &mut TicketClass, stock: &mut Stock) -> Result<(), BenefitError> {
        self.check_endpoints(ticket_class, stock)?;

        let on_ticket = ticket_class.benefits().iter().position(|b| b.same_link(self));
        let on_stock = stock.benefits().iter().position(|b| b.same_link(self));
        let (Some(ticket_index), Some(stock_index)) = (on_ticket, on_stock) else {
            return Err(BenefitError::NotFound {
                ticket_class: ticket_class.type_name().to_string(),
                stock: stock.name().to_string(),
            });
        };

        ticket_class.links_mut().remove(ticket_index);
        stock.links_mut().remove(stock_index);
        Ok(())
    }

    /// Change the rate, re-checking the fixed stock against the class's
    /// current quantity. Connected copies on both sides follow.
    pub fn set_rate(
        &mut self,
        ticket_class: &mut TicketClass,
        stock: &mut Stock,
        rate: f64,
    ) -> Result<(), BenefitError> {
        self.check_endpoints(ticket_class, stock)?;
        let rate = Rate::new("benefit rate", rate)?;
        check_capacity(ticket_class, stock, rate)?;

        self.rate = rate;
        for link in ticket_class.links_mut().iter_mut().filter(|b| b.same_link(self)) {
            link.rate = rate;
        }
        for link in stock.links_mut().iter_mut().filter(|b| b.same_link(self)) {
            link.rate = rate;
        }
        Ok(())
    }

    fn check_endpoints(&self, ticket_class: &TicketClass, stock: &Stock) -> Result<(), BenefitError> {
        if ticket_class.id() != self.ticket_class {
            return Err(BenefitError::WrongEndpoint {
                expected: format!("ticket class {}", self.ticket_class),
                found: format!("ticket class {}", ticket_class.id()),
            });
        }
        if stock.id() != self.stock {
            return Err(BenefitError::WrongEndpoint {
                expected: format!("stock {}", self.stock),
                found: format!("stock {}", stock.id()),
            });
        }
        Ok(())
    }
}

fn check_capacity(ticket_class: &TicketClass, stock: &Stock, rate: Rate) -> Result<(), BenefitError> {
    if !stock.is_fixed() {
        return Ok(());
    }
    let required = rate.value() * f64::from(ticket_class.quantity());
    if required > f64::from(stock.quantity()) + CAPACITY_TOLERANCE {
        return Err(BenefitError::CapacityExceeded {
            stock: stock.name().to_string(),
            required,
            capacity: stock.quantity(),
        });
    }
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> (TicketClass, Stock) {
        (
            TicketClass::new("VIP", 100, 150.0).unwrap(),
            Stock::new("Gobelet", 8000, 1.0, true).unwrap(),
        )
    }

    #[test]
    fn test_new_does_not_touch_either_side() {
        let (vip, cups) = fixture();
        let benefit = Benefit::new(&vip, &cups, 2.0).unwrap();

        assert_eq!(benefit.ticket_class_id(), vip.id());
        assert_eq!(benefit.stock_id(), cups.id());
        assert!(vip.benefits().is_empty());
        assert!(cups.benefits().is_empty());
    }

    #[test]
    fn test_new_validates_rate_and_capacity() {
        let (vip, cups) = fixture();

        assert!(matches!(Benefit::new(&vip, &cups, 0.0), Err(BenefitError::Invalid(_))));
        assert!(matches!(
            Benefit::new(&vip, &cups, 81.0),
            Err(BenefitError::CapacityExceeded { capacity: 8000, .. })
        ));
        // Exactly at capacity is allowed
        assert!(Benefit::new(&vip, &cups, 80.0).is_ok());

        // Unfixed stock has no capacity rule
        let loose = Stock::new("Bracelet", 10, 1.0, false).unwrap();
        assert!(Benefit::new(&vip, &loose, 81.0).is_ok());
    }

    #[test]
    fn test_connect_then_disconnect_restores_both_sides() {
        let (mut vip, mut cups) = fixture();
        let before_vip = vip.clone();
        let before_cups = cups.clone();

        let benefit = Benefit::new(&vip, &cups, 1.0).unwrap();
        benefit.connect(&mut vip, &mut cups).unwrap();
        assert_eq!(vip.benefits().len(), 1);
        assert_eq!(cups.benefits().len(), 1);
        assert!(vip.benefit_on(cups.id()).is_some());

        benefit.disconnect(&mut vip, &mut cups).unwrap();
        assert_eq!(vip, before_vip);
        assert_eq!(cups, before_cups);
    }

    #[test]
    fn test_connect_twice_is_rejected() {
        let (mut vip, mut cups) = fixture();
        let benefit = Benefit::new(&vip, &cups, 1.0).unwrap();
        benefit.connect(&mut vip, &mut cups).unwrap();

        assert!(matches!(
            benefit.connect(&mut vip, &mut cups),
            Err(BenefitError::AlreadyConnected { .. })
        ));

        // A second benefit on the same pair is equal by identity
        let other_rate = Benefit::new(&vip, &cups, 3.0).unwrap();
        assert!(other_rate.same_link(&benefit));
        assert!(other_rate.connect(&mut vip, &mut cups).is_err());

        assert_eq!(vip.benefits().len(), 1);
        assert_eq!(cups.benefits().len(), 1);
    }

    #[test]
    fn test_disconnect_without_connect_fails() {
        let (mut vip, mut cups) = fixture();
        let benefit = Benefit::new(&vip, &cups, 1.0).unwrap();

        assert!(matches!(
            benefit.disconnect(&mut vip, &mut cups),
            Err(BenefitError::NotFound { .. })
        ));
    }

    #[test]
    fn test_wrong_endpoint_is_rejected() {
        let (mut vip, mut cups) = fixture();
        let mut other = TicketClass::new("Non-VIP", 0, 50.0).unwrap();
        let benefit = Benefit::new(&vip, &cups, 1.0).unwrap();

        assert!(matches!(
            benefit.connect(&mut other, &mut cups),
            Err(BenefitError::WrongEndpoint { .. })
        ));
        assert!(other.benefits().is_empty());
        assert!(cups.benefits().is_empty());

        benefit.connect(&mut vip, &mut cups).unwrap();
    }

    #[test]
    fn test_set_rate_rechecks_capacity_and_updates_copies() {
        let (mut vip, mut cups) = fixture();
        let mut benefit = Benefit::new(&vip, &cups, 1.0).unwrap();
        benefit.connect(&mut vip, &mut cups).unwrap();

        // 100 tickets * 90 = 9000 > 8000
        assert!(matches!(
            benefit.set_rate(&mut vip, &mut cups, 90.0),
            Err(BenefitError::CapacityExceeded { .. })
        ));
        assert_eq!(benefit.rate(), 1.0);
        assert_eq!(vip.benefits()[0].rate(), 1.0);

        benefit.set_rate(&mut vip, &mut cups, 4.0).unwrap();
        assert_eq!(benefit.rate(), 4.0);
        assert_eq!(vip.benefits()[0].rate(), 4.0);
        assert_eq!(cups.benefits()[0].rate(), 4.0);
    }

    #[test]
    fn test_consumption() {
        let (vip, cups) = fixture();
        let benefit = Benefit::new(&vip, &cups, 1.5).unwrap();
        assert_eq!(benefit.consumption(10), 15.0);
    }
}
