// 🎪 Festival Aggregate - the root of the entity graph
//
// Every structural change goes through here. After each public call:
//   1. ticket class names and stock names are unique
//   2. no two slots on one scene overlap
//   3. for every fixed stock, Σ rate * ticket quantity <= stock quantity
//   4. a (ticket class, stock) pair is linked at most once
//   5. removed ticket classes / stocks leave no benefit behind
//
// Children are attached bare: links are made afterwards with add_benefit,
// and the festival never hands out `&mut` to an attached child.

use crate::entities::benefit::CAPACITY_TOLERANCE;
use crate::entities::{Artist, Benefit, Slot, Stock, TicketClass};
use crate::error::{
    BenefitError, FestivalError, OptimizationError, StockError, TicketClassError,
};
use crate::optimizer::{OptimizationOutcome, Optimizer};
use crate::schedule::Schedule;
use crate::solver::MicroLpSolver;
use crate::values::{Area, Name, Price, Rate};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

// ============================================================================
// PROGRAM ENTRY (wall-clock view of a slot)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgramEntry {
    pub slot_id: String,
    pub artist: String,
    pub scene: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

// ============================================================================
// FESTIVAL
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Festival {
    /// Stable identity (UUID)
    id: String,

    #[serde(deserialize_with = "crate::values::labeled::festival_name")]
    name: Name,

    /// Slot offsets are counted from here
    start: DateTime<Utc>,

    /// Rental price of the venue
    location_price: Price,

    /// Usable surface in square meters
    area: Area,

    #[serde(deserialize_with = "crate::values::labeled::location")]
    location: Name,

    #[serde(default)]
    artists: Vec<Artist>,

    #[serde(default)]
    ticket_classes: Vec<TicketClass>,

    #[serde(default)]
    stocks: Vec<Stock>,

    #[serde(default)]
    schedule: Schedule,

    /// Backing file, only known to the persistence layer
    #[serde(skip)]
    file: Option<PathBuf>,
}

// The backing file is where the festival lives, not part of it: a loaded
// copy equals the festival that was saved.
impl PartialEq for Festival {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.name == other.name
            && self.start == other.start
            && self.location_price == other.location_price
            && self.area == other.area
            && self.location == other.location
            && self.artists == other.artists
            && self.ticket_classes == other.ticket_classes
            && self.stocks == other.stocks
            && self.schedule == other.schedule
    }
}

/// Units of `stock` consumed when each linked ticket class sells
/// `quantity_of(class)` tickets
pub(crate) fn stock_load<F>(stock: &Stock, ticket_classes: &[TicketClass], quantity_of: F) -> f64
where
    F: Fn(&TicketClass) -> u32,
{
    stock
        .benefits()
        .iter()
        .filter_map(|benefit| {
            ticket_classes
                .iter()
                .find(|t| t.id() == benefit.ticket_class_id())
                .map(|t| benefit.consumption(quantity_of(t)))
        })
        .sum()
}

pub(crate) fn exceeds(load: f64, capacity: u32) -> bool {
    load > f64::from(capacity) + CAPACITY_TOLERANCE
}

impl Festival {
    /// Create an empty festival. The start must not be in the past.
    pub fn new(
        name: &str,
        start: DateTime<Utc>,
        location_price: f64,
        area: f64,
        location: &str,
    ) -> Result<Self, FestivalError> {
        check_start(start)?;

        Ok(Festival {
            id: uuid::Uuid::new_v4().to_string(),
            name: Name::new("festival name", name)?,
            start,
            location_price: Price::new("location price", location_price)?,
            area: Area::new("area", area)?,
            location: Name::new("location", location)?,
            artists: Vec::new(),
            ticket_classes: Vec::new(),
            stocks: Vec::new(),
            schedule: Schedule::new(),
            file: None,
        })
    }

    // ========================================================================
    // FIELDS
    // ========================================================================

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn location_price(&self) -> f64 {
        self.location_price.value()
    }

    pub fn area(&self) -> f64 {
        self.area.square_meters()
    }

    pub fn location(&self) -> &str {
        self.location.as_str()
    }

    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    pub(crate) fn set_file(&mut self, path: PathBuf) {
        self.file = Some(path);
    }

    pub fn set_name(&mut self, name: &str) -> Result<(), FestivalError> {
        self.name = Name::new("festival name", name)?;
        Ok(())
    }

    pub fn set_start(&mut self, start: DateTime<Utc>) -> Result<(), FestivalError> {
        check_start(start)?;
        self.start = start;
        Ok(())
    }

    pub fn set_location_price(&mut self, price: f64) -> Result<(), FestivalError> {
        self.location_price = Price::new("location price", price)?;
        Ok(())
    }

    pub fn set_area(&mut self, area: f64) -> Result<(), FestivalError> {
        self.area = Area::new("area", area)?;
        Ok(())
    }

    pub fn set_location_name(&mut self, location: &str) -> Result<(), FestivalError> {
        self.location = Name::new("location", location)?;
        Ok(())
    }

    // ========================================================================
    // LOOKUPS
    // ========================================================================

    pub fn artists(&self) -> &[Artist] {
        &self.artists
    }

    pub fn ticket_classes(&self) -> &[TicketClass] {
        &self.ticket_classes
    }

    pub fn stocks(&self) -> &[Stock] {
        &self.stocks
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    pub fn artist(&self, artist_id: &str) -> Option<&Artist> {
        self.artists.iter().find(|a| a.id() == artist_id)
    }

    /// First artist with this name (artist names need not be unique)
    pub fn artist_by_name(&self, name: &str) -> Option<&Artist> {
        self.artists.iter().find(|a| a.name() == name)
    }

    pub fn ticket_class(&self, type_name: &str) -> Option<&TicketClass> {
        self.ticket_classes.iter().find(|t| t.type_name() == type_name)
    }

    pub fn stock(&self, name: &str) -> Option<&Stock> {
        self.stocks.iter().find(|s| s.name() == name)
    }

    pub fn slot(&self, slot_id: &str) -> Option<&Slot> {
        self.schedule.get(slot_id)
    }

    pub(crate) fn ticket_class_by_id(&self, id: &str) -> Option<&TicketClass> {
        self.ticket_classes.iter().find(|t| t.id() == id)
    }

    pub(crate) fn stock_by_id(&self, id: &str) -> Option<&Stock> {
        self.stocks.iter().find(|s| s.id() == id)
    }

    fn ticket_index(&self, type_name: &str) -> Result<usize, TicketClassError> {
        self.ticket_classes
            .iter()
            .position(|t| t.type_name() == type_name)
            .ok_or_else(|| TicketClassError::NotFound(type_name.to_string()))
    }

    fn stock_index(&self, name: &str) -> Result<usize, StockError> {
        self.stocks
            .iter()
            .position(|s| s.name() == name)
            .ok_or_else(|| StockError::NotFound(name.to_string()))
    }

    fn artist_index(&self, artist_id: &str) -> Result<usize, FestivalError> {
        self.artists
            .iter()
            .position(|a| a.id() == artist_id)
            .ok_or_else(|| FestivalError::ArtistNotFound(artist_id.to_string()))
    }

    /// Current consumption of a stock across every linked ticket class
    pub fn stock_load(&self, stock: &Stock) -> f64 {
        stock_load(stock, &self.ticket_classes, TicketClass::quantity)
    }

    /// Slots with absolute start and end times, in start order.
    /// Slots whose times fall past the last representable instant are left out.
    pub fn program(&self) -> Vec<ProgramEntry> {
        self.schedule
            .iter()
            .filter_map(|slot| {
                let at = |minutes: i64| self.start.checked_add_signed(Duration::minutes(minutes));
                let starts_at = at(i64::from(slot.start_offset()));
                let ends_at = i64::try_from(slot.end_offset()).ok().and_then(at);
                let (Some(starts_at), Some(ends_at)) = (starts_at, ends_at) else {
                    warn!("Slot {} ends past the last representable instant", slot.id());
                    return None;
                };

                Some(ProgramEntry {
                    slot_id: slot.id().to_string(),
                    artist: self
                        .artist(slot.artist_id())
                        .map(|a| a.name().to_string())
                        .unwrap_or_default(),
                    scene: slot.scene().to_string(),
                    starts_at,
                    ends_at,
                })
            })
            .collect()
    }

    // ========================================================================
    // ARTISTS & SLOTS
    // ========================================================================

    pub fn add_artist(&mut self, artist: Artist) -> Result<(), FestivalError> {
        if self.artists.iter().any(|a| a.id() == artist.id()) {
            warn!("Rejected artist {}: already attached", artist.name());
            return Err(FestivalError::DuplicateArtist(artist.name().to_string()));
        }
        if let Some(slot_id) = artist.slots().first() {
            return Err(FestivalError::DetachedLink {
                entity: format!("artist {}", artist.name()),
                counterpart: format!("slot {}", slot_id),
            });
        }

        debug!("Artist {} added to {}", artist.name(), self.name);
        self.artists.push(artist);
        Ok(())
    }

    /// Remove an artist together with every slot it performs in
    pub fn remove_artist(&mut self, artist_id: &str) -> Result<Artist, FestivalError> {
        let index = self.artist_index(artist_id)?;

        let slot_ids = self.artists[index].slots().to_vec();
        if let Some(missing) = slot_ids.iter().find(|id| !self.schedule.contains(id)) {
            return Err(FestivalError::Integrity(format!(
                "artist {} lists unscheduled slot {}",
                self.artists[index].name(),
                missing
            )));
        }
        for slot_id in &slot_ids {
            self.schedule.remove(slot_id)?;
            self.artists[index].detach_slot(slot_id)?;
        }

        let artist = self.artists.remove(index);
        debug!(
            "Artist {} removed with {} slot(s)",
            artist.name(),
            slot_ids.len()
        );
        Ok(artist)
    }

    /// Schedule a slot; its artist must already be attached
    pub fn add_slot(&mut self, slot: Slot) -> Result<(), FestivalError> {
        let index = self.artist_index(slot.artist_id())?;
        let slot_id = slot.id().to_string();
        if self.artists[index].performs_in(&slot_id) {
            return Err(crate::error::ArtistError::SlotAlreadyListed(slot_id).into());
        }

        if let Err(err) = self.schedule.insert(slot) {
            warn!("Rejected slot {}: {}", slot_id, err);
            return Err(err.into());
        }
        self.artists[index].attach_slot(&slot_id)?;

        debug!("Slot {} scheduled for {}", slot_id, self.artists[index].name());
        Ok(())
    }

    pub fn remove_slot(&mut self, slot_id: &str) -> Result<Slot, FestivalError> {
        let artist_id = self
            .schedule
            .get(slot_id)
            .map(|s| s.artist_id().to_string())
            .ok_or_else(|| crate::error::SlotError::NotScheduled(slot_id.to_string()))?;
        let index = self.artist_index(&artist_id)?;
        if !self.artists[index].performs_in(slot_id) {
            return Err(FestivalError::Integrity(format!(
                "slot {} is not listed by its artist",
                slot_id
            )));
        }

        let slot = self.schedule.remove(slot_id)?;
        self.artists[index].detach_slot(slot_id)?;
        debug!("Slot {} removed", slot_id);
        Ok(slot)
    }

    // ========================================================================
    // TICKET CLASSES
    // ========================================================================

    pub fn add_ticket_class(&mut self, ticket_class: TicketClass) -> Result<(), FestivalError> {
        let clash = self
            .ticket_classes
            .iter()
            .any(|t| t.type_name() == ticket_class.type_name() || t.id() == ticket_class.id());
        if clash {
            warn!("Rejected ticket class {}: name taken", ticket_class.type_name());
            return Err(TicketClassError::Duplicate(ticket_class.type_name().to_string()).into());
        }
        if let Some(link) = ticket_class.benefits().first() {
            return Err(FestivalError::DetachedLink {
                entity: format!("ticket class {}", ticket_class.type_name()),
                counterpart: format!("stock {}", link.stock_id()),
            });
        }

        debug!("Ticket class {} added", ticket_class.type_name());
        self.ticket_classes.push(ticket_class);
        Ok(())
    }

    /// Disconnect every benefit of the class, then remove it
    pub fn remove_ticket_class(&mut self, type_name: &str) -> Result<TicketClass, FestivalError> {
        let ti = self.ticket_index(type_name)?;

        // Work on a snapshot: disconnect() edits the live list
        let links: Vec<Benefit> = self.ticket_classes[ti].benefits().to_vec();
        let mut pairs = Vec::with_capacity(links.len());
        for link in &links {
            let si = self
                .stocks
                .iter()
                .position(|s| s.id() == link.stock_id())
                .ok_or_else(|| {
                    FestivalError::Integrity(format!(
                        "ticket class {} links unknown stock {}",
                        type_name,
                        link.stock_id()
                    ))
                })?;
            pairs.push((link, si));
        }
        for (link, si) in pairs {
            link.disconnect(&mut self.ticket_classes[ti], &mut self.stocks[si])?;
        }

        let removed = self.ticket_classes.remove(ti);
        debug!(
            "Ticket class {} removed ({} benefit(s) disconnected)",
            type_name,
            links.len()
        );
        Ok(removed)
    }

    pub fn rename_ticket_class(&mut self, type_name: &str, new_name: &str) -> Result<(), FestivalError> {
        let ti = self.ticket_index(type_name)?;
        let taken = self
            .ticket_classes
            .iter()
            .enumerate()
            .any(|(i, t)| i != ti && t.type_name() == new_name);
        if taken {
            return Err(TicketClassError::Duplicate(new_name.to_string()).into());
        }
        self.ticket_classes[ti].set_type_name(new_name)?;
        Ok(())
    }

    pub fn set_ticket_price(&mut self, type_name: &str, price: f64) -> Result<(), FestivalError> {
        let ti = self.ticket_index(type_name)?;
        self.ticket_classes[ti].set_price(price)?;
        Ok(())
    }

    /// Change how many tickets of a class are sold, re-checking every
    /// fixed stock the class draws from
    pub fn set_ticket_quantity(&mut self, type_name: &str, quantity: u32) -> Result<(), FestivalError> {
        let ti = self.ticket_index(type_name)?;
        let ticket = &self.ticket_classes[ti];

        for link in ticket.benefits() {
            let Some(stock) = self.stock_by_id(link.stock_id()) else {
                continue;
            };
            if !stock.is_fixed() {
                continue;
            }
            let load = stock_load(stock, &self.ticket_classes, |t| {
                if t.id() == ticket.id() {
                    quantity
                } else {
                    t.quantity()
                }
            });
            if exceeds(load, stock.quantity()) {
                warn!(
                    "Rejected {} x {}: {} would need {} of {}",
                    quantity,
                    type_name,
                    stock.name(),
                    load,
                    stock.quantity()
                );
                return Err(TicketClassError::CapacityExceeded {
                    type_name: type_name.to_string(),
                    quantity,
                    stock: stock.name().to_string(),
                    load,
                    capacity: stock.quantity(),
                }
                .into());
            }
        }

        self.ticket_classes[ti].assign_quantity(quantity);
        debug!("Ticket class {} quantity set to {}", type_name, quantity);
        Ok(())
    }

    // ========================================================================
    // STOCKS
    // ========================================================================

    pub fn add_stock(&mut self, stock: Stock) -> Result<(), FestivalError> {
        let clash = self
            .stocks
            .iter()
            .any(|s| s.name() == stock.name() || s.id() == stock.id());
        if clash {
            warn!("Rejected stock {}: name taken", stock.name());
            return Err(StockError::Duplicate(stock.name().to_string()).into());
        }
        if let Some(link) = stock.benefits().first() {
            return Err(FestivalError::DetachedLink {
                entity: format!("stock {}", stock.name()),
                counterpart: format!("ticket class {}", link.ticket_class_id()),
            });
        }

        debug!("Stock {} added", stock.name());
        self.stocks.push(stock);
        Ok(())
    }

    /// Disconnect every benefit drawing on the stock, then remove it
    pub fn remove_stock(&mut self, name: &str) -> Result<Stock, FestivalError> {
        let si = self.stock_index(name)?;

        let links: Vec<Benefit> = self.stocks[si].benefits().to_vec();
        let mut pairs = Vec::with_capacity(links.len());
        for link in &links {
            let ti = self
                .ticket_classes
                .iter()
                .position(|t| t.id() == link.ticket_class_id())
                .ok_or_else(|| {
                    FestivalError::Integrity(format!(
                        "stock {} links unknown ticket class {}",
                        name,
                        link.ticket_class_id()
                    ))
                })?;
            pairs.push((link, ti));
        }
        for (link, ti) in pairs {
            link.disconnect(&mut self.ticket_classes[ti], &mut self.stocks[si])?;
        }

        let removed = self.stocks.remove(si);
        debug!(
            "Stock {} removed ({} benefit(s) disconnected)",
            name,
            links.len()
        );
        Ok(removed)
    }

    pub fn rename_stock(&mut self, name: &str, new_name: &str) -> Result<(), FestivalError> {
        let si = self.stock_index(name)?;
        let taken = self
            .stocks
            .iter()
            .enumerate()
            .any(|(i, s)| i != si && s.name() == new_name);
        if taken {
            return Err(StockError::Duplicate(new_name.to_string()).into());
        }
        self.stocks[si].set_name(new_name)?;
        Ok(())
    }

    pub fn set_stock_price(&mut self, name: &str, price: f64) -> Result<(), FestivalError> {
        let si = self.stock_index(name)?;
        self.stocks[si].set_price(price)?;
        Ok(())
    }

    /// Rejected while the stock is fixed
    pub fn set_stock_quantity(&mut self, name: &str, quantity: u32) -> Result<(), FestivalError> {
        let si = self.stock_index(name)?;
        self.stocks[si].set_quantity(quantity)?;
        debug!("Stock {} quantity set to {}", name, quantity);
        Ok(())
    }

    /// Fixing a stock requires current consumption to fit its quantity
    pub fn set_stock_fixed(&mut self, name: &str, fixed: bool) -> Result<(), FestivalError> {
        let si = self.stock_index(name)?;
        let stock = &self.stocks[si];

        if fixed && !stock.is_fixed() {
            let load = self.stock_load(stock);
            if exceeds(load, stock.quantity()) {
                warn!("Cannot fix {}: {} consumed, {} held", name, load, stock.quantity());
                return Err(StockError::CapacityExceeded {
                    stock: name.to_string(),
                    load,
                    capacity: stock.quantity(),
                }
                .into());
            }
        }

        self.stocks[si].assign_fixed(fixed);
        debug!("Stock {} fixed = {}", name, fixed);
        Ok(())
    }

    // ========================================================================
    // BENEFITS
    // ========================================================================

    /// Link a ticket class to a stock at `rate` units per ticket
    pub fn add_benefit(&mut self, type_name: &str, stock_name: &str, rate: f64) -> Result<(), FestivalError> {
        let ti = self.ticket_index(type_name)?;
        let si = self.stock_index(stock_name)?;
        let ticket = &self.ticket_classes[ti];
        let stock = &self.stocks[si];

        if ticket.benefit_on(stock.id()).is_some() {
            return Err(BenefitError::AlreadyConnected {
                ticket_class: type_name.to_string(),
                stock: stock_name.to_string(),
            }
            .into());
        }
        let benefit = Benefit::new(ticket, stock, rate)?;

        if stock.is_fixed() {
            let load = self.stock_load(stock) + benefit.consumption(ticket.quantity());
            if exceeds(load, stock.quantity()) {
                return Err(BenefitError::CapacityExceeded {
                    stock: stock_name.to_string(),
                    required: load,
                    capacity: stock.quantity(),
                }
                .into());
            }
        }

        benefit.connect(&mut self.ticket_classes[ti], &mut self.stocks[si])?;
        debug!("Benefit {} -> {} at {} per ticket", type_name, stock_name, rate);
        Ok(())
    }

    pub fn remove_benefit(&mut self, type_name: &str, stock_name: &str) -> Result<Benefit, FestivalError> {
        let ti = self.ticket_index(type_name)?;
        let si = self.stock_index(stock_name)?;

        let benefit = self.ticket_classes[ti]
            .benefit_on(self.stocks[si].id())
            .cloned()
            .ok_or_else(|| BenefitError::NotFound {
                ticket_class: type_name.to_string(),
                stock: stock_name.to_string(),
            })?;
        benefit.disconnect(&mut self.ticket_classes[ti], &mut self.stocks[si])?;

        debug!("Benefit {} -> {} removed", type_name, stock_name);
        Ok(benefit)
    }

    pub fn set_benefit_rate(&mut self, type_name: &str, stock_name: &str, rate: f64) -> Result<(), FestivalError> {
        let ti = self.ticket_index(type_name)?;
        let si = self.stock_index(stock_name)?;
        let ticket = &self.ticket_classes[ti];
        let stock = &self.stocks[si];

        let mut benefit = ticket
            .benefit_on(stock.id())
            .cloned()
            .ok_or_else(|| BenefitError::NotFound {
                ticket_class: type_name.to_string(),
                stock: stock_name.to_string(),
            })?;
        let new_rate = Rate::new("benefit rate", rate).map_err(BenefitError::from)?;

        if stock.is_fixed() {
            let quantity = f64::from(ticket.quantity());
            let load = self.stock_load(stock) - benefit.rate() * quantity + new_rate.value() * quantity;
            if exceeds(load, stock.quantity()) {
                return Err(BenefitError::CapacityExceeded {
                    stock: stock_name.to_string(),
                    required: load,
                    capacity: stock.quantity(),
                }
                .into());
            }
        }

        benefit.set_rate(&mut self.ticket_classes[ti], &mut self.stocks[si], rate)?;
        debug!("Benefit {} -> {} rate set to {}", type_name, stock_name, rate);
        Ok(())
    }

    // ========================================================================
    // OPTIMIZATION
    // ========================================================================

    /// Revenue-maximizing ticket quantities with the default configuration
    pub fn optimize(&mut self) -> Result<OptimizationOutcome, OptimizationError> {
        Optimizer::<MicroLpSolver>::default().optimize(self)
    }

    /// Write a plan the optimizer checked as a whole against every fixed
    /// stock. Classes are written one at a time, so per-class checks would
    /// reject a valid plan midway when one class rises while another falls.
    pub(crate) fn commit_quantities(&mut self, plan: &[(String, u32)]) {
        for (id, quantity) in plan {
            if let Some(ticket) = self.ticket_classes.iter_mut().find(|t| t.id() == id) {
                ticket.assign_quantity(*quantity);
            }
        }
    }

    // ========================================================================
    // INTEGRITY
    // ========================================================================

    /// Re-check every cross-entity invariant on the whole aggregate.
    ///
    /// Mutations keep these true on their own; this is for aggregates that
    /// were built elsewhere, e.g. deserialized from disk.
    pub fn validate(&self) -> Result<(), FestivalError> {
        let integrity = |msg: String| Err(FestivalError::Integrity(msg));

        let mut seen = HashSet::new();
        for artist in &self.artists {
            if !seen.insert(artist.id()) {
                return integrity(format!("artist {} appears twice", artist.name()));
            }
            for slot_id in artist.slots() {
                match self.schedule.get(slot_id) {
                    Some(slot) if slot.artist_id() == artist.id() => {}
                    _ => {
                        return integrity(format!(
                            "artist {} lists slot {} which is not scheduled for it",
                            artist.name(),
                            slot_id
                        ))
                    }
                }
            }
        }
        for slot in self.schedule.iter() {
            let listed = self
                .artist(slot.artist_id())
                .map(|a| a.performs_in(slot.id()))
                .unwrap_or(false);
            if !listed {
                return integrity(format!("slot {} has no attached artist", slot.id()));
            }
        }

        let mut names = HashSet::new();
        let mut ids = HashSet::new();
        for ticket in &self.ticket_classes {
            if !names.insert(ticket.type_name()) || !ids.insert(ticket.id()) {
                return integrity(format!("ticket class {} appears twice", ticket.type_name()));
            }
        }
        names.clear();
        ids.clear();
        for stock in &self.stocks {
            if !names.insert(stock.name()) || !ids.insert(stock.id()) {
                return integrity(format!("stock {} appears twice", stock.name()));
            }
        }

        for ticket in &self.ticket_classes {
            let mut linked = HashSet::new();
            for link in ticket.benefits() {
                if link.ticket_class_id() != ticket.id() || !linked.insert(link.stock_id()) {
                    return integrity(format!("ticket class {} holds a foreign or repeated benefit", ticket.type_name()));
                }
                let mirrored = self
                    .stock_by_id(link.stock_id())
                    .map(|s| s.benefits().contains(link))
                    .unwrap_or(false);
                if !mirrored {
                    return integrity(format!("benefit of {} is missing on its stock", ticket.type_name()));
                }
            }
        }
        for stock in &self.stocks {
            let mut linked = HashSet::new();
            for link in stock.benefits() {
                if link.stock_id() != stock.id() || !linked.insert(link.ticket_class_id()) {
                    return integrity(format!("stock {} holds a foreign or repeated benefit", stock.name()));
                }
                let mirrored = self
                    .ticket_class_by_id(link.ticket_class_id())
                    .map(|t| t.benefits().contains(link))
                    .unwrap_or(false);
                if !mirrored {
                    return integrity(format!("benefit on {} is missing on its ticket class", stock.name()));
                }
            }
            if stock.is_fixed() {
                let load = self.stock_load(stock);
                if exceeds(load, stock.quantity()) {
                    return Err(StockError::CapacityExceeded {
                        stock: stock.name().to_string(),
                        load,
                        capacity: stock.quantity(),
                    }
                    .into());
                }
            }
        }

        Ok(())
    }
}

fn check_start(start: DateTime<Utc>) -> Result<(), FestivalError> {
    if start < Utc::now() {
        return Err(FestivalError::StartInPast(start));
    }
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ArtistError, SlotError};

    const H: u32 = 60;

    fn festival() -> Festival {
        Festival::new(
            "Solidays",
            Utc::now() + Duration::days(1),
            100.0,
            500.0,
            "Hippodrome de Longchamp",
        )
        .unwrap()
    }

    /// VIP and Non-VIP drawing on two fixed stocks
    fn stocked_festival() -> Festival {
        let mut f = festival();
        f.add_ticket_class(TicketClass::new("VIP", 0, 150.0).unwrap()).unwrap();
        f.add_ticket_class(TicketClass::new("Non-VIP", 0, 60.0).unwrap()).unwrap();
        f.add_stock(Stock::new("Gobelet", 8000, 1.0, true).unwrap()).unwrap();
        f.add_stock(Stock::new("Parking", 3000, 5.0, true).unwrap()).unwrap();
        f.add_benefit("VIP", "Gobelet", 1.0).unwrap();
        f.add_benefit("VIP", "Parking", 1.0).unwrap();
        f.add_benefit("Non-VIP", "Gobelet", 2.0).unwrap();
        f
    }

    #[test]
    fn test_festival_creation_validates_fields() {
        let tomorrow = Utc::now() + Duration::days(1);
        assert!(Festival::new("", tomorrow, 100.0, 500.0, "Paris").is_err());
        assert!(Festival::new("Fest", tomorrow, -1.0, 500.0, "Paris").is_err());
        assert!(Festival::new("Fest", tomorrow, 100.0, 0.0, "Paris").is_err());
        assert!(Festival::new("Fest", tomorrow, 100.0, 500.0, " ").is_err());
        assert!(matches!(
            Festival::new("Fest", Utc::now() - Duration::days(1), 100.0, 500.0, "Paris"),
            Err(FestivalError::StartInPast(_))
        ));
    }

    #[test]
    fn test_failed_field_setters_leave_festival_unchanged() {
        let mut f = festival();
        let before = f.clone();

        assert!(f.set_start(Utc::now() - Duration::hours(1)).is_err());
        assert!(f.set_area(-3.0).is_err());
        assert!(f.set_location_price(f64::NAN).is_err());
        assert!(f.set_name("").is_err());
        assert!(f.set_location_name("").is_err());
        assert_eq!(f, before);

        f.set_area(14000.0).unwrap();
        assert_eq!(f.area(), 14000.0);
    }

    #[test]
    fn test_ticket_class_names_are_unique() {
        let mut f = festival();
        f.add_ticket_class(TicketClass::new("VIP", 0, 150.0).unwrap()).unwrap();

        let err = f
            .add_ticket_class(TicketClass::new("VIP", 10, 99.0).unwrap())
            .unwrap_err();
        assert!(matches!(
            err,
            FestivalError::TicketClass(TicketClassError::Duplicate(ref name)) if name == "VIP"
        ));
        assert_eq!(f.ticket_classes().len(), 1);

        f.add_ticket_class(TicketClass::new("Non-VIP", 0, 60.0).unwrap()).unwrap();
        assert!(f.rename_ticket_class("Non-VIP", "VIP").is_err());
        f.rename_ticket_class("Non-VIP", "Standard").unwrap();
        assert!(f.ticket_class("Standard").is_some());
    }

    #[test]
    fn test_stock_names_are_unique() {
        let mut f = festival();
        f.add_stock(Stock::new("Gobelet", 8000, 1.0, true).unwrap()).unwrap();

        assert!(matches!(
            f.add_stock(Stock::new("Gobelet", 10, 1.0, false).unwrap()),
            Err(FestivalError::Stock(StockError::Duplicate(_)))
        ));
        assert_eq!(f.stocks().len(), 1);
    }

    #[test]
    fn test_linked_children_cannot_be_attached_directly() {
        let mut f = festival();
        let mut vip = TicketClass::new("VIP", 0, 150.0).unwrap();
        let mut cups = Stock::new("Gobelet", 8000, 1.0, false).unwrap();
        Benefit::new(&vip, &cups, 1.0)
            .unwrap()
            .connect(&mut vip, &mut cups)
            .unwrap();

        assert!(matches!(
            f.add_ticket_class(vip),
            Err(FestivalError::DetachedLink { .. })
        ));
        assert!(matches!(
            f.add_stock(cups),
            Err(FestivalError::DetachedLink { .. })
        ));
    }

    #[test]
    fn test_add_benefit_checks_summed_capacity() {
        let mut f = festival();
        f.add_ticket_class(TicketClass::new("VIP", 3000, 150.0).unwrap()).unwrap();
        f.add_ticket_class(TicketClass::new("Non-VIP", 2000, 60.0).unwrap()).unwrap();
        f.add_stock(Stock::new("Gobelet", 8000, 1.0, true).unwrap()).unwrap();

        f.add_benefit("VIP", "Gobelet", 2.0).unwrap(); // 6000
        // Each link fits on its own (2000 * 1.5 = 3000) but not on top of VIP
        assert!(matches!(
            f.add_benefit("Non-VIP", "Gobelet", 1.5),
            Err(FestivalError::Benefit(BenefitError::CapacityExceeded { .. }))
        ));
        f.add_benefit("Non-VIP", "Gobelet", 1.0).unwrap(); // 8000
        assert_eq!(f.stock_load(f.stock("Gobelet").unwrap()), 8000.0);

        assert!(matches!(
            f.add_benefit("VIP", "Gobelet", 0.5),
            Err(FestivalError::Benefit(BenefitError::AlreadyConnected { .. }))
        ));
    }

    #[test]
    fn test_fixed_stock_capacity_on_quantity_changes() {
        let mut f = stocked_festival();

        f.set_ticket_quantity("VIP", 3000).unwrap(); // 3000 cups, 3000 parking
        f.set_ticket_quantity("Non-VIP", 2500).unwrap(); // +5000 cups = 8000

        let before = f.clone();
        assert!(matches!(
            f.set_ticket_quantity("Non-VIP", 2501),
            Err(FestivalError::TicketClass(TicketClassError::CapacityExceeded { .. }))
        ));
        assert!(f.set_ticket_quantity("VIP", 3001).is_err());
        assert_eq!(f, before);

        for stock in f.stocks() {
            assert!(f.stock_load(stock) <= f64::from(stock.quantity()));
        }
    }

    #[test]
    fn test_fixed_stock_quantity_and_flag() {
        let mut f = stocked_festival();
        f.set_ticket_quantity("VIP", 1000).unwrap();

        assert!(matches!(
            f.set_stock_quantity("Parking", 500),
            Err(FestivalError::Stock(StockError::Fixed(_)))
        ));

        f.set_stock_fixed("Parking", false).unwrap();
        f.set_stock_quantity("Parking", 500).unwrap();
        // 1000 VIP tickets need 1000 parking spots
        assert!(matches!(
            f.set_stock_fixed("Parking", true),
            Err(FestivalError::Stock(StockError::CapacityExceeded { .. }))
        ));
        assert!(!f.stock("Parking").unwrap().is_fixed());

        f.set_stock_quantity("Parking", 1000).unwrap();
        f.set_stock_fixed("Parking", true).unwrap();
    }

    #[test]
    fn test_benefit_rate_change_rechecks_capacity() {
        let mut f = stocked_festival();
        f.set_ticket_quantity("VIP", 2000).unwrap();
        f.set_ticket_quantity("Non-VIP", 2000).unwrap(); // 2000 + 4000 cups

        assert!(f.set_benefit_rate("VIP", "Gobelet", 2.5).is_err()); // 5000 + 4000
        assert!(f.set_benefit_rate("VIP", "Gobelet", -1.0).is_err());
        f.set_benefit_rate("VIP", "Gobelet", 2.0).unwrap(); // 4000 + 4000

        let vip = f.ticket_class("VIP").unwrap();
        let cups = f.stock("Gobelet").unwrap();
        assert_eq!(vip.benefit_on(cups.id()).unwrap().rate(), 2.0);
        assert!(cups.benefits().iter().any(|b| b.rate() == 2.0));
        f.validate().unwrap();
    }

    #[test]
    fn test_removing_stock_disconnects_every_benefit() {
        let mut f = stocked_festival();
        let cups_id = f.stock("Gobelet").unwrap().id().to_string();
        assert_eq!(f.stock("Gobelet").unwrap().benefits().len(), 2);

        let removed = f.remove_stock("Gobelet").unwrap();
        assert!(removed.benefits().is_empty());
        for ticket in f.ticket_classes() {
            assert!(ticket.benefit_on(&cups_id).is_none());
        }
        // Parking link untouched
        assert_eq!(f.ticket_class("VIP").unwrap().benefits().len(), 1);

        assert!(matches!(
            f.remove_stock("Gobelet"),
            Err(FestivalError::Stock(StockError::NotFound(_)))
        ));
        f.validate().unwrap();
    }

    #[test]
    fn test_removing_ticket_class_disconnects_every_benefit() {
        let mut f = stocked_festival();

        let removed = f.remove_ticket_class("VIP").unwrap();
        assert!(removed.benefits().is_empty());
        assert!(f.stock("Parking").unwrap().benefits().is_empty());
        assert_eq!(f.stock("Gobelet").unwrap().benefits().len(), 1);
        assert!(f.remove_ticket_class("VIP").is_err());
        f.validate().unwrap();
    }

    #[test]
    fn test_remove_benefit() {
        let mut f = stocked_festival();
        let removed = f.remove_benefit("VIP", "Parking").unwrap();
        assert_eq!(removed.rate(), 1.0);
        assert!(f.stock("Parking").unwrap().benefits().is_empty());
        assert!(matches!(
            f.remove_benefit("VIP", "Parking"),
            Err(FestivalError::Benefit(BenefitError::NotFound { .. }))
        ));
    }

    #[test]
    fn test_slot_collision_scenario() {
        let mut f = festival();
        let artist = Artist::new("Orelsan", "Rap", 15000.0).unwrap();
        let artist_ref = artist.clone();
        f.add_artist(artist).unwrap();

        f.add_slot(Slot::new(&artist_ref, 16 * H, 120, "Main").unwrap()).unwrap();
        // 14h-15h overlaps nothing yet
        f.add_slot(Slot::new(&artist_ref, 14 * H, 60, "Main").unwrap()).unwrap();
        // 13h-15h overlaps 14h-15h
        assert!(matches!(
            f.add_slot(Slot::new(&artist_ref, 13 * H, 120, "Main").unwrap()),
            Err(FestivalError::Slot(SlotError::Collision { .. }))
        ));
        // Back to back with 14h-15h and 16h-18h
        f.add_slot(Slot::new(&artist_ref, 15 * H, 60, "Main").unwrap()).unwrap();
        f.add_slot(Slot::new(&artist_ref, 13 * H, 60, "Main").unwrap()).unwrap();

        assert_eq!(f.schedule().len(), 4);
        assert_eq!(f.artist(artist_ref.id()).unwrap().slots().len(), 4);
    }

    #[test]
    fn test_slot_needs_attached_artist() {
        let mut f = festival();
        let stranger = Artist::new("Nobody", "Jazz", 0.0).unwrap();
        assert!(matches!(
            f.add_slot(Slot::new(&stranger, 0, 30, "Main").unwrap()),
            Err(FestivalError::ArtistNotFound(_))
        ));
        assert!(f.schedule().is_empty());
    }

    #[test]
    fn test_remove_slot_and_artist() {
        let mut f = festival();
        let artist = Artist::new("Angèle", "Pop", 12000.0).unwrap();
        let artist_id = artist.id().to_string();
        f.add_artist(artist.clone()).unwrap();
        assert!(matches!(
            f.add_artist(artist.clone()),
            Err(FestivalError::DuplicateArtist(_))
        ));

        let first = Slot::new(&artist, 20 * H, 60, "Main").unwrap();
        let second = Slot::new(&artist, 22 * H, 60, "Side").unwrap();
        let first_id = first.id().to_string();
        f.add_slot(first.clone()).unwrap();
        f.add_slot(second).unwrap();
        assert!(matches!(
            f.add_slot(first),
            Err(FestivalError::Artist(ArtistError::SlotAlreadyListed(_)))
        ));

        f.remove_slot(&first_id).unwrap();
        assert_eq!(f.artist(&artist_id).unwrap().slots().len(), 1);
        assert!(f.remove_slot(&first_id).is_err());

        let removed = f.remove_artist(&artist_id).unwrap();
        assert!(removed.slots().is_empty());
        assert!(f.schedule().is_empty());
        assert!(f.remove_artist(&artist_id).is_err());

        // The removed artist is clean and can be attached again
        f.add_artist(removed).unwrap();
    }

    #[test]
    fn test_program_uses_wall_clock_times() {
        let mut f = festival();
        let artist = Artist::new("Stromae", "Pop", 30000.0).unwrap();
        f.add_artist(artist.clone()).unwrap();
        f.add_slot(Slot::new(&artist, 21 * H, 90, "Main").unwrap()).unwrap();

        let program = f.program();
        assert_eq!(program.len(), 1);
        assert_eq!(program[0].artist, "Stromae");
        assert_eq!(program[0].starts_at, f.start() + Duration::hours(21));
        assert_eq!(program[0].ends_at, f.start() + Duration::minutes(21 * 60 + 90));
    }

    #[test]
    fn test_program_skips_slots_past_the_calendar() {
        let start = DateTime::<Utc>::MAX_UTC - Duration::hours(2);
        let mut f = Festival::new("Last Dance", start, 0.0, 100.0, "Nowhere").unwrap();
        let artist = Artist::new("Daft Punk", "Electro", 1.0).unwrap();
        f.add_artist(artist.clone()).unwrap();
        f.add_slot(Slot::new(&artist, 0, 60, "Main").unwrap()).unwrap();
        f.add_slot(Slot::new(&artist, 90, 60, "Main").unwrap()).unwrap();
        f.add_slot(Slot::new(&artist, u32::MAX - 1, 1, "Side").unwrap()).unwrap();

        let program = f.program();
        assert_eq!(program.len(), 1);
        assert_eq!(program[0].starts_at, start);
        assert_eq!(f.schedule().len(), 3);
    }

    #[test]
    fn test_validate_detects_broken_mirror() {
        let mut f = stocked_festival();
        f.validate().unwrap();

        // Drop the stock-side copy behind the festival's back
        let si = f.stock_index("Parking").unwrap();
        f.stocks[si].links_mut().clear();
        assert!(matches!(f.validate(), Err(FestivalError::Integrity(_))));
    }
}
