// 🎤 Artist Entity - a performer booked for the festival
//
// "Artist name is a VALUE (can change), Artist UUID is IDENTITY (never changes)"
//
// The artist keeps the ids of the slots it plays in. That list is a
// back-reference only: the festival schedule is the authoritative store
// and is the only code path that fills or empties it.

use crate::error::ArtistError;
use crate::values::{Name, Price};
use serde::{Deserialize, Serialize};

// ============================================================================
// ARTIST ENTITY
// ============================================================================

/// Artist Entity
///
/// Identity: UUID (never changes)
/// Values: name, genre, price (validated on every change)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artist {
    /// Stable identity (UUID) - NEVER changes
    id: String,

    #[serde(deserialize_with = "crate::values::labeled::artist_name")]
    name: Name,

    #[serde(deserialize_with = "crate::values::labeled::genre")]
    genre: Name,

    /// Booking fee
    price: Price,

    /// Ids of the scheduled slots this artist performs in
    #[serde(default)]
    slots: Vec<String>,
}

impl Artist {
    /// Create a new, detached artist
    pub fn new(name: &str, genre: &str, price: f64) -> Result<Self, ArtistError> {
        Ok(Artist {
            id: uuid::Uuid::new_v4().to_string(),
            name: Name::new("artist name", name)?,
            genre: Name::new("genre", genre)?,
            price: Price::new("artist price", price)?,
            slots: Vec::new(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn genre(&self) -> &str {
        self.genre.as_str()
    }

    pub fn price(&self) -> f64 {
        self.price.value()
    }

    /// Slot ids, in the order they were scheduled
    pub fn slots(&self) -> &[String] {
        &self.slots
    }

    pub fn set_name(&mut self, name: &str) -> Result<(), ArtistError> {
        self.name = Name::new("artist name", name)?;
        Ok(())
    }

    pub fn set_genre(&mut self, genre: &str) -> Result<(), ArtistError> {
        self.genre = Name::new("genre", genre)?;
        Ok(())
    }

    pub fn set_price(&mut self, price: f64) -> Result<(), ArtistError> {
        self.price = Price::new("artist price", price)?;
        Ok(())
    }

    pub(crate) fn attach_slot(&mut self, slot_id: &str) -> Result<(), ArtistError> {
        if self.performs_in(slot_id) {
            return Err(ArtistError::SlotAlreadyListed(slot_id.to_string()));
        }
        self.slots.push(slot_id.to_string());
        Ok(())
    }

    pub(crate) fn detach_slot(&mut self, slot_id: &str) -> Result<(), ArtistError> {
        let position = self
            .slots
            .iter()
            .position(|id| id == slot_id)
            .ok_or_else(|| ArtistError::SlotNotListed(slot_id.to_string()))?;
        self.slots.remove(position);
        Ok(())
    }

    pub fn performs_in(&self, slot_id: &str) -> bool {
        self.slots.iter().any(|id| id == slot_id)
    }
}

// ============================================================================
// TESTS
// ============================================================================
