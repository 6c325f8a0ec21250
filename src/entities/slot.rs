// 🕒 Slot Entity - one performance on one scene
//
// Times are minutes relative to the festival start. A slot occupies the
// half-open interval [start, start + duration), so a slot ending at 15:00
// and another starting at 15:00 on the same scene do not collide.

use crate::entities::Artist;
use crate::error::SlotError;
use crate::values::{Name, Quantity};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    /// Stable identity (UUID)
    id: String,

    /// Id of the performing artist
    artist: String,

    /// Minutes after the festival start
    start_offset: u32,

    /// Length in minutes
    duration: Quantity,

    #[serde(deserialize_with = "crate::values::labeled::scene")]
    scene: Name,
}

impl Slot {
    pub fn new(
        artist: &Artist,
        start_offset: u32,
        duration: u32,
        scene: &str,
    ) -> Result<Self, SlotError> {
        Ok(Slot {
            id: uuid::Uuid::new_v4().to_string(),
            artist: artist.id().to_string(),
            start_offset,
            duration: Quantity::new("duration", duration)?,
            scene: Name::new("scene", scene)?,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn artist_id(&self) -> &str {
        &self.artist
    }

    pub fn start_offset(&self) -> u32 {
        self.start_offset
    }

    pub fn duration(&self) -> u32 {
        self.duration.get()
    }

    /// First minute after the performance (exclusive bound)
    pub fn end_offset(&self) -> u64 {
        u64::from(self.start_offset) + u64::from(self.duration.get())
    }

    pub fn scene(&self) -> &str {
        self.scene.as_str()
    }

    /// Same scene and overlapping half-open intervals
    pub fn collides_with(&self, other: &Slot) -> bool {
        self.scene == other.scene
            && u64::from(self.start_offset) < other.end_offset()
            && u64::from(other.start_offset) < self.end_offset()
    }

    // Setters only matter for detached slots: the schedule hands out
    // shared references, so a scheduled slot is moved by remove + add.

    pub fn set_start_offset(&mut self, start_offset: u32) {
        self.start_offset = start_offset;
    }

    pub fn set_duration(&mut self, duration: u32) -> Result<(), SlotError> {
        self.duration = Quantity::new("duration", duration)?;
        Ok(())
    }

    pub fn set_scene(&mut self, scene: &str) -> Result<(), SlotError> {
        self.scene = Name::new("scene", scene)?;
        Ok(())
    }

    pub fn set_artist(&mut self, artist: &Artist) {
        self.artist = artist.id().to_string();
    }
}

// ============================================================================
// TESTS
// ============================================================================
