// 📅 Schedule - time-ordered slots with collision detection
//
// Slots are kept in a BTreeMap keyed by (start offset, insertion sequence).
// The sequence only breaks ties between equal starts, deterministically.
//
// Collision search looks at the nearest same-scene neighbour on each side
// of the new slot's start and nothing else. That is enough ONLY because:
//   1. collisions are defined per scene, and
//   2. the map is ordered purely by start time.
// The scheduled slots of one scene never overlap each other, so the latest
// same-scene slot starting at or before the new start is the only earlier
// one that can still be running, and the first same-scene slot starting at
// or after it is the only later one that can begin too soon. Scenes are
// interleaved in the map, so the walk skips entries on other scenes.
// Changing either point (e.g. slots spanning several scenes) breaks this.

use crate::entities::Slot;
use crate::error::SlotError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

type SlotKey = (u32, u64);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<Slot>", into = "Vec<Slot>")]
pub struct Schedule {
    slots: BTreeMap<SlotKey, Slot>,
    index: HashMap<String, SlotKey>,
    next_sequence: u64,
}

impl Schedule {
    pub fn new() -> Self {
        Schedule::default()
    }

    /// Scheduled slots that `slot` would overlap (at most one per side)
    pub fn conflicts(&self, slot: &Slot) -> Vec<&Slot> {
        let start = slot.start_offset();
        let same_scene = |other: &&Slot| other.scene() == slot.scene() && other.id() != slot.id();

        let floor = self
            .slots
            .range(..=(start, u64::MAX))
            .rev()
            .map(|(_, s)| s)
            .find(same_scene);
        let ceiling = self
            .slots
            .range((start, 0)..)
            .map(|(_, s)| s)
            .find(same_scene);

        let mut found: Vec<&Slot> = Vec::new();
        for neighbour in [floor, ceiling].into_iter().flatten() {
            if neighbour.collides_with(slot) && !found.iter().any(|s| s.id() == neighbour.id()) {
                found.push(neighbour);
            }
        }
        found
    }

    /// Insert a slot unless it collides with a scheduled one
    pub fn insert(&mut self, slot: Slot) -> Result<(), SlotError> {
        if self.index.contains_key(slot.id()) {
            return Err(SlotError::AlreadyScheduled(slot.id().to_string()));
        }

        let conflicts = self.conflicts(&slot);
        if !conflicts.is_empty() {
            return Err(SlotError::Collision {
                slot: slot.id().to_string(),
                scene: slot.scene().to_string(),
                conflicts: conflicts.iter().map(|s| s.id().to_string()).collect(),
            });
        }

        let key = (slot.start_offset(), self.next_sequence);
        self.next_sequence += 1;
        self.index.insert(slot.id().to_string(), key);
        self.slots.insert(key, slot);
        Ok(())
    }

    pub fn remove(&mut self, slot_id: &str) -> Result<Slot, SlotError> {
        let key = self
            .index
            .remove(slot_id)
            .ok_or_else(|| SlotError::NotScheduled(slot_id.to_string()))?;
        self.slots
            .remove(&key)
            .ok_or_else(|| SlotError::NotScheduled(slot_id.to_string()))
    }

    pub fn get(&self, slot_id: &str) -> Option<&Slot> {
        self.index.get(slot_id).and_then(|key| self.slots.get(key))
    }

    pub fn contains(&self, slot_id: &str) -> bool {
        self.index.contains_key(slot_id)
    }

    /// Slots in start order
    pub fn iter(&self) -> impl Iterator<Item = &Slot> {
        self.slots.values()
    }

    pub fn by_scene<'a>(&'a self, scene: &'a str) -> impl Iterator<Item = &'a Slot> + 'a {
        self.iter().filter(move |s| s.scene() == scene)
    }

    pub fn by_artist<'a>(&'a self, artist_id: &'a str) -> impl Iterator<Item = &'a Slot> + 'a {
        self.iter().filter(move |s| s.artist_id() == artist_id)
    }

    pub fn scenes(&self) -> BTreeSet<&str> {
        self.iter().map(|s| s.scene()).collect()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Offset at which the last performance ends, if any
    pub fn last_end_offset(&self) -> Option<u64> {
        self.iter().map(Slot::end_offset).max()
    }
}

// Sequence numbers are bookkeeping; two schedules are equal when they hold
// the same slots in the same order.
impl PartialEq for Schedule {
    fn eq(&self, other: &Self) -> bool {
        self.slots.values().eq(other.slots.values())
    }
}

impl TryFrom<Vec<Slot>> for Schedule {
    type Error = SlotError;

    fn try_from(slots: Vec<Slot>) -> Result<Self, Self::Error> {
        let mut schedule = Schedule::new();
        for slot in slots {
            schedule.insert(slot)?;
        }
        Ok(schedule)
    }
}

impl From<Schedule> for Vec<Slot> {
    fn from(schedule: Schedule) -> Self {
        schedule.slots.into_values().collect()
    }
}

// ============================================================================
// TESTS
// ============================================================================
