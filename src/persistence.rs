// 💾 Persistence - festival ⇄ bytes ⇄ file
//
// The encoding is serde_json. Loading re-checks every cross-entity rule
// through `Festival::validate`, so a hand-edited file cannot smuggle in a
// broken aggregate. The "start not in the past" rule is not re-applied:
// past festivals stay loadable.

use crate::error::FestivalError;
use crate::festival::Festival;
use std::path::Path;
use tracing::info;

pub fn serialize(festival: &Festival) -> Result<Vec<u8>, FestivalError> {
    Ok(serde_json::to_vec_pretty(festival)?)
}

pub fn deserialize(bytes: &[u8]) -> Result<Festival, FestivalError> {
    let festival: Festival = serde_json::from_slice(bytes)?;
    festival.validate()?;
    Ok(festival)
}

impl Festival {
    pub fn to_bytes(&self) -> Result<Vec<u8>, FestivalError> {
        serialize(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Festival, FestivalError> {
        deserialize(bytes)
    }

    /// Load a saved festival and remember `path` as its backing file
    pub fn load_from(path: impl AsRef<Path>) -> Result<Festival, FestivalError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let mut festival = deserialize(&bytes)?;
        festival.set_file(path.to_path_buf());

        info!("Loaded festival {} from {}", festival.name(), path.display());
        Ok(festival)
    }

    /// Write to the backing file. Fails with `NoFile` if there is none.
    pub fn save(&self) -> Result<(), FestivalError> {
        let path = self.file().ok_or(FestivalError::NoFile)?;
        std::fs::write(path, serialize(self)?)?;

        info!("Saved festival {} to {}", self.name(), path.display());
        Ok(())
    }

    /// Write to `path` and make it the backing file
    pub fn save_as(&mut self, path: impl AsRef<Path>) -> Result<(), FestivalError> {
        let path = path.as_ref();
        std::fs::write(path, serialize(self)?)?;
        self.set_file(path.to_path_buf());

        info!("Saved festival {} to {}", self.name(), path.display());
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
