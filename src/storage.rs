//! # Storage Module
//!
//! Persistence of the single finished wave configuration. Writes go to a
//! temporary file in the target directory and are renamed over the canonical
//! path, so a reader sees either the previous complete file or the new one.
//! Reads re-validate the structure before handing the data out.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::errors::{ShapeError, StorageError};

/// Number of waves in a complete configuration
pub const MAX_WAVES: usize = 15;
/// Number of spawns in each wave
pub const SPAWNS_PER_WAVE: usize = 3;

const REQUIRED_FIELDS: [&str; 6] = ["week", "slug", "map", "mod1", "mod2", "waves"];

/// The persisted configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedWaves {
    pub week: String,
    pub absolute_week: Option<u32>,
    pub slug: String,
    pub map: String,
    pub mod1: String,
    pub mod2: String,
    pub waves: Vec<Vec<String>>,
}

/// Serialize `data` as pretty JSON and atomically replace `path` with it
pub fn write_json_atomic<T: Serialize>(path: &Path, data: &T) -> Result<(), StorageError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)?;

    let body = serde_json::to_vec_pretty(data).map_err(StorageError::Serialize)?;

    let mut temp_file = NamedTempFile::new_in(&dir)?;
    temp_file.write_all(&body)?;
    temp_file.as_file().sync_all()?;
    temp_file.persist(path).map_err(|e| StorageError::Io(e.error))?;

    debug!(path = %path.display(), bytes = body.len(), "JSON written atomically");
    Ok(())
}

/// Check the shape of a parsed configuration and convert it
pub fn validate_saved(value: Value) -> Result<SavedWaves, ShapeError> {
    let Value::Object(object) = value else {
        return Err(ShapeError::NotAnObject);
    };

    let missing: Vec<String> = REQUIRED_FIELDS
        .iter()
        .filter(|field| !object.contains_key(**field))
        .map(|field| field.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(ShapeError::MissingFields(missing));
    }

    let text_field = |name: &'static str| -> Result<String, ShapeError> {
        match &object[name] {
            Value::String(text) => Ok(text.clone()),
            Value::Number(number) if name == "week" => Ok(number.to_string()),
            _ => Err(ShapeError::NotAString(name)),
        }
    };

    let week = text_field("week")?;
    let slug = text_field("slug")?;
    let map = text_field("map")?;
    let mod1 = text_field("mod1")?;
    let mod2 = text_field("mod2")?;

    let Value::Array(raw_waves) = &object["waves"] else {
        return Err(ShapeError::WavesNotList);
    };

    let mut waves = Vec::with_capacity(raw_waves.len());
    for (idx, raw_wave) in raw_waves.iter().enumerate() {
        let wave_number = idx + 1;
        let Value::Array(raw_spawns) = raw_wave else {
            return Err(ShapeError::WaveNotList { wave: wave_number });
        };
        let spawns = raw_spawns
            .iter()
            .map(|spawn| spawn.as_str().map(str::to_string))
            .collect::<Option<Vec<String>>>()
            .ok_or(ShapeError::NonStringSpawn { wave: wave_number })?;
        if spawns.len() != SPAWNS_PER_WAVE {
            return Err(ShapeError::WrongSlotCount {
                wave: wave_number,
                expected: SPAWNS_PER_WAVE,
                found: spawns.len(),
            });
        }
        if let Some(empty) = spawns.iter().position(|spawn| spawn.trim().is_empty()) {
            return Err(ShapeError::EmptySpawn {
                wave: wave_number,
                slot: empty + 1,
            });
        }
        waves.push(spawns);
    }
    if waves.len() != MAX_WAVES {
        return Err(ShapeError::WrongWaveCount {
            expected: MAX_WAVES,
            found: waves.len(),
        });
    }

    let absolute_week = object
        .get("absolute_week")
        .and_then(Value::as_u64)
        .and_then(|n| u32::try_from(n).ok());

    Ok(SavedWaves {
        week,
        absolute_week,
        slug,
        map,
        mod1,
        mod2,
        waves,
    })
}

/// File-backed store for the one current configuration
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Atomically replace the saved configuration
    pub fn write(&self, payload: &SavedWaves) -> Result<(), StorageError> {
        write_json_atomic(&self.path, payload)?;
        info!(path = %self.path.display(), week = %payload.week, map = %payload.map, "Wave configuration saved");
        Ok(())
    }

    /// Read and re-validate the saved configuration
    pub fn read(&self) -> Result<SavedWaves, StorageError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(self.path.clone()));
            }
            Err(e) => return Err(StorageError::Io(e)),
        };
        let value: Value = serde_json::from_str(&text).map_err(StorageError::Unparsable)?;
        Ok(validate_saved(value)?)
    }
}
