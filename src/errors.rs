//! # Error Types Module
//!
//! Error taxonomy for the wave wizard. Catalog and storage failures are typed
//! so callers can tell them apart; wizard errors wrap both and carry the
//! Fluent key used to render the operator-facing notice.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or querying the static catalog
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("unknown map '{0}'")]
    UnknownMap(String),
    #[error("unknown week '{0}'")]
    UnknownWeek(String),
}

/// Structural problems found when re-validating a saved configuration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShapeError {
    #[error("saved configuration is not a JSON object")]
    NotAnObject,
    #[error("missing field(s): {}", .0.join(", "))]
    MissingFields(Vec<String>),
    #[error("field '{0}' must be a string")]
    NotAString(&'static str),
    #[error("waves must be a list")]
    WavesNotList,
    #[error("wrong wave count: expected {expected}, found {found}")]
    WrongWaveCount { expected: usize, found: usize },
    #[error("wave {wave} must be a list")]
    WaveNotList { wave: usize },
    #[error("wave {wave} contains a non-string spawn")]
    NonStringSpawn { wave: usize },
    #[error("wave {wave} has an empty spawn in slot {slot}")]
    EmptySpawn { wave: usize, slot: usize },
    #[error("wrong slot count in wave {wave}: expected {expected}, found {found}")]
    WrongSlotCount {
        wave: usize,
        expected: usize,
        found: usize,
    },
}

/// Errors raised by the persistence layer
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("saved configuration not found at {0}")]
    NotFound(PathBuf),
    #[error("saved configuration is not valid JSON: {0}")]
    Unparsable(#[source] serde_json::Error),
    #[error("saved configuration is invalid: {0}")]
    Invalid(#[from] ShapeError),
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// The piece of a draft that blocks saving
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingPiece {
    Week,
    Map,
    Modifiers,
    Waves,
}

/// Recoverable failures of a single wizard event
///
/// None of these leave a partially applied mutation behind: the controller
/// works on a copy of the stage and only commits on success.
#[derive(Debug, Error)]
pub enum WizardError {
    #[error("malformed callback payload: {0}")]
    Malformed(String),
    #[error("unknown option id '{0}'")]
    UnknownOption(String),
    #[error("action is not valid in the current stage")]
    UnexpectedAction,
    #[error("all waves are already filled")]
    AlreadyComplete,
    #[error("there is nothing to edit yet")]
    NothingToEdit,
    #[error("cell {wave}.{slot} is not filled")]
    CellUnavailable { wave: usize, slot: usize },
    #[error("configuration is incomplete: {0:?}")]
    Incomplete(MissingPiece),
    #[error("no weeks found for part {0}")]
    NoWeeks(u8),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl WizardError {
    /// Fluent message key for the transient notice shown to the operator
    pub fn message_key(&self) -> &'static str {
        match self {
            WizardError::Malformed(_) => "notice-malformed",
            WizardError::UnknownOption(_) => "notice-unknown-option",
            WizardError::UnexpectedAction => "notice-stale-button",
            WizardError::AlreadyComplete => "notice-already-complete",
            WizardError::NothingToEdit => "notice-nothing-to-edit",
            WizardError::CellUnavailable { .. } => "notice-cell-unavailable",
            WizardError::Incomplete(MissingPiece::Week) => "notice-missing-week",
            WizardError::Incomplete(MissingPiece::Map) => "notice-missing-map",
            WizardError::Incomplete(MissingPiece::Modifiers) => "notice-missing-modifiers",
            WizardError::Incomplete(MissingPiece::Waves) => "notice-missing-waves",
            WizardError::NoWeeks(_) => "notice-no-weeks",
            WizardError::Catalog(CatalogError::UnknownMap(_)) => "notice-unknown-map",
            WizardError::Catalog(CatalogError::UnknownWeek(_)) => "notice-unknown-week",
            WizardError::Catalog(_) => "notice-catalog-unavailable",
            WizardError::Storage(StorageError::NotFound(_)) => "notice-saved-missing",
            WizardError::Storage(StorageError::Unparsable(_)) => "notice-saved-unparsable",
            WizardError::Storage(StorageError::Invalid(_)) => "notice-saved-invalid",
            WizardError::Storage(_) => "notice-save-failed",
        }
    }

    /// Detail passed to the notice as `$detail`, when the message has one
    pub fn detail(&self) -> Option<String> {
        match self {
            WizardError::CellUnavailable { wave, slot } => Some(format!("{}.{}", wave + 1, slot + 1)),
            WizardError::NoWeeks(part) => Some(part.to_string()),
            WizardError::Catalog(CatalogError::UnknownMap(slug)) => Some(slug.clone()),
            WizardError::Catalog(CatalogError::UnknownWeek(code)) => Some(code.clone()),
            WizardError::Storage(StorageError::Invalid(shape)) => Some(shape.to_string()),
            WizardError::Storage(StorageError::Unparsable(e)) => Some(e.to_string()),
            WizardError::Storage(e) => Some(e.to_string()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_error_display() {
        let err = ShapeError::MissingFields(vec!["waves".to_string(), "mod2".to_string()]);
        assert_eq!(err.to_string(), "missing field(s): waves, mod2");

        let err = ShapeError::WrongSlotCount {
            wave: 4,
            expected: 3,
            found: 2,
        };
        assert!(err.to_string().starts_with("wrong slot count"));
    }

    #[test]
    fn test_storage_errors_map_to_distinct_notices() {
        let missing = WizardError::from(StorageError::NotFound(PathBuf::from("waves.json")));
        let invalid = WizardError::from(StorageError::Invalid(ShapeError::WavesNotList));
        let broken = WizardError::from(StorageError::Unparsable(
            serde_json::from_str::<serde_json::Value>("{").unwrap_err(),
        ));

        assert_eq!(missing.message_key(), "notice-saved-missing");
        assert_eq!(invalid.message_key(), "notice-saved-invalid");
        assert_eq!(broken.message_key(), "notice-saved-unparsable");
        assert_eq!(invalid.detail().as_deref(), Some("waves must be a list"));
    }
}
