//! Configuration errors and RON loading helpers.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

/// Errors raised while loading or validating authored configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// RON parse error
    #[error("parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// RON serialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A value that cannot be clamped into shape
    #[error("invalid archetype '{archetype}': {reason}")]
    Invalid {
        /// Archetype name
        archetype: String,
        /// What is wrong
        reason: String,
    },

    /// Lookup of an archetype that does not exist
    #[error("unknown archetype: {0}")]
    UnknownArchetype(String),
}

impl ConfigError {
    /// Shorthand for [`ConfigError::Invalid`].
    pub fn invalid(archetype: &str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            archetype: archetype.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Parses a RON document.
pub fn from_ron_str<T: DeserializeOwned>(text: &str) -> ConfigResult<T> {
    Ok(ron::from_str(text)?)
}

/// Reads and parses a RON file.
pub fn load_ron<T: DeserializeOwned>(path: &Path) -> ConfigResult<T> {
    let text = fs::read_to_string(path)?;
    let value = from_ron_str(&text)?;
    info!("Loaded configuration from {:?}", path);
    Ok(value)
}

/// Pretty-prints a value as RON.
pub fn to_ron_string<T: Serialize>(value: &T) -> ConfigResult<String> {
    ron::ser::to_string_pretty(value, ron::ser::PrettyConfig::default())
        .map_err(|e| ConfigError::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::PlayerTuning;

    #[test]
    fn test_partial_document_uses_defaults() {
        let tuning: PlayerTuning = from_ron_str("(move_speed: 7.5)").unwrap();
        assert_eq!(tuning.move_speed, 7.5);
        assert_eq!(tuning.jump_impulse, PlayerTuning::default().jump_impulse);
    }

    #[test]
    fn test_parse_error_is_reported() {
        let result: ConfigResult<PlayerTuning> = from_ron_str("(move_speed: )");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_missing_file() {
        let result: ConfigResult<PlayerTuning> = load_ron(Path::new("/nonexistent/tuning.ron"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_invalid_message() {
        let err = ConfigError::invalid("grunt", "detection range must be positive");
        assert_eq!(
            err.to_string(),
            "invalid archetype 'grunt': detection range must be positive"
        );
    }
}
