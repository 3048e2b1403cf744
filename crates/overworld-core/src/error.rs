//! Error types for the overworld engine.
//!
//! Construction-time problems (bad layouts, bad settings, empty animation
//! sequences) are fatal and surface as `Err` from constructors. Per-tick
//! gameplay never returns errors; recoverable anomalies are logged and the
//! offending action is skipped.

use std::path::PathBuf;

use thiserror::Error;

use crate::animation::Motion;

/// Failures while loading or interpreting a level layout.
#[derive(Debug, Error)]
pub enum MapError {
    /// The layout file does not exist.
    #[error("layout file not found: {0}")]
    FileNotFound(PathBuf),

    /// The layout file exists but could not be read.
    #[error("failed to read layout {path}: {source}")]
    Read {
        /// Path of the layout file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A cell could not be parsed as an integer tile code.
    #[error("failed to parse layout {path} at line {line}: {details}")]
    Parse {
        /// Path (or name) of the layout.
        path: PathBuf,
        /// One-based line number.
        line: usize,
        /// What went wrong.
        details: String,
    },

    /// A layer name that the engine does not know.
    #[error("unknown layer kind: {0}")]
    UnknownLayer(String),

    /// A tile code with no meaning on its layer.
    #[error("unknown tile code {code} on layer {layer} at ({col}, {row})")]
    UnknownTileCode {
        /// Layer the code was found on.
        layer: String,
        /// The offending code.
        code: i32,
        /// Column of the cell.
        col: usize,
        /// Row of the cell.
        row: usize,
    },

    /// The entities layer contains no player start tile.
    #[error("level {0} has no player start")]
    MissingPlayerStart(String),
}

/// Invalid animation data, detected when sequences are registered.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AnimationError {
    /// A sequence with zero frames.
    #[error("animation sequence for {0:?} is empty")]
    EmptySequence(Motion),
}

/// Failures while loading settings or validating sprite catalogs.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The settings file could not be read.
    #[error("failed to read settings {path}: {source}")]
    Read {
        /// Path of the settings file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The settings JSON is malformed.
    #[error("failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),

    /// A tileset or sprite category name that is not registered.
    #[error("unknown tileset category: {0}")]
    UnknownTileset(String),

    /// A setting value outside its valid range.
    #[error("invalid setting {name}: {details}")]
    Invalid {
        /// Name of the setting.
        name: &'static str,
        /// Why it is invalid.
        details: String,
    },

    /// Invalid animation data.
    #[error(transparent)]
    Animation(#[from] AnimationError),
}

/// Failures while saving or loading a game.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Reading or writing the save failed.
    #[error("save I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The save data is not valid JSON for the expected schema.
    #[error("save data is malformed: {0}")]
    Format(#[from] serde_json::Error),

    /// The save was written by an incompatible format version.
    #[error("unsupported save version {found} (expected {expected})")]
    UnsupportedVersion {
        /// Version found in the data.
        found: u32,
        /// Version this build writes.
        expected: u32,
    },

    /// No save exists yet.
    #[error("no save data present")]
    Empty,
}

/// A direction label that is not one of `up`, `down`, `left`, `right`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown direction label: {0:?}")]
pub struct UnknownDirection(pub String);

/// A malformed line in an input script.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("input script line {line}: {details}")]
pub struct InputScriptError {
    /// One-based line number.
    pub line: usize,
    /// What went wrong.
    pub details: String,
}

/// Umbrella error for callers that drive the whole engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Level layout failure.
    #[error(transparent)]
    Map(#[from] MapError),

    /// Settings or catalog failure.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Save/load failure.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_not_found_message_names_path() {
        let err = MapError::FileNotFound(PathBuf::from("levels/overworld/boundary.csv"));
        assert_eq!(
            err.to_string(),
            "layout file not found: levels/overworld/boundary.csv"
        );
    }

    #[test]
    fn test_engine_error_wraps_sources() {
        let err: EngineError = PersistenceError::Empty.into();
        assert!(matches!(err, EngineError::Persistence(PersistenceError::Empty)));
        assert_eq!(err.to_string(), "no save data present");
    }
}
