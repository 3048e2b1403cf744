//! Save games.
//!
//! A save is a [`PlayerSnapshot`] plus the [`WorldState`] flags, wrapped in a
//! versioned [`SaveGame`] envelope and encoded as JSON. The engine only talks
//! to a [`Persistence`] implementation; [`JsonFileStore`] writes to disk and
//! [`MemoryStore`] keeps the encoded save in memory.
//!
//! # Example
//!
//! ```
//! use overworld_core::persistence::{MemoryStore, Persistence, PlayerSnapshot, WorldState};
//!
//! let mut store = MemoryStore::new();
//! let mut world = WorldState::default();
//! world.consume_item("overworld", "item-3-4");
//!
//! store.save(&PlayerSnapshot::default(), &world).unwrap();
//! let (_, loaded) = store.load().unwrap();
//! assert!(loaded.is_consumed("overworld", "item-3-4"));
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::PersistenceError;

/// Format version written by this build.
pub const SAVE_VERSION: u32 = 1;

// =============================================================================
// Records
// =============================================================================

/// Player fields that survive a save.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerSnapshot {
    /// Level the player was in.
    pub level: String,
    /// Hit points.
    pub health: i32,
    /// Maximum hit points.
    pub max_health: i32,
    /// Currency.
    pub rupees: u32,
    /// Bombs carried.
    pub bombs: u32,
    /// Bomb capacity.
    pub max_bombs: u32,
    /// Identifiers of owned items.
    pub owned_items: Vec<String>,
    /// Identifier of the item bound to action B.
    pub equipped_b: Option<String>,
    /// Triforce pieces collected.
    pub triforce_pieces: u32,
}

/// World flags keyed by level identifier.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldState {
    /// Secrets uncovered, per level.
    pub revealed_secrets: BTreeMap<String, BTreeSet<String>>,
    /// Map items already picked up, per level.
    pub consumed_items: BTreeMap<String, BTreeSet<String>>,
    /// Shop offers already sold, per level.
    pub shop_inventory: BTreeMap<String, BTreeSet<String>>,
    /// One-shot "a monster was killed here" flags.
    pub monster_kills: BTreeMap<String, bool>,
    /// Dungeons whose monsters were all killed.
    pub dungeon_decimated: BTreeMap<String, bool>,
    /// Door open flags, per level.
    pub door_state: BTreeMap<String, BTreeMap<String, bool>>,
    /// Monsters killed across the whole game.
    pub kill_count: u64,
}

impl WorldState {
    /// True if the map item `key` of `level` was picked up.
    #[must_use]
    pub fn is_consumed(&self, level: &str, key: &str) -> bool {
        self.consumed_items
            .get(level)
            .is_some_and(|keys| keys.contains(key))
    }

    /// Records a map item as picked up.
    pub fn consume_item(&mut self, level: &str, key: &str) {
        self.consumed_items
            .entry(level.to_string())
            .or_default()
            .insert(key.to_string());
    }

    /// True if the shop offer `key` of `level` was sold.
    #[must_use]
    pub fn is_sold(&self, level: &str, key: &str) -> bool {
        self.shop_inventory
            .get(level)
            .is_some_and(|keys| keys.contains(key))
    }

    /// Records a shop offer as sold.
    pub fn mark_sold(&mut self, level: &str, key: &str) {
        self.shop_inventory
            .entry(level.to_string())
            .or_default()
            .insert(key.to_string());
    }

    /// Sets the one-shot kill flag of a level. Returns true the first time.
    pub fn record_monster_kill(&mut self, level: &str) -> bool {
        let flag = self.monster_kills.entry(level.to_string()).or_insert(false);
        !std::mem::replace(flag, true)
    }

    /// Marks a level's monsters as all killed.
    pub fn set_decimated(&mut self, level: &str) {
        self.dungeon_decimated.insert(level.to_string(), true);
    }

    /// True if a level's monsters were all killed.
    #[must_use]
    pub fn is_decimated(&self, level: &str) -> bool {
        self.dungeon_decimated.get(level).copied().unwrap_or(false)
    }
}

/// Versioned save envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveGame {
    /// Format version.
    pub version: u32,
    /// Player fields.
    pub player: PlayerSnapshot,
    /// World flags.
    pub world: WorldState,
}

impl SaveGame {
    /// Wraps a snapshot in the current format version.
    #[must_use]
    pub fn new(player: PlayerSnapshot, world: WorldState) -> Self {
        Self {
            version: SAVE_VERSION,
            player,
            world,
        }
    }

    /// Encodes as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::Format`] if encoding fails.
    pub fn to_json(&self) -> Result<String, PersistenceError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Decodes JSON, checking the version before the schema.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::Empty`] for blank input,
    /// [`PersistenceError::UnsupportedVersion`] for another format version and
    /// [`PersistenceError::Format`] for malformed data.
    pub fn from_json(json: &str) -> Result<Self, PersistenceError> {
        if json.trim().is_empty() {
            return Err(PersistenceError::Empty);
        }
        let value: serde_json::Value = serde_json::from_str(json)?;
        let found = value
            .get("version")
            .and_then(serde_json::Value::as_u64)
            .and_then(|v| u32::try_from(v).ok())
            .unwrap_or(0);
        if found != SAVE_VERSION {
            return Err(PersistenceError::UnsupportedVersion {
                found,
                expected: SAVE_VERSION,
            });
        }
        Ok(serde_json::from_value(value)?)
    }
}

// =============================================================================
// Stores
// =============================================================================

/// Save storage used by the session.
pub trait Persistence {
    /// Writes a save.
    ///
    /// # Errors
    ///
    /// Returns an error if the save cannot be encoded or written.
    fn save(&mut self, player: &PlayerSnapshot, world: &WorldState)
        -> Result<(), PersistenceError>;

    /// Reads the last save.
    ///
    /// # Errors
    ///
    /// Returns an error if no save exists or it cannot be read or decoded.
    fn load(&mut self) -> Result<(PlayerSnapshot, WorldState), PersistenceError>;
}

/// Save file on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Store backed by `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the save file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Persistence for JsonFileStore {
    fn save(
        &mut self,
        player: &PlayerSnapshot,
        world: &WorldState,
    ) -> Result<(), PersistenceError> {
        let json = SaveGame::new(player.clone(), world.clone()).to_json()?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, json)?;
        info!(path = %self.path.display(), "game saved");
        Ok(())
    }

    fn load(&mut self) -> Result<(PlayerSnapshot, WorldState), PersistenceError> {
        let json = fs::read_to_string(&self.path)?;
        let save = SaveGame::from_json(&json)?;
        info!(path = %self.path.display(), "game loaded");
        Ok((save.player, save.world))
    }
}

/// In-memory store holding the encoded save.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStore {
    encoded: Option<String>,
}

impl MemoryStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The encoded save, if any.
    #[must_use]
    pub fn encoded(&self) -> Option<&str> {
        self.encoded.as_deref()
    }
}

impl Persistence for MemoryStore {
    fn save(
        &mut self,
        player: &PlayerSnapshot,
        world: &WorldState,
    ) -> Result<(), PersistenceError> {
        self.encoded = Some(SaveGame::new(player.clone(), world.clone()).to_json()?);
        debug!("game saved to memory");
        Ok(())
    }

    fn load(&mut self) -> Result<(PlayerSnapshot, WorldState), PersistenceError> {
        let json = self.encoded.as_deref().ok_or(PersistenceError::Empty)?;
        let save = SaveGame::from_json(json)?;
        Ok((save.player, save.world))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_player() -> PlayerSnapshot {
        PlayerSnapshot {
            level: "overworld".to_string(),
            health: 512,
            max_health: 768,
            rupees: 42,
            bombs: 3,
            max_bombs: 8,
            owned_items: vec!["sword".to_string(), "ladder".to_string()],
            equipped_b: None,
            triforce_pieces: 1,
        }
    }

    mod world_tests {
        use super::*;

        #[test]
        fn test_flags_are_per_level() {
            let mut world = WorldState::default();
            world.consume_item("overworld", "a");
            world.mark_sold("shop-1", "candle");
            assert!(world.is_consumed("overworld", "a"));
            assert!(!world.is_consumed("dungeon-1", "a"));
            assert!(world.is_sold("shop-1", "candle"));
            assert!(!world.is_sold("shop-2", "candle"));
        }

        #[test]
        fn test_monster_kill_flag_is_one_shot() {
            let mut world = WorldState::default();
            assert!(world.record_monster_kill("dungeon-1"));
            assert!(!world.record_monster_kill("dungeon-1"));
        }
    }

    mod store_tests {
        use super::*;

        #[test]
        fn test_file_store_round_trip() {
            let dir = tempfile::tempdir().unwrap();
            let mut store = JsonFileStore::new(dir.path().join("saves/slot1.json"));
            let mut world = WorldState::default();
            world.kill_count = 17;
            world
                .door_state
                .insert("dungeon-1".into(), [("north".to_string(), true)].into());
            world
                .revealed_secrets
                .insert("overworld".into(), ["bombable-wall-3".to_string()].into());

            store.save(&sample_player(), &world).unwrap();
            let (player, loaded) = store.load().unwrap();
            assert_eq!(player, sample_player());
            assert_eq!(loaded, world);
        }

        #[test]
        fn test_missing_file_is_io_error() {
            let dir = tempfile::tempdir().unwrap();
            let mut store = JsonFileStore::new(dir.path().join("missing.json"));
            assert!(matches!(store.load(), Err(PersistenceError::Io(_))));
        }

        #[test]
        fn test_version_mismatch_rejected() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("old.json");
            fs::write(&path, r#"{"version": 0, "player": {}, "world": {}}"#).unwrap();
            let mut store = JsonFileStore::new(&path);
            assert!(matches!(
                store.load(),
                Err(PersistenceError::UnsupportedVersion {
                    found: 0,
                    expected: SAVE_VERSION
                })
            ));
        }

        #[test]
        fn test_empty_and_garbage() {
            assert!(matches!(SaveGame::from_json("  \n"), Err(PersistenceError::Empty)));
            assert!(matches!(SaveGame::from_json("{oops"), Err(PersistenceError::Format(_))));
            let mut store = MemoryStore::new();
            assert!(matches!(store.load(), Err(PersistenceError::Empty)));
        }

        #[test]
        fn test_memory_store_keeps_json() {
            let mut store = MemoryStore::new();
            store.save(&sample_player(), &WorldState::default()).unwrap();
            let json = store.encoded().unwrap();
            assert!(json.contains("\"version\": 1"));
            let (player, _) = store.load().unwrap();
            assert_eq!(player.rupees, 42);
        }
    }
}
