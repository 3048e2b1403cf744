//! Engine settings.
//!
//! Every design constant lives in [`Settings`]. The struct deserializes with
//! `#[serde(default)]`, so a settings file only needs the keys it overrides:
//!
//! ```
//! use overworld_core::config::Settings;
//!
//! let settings = Settings::from_json_str(r#"{ "loot_drop_chance": 1.0 }"#).unwrap();
//! assert_eq!(settings.loot_drop_chance, 1.0);
//! assert_eq!(settings.player_health_per_heart, 256);
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Timings of the player death cutscene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeathTimings {
    /// Hurt flash before the spin.
    pub hurt_flash_ms: u64,
    /// Time spent on each quarter turn of the spin.
    pub spin_phase_ms: u64,
    /// Full turns in the spin.
    pub spins: u32,
    /// Duration of each darker floor shade.
    pub shade_ms: u64,
    /// Gray flash.
    pub gray_ms: u64,
    /// Frame cadence of the despawn burst.
    pub despawn_frame_ms: u64,
    /// Silence between hiding the player and the game-over message.
    pub game_over_delay_ms: u64,
}

impl Default for DeathTimings {
    fn default() -> Self {
        Self {
            hurt_flash_ms: 1500,
            spin_phase_ms: 100,
            spins: 3,
            shade_ms: 250,
            gray_ms: 1000,
            despawn_frame_ms: 100,
            game_over_delay_ms: 1000,
        }
    }
}

/// Engine-wide design constants.
///
/// Speeds are pixels per tick, durations are milliseconds and health is in
/// the same units as `player_health_per_heart`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Simulation rate.
    pub fps: u32,
    /// Edge length of a map tile.
    pub tile_size: f32,
    /// Height of the HUD band above the play field.
    pub hud_height: f32,
    /// Hit points in one heart.
    pub player_health_per_heart: i32,
    /// Hearts at game start and after a game-over restart.
    pub player_start_hearts: i32,
    /// Walking speed.
    pub player_speed: f32,
    /// Frames in the player's hurt animation; knockback speed starts here.
    pub player_hurt_frames: u32,
    /// Cadence of the player's hurt animation.
    pub player_hurt_frame_ms: u64,
    /// Cadence of the player's walk cycle.
    pub player_walk_frame_ms: u64,
    /// Sword damage per hit.
    pub sword_damage: i32,
    /// Cadence of the sword swing.
    pub sword_frame_ms: u64,
    /// Cadence of the B-item throw pose.
    pub item_frame_ms: u64,
    /// Boomerang damage per hit.
    pub boomerang_damage: i32,
    /// Candle flame damage per hit.
    pub flame_damage: i32,
    /// Bomb explosion damage.
    pub bomb_damage: i32,
    /// Probability that a monster drops loot.
    pub loot_drop_chance: f64,
    /// Rupees granted by a rupee drop.
    pub rupee_value: u32,
    /// Hit points restored by a heart drop.
    pub heart_value: i32,
    /// Bombs granted by a bomb drop.
    pub bomb_refill: u32,
    /// Bomb capacity.
    pub max_bombs: u32,
    /// How long dropped loot stays on the ground.
    pub loot_lifetime_ms: u64,
    /// Shop purchases ignore the price check and cost nothing.
    pub ignore_player_money_amount: bool,
    /// Time spent descending stairs before the level exit fires.
    pub stairs_ms: u64,
    /// Time spent warping before the level exit fires.
    pub warp_ms: u64,
    /// Time the triforce pose is held.
    pub triforce_ms: u64,
    /// Death cutscene timings.
    pub death: DeathTimings,
    /// First sprite id of each sheet category.
    pub sprite_sheets: BTreeMap<String, u32>,
}

impl Default for Settings {
    fn default() -> Self {
        let sprite_sheets = [
            ("player", 0),
            ("octorok", 100),
            ("moblin", 140),
            ("goriya", 180),
            ("zora", 220),
            ("leever", 260),
            ("particles", 300),
            ("pickups", 360),
            ("effects", 400),
            ("tiles", 440),
            ("npcs", 480),
            ("peahat", 520),
        ]
        .into_iter()
        .map(|(name, base)| (name.to_string(), base))
        .collect();

        Self {
            fps: 60,
            tile_size: 16.0,
            hud_height: 64.0,
            player_health_per_heart: 256,
            player_start_hearts: 3,
            player_speed: 1.5,
            player_hurt_frames: 4,
            player_hurt_frame_ms: 50,
            player_walk_frame_ms: 120,
            sword_damage: 128,
            sword_frame_ms: 60,
            item_frame_ms: 75,
            boomerang_damage: 64,
            flame_damage: 128,
            bomb_damage: 512,
            loot_drop_chance: 0.35,
            rupee_value: 1,
            heart_value: 256,
            bomb_refill: 4,
            max_bombs: 8,
            loot_lifetime_ms: 8000,
            ignore_player_money_amount: false,
            stairs_ms: 1000,
            warp_ms: 1500,
            triforce_ms: 3000,
            death: DeathTimings::default(),
            sprite_sheets,
        }
    }
}

impl Settings {
    /// Parses settings from JSON and validates them.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON and
    /// [`ConfigError::Invalid`] for out-of-range values.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reads and parses a settings file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] if the file cannot be read, otherwise as
    /// [`Settings::from_json_str`].
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fps == 0 {
            return Err(invalid("fps", "must be positive"));
        }
        if self.tile_size <= 0.0 {
            return Err(invalid("tile_size", "must be positive"));
        }
        if self.player_health_per_heart <= 0 {
            return Err(invalid("player_health_per_heart", "must be positive"));
        }
        if self.player_start_hearts <= 0 {
            return Err(invalid("player_start_hearts", "must be positive"));
        }
        if self
            .player_health_per_heart
            .checked_mul(self.player_start_hearts)
            .is_none()
        {
            return Err(invalid("player_start_hearts", "starting health overflows"));
        }
        if !(0.0..=1.0).contains(&self.loot_drop_chance) {
            return Err(invalid("loot_drop_chance", "must be within 0..=1"));
        }
        if self.death.spin_phase_ms == 0 {
            return Err(invalid("death.spin_phase_ms", "must be positive"));
        }
        Ok(())
    }

    /// First sprite id of a sheet category.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownTileset`] for unregistered categories.
    pub fn sprite_sheet(&self, category: &str) -> Result<u32, ConfigError> {
        self.sprite_sheets
            .get(category)
            .copied()
            .ok_or_else(|| ConfigError::UnknownTileset(category.to_string()))
    }

    /// Starting health of the player.
    #[must_use]
    pub fn player_start_health(&self) -> i32 {
        self.player_health_per_heart
            .saturating_mul(self.player_start_hearts)
    }

    /// Nominal tick length in milliseconds (rounded down).
    #[must_use]
    pub fn tick_ms(&self) -> u64 {
        1000 / u64::from(self.fps.max(1))
    }
}

fn invalid(name: &'static str, details: &str) -> ConfigError {
    ConfigError::Invalid {
        name,
        details: details.to_string(),
    }
}
