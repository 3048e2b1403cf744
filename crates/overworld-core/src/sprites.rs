//! Sprite id layout for every entity kind.
//!
//! Images live in the asset provider's pre-sliced sheet; the engine only
//! deals in [`SpriteId`]s. [`SpriteLibrary::from_settings`] resolves the first
//! id of each sheet category from [`Settings::sprite_sheets`] and builds the
//! animation sets from fixed offsets inside each category. A missing category
//! is a configuration bug and fails construction.
//!
//! # Layout
//!
//! | Category  | Offsets                                                        |
//! |-----------|----------------------------------------------------------------|
//! | player    | idle 0..4, walk 4..12, sword 12..20, item 20..24, gray 24, triforce 25, despawn 26..29 |
//! | species   | walk 0..8, attack 8..12, dive 12..14                            |
//! | effects   | spawn cloud 0..3, death burst 3..6                              |
//! | particles | see [`ParticleKind::sheet_slot`]                                |
//! | pickups   | rupee 0, bomb 1, fairy 2, heart 3, items from 4                 |
//! | tiles     | wall 0, water 1, ladder 2, floor tints from 3                   |
//! | npcs      | one id per npc code                                             |

use std::collections::BTreeMap;

use crate::animation::{AnimationSet, Motion, SpriteId};
use crate::config::Settings;
use crate::death::FloorTint;
use crate::error::ConfigError;
use crate::geometry::Facing;
use crate::items::{ItemKind, PickupKind};
use crate::loot::LootKind;
use crate::particle::{ParticleKind, ParticlePhase};
use crate::resolver::ObstacleKind;
use crate::species::Species;

/// Every sheet category the engine draws from.
pub const SHEET_CATEGORIES: [&str; 12] = [
    "player", "octorok", "moblin", "goriya", "zora", "leever", "peahat", "particles", "pickups",
    "effects", "tiles", "npcs",
];

/// Resolved sprite ids and animation sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpriteLibrary {
    player: AnimationSet,
    species: BTreeMap<Species, AnimationSet>,
    particles: BTreeMap<ParticleKind, AnimationSet>,
    pickups: SpriteId,
    tiles: SpriteId,
    npcs: SpriteId,
}

impl SpriteLibrary {
    /// Builds the library from the sheet bases in `settings`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownTileset`] if a sheet category is missing.
    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
        let base = |category: &str| settings.sprite_sheet(category).map(SpriteId);
        for category in SHEET_CATEGORIES {
            base(category)?;
        }

        let effects = base("effects")?;
        let player = player_set(base("player")?)?;

        let mut species = BTreeMap::new();
        for kind in Species::ALL {
            species.insert(kind, species_set(base(kind.sheet())?, effects)?);
        }

        let particle_base = base("particles")?;
        let mut particles = BTreeMap::new();
        for kind in ParticleKind::ALL {
            particles.insert(kind, particle_set(kind, particle_base.nth(kind.sheet_slot()))?);
        }

        Ok(Self {
            player,
            species,
            particles,
            pickups: base("pickups")?,
            tiles: base("tiles")?,
            npcs: base("npcs")?,
        })
    }

    /// Player animations.
    #[must_use]
    pub fn player(&self) -> &AnimationSet {
        &self.player
    }

    /// Animations of a species.
    #[must_use]
    pub fn species(&self, species: Species) -> Option<&AnimationSet> {
        self.species.get(&species)
    }

    /// Frames a particle shows in `phase` facing `facing`.
    #[must_use]
    pub fn particle_frames(
        &self,
        kind: ParticleKind,
        phase: ParticlePhase,
        facing: Facing,
    ) -> Option<&[SpriteId]> {
        let motion = match phase {
            ParticlePhase::Exploding => Motion::Die,
            _ => Motion::Fly,
        };
        let set = self.particles.get(&kind)?;
        set.get(motion, facing)
            .or_else(|| set.get(Motion::Fly, facing))
    }

    /// Image of a pickup.
    #[must_use]
    pub fn pickup(&self, kind: PickupKind) -> SpriteId {
        match kind {
            PickupKind::Loot(LootKind::Rupee) => self.pickups,
            PickupKind::Loot(LootKind::Bomb) => self.pickups.nth(1),
            PickupKind::Loot(LootKind::Fairy) => self.pickups.nth(2),
            PickupKind::Loot(LootKind::Heart) => self.pickups.nth(3),
            PickupKind::Item(item) => self.item(item),
        }
    }

    /// Image of an item.
    #[must_use]
    pub fn item(&self, item: ItemKind) -> SpriteId {
        self.pickups.nth(4 + item.code())
    }

    /// Tile image for an obstacle; invisible kinds have none.
    #[must_use]
    pub fn tile(&self, kind: ObstacleKind) -> Option<SpriteId> {
        match kind {
            ObstacleKind::Wall => Some(self.tiles),
            ObstacleKind::Water => Some(self.tiles.nth(1)),
            ObstacleKind::LadderWater => Some(self.tiles.nth(2)),
            ObstacleKind::Limit | ObstacleKind::LakeBorder => None,
        }
    }

    /// Ladder overlay image.
    #[must_use]
    pub fn ladder(&self) -> SpriteId {
        self.tiles.nth(2)
    }

    /// Full-screen floor overlay used by the death sequence.
    #[must_use]
    pub fn floor(&self, tint: FloorTint) -> SpriteId {
        self.tiles.nth(3 + tint.slot())
    }

    /// Image of an NPC by its layer code.
    #[must_use]
    pub fn npc(&self, code: u32) -> SpriteId {
        self.npcs.nth(code)
    }
}

fn player_set(base: SpriteId) -> Result<AnimationSet, ConfigError> {
    let mut set = AnimationSet::new();
    set.directional(Motion::Idle, base, 1)?;
    set.directional(Motion::Spin, base, 1)?;
    set.directional(Motion::Walk, base.nth(4), 2)?;
    set.directional(Motion::Attack, base.nth(12), 2)?;
    set.directional(Motion::Item, base.nth(20), 1)?;
    set.uniform(Motion::Gray, &[base.nth(24)])?;
    set.uniform(Motion::Triforce, &[base.nth(25)])?;
    set.uniform(Motion::Die, &[base.nth(26), base.nth(27), base.nth(28)])?;
    Ok(set)
}

fn species_set(base: SpriteId, effects: SpriteId) -> Result<AnimationSet, ConfigError> {
    let mut set = AnimationSet::new();
    set.directional(Motion::Idle, base, 1)?;
    set.directional(Motion::Walk, base, 2)?;
    set.directional(Motion::Attack, base.nth(8), 1)?;
    set.uniform(Motion::Dive, &[base.nth(12), base.nth(13)])?;
    set.uniform(Motion::Rise, &[base.nth(13), base.nth(12)])?;
    set.uniform(Motion::Spawn, &[effects, effects.nth(1), effects.nth(2)])?;
    set.uniform(Motion::Die, &[effects.nth(3), effects.nth(4), effects.nth(5)])?;
    Ok(set)
}

fn particle_set(kind: ParticleKind, base: SpriteId) -> Result<AnimationSet, ConfigError> {
    let mut set = AnimationSet::new();
    match kind {
        ParticleKind::Sword | ParticleKind::Arrow => set.directional(Motion::Fly, base, 1)?,
        ParticleKind::Bomb => {
            set.uniform(Motion::Fly, &[base, base.nth(1)])?;
            set.uniform(Motion::Die, &[base.nth(2), base.nth(3)])?;
        }
        ParticleKind::Boomerang => {
            let spin: Vec<SpriteId> = (0..4).map(|i| base.nth(i)).collect();
            set.uniform(Motion::Fly, &spin)?;
        }
        ParticleKind::Rock | ParticleKind::Magic | ParticleKind::Flame | ParticleKind::Fairy => {
            set.uniform(Motion::Fly, &[base, base.nth(1)])?;
        }
    }
    Ok(set)
}
