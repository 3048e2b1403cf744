//! Entity identity and shared components.
//!
//! This module provides the pieces every live thing in a level shares:
//! - [`EntityId`]: unique, monotonically assigned identifier
//! - [`EntityTag`]: which collection of the level the entity lives in
//! - [`components`]: health, the closed actor state set and sprite-group flags
//!
//! # Ordering
//!
//! Level collections are `BTreeMap`s keyed by [`EntityId`], so iteration is in
//! spawn order on every platform. All per-tick passes rely on that order for
//! deterministic replays.
//!
//! # Example
//!
//! ```
//! use overworld_core::entity::{EntityId, EntityTag};
//!
//! let id = EntityId::new(7);
//! assert_eq!(id.as_u64(), 7);
//! assert_eq!(EntityTag::Monster.to_string(), "Monster");
//! ```

pub mod components;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use components::{ActionSlot, ActorState, Health, HurtKind, SpriteGroups};

/// Unique identifier for an entity within a level.
///
/// Ids are never reused while the level lives.
///
/// ```
/// use overworld_core::entity::EntityId;
///
/// let first = EntityId::new(1);
/// let second = EntityId::new(2);
/// assert!(first < second);
/// ```
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(u64);

impl EntityId {
    /// Creates an `EntityId` from a raw value.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({})", self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for EntityId {
    fn from(id: u64) -> Self {
        Self::new(id)
    }
}

impl From<EntityId> for u64 {
    fn from(id: EntityId) -> Self {
        id.0
    }
}

/// Which level collection an entity belongs to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityTag {
    /// Wall, water, lake border or screen limit.
    Obstacle,
    /// Hostile actor.
    Monster,
    /// Sword swing, projectile, flame or bomb.
    Particle,
    /// Loot drop, map item or shop offer.
    Pickup,
    /// Non-player character.
    Npc,
}

impl fmt::Display for EntityTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Obstacle => write!(f, "Obstacle"),
            Self::Monster => write!(f, "Monster"),
            Self::Particle => write!(f, "Particle"),
            Self::Pickup => write!(f, "Pickup"),
            Self::Npc => write!(f, "Npc"),
        }
    }
}
