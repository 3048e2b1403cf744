//! Components shared by the player and monsters.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Health
// =============================================================================

/// Hit points, kept within `0..=max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    current: i32,
    max: i32,
}

impl Health {
    /// Full health with the given maximum. Negative maxima are clamped to 0.
    #[must_use]
    pub fn new(max: i32) -> Self {
        let max = max.max(0);
        Self { current: max, max }
    }

    /// Health at `current` out of `max`, clamped.
    #[must_use]
    pub fn with_current(current: i32, max: i32) -> Self {
        let max = max.max(0);
        Self {
            current: current.clamp(0, max),
            max,
        }
    }

    /// Current hit points.
    #[must_use]
    pub fn current(&self) -> i32 {
        self.current
    }

    /// Maximum hit points.
    #[must_use]
    pub fn max(&self) -> i32 {
        self.max
    }

    /// True once hit points reach zero.
    #[must_use]
    pub fn is_depleted(&self) -> bool {
        self.current <= 0
    }

    /// True at maximum.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.current >= self.max
    }

    /// Subtracts `amount`, clamping at zero. Returns the amount actually removed.
    pub fn damage(&mut self, amount: i32) -> i32 {
        let before = self.current;
        self.current = (self.current - amount.max(0)).max(0);
        before - self.current
    }

    /// Adds `amount`, clamping at the maximum. Returns the amount actually added.
    pub fn heal(&mut self, amount: i32) -> i32 {
        let before = self.current;
        self.current = (self.current + amount.max(0)).min(self.max);
        self.current - before
    }

    /// Restores to maximum.
    pub fn fill(&mut self) {
        self.current = self.max;
    }

    /// Raises (or lowers) the maximum, clamping current.
    pub fn set_max(&mut self, max: i32) {
        self.max = max.max(0);
        self.current = self.current.min(self.max);
    }
}

// =============================================================================
// Actor State
// =============================================================================

/// Which action button started an `Acting` state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionSlot {
    /// Melee (sword).
    SwordA,
    /// Equipped consumable item.
    ItemB,
}

/// How the hit that caused a `Hurt` state arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HurtKind {
    /// Body contact along the x axis.
    Horizontal,
    /// Body contact along the y axis.
    Vertical,
    /// Struck by a particle.
    Particle,
}

/// Closed set of actor states shared by the player and every species.
///
/// Not every actor uses every state. Monsters shoot through `Attacking`,
/// which is distinct from the player's `Acting`. `Idle` doubles as the
/// underground/underwater phase of diving species.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ActorState {
    /// Standing still.
    #[default]
    Idle,
    /// Moving under its own power.
    Walking,
    /// Player using the sword or a B item.
    Acting(ActionSlot),
    /// Monster firing its payload.
    Attacking,
    /// Knocked back and invulnerable.
    Hurt(HurtKind),
    /// Spawn cloud playing.
    Spawning,
    /// Death or despawn animation playing.
    Dying,
    /// Going under.
    Diving,
    /// Coming back up.
    Rising,
    /// Descending a staircase.
    Stairs,
    /// Being warped away.
    Warping,
    /// Death-sequence gray flash.
    Gray,
    /// Death-sequence spin.
    Spinning,
    /// Holding up a triforce piece.
    Triforce,
}

impl ActorState {
    /// States from which voluntary movement is allowed.
    #[must_use]
    pub fn can_move(self) -> bool {
        matches!(self, ActorState::Idle | ActorState::Walking)
    }

    /// States from which a new action may start.
    #[must_use]
    pub fn can_act(self) -> bool {
        matches!(self, ActorState::Idle | ActorState::Walking)
    }

    /// True while in any `Hurt` variant.
    #[must_use]
    pub fn is_hurt(self) -> bool {
        matches!(self, ActorState::Hurt(_))
    }

    /// Short lowercase name for logs.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            ActorState::Idle => "idle",
            ActorState::Walking => "walking",
            ActorState::Acting(ActionSlot::SwordA) => "acting_a",
            ActorState::Acting(ActionSlot::ItemB) => "acting_b",
            ActorState::Attacking => "attacking",
            ActorState::Hurt(_) => "hurt",
            ActorState::Spawning => "spawning",
            ActorState::Dying => "dying",
            ActorState::Diving => "diving",
            ActorState::Rising => "rising",
            ActorState::Stairs => "stairs",
            ActorState::Warping => "warping",
            ActorState::Gray => "gray",
            ActorState::Spinning => "spinning",
            ActorState::Triforce => "triforce",
        }
    }
}

impl fmt::Display for ActorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// =============================================================================
// Sprite Groups
// =============================================================================

bitflags! {
    /// Sprite groups an entity is registered in.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct SpriteGroups: u8 {
        /// Drawn this tick.
        const VISIBLE = 1 << 0;
        /// Can touch or be touched in combat.
        const COLLIDABLE = 1 << 1;
    }
}

impl Default for SpriteGroups {
    fn default() -> Self {
        SpriteGroups::VISIBLE | SpriteGroups::COLLIDABLE
    }
}
