//! Monster species and their behavior parameters.
//!
//! Every species is the same [`Monster`](crate::monster::Monster) state machine
//! driven by a different [`SpeciesConfig`]. Variation lives in data: which
//! policy picks the movement direction, which particle the attack fires, and
//! whether the monster dives underground or underwater between appearances.
//!
//! # Roster
//!
//! | Species | Targeting | Attack    | Dives |
//! |---------|-----------|-----------|-------|
//! | Octorok | Ambient   | Rock      | no    |
//! | Moblin  | Ambient   | Arrow     | no    |
//! | Goriya  | Ambient   | Boomerang | no    |
//! | Zora    | Seeking   | Magic     | water |
//! | Leever  | Seeking   | contact   | sand  |
//! | Peahat  | Evasive   | contact   | no    |

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::actor::HurtProfile;
use crate::particle::ParticleKind;
use crate::resolver::CollisionProfile;

/// Every monster species.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Species {
    /// Rock-spitting wanderer.
    Octorok,
    /// Arrow-shooting wanderer.
    Moblin,
    /// Boomerang thrower.
    Goriya,
    /// Water-dweller that surfaces to fire magic.
    Zora,
    /// Burrower that chases the player across sand.
    Leever,
    /// Flier that keeps its distance from the player.
    Peahat,
}

impl Species {
    /// Every species in entity-code order.
    pub const ALL: [Species; 6] = [
        Species::Octorok,
        Species::Moblin,
        Species::Goriya,
        Species::Zora,
        Species::Leever,
        Species::Peahat,
    ];

    /// Species for an entity-layer code. Code 0 is the player start.
    #[must_use]
    pub fn from_code(code: i32) -> Option<Species> {
        match code {
            1 => Some(Species::Octorok),
            2 => Some(Species::Moblin),
            3 => Some(Species::Goriya),
            4 => Some(Species::Zora),
            5 => Some(Species::Leever),
            6 => Some(Species::Peahat),
            _ => None,
        }
    }

    /// Sprite sheet category.
    #[must_use]
    pub fn sheet(self) -> &'static str {
        match self {
            Species::Octorok => "octorok",
            Species::Moblin => "moblin",
            Species::Goriya => "goriya",
            Species::Zora => "zora",
            Species::Leever => "leever",
            Species::Peahat => "peahat",
        }
    }

    /// Behavior parameters.
    #[must_use]
    pub fn config(self) -> SpeciesConfig {
        let base = SpeciesConfig::default();
        match self {
            Species::Octorok => SpeciesConfig {
                attack: Some(AttackProfile::standard(ParticleKind::Rock, 128, (1500, 3500), 200)),
                ..base
            },
            Species::Moblin => SpeciesConfig {
                health: 256,
                speed: 0.8,
                attack: Some(AttackProfile::standard(ParticleKind::Arrow, 128, (2000, 4000), 250)),
                ..base
            },
            Species::Goriya => SpeciesConfig {
                health: 384,
                attack: Some(AttackProfile {
                    hold: AttackHold::Legacy,
                    ..AttackProfile::standard(ParticleKind::Boomerang, 128, (2500, 4500), 200)
                }),
                ..base
            },
            Species::Zora => SpeciesConfig {
                health: 256,
                speed: 0.0,
                targeting: TargetingPolicy::Seeking,
                profile: CollisionProfile::Aquatic,
                attack: Some(AttackProfile::standard(ParticleKind::Magic, 256, (1000, 1500), 300)),
                dive: Some(DiveCycle {
                    above_ms: 2500,
                    below_ms: 2000,
                    transition_frame_ms: 150,
                    moves_while_surfaced: false,
                    relocate_on_rise: true,
                }),
                ..base
            },
            Species::Leever => SpeciesConfig {
                health: 256,
                speed: 0.75,
                targeting: TargetingPolicy::Seeking,
                dive: Some(DiveCycle {
                    above_ms: 4000,
                    below_ms: 1500,
                    transition_frame_ms: 150,
                    moves_while_surfaced: true,
                    relocate_on_rise: false,
                }),
                ..base
            },
            Species::Peahat => SpeciesConfig {
                health: 128,
                speed: 0.9,
                targeting: TargetingPolicy::Evasive,
                ..base
            },
        }
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sheet())
    }
}

// =============================================================================
// Behavior Parameters
// =============================================================================

/// How a monster picks its movement direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetingPolicy {
    /// Random cardinal direction, re-rolled on a random interval or when blocked.
    Ambient,
    /// Toward the player along the dominant axis.
    Seeking,
    /// Away from the player along the dominant axis.
    Evasive,
}

/// How long the attack pose is held, as a multiple of the animation cooldown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttackHold {
    /// Twice the animation cooldown.
    Standard,
    /// Two and a half times the animation cooldown.
    Legacy,
}

impl AttackHold {
    /// Hold duration for an animation cooldown.
    #[must_use]
    pub fn duration_ms(self, animation_cooldown_ms: u64) -> u64 {
        match self {
            AttackHold::Standard => animation_cooldown_ms * 2,
            AttackHold::Legacy => animation_cooldown_ms * 5 / 2,
        }
    }
}

/// Ranged attack of a species.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttackProfile {
    /// Particle fired.
    pub payload: ParticleKind,
    /// Damage of the particle.
    pub damage: i32,
    /// Range the attack cooldown is drawn from, `[min, max)`.
    pub cooldown_ms: (u64, u64),
    /// Cadence of the attack animation.
    pub animation_cooldown_ms: u64,
    /// Pose hold length.
    pub hold: AttackHold,
}

impl AttackProfile {
    /// Profile with the standard hold.
    #[must_use]
    pub fn standard(
        payload: ParticleKind,
        damage: i32,
        cooldown_ms: (u64, u64),
        animation_cooldown_ms: u64,
    ) -> Self {
        Self {
            payload,
            damage,
            cooldown_ms,
            animation_cooldown_ms,
            hold: AttackHold::Standard,
        }
    }

    /// How long the attack pose lasts.
    #[must_use]
    pub fn hold_ms(&self) -> u64 {
        self.hold.duration_ms(self.animation_cooldown_ms)
    }
}

/// Surface and submerge timing of a diving species.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiveCycle {
    /// Time spent surfaced before diving.
    pub above_ms: u64,
    /// Time spent submerged before rising.
    pub below_ms: u64,
    /// Cadence of the dive and rise animations.
    pub transition_frame_ms: u64,
    /// Walks while surfaced.
    pub moves_while_surfaced: bool,
    /// Rises on a random tile of its habitat instead of where it dove.
    pub relocate_on_rise: bool,
}

/// Full parameter set of a species.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeciesConfig {
    /// Starting and maximum health.
    pub health: i32,
    /// Walking speed.
    pub speed: f32,
    /// Damage dealt to the player on contact.
    pub collision_damage: i32,
    /// Direction policy.
    pub targeting: TargetingPolicy,
    /// Which obstacles block it.
    pub profile: CollisionProfile,
    /// Ranged attack, if any.
    pub attack: Option<AttackProfile>,
    /// Dive cycle, if any.
    pub dive: Option<DiveCycle>,
    /// Range the ambient direction interval is drawn from, `[min, max)`.
    pub direction_interval_ms: (u64, u64),
    /// Sprite size.
    pub size: f32,
    /// Hitbox size.
    pub hitbox: f32,
    /// Knockback and invulnerability timing.
    pub hurt: HurtProfile,
    /// Cadence of the walk cycle.
    pub walk_frame_ms: u64,
    /// Cadence of the spawn cloud.
    pub spawn_frame_ms: u64,
    /// Cadence of the death burst.
    pub death_frame_ms: u64,
}

impl Default for SpeciesConfig {
    fn default() -> Self {
        Self {
            health: 128,
            speed: 1.0,
            collision_damage: 128,
            targeting: TargetingPolicy::Ambient,
            profile: CollisionProfile::Land,
            attack: None,
            dive: None,
            direction_interval_ms: (500, 2000),
            size: 16.0,
            hitbox: 14.0,
            hurt: HurtProfile {
                frames: 4,
                frame_ms: 50,
            },
            walk_frame_ms: 150,
            spawn_frame_ms: 100,
            death_frame_ms: 80,
        }
    }
}
