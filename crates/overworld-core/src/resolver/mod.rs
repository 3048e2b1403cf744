//! Resolvers turn proposed movement and contact into state changes.
//!
//! Entities decide what they want to do during their own update; the
//! resolvers then apply the world's rules to those proposals:
//!
//! - [`CollisionResolver`]: axis-separated movement against static tiles
//! - [`CombatResolver`]: damage between the player, monsters and particles
//!
//! # Invariants
//!
//! - Resolution is deterministic given the same inputs
//! - Collision results do not depend on the order of the solid list
//! - Combat visits entities in id order

mod collision;
mod combat;

pub use collision::{Blocked, CollisionProfile, CollisionResolver, Obstacle, ObstacleKind};
pub use combat::{CombatReport, CombatResolver};
