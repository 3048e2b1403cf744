//! Axis-separated rectangle collision.
//!
//! Movement is applied one axis at a time: horizontal displacement then
//! horizontal resolution, vertical displacement then vertical resolution.
//! Resolving each axis on its own stops an actor flush against whichever
//! surface it actually ran into, and keeps diagonal motion from slipping
//! through the seam between two tiles.
//!
//! # Determinism
//!
//! Resolution only reads the hitbox and the solid list for the tick. Within
//! one axis every intersecting solid contributes a limit and the most
//! restrictive limit is applied once, so the result does not depend on the
//! order of the solid list.
//!
//! # Example
//!
//! ```
//! use glam::Vec2;
//! use overworld_core::geometry::Rect;
//! use overworld_core::resolver::CollisionResolver;
//!
//! let wall = Rect::new(16.0, 0.0, 16.0, 16.0);
//! let mut hitbox = Rect::new(2.0, 2.0, 12.0, 12.0);
//!
//! let blocked = CollisionResolver::move_and_resolve(&mut hitbox, Vec2::new(4.0, 0.0), &[wall]);
//! assert!(blocked.horizontal);
//! assert_eq!(hitbox.right(), 16.0);
//! ```

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::animation::SpriteId;
use crate::geometry::{Axis, Rect};

// =============================================================================
// Obstacles
// =============================================================================

/// Terrain type of an obstacle tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObstacleKind {
    /// Solid terrain.
    Wall,
    /// Invisible screen or map limit. Blocks everything.
    Limit,
    /// Open water.
    Water,
    /// Water bridged by the player's ladder.
    LadderWater,
    /// Invisible rim that keeps aquatic monsters in their lake.
    LakeBorder,
}

/// A static tile the level places at load time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    /// Collision rectangle.
    pub hitbox: Rect,
    /// Current terrain type; water flips to ladder water and back.
    pub kind: ObstacleKind,
    /// Sprite drawn for this tile, if any.
    pub sprite: Option<SpriteId>,
}

impl Obstacle {
    /// Creates an obstacle.
    #[must_use]
    pub fn new(hitbox: Rect, kind: ObstacleKind) -> Self {
        Self {
            hitbox,
            kind,
            sprite: None,
        }
    }

    /// Bridges water with a ladder. Returns false if this is not open water.
    pub fn bridge(&mut self) -> bool {
        if self.kind == ObstacleKind::Water {
            self.kind = ObstacleKind::LadderWater;
            true
        } else {
            false
        }
    }

    /// Removes the ladder bridge. Returns false if the tile was not bridged.
    pub fn unbridge(&mut self) -> bool {
        if self.kind == ObstacleKind::LadderWater {
            self.kind = ObstacleKind::Water;
            true
        } else {
            false
        }
    }
}

/// Which obstacle kinds stop a mover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CollisionProfile {
    /// The player.
    Player,
    /// Land monsters. Ladder tiles and lake borders do not stop them.
    Land,
    /// Aquatic monsters. Water does not stop them; everything else does.
    Aquatic,
    /// Projectiles. Only walls and limits stop them.
    Projectile,
}

impl CollisionProfile {
    /// True if an obstacle of `kind` blocks this profile.
    #[must_use]
    pub fn is_blocked_by(self, kind: ObstacleKind) -> bool {
        match self {
            CollisionProfile::Player | CollisionProfile::Land => matches!(
                kind,
                ObstacleKind::Wall | ObstacleKind::Limit | ObstacleKind::Water
            ),
            CollisionProfile::Aquatic => matches!(
                kind,
                ObstacleKind::Wall | ObstacleKind::Limit | ObstacleKind::LakeBorder
            ),
            CollisionProfile::Projectile => {
                matches!(kind, ObstacleKind::Wall | ObstacleKind::Limit)
            }
        }
    }
}

// =============================================================================
// Resolver
// =============================================================================

/// Which axes were blocked during a move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Blocked {
    /// Stopped on the x axis.
    pub horizontal: bool,
    /// Stopped on the y axis.
    pub vertical: bool,
}

impl Blocked {
    /// True if either axis was blocked.
    #[must_use]
    pub fn any(self) -> bool {
        self.horizontal || self.vertical
    }
}

/// Stateless axis-separated collision resolution.
#[derive(Debug, Clone, Copy, Default)]
pub struct CollisionResolver;

impl CollisionResolver {
    /// Collects the hitboxes of obstacles that block `profile`.
    #[must_use]
    pub fn solids<'a>(
        profile: CollisionProfile,
        obstacles: impl IntoIterator<Item = &'a Obstacle>,
    ) -> Vec<Rect> {
        obstacles
            .into_iter()
            .filter(|o| profile.is_blocked_by(o.kind))
            .map(|o| o.hitbox)
            .collect()
    }

    /// Pushes `hitbox` out of every intersecting solid along `axis`.
    ///
    /// `displacement` is the signed movement just applied on `axis`. Moving in
    /// the positive direction clamps the leading edge to the nearest solid's
    /// near edge; moving in the negative direction clamps the trailing edge to
    /// the nearest solid's far edge. Zero displacement resolves nothing.
    ///
    /// Returns true if the hitbox was clamped.
    #[allow(clippy::float_cmp)]
    pub fn resolve(hitbox: &mut Rect, axis: Axis, displacement: f32, solids: &[Rect]) -> bool {
        if displacement == 0.0 {
            return false;
        }
        let forward = displacement > 0.0;
        let mut limit: Option<f32> = None;

        for solid in solids.iter().filter(|s| hitbox.intersects(s)) {
            let edge = match (axis, forward) {
                (Axis::Horizontal, true) => solid.left(),
                (Axis::Horizontal, false) => solid.right(),
                (Axis::Vertical, true) => solid.top(),
                (Axis::Vertical, false) => solid.bottom(),
            };
            limit = Some(match limit {
                None => edge,
                Some(current) if forward => current.min(edge),
                Some(current) => current.max(edge),
            });
        }

        let Some(limit) = limit else {
            return false;
        };
        match (axis, forward) {
            (Axis::Horizontal, true) => hitbox.set_right(limit),
            (Axis::Horizontal, false) => hitbox.set_left(limit),
            (Axis::Vertical, true) => hitbox.set_bottom(limit),
            (Axis::Vertical, false) => hitbox.set_top(limit),
        }
        true
    }

    /// Moves `hitbox` by `velocity`, resolving horizontally then vertically.
    pub fn move_and_resolve(hitbox: &mut Rect, velocity: Vec2, solids: &[Rect]) -> Blocked {
        hitbox.translate(Axis::Horizontal.vector(velocity.x));
        let horizontal = Self::resolve(hitbox, Axis::Horizontal, velocity.x, solids);
        hitbox.translate(Axis::Vertical.vector(velocity.y));
        let vertical = Self::resolve(hitbox, Axis::Vertical, velocity.y, solids);
        Blocked {
            horizontal,
            vertical,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
