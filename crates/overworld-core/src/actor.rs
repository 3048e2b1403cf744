//! Shared actor record used by the player and every monster species.
//!
//! An [`Actor`] holds the parts of an entity every state machine needs: the
//! visual rectangle and the smaller hitbox, facing and direction vector, the
//! current [`ActorState`], health with its invulnerability window, speed with
//! knockback decay, and the animation cursor. The player and monster modules
//! drive the state transitions; this module owns the mechanics they share.
//!
//! # Damage and knockback
//!
//! [`Actor::take_damage`] is a no-op while the actor is spawning, dying,
//! already hurt or invulnerable. Otherwise it subtracts health, enters
//! `Hurt`, opens the invulnerability window and sets a knockback direction
//! opposite the side the hit came from. Knockback speed fades linearly over
//! the hurt animation:
//!
//! ```text
//! speed = frames - frames_elapsed      (frames_elapsed clamped to frames)
//! ```
//!
//! reaching exactly 0 when the last hurt frame completes. The window closes
//! after `(frames + 1) * frame_ms`.
//!
//! # Example
//!
//! ```
//! use glam::Vec2;
//! use overworld_core::actor::{Actor, DamageSource, HurtProfile};
//! use overworld_core::entity::ActorState;
//! use overworld_core::geometry::Rect;
//!
//! let mut actor = Actor::new(Rect::new(0.0, 0.0, 16.0, 16.0), Vec2::splat(12.0), 256, 1.0,
//!     HurtProfile { frames: 4, frame_ms: 50 }, 0);
//! actor.set_state(ActorState::Walking, 0);
//!
//! actor.take_damage(128, DamageSource::contact(Vec2::new(10.0, 0.0)), 0);
//! actor.take_damage(128, DamageSource::contact(Vec2::new(10.0, 0.0)), 16);
//!
//! assert_eq!(actor.health.current(), 128);
//! assert!(actor.invulnerable);
//! assert_eq!(actor.knockback, Vec2::new(-1.0, 0.0));
//! ```

use std::str::FromStr;

use glam::Vec2;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::animation::{AnimationSet, Animator, Cadence, Motion, Playback, SpriteId};
use crate::entity::{ActionSlot, ActorState, Health, HurtKind, SpriteGroups};
use crate::geometry::{Axis, Facing, Rect};
use crate::resolver::{Blocked, CollisionResolver};

// =============================================================================
// Damage
// =============================================================================

/// Hurt animation length and invulnerability timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HurtProfile {
    /// Frames in the hurt animation; knockback starts at this speed.
    pub frames: u32,
    /// Cadence of the hurt animation.
    pub frame_ms: u64,
}

impl HurtProfile {
    /// Length of the invulnerability window: `(frames + 1) * frame_ms`.
    #[must_use]
    pub fn cooldown_ms(&self) -> u64 {
        (u64::from(self.frames) + 1) * self.frame_ms
    }

    /// Time until the last hurt frame completes.
    #[must_use]
    pub fn animation_ms(&self) -> u64 {
        u64::from(self.frames) * self.frame_ms
    }

    /// Knockback speed `elapsed_ms` after the hit.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn speed_at(&self, elapsed_ms: u64) -> f32 {
        let frames = self.frames as f32;
        if self.frame_ms == 0 || elapsed_ms >= self.animation_ms() {
            return 0.0;
        }
        let elapsed_frames = elapsed_ms as f32 / self.frame_ms as f32;
        (frames - elapsed_frames.min(frames)).max(0.0)
    }
}

/// Where a hit came from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DamageSource {
    /// Vector from the victim toward the source; `None` for static sources.
    pub toward: Option<Vec2>,
    /// Hurt variant to enter.
    pub kind: HurtKind,
}

impl DamageSource {
    /// Body contact. The hurt variant follows the dominant axis of `toward`.
    #[must_use]
    pub fn contact(toward: Vec2) -> Self {
        let kind = match Facing::from_vector(toward).map(Facing::axis) {
            Some(Axis::Vertical) => HurtKind::Vertical,
            _ => HurtKind::Horizontal,
        };
        Self {
            toward: Some(toward),
            kind,
        }
    }

    /// Struck by a particle located `toward` from the victim.
    #[must_use]
    pub fn particle(toward: Vec2) -> Self {
        Self {
            toward: Some(toward),
            kind: HurtKind::Particle,
        }
    }

    /// Hit with no known direction; knockback goes opposite the victim's facing.
    #[must_use]
    pub fn unspecified(kind: HurtKind) -> Self {
        Self { toward: None, kind }
    }
}

/// Result of [`Actor::take_damage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageOutcome {
    /// The hit was ignored.
    Ignored,
    /// Health was removed.
    Hurt {
        /// Health reached zero.
        lethal: bool,
        /// Hit points actually removed.
        dealt: i32,
    },
}

impl DamageOutcome {
    /// True if health changed.
    #[must_use]
    pub fn landed(self) -> bool {
        matches!(self, DamageOutcome::Hurt { .. })
    }
}

// =============================================================================
// Actor
// =============================================================================

/// State shared by the player and monsters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Actor {
    /// Visual rectangle.
    pub rect: Rect,
    /// Collision rectangle, centered in `rect`.
    pub hitbox: Rect,
    /// Sprite facing.
    pub facing: Facing,
    /// Unit movement direction.
    pub direction: Vec2,
    /// Current state.
    pub state: ActorState,
    /// Time the current state was entered.
    pub state_started_ms: u64,
    /// Hit points.
    pub health: Health,
    /// Damage is ignored while set.
    pub invulnerable: bool,
    /// Walking speed.
    pub base_speed: f32,
    /// Current speed; knockback speed while hurt.
    pub speed: f32,
    /// Hurt timing.
    pub hurt: HurtProfile,
    /// Unit knockback direction of the current hit.
    pub knockback: Vec2,
    /// Image to draw.
    pub image: SpriteId,
    /// Sprite groups it is registered in.
    pub groups: SpriteGroups,
    /// When an ambient direction re-roll is due.
    pub direction_deadline_ms: u64,
    animator: Animator,
}

impl Actor {
    /// Creates an idle actor with its hitbox centered in `rect`.
    #[must_use]
    pub fn new(
        rect: Rect,
        hitbox_size: Vec2,
        health: i32,
        speed: f32,
        hurt: HurtProfile,
        now_ms: u64,
    ) -> Self {
        Self {
            rect,
            hitbox: Rect::from_center(rect.center(), hitbox_size),
            facing: Facing::Down,
            direction: Facing::Down.vector(),
            state: ActorState::Idle,
            state_started_ms: now_ms,
            health: Health::new(health),
            invulnerable: false,
            base_speed: speed,
            speed,
            hurt,
            knockback: Vec2::ZERO,
            image: SpriteId::default(),
            groups: SpriteGroups::default(),
            direction_deadline_ms: now_ms,
            animator: Animator::new(100, now_ms),
        }
    }

    /// Center of the hitbox.
    #[must_use]
    pub fn center(&self) -> Vec2 {
        self.hitbox.center()
    }

    /// Time spent in the current state.
    #[must_use]
    pub fn time_in_state(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.state_started_ms)
    }

    /// Current animation cursor.
    #[must_use]
    pub fn animator(&self) -> &Animator {
        &self.animator
    }

    /// Switches state, restarting the state timer if it changed.
    pub fn set_state(&mut self, state: ActorState, now_ms: u64) {
        if self.state != state {
            trace!(from = %self.state, to = %state, "actor state");
            self.state = state;
            self.state_started_ms = now_ms;
        }
    }

    /// Restarts the animation with a new cadence.
    pub fn play(&mut self, cadence: Cadence, now_ms: u64) {
        self.animator.play(cadence, now_ms);
    }

    /// Switches state and restarts the animation.
    pub fn enter(&mut self, state: ActorState, cadence: Cadence, now_ms: u64) {
        self.set_state(state, now_ms);
        self.play(cadence, now_ms);
    }

    /// Advances the animation for `motion` in the current facing.
    ///
    /// Falls back to the idle sequence; returns `None` if neither exists.
    pub fn animate(
        &mut self,
        set: &AnimationSet,
        motion: Motion,
        now_ms: u64,
    ) -> Option<Playback<SpriteId>> {
        let sequence = set.get_or_idle(motion, self.facing)?;
        let playback = self.animator.tick(sequence, now_ms);
        self.image = playback.image;
        Some(playback)
    }

    /// Turns to `facing` and points the direction vector along it.
    pub fn face(&mut self, facing: Facing) {
        self.facing = facing;
        self.direction = facing.vector();
    }

    /// Points the direction vector at `target` and snaps the facing to its dominant axis.
    pub fn face_towards(&mut self, target: Vec2) {
        let delta = target - self.center();
        if let Some(facing) = Facing::from_vector(delta) {
            self.facing = facing;
            self.direction = delta.normalize_or_zero();
        }
    }

    /// Points away from `target`, snapping the facing to the dominant axis.
    pub fn face_away_from(&mut self, target: Vec2) {
        let delta = self.center() - target;
        if let Some(facing) = Facing::from_vector(delta) {
            self.facing = facing;
            self.direction = delta.normalize_or_zero();
        }
    }

    /// Faces the direction named by `label`.
    ///
    /// An unknown label is logged and ignored; returns false in that case.
    pub fn face_label(&mut self, label: &str) -> bool {
        match Facing::from_str(label) {
            Ok(facing) => {
                self.face(facing);
                true
            }
            Err(err) => {
                warn!(%err, "movement skipped");
                false
            }
        }
    }

    /// Picks a random cardinal direction and schedules the next re-roll.
    pub fn reroll_direction<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        now_ms: u64,
        interval_ms: (u64, u64),
    ) {
        if let Some(facing) = Facing::ALL.choose(rng) {
            self.face(*facing);
        }
        self.direction_deadline_ms = now_ms + roll_cooldown(rng, interval_ms);
    }

    /// Moves by `velocity` with axis-separated collision against `solids`.
    pub fn step(&mut self, velocity: Vec2, solids: &[Rect]) -> Blocked {
        let blocked = CollisionResolver::move_and_resolve(&mut self.hitbox, velocity, solids);
        self.sync_rect();
        blocked
    }

    /// Re-centers the visual rectangle on the hitbox.
    pub fn sync_rect(&mut self) {
        self.rect.set_center(self.hitbox.center());
    }

    /// Places the actor so its hitbox is centered on `center`.
    pub fn teleport(&mut self, center: Vec2) {
        self.hitbox.set_center(center);
        self.sync_rect();
    }

    /// Applies a hit.
    ///
    /// Ignored while spawning, dying, hurt or invulnerable. Health is clamped
    /// at zero; a lethal hit still enters `Hurt` and the owner notices the
    /// depleted health on its next update.
    pub fn take_damage(&mut self, amount: i32, source: DamageSource, now_ms: u64) -> DamageOutcome {
        if self.invulnerable
            || self.state.is_hurt()
            || matches!(self.state, ActorState::Spawning | ActorState::Dying)
        {
            return DamageOutcome::Ignored;
        }

        let away = source
            .toward
            .and_then(Facing::from_vector)
            .map_or_else(|| self.facing.opposite(), Facing::opposite);
        self.knockback = away.vector();

        let dealt = self.health.damage(amount);
        self.invulnerable = true;
        self.speed = self.hurt.speed_at(0);
        self.set_state(ActorState::Hurt(source.kind), now_ms);

        DamageOutcome::Hurt {
            lethal: self.health.is_depleted(),
            dealt,
        }
    }

    /// Advances the hurt timer. Returns true on the tick the window closes.
    ///
    /// Speed follows the knockback decay while the window is open; once it
    /// closes invulnerability is cleared and speed returns to the base speed.
    /// The caller chooses the state to return to.
    pub fn update_hurt(&mut self, now_ms: u64) -> bool {
        if !self.state.is_hurt() {
            return false;
        }
        let elapsed = self.time_in_state(now_ms);
        if elapsed >= self.hurt.cooldown_ms() {
            self.invulnerable = false;
            self.speed = self.base_speed;
            self.knockback = Vec2::ZERO;
            return true;
        }
        self.speed = self.hurt.speed_at(elapsed);
        false
    }

    /// Knockback displacement for this tick.
    #[must_use]
    pub fn knockback_velocity(&self) -> Vec2 {
        self.knockback * self.speed
    }

    /// Pushes every timer forward by `delta_ms`, freezing the actor while paused.
    pub fn shift_timers(&mut self, delta_ms: u64) {
        self.state_started_ms += delta_ms;
        self.direction_deadline_ms += delta_ms;
        self.animator.shift(delta_ms);
    }
}

/// Animation motion shown for a state.
#[must_use]
pub fn motion_for(state: ActorState) -> Motion {
    match state {
        ActorState::Idle | ActorState::Warping => Motion::Idle,
        ActorState::Walking | ActorState::Hurt(_) | ActorState::Stairs => Motion::Walk,
        ActorState::Acting(ActionSlot::SwordA) | ActorState::Attacking => Motion::Attack,
        ActorState::Acting(ActionSlot::ItemB) => Motion::Item,
        ActorState::Spawning => Motion::Spawn,
        ActorState::Dying => Motion::Die,
        ActorState::Diving => Motion::Dive,
        ActorState::Rising => Motion::Rise,
        ActorState::Gray => Motion::Gray,
        ActorState::Spinning => Motion::Spin,
        ActorState::Triforce => Motion::Triforce,
    }
}

/// Uniform draw from `[min, max)`; `min` when the range is empty.
pub fn roll_cooldown<R: Rng + ?Sized>(rng: &mut R, (min, max): (u64, u64)) -> u64 {
    if max > min {
        rng.gen_range(min..max)
    } else {
        min
    }
}

// =============================================================================
// Tests
// =============================================================================
