//! Particles: sword swings, projectiles, flames, bombs and fairies.
//!
//! A particle is created from a [`ParticleSpec`] that an actor's attack
//! produces, lives in the level's particle collection, and leaves it when it
//! expires on its own or is consumed by a collision.
//!
//! # Lifecycle by kind
//!
//! | Kind      | Start     | Ends when                                           |
//! |-----------|-----------|-----------------------------------------------------|
//! | Sword     | Flying    | the owner's swing ends (held in front of the owner)  |
//! | Arrow     | Flying    | wall, range or lifetime                             |
//! | Rock      | Flying    | wall, range or lifetime                             |
//! | Magic     | Flying    | wall, range or lifetime                             |
//! | Flame     | Flying    | lifetime; rests in place after wall or range        |
//! | Bomb      | Fuse      | explosion finishes                                  |
//! | Boomerang | Flying    | caught by its owner after returning                 |
//! | Fairy     | Flying    | touches the player or lifetime; turns at walls      |

use bitflags::bitflags;
use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::animation::{Animator, SpriteId};
use crate::backend::SoundCue;
use crate::entity::{EntityId, SpriteGroups};
use crate::events::EventLog;
use crate::geometry::{Facing, Rect};

/// Bomb fuse length.
pub const BOMB_FUSE_MS: u64 = 1000;
/// Explosion length.
pub const BOMB_BLAST_MS: u64 = 300;
/// Edge length of the explosion hitbox.
pub const BOMB_BLAST_SIZE: f32 = 40.0;

// =============================================================================
// Kinds & Flags
// =============================================================================

/// Every particle kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticleKind {
    /// Player sword swing.
    Sword,
    /// Moblin arrow.
    Arrow,
    /// Octorok rock.
    Rock,
    /// Zora magic.
    Magic,
    /// Candle flame.
    Flame,
    /// Placed bomb.
    Bomb,
    /// Thrown boomerang.
    Boomerang,
    /// Fairy released by a loot drop; heals the player on contact.
    Fairy,
}

/// Movement and lifetime constants of a particle kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleStats {
    /// Hitbox size.
    pub size: Vec2,
    /// Pixels per tick.
    pub speed: f32,
    /// Distance before the range behavior kicks in; 0 for none.
    pub range: f32,
    /// Hard lifetime; 0 for none.
    pub lifetime_ms: u64,
}

impl ParticleKind {
    /// Every kind.
    pub const ALL: [ParticleKind; 8] = [
        ParticleKind::Sword,
        ParticleKind::Arrow,
        ParticleKind::Rock,
        ParticleKind::Magic,
        ParticleKind::Flame,
        ParticleKind::Bomb,
        ParticleKind::Boomerang,
        ParticleKind::Fairy,
    ];

    /// Movement and lifetime constants.
    #[must_use]
    pub fn stats(self) -> ParticleStats {
        let (size, speed, range, lifetime_ms) = match self {
            ParticleKind::Sword => (12.0, 0.0, 0.0, 0),
            ParticleKind::Arrow => (8.0, 4.0, 256.0, 3000),
            ParticleKind::Rock => (8.0, 3.0, 256.0, 3000),
            ParticleKind::Magic => (10.0, 2.5, 320.0, 4000),
            ParticleKind::Flame => (14.0, 1.5, 32.0, 1200),
            ParticleKind::Bomb => (12.0, 0.0, 0.0, 0),
            ParticleKind::Boomerang => (8.0, 3.5, 96.0, 5000),
            ParticleKind::Fairy => (8.0, 0.75, 0.0, 8000),
        };
        ParticleStats {
            size: Vec2::splat(size),
            speed,
            range,
            lifetime_ms,
        }
    }

    /// Flags a particle of this kind starts with.
    #[must_use]
    pub fn default_flags(self, owner: Owner) -> ParticleFlags {
        if self == ParticleKind::Fairy {
            return ParticleFlags::AFFECTS_PLAYER | ParticleFlags::BENEFICIAL;
        }
        let mut flags = ParticleFlags::empty();
        if matches!(owner, Owner::Monster(_)) {
            flags |= ParticleFlags::AFFECTS_PLAYER;
        }
        match self {
            ParticleKind::Magic => flags | ParticleFlags::BYPASSES_SHIELD,
            ParticleKind::Boomerang => flags | ParticleFlags::RETURNING,
            _ => flags,
        }
    }

    /// Offset of this kind's frames in the particle sheet.
    #[must_use]
    pub fn sheet_slot(self) -> u32 {
        match self {
            ParticleKind::Sword => 0,
            ParticleKind::Arrow => 4,
            ParticleKind::Rock => 8,
            ParticleKind::Magic => 10,
            ParticleKind::Flame => 12,
            ParticleKind::Bomb => 14,
            ParticleKind::Boomerang => 18,
            ParticleKind::Fairy => 22,
        }
    }
}

bitflags! {
    /// Behavior flags of a particle.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct ParticleFlags: u8 {
        /// Can hit the player.
        const AFFECTS_PLAYER = 1 << 0;
        /// Passes through the shield.
        const BYPASSES_SHIELD = 1 << 1;
        /// Flies back to its owner instead of being destroyed.
        const RETURNING = 1 << 2;
        /// Heals the player on contact instead of hurting.
        const BENEFICIAL = 1 << 3;
    }
}

/// Who created a particle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Owner {
    /// The player.
    Player,
    /// A monster.
    Monster(EntityId),
}

/// Lifecycle phase of a particle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParticlePhase {
    /// Moving outward (or held in front of the owner for a sword).
    Flying,
    /// Homing back to the owner.
    Returning,
    /// Stopped in place until its lifetime ends.
    Resting,
    /// Bomb waiting to explode.
    Fuse,
    /// Bomb exploding.
    Exploding,
    /// Waiting to be removed.
    Expired,
}

// =============================================================================
// Spawn Request
// =============================================================================

/// Request to create a particle, produced by an attack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticleSpec {
    /// Kind to create.
    pub kind: ParticleKind,
    /// Creator.
    pub owner: Owner,
    /// Owner hitbox at the time of the attack.
    pub origin: Rect,
    /// Side of the owner the particle appears on.
    pub facing: Facing,
    /// Unit travel direction.
    pub direction: Vec2,
    /// Damage on hit (or healing for beneficial particles).
    pub damage: i32,
    /// Behavior flags.
    pub flags: ParticleFlags,
}

impl ParticleSpec {
    /// A particle travelling along `facing` with the kind's default flags.
    #[must_use]
    pub fn new(kind: ParticleKind, owner: Owner, origin: Rect, facing: Facing, damage: i32) -> Self {
        Self {
            kind,
            owner,
            origin,
            facing,
            direction: facing.vector(),
            damage,
            flags: kind.default_flags(owner),
        }
    }

    /// Overrides the travel direction (normalized; zero keeps the facing).
    #[must_use]
    pub fn aimed(mut self, direction: Vec2) -> Self {
        let direction = direction.normalize_or_zero();
        if direction != Vec2::ZERO {
            self.direction = direction;
        }
        self
    }

}

/// What a particle needs to know about its owner each tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OwnerView {
    /// Owner hitbox.
    pub hitbox: Rect,
    /// Owner facing.
    pub facing: Facing,
}

// =============================================================================
// Particle
// =============================================================================

/// A live particle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Particle {
    /// Kind.
    pub kind: ParticleKind,
    /// Creator.
    pub owner: Owner,
    /// Collision rectangle.
    pub hitbox: Rect,
    /// Unit travel direction.
    pub direction: Vec2,
    /// Pixels per tick.
    pub speed: f32,
    /// Damage on hit, or healing for beneficial particles.
    pub damage: i32,
    /// Behavior flags.
    pub flags: ParticleFlags,
    /// Sprite groups it is registered in.
    pub groups: SpriteGroups,
    /// Facing used to pick sprites.
    pub facing: Facing,
    /// Image to draw.
    pub image: SpriteId,
    animator: Animator,
    phase: ParticlePhase,
    spawned_ms: u64,
    phase_started_ms: u64,
    travelled: f32,
}

impl Particle {
    /// Creates a particle in front of its owner.
    #[must_use]
    pub fn spawn(spec: &ParticleSpec, now_ms: u64) -> Self {
        let stats = spec.kind.stats();
        let hitbox = Rect::from_center(
            in_front_of(spec.origin, spec.facing, stats.size),
            stats.size,
        );
        let phase = if spec.kind == ParticleKind::Bomb {
            ParticlePhase::Fuse
        } else {
            ParticlePhase::Flying
        };
        Self {
            kind: spec.kind,
            owner: spec.owner,
            hitbox,
            direction: spec.direction,
            speed: stats.speed,
            damage: spec.damage,
            flags: spec.flags,
            groups: SpriteGroups::default(),
            facing: spec.facing,
            image: SpriteId::default(),
            animator: Animator::new(80, now_ms),
            phase,
            spawned_ms: now_ms,
            phase_started_ms: now_ms,
            travelled: 0.0,
        }
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> ParticlePhase {
        self.phase
    }

    /// Center of the hitbox.
    #[must_use]
    pub fn center(&self) -> Vec2 {
        self.hitbox.center()
    }

    /// True once the particle should be removed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.phase == ParticlePhase::Expired
    }

    /// True while contact with a target deals damage.
    #[must_use]
    pub fn is_harmful(&self) -> bool {
        self.damage > 0
            && !self.flags.contains(ParticleFlags::BENEFICIAL)
            && matches!(
                self.phase,
                ParticlePhase::Flying
                    | ParticlePhase::Returning
                    | ParticlePhase::Resting
                    | ParticlePhase::Exploding
            )
    }

    /// True for particles that are spent on the first target they touch.
    #[must_use]
    pub fn is_consumed_on_hit(&self) -> bool {
        matches!(
            self.kind,
            ParticleKind::Arrow | ParticleKind::Rock | ParticleKind::Magic
        )
    }

    /// Marks the particle for removal.
    pub fn expire(&mut self) {
        self.phase = ParticlePhase::Expired;
    }

    /// Starts flying back to the owner; non-returning particles expire instead.
    pub fn start_return(&mut self, now_ms: u64) {
        if self.flags.contains(ParticleFlags::RETURNING) {
            self.set_phase(ParticlePhase::Returning, now_ms);
        } else {
            self.expire();
        }
    }

    /// Shield deflection: returning particles turn back harmless, others are destroyed.
    pub fn deflect(&mut self, now_ms: u64) {
        if self.flags.contains(ParticleFlags::RETURNING) {
            self.direction = -self.direction;
            self.damage = 0;
            self.set_phase(ParticlePhase::Returning, now_ms);
        } else {
            self.expire();
        }
    }

    /// Pushes every timer forward, freezing the particle while paused.
    pub fn shift(&mut self, delta_ms: u64) {
        self.spawned_ms += delta_ms;
        self.phase_started_ms += delta_ms;
        self.animator.shift(delta_ms);
    }

    /// Advances the particle's lifecycle by one tick.
    ///
    /// `owner` is `None` once the owner has left the level. `solids` are the
    /// hitboxes that stop projectiles.
    pub fn update(
        &mut self,
        now_ms: u64,
        owner: Option<OwnerView>,
        solids: &[Rect],
        events: &mut EventLog,
    ) {
        let stats = self.kind.stats();
        match self.phase {
            ParticlePhase::Expired => return,
            ParticlePhase::Flying if self.kind == ParticleKind::Sword => match owner {
                Some(view) => {
                    self.facing = view.facing;
                    self.direction = view.facing.vector();
                    self.hitbox
                        .set_center(in_front_of(view.hitbox, view.facing, stats.size));
                }
                None => self.expire(),
            },
            ParticlePhase::Flying => {
                let step = self.direction * self.speed;
                self.hitbox.translate(step);
                self.travelled += self.speed;
                let hit_wall = solids.iter().any(|s| self.hitbox.intersects(s));
                let out_of_range = stats.range > 0.0 && self.travelled >= stats.range;
                if hit_wall && self.kind == ParticleKind::Fairy {
                    self.hitbox.translate(-step);
                    self.facing = self.facing.turned_clockwise();
                    self.direction = self.facing.vector();
                } else if hit_wall || out_of_range {
                    match self.kind {
                        ParticleKind::Boomerang => self.start_return(now_ms),
                        ParticleKind::Flame => {
                            if hit_wall {
                                self.hitbox.translate(-step);
                            }
                            self.set_phase(ParticlePhase::Resting, now_ms);
                        }
                        _ => self.expire(),
                    }
                }
            }
            ParticlePhase::Returning => match owner {
                Some(view) => {
                    let to_owner = (view.hitbox.center() - self.center()).normalize_or_zero();
                    self.direction = to_owner;
                    self.hitbox.translate(to_owner * self.speed);
                    if self.hitbox.intersects(&view.hitbox) {
                        self.expire();
                    }
                }
                None => self.expire(),
            },
            ParticlePhase::Resting => {}
            ParticlePhase::Fuse => {
                if now_ms.saturating_sub(self.phase_started_ms) >= BOMB_FUSE_MS {
                    self.hitbox =
                        Rect::from_center(self.center(), Vec2::splat(BOMB_BLAST_SIZE));
                    self.set_phase(ParticlePhase::Exploding, now_ms);
                    events.sound(SoundCue::BombBlow);
                }
            }
            ParticlePhase::Exploding => {
                if now_ms.saturating_sub(self.phase_started_ms) >= BOMB_BLAST_MS {
                    self.expire();
                }
            }
        }

        let timed = !matches!(self.phase, ParticlePhase::Fuse | ParticlePhase::Exploding);
        if timed
            && stats.lifetime_ms > 0
            && now_ms.saturating_sub(self.spawned_ms) >= stats.lifetime_ms
        {
            self.expire();
        }
    }

    /// Advances the particle's flicker animation over `frames`.
    pub fn animate(&mut self, frames: &[SpriteId], now_ms: u64) {
        if !frames.is_empty() {
            self.image = self.animator.tick(frames, now_ms).image;
        }
    }

    fn set_phase(&mut self, phase: ParticlePhase, now_ms: u64) {
        self.phase = phase;
        self.phase_started_ms = now_ms;
    }
}

/// Center of a `size` rectangle touching `origin` on its `facing` side.
fn in_front_of(origin: Rect, facing: Facing, size: Vec2) -> Vec2 {
    let reach = match facing {
        Facing::Up | Facing::Down => (origin.h + size.y) / 2.0,
        Facing::Left | Facing::Right => (origin.w + size.x) / 2.0,
    };
    origin.center() + facing.vector() * reach
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn owner_box() -> Rect {
        Rect::new(100.0, 100.0, 12.0, 12.0)
    }

    fn spawn(kind: ParticleKind, owner: Owner, facing: Facing) -> Particle {
        Particle::spawn(&ParticleSpec::new(kind, owner, owner_box(), facing, 128), 0)
    }

    mod spawn_tests {
        use super::*;

        #[test]
        fn test_spawns_touching_owner_side() {
            let p = spawn(ParticleKind::Rock, Owner::Monster(EntityId::new(1)), Facing::Right);
            assert_eq!(p.hitbox.left(), owner_box().right());
            assert_eq!(p.center().y, owner_box().center().y);
        }

        #[test]
        fn test_default_flags() {
            let monster = Owner::Monster(EntityId::new(1));
            assert_eq!(
                ParticleKind::Magic.default_flags(monster),
                ParticleFlags::AFFECTS_PLAYER | ParticleFlags::BYPASSES_SHIELD
            );
            assert_eq!(
                ParticleKind::Boomerang.default_flags(Owner::Player),
                ParticleFlags::RETURNING
            );
            assert!(ParticleKind::Sword.default_flags(Owner::Player).is_empty());
            assert_eq!(
                ParticleKind::Fairy.default_flags(monster),
                ParticleFlags::AFFECTS_PLAYER | ParticleFlags::BENEFICIAL
            );
        }

        #[test]
        fn test_fairy_is_never_harmful() {
            let p = spawn(ParticleKind::Fairy, Owner::Monster(EntityId::new(1)), Facing::Up);
            assert_eq!(p.phase(), ParticlePhase::Flying);
            assert!(!p.is_harmful());
        }

        #[test]
        fn test_bomb_starts_on_fuse() {
            let p = spawn(ParticleKind::Bomb, Owner::Player, Facing::Down);
            assert_eq!(p.phase(), ParticlePhase::Fuse);
            assert!(!p.is_harmful());
        }
    }

    mod lifecycle_tests {
        use super::*;

        #[test]
        fn test_arrow_expires_on_wall() {
            let mut p = spawn(ParticleKind::Arrow, Owner::Monster(EntityId::new(1)), Facing::Right);
            let wall = Rect::new(p.hitbox.right() + 2.0, 90.0, 16.0, 32.0);
            let mut events = EventLog::new();
            p.update(16, None, &[wall], &mut events);
            assert!(p.is_expired());
        }

        #[test]
        fn test_fairy_turns_at_wall_and_lives_out_its_lifetime() {
            let mut p = spawn(ParticleKind::Fairy, Owner::Monster(EntityId::new(1)), Facing::Right);
            let start = p.hitbox;
            let wall = Rect::new(p.hitbox.right() + 0.5, 90.0, 16.0, 32.0);
            let mut events = EventLog::new();
            p.update(16, None, &[wall], &mut events);
            assert!(!p.is_expired());
            assert_eq!(p.hitbox, start);
            assert_eq!(p.facing, Facing::Right.turned_clockwise());
            assert_eq!(p.direction, p.facing.vector());

            p.update(7999, None, &[], &mut events);
            assert!(!p.is_expired());
            p.update(8000, None, &[], &mut events);
            assert!(p.is_expired());
        }

        #[test]
        fn test_boomerang_returns_and_is_caught() {
            let owner = OwnerView {
                hitbox: owner_box(),
                facing: Facing::Right,
            };
            let mut p = spawn(ParticleKind::Boomerang, Owner::Player, Facing::Right);
            let mut events = EventLog::new();
            let mut now = 0;
            let mut saw_return = false;
            for _ in 0..200 {
                now += 16;
                p.update(now, Some(owner), &[], &mut events);
                saw_return |= p.phase() == ParticlePhase::Returning;
                if p.is_expired() {
                    break;
                }
            }
            assert!(saw_return);
            assert!(p.is_expired());
            assert!(now < 5000);
        }

        #[test]
        fn test_flame_rests_after_range() {
            let mut p = spawn(ParticleKind::Flame, Owner::Player, Facing::Up);
            let mut events = EventLog::new();
            for tick in 1..=30 {
                p.update(tick * 16, None, &[], &mut events);
            }
            assert_eq!(p.phase(), ParticlePhase::Resting);
            p.update(1200, None, &[], &mut events);
            assert!(p.is_expired());
        }

        #[test]
        fn test_bomb_fuse_then_blast() {
            let mut p = spawn(ParticleKind::Bomb, Owner::Player, Facing::Down);
            let mut events = EventLog::new();
            p.update(999, None, &[], &mut events);
            assert_eq!(p.phase(), ParticlePhase::Fuse);
            p.update(1000, None, &[], &mut events);
            assert_eq!(p.phase(), ParticlePhase::Exploding);
            assert_eq!(p.hitbox.size(), Vec2::splat(BOMB_BLAST_SIZE));
            assert_eq!(events.count_sound(SoundCue::BombBlow), 1);
            p.update(1300, None, &[], &mut events);
            assert!(p.is_expired());
        }

        #[test]
        fn test_sword_follows_owner() {
            let mut p = spawn(ParticleKind::Sword, Owner::Player, Facing::Right);
            let mut events = EventLog::new();
            let moved = OwnerView {
                hitbox: owner_box().offset(Vec2::new(0.0, 10.0)),
                facing: Facing::Down,
            };
            p.update(16, Some(moved), &[], &mut events);
            assert_eq!(p.hitbox.top(), moved.hitbox.bottom());
            p.update(32, None, &[], &mut events);
            assert!(p.is_expired());
        }

        #[test]
        fn test_deflect() {
            let mut rang = spawn(ParticleKind::Boomerang, Owner::Monster(EntityId::new(2)), Facing::Left);
            rang.deflect(10);
            assert_eq!(rang.phase(), ParticlePhase::Returning);
            assert_eq!(rang.damage, 0);
            assert_eq!(rang.direction, Vec2::new(1.0, 0.0));

            let mut rock = spawn(ParticleKind::Rock, Owner::Monster(EntityId::new(2)), Facing::Left);
            rock.deflect(10);
            assert!(rock.is_expired());
        }
    }
}
