//! Generic monster state machine.
//!
//! One [`Monster`] type serves every species; the [`SpeciesConfig`] decides
//! how it targets, what it fires and whether it dives.
//!
//! # States
//!
//! ```text
//! Spawning ──anim done──▶ Walking ──cooldown──▶ Attacking ──hold──▶ Walking
//!                           │  ▲
//!                    above  │  │ anim done
//!                           ▼  │
//!                        Diving ─▶ Idle (submerged) ──below──▶ Rising
//!
//! any (not Spawning/Dying) ──hit──▶ Hurt ──cooldown──▶ Walking
//! health depleted ──▶ Dying ──anim done──▶ reapable
//! ```
//!
//! While submerged a diver is invulnerable, hidden and out of combat, but its
//! timers keep running. While the game is paused [`Monster::shift_timers`]
//! pushes every reference time forward so nothing progresses.

use glam::Vec2;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::actor::{motion_for, roll_cooldown, Actor, DamageOutcome, DamageSource};
use crate::animation::{AnimationSet, Cadence};
use crate::backend::SoundCue;
use crate::entity::{ActorState, EntityId, SpriteGroups};
use crate::events::{EventLog, GameEvent};
use crate::geometry::Rect;
use crate::particle::{Owner, ParticleSpec};
use crate::species::{Species, SpeciesConfig, TargetingPolicy};

/// Frames in the spawn cloud, death burst and dive animations.
const EFFECT_FRAMES: usize = 3;

/// World state a monster reads during its update.
#[derive(Debug, Clone, Copy)]
pub struct MonsterContext<'a> {
    /// Current time.
    pub now_ms: u64,
    /// Center of the player's hitbox.
    pub player_center: Vec2,
    /// Hitboxes that block this monster's collision profile.
    pub solids: &'a [Rect],
    /// Tiles a relocating diver may rise on.
    pub habitat: &'a [Rect],
}

/// A live monster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Monster {
    /// Id in the level's monster collection.
    pub id: EntityId,
    /// Shared actor record.
    pub actor: Actor,
    /// Species.
    pub species: Species,
    /// Behavior parameters.
    pub config: SpeciesConfig,
    attack_reference_ms: u64,
    attack_cooldown_ms: u64,
    surfaced_since_ms: u64,
    reapable: bool,
}

impl Monster {
    /// Spawns a monster centered on `center`, starting with its spawn cloud.
    pub fn spawn<R: Rng + ?Sized>(
        id: EntityId,
        species: Species,
        center: Vec2,
        now_ms: u64,
        rng: &mut R,
    ) -> Self {
        let config = species.config();
        let rect = Rect::from_center(center, Vec2::splat(config.size));
        let mut actor = Actor::new(
            rect,
            Vec2::splat(config.hitbox),
            config.health,
            config.speed,
            config.hurt,
            now_ms,
        );
        actor.enter(
            ActorState::Spawning,
            Cadence::once(config.spawn_frame_ms, EFFECT_FRAMES),
            now_ms,
        );
        let attack_cooldown_ms = config
            .attack
            .map_or(0, |attack| roll_cooldown(rng, attack.cooldown_ms));
        debug!(%id, %species, x = center.x, y = center.y, "monster spawned");
        Self {
            id,
            actor,
            species,
            config,
            attack_reference_ms: now_ms,
            attack_cooldown_ms,
            surfaced_since_ms: now_ms,
            reapable: false,
        }
    }

    /// True once the death animation has finished.
    #[must_use]
    pub fn is_reapable(&self) -> bool {
        self.reapable
    }

    /// True while hidden under water or ground.
    #[must_use]
    pub fn is_submerged(&self) -> bool {
        self.config.dive.is_some() && self.actor.state == ActorState::Idle
    }

    /// True while touching the monster hurts the player.
    #[must_use]
    pub fn deals_contact_damage(&self) -> bool {
        self.actor.groups.contains(SpriteGroups::COLLIDABLE)
            && !matches!(
                self.actor.state,
                ActorState::Spawning | ActorState::Dying | ActorState::Diving | ActorState::Rising
            )
            && !self.is_submerged()
    }

    /// Attack cooldown currently being waited on.
    #[must_use]
    pub fn attack_cooldown_ms(&self) -> u64 {
        self.attack_cooldown_ms
    }

    /// Applies a hit, recording the result.
    pub fn take_damage(
        &mut self,
        amount: i32,
        source: DamageSource,
        now_ms: u64,
        events: &mut EventLog,
    ) -> DamageOutcome {
        let outcome = self.actor.take_damage(amount, source, now_ms);
        if let DamageOutcome::Hurt { lethal, dealt } = outcome {
            events.push(GameEvent::MonsterHurt {
                monster: self.id,
                amount: dealt,
            });
            if !lethal {
                events.sound(SoundCue::EnemyHit);
            }
        }
        outcome
    }

    /// Pushes every timer forward, freezing the monster while paused.
    pub fn shift_timers(&mut self, delta_ms: u64) {
        self.actor.shift_timers(delta_ms);
        self.attack_reference_ms += delta_ms;
        self.surfaced_since_ms += delta_ms;
    }

    /// Kills the monster outright, skipping the hurt state.
    pub fn kill(&mut self, now_ms: u64, events: &mut EventLog) {
        if self.actor.state != ActorState::Dying {
            self.actor.health.damage(self.actor.health.current());
            self.start_dying(now_ms, events);
        }
    }

    /// Advances the monster by one tick.
    ///
    /// Returns the particle to spawn if the monster attacked this tick.
    pub fn update<R: Rng + ?Sized>(
        &mut self,
        ctx: &MonsterContext<'_>,
        animations: &AnimationSet,
        rng: &mut R,
        events: &mut EventLog,
    ) -> Option<ParticleSpec> {
        let now = ctx.now_ms;
        let state = self.actor.state;
        self.actor.animate(animations, motion_for(state), now);
        let finished = self.actor.animator().is_finished();

        if state == ActorState::Dying {
            if finished && !self.reapable {
                debug!(id = %self.id, species = %self.species, "monster reapable");
                self.reapable = true;
            }
            return None;
        }
        if self.actor.health.is_depleted() {
            self.start_dying(now, events);
            return None;
        }

        match state {
            ActorState::Spawning if finished => self.start_walking(now, rng),
            ActorState::Hurt(_) => {
                let knockback = self.actor.knockback_velocity();
                self.actor.step(knockback, ctx.solids);
                if self.actor.update_hurt(now) {
                    self.start_walking(now, rng);
                }
            }
            ActorState::Attacking => {
                let hold = self.config.attack.map_or(0, |attack| attack.hold_ms());
                if self.actor.time_in_state(now) >= hold {
                    self.actor.enter(
                        ActorState::Walking,
                        Cadence::looping(self.config.walk_frame_ms, 2),
                        now,
                    );
                }
            }
            ActorState::Walking => return self.walk(ctx, rng),
            ActorState::Diving if finished => {
                self.actor.set_state(ActorState::Idle, now);
                self.actor.groups = SpriteGroups::empty();
            }
            ActorState::Idle => self.update_submerged(ctx, rng),
            ActorState::Rising if finished => {
                self.start_walking(now, rng);
                self.actor.invulnerable = false;
            }
            _ => {}
        }
        None
    }

    fn walk<R: Rng + ?Sized>(
        &mut self,
        ctx: &MonsterContext<'_>,
        rng: &mut R,
    ) -> Option<ParticleSpec> {
        let now = ctx.now_ms;

        if let Some(dive) = self.config.dive {
            if now.saturating_sub(self.surfaced_since_ms) >= dive.above_ms {
                self.actor.enter(
                    ActorState::Diving,
                    Cadence::once(dive.transition_frame_ms, 2),
                    now,
                );
                self.actor.invulnerable = true;
                self.actor.groups.remove(SpriteGroups::COLLIDABLE);
                return None;
            }
        }

        match self.config.targeting {
            TargetingPolicy::Ambient => {
                if now >= self.actor.direction_deadline_ms {
                    self.actor
                        .reroll_direction(rng, now, self.config.direction_interval_ms);
                }
            }
            TargetingPolicy::Seeking => self.actor.face_towards(ctx.player_center),
            TargetingPolicy::Evasive => self.actor.face_away_from(ctx.player_center),
        }

        if let Some(attack) = self.config.attack {
            if now.saturating_sub(self.attack_reference_ms) >= self.attack_cooldown_ms {
                let mut spec = ParticleSpec::new(
                    attack.payload,
                    Owner::Monster(self.id),
                    self.actor.hitbox,
                    self.actor.facing,
                    attack.damage,
                );
                if self.config.targeting != TargetingPolicy::Ambient {
                    spec = spec.aimed(ctx.player_center - self.actor.center());
                }
                self.attack_reference_ms = now;
                self.attack_cooldown_ms = roll_cooldown(rng, attack.cooldown_ms);
                self.actor.enter(
                    ActorState::Attacking,
                    Cadence::once(attack.animation_cooldown_ms, 1),
                    now,
                );
                debug!(id = %self.id, payload = ?attack.payload, "monster attacked");
                return Some(spec);
            }
        }

        let moves = self
            .config
            .dive
            .map_or(true, |dive| dive.moves_while_surfaced);
        if moves && self.actor.speed > 0.0 {
            let velocity = self.actor.direction * self.actor.speed;
            let blocked = self.actor.step(velocity, ctx.solids);
            if blocked.any() && self.config.targeting == TargetingPolicy::Ambient {
                self.actor
                    .reroll_direction(rng, now, self.config.direction_interval_ms);
            }
        }
        None
    }

    fn update_submerged<R: Rng + ?Sized>(&mut self, ctx: &MonsterContext<'_>, rng: &mut R) {
        let Some(dive) = self.config.dive else {
            return;
        };
        if self.actor.time_in_state(ctx.now_ms) < dive.below_ms {
            return;
        }
        if dive.relocate_on_rise {
            if let Some(tile) = ctx.habitat.choose(rng) {
                self.actor.teleport(tile.center());
            }
        }
        self.actor.enter(
            ActorState::Rising,
            Cadence::once(dive.transition_frame_ms, 2),
            ctx.now_ms,
        );
        self.actor.groups = SpriteGroups::VISIBLE;
    }

    fn start_walking<R: Rng + ?Sized>(&mut self, now_ms: u64, rng: &mut R) {
        let was_surfacing = matches!(self.actor.state, ActorState::Spawning | ActorState::Rising);
        self.actor.enter(
            ActorState::Walking,
            Cadence::looping(self.config.walk_frame_ms, 2),
            now_ms,
        );
        self.actor.groups = SpriteGroups::default();
        if was_surfacing {
            self.surfaced_since_ms = now_ms;
            self.attack_reference_ms = now_ms;
            self.actor
                .reroll_direction(rng, now_ms, self.config.direction_interval_ms);
        }
    }

    fn start_dying(&mut self, now_ms: u64, events: &mut EventLog) {
        self.actor.enter(
            ActorState::Dying,
            Cadence::once(self.config.death_frame_ms, EFFECT_FRAMES),
            now_ms,
        );
        self.actor.groups.remove(SpriteGroups::COLLIDABLE);
        self.actor.invulnerable = true;
        events.sound(SoundCue::EnemyDie);
        events.push(GameEvent::MonsterDied {
            monster: self.id,
            species: self.species,
        });
        debug!(id = %self.id, species = %self.species, "monster died");
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::sprites::SpriteLibrary;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    struct Rig {
        library: SpriteLibrary,
        rng: ChaCha8Rng,
        events: EventLog,
        now: u64,
    }

    impl Rig {
        fn new() -> Self {
            Self {
                library: SpriteLibrary::from_settings(&Settings::default()).unwrap(),
                rng: ChaCha8Rng::seed_from_u64(11),
                events: EventLog::new(),
                now: 0,
            }
        }

        fn spawn(&mut self, species: Species) -> Monster {
            Monster::spawn(
                EntityId::new(1),
                species,
                Vec2::new(100.0, 100.0),
                self.now,
                &mut self.rng,
            )
        }

        fn tick(&mut self, monster: &mut Monster, player: Vec2, habitat: &[Rect]) -> Option<ParticleSpec> {
            self.now += 16;
            let ctx = MonsterContext {
                now_ms: self.now,
                player_center: player,
                solids: &[],
                habitat,
            };
            let set = self.library.species(monster.species).unwrap();
            monster.update(&ctx, set, &mut self.rng, &mut self.events)
        }

        fn run_until<F: Fn(&Monster) -> bool>(&mut self, monster: &mut Monster, done: F) {
            for _ in 0..2000 {
                if done(monster) {
                    return;
                }
                self.tick(monster, Vec2::new(200.0, 100.0), &[]);
            }
            panic!("condition never reached; state {}", monster.actor.state);
        }
    }

    mod lifecycle_tests {
        use super::*;

        #[test]
        fn test_spawn_then_walk() {
            let mut rig = Rig::new();
            let mut octorok = rig.spawn(Species::Octorok);
            assert_eq!(octorok.actor.state, ActorState::Spawning);
            assert!(!octorok.deals_contact_damage());
            rig.run_until(&mut octorok, |m| m.actor.state == ActorState::Walking);
            assert!(rig.now >= 300);
            assert!(octorok.deals_contact_damage());
        }

        #[test]
        fn test_spawning_ignores_damage() {
            let mut rig = Rig::new();
            let mut moblin = rig.spawn(Species::Moblin);
            let outcome = moblin.take_damage(100, DamageSource::contact(Vec2::X), 0, &mut rig.events);
            assert_eq!(outcome, DamageOutcome::Ignored);
            assert!(rig.events.is_empty());
        }

        #[test]
        fn test_death_then_reapable() {
            let mut rig = Rig::new();
            let mut octorok = rig.spawn(Species::Octorok);
            rig.run_until(&mut octorok, |m| m.actor.state == ActorState::Walking);
            octorok.take_damage(500, DamageSource::contact(Vec2::X), rig.now, &mut rig.events);
            assert_eq!(rig.events.count_sound(SoundCue::EnemyHit), 0);
            rig.tick(&mut octorok, Vec2::ZERO, &[]);
            assert_eq!(octorok.actor.state, ActorState::Dying);
            assert_eq!(rig.events.count_sound(SoundCue::EnemyDie), 1);
            assert!(!octorok.is_reapable());
            rig.run_until(&mut octorok, Monster::is_reapable);
            assert_eq!(rig.events.count_sound(SoundCue::EnemyDie), 1);
        }

        #[test]
        fn test_hurt_returns_to_walking() {
            let mut rig = Rig::new();
            let mut moblin = rig.spawn(Species::Moblin);
            rig.run_until(&mut moblin, |m| m.actor.state == ActorState::Walking);
            moblin.take_damage(128, DamageSource::contact(Vec2::X), rig.now, &mut rig.events);
            assert_eq!(rig.events.count_sound(SoundCue::EnemyHit), 1);
            let hit_at = rig.now;
            rig.run_until(&mut moblin, |m| m.actor.state == ActorState::Walking);
            assert!(rig.now - hit_at >= moblin.config.hurt.cooldown_ms());
            assert!(!moblin.actor.invulnerable);
        }
    }

    mod attack_tests {
        use super::*;

        #[test]
        fn test_attack_fires_and_rerolls_cooldown() {
            let mut rig = Rig::new();
            let mut octorok = rig.spawn(Species::Octorok);
            let mut shots = Vec::new();
            for _ in 0..800 {
                if let Some(spec) = rig.tick(&mut octorok, Vec2::ZERO, &[]) {
                    shots.push((rig.now, spec, octorok.attack_cooldown_ms()));
                }
            }
            assert!(shots.len() >= 2);
            for (_, spec, cooldown) in &shots {
                assert_eq!(spec.owner, Owner::Monster(EntityId::new(1)));
                assert!((1500..3500).contains(cooldown));
            }
            let gap = shots[1].0 - shots[0].0;
            assert!(gap >= shots[0].2);
        }

        #[test]
        fn test_goriya_holds_longer() {
            let mut rig = Rig::new();
            let mut goriya = rig.spawn(Species::Goriya);
            rig.run_until(&mut goriya, |m| m.actor.state == ActorState::Attacking);
            let start = rig.now;
            rig.run_until(&mut goriya, |m| m.actor.state == ActorState::Walking);
            assert!(rig.now - start >= 500);
        }

        #[test]
        fn test_paused_monster_never_attacks() {
            let mut rig = Rig::new();
            let mut octorok = rig.spawn(Species::Octorok);
            rig.run_until(&mut octorok, |m| m.actor.state == ActorState::Walking);
            let state = octorok.actor.state;
            for _ in 0..600 {
                rig.now += 16;
                octorok.shift_timers(16);
            }
            assert_eq!(octorok.actor.state, state);
            let fired = rig.tick(&mut octorok, Vec2::ZERO, &[]);
            assert!(fired.is_none());
        }
    }

    mod dive_tests {
        use super::*;

        #[test]
        fn test_zora_dives_and_relocates() {
            let mut rig = Rig::new();
            let mut zora = rig.spawn(Species::Zora);
            let lake = [Rect::new(300.0, 300.0, 16.0, 16.0)];
            for _ in 0..2000 {
                rig.tick(&mut zora, Vec2::new(0.0, 0.0), &lake);
                if zora.is_submerged() {
                    break;
                }
            }
            assert!(zora.is_submerged());
            assert!(zora.actor.invulnerable);
            assert!(!zora.actor.groups.contains(SpriteGroups::VISIBLE));
            assert!(!zora.deals_contact_damage());
            let outcome = zora.take_damage(10, DamageSource::contact(Vec2::X), rig.now, &mut rig.events);
            assert_eq!(outcome, DamageOutcome::Ignored);

            for _ in 0..2000 {
                rig.tick(&mut zora, Vec2::new(0.0, 0.0), &lake);
                if zora.actor.state == ActorState::Walking {
                    break;
                }
            }
            assert_eq!(zora.actor.state, ActorState::Walking);
            assert_eq!(zora.actor.center(), lake[0].center());
            assert!(!zora.actor.invulnerable);
        }

        #[test]
        fn test_leever_seeks_player() {
            let mut rig = Rig::new();
            let mut leever = rig.spawn(Species::Leever);
            rig.run_until(&mut leever, |m| m.actor.state == ActorState::Walking);
            let before = leever.actor.center();
            let player = before + Vec2::new(-100.0, 0.0);
            for _ in 0..10 {
                rig.tick(&mut leever, player, &[]);
            }
            assert!(leever.actor.center().x < before.x);
            assert_eq!(leever.actor.facing, crate::geometry::Facing::Left);
        }

        #[test]
        fn test_peahat_flees_player() {
            let mut rig = Rig::new();
            let mut peahat = rig.spawn(Species::Peahat);
            rig.run_until(&mut peahat, |m| m.actor.state == ActorState::Walking);
            let before = peahat.actor.center();
            let player = before + Vec2::new(0.0, -60.0);
            for _ in 0..10 {
                rig.tick(&mut peahat, player, &[]);
            }
            assert!(peahat.actor.center().y > before.y);
            assert_eq!(peahat.actor.center().x, before.x);
            assert_eq!(peahat.actor.facing, crate::geometry::Facing::Down);
        }
    }
}
