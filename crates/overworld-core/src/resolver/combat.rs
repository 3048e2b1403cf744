//! Combat resolution for one tick.
//!
//! [`CombatResolver::resolve`] runs after every entity has moved and applies
//! the three kinds of contact in a fixed order:
//!
//! 1. Player particles against collidable monsters
//! 2. Hostile particles against the player, with the shield checked first
//! 3. Monster bodies against the player
//!
//! Particles and monsters are visited in id order. The invulnerability window
//! of whoever is struck decides whether a contact lands; a consumed particle
//! is only spent when its hit lands.
//!
//! # Shield
//!
//! A hostile particle is blocked when the player is standing or walking, the
//! particle touches the shield strip on the facing side, it travels against
//! the facing, and it does not carry `BYPASSES_SHIELD`. A returning particle
//! turns back harmless; any other is destroyed.

use std::collections::BTreeMap;

use tracing::trace;

use crate::actor::DamageSource;
use crate::backend::SoundCue;
use crate::entity::{EntityId, SpriteGroups};
use crate::events::{EventLog, GameEvent};
use crate::monster::Monster;
use crate::particle::{Owner, Particle, ParticleFlags, ParticleKind};
use crate::player::Player;

/// Contacts that landed during one resolution pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CombatReport {
    /// Player particle hits on monsters.
    pub monster_hits: u32,
    /// Hits on the player from particles or bodies.
    pub player_hits: u32,
    /// Particles stopped by the shield.
    pub blocked: u32,
}

/// Resolves contact damage between the player, monsters and particles.
#[derive(Debug, Clone, Copy, Default)]
pub struct CombatResolver;

impl CombatResolver {
    /// Applies every contact for this tick.
    pub fn resolve(
        now_ms: u64,
        player: &mut Player,
        monsters: &mut BTreeMap<EntityId, Monster>,
        particles: &mut BTreeMap<EntityId, Particle>,
        events: &mut EventLog,
    ) -> CombatReport {
        let mut report = CombatReport::default();
        Self::player_particles(now_ms, monsters, particles, events, &mut report);
        Self::hostile_particles(now_ms, player, particles, events, &mut report);
        Self::monster_contact(now_ms, player, monsters, events, &mut report);
        report
    }

    fn player_particles(
        now_ms: u64,
        monsters: &mut BTreeMap<EntityId, Monster>,
        particles: &mut BTreeMap<EntityId, Particle>,
        events: &mut EventLog,
        report: &mut CombatReport,
    ) {
        for particle in particles.values_mut() {
            if particle.owner != Owner::Player || !particle.is_harmful() {
                continue;
            }
            for monster in monsters.values_mut() {
                if !monster.actor.groups.contains(SpriteGroups::COLLIDABLE)
                    || monster.is_submerged()
                    || !particle.hitbox.intersects(&monster.actor.hitbox)
                {
                    continue;
                }
                let source = DamageSource::particle(particle.center() - monster.actor.center());
                if !monster.take_damage(particle.damage, source, now_ms, events).landed() {
                    continue;
                }
                report.monster_hits += 1;
                trace!(monster = %monster.id, kind = ?particle.kind, "monster struck");
                if particle.kind == ParticleKind::Boomerang {
                    particle.start_return(now_ms);
                }
                if particle.is_consumed_on_hit() {
                    particle.expire();
                }
                if !particle.is_harmful() {
                    break;
                }
            }
        }
    }

    fn hostile_particles(
        now_ms: u64,
        player: &mut Player,
        particles: &mut BTreeMap<EntityId, Particle>,
        events: &mut EventLog,
        report: &mut CombatReport,
    ) {
        if !player.actor.groups.contains(SpriteGroups::COLLIDABLE) {
            return;
        }
        for (id, particle) in particles.iter_mut() {
            if !particle.flags.contains(ParticleFlags::AFFECTS_PLAYER)
                || particle.is_expired()
                || !particle.hitbox.intersects(&player.actor.hitbox)
            {
                continue;
            }

            if particle.flags.contains(ParticleFlags::BENEFICIAL) {
                player.heal(particle.damage, events);
                particle.expire();
                continue;
            }
            if !particle.is_harmful() {
                continue;
            }

            let facing = player.actor.facing.vector();
            let blocked = !particle.flags.contains(ParticleFlags::BYPASSES_SHIELD)
                && player.can_block()
                && particle.hitbox.intersects(&player.shield_hitbox())
                && particle.direction.dot(facing) < 0.0;
            if blocked {
                particle.deflect(now_ms);
                events.push(GameEvent::ShieldBlocked { particle: *id });
                events.sound(SoundCue::Shield);
                report.blocked += 1;
                continue;
            }

            let source = DamageSource::particle(particle.center() - player.actor.center());
            if player.take_damage(particle.damage, source, now_ms, events).landed() {
                report.player_hits += 1;
                if particle.is_consumed_on_hit() {
                    particle.expire();
                }
            }
        }
    }

    fn monster_contact(
        now_ms: u64,
        player: &mut Player,
        monsters: &BTreeMap<EntityId, Monster>,
        events: &mut EventLog,
        report: &mut CombatReport,
    ) {
        if !player.actor.groups.contains(SpriteGroups::COLLIDABLE) {
            return;
        }
        for monster in monsters.values() {
            if player.actor.invulnerable {
                return;
            }
            if !monster.deals_contact_damage()
                || monster.actor.invulnerable
                || !monster.actor.hitbox.intersects(&player.actor.hitbox)
            {
                continue;
            }
            let source = DamageSource::contact(monster.actor.center() - player.actor.center());
            let damage = monster.config.collision_damage;
            if player.take_damage(damage, source, now_ms, events).landed() {
                report.player_hits += 1;
                trace!(monster = %monster.id, damage, "player touched monster");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec2;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::config::Settings;
    use crate::entity::{ActorState, HurtKind};
    use crate::geometry::Facing;
    use crate::particle::ParticleSpec;
    use crate::species::Species;

    fn walking_monster(id: u64, species: Species, center: Vec2) -> Monster {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut monster = Monster::spawn(EntityId::new(id), species, center, 0, &mut rng);
        monster.actor.set_state(ActorState::Walking, 0);
        monster
    }

    fn player_at(center: Vec2) -> Player {
        Player::new(center, &Settings::default(), 0)
    }

    fn hostile(kind: ParticleKind, at: Vec2, direction: Vec2) -> Particle {
        let origin = crate::geometry::Rect::from_center(at, Vec2::splat(1.0));
        let spec = ParticleSpec::new(kind, Owner::Monster(EntityId::new(99)), origin, Facing::Down, 128)
            .aimed(direction);
        let mut particle = Particle::spawn(&spec, 0);
        particle.hitbox.set_center(at);
        particle
    }

    mod contact_tests {
        use super::*;

        #[test]
        fn test_contact_hurts_and_knocks_back() {
            let mut player = player_at(Vec2::new(100.0, 100.0));
            player.actor.health = crate::entity::Health::with_current(256, 768);
            let mut monsters = BTreeMap::new();
            monsters.insert(
                EntityId::new(1),
                walking_monster(1, Species::Octorok, Vec2::new(110.0, 100.0)),
            );
            let mut particles = BTreeMap::new();
            let mut events = EventLog::new();

            let report = CombatResolver::resolve(16, &mut player, &mut monsters, &mut particles, &mut events);
            assert_eq!(report.player_hits, 1);
            assert_eq!(player.actor.health.current(), 128);
            assert_eq!(player.actor.state, ActorState::Hurt(HurtKind::Horizontal));
            assert!(player.actor.invulnerable);
            assert_eq!(player.actor.knockback, Vec2::new(-1.0, 0.0));
            assert_eq!(events.count_sound(SoundCue::LowHealth), 1);

            let report = CombatResolver::resolve(32, &mut player, &mut monsters, &mut particles, &mut events);
            assert_eq!(report.player_hits, 0);
            assert_eq!(player.actor.health.current(), 128);
            assert_eq!(events.count_sound(SoundCue::LowHealth), 1);
        }

        #[test]
        fn test_spawning_monster_is_harmless() {
            let mut player = player_at(Vec2::new(100.0, 100.0));
            let mut rng = ChaCha8Rng::seed_from_u64(1);
            let mut monsters = BTreeMap::new();
            monsters.insert(
                EntityId::new(1),
                Monster::spawn(EntityId::new(1), Species::Moblin, Vec2::new(104.0, 100.0), 0, &mut rng),
            );
            let mut events = EventLog::new();
            let report = CombatResolver::resolve(16, &mut player, &mut monsters, &mut BTreeMap::new(), &mut events);
            assert_eq!(report.player_hits, 0);
        }
    }

    mod particle_tests {
        use super::*;

        #[test]
        fn test_sword_hits_each_monster_once() {
            let mut player = player_at(Vec2::new(100.0, 100.0));
            let mut monsters = BTreeMap::new();
            monsters.insert(
                EntityId::new(1),
                walking_monster(1, Species::Moblin, Vec2::new(100.0, 114.0)),
            );
            let spec = ParticleSpec::new(
                ParticleKind::Sword,
                Owner::Player,
                player.actor.hitbox,
                Facing::Down,
                128,
            );
            let mut particles = BTreeMap::new();
            particles.insert(EntityId::new(2), Particle::spawn(&spec, 0));
            let mut events = EventLog::new();

            for now in [16, 32, 48] {
                CombatResolver::resolve(now, &mut player, &mut monsters, &mut particles, &mut events);
            }
            let monster = &monsters[&EntityId::new(1)];
            assert_eq!(monster.actor.health.current(), 128);
            assert_eq!(monster.actor.state, ActorState::Hurt(HurtKind::Particle));
            assert_eq!(events.count_sound(SoundCue::EnemyHit), 1);
        }

        #[test]
        fn test_shield_blocks_frontal_rock() {
            let mut player = player_at(Vec2::new(100.0, 100.0));
            player.actor.face(Facing::Right);
            let mut particles = BTreeMap::new();
            particles.insert(
                EntityId::new(5),
                hostile(ParticleKind::Rock, Vec2::new(106.0, 100.0), Vec2::new(-1.0, 0.0)),
            );
            let mut events = EventLog::new();

            let report = CombatResolver::resolve(16, &mut player, &mut BTreeMap::new(), &mut particles, &mut events);
            assert_eq!(report.blocked, 1);
            assert!(particles[&EntityId::new(5)].is_expired());
            assert!(player.actor.health.is_full());
            assert_eq!(events.count_sound(SoundCue::Shield), 1);
        }

        #[test]
        fn test_magic_bypasses_shield() {
            let mut player = player_at(Vec2::new(100.0, 100.0));
            player.actor.face(Facing::Right);
            let mut particles = BTreeMap::new();
            particles.insert(
                EntityId::new(5),
                hostile(ParticleKind::Magic, Vec2::new(106.0, 100.0), Vec2::new(-1.0, 0.0)),
            );
            let mut events = EventLog::new();

            let report = CombatResolver::resolve(16, &mut player, &mut BTreeMap::new(), &mut particles, &mut events);
            assert_eq!(report.blocked, 0);
            assert_eq!(report.player_hits, 1);
            assert!(particles[&EntityId::new(5)].is_expired());
            assert_eq!(player.actor.state, ActorState::Hurt(HurtKind::Particle));
        }

        #[test]
        fn test_fairy_heals_without_hurting_or_blocking() {
            let mut player = player_at(Vec2::new(100.0, 100.0));
            player.actor.health = crate::entity::Health::with_current(100, 768);
            player.actor.face(Facing::Right);
            let mut particles = BTreeMap::new();
            particles.insert(
                EntityId::new(5),
                hostile(ParticleKind::Fairy, Vec2::new(106.0, 100.0), Vec2::new(-1.0, 0.0)),
            );
            particles.get_mut(&EntityId::new(5)).unwrap().damage = 768;
            let mut events = EventLog::new();

            let report = CombatResolver::resolve(16, &mut player, &mut BTreeMap::new(), &mut particles, &mut events);
            assert_eq!(report, CombatReport::default());
            assert!(player.actor.health.is_full());
            assert!(particles[&EntityId::new(5)].is_expired());
            assert!(!player.actor.invulnerable);
            assert!(!player.actor.state.is_hurt());
            assert_eq!(events.count_sound(SoundCue::Shield), 0);
            assert!(!events
                .records()
                .iter()
                .any(|r| matches!(r.event, GameEvent::PlayerHurt { .. } | GameEvent::ShieldBlocked { .. })));
        }

        #[test]
        fn test_rock_from_behind_hurts() {
            let mut player = player_at(Vec2::new(100.0, 100.0));
            player.actor.face(Facing::Left);
            let mut particles = BTreeMap::new();
            particles.insert(
                EntityId::new(5),
                hostile(ParticleKind::Rock, Vec2::new(106.0, 100.0), Vec2::new(-1.0, 0.0)),
            );
            let mut events = EventLog::new();
            let report = CombatResolver::resolve(16, &mut player, &mut BTreeMap::new(), &mut particles, &mut events);
            assert_eq!(report.player_hits, 1);
            assert_eq!(player.actor.knockback, Vec2::new(-1.0, 0.0));
        }
    }
}
