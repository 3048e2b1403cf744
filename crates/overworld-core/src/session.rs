//! The per-tick session loop.
//!
//! A [`Session`] owns the level, the player, the world flags, the clock and
//! the random source, and advances all of them one tick per [`Session::step`]:
//!
//! 1. **CLOCK**: tick the clock; every entity sees the same `now`
//! 2. **INPUT**: edge-detect keys; menu toggles pause, save/load emit events
//! 3. **PAUSE**: while paused, shift every timer by the tick delta and stop
//! 4. **REAP**: remove finished monster deaths, count the kill, roll loot
//! 5. **PLAYER**: run the player state machine, or the death cutscene
//! 6. **WORLD**: monsters, particles, combat, pickups and triggers
//! 7. **DEATH**: start the cutscene if health ran out this tick
//! 8. **AUDIO**: forward the tick's sound events to the audio sink
//!
//! # Determinism
//!
//! The session is single-threaded. Collections iterate in id order and every
//! random draw comes from one seeded `ChaCha8Rng`, so the same settings,
//! layouts, seed and input sequence produce identical states and event logs.
//!
//! # Example
//!
//! ```
//! use overworld_core::backend::NullAudio;
//! use overworld_core::config::Settings;
//! use overworld_core::input::InputKeys;
//! use overworld_core::map::{LayerKind, Layout, LevelLayouts};
//! use overworld_core::session::Session;
//!
//! let layouts = LevelLayouts::from_layers("field", [
//!     (LayerKind::Boundary, Layout::new(vec![vec![0, 0, 0, 0, 0]])),
//!     (LayerKind::Entities, Layout::new(vec![vec![], vec![-1, -1, 0]])),
//! ]);
//! let mut session = Session::new(Settings::default(), layouts, 42).unwrap();
//!
//! for _ in 0..10 {
//!     session.step(InputKeys::RIGHT, &mut NullAudio);
//! }
//! assert_eq!(session.tick(), 10);
//! ```

use std::collections::BTreeMap;
use std::fmt;

use glam::Vec2;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::backend::{AudioSink, DrawSink};
use crate::clock::{Clock, FrameClock};
use crate::config::Settings;
use crate::death::{DeathCommand, DeathSequence, FloorTint};
use crate::entity::{EntityId, SpriteGroups};
use crate::error::{EngineError, MapError, PersistenceError};
use crate::events::{EventLog, EventRecord, GameEvent};
use crate::geometry::Rect;
use crate::input::{InputKeys, InputProvider};
use crate::items::{Pickup, PickupKind, PickupOrigin};
use crate::level::Level;
use crate::loot::{LootKind, LootRoller};
use crate::map::LevelLayouts;
use crate::monster::{Monster, MonsterContext};
use crate::particle::{Owner, OwnerView, ParticleKind, ParticleSpec};
use crate::persistence::{Persistence, WorldState};
use crate::player::{Player, PlayerContext};
use crate::resolver::{CollisionProfile, CombatResolver};
use crate::sprites::SpriteLibrary;

/// Edge length of a dropped loot pickup.
const LOOT_SIZE: f32 = 10.0;

// =============================================================================
// Summary
// =============================================================================

/// Compact view of a session, for logs and the headless runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Ticks run.
    pub tick: u64,
    /// Session time.
    pub now_ms: u64,
    /// Current level.
    pub level: String,
    /// Player hit points.
    pub health: i32,
    /// Player maximum hit points.
    pub max_health: i32,
    /// Player currency.
    pub rupees: u32,
    /// Bombs carried.
    pub bombs: u32,
    /// Monsters killed across the game.
    pub kill_count: u64,
    /// Monsters alive in the level.
    pub monsters: usize,
    /// Particles alive in the level.
    pub particles: usize,
    /// Pause flag.
    pub paused: bool,
    /// Death cutscene stage, if the player died.
    pub death_stage: Option<u8>,
    /// Destination of the last finished staircase or warp.
    pub pending_exit: Option<i32>,
}

// =============================================================================
// Session
// =============================================================================

/// One running game.
pub struct Session<C: Clock = FrameClock> {
    settings: Settings,
    clock: C,
    rng: ChaCha8Rng,
    layouts: LevelLayouts,
    library: SpriteLibrary,
    loot: LootRoller,
    level: Level,
    player: Player,
    world: WorldState,
    paused: bool,
    death: Option<DeathSequence>,
    previous: InputKeys,
    events: EventLog,
    tick: u64,
    last_now_ms: u64,
    pending_exit: Option<i32>,
}

impl Session<FrameClock> {
    /// Starts a session on `layouts` with a frame clock at the configured fps.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Config`] for invalid settings or missing sprite
    /// sheets, and [`EngineError::Map`] if the level cannot be built.
    pub fn new(settings: Settings, layouts: LevelLayouts, seed: u64) -> Result<Self, EngineError> {
        let clock = FrameClock::new(settings.fps);
        Self::with_clock(settings, layouts, seed, clock)
    }
}

impl<C: Clock> Session<C> {
    /// Starts a session driven by `clock`.
    ///
    /// # Errors
    ///
    /// As [`Session::new`].
    pub fn with_clock(
        settings: Settings,
        layouts: LevelLayouts,
        seed: u64,
        clock: C,
    ) -> Result<Self, EngineError> {
        settings.validate()?;
        let library = SpriteLibrary::from_settings(&settings)?;
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let world = WorldState::default();
        let now = clock.now_ms();
        let level = Level::build(&layouts, &settings, &library, &world, now, &mut rng)?;
        let player = Player::new(level.player_start, &settings, now);
        info!(level = %level.id, seed, "session started");

        Ok(Self {
            loot: LootRoller::new(settings.loot_drop_chance),
            settings,
            clock,
            rng,
            layouts,
            library,
            level,
            player,
            world,
            paused: false,
            death: None,
            previous: InputKeys::empty(),
            events: EventLog::new(),
            tick: 0,
            last_now_ms: now,
            pending_exit: None,
        })
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Ticks run so far.
    #[must_use]
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Current session time.
    #[must_use]
    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    /// Engine settings.
    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The current level.
    #[must_use]
    pub fn level(&self) -> &Level {
        &self.level
    }

    /// Mutable access to the level, for scripted setups.
    pub fn level_mut(&mut self) -> &mut Level {
        &mut self.level
    }

    /// The player.
    #[must_use]
    pub fn player(&self) -> &Player {
        &self.player
    }

    /// Mutable access to the player, for scripted setups.
    pub fn player_mut(&mut self) -> &mut Player {
        &mut self.player
    }

    /// World flags.
    #[must_use]
    pub fn world(&self) -> &WorldState {
        &self.world
    }

    /// Sprite ids and animations.
    #[must_use]
    pub fn library(&self) -> &SpriteLibrary {
        &self.library
    }

    /// True while the menu is open.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// The death cutscene, once the player has died.
    #[must_use]
    pub fn death(&self) -> Option<&DeathSequence> {
        self.death.as_ref()
    }

    /// Destination of the last finished staircase or warp. Triggers stay
    /// inert until the host moves on with [`Session::enter_level`].
    #[must_use]
    pub fn pending_exit(&self) -> Option<i32> {
        self.pending_exit
    }

    /// Events recorded since the last drain.
    #[must_use]
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Drains the event log.
    pub fn take_events(&mut self) -> Vec<EventRecord> {
        self.events.take()
    }

    /// Compact view of the session.
    #[must_use]
    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            tick: self.tick,
            now_ms: self.clock.now_ms(),
            level: self.level.id.clone(),
            health: self.player.actor.health.current(),
            max_health: self.player.actor.health.max(),
            rupees: self.player.inventory.rupees,
            bombs: self.player.inventory.bombs,
            kill_count: self.world.kill_count,
            monsters: self.level.monsters.len(),
            particles: self.level.particles.len(),
            paused: self.paused,
            death_stage: self.death.as_ref().map(|d| d.stage().index()),
            pending_exit: self.pending_exit,
        }
    }

    // =========================================================================
    // Tick
    // =========================================================================

    /// Runs `ticks` ticks, polling `input` once per tick.
    pub fn run(&mut self, input: &mut dyn InputProvider, audio: &mut dyn AudioSink, ticks: u64) {
        for _ in 0..ticks {
            let keys = input.poll();
            self.step(keys, audio);
        }
    }

    /// Advances the session by one tick with `keys` held.
    pub fn step(&mut self, keys: InputKeys, audio: &mut dyn AudioSink) {
        self.clock.tick();
        let now = self.clock.now_ms();
        let delta = now.saturating_sub(self.last_now_ms);
        self.last_now_ms = now;
        self.tick += 1;
        self.events.set_tick(self.tick);

        let pressed = keys.pressed_since(self.previous);
        self.previous = keys;
        self.handle_system_keys(pressed);

        if self.paused {
            self.shift_timers(delta);
            self.flush_audio(audio);
            return;
        }

        self.reap_monsters(now);

        if self.death.is_some() {
            self.run_death(now, pressed);
        } else {
            self.run_gameplay(now, keys, pressed);
            if self.player.is_dead() {
                self.start_death(now);
            }
        }

        self.flush_audio(audio);
    }

    fn handle_system_keys(&mut self, pressed: InputKeys) {
        if pressed.contains(InputKeys::MENU) && self.death.is_none() {
            self.paused = !self.paused;
            self.events.push(GameEvent::Paused {
                paused: self.paused,
            });
            debug!(paused = self.paused, "menu toggled");
        }
        if pressed.contains(InputKeys::SAVE) {
            self.events.push(GameEvent::SaveRequested);
        }
        if pressed.contains(InputKeys::LOAD) {
            self.events.push(GameEvent::LoadRequested);
        }
    }

    fn shift_timers(&mut self, delta_ms: u64) {
        if delta_ms == 0 {
            return;
        }
        self.player.shift_timers(delta_ms);
        for monster in self.level.monsters.values_mut() {
            monster.shift_timers(delta_ms);
        }
        for particle in self.level.particles.values_mut() {
            particle.shift(delta_ms);
        }
        for pickup in self.level.pickups.values_mut() {
            pickup.shift(delta_ms);
        }
    }

    fn reap_monsters(&mut self, now_ms: u64) {
        let reapable: Vec<EntityId> = self
            .level
            .monsters
            .iter()
            .filter(|(_, monster)| monster.is_reapable())
            .map(|(id, _)| *id)
            .collect();

        let reaped_any = !reapable.is_empty();
        for id in reapable {
            let Some(monster) = self.level.monsters.remove(&id) else {
                continue;
            };
            let kill = self.world.kill_count;
            self.world.kill_count += 1;
            if self.world.record_monster_kill(&self.level.id) {
                debug!(level = %self.level.id, "first kill in level");
            }
            self.events.push(GameEvent::MonsterReaped {
                monster: id,
                kill_count: self.world.kill_count,
            });

            if let Some(kind) = self.loot.roll(kill, &mut self.rng) {
                let pickup = self.drop_loot(kind, &monster, now_ms);
                self.events.push(GameEvent::LootDropped { pickup, kind });
                debug!(%pickup, ?kind, kill, "loot dropped");
            }
        }
        if reaped_any && self.level.monsters.is_empty() && self.level.is_dungeon() {
            self.world.set_decimated(&self.level.id);
            info!(level = %self.level.id, "dungeon cleared of monsters");
        }
    }

    /// Places loot where `monster` died. A fairy flies off as a healing
    /// particle; everything else waits as a pickup.
    fn drop_loot(&mut self, kind: LootKind, monster: &Monster, now_ms: u64) -> EntityId {
        let center = monster.actor.center();
        if kind == LootKind::Fairy {
            let spec = ParticleSpec::new(
                ParticleKind::Fairy,
                Owner::Monster(monster.id),
                Rect::from_center(center, Vec2::ZERO),
                monster.actor.facing,
                self.player.actor.health.max(),
            );
            return self.level.spawn_particle(&spec, now_ms, &mut self.events);
        }
        self.level.add_pickup(Pickup {
            kind: PickupKind::Loot(kind),
            hitbox: Rect::from_center(center, Vec2::splat(LOOT_SIZE)),
            origin: PickupOrigin::Drop {
                expires_ms: now_ms + self.settings.loot_lifetime_ms,
            },
        })
    }

    fn run_death(&mut self, now_ms: u64, pressed: InputKeys) {
        let Some(death) = self.death.as_mut() else {
            return;
        };
        let command = death.update(
            now_ms,
            pressed.contains(InputKeys::CONFIRM),
            &mut self.player.actor,
            self.library.player(),
            &mut self.events,
        );
        if command == DeathCommand::Restart {
            self.restart(now_ms);
        }
    }

    fn start_death(&mut self, now_ms: u64) {
        let death = DeathSequence::start(
            self.settings.death,
            now_ms,
            &mut self.player.actor,
            &mut self.events,
        );
        self.level.clear_hostiles(&mut self.events);
        for id in self.player.drain_expired() {
            self.player.particle_gone(id);
        }
        self.death = Some(death);
        info!(tick = self.tick, "player died");
    }

    fn restart(&mut self, now_ms: u64) {
        match Level::build(
            &self.layouts,
            &self.settings,
            &self.library,
            &self.world,
            now_ms,
            &mut self.rng,
        ) {
            Ok(level) => self.level = level,
            // The layouts built once already; keep the cleared level if they no longer do.
            Err(err) => warn!(%err, "level rebuild failed; keeping current level"),
        }
        self.player
            .respawn(self.level.player_start, &self.settings, now_ms);
        self.death = None;
        self.pending_exit = None;
        self.events.push(GameEvent::Restarted);
        info!(level = %self.level.id, "restarted after game over");
    }

    fn run_gameplay(&mut self, now_ms: u64, keys: InputKeys, pressed: InputKeys) {
        self.player.update_ladder(keys, &mut self.level.obstacles);

        let player_solids = self.level.solids_for(CollisionProfile::Player);
        let ctx = PlayerContext {
            now_ms,
            keys,
            pressed,
            solids: &player_solids,
        };
        let update = self
            .player
            .update(&ctx, &self.settings, self.library.player(), &mut self.events);
        if let Some(request) = update.spawn {
            let id = self
                .level
                .spawn_particle(&request.spec, now_ms, &mut self.events);
            self.player.track(request.item, id);
        }
        if let Some(destination) = update.exit {
            self.pending_exit = Some(destination);
            self.events.push(GameEvent::LevelExit { destination });
            info!(destination, "level exit");
        }

        self.update_monsters(now_ms);
        self.update_particles(now_ms);
        CombatResolver::resolve(
            now_ms,
            &mut self.player,
            &mut self.level.monsters,
            &mut self.level.particles,
            &mut self.events,
        );
        self.update_pickups(now_ms);
        self.check_triggers(now_ms);
        self.remove_expired_particles();
    }

    fn update_monsters(&mut self, now_ms: u64) {
        let land = self.level.solids_for(CollisionProfile::Land);
        let aquatic = self.level.solids_for(CollisionProfile::Aquatic);
        let water = self.level.water_tiles();
        let player_center = self.player.actor.center();

        let mut attacks: Vec<ParticleSpec> = Vec::new();
        for monster in self.level.monsters.values_mut() {
            let Some(animations) = self.library.species(monster.species) else {
                continue;
            };
            let profile_solids = match monster.config.profile {
                CollisionProfile::Aquatic => aquatic.as_slice(),
                _ => land.as_slice(),
            };
            let relocates = monster.config.dive.is_some_and(|d| d.relocate_on_rise);
            let ctx = MonsterContext {
                now_ms,
                player_center,
                solids: profile_solids,
                habitat: if relocates { water.as_slice() } else { &[] },
            };
            if let Some(spec) = monster.update(&ctx, animations, &mut self.rng, &mut self.events) {
                attacks.push(spec);
            }
        }
        for spec in attacks {
            self.level.spawn_particle(&spec, now_ms, &mut self.events);
        }
    }

    fn update_particles(&mut self, now_ms: u64) {
        let solids = self.level.solids_for(CollisionProfile::Projectile);
        let player_view = OwnerView {
            hitbox: self.player.actor.hitbox,
            facing: self.player.actor.facing,
        };
        let monster_views: BTreeMap<EntityId, OwnerView> = self
            .level
            .monsters
            .iter()
            .filter(|(_, m)| m.actor.health.current() > 0)
            .map(|(id, m)| {
                (
                    *id,
                    OwnerView {
                        hitbox: m.actor.hitbox,
                        facing: m.actor.facing,
                    },
                )
            })
            .collect();

        for particle in self.level.particles.values_mut() {
            let owner = match particle.owner {
                Owner::Player => Some(player_view),
                Owner::Monster(id) => monster_views.get(&id).copied(),
            };
            particle.update(now_ms, owner, &solids, &mut self.events);
            if let Some(frames) =
                self.library
                    .particle_frames(particle.kind, particle.phase(), particle.facing)
            {
                particle.animate(frames, now_ms);
            }
        }
    }

    fn update_pickups(&mut self, now_ms: u64) {
        let expired: Vec<EntityId> = self
            .level
            .pickups
            .iter()
            .filter(|(_, p)| p.is_expired(now_ms))
            .map(|(id, _)| *id)
            .collect();
        for id in expired {
            self.level.pickups.remove(&id);
            debug!(%id, "loot expired");
        }

        if !self.player.actor.groups.contains(SpriteGroups::COLLIDABLE) {
            return;
        }
        let hitbox = self.player.actor.hitbox;
        let touched: Vec<EntityId> = self
            .level
            .pickups
            .iter()
            .filter(|(_, p)| p.hitbox.intersects(&hitbox))
            .map(|(id, _)| *id)
            .collect();

        let mut at_shop = false;
        for id in touched {
            let Some(pickup) = self.level.pickups.get(&id) else {
                continue;
            };
            let kind = pickup.kind;
            let origin = pickup.origin.clone();
            match origin {
                PickupOrigin::Drop { .. } => {}
                PickupOrigin::Map { ref key } => self.world.consume_item(&self.level.id, key),
                PickupOrigin::Shop { ref key, price } => {
                    at_shop = true;
                    let PickupKind::Item(item) = kind else {
                        continue;
                    };
                    if !self
                        .player
                        .purchase(id, item, price, &self.settings, &mut self.events)
                    {
                        continue;
                    }
                    self.world.mark_sold(&self.level.id, key);
                }
            }
            self.level.pickups.remove(&id);
            self.player
                .collect(kind, &self.settings, now_ms, &mut self.events);
        }
        if !at_shop {
            self.player.clear_denied();
        }
    }

    fn check_triggers(&mut self, now_ms: u64) {
        if self.pending_exit.is_some() || !self.player.actor.state.can_move() {
            return;
        }
        let hitbox = self.player.actor.hitbox;
        let Some(trigger) = self
            .level
            .triggers
            .iter()
            .find(|t| t.hitbox.intersects(&hitbox))
            .copied()
        else {
            return;
        };
        self.player.enter_trigger(
            trigger.kind,
            trigger.destination,
            &self.settings,
            now_ms,
            &mut self.events,
        );
    }

    fn remove_expired_particles(&mut self) {
        for id in self.player.drain_expired() {
            if let Some(particle) = self.level.particles.get_mut(&id) {
                particle.expire();
            }
        }
        let expired: Vec<EntityId> = self
            .level
            .particles
            .iter()
            .filter(|(_, p)| p.is_expired())
            .map(|(id, _)| *id)
            .collect();
        for id in expired {
            self.level.despawn_particle(id, &mut self.events);
            self.player.particle_gone(id);
        }
    }

    fn flush_audio(&mut self, audio: &mut dyn AudioSink) {
        for record in self.events.unflushed() {
            match record.event {
                GameEvent::Sound { cue, looped } => audio.play(cue, looped),
                GameEvent::StopSound { cue } => audio.stop(cue),
                _ => {}
            }
        }
        self.events.mark_flushed();
    }

    // =========================================================================
    // Levels & Persistence
    // =========================================================================

    /// Moves to another level, keeping the player's health and inventory.
    ///
    /// # Errors
    ///
    /// Returns the build error; the current level is kept in that case.
    pub fn enter_level(&mut self, layouts: LevelLayouts) -> Result<(), MapError> {
        let now = self.clock.now_ms();
        let level = Level::build(
            &layouts,
            &self.settings,
            &self.library,
            &self.world,
            now,
            &mut self.rng,
        )?;
        self.player.actor.teleport(level.player_start);
        self.level = level;
        self.layouts = layouts;
        self.pending_exit = None;
        info!(level = %self.level.id, "entered level");
        Ok(())
    }

    /// Writes the player and world flags to `store`.
    ///
    /// # Errors
    ///
    /// Propagates the store's failure.
    pub fn save(&self, store: &mut dyn Persistence) -> Result<(), PersistenceError> {
        store.save(&self.player.snapshot(&self.level.id), &self.world)
    }

    /// Reads the player and world flags from `store` and rebuilds the level
    /// with the loaded flags. The player returns to the level start.
    ///
    /// # Errors
    ///
    /// Propagates the store's failure, or [`EngineError::Map`] if the level
    /// cannot be rebuilt; nothing changes in either case.
    pub fn load(&mut self, store: &mut dyn Persistence) -> Result<(), EngineError> {
        let (snapshot, world) = store.load()?;
        let now = self.clock.now_ms();
        let level = Level::build(
            &self.layouts,
            &self.settings,
            &self.library,
            &world,
            now,
            &mut self.rng,
        )?;
        self.world = world;
        self.level = level;
        self.player
            .respawn(self.level.player_start, &self.settings, now);
        self.player.restore(&snapshot, &mut self.events);
        self.death = None;
        self.paused = false;
        self.pending_exit = None;
        info!(level = %self.level.id, "session loaded");
        Ok(())
    }

    // =========================================================================
    // Drawing
    // =========================================================================

    /// Blits every visible sprite. Nothing of the world is drawn while paused.
    pub fn draw(&self, sink: &mut dyn DrawSink) {
        if self.paused {
            return;
        }
        let tint = self
            .death
            .as_ref()
            .map_or(FloorTint::Normal, DeathSequence::tint);
        if tint != FloorTint::Normal {
            sink.blit(
                self.library.floor(tint),
                Vec2::new(0.0, self.settings.hud_height),
            );
        }

        for obstacle in self.level.obstacles.values() {
            if let Some(sprite) = obstacle.sprite {
                sink.blit(sprite, obstacle.hitbox.top_left());
            }
        }
        if let Some(ladder) = self.player.ladder() {
            sink.blit(self.library.ladder(), ladder.footprint.top_left());
        }
        for pickup in self.level.pickups.values() {
            sink.blit(self.library.pickup(pickup.kind), pickup.hitbox.top_left());
        }
        for npc in self.level.npcs.values() {
            sink.blit(npc.sprite, npc.hitbox.top_left());
        }
        for monster in self.level.monsters.values() {
            if monster.actor.groups.contains(SpriteGroups::VISIBLE) {
                sink.blit(monster.actor.image, monster.actor.rect.top_left());
            }
        }
        for particle in self.level.particles.values() {
            if particle.groups.contains(SpriteGroups::VISIBLE) {
                sink.blit(particle.image, particle.hitbox.top_left());
            }
        }
        if self.player.actor.groups.contains(SpriteGroups::VISIBLE) {
            sink.blit(self.player.actor.image, self.player.actor.rect.top_left());
        }
    }

    /// True once the game-over message is showing.
    #[must_use]
    pub fn is_game_over(&self) -> bool {
        self.death
            .as_ref()
            .is_some_and(DeathSequence::is_game_over)
    }
}

impl<C: Clock> fmt::Debug for Session<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("tick", &self.tick)
            .field("level", &self.level.id)
            .field("monsters", &self.level.monsters.len())
            .field("particles", &self.level.particles.len())
            .field("paused", &self.paused)
            .field("dead", &self.death.is_some())
            .finish_non_exhaustive()
    }
}
