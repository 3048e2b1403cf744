//! The player character.
//!
//! The player is an [`Actor`] plus an inventory and the bookkeeping for its
//! actions: the live sword particle, which B items are in flight, the ladder
//! bridge it stands on, the pending staircase or warp, and whether the
//! low-health cue is playing.
//!
//! # Actions
//!
//! Action A swings the sword and action B uses the equipped item. Both are
//! edge-triggered, only start from `Idle` or `Walking`, and lock out movement
//! until their pose ends. A B item whose particle is still alive cannot be
//! used again until that particle reports completion through
//! [`Player::particle_gone`].
//!
//! Particles are created by the session from the [`ActionRequest`] returned
//! by [`Player::update`]; the session hands back the particle id with
//! [`Player::track`].

use std::collections::BTreeMap;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::actor::{motion_for, Actor, DamageOutcome, DamageSource, HurtProfile};
use crate::animation::{AnimationSet, Cadence};
use crate::backend::SoundCue;
use crate::config::Settings;
use crate::entity::{ActionSlot, ActorState, EntityId, Health, SpriteGroups};
use crate::events::{EventLog, GameEvent};
use crate::geometry::{Facing, Rect};
use crate::input::InputKeys;
use crate::items::{Inventory, ItemKind, PickupKind};
use crate::level::TriggerKind;
use crate::loot::LootKind;
use crate::particle::{Owner, ParticleKind, ParticleSpec};
use crate::persistence::PlayerSnapshot;
use crate::resolver::{Obstacle, ObstacleKind};

/// Player sprite size.
pub const PLAYER_SIZE: f32 = 16.0;
/// Player hitbox size.
pub const PLAYER_HITBOX: f32 = 12.0;
/// Depth of the shield strip on the facing side.
const SHIELD_DEPTH: f32 = 4.0;

/// A water tile currently bridged by the ladder.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ladder {
    /// Obstacle id of the bridged tile.
    pub tile: EntityId,
    /// Area the player must leave to lift the ladder.
    pub footprint: Rect,
}

/// A particle the player's action wants to create.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionRequest {
    /// Particle to spawn.
    pub spec: ParticleSpec,
    /// B item that produced it; `None` for the sword.
    pub item: Option<ItemKind>,
}

/// Result of one player tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerUpdate {
    /// Particle to spawn.
    pub spawn: Option<ActionRequest>,
    /// Destination of a finished staircase or warp.
    pub exit: Option<i32>,
}

/// What the player reads from the level during its update.
#[derive(Debug, Clone, Copy)]
pub struct PlayerContext<'a> {
    /// Current time.
    pub now_ms: u64,
    /// Keys held this tick.
    pub keys: InputKeys,
    /// Keys newly pressed this tick.
    pub pressed: InputKeys,
    /// Hitboxes that block the player.
    pub solids: &'a [Rect],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct Transition {
    destination: i32,
    duration_ms: u64,
}

/// The player character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    /// Shared actor record.
    pub actor: Actor,
    /// Items and counters.
    pub inventory: Inventory,
    health_per_heart: i32,
    sword: Option<EntityId>,
    in_flight: BTreeMap<ItemKind, EntityId>,
    ladder: Option<Ladder>,
    low_health: bool,
    transition: Option<Transition>,
    last_denied: Option<EntityId>,
    expired: Vec<EntityId>,
}

impl Player {
    /// A new player with the starting hearts and a sword, centered on `center`.
    #[must_use]
    pub fn new(center: Vec2, settings: &Settings, now_ms: u64) -> Self {
        let mut inventory = Inventory::new(settings.max_bombs);
        inventory.acquire(ItemKind::Sword);
        Self {
            actor: Self::fresh_actor(center, settings, now_ms),
            inventory,
            health_per_heart: settings.player_health_per_heart,
            sword: None,
            in_flight: BTreeMap::new(),
            ladder: None,
            low_health: false,
            transition: None,
            last_denied: None,
            expired: Vec::new(),
        }
    }

    fn fresh_actor(center: Vec2, settings: &Settings, now_ms: u64) -> Actor {
        let mut actor = Actor::new(
            Rect::from_center(center, Vec2::splat(PLAYER_SIZE)),
            Vec2::splat(PLAYER_HITBOX),
            settings.player_start_health(),
            settings.player_speed,
            HurtProfile {
                frames: settings.player_hurt_frames,
                frame_ms: settings.player_hurt_frame_ms,
            },
            now_ms,
        );
        actor.play(Cadence::looping(settings.player_walk_frame_ms, 2), now_ms);
        actor
    }

    /// Puts the player back at `center` with the starting hearts.
    ///
    /// Inventory is kept; actions, ladder and transitions are dropped.
    pub fn respawn(&mut self, center: Vec2, settings: &Settings, now_ms: u64) {
        let max = self.actor.health.max();
        self.actor = Self::fresh_actor(center, settings, now_ms);
        self.actor.health = Health::with_current(settings.player_start_health(), max);
        self.sword = None;
        self.in_flight.clear();
        self.ladder = None;
        self.low_health = false;
        self.transition = None;
        self.last_denied = None;
        self.expired.clear();
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// True once health has run out.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.actor.health.is_depleted()
    }

    /// True while the low-health cue is playing.
    #[must_use]
    pub fn is_low_health(&self) -> bool {
        self.low_health
    }

    /// The ladder bridge the player stands on.
    #[must_use]
    pub fn ladder(&self) -> Option<&Ladder> {
        self.ladder.as_ref()
    }

    /// True while a particle of `item` is alive.
    #[must_use]
    pub fn is_in_flight(&self, item: ItemKind) -> bool {
        self.in_flight.contains_key(&item)
    }

    /// Id of the live sword particle.
    #[must_use]
    pub fn sword_particle(&self) -> Option<EntityId> {
        self.sword
    }

    /// The shield strip on the facing side of the hitbox.
    #[must_use]
    pub fn shield_hitbox(&self) -> Rect {
        let hb = self.actor.hitbox;
        match self.actor.facing {
            Facing::Up => Rect::new(hb.x, hb.y - SHIELD_DEPTH / 2.0, hb.w, SHIELD_DEPTH),
            Facing::Down => Rect::new(hb.x, hb.bottom() - SHIELD_DEPTH / 2.0, hb.w, SHIELD_DEPTH),
            Facing::Left => Rect::new(hb.x - SHIELD_DEPTH / 2.0, hb.y, SHIELD_DEPTH, hb.h),
            Facing::Right => Rect::new(hb.right() - SHIELD_DEPTH / 2.0, hb.y, SHIELD_DEPTH, hb.h),
        }
    }

    /// True when the shield can block: standing or walking, not mid-action.
    #[must_use]
    pub fn can_block(&self) -> bool {
        self.actor.state.can_move()
    }

    // =========================================================================
    // Particles
    // =========================================================================

    /// Records the id of the particle created for an [`ActionRequest`].
    pub fn track(&mut self, item: Option<ItemKind>, particle: EntityId) {
        match item {
            Some(item) => {
                self.in_flight.insert(item, particle);
            }
            None => self.sword = Some(particle),
        }
    }

    /// Forgets a particle that left the level.
    pub fn particle_gone(&mut self, particle: EntityId) {
        self.in_flight.retain(|_, id| *id != particle);
        if self.sword == Some(particle) {
            self.sword = None;
        }
    }

    /// Particles the player wants removed (a finished or cancelled swing).
    pub fn drain_expired(&mut self) -> Vec<EntityId> {
        std::mem::take(&mut self.expired)
    }

    // =========================================================================
    // Update
    // =========================================================================

    /// Runs one tick of the player state machine.
    pub fn update(
        &mut self,
        ctx: &PlayerContext<'_>,
        settings: &Settings,
        animations: &AnimationSet,
        events: &mut EventLog,
    ) -> PlayerUpdate {
        let now = ctx.now_ms;
        let playback = self.actor.animate(animations, motion_for(self.actor.state), now);
        let mut out = PlayerUpdate::default();

        match self.actor.state {
            ActorState::Hurt(_) => {
                let knockback = self.actor.knockback_velocity();
                self.actor.step(knockback, ctx.solids);
                if self.actor.update_hurt(now) {
                    self.actor.set_state(ActorState::Idle, now);
                }
            }
            ActorState::Acting(_) => {
                if playback.map_or(true, |p| p.go_idle) {
                    self.finish_action(settings, now);
                }
            }
            ActorState::Stairs | ActorState::Warping => {
                let elapsed = self.actor.time_in_state(now);
                if let Some(transition) = self.transition {
                    if elapsed >= transition.duration_ms {
                        self.transition = None;
                        self.actor.groups = SpriteGroups::default();
                        self.actor.set_state(ActorState::Idle, now);
                        out.exit = Some(transition.destination);
                    }
                } else {
                    self.actor.set_state(ActorState::Idle, now);
                }
            }
            ActorState::Triforce => {
                if self.actor.time_in_state(now) >= settings.triforce_ms {
                    self.actor.set_state(ActorState::Idle, now);
                }
            }
            ActorState::Idle | ActorState::Walking => {
                out.spawn = self.handle_input(ctx, settings, events);
            }
            _ => {}
        }
        out
    }

    fn handle_input(
        &mut self,
        ctx: &PlayerContext<'_>,
        settings: &Settings,
        events: &mut EventLog,
    ) -> Option<ActionRequest> {
        let now = ctx.now_ms;

        if ctx.pressed.contains(InputKeys::ACTION_A) && self.inventory.owns(ItemKind::Sword) {
            self.actor.enter(
                ActorState::Acting(ActionSlot::SwordA),
                Cadence::then_idle(settings.sword_frame_ms, 2),
                now,
            );
            events.sound(SoundCue::Sword);
            let spec = ParticleSpec::new(
                ParticleKind::Sword,
                Owner::Player,
                self.actor.hitbox,
                self.actor.facing,
                settings.sword_damage,
            );
            return Some(ActionRequest { spec, item: None });
        }

        if ctx.pressed.contains(InputKeys::ACTION_B) {
            if let Some(request) = self.use_item(settings, now, events) {
                return Some(request);
            }
        }

        match ctx.keys.movement() {
            Some(facing) => {
                self.actor.face(facing);
                if self.actor.state != ActorState::Walking {
                    self.actor.enter(
                        ActorState::Walking,
                        Cadence::looping(settings.player_walk_frame_ms, 2),
                        now,
                    );
                }
                let velocity = self.actor.direction * self.actor.speed;
                self.actor.step(velocity, ctx.solids);
            }
            None => self.actor.set_state(ActorState::Idle, now),
        }
        None
    }

    fn use_item(
        &mut self,
        settings: &Settings,
        now_ms: u64,
        events: &mut EventLog,
    ) -> Option<ActionRequest> {
        let item = self.inventory.equipped_b?;
        if self.in_flight.contains_key(&item) {
            trace!(%item, "item still in flight");
            return None;
        }
        let (kind, damage, cue) = match item {
            ItemKind::Boomerang => (
                ParticleKind::Boomerang,
                settings.boomerang_damage,
                SoundCue::Boomerang,
            ),
            ItemKind::Candle => (ParticleKind::Flame, settings.flame_damage, SoundCue::Candle),
            ItemKind::Bomb => {
                if self.inventory.bombs == 0 {
                    trace!("no bombs left");
                    return None;
                }
                self.inventory.bombs -= 1;
                (ParticleKind::Bomb, settings.bomb_damage, SoundCue::BombDrop)
            }
            other => {
                warn!(item = %other, "equipped item cannot be used; action skipped");
                return None;
            }
        };

        self.actor.enter(
            ActorState::Acting(ActionSlot::ItemB),
            Cadence::then_idle(settings.item_frame_ms, 1),
            now_ms,
        );
        events.sound(cue);
        let spec = ParticleSpec::new(kind, Owner::Player, self.actor.hitbox, self.actor.facing, damage);
        Some(ActionRequest {
            spec,
            item: Some(item),
        })
    }

    fn finish_action(&mut self, settings: &Settings, now_ms: u64) {
        if let Some(sword) = self.sword.take() {
            self.expired.push(sword);
        }
        self.actor.enter(
            ActorState::Idle,
            Cadence::looping(settings.player_walk_frame_ms, 2),
            now_ms,
        );
    }

    // =========================================================================
    // Health
    // =========================================================================

    /// Applies a hit. A landed hit cancels a sword swing in progress.
    pub fn take_damage(
        &mut self,
        amount: i32,
        source: DamageSource,
        now_ms: u64,
        events: &mut EventLog,
    ) -> DamageOutcome {
        let outcome = self.actor.take_damage(amount, source, now_ms);
        if let DamageOutcome::Hurt { lethal, dealt } = outcome {
            if let Some(sword) = self.sword.take() {
                self.expired.push(sword);
            }
            events.push(GameEvent::PlayerHurt {
                amount: dealt,
                health: self.actor.health.current(),
            });
            if !lethal {
                events.sound(SoundCue::PlayerHurt);
            }
            debug!(dealt, health = self.actor.health.current(), "player hurt");
            self.refresh_low_health(events);
        }
        outcome
    }

    /// Restores health.
    pub fn heal(&mut self, amount: i32, events: &mut EventLog) {
        self.actor.health.heal(amount);
        self.refresh_low_health(events);
    }

    /// Heals to full health.
    pub fn heal_fully(&mut self, events: &mut EventLog) {
        self.actor.health.fill();
        self.refresh_low_health(events);
    }

    /// Starts or stops the looping low-health cue when health crosses one heart.
    pub fn refresh_low_health(&mut self, events: &mut EventLog) {
        let current = self.actor.health.current();
        let low = current > 0 && current < self.health_per_heart;
        if low && !self.low_health {
            events.push(GameEvent::Sound {
                cue: SoundCue::LowHealth,
                looped: true,
            });
        } else if !low && self.low_health {
            events.push(GameEvent::StopSound {
                cue: SoundCue::LowHealth,
            });
        }
        self.low_health = low;
    }

    // =========================================================================
    // Pickups, Shops & Triggers
    // =========================================================================

    /// Applies a collected pickup.
    pub fn collect(&mut self, kind: PickupKind, settings: &Settings, now_ms: u64, events: &mut EventLog) {
        match kind {
            PickupKind::Loot(LootKind::Rupee) => {
                self.inventory.rupees += settings.rupee_value;
                events.sound(SoundCue::Rupee);
            }
            PickupKind::Loot(LootKind::Bomb) => {
                self.inventory.add_bombs(settings.bomb_refill);
                events.sound(SoundCue::Item);
            }
            PickupKind::Loot(LootKind::Heart) => {
                self.heal(settings.heart_value, events);
                events.sound(SoundCue::Heart);
            }
            PickupKind::Loot(LootKind::Fairy) => {
                self.heal_fully(events);
                events.sound(SoundCue::Heart);
            }
            PickupKind::Item(ItemKind::HeartContainer) => {
                let max = self.actor.health.max().saturating_add(self.health_per_heart);
                self.actor.health.set_max(max);
                self.heal_fully(events);
                events.sound(SoundCue::Heart);
            }
            PickupKind::Item(ItemKind::Triforce) => {
                self.inventory.triforce_pieces += 1;
                self.heal_fully(events);
                self.actor.enter(
                    ActorState::Triforce,
                    Cadence::looping(settings.triforce_ms, 1),
                    now_ms,
                );
                events.sound(SoundCue::Triforce);
            }
            PickupKind::Item(item) => {
                self.inventory.acquire(item);
                if item == ItemKind::Bomb {
                    self.inventory.add_bombs(settings.bomb_refill);
                }
                events.sound(SoundCue::Item);
            }
        }
        events.push(GameEvent::Collected { kind });
        debug!(?kind, "collected");
    }

    /// Tries to buy a shop offer. Returns true if the player may take it.
    ///
    /// With `ignore_player_money_amount` the price check is skipped and
    /// nothing is paid. A denial is reported once per contact with an offer.
    pub fn purchase(
        &mut self,
        offer: EntityId,
        item: ItemKind,
        price: u32,
        settings: &Settings,
        events: &mut EventLog,
    ) -> bool {
        if settings.ignore_player_money_amount {
            events.push(GameEvent::Purchased { item, price: 0 });
            return true;
        }
        if self.inventory.rupees >= price {
            self.inventory.rupees -= price;
            events.push(GameEvent::Purchased { item, price });
            return true;
        }
        if self.last_denied != Some(offer) {
            events.push(GameEvent::PurchaseDenied { item, price });
            self.last_denied = Some(offer);
        }
        false
    }

    /// Resets the once-per-contact purchase denial.
    pub fn clear_denied(&mut self) {
        self.last_denied = None;
    }

    /// Starts a staircase or warp. Ignored unless the player can move.
    pub fn enter_trigger(
        &mut self,
        kind: TriggerKind,
        destination: i32,
        settings: &Settings,
        now_ms: u64,
        events: &mut EventLog,
    ) -> bool {
        if !self.actor.state.can_move() {
            return false;
        }
        let (state, duration_ms) = match kind {
            TriggerKind::Stairs => (ActorState::Stairs, settings.stairs_ms),
            TriggerKind::Warp => (ActorState::Warping, settings.warp_ms),
        };
        self.transition = Some(Transition {
            destination,
            duration_ms,
        });
        self.actor.groups.remove(SpriteGroups::COLLIDABLE);
        self.actor.set_state(state, now_ms);
        events.sound(SoundCue::Stairs);
        debug!(?kind, destination, "player entered trigger");
        true
    }

    // =========================================================================
    // Ladder
    // =========================================================================

    /// Lays or lifts the ladder before movement is resolved.
    ///
    /// Leaving the footprint reverts the bridged tile to water. Walking into
    /// water while owning the ladder bridges the first water tile ahead.
    pub fn update_ladder(
        &mut self,
        keys: InputKeys,
        obstacles: &mut BTreeMap<EntityId, Obstacle>,
    ) {
        if let Some(ladder) = self.ladder {
            if self.actor.hitbox.intersects(&ladder.footprint) {
                return;
            }
            if let Some(tile) = obstacles.get_mut(&ladder.tile) {
                tile.unbridge();
            }
            self.ladder = None;
            debug!(tile = %ladder.tile, "ladder lifted");
        }

        if !self.inventory.owns(ItemKind::Ladder) || !self.actor.state.can_move() {
            return;
        }
        let Some(heading) = keys.movement() else {
            return;
        };
        let reach = self
            .actor
            .hitbox
            .offset(heading.vector() * self.actor.speed);
        let water = obstacles
            .iter_mut()
            .find(|(_, o)| o.kind == ObstacleKind::Water && reach.intersects(&o.hitbox));
        if let Some((id, tile)) = water {
            tile.bridge();
            self.ladder = Some(Ladder {
                tile: *id,
                footprint: tile.hitbox,
            });
            debug!(tile = %id, "ladder laid");
        }
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Fields saved for this player.
    #[must_use]
    pub fn snapshot(&self, level: &str) -> PlayerSnapshot {
        PlayerSnapshot {
            level: level.to_string(),
            health: self.actor.health.current(),
            max_health: self.actor.health.max(),
            rupees: self.inventory.rupees,
            bombs: self.inventory.bombs,
            max_bombs: self.inventory.max_bombs,
            owned_items: self.inventory.owned_ids(),
            equipped_b: self.inventory.equipped_b.map(|item| item.id().to_string()),
            triforce_pieces: self.inventory.triforce_pieces,
        }
    }

    /// Restores saved fields. Unknown item ids are logged and dropped.
    pub fn restore(&mut self, snapshot: &PlayerSnapshot, events: &mut EventLog) {
        self.actor.health = Health::with_current(snapshot.health, snapshot.max_health);
        let mut inventory = Inventory::new(snapshot.max_bombs);
        inventory.rupees = snapshot.rupees;
        inventory.bombs = snapshot.bombs.min(snapshot.max_bombs);
        inventory.triforce_pieces = snapshot.triforce_pieces;
        inventory.restore_owned(snapshot.owned_items.iter().map(String::as_str));
        inventory.equipped_b = snapshot.equipped_b.as_deref().and_then(|id| {
            let item = ItemKind::from_id(id);
            if item.is_none() {
                warn!(id, "unknown equipped item in save data dropped");
            }
            item
        });
        self.inventory = inventory;
        self.refresh_low_health(events);
    }

    /// Pushes every timer forward, freezing the player while paused.
    pub fn shift_timers(&mut self, delta_ms: u64) {
        self.actor.shift_timers(delta_ms);
    }
}

// =============================================================================
// Tests
// =============================================================================
