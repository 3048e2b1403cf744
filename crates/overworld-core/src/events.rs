//! Gameplay events recorded during a tick.
//!
//! Entity updates do not call the audio backend directly. They push
//! [`GameEvent`]s into the session's [`EventLog`]; at the end of the tick the
//! session forwards sound events to the [`AudioSink`](crate::backend::AudioSink)
//! and keeps everything else for the caller to drain with
//! [`Session::take_events`](crate::session::Session::take_events).
//!
//! # Example
//!
//! ```
//! use overworld_core::backend::SoundCue;
//! use overworld_core::events::{EventLog, GameEvent};
//!
//! let mut log = EventLog::new();
//! log.set_tick(3);
//! log.push(GameEvent::Sound { cue: SoundCue::Sword, looped: false });
//!
//! let records = log.take();
//! assert_eq!(records[0].tick, 3);
//! assert!(log.is_empty());
//! ```

use serde::{Deserialize, Serialize};

use crate::backend::SoundCue;
use crate::entity::EntityId;
use crate::items::{ItemKind, PickupKind};
use crate::loot::LootKind;
use crate::particle::ParticleKind;
use crate::species::Species;

/// Something that happened during a tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    /// Start a sound.
    Sound {
        /// Cue to play.
        cue: SoundCue,
        /// Loop until stopped.
        looped: bool,
    },
    /// Stop a looping sound.
    StopSound {
        /// Cue to stop.
        cue: SoundCue,
    },
    /// The player lost health.
    PlayerHurt {
        /// Hit points removed.
        amount: i32,
        /// Hit points left.
        health: i32,
    },
    /// A projectile was stopped by the shield.
    ShieldBlocked {
        /// The blocked particle.
        particle: EntityId,
    },
    /// A monster lost health.
    MonsterHurt {
        /// The monster.
        monster: EntityId,
        /// Hit points removed.
        amount: i32,
    },
    /// A monster's health ran out and its death animation started.
    MonsterDied {
        /// The monster.
        monster: EntityId,
        /// Its species.
        species: Species,
    },
    /// A dead monster was removed from the level.
    MonsterReaped {
        /// The monster.
        monster: EntityId,
        /// Global kill count after this kill.
        kill_count: u64,
    },
    /// Loot appeared.
    LootDropped {
        /// The new pickup, or the fairy particle for a fairy.
        pickup: EntityId,
        /// What it is.
        kind: LootKind,
    },
    /// A particle entered the level.
    ParticleSpawned {
        /// The particle.
        particle: EntityId,
        /// Its kind.
        kind: ParticleKind,
    },
    /// A particle left the level.
    ParticleExpired {
        /// The particle.
        particle: EntityId,
        /// Its kind.
        kind: ParticleKind,
    },
    /// The player collected a pickup.
    Collected {
        /// What was collected.
        kind: PickupKind,
    },
    /// The player bought a shop item.
    Purchased {
        /// Item bought.
        item: ItemKind,
        /// Rupees paid.
        price: u32,
    },
    /// The player touched a shop item without enough rupees.
    PurchaseDenied {
        /// Item offered.
        item: ItemKind,
        /// Its price.
        price: u32,
    },
    /// Player health reached zero.
    PlayerDied,
    /// The death cutscene entered a stage.
    DeathStage {
        /// Stage index, 0 through 11.
        stage: u8,
    },
    /// The game-over message is showing.
    GameOver,
    /// Game over was confirmed and the level restarted.
    Restarted,
    /// The player finished a staircase or warp.
    LevelExit {
        /// Destination code from the trigger tile.
        destination: i32,
    },
    /// The menu opened or closed.
    Paused {
        /// New pause state.
        paused: bool,
    },
    /// The save key was pressed.
    SaveRequested,
    /// The load key was pressed.
    LoadRequested,
}

impl GameEvent {
    /// Shorthand for a one-shot sound.
    #[must_use]
    pub fn sound(cue: SoundCue) -> Self {
        GameEvent::Sound { cue, looped: false }
    }

    /// The entity this event is about, if any.
    #[must_use]
    pub fn entity(&self) -> Option<EntityId> {
        match self {
            Self::ShieldBlocked { particle }
            | Self::ParticleSpawned { particle, .. }
            | Self::ParticleExpired { particle, .. } => Some(*particle),
            Self::MonsterHurt { monster, .. }
            | Self::MonsterDied { monster, .. }
            | Self::MonsterReaped { monster, .. } => Some(*monster),
            Self::LootDropped { pickup, .. } => Some(*pickup),
            _ => None,
        }
    }
}

/// An event stamped with the tick it happened in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Session tick.
    pub tick: u64,
    /// What happened.
    pub event: GameEvent,
}

/// Ordered event log for the current session.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    tick: u64,
    records: Vec<EventRecord>,
    flushed: usize,
}

impl EventLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the tick stamped on subsequent events.
    pub fn set_tick(&mut self, tick: u64) {
        self.tick = tick;
    }

    /// Records an event.
    pub fn push(&mut self, event: GameEvent) {
        self.records.push(EventRecord {
            tick: self.tick,
            event,
        });
    }

    /// Records a one-shot sound.
    pub fn sound(&mut self, cue: SoundCue) {
        self.push(GameEvent::sound(cue));
    }

    /// Events recorded since the last [`EventLog::mark_flushed`].
    #[must_use]
    pub fn unflushed(&self) -> &[EventRecord] {
        &self.records[self.flushed.min(self.records.len())..]
    }

    /// Marks every current event as forwarded to the backends.
    pub fn mark_flushed(&mut self) {
        self.flushed = self.records.len();
    }

    /// All recorded events.
    #[must_use]
    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    /// Drains all recorded events.
    pub fn take(&mut self) -> Vec<EventRecord> {
        self.flushed = 0;
        std::mem::take(&mut self.records)
    }

    /// Number of recorded events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if nothing is recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of recorded `Sound` events for `cue`.
    #[must_use]
    pub fn count_sound(&self, cue: SoundCue) -> usize {
        self.records
            .iter()
            .filter(|r| matches!(r.event, GameEvent::Sound { cue: c, .. } if c == cue))
            .count()
    }
}
