//! # Overworld Core
//!
//! Tick-driven simulation core for a top-down action-adventure.
//!
//! The crate runs one deterministic game session: a player, monsters and
//! particles moving over a tile map, colliding, fighting, dropping loot and
//! collecting it. Rendering, audio, input and storage sit behind small traits
//! in [`backend`], [`input`], [`map`] and [`persistence`], so the core runs
//! headless under test.
//!
//! ## Architecture
//!
//! - **Entities**: [`player::Player`], [`monster::Monster`],
//!   [`particle::Particle`], pickups and static obstacles, stored per
//!   [`level::Level`] in `BTreeMap`s keyed by [`entity::EntityId`]
//! - **State machines**: every actor has an [`entity::ActorState`]; the
//!   session drives each one once per tick
//! - **Resolvers**: [`resolver::CollisionResolver`] for axis-separated
//!   movement, [`resolver::CombatResolver`] for damage between sides
//! - **Session**: [`session::Session`] orders the tick, owns the clock and
//!   the seeded random source, and forwards sound events to the audio sink
//!
//! ## Usage
//!
//! ```rust,ignore
//! use overworld_core::{CsvMapLoader, LevelLayouts, Session, Settings};
//!
//! let loader = CsvMapLoader::new("levels");
//! let layouts = LevelLayouts::load(&loader, "overworld")?;
//! let mut session = Session::new(Settings::default(), layouts, 7)?;
//! session.step(InputKeys::RIGHT, &mut NullAudio);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod actor;
pub mod animation;
pub mod backend;
pub mod clock;
pub mod config;
pub mod death;
pub mod entity;
pub mod error;
pub mod events;
pub mod geometry;
pub mod input;
pub mod items;
pub mod level;
pub mod loot;
pub mod map;
pub mod monster;
pub mod particle;
pub mod persistence;
pub mod player;
pub mod resolver;
pub mod session;
pub mod species;
pub mod sprites;

#[cfg(test)]
mod tests;

pub use animation::SpriteId;
pub use backend::{AudioSink, DrawSink, SoundCue};
pub use clock::{Clock, FrameClock, ManualClock};
pub use config::Settings;
pub use error::{EngineError, MapError};
pub use events::{EventLog, GameEvent};
pub use input::{InputKeys, InputProvider, ScriptedInput};
pub use map::{CsvMapLoader, LevelLayouts, MapLoader};
pub use persistence::{JsonFileStore, Persistence};
pub use session::{Session, SessionSummary};
