//! Player death cutscene.
//!
//! When player health runs out the session stops running gameplay and drives
//! a [`DeathSequence`] instead. The sequence is a list of twelve ordered
//! stages; each has an entry action and an exit condition checked once per
//! tick. At most one stage is entered per tick, stages are never skipped,
//! and the last stage holds until a confirm press.
//!
//! | #  | Stage        | Leaves when                                  |
//! |----|--------------|----------------------------------------------|
//! | 0  | ClearField   | next tick (monsters and particles removed)    |
//! | 1  | HurtFlash    | `hurt_flash_ms`                              |
//! | 2  | RedFloor     | next tick                                    |
//! | 3  | Spin         | `spins` full turns of four `spin_phase_ms`   |
//! | 4  | ShadeOne     | `shade_ms`                                   |
//! | 5  | ShadeTwo     | `shade_ms`                                   |
//! | 6  | ShadeThree   | `shade_ms`                                   |
//! | 7  | GrayFlash    | `gray_ms`                                    |
//! | 8  | Despawn      | despawn animation finished                   |
//! | 9  | HidePlayer   | next tick                                    |
//! | 10 | Silence      | `game_over_delay_ms`                         |
//! | 11 | GameOver     | confirm pressed                              |

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::actor::{motion_for, Actor};
use crate::animation::{AnimationSet, Cadence};
use crate::backend::SoundCue;
use crate::config::DeathTimings;
use crate::entity::{ActorState, HurtKind, SpriteGroups};
use crate::events::{EventLog, GameEvent};
use crate::geometry::Facing;

/// Full-screen floor overlay shown during the cutscene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FloorTint {
    /// No overlay.
    #[default]
    Normal,
    /// Red floor.
    Red,
    /// First darker shade.
    ShadeOne,
    /// Second darker shade.
    ShadeTwo,
    /// Darkest shade.
    ShadeThree,
}

impl FloorTint {
    /// Offset of this tint among the floor overlays.
    #[must_use]
    pub fn slot(self) -> u32 {
        match self {
            FloorTint::Normal => 0,
            FloorTint::Red => 1,
            FloorTint::ShadeOne => 2,
            FloorTint::ShadeTwo => 3,
            FloorTint::ShadeThree => 4,
        }
    }
}

/// Cutscene stages in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DeathStage {
    /// Remove remaining monsters and particles.
    ClearField,
    /// Player flashes as if hurt.
    HurtFlash,
    /// Floor turns red.
    RedFloor,
    /// Player spins.
    Spin,
    /// First floor shade.
    ShadeOne,
    /// Second floor shade.
    ShadeTwo,
    /// Third floor shade.
    ShadeThree,
    /// Player flashes gray.
    GrayFlash,
    /// Despawn animation.
    Despawn,
    /// Player sprite removed.
    HidePlayer,
    /// Sounds stopped before the message.
    Silence,
    /// Game-over message held until confirm.
    GameOver,
}

impl DeathStage {
    /// Stage index, 0 through 11.
    #[must_use]
    pub fn index(self) -> u8 {
        match self {
            DeathStage::ClearField => 0,
            DeathStage::HurtFlash => 1,
            DeathStage::RedFloor => 2,
            DeathStage::Spin => 3,
            DeathStage::ShadeOne => 4,
            DeathStage::ShadeTwo => 5,
            DeathStage::ShadeThree => 6,
            DeathStage::GrayFlash => 7,
            DeathStage::Despawn => 8,
            DeathStage::HidePlayer => 9,
            DeathStage::Silence => 10,
            DeathStage::GameOver => 11,
        }
    }

    /// The following stage; `GameOver` has none.
    #[must_use]
    pub fn next(self) -> Option<DeathStage> {
        Some(match self {
            DeathStage::ClearField => DeathStage::HurtFlash,
            DeathStage::HurtFlash => DeathStage::RedFloor,
            DeathStage::RedFloor => DeathStage::Spin,
            DeathStage::Spin => DeathStage::ShadeOne,
            DeathStage::ShadeOne => DeathStage::ShadeTwo,
            DeathStage::ShadeTwo => DeathStage::ShadeThree,
            DeathStage::ShadeThree => DeathStage::GrayFlash,
            DeathStage::GrayFlash => DeathStage::Despawn,
            DeathStage::Despawn => DeathStage::HidePlayer,
            DeathStage::HidePlayer => DeathStage::Silence,
            DeathStage::Silence => DeathStage::GameOver,
            DeathStage::GameOver => return None,
        })
    }
}

/// What the session must do after a cutscene tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeathCommand {
    /// Keep playing the cutscene.
    Continue,
    /// Confirm was pressed on the game-over message; restart the level.
    Restart,
}

/// Running death cutscene.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeathSequence {
    stage: DeathStage,
    stage_started_ms: u64,
    timings: DeathTimings,
    tint: FloorTint,
}

impl DeathSequence {
    /// Starts the cutscene at stage 0.
    ///
    /// The caller clears monsters and particles from the level on this tick.
    pub fn start(timings: DeathTimings, now_ms: u64, player: &mut Actor, events: &mut EventLog) -> Self {
        player.invulnerable = true;
        player.groups.remove(SpriteGroups::COLLIDABLE);
        player.set_state(ActorState::Idle, now_ms);
        events.push(GameEvent::PlayerDied);
        events.push(GameEvent::DeathStage {
            stage: DeathStage::ClearField.index(),
        });
        debug!("death sequence started");
        Self {
            stage: DeathStage::ClearField,
            stage_started_ms: now_ms,
            timings,
            tint: FloorTint::Normal,
        }
    }

    /// Current stage.
    #[must_use]
    pub fn stage(&self) -> DeathStage {
        self.stage
    }

    /// Floor overlay to draw.
    #[must_use]
    pub fn tint(&self) -> FloorTint {
        self.tint
    }

    /// True while the game-over message shows.
    #[must_use]
    pub fn is_game_over(&self) -> bool {
        self.stage == DeathStage::GameOver
    }

    /// Runs one cutscene tick.
    ///
    /// `confirm` is true only on the tick the confirm key was newly pressed.
    pub fn update(
        &mut self,
        now_ms: u64,
        confirm: bool,
        player: &mut Actor,
        animations: &AnimationSet,
        events: &mut EventLog,
    ) -> DeathCommand {
        let elapsed = now_ms.saturating_sub(self.stage_started_ms);
        if self.stage == DeathStage::Spin {
            let phase = elapsed / self.timings.spin_phase_ms.max(1);
            let mut facing = Facing::Down;
            for _ in 0..phase % 4 {
                facing = facing.turned_clockwise();
            }
            player.face(facing);
        }
        player.animate(animations, motion_for(player.state), now_ms);

        let done = match self.stage {
            DeathStage::ClearField | DeathStage::RedFloor | DeathStage::HidePlayer => true,
            DeathStage::HurtFlash => elapsed >= self.timings.hurt_flash_ms,
            DeathStage::Spin => elapsed >= self.spin_ms(),
            DeathStage::ShadeOne | DeathStage::ShadeTwo | DeathStage::ShadeThree => {
                elapsed >= self.timings.shade_ms
            }
            DeathStage::GrayFlash => elapsed >= self.timings.gray_ms,
            DeathStage::Despawn => player.animator().is_finished(),
            DeathStage::Silence => elapsed >= self.timings.game_over_delay_ms,
            DeathStage::GameOver => {
                return if confirm {
                    DeathCommand::Restart
                } else {
                    DeathCommand::Continue
                };
            }
        };

        if done {
            if let Some(next) = self.stage.next() {
                self.enter(next, now_ms, player, events);
            }
        }
        DeathCommand::Continue
    }

    fn spin_ms(&self) -> u64 {
        u64::from(self.timings.spins) * 4 * self.timings.spin_phase_ms
    }

    fn enter(&mut self, stage: DeathStage, now_ms: u64, player: &mut Actor, events: &mut EventLog) {
        self.stage = stage;
        self.stage_started_ms = now_ms;
        events.push(GameEvent::DeathStage {
            stage: stage.index(),
        });
        debug!(stage = stage.index(), "death stage");

        match stage {
            DeathStage::ClearField => {}
            DeathStage::HurtFlash => {
                player.enter(ActorState::Hurt(HurtKind::Particle), Cadence::looping(50, 2), now_ms);
            }
            DeathStage::RedFloor => {
                self.tint = FloorTint::Red;
                events.sound(SoundCue::Death);
            }
            DeathStage::Spin => {
                player.enter(ActorState::Spinning, Cadence::looping(self.timings.spin_phase_ms, 1), now_ms);
            }
            DeathStage::ShadeOne => {
                self.tint = FloorTint::ShadeOne;
                player.set_state(ActorState::Idle, now_ms);
            }
            DeathStage::ShadeTwo => self.tint = FloorTint::ShadeTwo,
            DeathStage::ShadeThree => self.tint = FloorTint::ShadeThree,
            DeathStage::GrayFlash => {
                player.enter(ActorState::Gray, Cadence::looping(self.timings.gray_ms, 1), now_ms);
            }
            DeathStage::Despawn => {
                player.enter(
                    ActorState::Dying,
                    Cadence::once(self.timings.despawn_frame_ms, 3),
                    now_ms,
                );
            }
            DeathStage::HidePlayer => player.groups.remove(SpriteGroups::VISIBLE),
            DeathStage::Silence => {
                events.push(GameEvent::StopSound {
                    cue: SoundCue::LowHealth,
                });
                events.push(GameEvent::StopSound {
                    cue: SoundCue::Death,
                });
            }
            DeathStage::GameOver => {
                events.push(GameEvent::GameOver);
                events.sound(SoundCue::GameOver);
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
