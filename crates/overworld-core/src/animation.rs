//! Frame-cadence animation playback.
//!
//! The core of this module is [`advance`], a pure function that picks the
//! image to show this tick and computes the next frame cursor. [`Animator`]
//! stores a cursor and a [`Cadence`] for an entity and calls `advance` once per
//! tick with whichever sequence matches the entity's current motion and facing.
//!
//! # Frame timing
//!
//! The image at the current index is selected before the timer is checked, so
//! every frame (including index 0 right after a restart) is shown for at least
//! one tick. When `now - started >= cooldown`, the cursor moves on:
//!
//! - to the next index while one remains;
//! - past the last frame, either back to 0 (`loop_reset`) or held on the last
//!   frame. A wrap with `idle_after` set asks the owner to return to idle.
//!
//! # Example
//!
//! ```
//! use overworld_core::animation::{advance, Cadence, FrameCursor};
//!
//! let frames = [10, 11, 12];
//! let cadence = Cadence::looping(100, frames.len());
//! let cursor = FrameCursor::start(0);
//!
//! let shown = advance(&frames, cursor, cadence, 50);
//! assert_eq!(shown.image, 10);
//! assert_eq!(shown.cursor.index, 0);
//!
//! let shown = advance(&frames, cursor, cadence, 100);
//! assert_eq!(shown.image, 10);
//! assert_eq!(shown.cursor.index, 1);
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::AnimationError;
use crate::geometry::Facing;

/// Index of a pre-sliced image in the asset provider's sheet.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct SpriteId(pub u32);

impl SpriteId {
    /// Returns the id `n` slots after this one.
    #[must_use]
    pub fn nth(self, n: u32) -> SpriteId {
        SpriteId(self.0 + n)
    }
}

/// Named animation actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Motion {
    /// Standing still.
    Idle,
    /// Walk cycle.
    Walk,
    /// Melee swing or monster shot.
    Attack,
    /// Using a B item.
    Item,
    /// Spawn cloud.
    Spawn,
    /// Death burst.
    Die,
    /// Going underground or underwater.
    Dive,
    /// Coming back up.
    Rise,
    /// Death-sequence spin.
    Spin,
    /// Death-sequence gray flash.
    Gray,
    /// Holding up a triforce piece.
    Triforce,
    /// Projectile or effect in flight.
    Fly,
}

// =============================================================================
// Pure Playback
// =============================================================================

/// Position within a sequence plus the time the current frame started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FrameCursor {
    /// Current frame index.
    pub index: usize,
    /// Timestamp at which the current frame started.
    pub started_ms: u64,
}

impl FrameCursor {
    /// A cursor at frame 0 that started at `now_ms`.
    #[must_use]
    pub fn start(now_ms: u64) -> Self {
        Self {
            index: 0,
            started_ms: now_ms,
        }
    }
}

/// Timing policy of one animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cadence {
    /// Display time of each frame.
    pub cooldown_ms: u64,
    /// Number of frames; must equal the sequence length.
    pub frame_count: usize,
    /// Wrap to frame 0 after the last frame instead of holding it.
    pub loop_reset: bool,
    /// Ask the owner to go idle when the sequence wraps.
    pub idle_after: bool,
}

impl Cadence {
    /// Endless loop.
    #[must_use]
    pub fn looping(cooldown_ms: u64, frame_count: usize) -> Self {
        Self {
            cooldown_ms,
            frame_count,
            loop_reset: true,
            idle_after: false,
        }
    }

    /// Plays once, then holds the last frame.
    #[must_use]
    pub fn once(cooldown_ms: u64, frame_count: usize) -> Self {
        Self {
            cooldown_ms,
            frame_count,
            loop_reset: false,
            idle_after: false,
        }
    }

    /// Plays once, wraps, and signals the owner to return to idle.
    #[must_use]
    pub fn then_idle(cooldown_ms: u64, frame_count: usize) -> Self {
        Self {
            cooldown_ms,
            frame_count,
            loop_reset: true,
            idle_after: true,
        }
    }
}

/// Result of one [`advance`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Playback<T> {
    /// Image to draw this tick.
    pub image: T,
    /// Cursor to store for the next tick.
    pub cursor: FrameCursor,
    /// The last frame's time ran out this tick.
    pub completed: bool,
    /// The sequence wrapped with `idle_after` set.
    pub go_idle: bool,
}

/// Selects this tick's image and advances the cursor.
///
/// # Panics
///
/// Panics if `cursor.index` is out of bounds for `sequence`. Sequences are
/// validated non-empty when registered in an [`AnimationSet`], and callers keep
/// `cadence.frame_count` equal to `sequence.len()`.
#[must_use]
pub fn advance<T: Copy>(
    sequence: &[T],
    cursor: FrameCursor,
    cadence: Cadence,
    now_ms: u64,
) -> Playback<T> {
    let image = sequence[cursor.index];
    let mut next = cursor;
    let mut completed = false;
    let mut go_idle = false;

    if now_ms.saturating_sub(cursor.started_ms) >= cadence.cooldown_ms {
        next.started_ms = now_ms;
        if cursor.index + 1 < cadence.frame_count {
            next.index += 1;
        } else {
            completed = true;
            if cadence.loop_reset {
                next.index = 0;
                go_idle = cadence.idle_after;
            }
        }
    }

    Playback {
        image,
        cursor: next,
        completed,
        go_idle,
    }
}

// =============================================================================
// Animator
// =============================================================================

/// Stateful wrapper around [`advance`] owned by an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Animator {
    cursor: FrameCursor,
    cadence: Cadence,
    finished: bool,
}

impl Animator {
    /// Starts a looping animation at `now_ms`.
    #[must_use]
    pub fn new(cooldown_ms: u64, now_ms: u64) -> Self {
        Self {
            cursor: FrameCursor::start(now_ms),
            cadence: Cadence::looping(cooldown_ms, 1),
            finished: false,
        }
    }

    /// Restarts from frame 0 with a new cadence.
    ///
    /// `cadence.frame_count` is replaced by the length of whatever sequence is
    /// passed to [`Animator::tick`].
    pub fn play(&mut self, cadence: Cadence, now_ms: u64) {
        self.cadence = cadence;
        self.cursor = FrameCursor::start(now_ms);
        self.finished = false;
    }

    /// Shows the current frame of `sequence` and advances.
    ///
    /// An index left over from a longer sequence (facing changed mid-cycle)
    /// restarts at frame 0.
    pub fn tick<T: Copy>(&mut self, sequence: &[T], now_ms: u64) -> Playback<T> {
        self.cadence.frame_count = sequence.len();
        if self.cursor.index >= sequence.len() {
            self.cursor.index = 0;
        }
        let playback = advance(sequence, self.cursor, self.cadence, now_ms);
        self.cursor = playback.cursor;
        if playback.completed {
            self.finished = true;
        }
        playback
    }

    /// Current frame index.
    #[must_use]
    pub fn frame_index(&self) -> usize {
        self.cursor.index
    }

    /// Current cadence.
    #[must_use]
    pub fn cadence(&self) -> Cadence {
        self.cadence
    }

    /// True once the last frame has run out at least once since `play`.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Pushes the frame start forward, freezing progress while paused.
    pub fn shift(&mut self, delta_ms: u64) {
        self.cursor.started_ms += delta_ms;
    }
}

// =============================================================================
// Animation Set
// =============================================================================

/// Image sequences keyed by motion and facing.
///
/// Sequences are validated non-empty on insert, so runtime playback never has
/// to re-check them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnimationSet {
    sequences: BTreeMap<(Motion, Facing), Vec<SpriteId>>,
}

impl AnimationSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the sequence for `motion` facing `facing`.
    ///
    /// # Errors
    ///
    /// Returns [`AnimationError::EmptySequence`] if `frames` is empty.
    pub fn insert(
        &mut self,
        motion: Motion,
        facing: Facing,
        frames: Vec<SpriteId>,
    ) -> Result<(), AnimationError> {
        if frames.is_empty() {
            return Err(AnimationError::EmptySequence(motion));
        }
        self.sequences.insert((motion, facing), frames);
        Ok(())
    }

    /// Registers `count` consecutive ids per facing, starting at `first`.
    ///
    /// Facings are laid out in [`Facing::ALL`] order.
    ///
    /// # Errors
    ///
    /// Returns [`AnimationError::EmptySequence`] if `count` is zero.
    pub fn directional(
        &mut self,
        motion: Motion,
        first: SpriteId,
        count: u32,
    ) -> Result<(), AnimationError> {
        for (slot, facing) in (0u32..).zip(Facing::ALL) {
            let frames = (0..count).map(|i| first.nth(slot * count + i)).collect();
            self.insert(motion, facing, frames)?;
        }
        Ok(())
    }

    /// Registers the same sequence for every facing.
    ///
    /// # Errors
    ///
    /// Returns [`AnimationError::EmptySequence`] if `frames` is empty.
    pub fn uniform(&mut self, motion: Motion, frames: &[SpriteId]) -> Result<(), AnimationError> {
        for facing in Facing::ALL {
            self.insert(motion, facing, frames.to_vec())?;
        }
        Ok(())
    }

    /// The sequence for `motion` facing `facing`, if registered.
    #[must_use]
    pub fn get(&self, motion: Motion, facing: Facing) -> Option<&[SpriteId]> {
        self.sequences.get(&(motion, facing)).map(Vec::as_slice)
    }

    /// The sequence for `motion`, falling back to the idle sequence.
    #[must_use]
    pub fn get_or_idle(&self, motion: Motion, facing: Facing) -> Option<&[SpriteId]> {
        self.get(motion, facing)
            .or_else(|| self.get(Motion::Idle, facing))
    }

    /// Number of registered sequences.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    /// True if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================
