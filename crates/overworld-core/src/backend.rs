//! Narrow interfaces to the rendering and audio backends.
//!
//! The engine never touches images or audio buffers. It names sprites by
//! [`SpriteId`] and sounds by [`SoundCue`]; a frontend resolves those through
//! its own asset provider. Recording implementations are provided for tests
//! and headless runs.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::animation::SpriteId;

/// Source of pre-sliced sprite images.
pub trait SpriteProvider {
    /// Backend image type.
    type Image;

    /// Image for `id`, or `None` if the sheet has no such slot.
    fn sprite(&self, id: SpriteId) -> Option<&Self::Image>;
}

/// Receives one blit per visible entity per tick.
pub trait DrawSink {
    /// Draws `sprite` with its top-left corner at `top_left`.
    fn blit(&mut self, sprite: SpriteId, top_left: Vec2);
}

/// Fire-and-forget sound playback.
pub trait AudioSink {
    /// Starts `cue`, looping it if `looped`.
    fn play(&mut self, cue: SoundCue, looped: bool);

    /// Stops `cue` if it is playing.
    fn stop(&mut self, cue: SoundCue);
}

/// Every sound the engine can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SoundCue {
    /// Sword swing.
    Sword,
    /// Player hurt.
    PlayerHurt,
    /// Monster hurt.
    EnemyHit,
    /// Monster killed.
    EnemyDie,
    /// Looping low-health beep.
    LowHealth,
    /// Projectile deflected by the shield.
    Shield,
    /// Bomb placed.
    BombDrop,
    /// Bomb exploded.
    BombBlow,
    /// Boomerang thrown.
    Boomerang,
    /// Candle flame lit.
    Candle,
    /// Rupee collected.
    Rupee,
    /// Health restored.
    Heart,
    /// Item obtained.
    Item,
    /// Walking down stairs.
    Stairs,
    /// Triforce fanfare.
    Triforce,
    /// Death spin.
    Death,
    /// Game-over jingle.
    GameOver,
}

impl fmt::Display for SoundCue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Audio sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullAudio;

impl AudioSink for NullAudio {
    fn play(&mut self, _cue: SoundCue, _looped: bool) {}

    fn stop(&mut self, _cue: SoundCue) {}
}

/// One call made to a [`RecordingAudio`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AudioCall {
    /// `play(cue, looped)`.
    Play(SoundCue, bool),
    /// `stop(cue)`.
    Stop(SoundCue),
}

/// Audio sink that records every call in order.
#[derive(Debug, Clone, Default)]
pub struct RecordingAudio {
    /// Calls in arrival order.
    pub calls: Vec<AudioCall>,
}

impl RecordingAudio {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of times `cue` was started.
    #[must_use]
    pub fn plays_of(&self, cue: SoundCue) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, AudioCall::Play(c, _) if *c == cue))
            .count()
    }

    /// Number of times `cue` was stopped.
    #[must_use]
    pub fn stops_of(&self, cue: SoundCue) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, AudioCall::Stop(c) if *c == cue))
            .count()
    }
}

impl AudioSink for RecordingAudio {
    fn play(&mut self, cue: SoundCue, looped: bool) {
        self.calls.push(AudioCall::Play(cue, looped));
    }

    fn stop(&mut self, cue: SoundCue) {
        self.calls.push(AudioCall::Stop(cue));
    }
}

/// Draw sink that records every blit.
#[derive(Debug, Clone, Default)]
pub struct RecordingCanvas {
    /// Blits in arrival order.
    pub blits: Vec<(SpriteId, Vec2)>,
}

impl RecordingCanvas {
    /// Creates an empty canvas.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Forgets all recorded blits.
    pub fn clear(&mut self) {
        self.blits.clear();
    }
}

impl DrawSink for RecordingCanvas {
    fn blit(&mut self, sprite: SpriteId, top_left: Vec2) {
        self.blits.push((sprite, top_left));
    }
}

/// Draw sink that resolves sprites through a provider before handing the
/// image to a backend closure. Unknown ids are skipped.
pub struct ProviderSink<'a, P: SpriteProvider, F: FnMut(&P::Image, Vec2)> {
    provider: &'a P,
    draw: F,
    missing: usize,
}

impl<'a, P: SpriteProvider, F: FnMut(&P::Image, Vec2)> ProviderSink<'a, P, F> {
    /// Wraps `provider` and the backend's `draw` call.
    pub fn new(provider: &'a P, draw: F) -> Self {
        Self {
            provider,
            draw,
            missing: 0,
        }
    }

    /// Blits skipped because the provider had no image.
    #[must_use]
    pub fn missing(&self) -> usize {
        self.missing
    }
}

impl<P: SpriteProvider, F: FnMut(&P::Image, Vec2)> DrawSink for ProviderSink<'_, P, F> {
    fn blit(&mut self, sprite: SpriteId, top_left: Vec2) {
        match self.provider.sprite(sprite) {
            Some(image) => (self.draw)(image, top_left),
            None => {
                self.missing += 1;
                tracing::trace!(?sprite, "sprite missing from provider");
            }
        }
    }
}
