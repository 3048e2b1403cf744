//! Logical input keys and input sources.
//!
//! The frontend maps raw keyboard or pad input to [`InputKeys`] before the
//! session sees it; the engine only asks whether a key is held. Edge-triggered
//! actions (menu, save, load, confirm) compare against the previous tick.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::InputScriptError;
use crate::geometry::Facing;

bitflags! {
    /// Keys held during one tick.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct InputKeys: u16 {
        /// Move up.
        const UP = 1 << 0;
        /// Move down.
        const DOWN = 1 << 1;
        /// Move left.
        const LEFT = 1 << 2;
        /// Move right.
        const RIGHT = 1 << 3;
        /// Melee action.
        const ACTION_A = 1 << 4;
        /// Equipped-item action.
        const ACTION_B = 1 << 5;
        /// Open or close the menu (pause).
        const MENU = 1 << 6;
        /// Request a save.
        const SAVE = 1 << 7;
        /// Request a load.
        const LOAD = 1 << 8;
        /// Confirm (dismiss the game-over message).
        const CONFIRM = 1 << 9;
    }
}

impl InputKeys {
    /// Movement key for `facing`.
    #[must_use]
    pub fn for_facing(facing: Facing) -> InputKeys {
        match facing {
            Facing::Up => InputKeys::UP,
            Facing::Down => InputKeys::DOWN,
            Facing::Left => InputKeys::LEFT,
            Facing::Right => InputKeys::RIGHT,
        }
    }

    /// The held movement direction. Movement is four-directional; when
    /// several movement keys are held the first of up, down, left, right wins.
    #[must_use]
    pub fn movement(self) -> Option<Facing> {
        Facing::ALL
            .into_iter()
            .find(|facing| self.contains(InputKeys::for_facing(*facing)))
    }

    /// Keys held now that were not held in `previous`.
    #[must_use]
    pub fn pressed_since(self, previous: InputKeys) -> InputKeys {
        self & !previous
    }

    /// Parses a single key label. Direction labels go through [`Facing`].
    #[must_use]
    pub fn from_label(label: &str) -> Option<InputKeys> {
        if let Ok(facing) = label.parse::<Facing>() {
            return Some(InputKeys::for_facing(facing));
        }
        match label.trim().to_ascii_lowercase().as_str() {
            "a" | "sword" => Some(InputKeys::ACTION_A),
            "b" | "item" => Some(InputKeys::ACTION_B),
            "menu" | "pause" => Some(InputKeys::MENU),
            "save" => Some(InputKeys::SAVE),
            "load" => Some(InputKeys::LOAD),
            "confirm" | "start" => Some(InputKeys::CONFIRM),
            "none" | "" => Some(InputKeys::empty()),
            _ => None,
        }
    }

    /// Combines labels into one key set. Unknown labels are logged and skipped.
    #[must_use]
    pub fn from_labels<'a>(labels: impl IntoIterator<Item = &'a str>) -> InputKeys {
        labels
            .into_iter()
            .fold(InputKeys::empty(), |keys, label| match InputKeys::from_label(label) {
                Some(key) => keys | key,
                None => {
                    warn!(label, "unknown input label skipped");
                    keys
                }
            })
    }
}

/// Per-tick source of held keys.
pub trait InputProvider {
    /// Keys held for the next tick.
    fn poll(&mut self) -> InputKeys;
}

/// Replays a fixed list of `(ticks, keys)` segments, then reports no keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptedInput {
    segments: Vec<(u64, InputKeys)>,
    segment: usize,
    used: u64,
}

impl ScriptedInput {
    /// Creates a script from `(ticks, keys)` segments.
    #[must_use]
    pub fn new(segments: Vec<(u64, InputKeys)>) -> Self {
        Self {
            segments,
            segment: 0,
            used: 0,
        }
    }

    /// Parses a script with one `<ticks> <key>[+<key>...]` segment per line.
    ///
    /// Blank lines and lines starting with `#` are ignored; unknown key labels
    /// are logged and dropped from their segment.
    ///
    /// ```
    /// use overworld_core::input::{InputKeys, ScriptedInput};
    ///
    /// let script = ScriptedInput::parse("# walk then swing\n30 right\n1 a+right\n").unwrap();
    /// assert_eq!(script.total_ticks(), 31);
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`InputScriptError`] for a missing or non-numeric tick count.
    pub fn parse(text: &str) -> Result<Self, InputScriptError> {
        let mut segments = Vec::new();
        for (index, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut parts = line.split_whitespace();
            let count = parts.next().unwrap_or_default();
            let ticks: u64 = count.parse().map_err(|_| InputScriptError {
                line: index + 1,
                details: format!("invalid tick count {count:?}"),
            })?;
            let keys = parts
                .next()
                .map_or(InputKeys::empty(), |spec| InputKeys::from_labels(spec.split('+')));
            segments.push((ticks, keys));
        }
        Ok(Self::new(segments))
    }

    /// Total ticks covered by the script.
    #[must_use]
    pub fn total_ticks(&self) -> u64 {
        self.segments.iter().map(|(ticks, _)| ticks).sum()
    }

    /// True once every segment has been replayed.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.segment >= self.segments.len()
    }
}

impl InputProvider for ScriptedInput {
    fn poll(&mut self) -> InputKeys {
        while let Some(&(ticks, keys)) = self.segments.get(self.segment) {
            if self.used < ticks {
                self.used += 1;
                return keys;
            }
            self.segment += 1;
            self.used = 0;
        }
        InputKeys::empty()
    }
}
