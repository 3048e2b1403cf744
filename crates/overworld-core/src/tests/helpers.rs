//! Field layouts and session setup shared by the session tests.

use glam::Vec2;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::backend::NullAudio;
use crate::clock::Clock;
use crate::config::Settings;
use crate::entity::{ActorState, EntityId};
use crate::events::{EventRecord, GameEvent};
use crate::input::InputKeys;
use crate::map::{LayerKind, Layout, LevelLayouts};
use crate::session::Session;
use crate::species::Species;

// =============================================================================
// Layouts
// =============================================================================

/// Columns of the test field, walls included.
pub const FIELD_COLS: usize = 12;
/// Rows of the test field, walls included.
pub const FIELD_ROWS: usize = 9;
/// Cell the player starts on.
pub const START_CELL: (usize, usize) = (6, 4);

/// A grid of empty cells.
pub fn blank() -> Vec<Vec<i32>> {
    vec![vec![-1; FIELD_COLS]; FIELD_ROWS]
}

/// Walls around the border of the field.
pub fn walled_ring() -> Layout {
    let mut rows = blank();
    for (row, cells) in rows.iter_mut().enumerate() {
        for (col, cell) in cells.iter_mut().enumerate() {
            if row == 0 || col == 0 || row == FIELD_ROWS - 1 || col == FIELD_COLS - 1 {
                *cell = 0;
            }
        }
    }
    Layout::new(rows)
}

/// Map code of a species.
pub fn species_code(species: Species) -> i32 {
    let index = Species::ALL
        .iter()
        .position(|s| *s == species)
        .expect("species listed");
    i32::try_from(index).expect("small index") + 1
}

/// Entities layer with the player start and the given monsters.
pub fn entities(monsters: &[(usize, usize, Species)]) -> Layout {
    let mut rows = blank();
    rows[START_CELL.1][START_CELL.0] = 0;
    for (col, row, species) in monsters {
        rows[*row][*col] = species_code(*species);
    }
    Layout::new(rows)
}

/// A single-cell layer with `code` at `(col, row)`.
pub fn single(col: usize, row: usize, code: i32) -> Layout {
    let mut rows = blank();
    rows[row][col] = code;
    Layout::new(rows)
}

/// Walled field with the given monsters.
pub fn field(monsters: &[(usize, usize, Species)]) -> LevelLayouts {
    LevelLayouts::from_layers(
        "field",
        [
            (LayerKind::Boundary, walled_ring()),
            (LayerKind::Entities, entities(monsters)),
        ],
    )
}

/// Center of a field cell with default settings.
pub fn cell_center(col: usize, row: usize) -> Vec2 {
    let settings = Settings::default();
    #[allow(clippy::cast_precision_loss)]
    Vec2::new(
        col as f32 * settings.tile_size + settings.tile_size / 2.0,
        row as f32 * settings.tile_size + settings.hud_height + settings.tile_size / 2.0,
    )
}

// =============================================================================
// Sessions
// =============================================================================

/// Session on `layouts` with default settings.
pub fn session_on(layouts: LevelLayouts, seed: u64) -> Session {
    Session::new(Settings::default(), layouts, seed).expect("valid test level")
}

/// Session on `layouts` with custom settings.
pub fn session_with(settings: Settings, layouts: LevelLayouts, seed: u64) -> Session {
    Session::new(settings, layouts, seed).expect("valid test level")
}

/// Places a monster at `center` that has already finished spawning and
/// stands still.
pub fn place_monster<C: Clock>(session: &mut Session<C>, species: Species, center: Vec2) -> EntityId {
    let now = session.now_ms();
    let mut rng = ChaCha8Rng::seed_from_u64(99);
    let level = session.level_mut();
    let id = level.spawn_monster(species, center, now, &mut rng);
    if let Some(monster) = level.monsters.get_mut(&id) {
        monster.actor.set_state(ActorState::Walking, now);
        monster.actor.speed = 0.0;
        monster.actor.base_speed = 0.0;
    }
    id
}

/// Runs `ticks` ticks with `keys` held.
pub fn hold<C: Clock>(session: &mut Session<C>, keys: InputKeys, ticks: u64) {
    for _ in 0..ticks {
        session.step(keys, &mut NullAudio);
    }
}

/// Presses `keys` for one tick, then releases for one.
pub fn tap<C: Clock>(session: &mut Session<C>, keys: InputKeys) {
    session.step(keys, &mut NullAudio);
    session.step(InputKeys::empty(), &mut NullAudio);
}

/// Steps with no keys until `done` holds or `limit` ticks pass. Returns the
/// ticks taken, or `None` on timeout.
pub fn run_until<C: Clock>(
    session: &mut Session<C>,
    limit: u64,
    mut done: impl FnMut(&Session<C>) -> bool,
) -> Option<u64> {
    for tick in 1..=limit {
        session.step(InputKeys::empty(), &mut NullAudio);
        if done(session) {
            return Some(tick);
        }
    }
    None
}

/// Events of the session matching `pred`.
pub fn events_matching<C: Clock>(
    session: &Session<C>,
    pred: impl Fn(&GameEvent) -> bool,
) -> Vec<EventRecord> {
    session
        .events()
        .records()
        .iter()
        .filter(|record| pred(&record.event))
        .cloned()
        .collect()
}
