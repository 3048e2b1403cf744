use criterion::{black_box, criterion_group, criterion_main, Criterion};
use glam::Vec2;
use overworld_core::backend::NullAudio;
use overworld_core::geometry::Rect;
use overworld_core::input::InputKeys;
use overworld_core::map::{LayerKind, Layout, LevelLayouts};
use overworld_core::resolver::CollisionResolver;
use overworld_core::{Session, Settings};

const COLS: usize = 16;
const ROWS: usize = 11;

fn overworld() -> LevelLayouts {
    let mut boundary = vec![vec![-1; COLS]; ROWS];
    let mut entities = vec![vec![-1; COLS]; ROWS];
    for (row, cells) in boundary.iter_mut().enumerate() {
        for (col, cell) in cells.iter_mut().enumerate() {
            if row == 0 || col == 0 || row == ROWS - 1 || col == COLS - 1 {
                *cell = 0;
            }
        }
    }
    entities[5][8] = 0;
    // A ring of land monsters around the start
    for (i, (col, row)) in [(3, 3), (12, 3), (3, 7), (12, 7), (6, 2), (10, 8)].into_iter().enumerate() {
        entities[row][col] = [1, 2, 3, 5][i % 4];
    }
    LevelLayouts::from_layers(
        "bench",
        [
            (LayerKind::Boundary, Layout::new(boundary)),
            (LayerKind::Entities, Layout::new(entities)),
        ],
    )
}

fn bench_session_step(c: &mut Criterion) {
    let mut session = Session::new(Settings::default(), overworld(), 1).unwrap();
    let keys = [InputKeys::RIGHT, InputKeys::ACTION_A, InputKeys::LEFT, InputKeys::empty()];
    let mut tick = 0usize;

    c.bench_function("session_step", |b| {
        b.iter(|| {
            session.step(black_box(keys[(tick / 15) % keys.len()]), &mut NullAudio);
            tick += 1;
        })
    });
}

fn bench_level_build(c: &mut Criterion) {
    let layouts = overworld();
    c.bench_function("session_new", |b| {
        b.iter(|| black_box(Session::new(Settings::default(), layouts.clone(), 1).unwrap()))
    });
}

fn bench_collision(c: &mut Criterion) {
    let solids: Vec<Rect> = (0..64)
        .map(|i| {
            #[allow(clippy::cast_precision_loss)]
            let x = (i % 16) as f32 * 16.0;
            #[allow(clippy::cast_precision_loss)]
            let y = (i / 16) as f32 * 48.0;
            Rect::from_center(Vec2::new(x, y), Vec2::splat(16.0))
        })
        .collect();

    c.bench_function("move_and_resolve", |b| {
        b.iter(|| {
            let mut hitbox = Rect::from_center(Vec2::new(100.0, 24.0), Vec2::splat(12.0));
            black_box(CollisionResolver::move_and_resolve(
                &mut hitbox,
                black_box(Vec2::new(1.5, 1.5)),
                &solids,
            ))
        })
    });
}

criterion_group!(benches, bench_session_step, bench_level_build, bench_collision);
criterion_main!(benches);
