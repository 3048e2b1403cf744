//! End-to-end tests through [`Session::step`].
//!
//! These tests drive full ticks and check what the outside world sees:
//! - Movement and walls
//! - Contact damage, the low-health cue and death
//! - Sword kills, the kill count and loot
//! - Pickups, shops and stairs
//! - Pause, save/load, audio flushing and drawing

use glam::Vec2;

use crate::backend::{RecordingAudio, RecordingCanvas, SoundCue};
use crate::config::Settings;
use crate::death::FloorTint;
use crate::entity::{ActorState, Health, HurtKind};
use crate::events::{EventLog, GameEvent};
use crate::input::{InputKeys, ScriptedInput};
use crate::items::{ItemKind, PickupKind, PickupOrigin};
use crate::loot::{loot_for_kill, LootKind};
use crate::map::{LayerKind, LevelLayouts};
use crate::particle::ParticleKind;
use crate::persistence::{MemoryStore, Persistence, WorldState};
use crate::session::Session;
use crate::species::Species;

use super::helpers::{
    cell_center, entities, events_matching, field, hold, place_monster, run_until, session_on,
    session_with, single, tap, walled_ring, START_CELL,
};

fn player_center(session: &Session) -> Vec2 {
    session.player().actor.center()
}

fn with_layer(kind: LayerKind, col: usize, row: usize, code: i32) -> LevelLayouts {
    LevelLayouts::from_layers(
        "field",
        [
            (LayerKind::Boundary, walled_ring()),
            (LayerKind::Entities, entities(&[])),
            (kind, single(col, row, code)),
        ],
    )
}

// =============================================================================
// Movement
// =============================================================================

mod movement_tests {
    use super::*;

    #[test]
    fn test_clock_advances_per_tick() {
        let mut session = session_on(field(&[]), 1);
        hold(&mut session, InputKeys::empty(), 60);
        assert_eq!(session.tick(), 60);
        assert_eq!(session.now_ms(), 1000);
    }

    #[test]
    fn test_walk_right_moves_by_speed() {
        let mut session = session_on(field(&[]), 1);
        let start = player_center(&session);
        hold(&mut session, InputKeys::RIGHT, 4);
        let moved = player_center(&session) - start;
        assert!((moved.x - 6.0).abs() < 1e-4);
        assert!(moved.y.abs() < 1e-4);
        assert_eq!(session.player().actor.state, ActorState::Walking);
    }

    #[test]
    fn test_walls_stop_the_player() {
        let mut session = session_on(field(&[]), 1);
        hold(&mut session, InputKeys::RIGHT, 200);
        let wall_left = cell_center(11, START_CELL.1).x - 8.0;
        let right = session.player().actor.hitbox.right();
        assert!(right <= wall_left + 1e-3, "player crossed the wall: {right}");
        assert!(right > wall_left - 1.0, "player stopped short: {right}");
    }

    #[test]
    fn test_scripted_input_drives_the_session() {
        let mut session = session_on(field(&[]), 1);
        let mut input = ScriptedInput::parse("10 right\n10 down\n").unwrap();
        let start = player_center(&session);
        session.run(&mut input, &mut RecordingAudio::new(), 20);
        let moved = player_center(&session) - start;
        assert!((moved.x - 15.0).abs() < 1e-4);
        assert!((moved.y - 15.0).abs() < 1e-4);
    }
}

// =============================================================================
// Damage & Death
// =============================================================================

mod damage_tests {
    use super::*;

    #[test]
    fn test_contact_hit_at_two_hearts_sounds_low_health_once() {
        let mut session = session_on(field(&[]), 3);
        session.player_mut().actor.health = Health::with_current(256, 768);
        let center = player_center(&session);
        place_monster(&mut session, Species::Moblin, center + Vec2::new(8.0, 0.0));

        let mut audio = RecordingAudio::new();
        session.step(InputKeys::empty(), &mut audio);

        let actor = &session.player().actor;
        assert_eq!(actor.health.current(), 128);
        assert_eq!(actor.state, ActorState::Hurt(HurtKind::Horizontal));
        assert!(actor.invulnerable);
        assert_eq!(actor.knockback, Vec2::new(-1.0, 0.0));
        assert_eq!(audio.plays_of(SoundCue::LowHealth), 1);
        assert_eq!(audio.plays_of(SoundCue::PlayerHurt), 1);

        for _ in 0..5 {
            session.step(InputKeys::empty(), &mut audio);
        }
        assert_eq!(session.player().actor.health.current(), 128);
        assert_eq!(audio.plays_of(SoundCue::LowHealth), 1);
    }

    #[test]
    fn test_knockback_pushes_player_away() {
        let mut session = session_on(field(&[]), 3);
        let center = player_center(&session);
        place_monster(&mut session, Species::Moblin, center + Vec2::new(8.0, 0.0));
        hold(&mut session, InputKeys::empty(), 3);
        assert!(player_center(&session).x < center.x);
    }

    #[test]
    fn test_lethal_hit_runs_death_cutscene_and_restart() {
        let mut session = session_on(field(&[]), 3);
        session.player_mut().actor.health = Health::with_current(128, 768);
        let center = player_center(&session);
        place_monster(&mut session, Species::Moblin, center + Vec2::new(8.0, 0.0));

        hold(&mut session, InputKeys::empty(), 1);
        assert!(session.player().is_dead());
        assert!(session.death().is_some());
        assert!(session.level().monsters.is_empty());
        assert_eq!(
            events_matching(&session, |e| matches!(e, GameEvent::PlayerDied)).len(),
            1
        );

        let ticks = run_until(&mut session, 1200, Session::is_game_over);
        assert!(ticks.is_some(), "cutscene never reached game over");

        let stages: Vec<u8> = events_matching(&session, |e| matches!(e, GameEvent::DeathStage { .. }))
            .into_iter()
            .filter_map(|r| match r.event {
                GameEvent::DeathStage { stage } => Some(stage),
                _ => None,
            })
            .collect();
        assert_eq!(stages, (0..=11).collect::<Vec<u8>>());

        // Game over holds until confirmed; the menu stays closed.
        tap(&mut session, InputKeys::MENU);
        hold(&mut session, InputKeys::empty(), 30);
        assert!(session.is_game_over());
        assert!(!session.is_paused());

        tap(&mut session, InputKeys::CONFIRM);
        assert!(session.death().is_none());
        assert_eq!(session.player().actor.health.current(), 768);
        assert_eq!(player_center(&session), session.level().player_start);
        assert_eq!(
            events_matching(&session, |e| matches!(e, GameEvent::Restarted)).len(),
            1
        );
    }

    #[test]
    fn test_death_floor_turns_red() {
        let mut session = session_on(field(&[]), 3);
        session.player_mut().actor.health = Health::with_current(128, 768);
        let center = player_center(&session);
        place_monster(&mut session, Species::Moblin, center + Vec2::new(8.0, 0.0));

        let reached = run_until(&mut session, 300, |s| {
            s.death().map(crate::death::DeathSequence::tint) == Some(FloorTint::Red)
        });
        assert!(reached.is_some());

        let mut canvas = RecordingCanvas::new();
        session.draw(&mut canvas);
        let hud = session.settings().hud_height;
        assert_eq!(
            canvas.blits[0],
            (session.library().floor(FloorTint::Red), Vec2::new(0.0, hud))
        );
    }
}

// =============================================================================
// Kills & Loot
// =============================================================================

mod kill_tests {
    use super::*;

    fn swing_at_octorok(settings: Settings) -> Session {
        let mut session = session_with(settings, field(&[]), 5);
        let center = player_center(&session);
        place_monster(&mut session, Species::Octorok, center + Vec2::new(0.0, 14.0));
        tap(&mut session, InputKeys::ACTION_A);
        session
    }

    #[test]
    fn test_sword_kill_is_reaped_and_counted() {
        let mut session = swing_at_octorok(Settings {
            loot_drop_chance: 0.0,
            ..Settings::default()
        });
        assert_eq!(
            events_matching(&session, |e| matches!(e, GameEvent::MonsterDied { .. })).len(),
            1
        );

        let reaped = run_until(&mut session, 120, |s| s.world().kill_count == 1);
        assert!(reaped.is_some());
        assert!(session.level().monsters.is_empty());
        let records = events_matching(&session, |e| matches!(e, GameEvent::MonsterReaped { .. }));
        assert_eq!(records.len(), 1);
        assert!(matches!(
            records[0].event,
            GameEvent::MonsterReaped { kill_count: 1, .. }
        ));
        assert!(session.level().pickups.is_empty());
        assert!(!session.world().is_decimated("field"));
    }

    #[test]
    fn test_clearing_a_dungeon_decimates_it() {
        let layouts = LevelLayouts::from_layers(
            "dungeon_1",
            [
                (LayerKind::Boundary, walled_ring()),
                (LayerKind::Entities, entities(&[(2, 2, Species::Octorok)])),
            ],
        );
        let mut session = session_with(
            Settings {
                loot_drop_chance: 0.0,
                ..Settings::default()
            },
            layouts.clone(),
            5,
        );
        assert_eq!(session.level().monster_count(), 1);
        let now = session.now_ms();
        for monster in session.level_mut().monsters.values_mut() {
            monster.kill(now, &mut EventLog::new());
        }
        run_until(&mut session, 120, |s| s.world().kill_count == 1);
        assert!(session.world().is_decimated("dungeon_1"));

        session.enter_level(layouts).unwrap();
        assert_eq!(session.level().monster_count(), 0);
    }

    #[test]
    fn test_certain_drop_follows_loot_table() {
        let mut session = swing_at_octorok(Settings {
            loot_drop_chance: 1.0,
            ..Settings::default()
        });
        run_until(&mut session, 120, |s| s.world().kill_count == 1);

        let drops = events_matching(&session, |e| matches!(e, GameEvent::LootDropped { .. }));
        assert_eq!(drops.len(), 1);
        assert!(matches!(
            drops[0].event,
            GameEvent::LootDropped { kind, .. } if kind == loot_for_kill(0)
        ));
        let pickup = session.level().pickups.values().next().unwrap();
        assert_eq!(pickup.kind, PickupKind::Loot(LootKind::Rupee));
        assert!(matches!(pickup.origin, PickupOrigin::Drop { .. }));

        hold(&mut session, InputKeys::DOWN, 10);
        assert_eq!(session.player().inventory.rupees, 1);
        assert!(session.level().pickups.is_empty());
    }

    #[test]
    fn test_fairy_drop_flies_off_and_heals_on_touch() {
        let mut session = session_with(
            Settings {
                loot_drop_chance: 1.0,
                ..Settings::default()
            },
            field(&[]),
            5,
        );
        let mut store = MemoryStore::new();
        let world = WorldState {
            kill_count: 3,
            ..WorldState::default()
        };
        store.save(&session.player().snapshot("field"), &world).unwrap();
        session.load(&mut store).unwrap();
        assert_eq!(loot_for_kill(3), LootKind::Fairy);

        let monster = place_monster(&mut session, Species::Octorok, cell_center(2, 2));
        let now = session.now_ms();
        session
            .level_mut()
            .monsters
            .get_mut(&monster)
            .unwrap()
            .kill(now, &mut EventLog::new());
        run_until(&mut session, 120, |s| s.world().kill_count == 4);

        assert!(session.level().pickups.is_empty());
        let (fairy, particle) = session
            .level()
            .particles
            .iter()
            .find(|(_, p)| p.kind == ParticleKind::Fairy)
            .map(|(id, p)| (*id, p.center()))
            .expect("fairy released");
        let drops = events_matching(&session, |e| matches!(e, GameEvent::LootDropped { .. }));
        assert!(matches!(
            drops[0].event,
            GameEvent::LootDropped { pickup, kind: LootKind::Fairy } if pickup == fairy
        ));

        session.player_mut().actor.health = Health::with_current(100, 768);
        session.player_mut().actor.teleport(particle);
        hold(&mut session, InputKeys::empty(), 1);
        assert!(session.player().actor.health.is_full());
        assert!(!session.player().actor.state.is_hurt());
        assert!(!session.level().particles.contains_key(&fairy));
    }

    #[test]
    fn test_uncollected_loot_expires() {
        let settings = Settings {
            loot_drop_chance: 1.0,
            ..Settings::default()
        };
        let lifetime = settings.loot_lifetime_ms;
        let mut session = swing_at_octorok(settings);
        run_until(&mut session, 120, |s| !s.level().pickups.is_empty());
        let dropped_at = session.now_ms();

        let gone = run_until(&mut session, 1000, |s| s.level().pickups.is_empty());
        assert!(gone.is_some());
        assert!(session.now_ms() >= dropped_at + lifetime);
        assert_eq!(session.player().inventory.rupees, 0);
    }
}

// =============================================================================
// Pickups, Shops & Triggers
// =============================================================================

mod pickup_tests {
    use super::*;

    #[test]
    fn test_map_item_is_collected_once() {
        let layouts = with_layer(
            LayerKind::Items,
            START_CELL.0 + 1,
            START_CELL.1,
            i32::try_from(ItemKind::Boomerang.code()).unwrap(),
        );
        let mut session = session_on(layouts.clone(), 2);
        assert_eq!(session.level().pickups.len(), 1);

        hold(&mut session, InputKeys::RIGHT, 4);
        assert!(session.player().inventory.owns(ItemKind::Boomerang));
        assert!(session.world().is_consumed("field", "item:7:4"));

        session.enter_level(layouts).unwrap();
        assert!(session.level().pickups.is_empty());
    }

    #[test]
    fn test_shop_denies_then_sells() {
        let code = 100 + i32::try_from(ItemKind::Boomerang.code()).unwrap();
        let layouts = with_layer(LayerKind::Items, START_CELL.0 + 1, START_CELL.1, code);
        let mut session = session_on(layouts, 2);

        hold(&mut session, InputKeys::RIGHT, 6);
        let denied = events_matching(&session, |e| matches!(e, GameEvent::PurchaseDenied { .. }));
        assert_eq!(denied.len(), 1);
        assert_eq!(session.level().pickups.len(), 1);

        session.player_mut().inventory.rupees = 100;
        hold(&mut session, InputKeys::empty(), 1);
        assert!(session.player().inventory.owns(ItemKind::Boomerang));
        assert_eq!(session.player().inventory.rupees, 40);
        assert!(session.world().is_sold("field", "shop:7:4"));
        assert!(session.level().pickups.is_empty());
    }

    #[test]
    fn test_free_shopping_skips_payment() {
        let code = 100 + i32::try_from(ItemKind::Candle.code()).unwrap();
        let layouts = with_layer(LayerKind::Items, START_CELL.0 + 1, START_CELL.1, code);
        let settings = Settings {
            ignore_player_money_amount: true,
            ..Settings::default()
        };
        let mut session = session_with(settings, layouts, 2);
        hold(&mut session, InputKeys::RIGHT, 4);
        assert!(session.player().inventory.owns(ItemKind::Candle));
        assert_eq!(session.player().inventory.rupees, 0);
    }

    #[test]
    fn test_stairs_exit_once() {
        let layouts = with_layer(LayerKind::Triggers, START_CELL.0 + 1, START_CELL.1, 5);
        let mut session = session_on(layouts, 2);

        hold(&mut session, InputKeys::RIGHT, 3);
        assert_eq!(session.player().actor.state, ActorState::Stairs);

        let ticks = run_until(&mut session, 120, |s| s.pending_exit().is_some());
        assert!(ticks.is_some());
        assert_eq!(session.pending_exit(), Some(5));

        hold(&mut session, InputKeys::empty(), 120);
        let exits = events_matching(&session, |e| matches!(e, GameEvent::LevelExit { .. }));
        assert_eq!(exits.len(), 1);

        session.enter_level(field(&[])).unwrap();
        assert_eq!(session.pending_exit(), None);
        assert_eq!(player_center(&session), session.level().player_start);
    }

    #[test]
    fn test_load_clears_pause_and_pending_exit() {
        let layouts = with_layer(LayerKind::Triggers, START_CELL.0 + 1, START_CELL.1, 5);
        let mut session = session_on(layouts, 2);
        let mut store = MemoryStore::new();
        session.save(&mut store).unwrap();

        hold(&mut session, InputKeys::RIGHT, 3);
        run_until(&mut session, 120, |s| s.pending_exit().is_some());
        tap(&mut session, InputKeys::MENU);
        assert!(session.is_paused());
        assert_eq!(session.pending_exit(), Some(5));

        session.load(&mut store).unwrap();
        assert!(!session.is_paused());
        assert_eq!(session.pending_exit(), None);

        hold(&mut session, InputKeys::RIGHT, 3);
        assert_eq!(session.player().actor.state, ActorState::Stairs);
    }

    #[test]
    fn test_negative_trigger_warps() {
        let layouts = with_layer(LayerKind::Triggers, START_CELL.0 + 1, START_CELL.1, -3);
        let mut session = session_on(layouts, 2);
        hold(&mut session, InputKeys::RIGHT, 3);
        assert_eq!(session.player().actor.state, ActorState::Warping);
        run_until(&mut session, 200, |s| s.pending_exit().is_some());
        assert_eq!(session.pending_exit(), Some(3));
    }
}

// =============================================================================
// Pause, Persistence, Audio & Drawing
// =============================================================================

mod system_tests {
    use super::*;

    #[test]
    fn test_pause_freezes_world_and_timers() {
        let mut session = session_on(field(&[]), 4);
        let now = session.now_ms();
        let mut rng = <rand_chacha::ChaCha8Rng as rand::SeedableRng>::seed_from_u64(1);
        let monster = session
            .level_mut()
            .spawn_monster(Species::Octorok, cell_center(2, 2), now, &mut rng);
        let start = player_center(&session);

        session.step(InputKeys::MENU, &mut RecordingAudio::new());
        assert!(session.is_paused());
        hold(&mut session, InputKeys::RIGHT, 60);
        assert_eq!(player_center(&session), start);

        let mut canvas = RecordingCanvas::new();
        session.draw(&mut canvas);
        assert!(canvas.blits.is_empty());

        tap(&mut session, InputKeys::MENU);
        assert!(!session.is_paused());
        assert_eq!(
            session.level().monsters[&monster].actor.state,
            ActorState::Spawning
        );
        let toggles = events_matching(&session, |e| matches!(e, GameEvent::Paused { .. }));
        assert_eq!(toggles.len(), 2);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let layouts = with_layer(
            LayerKind::Items,
            START_CELL.0 + 1,
            START_CELL.1,
            i32::try_from(ItemKind::Bomb.code()).unwrap(),
        );
        let mut session = session_on(layouts.clone(), 6);
        hold(&mut session, InputKeys::RIGHT, 4);
        session.player_mut().inventory.rupees = 42;
        let mut store = MemoryStore::new();
        session.save(&mut store).unwrap();

        let mut fresh = session_on(layouts, 6);
        assert_eq!(fresh.level().pickups.len(), 1);
        fresh.load(&mut store).unwrap();
        assert_eq!(fresh.player().inventory.rupees, 42);
        assert!(fresh.player().inventory.owns(ItemKind::Bomb));
        assert_eq!(fresh.player().inventory.bombs, 4);
        assert!(fresh.level().pickups.is_empty());
    }

    #[test]
    fn test_load_from_empty_store_changes_nothing() {
        let mut session = session_on(field(&[]), 6);
        session.player_mut().inventory.rupees = 9;
        assert!(session.load(&mut MemoryStore::new()).is_err());
        assert_eq!(session.player().inventory.rupees, 9);
    }

    #[test]
    fn test_system_keys_emit_requests() {
        let mut session = session_on(field(&[]), 6);
        tap(&mut session, InputKeys::SAVE);
        tap(&mut session, InputKeys::LOAD);
        assert_eq!(
            events_matching(&session, |e| matches!(e, GameEvent::SaveRequested)).len(),
            1
        );
        assert_eq!(
            events_matching(&session, |e| matches!(e, GameEvent::LoadRequested)).len(),
            1
        );
    }

    #[test]
    fn test_sounds_are_flushed_once() {
        let mut session = session_on(field(&[]), 6);
        let mut audio = RecordingAudio::new();
        session.step(InputKeys::ACTION_A, &mut audio);
        session.step(InputKeys::ACTION_A, &mut audio);
        assert_eq!(audio.plays_of(SoundCue::Sword), 1);
        assert!(session.events().unflushed().is_empty());
    }

    #[test]
    fn test_draw_puts_player_last() {
        let mut session = session_on(field(&[]), 6);
        hold(&mut session, InputKeys::empty(), 1);
        let mut canvas = RecordingCanvas::new();
        session.draw(&mut canvas);

        let walls = session
            .level()
            .obstacles
            .values()
            .filter(|o| o.sprite.is_some())
            .count();
        assert_eq!(canvas.blits.len(), walls + 1);
        let actor = &session.player().actor;
        assert_eq!(
            canvas.blits.last().copied(),
            Some((actor.image, actor.rect.top_left()))
        );
    }

    #[test]
    fn test_summary_reflects_state() {
        let mut session = session_on(field(&[(2, 2, Species::Leever)]), 6);
        hold(&mut session, InputKeys::empty(), 10);
        let summary = session.summary();
        assert_eq!(summary.tick, 10);
        assert_eq!(summary.level, "field");
        assert_eq!(summary.health, 768);
        assert_eq!(summary.monsters, 1);
        assert_eq!(summary.death_stage, None);
    }
}
