//! The live contents of one level.
//!
//! A [`Level`] owns every collection the tick mutates: obstacles, monsters,
//! particles, pickups, NPCs and trigger zones. Collections are `BTreeMap`s
//! keyed by [`EntityId`]; ids are handed out monotonically, so iteration
//! follows spawn order and replays are deterministic.
//!
//! # Placement
//!
//! [`Level::build`] places one entity per non-empty layout cell. A cell at
//! `(col, row)` covers
//!
//! ```text
//! x = col * tile_size
//! y = row * tile_size + hud_height
//! ```
//!
//! Entities spawned from the `entities` layer are centered on their cell.
//! Unknown codes on coded layers are rejected with
//! [`MapError::UnknownTileCode`].

use std::collections::BTreeMap;

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::config::Settings;
use crate::entity::{EntityId, EntityTag};
use crate::error::MapError;
use crate::events::{EventLog, GameEvent};
use crate::geometry::Rect;
use crate::items::{ItemKind, Npc, Pickup, PickupKind, PickupOrigin};
use crate::map::{LayerKind, LevelLayouts};
use crate::monster::Monster;
use crate::particle::{Particle, ParticleSpec};
use crate::persistence::WorldState;
use crate::resolver::{CollisionProfile, CollisionResolver, Obstacle, ObstacleKind};
use crate::species::Species;
use crate::sprites::SpriteLibrary;

/// Entity-layer code of the player start.
pub const PLAYER_START_CODE: i32 = 0;
/// Item-layer codes from here on are shop offers.
pub const SHOP_CODE_BASE: i32 = 100;
/// Level ids starting with this are dungeons; only they are recorded as
/// decimated once cleared.
pub const DUNGEON_PREFIX: &str = "dungeon";

// =============================================================================
// Triggers
// =============================================================================

/// What a trigger zone does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    /// Staircase down into another level.
    Stairs,
    /// Instant warp.
    Warp,
}

/// A zone that sends the player elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    /// Touch area.
    pub hitbox: Rect,
    /// Stairs or warp.
    pub kind: TriggerKind,
    /// Destination code reported on exit.
    pub destination: i32,
}

impl Trigger {
    /// Decodes a trigger-layer code: non-negative is stairs, negative is a warp
    /// to the absolute value.
    #[must_use]
    pub fn from_code(code: i32, hitbox: Rect) -> Self {
        if code >= 0 {
            Self {
                hitbox,
                kind: TriggerKind::Stairs,
                destination: code,
            }
        } else {
            Self {
                hitbox,
                kind: TriggerKind::Warp,
                destination: code.saturating_neg(),
            }
        }
    }
}

// =============================================================================
// Level
// =============================================================================

/// Everything alive in the current level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Level {
    /// Level identifier.
    pub id: String,
    /// Static tiles.
    pub obstacles: BTreeMap<EntityId, Obstacle>,
    /// Live monsters.
    pub monsters: BTreeMap<EntityId, Monster>,
    /// Live particles.
    pub particles: BTreeMap<EntityId, Particle>,
    /// Collectibles.
    pub pickups: BTreeMap<EntityId, Pickup>,
    /// Non-player characters.
    pub npcs: BTreeMap<EntityId, Npc>,
    /// Stairs and warps.
    pub triggers: Vec<Trigger>,
    /// Center of the player start tile.
    pub player_start: Vec2,
    next_id: u64,
}

impl Level {
    /// An empty level.
    #[must_use]
    pub fn new(id: &str, player_start: Vec2) -> Self {
        Self {
            id: id.to_string(),
            obstacles: BTreeMap::new(),
            monsters: BTreeMap::new(),
            particles: BTreeMap::new(),
            pickups: BTreeMap::new(),
            npcs: BTreeMap::new(),
            triggers: Vec::new(),
            player_start,
            next_id: 1,
        }
    }

    /// Places every layer of `layouts`.
    ///
    /// Map items already consumed and shop offers already sold are skipped,
    /// as are the monsters of a decimated level.
    ///
    /// # Errors
    ///
    /// [`MapError::UnknownTileCode`] for a code with no meaning on its layer,
    /// [`MapError::MissingPlayerStart`] if the entities layer has no start.
    pub fn build<R: Rng + ?Sized>(
        layouts: &LevelLayouts,
        settings: &Settings,
        library: &SpriteLibrary,
        world: &WorldState,
        now_ms: u64,
        rng: &mut R,
    ) -> Result<Self, MapError> {
        let id = layouts.level_id.as_str();
        let grid = Grid::from_settings(settings);
        let mut level = Level::new(id, Vec2::ZERO);

        for (col, row, code) in layouts.layer(LayerKind::Boundary).tiles() {
            let kind = match code {
                0 => ObstacleKind::Wall,
                1 => ObstacleKind::Limit,
                _ => return Err(unknown(LayerKind::Boundary, code, col, row)),
            };
            level.add_obstacle(grid.cell(col, row), kind, library);
        }
        for (col, row, _) in layouts.layer(LayerKind::Water).tiles() {
            level.add_obstacle(grid.cell(col, row), ObstacleKind::Water, library);
        }
        for (col, row, _) in layouts.layer(LayerKind::LakeBorder).tiles() {
            level.add_obstacle(grid.cell(col, row), ObstacleKind::LakeBorder, library);
        }

        let mut start = None;
        let decimated = world.is_decimated(id);
        for (col, row, code) in layouts.layer(LayerKind::Entities).tiles() {
            let center = grid.cell(col, row).center();
            if code == PLAYER_START_CODE {
                start = Some(center);
                continue;
            }
            let species = Species::from_code(code)
                .ok_or_else(|| unknown(LayerKind::Entities, code, col, row))?;
            if !decimated {
                level.spawn_monster(species, center, now_ms, rng);
            }
        }
        level.player_start = start.ok_or_else(|| MapError::MissingPlayerStart(id.to_string()))?;

        for (col, row, code) in layouts.layer(LayerKind::Items).tiles() {
            let hitbox = grid.cell(col, row);
            let (item, origin) = if code >= SHOP_CODE_BASE {
                let item = ItemKind::from_code(code - SHOP_CODE_BASE)
                    .ok_or_else(|| unknown(LayerKind::Items, code, col, row))?;
                let key = format!("shop:{col}:{row}");
                if world.is_sold(id, &key) {
                    continue;
                }
                let price = item.default_price();
                (item, PickupOrigin::Shop { key, price })
            } else {
                let item = ItemKind::from_code(code)
                    .ok_or_else(|| unknown(LayerKind::Items, code, col, row))?;
                let key = format!("item:{col}:{row}");
                if world.is_consumed(id, &key) {
                    continue;
                }
                (item, PickupOrigin::Map { key })
            };
            level.add_pickup(Pickup {
                kind: PickupKind::Item(item),
                hitbox,
                origin,
            });
        }

        for (col, row, code) in layouts.layer(LayerKind::Triggers).tiles() {
            level.triggers.push(Trigger::from_code(code, grid.cell(col, row)));
        }

        for (col, row, code) in layouts.layer(LayerKind::Npcs).tiles() {
            let sprite_code =
                u32::try_from(code).map_err(|_| unknown(LayerKind::Npcs, code, col, row))?;
            let npc_id = level.allocate(EntityTag::Npc);
            level.npcs.insert(
                npc_id,
                Npc {
                    hitbox: grid.cell(col, row),
                    sprite: library.npc(sprite_code),
                },
            );
        }

        info!(
            level = id,
            obstacles = level.obstacles.len(),
            monsters = level.monsters.len(),
            pickups = level.pickups.len(),
            npcs = level.npcs.len(),
            triggers = level.triggers.len(),
            "level built"
        );
        Ok(level)
    }

    // =========================================================================
    // Spawning
    // =========================================================================

    fn allocate(&mut self, tag: EntityTag) -> EntityId {
        let id = EntityId::new(self.next_id);
        self.next_id += 1;
        trace!(%id, %tag, "id allocated");
        id
    }

    /// Adds a static tile with the library's sprite for its kind.
    pub fn add_obstacle(&mut self, hitbox: Rect, kind: ObstacleKind, library: &SpriteLibrary) -> EntityId {
        let id = self.allocate(EntityTag::Obstacle);
        let mut obstacle = Obstacle::new(hitbox, kind);
        obstacle.sprite = library.tile(kind);
        self.obstacles.insert(id, obstacle);
        id
    }

    /// Spawns a monster centered on `center`.
    pub fn spawn_monster<R: Rng + ?Sized>(
        &mut self,
        species: Species,
        center: Vec2,
        now_ms: u64,
        rng: &mut R,
    ) -> EntityId {
        let id = self.allocate(EntityTag::Monster);
        self.monsters
            .insert(id, Monster::spawn(id, species, center, now_ms, rng));
        id
    }

    /// Spawns a particle and records it.
    pub fn spawn_particle(&mut self, spec: &ParticleSpec, now_ms: u64, events: &mut EventLog) -> EntityId {
        let id = self.allocate(EntityTag::Particle);
        self.particles.insert(id, Particle::spawn(spec, now_ms));
        events.push(GameEvent::ParticleSpawned {
            particle: id,
            kind: spec.kind,
        });
        debug!(%id, kind = ?spec.kind, "particle spawned");
        id
    }

    /// Removes a particle and records it.
    pub fn despawn_particle(&mut self, id: EntityId, events: &mut EventLog) -> Option<Particle> {
        let particle = self.particles.remove(&id)?;
        events.push(GameEvent::ParticleExpired {
            particle: id,
            kind: particle.kind,
        });
        Some(particle)
    }

    /// Adds a collectible.
    pub fn add_pickup(&mut self, pickup: Pickup) -> EntityId {
        let id = self.allocate(EntityTag::Pickup);
        self.pickups.insert(id, pickup);
        id
    }

    /// Removes every monster and particle, as the death cutscene does first.
    pub fn clear_hostiles(&mut self, events: &mut EventLog) {
        let ids: Vec<EntityId> = self.particles.keys().copied().collect();
        for id in ids {
            self.despawn_particle(id, events);
        }
        let monsters = self.monsters.len();
        self.monsters.clear();
        debug!(monsters, "hostiles cleared");
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Hitboxes that stop a mover with `profile`. NPCs also block the player.
    #[must_use]
    pub fn solids_for(&self, profile: CollisionProfile) -> Vec<Rect> {
        let mut solids = CollisionResolver::solids(profile, self.obstacles.values());
        if profile == CollisionProfile::Player {
            solids.extend(self.npcs.values().map(|npc| npc.hitbox));
        }
        solids
    }

    /// Open-water tiles, where a relocating diver may surface.
    #[must_use]
    pub fn water_tiles(&self) -> Vec<Rect> {
        self.obstacles
            .values()
            .filter(|o| o.kind == ObstacleKind::Water)
            .map(|o| o.hitbox)
            .collect()
    }

    /// Number of live monsters.
    #[must_use]
    pub fn monster_count(&self) -> usize {
        self.monsters.len()
    }

    /// True for dungeon levels, whose ids start with [`DUNGEON_PREFIX`].
    #[must_use]
    pub fn is_dungeon(&self) -> bool {
        self.id.starts_with(DUNGEON_PREFIX)
    }
}

#[derive(Debug, Clone, Copy)]
struct Grid {
    tile: f32,
    top: f32,
}

impl Grid {
    fn from_settings(settings: &Settings) -> Self {
        Self {
            tile: settings.tile_size,
            top: settings.hud_height,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn cell(self, col: usize, row: usize) -> Rect {
        Rect::new(
            col as f32 * self.tile,
            row as f32 * self.tile + self.top,
            self.tile,
            self.tile,
        )
    }
}

fn unknown(layer: LayerKind, code: i32, col: usize, row: usize) -> MapError {
    MapError::UnknownTileCode {
        layer: layer.name().to_string(),
        code,
        col,
        row,
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::map::Layout;

    fn layouts(entities: Vec<Vec<i32>>, extra: Vec<(LayerKind, Layout)>) -> LevelLayouts {
        let mut layers = vec![
            (
                LayerKind::Boundary,
                Layout::new(vec![vec![0, 0, 0, 0], vec![0, -1, -1, 1]]),
            ),
            (LayerKind::Entities, Layout::new(entities)),
        ];
        layers.extend(extra);
        LevelLayouts::from_layers("overworld", layers)
    }

    fn build(layouts: &LevelLayouts, world: &WorldState) -> Result<Level, MapError> {
        let settings = Settings::default();
        let library = SpriteLibrary::from_settings(&settings).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        Level::build(layouts, &settings, &library, world, 0, &mut rng)
    }

    mod build_tests {
        use super::*;

        #[test]
        fn test_places_tiles_below_hud() {
            let level = build(
                &layouts(vec![vec![-1, -1], vec![-1, 0, 1]], vec![]),
                &WorldState::default(),
            )
            .unwrap();
            assert_eq!(level.obstacles.len(), 6);
            let limit = level
                .obstacles
                .values()
                .find(|o| o.kind == ObstacleKind::Limit)
                .unwrap();
            assert_eq!(limit.hitbox, Rect::new(48.0, 80.0, 16.0, 16.0));
            assert_eq!(limit.sprite, None);
            assert_eq!(level.player_start, Vec2::new(24.0, 88.0));
            let monster = level.monsters.values().next().unwrap();
            assert_eq!(monster.species, Species::Octorok);
            assert_eq!(monster.actor.center(), Vec2::new(40.0, 88.0));
        }

        #[test]
        fn test_missing_start_is_fatal() {
            let err = build(&layouts(vec![vec![1]], vec![]), &WorldState::default()).unwrap_err();
            assert!(matches!(err, MapError::MissingPlayerStart(id) if id == "overworld"));
        }

        #[test]
        fn test_unknown_species_code_is_fatal() {
            let err = build(&layouts(vec![vec![0, 9]], vec![]), &WorldState::default()).unwrap_err();
            assert!(matches!(
                err,
                MapError::UnknownTileCode { code: 9, col: 1, row: 0, .. }
            ));
        }

        #[test]
        fn test_consumed_and_sold_items_are_skipped() {
            let items = Layout::new(vec![vec![3, 101, 4]]);
            let layouts = layouts(vec![vec![0]], vec![(LayerKind::Items, items)]);

            let fresh = build(&layouts, &WorldState::default()).unwrap();
            assert_eq!(fresh.pickups.len(), 3);
            let offer = fresh
                .pickups
                .values()
                .find(|p| p.price().is_some())
                .unwrap();
            assert_eq!(offer.kind, PickupKind::Item(ItemKind::Boomerang));
            assert_eq!(offer.price(), Some(60));

            let mut world = WorldState::default();
            world.consume_item("overworld", "item:0:0");
            world.mark_sold("overworld", "shop:1:0");
            let later = build(&layouts, &world).unwrap();
            assert_eq!(later.pickups.len(), 1);
            assert_eq!(
                later.pickups.values().next().unwrap().kind,
                PickupKind::Item(ItemKind::Ladder)
            );
        }

        #[test]
        fn test_dungeon_ids() {
            assert!(Level::new("dungeon_1", Vec2::ZERO).is_dungeon());
            assert!(!Level::new("overworld", Vec2::ZERO).is_dungeon());
            assert!(!Level::new("shop_dungeon", Vec2::ZERO).is_dungeon());
        }

        #[test]
        fn test_decimated_level_has_no_monsters() {
            let mut world = WorldState::default();
            world.set_decimated("overworld");
            let level = build(&layouts(vec![vec![0, 1, 2]], vec![]), &world).unwrap();
            assert_eq!(level.monster_count(), 0);
        }

        #[test]
        fn test_trigger_codes() {
            let triggers = Layout::new(vec![vec![2, -3]]);
            let level = build(
                &layouts(vec![vec![0]], vec![(LayerKind::Triggers, triggers)]),
                &WorldState::default(),
            )
            .unwrap();
            assert_eq!(level.triggers[0].kind, TriggerKind::Stairs);
            assert_eq!(level.triggers[0].destination, 2);
            assert_eq!(level.triggers[1].kind, TriggerKind::Warp);
            assert_eq!(level.triggers[1].destination, 3);
        }
    }

    mod query_tests {
        use super::*;

        #[test]
        fn test_npcs_only_block_player() {
            let npcs = Layout::new(vec![vec![-1, -1, 2]]);
            let level = build(
                &layouts(vec![vec![0]], vec![(LayerKind::Npcs, npcs)]),
                &WorldState::default(),
            )
            .unwrap();
            let player = level.solids_for(CollisionProfile::Player);
            let land = level.solids_for(CollisionProfile::Land);
            assert_eq!(player.len(), land.len() + 1);
        }

        #[test]
        fn test_clear_hostiles_records_particles() {
            let mut level = build(&layouts(vec![vec![0, 1, 2]], vec![]), &WorldState::default()).unwrap();
            let mut events = EventLog::new();
            let spec = ParticleSpec::new(
                crate::particle::ParticleKind::Rock,
                crate::particle::Owner::Player,
                Rect::new(0.0, 0.0, 8.0, 8.0),
                crate::geometry::Facing::Up,
                64,
            );
            level.spawn_particle(&spec, 0, &mut events);
            level.clear_hostiles(&mut events);
            assert_eq!(level.monster_count(), 0);
            assert!(level.particles.is_empty());
            assert!(events
                .records()
                .iter()
                .any(|r| matches!(r.event, GameEvent::ParticleExpired { .. })));
        }
    }
}
