//! Items, the player's inventory, pickups and NPCs.

use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::animation::SpriteId;
use crate::geometry::Rect;
use crate::loot::LootKind;

// =============================================================================
// Items
// =============================================================================

/// Items the player can own or collect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    /// Melee weapon for action A.
    Sword,
    /// Returning throwable.
    Boomerang,
    /// Placed explosive.
    Bomb,
    /// Shoots a short-lived flame.
    Candle,
    /// Bridges one water tile.
    Ladder,
    /// Raises maximum health by one heart.
    HeartContainer,
    /// Triforce piece.
    Triforce,
}

impl ItemKind {
    /// Every item in code order.
    pub const ALL: [ItemKind; 7] = [
        ItemKind::Sword,
        ItemKind::Boomerang,
        ItemKind::Bomb,
        ItemKind::Candle,
        ItemKind::Ladder,
        ItemKind::HeartContainer,
        ItemKind::Triforce,
    ];

    /// Stable identifier used in save files.
    #[must_use]
    pub fn id(self) -> &'static str {
        match self {
            ItemKind::Sword => "sword",
            ItemKind::Boomerang => "boomerang",
            ItemKind::Bomb => "bomb",
            ItemKind::Candle => "candle",
            ItemKind::Ladder => "ladder",
            ItemKind::HeartContainer => "heart_container",
            ItemKind::Triforce => "triforce",
        }
    }

    /// Parses a save-file identifier.
    #[must_use]
    pub fn from_id(id: &str) -> Option<ItemKind> {
        ItemKind::ALL.into_iter().find(|item| item.id() == id)
    }

    /// Item for a map-layer tile code (index into [`ItemKind::ALL`]).
    #[must_use]
    pub fn from_code(code: i32) -> Option<ItemKind> {
        usize::try_from(code)
            .ok()
            .and_then(|i| ItemKind::ALL.get(i).copied())
    }

    /// Position in [`ItemKind::ALL`].
    #[must_use]
    pub fn code(self) -> u32 {
        match self {
            ItemKind::Sword => 0,
            ItemKind::Boomerang => 1,
            ItemKind::Bomb => 2,
            ItemKind::Candle => 3,
            ItemKind::Ladder => 4,
            ItemKind::HeartContainer => 5,
            ItemKind::Triforce => 6,
        }
    }

    /// True for items usable with action B.
    #[must_use]
    pub fn is_b_item(self) -> bool {
        matches!(self, ItemKind::Boomerang | ItemKind::Bomb | ItemKind::Candle)
    }

    /// Shop price when a layout does not specify one.
    #[must_use]
    pub fn default_price(self) -> u32 {
        match self {
            ItemKind::Sword | ItemKind::Triforce => 0,
            ItemKind::Boomerang => 60,
            ItemKind::Bomb => 20,
            ItemKind::Candle => 60,
            ItemKind::Ladder => 80,
            ItemKind::HeartContainer => 100,
        }
    }

    /// Ownership flag, for items that are kept rather than consumed.
    #[must_use]
    pub fn owned_flag(self) -> Option<OwnedItems> {
        match self {
            ItemKind::Sword => Some(OwnedItems::SWORD),
            ItemKind::Boomerang => Some(OwnedItems::BOOMERANG),
            ItemKind::Bomb => Some(OwnedItems::BOMBS),
            ItemKind::Candle => Some(OwnedItems::CANDLE),
            ItemKind::Ladder => Some(OwnedItems::LADDER),
            ItemKind::HeartContainer | ItemKind::Triforce => None,
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

bitflags! {
    /// Items the player owns.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct OwnedItems: u16 {
        /// Sword.
        const SWORD = 1 << 0;
        /// Boomerang.
        const BOOMERANG = 1 << 1;
        /// Bomb bag.
        const BOMBS = 1 << 2;
        /// Candle.
        const CANDLE = 1 << 3;
        /// Ladder.
        const LADDER = 1 << 4;
    }
}

// =============================================================================
// Inventory
// =============================================================================

/// Counters and owned items of the player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    /// Currency.
    pub rupees: u32,
    /// Bombs carried.
    pub bombs: u32,
    /// Bomb capacity.
    pub max_bombs: u32,
    /// Owned items.
    pub owned: OwnedItems,
    /// Item bound to action B.
    pub equipped_b: Option<ItemKind>,
    /// Triforce pieces collected.
    pub triforce_pieces: u32,
}

impl Inventory {
    /// Empty inventory with the given bomb capacity.
    #[must_use]
    pub fn new(max_bombs: u32) -> Self {
        Self {
            rupees: 0,
            bombs: 0,
            max_bombs,
            owned: OwnedItems::empty(),
            equipped_b: None,
            triforce_pieces: 0,
        }
    }

    /// True if `item` is owned.
    #[must_use]
    pub fn owns(&self, item: ItemKind) -> bool {
        item.owned_flag().is_some_and(|flag| self.owned.contains(flag))
    }

    /// Adds `item` to the owned set. B items are equipped if nothing is.
    pub fn acquire(&mut self, item: ItemKind) {
        if let Some(flag) = item.owned_flag() {
            self.owned.insert(flag);
        }
        if item.is_b_item() && self.equipped_b.is_none() {
            self.equipped_b = Some(item);
        }
    }

    /// Binds an owned B item to action B. Returns false otherwise.
    pub fn equip_b(&mut self, item: ItemKind) -> bool {
        if item.is_b_item() && self.owns(item) {
            self.equipped_b = Some(item);
            true
        } else {
            false
        }
    }

    /// Adds bombs up to capacity.
    pub fn add_bombs(&mut self, count: u32) {
        self.bombs = (self.bombs + count).min(self.max_bombs);
    }

    /// Restores owned items from save identifiers. Unknown ids are logged and skipped.
    pub fn restore_owned<'a>(&mut self, ids: impl IntoIterator<Item = &'a str>) {
        for id in ids {
            match ItemKind::from_id(id) {
                Some(item) => {
                    if let Some(flag) = item.owned_flag() {
                        self.owned.insert(flag);
                    }
                }
                None => warn!(id, "unknown item id in save data skipped"),
            }
        }
    }

    /// Save identifiers of owned items.
    #[must_use]
    pub fn owned_ids(&self) -> Vec<String> {
        ItemKind::ALL
            .into_iter()
            .filter(|item| self.owns(*item))
            .map(|item| item.id().to_string())
            .collect()
    }
}

// =============================================================================
// Pickups
// =============================================================================

/// What a pickup gives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum PickupKind {
    /// Monster drop.
    Loot(LootKind),
    /// Item placed on the map or sold in a shop.
    Item(ItemKind),
}

/// Where a pickup came from, which decides what collecting it records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PickupOrigin {
    /// Dropped by a monster; vanishes at `expires_ms`.
    Drop {
        /// Expiry time.
        expires_ms: u64,
    },
    /// Placed by the level; recorded as consumed under `key`.
    Map {
        /// Stable per-level key.
        key: String,
    },
    /// Offered by a shop; recorded as sold under `key`.
    Shop {
        /// Stable per-level key.
        key: String,
        /// Price in rupees.
        price: u32,
    },
}

/// A collectible lying in the level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pickup {
    /// What it gives.
    pub kind: PickupKind,
    /// Touch area.
    pub hitbox: Rect,
    /// Where it came from.
    pub origin: PickupOrigin,
}

impl Pickup {
    /// Price if this is a shop offer.
    #[must_use]
    pub fn price(&self) -> Option<u32> {
        match self.origin {
            PickupOrigin::Shop { price, .. } => Some(price),
            _ => None,
        }
    }

    /// True if a dropped pickup's lifetime has run out.
    #[must_use]
    pub fn is_expired(&self, now_ms: u64) -> bool {
        matches!(self.origin, PickupOrigin::Drop { expires_ms } if now_ms >= expires_ms)
    }

    /// Pushes a drop's expiry forward while paused.
    pub fn shift(&mut self, delta_ms: u64) {
        if let PickupOrigin::Drop { expires_ms } = &mut self.origin {
            *expires_ms += delta_ms;
        }
    }
}

/// A non-player character: a solid body that blocks the player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Npc {
    /// Body.
    pub hitbox: Rect,
    /// Sprite to draw.
    pub sprite: SpriteId,
}
