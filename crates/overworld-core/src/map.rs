//! Level layouts.
//!
//! A level is a stack of equally sized integer grids, one per [`LayerKind`].
//! `-1` marks an empty cell; any other value is a tile code whose meaning
//! depends on the layer. The core only consumes grids through [`MapLoader`];
//! [`CsvMapLoader`] reads them from `<root>/<level>/<layer>.csv` and
//! [`MemoryMapLoader`] serves them from memory.
//!
//! # Required and optional layers
//!
//! | Layer         | Required | Codes                                   |
//! |---------------|----------|-----------------------------------------|
//! | `boundary`    | yes      | 0 wall, 1 invisible limit               |
//! | `entities`    | yes      | 0 player start, 1..=5 monster species   |
//! | `water`       | no       | any code is open water                  |
//! | `lake_border` | no       | any code is a lake border               |
//! | `items`       | no       | 0..=6 map item, 100..=106 shop offer    |
//! | `triggers`    | no       | positive stairs, negative warp          |
//! | `npcs`        | no       | NPC sprite code                         |
//!
//! A missing required layer is fatal. A missing optional layer loads as an
//! empty grid and is logged.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::MapError;

/// Value of an empty cell.
pub const EMPTY_TILE: i32 = -1;

// =============================================================================
// Layers
// =============================================================================

/// The layers a level is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerKind {
    /// Walls and invisible limits.
    Boundary,
    /// Open water.
    Water,
    /// Lake rims that fence aquatic monsters in.
    LakeBorder,
    /// Player start and monster spawns.
    Entities,
    /// Map items and shop offers.
    Items,
    /// Stairs and warp zones.
    Triggers,
    /// Non-player characters.
    Npcs,
}

impl LayerKind {
    /// Every layer, in load order.
    pub const ALL: [LayerKind; 7] = [
        LayerKind::Boundary,
        LayerKind::Water,
        LayerKind::LakeBorder,
        LayerKind::Entities,
        LayerKind::Items,
        LayerKind::Triggers,
        LayerKind::Npcs,
    ];

    /// File stem of the layer.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            LayerKind::Boundary => "boundary",
            LayerKind::Water => "water",
            LayerKind::LakeBorder => "lake_border",
            LayerKind::Entities => "entities",
            LayerKind::Items => "items",
            LayerKind::Triggers => "triggers",
            LayerKind::Npcs => "npcs",
        }
    }

    /// True if a level cannot be built without this layer.
    #[must_use]
    pub fn is_required(self) -> bool {
        matches!(self, LayerKind::Boundary | LayerKind::Entities)
    }
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LayerKind {
    type Err = MapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LayerKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| MapError::UnknownLayer(s.to_string()))
    }
}

// =============================================================================
// Layout
// =============================================================================

/// A grid of tile codes, row-major.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    rows: Vec<Vec<i32>>,
}

impl Layout {
    /// Wraps rows of tile codes. Rows may differ in length.
    #[must_use]
    pub fn new(rows: Vec<Vec<i32>>) -> Self {
        Self { rows }
    }

    /// A grid with no cells.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parses comma-separated rows. Blank lines are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::Parse`] for a cell that is not an integer; `origin`
    /// names the source in the message.
    pub fn parse_csv(text: &str, origin: &Path) -> Result<Self, MapError> {
        let mut rows = Vec::new();
        for (index, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let row = line
                .split(',')
                .map(|cell| {
                    let cell = cell.trim();
                    cell.parse::<i32>().map_err(|err| MapError::Parse {
                        path: origin.to_path_buf(),
                        line: index + 1,
                        details: format!("{cell:?}: {err}"),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            rows.push(row);
        }
        Ok(Self { rows })
    }

    /// Number of rows.
    #[must_use]
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Length of the longest row.
    #[must_use]
    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Code at a cell; out-of-range cells are empty.
    #[must_use]
    pub fn get(&self, col: usize, row: usize) -> i32 {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(col))
            .copied()
            .unwrap_or(EMPTY_TILE)
    }

    /// Non-empty cells as `(col, row, code)`, row by row.
    pub fn tiles(&self) -> impl Iterator<Item = (usize, usize, i32)> + '_ {
        self.rows.iter().enumerate().flat_map(|(row, cells)| {
            cells
                .iter()
                .enumerate()
                .filter(|(_, code)| **code != EMPTY_TILE)
                .map(move |(col, code)| (col, row, *code))
        })
    }

    /// True if every cell is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tiles().next().is_none()
    }
}

// =============================================================================
// Loaders
// =============================================================================

/// Source of level layouts.
pub trait MapLoader {
    /// Loads one layer of a level.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::FileNotFound`] if the layer does not exist, or a
    /// read/parse error if it exists but is unusable.
    fn load_layout(&self, level_id: &str, layer: LayerKind) -> Result<Layout, MapError>;
}

/// Reads `<root>/<level>/<layer>.csv` files.
#[derive(Debug, Clone)]
pub struct CsvMapLoader {
    root: PathBuf,
}

impl CsvMapLoader {
    /// Loader rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Path of a layer file.
    #[must_use]
    pub fn layer_path(&self, level_id: &str, layer: LayerKind) -> PathBuf {
        self.root.join(level_id).join(format!("{}.csv", layer.name()))
    }
}

impl MapLoader for CsvMapLoader {
    fn load_layout(&self, level_id: &str, layer: LayerKind) -> Result<Layout, MapError> {
        let path = self.layer_path(level_id, layer);
        let text = std::fs::read_to_string(&path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                MapError::FileNotFound(path.clone())
            } else {
                MapError::Read {
                    path: path.clone(),
                    source,
                }
            }
        })?;
        Layout::parse_csv(&text, &path)
    }
}

/// In-memory layouts keyed by level and layer.
#[derive(Debug, Clone, Default)]
pub struct MemoryMapLoader {
    layouts: BTreeMap<(String, LayerKind), Layout>,
}

impl MemoryMapLoader {
    /// Empty loader.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a layer.
    pub fn insert(&mut self, level_id: &str, layer: LayerKind, layout: Layout) {
        self.layouts.insert((level_id.to_string(), layer), layout);
    }

    /// Builder form of [`MemoryMapLoader::insert`].
    #[must_use]
    pub fn with(mut self, level_id: &str, layer: LayerKind, layout: Layout) -> Self {
        self.insert(level_id, layer, layout);
        self
    }
}

impl MapLoader for MemoryMapLoader {
    fn load_layout(&self, level_id: &str, layer: LayerKind) -> Result<Layout, MapError> {
        self.layouts
            .get(&(level_id.to_string(), layer))
            .cloned()
            .ok_or_else(|| MapError::FileNotFound(PathBuf::from(level_id).join(layer.name())))
    }
}

// =============================================================================
// Level layouts
// =============================================================================

/// Every layer of one level.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelLayouts {
    /// Level identifier.
    pub level_id: String,
    layers: BTreeMap<LayerKind, Layout>,
}

impl LevelLayouts {
    /// Loads all layers of `level_id`.
    ///
    /// # Errors
    ///
    /// Any failure on a required layer is returned. A missing optional layer
    /// becomes an empty grid; other failures on optional layers are returned.
    pub fn load(loader: &dyn MapLoader, level_id: &str) -> Result<Self, MapError> {
        let mut layers = BTreeMap::new();
        for layer in LayerKind::ALL {
            let layout = match loader.load_layout(level_id, layer) {
                Ok(layout) => layout,
                Err(MapError::FileNotFound(path)) if !layer.is_required() => {
                    warn!(level = level_id, %layer, path = %path.display(), "optional layer missing; using empty layout");
                    Layout::empty()
                }
                Err(err) => return Err(err),
            };
            layers.insert(layer, layout);
        }
        debug!(level = level_id, "level layouts loaded");
        Ok(Self {
            level_id: level_id.to_string(),
            layers,
        })
    }

    /// Builds layouts directly from grids; absent layers are empty.
    #[must_use]
    pub fn from_layers(level_id: &str, layers: impl IntoIterator<Item = (LayerKind, Layout)>) -> Self {
        Self {
            level_id: level_id.to_string(),
            layers: layers.into_iter().collect(),
        }
    }

    /// One layer; empty if it was never loaded.
    #[must_use]
    pub fn layer(&self, kind: LayerKind) -> &Layout {
        static EMPTY: Layout = Layout { rows: Vec::new() };
        self.layers.get(&kind).unwrap_or(&EMPTY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod layout_tests {
        use super::*;

        #[test]
        fn test_parse_csv_skips_blank_lines() {
            let layout = Layout::parse_csv("-1,0,-1\n\n 1 , -1 ,3\n", Path::new("t.csv")).unwrap();
            assert_eq!(layout.height(), 2);
            assert_eq!(layout.width(), 3);
            let tiles: Vec<_> = layout.tiles().collect();
            assert_eq!(tiles, vec![(1, 0, 0), (0, 1, 1), (2, 1, 3)]);
            assert_eq!(layout.get(9, 9), EMPTY_TILE);
        }

        #[test]
        fn test_parse_csv_reports_line() {
            let err = Layout::parse_csv("0,0\n0,x\n", Path::new("bad.csv")).unwrap_err();
            assert!(matches!(err, MapError::Parse { line: 2, .. }));
        }

        #[test]
        fn test_layer_names_round_trip() {
            for kind in LayerKind::ALL {
                assert_eq!(kind.name().parse::<LayerKind>().unwrap(), kind);
            }
            assert!(matches!(
                "lava".parse::<LayerKind>(),
                Err(MapError::UnknownLayer(name)) if name == "lava"
            ));
        }
    }

    mod loader_tests {
        use super::*;

        #[test]
        fn test_csv_loader_missing_required_is_fatal() {
            let dir = tempfile::tempdir().unwrap();
            let loader = CsvMapLoader::new(dir.path());
            let err = LevelLayouts::load(&loader, "overworld").unwrap_err();
            assert!(matches!(err, MapError::FileNotFound(path) if path.ends_with("boundary.csv")));
        }

        #[test]
        fn test_csv_loader_optional_layers_default_empty() {
            let dir = tempfile::tempdir().unwrap();
            let level = dir.path().join("overworld");
            std::fs::create_dir_all(&level).unwrap();
            std::fs::write(level.join("boundary.csv"), "0,0\n0,-1\n").unwrap();
            std::fs::write(level.join("entities.csv"), "-1,-1\n-1,0\n").unwrap();

            let layouts = LevelLayouts::load(&CsvMapLoader::new(dir.path()), "overworld").unwrap();
            assert_eq!(layouts.layer(LayerKind::Boundary).tiles().count(), 3);
            assert!(layouts.layer(LayerKind::Water).is_empty());
            assert!(layouts.layer(LayerKind::Npcs).is_empty());
        }

        #[test]
        fn test_memory_loader() {
            let loader = MemoryMapLoader::new()
                .with("cave", LayerKind::Boundary, Layout::new(vec![vec![0]]))
                .with("cave", LayerKind::Entities, Layout::new(vec![vec![0]]));
            let layouts = LevelLayouts::load(&loader, "cave").unwrap();
            assert_eq!(layouts.level_id, "cave");
            assert_eq!(layouts.layer(LayerKind::Entities).get(0, 0), 0);
        }
    }
}
