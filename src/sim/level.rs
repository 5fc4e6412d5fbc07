/// Stage loader.
///
/// ## Sources (in list order):
///   1. Built-in embedded stage
///   2. `stages/` directory (`*.toml`, sorted by file name)
///
/// ## Stage format (TOML):
///   ```toml
///   name = "Loop Counter"
///   description = "optional"
///   map      = [[3, 0], [20, 1], [2, 0]]
///   editable = [[0, 0], [13, 0], [0, 0]]   # optional, same shape as map
///
///   [[variable]]
///   code = 20
///   register = "ruby"
///   operation = "add"
///   value = 1
///
///   [[conditional]]
///   code = 30
///   register = "ruby"
///   comparator = "<"
///   value = 3
///   ```
///
/// Row `y`, column `x` of `map` lands on cell (x, -y): the first row is the
/// far edge of the board.
///
/// ## Tile codes:
///   0       = no floor          1       = floor
///   2       = start             3       = goal
///   4..=7   = arrow Up/Right/Down/Left
///   10..=19 = teleport destination, group code-10
///   20..=29 = variable tile, see `[[variable]]`
///   30..=39 = conditional tile, see `[[conditional]]`
///   90..=99 = teleport source, group code-90
///   -32..=-1 = decoration floor; any other code is plain floor

use std::path::{Path, PathBuf};

use glam::{Quat, Vec3};
use log::{debug, warn};
use serde::Deserialize;
use thiserror::Error;

use crate::domain::physics::{GridCell, TILE_SIZE};
use crate::domain::tile::{
    Comparator, Direction, EditRule, Operation, Register, TeleportRole, Tile, TileKind,
};
use super::world::{Board, SpawnPose};

const BUILTIN_STAGE: &str = include_str!("builtin_stage.toml");

#[derive(Debug, Error)]
pub enum StageError {
    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid stage file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("stage '{0}' has an empty map")]
    Empty(String),
    #[error("map row {row} has {found} columns, expected {expected}")]
    RaggedMap { row: usize, found: usize, expected: usize },
    #[error("editable map does not match the map's shape")]
    EditableShape,
    #[error("stage '{0}' has no start tile")]
    MissingStart(String),
}

/// A loaded stage, ready to hand to `WorldState::new`.
#[derive(Debug)]
pub struct Stage {
    pub name: String,
    pub description: String,
    pub board: Board,
    pub spawn: SpawnPose,
}

// ── TOML schema ──

#[derive(Deserialize, Debug)]
struct StageFile {
    name: String,
    #[serde(default)]
    description: String,
    map: Vec<Vec<i32>>,
    #[serde(default)]
    editable: Vec<Vec<i32>>,
    #[serde(default, rename = "variable")]
    variables: Vec<VariableEntry>,
    #[serde(default, rename = "conditional")]
    conditionals: Vec<ConditionalEntry>,
}

#[derive(Deserialize, Debug)]
struct VariableEntry {
    code: i32,
    #[serde(default)]
    register: Register,
    #[serde(default)]
    operation: Operation,
    #[serde(default)]
    value: i32,
}

#[derive(Deserialize, Debug)]
struct ConditionalEntry {
    code: i32,
    #[serde(default)]
    register: Register,
    #[serde(default)]
    comparator: Comparator,
    #[serde(default)]
    value: i32,
}

// ══════════════════════════════════════════════════════════════
// Stage list
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq)]
pub enum StageSource {
    Builtin,
    File(PathBuf),
}

impl StageSource {
    pub fn load(&self) -> Result<Stage, StageError> {
        match self {
            StageSource::Builtin => parse_stage(BUILTIN_STAGE),
            StageSource::File(path) => load_stage(path),
        }
    }

    pub fn label(&self) -> String {
        match self {
            StageSource::Builtin => "built-in".to_string(),
            StageSource::File(path) => path.file_name()
                .unwrap_or_default()
                .to_string_lossy()
                .to_string(),
        }
    }
}

/// The built-in stage followed by every `*.toml` in `dir`, by file name.
/// A missing or unreadable directory just yields the built-in stage.
pub fn scan_stages(dir: &Path) -> Vec<StageSource> {
    let mut files: Vec<PathBuf> = match std::fs::read_dir(dir) {
        Ok(entries) => entries.flatten()
            .map(|e| e.path())
            .filter(|p| p.extension().map_or(false, |e| e == "toml"))
            .collect(),
        Err(e) => {
            debug!("no stages in {}: {e}", dir.display());
            vec![]
        }
    };
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    std::iter::once(StageSource::Builtin)
        .chain(files.into_iter().map(StageSource::File))
        .collect()
}

// ══════════════════════════════════════════════════════════════
// Parsing
// ══════════════════════════════════════════════════════════════

pub fn load_stage(path: &Path) -> Result<Stage, StageError> {
    let text = std::fs::read_to_string(path)
        .map_err(|source| StageError::Io { path: path.to_path_buf(), source })?;
    parse_stage(&text)
}

pub fn parse_stage(text: &str) -> Result<Stage, StageError> {
    let file: StageFile = toml::from_str(text)?;
    check_shape(&file)?;

    let mut board = Board::new(&file.name);
    for (y, row) in file.map.iter().enumerate() {
        for (x, &code) in row.iter().enumerate() {
            let cell = GridCell::new(x as i32, -(y as i32));
            let Some(kind) = decode(code, &file) else {
                if code != 0 {
                    board.add_floor(cell);
                }
                continue;
            };
            let edit = file.editable.get(y)
                .and_then(|r| r.get(x))
                .map_or(EditRule::Locked, |&e| EditRule::from_code(e, kind));
            board.add_tile(Tile::new(kind, cell.center(0.0) * TILE_SIZE).with_edit(edit));
        }
    }

    let start = board.start_tile()
        .and_then(|id| board.tile(id))
        .map(|t| t.position)
        .ok_or_else(|| StageError::MissingStart(file.name.clone()))?;
    let spawn = SpawnPose {
        position: start + Vec3::Y * (TILE_SIZE * 0.5),
        rotation: Quat::IDENTITY,
    };

    debug!("parsed stage '{}': {} tiles", file.name, board.tiles.len());
    Ok(Stage { name: file.name, description: file.description, board, spawn })
}

fn check_shape(file: &StageFile) -> Result<(), StageError> {
    let expected = match file.map.first() {
        Some(row) if !row.is_empty() => row.len(),
        _ => return Err(StageError::Empty(file.name.clone())),
    };
    for (row, cols) in file.map.iter().enumerate() {
        if cols.len() != expected {
            return Err(StageError::RaggedMap { row, found: cols.len(), expected });
        }
    }

    if !file.editable.is_empty() {
        let same = file.editable.len() == file.map.len()
            && file.editable.iter().all(|r| r.len() == expected);
        if !same {
            return Err(StageError::EditableShape);
        }
    }
    Ok(())
}

/// Tile kind for a map code, or `None` for bare floor / no floor.
fn decode(code: i32, file: &StageFile) -> Option<TileKind> {
    match code {
        2 => Some(TileKind::Start),
        3 => Some(TileKind::Goal),
        4..=7 => Direction::from_index(code - 4).map(|direction| TileKind::Arrow { direction }),
        10..=19 => Some(TileKind::Teleport { group: (code - 10) as u8, role: TeleportRole::Destination }),
        90..=99 => Some(TileKind::Teleport { group: (code - 90) as u8, role: TeleportRole::Source }),
        20..=29 => Some(match file.variables.iter().find(|v| v.code == code) {
            Some(v) => TileKind::Variable { register: v.register, operation: v.operation, operand: v.value },
            None => {
                warn!("stage '{}': no [[variable]] for code {code}, using defaults", file.name);
                TileKind::Variable { register: Register::default(), operation: Operation::default(), operand: 0 }
            }
        }),
        30..=39 => Some(match file.conditionals.iter().find(|c| c.code == code) {
            Some(c) => TileKind::Conditional { register: c.register, comparator: c.comparator, threshold: c.value },
            None => {
                warn!("stage '{}': no [[conditional]] for code {code}, using defaults", file.name);
                TileKind::Conditional { register: Register::default(), comparator: Comparator::default(), threshold: 0 }
            }
        }),
        _ => None,
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
