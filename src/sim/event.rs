/// Events emitted during a simulation step or a phase change.
/// The presentation layer consumes these to redraw, blink and report.

use crate::domain::phase::Phase;
use crate::domain::tile::{Direction, Register, TileId};

#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    PhaseChanged(Phase),
    VariableChanged { register: Register, value: i32 },
    /// An arrow turned the player.
    DirectionChanged { tile: TileId, direction: Direction },
    /// The skip flag swallowed this tile's effect.
    EffectSkipped { tile: TileId },
    ConditionEvaluated { tile: TileId, passed: bool },
    Teleported { from: TileId, to: TileId, group: u8 },
    /// A source tile whose group has no destination.
    TeleportFailed { tile: TileId, group: u8 },
    FallStarted,
    LevelComplete,
    GemHidden { tile: TileId },
    GemRestored { tile: TileId },
    TileEdited { tile: TileId },
}
