/// Presentation state that is not part of the simulation: the edit cursor,
/// the status message and which gems are currently hidden. Updated only
/// from `GameEvent`s, so the simulation never knows it exists.

use std::collections::HashSet;

use crate::domain::phase::Phase;
use crate::domain::physics::GridCell;
use crate::domain::tile::TileId;
use crate::sim::event::GameEvent;
use crate::sim::world::WorldState;

/// Frames a status message stays up.
const MESSAGE_FRAMES: u32 = 150;

pub struct View {
    pub cursor: GridCell,
    pub stage_index: usize,
    pub stage_count: usize,
    message: String,
    message_timer: u32,
    hidden_gems: HashSet<TileId>,
    pub anim_tick: u64,
}

impl View {
    pub fn new(cursor: GridCell, stage_index: usize, stage_count: usize) -> Self {
        View {
            cursor,
            stage_index,
            stage_count,
            message: String::new(),
            message_timer: 0,
            hidden_gems: HashSet::new(),
            anim_tick: 0,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn set_message(&mut self, text: impl Into<String>) {
        self.message = text.into();
        self.message_timer = MESSAGE_FRAMES;
    }

    pub fn gem_visible(&self, tile: TileId) -> bool {
        !self.hidden_gems.contains(&tile)
    }

    /// Advance blink and message timers by one tick.
    pub fn tick(&mut self) {
        self.anim_tick = self.anim_tick.wrapping_add(1);
        if self.message_timer > 0 {
            self.message_timer -= 1;
            if self.message_timer == 0 {
                self.message.clear();
            }
        }
    }

    /// Fold simulation events into what the screen shows.
    pub fn apply(&mut self, events: &[GameEvent], world: &WorldState) {
        for event in events {
            match *event {
                GameEvent::PhaseChanged(Phase::Running) => self.set_message("Running"),
                GameEvent::PhaseChanged(Phase::Editing) => self.set_message("Editing"),
                GameEvent::GemHidden { tile } => { self.hidden_gems.insert(tile); }
                GameEvent::GemRestored { tile } => { self.hidden_gems.remove(&tile); }
                GameEvent::TeleportFailed { group, .. } => {
                    self.set_message(format!("Teleport {group} has no exit"));
                }
                GameEvent::FallStarted => self.set_message("Fell off the board. Space to edit"),
                GameEvent::LevelComplete => self.set_message("Goal! n: next stage"),
                GameEvent::TileEdited { tile } => {
                    if let Some(t) = world.board.tile(tile) {
                        self.set_message(format!("{} tile: {}", t.kind.label(), t.glyph().trim()));
                    }
                }
                GameEvent::VariableChanged { .. }
                | GameEvent::DirectionChanged { .. }
                | GameEvent::EffectSkipped { .. }
                | GameEvent::ConditionEvaluated { .. }
                | GameEvent::Teleported { .. } => {}
            }
        }
    }

    /// Move the cursor, staying inside the board's bounds.
    pub fn move_cursor(&mut self, dx: i32, dz: i32, world: &WorldState) {
        let Some((lo, hi)) = world.board.cells.bounds() else { return };
        self.cursor = GridCell::new(
            (self.cursor.x + dx).clamp(lo.x, hi.x),
            (self.cursor.z + dz).clamp(lo.z, hi.z),
        );
    }

    pub fn selected_tile(&self, world: &WorldState) -> Option<TileId> {
        world.board.tile_at(self.cursor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Quat, Vec3};

    use crate::config::SimConfig;
    use crate::domain::tile::{Operation, Register, Tile, TileKind};
    use crate::sim::world::{Board, SpawnPose};

    fn world() -> WorldState {
        let mut b = Board::new("view");
        b.add_tile(Tile::new(TileKind::Start, Vec3::ZERO));
        b.add_tile(Tile::new(
            TileKind::Variable { register: Register::Ruby, operation: Operation::Add, operand: 2 },
            Vec3::new(0.0, 0.0, 1.0),
        ));
        b.add_floor(GridCell::new(2, 1));
        let spawn = SpawnPose { position: Vec3::new(0.0, 0.5, 0.0), rotation: Quat::IDENTITY };
        WorldState::new(b, spawn, SimConfig::default())
    }

    #[test]
    fn gems_follow_hide_and_restore() {
        let w = world();
        let mut v = View::new(GridCell::new(0, 0), 0, 1);
        v.apply(&[GameEvent::GemHidden { tile: 1 }], &w);
        assert!(!v.gem_visible(1));
        v.apply(&[GameEvent::GemRestored { tile: 1 }], &w);
        assert!(v.gem_visible(1));
    }

    #[test]
    fn cursor_clamped_to_board() {
        let w = world();
        let mut v = View::new(GridCell::new(0, 0), 0, 1);
        v.move_cursor(-1, 0, &w);
        assert_eq!(v.cursor, GridCell::new(0, 0));
        v.move_cursor(5, 5, &w);
        assert_eq!(v.cursor, GridCell::new(2, 1));
        v.move_cursor(-2, 0, &w);
        assert_eq!(v.selected_tile(&w), Some(1));
    }

    #[test]
    fn messages_expire() {
        let w = world();
        let mut v = View::new(GridCell::new(0, 0), 0, 1);
        v.apply(&[GameEvent::LevelComplete], &w);
        assert!(v.message().starts_with("Goal"));
        for _ in 0..MESSAGE_FRAMES { v.tick(); }
        assert!(v.message().is_empty());
    }

    #[test]
    fn edit_message_names_tile() {
        let w = world();
        let mut v = View::new(GridCell::new(0, 0), 0, 1);
        v.apply(&[GameEvent::TileEdited { tile: 1 }], &w);
        assert_eq!(v.message(), "variable tile: R+2");
    }
}
