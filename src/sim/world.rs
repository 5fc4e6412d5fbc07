/// WorldState: everything one stage session owns.
///
/// ## Services
///
/// The phase machine, variable store, teleport registry and player are
/// plain fields, built once when the stage loads and handed to the step
/// function by `&mut`. Nothing is global.
///
/// ## Board
///
/// `Board` is the stage as loaded: the tile catalogue, the valid-cell set
/// and the teleport registry. The cell set and registry never change after
/// load; tile configuration changes only through `sim::edit` while Editing.
///
/// ## Triggers
///
/// `TriggerTracker` remembers which tile trigger volumes the player overlaps,
/// so a tile fires once on entry and not again until the player leaves it.

use std::collections::HashSet;

use glam::{Quat, Vec3};
use log::{error, info};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::SimConfig;
use crate::domain::entity::Player;
use crate::domain::phase::{Phase, PhaseListener, PhaseMachine};
use crate::domain::physics::{CellSet, GridCell};
use crate::domain::schedule::{Deferred, Schedule};
use crate::domain::teleport::TeleportRegistry;
use crate::domain::tile::{TeleportRole, Tile, TileId, TileKind};
use crate::domain::variables::VariableStore;
use super::event::GameEvent;

// ── Board ──

#[derive(Clone, Debug, Default)]
pub struct Board {
    pub name: String,
    pub tiles: Vec<Tile>,
    pub cells: CellSet,
    pub teleports: TeleportRegistry,
}

impl Board {
    pub fn new(name: &str) -> Self {
        Board { name: name.to_string(), ..Board::default() }
    }

    /// Add floor without a tile on it.
    pub fn add_floor(&mut self, cell: GridCell) {
        self.cells.insert(cell);
    }

    /// Add a tile; its cell becomes floor and a teleport destination is
    /// registered for its group. A duplicate destination is logged and the
    /// tile stays on the board as a passive anchor.
    pub fn add_tile(&mut self, tile: Tile) -> TileId {
        let id = self.tiles.len();
        self.cells.insert(tile.cell);
        if let TileKind::Teleport { group, role: TeleportRole::Destination } = tile.kind {
            if let Err(conflict) = self.teleports.register(group, id) {
                error!("{conflict}");
            }
        }
        self.tiles.push(tile);
        id
    }

    pub fn tile(&self, id: TileId) -> Option<&Tile> {
        self.tiles.get(id)
    }

    pub fn tile_at(&self, cell: GridCell) -> Option<TileId> {
        self.tiles.iter().position(|t| t.cell == cell)
    }

    pub fn start_tile(&self) -> Option<TileId> {
        self.tiles.iter().position(|t| t.kind == TileKind::Start)
    }
}

/// Where the player appears at every reset.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpawnPose {
    pub position: Vec3,
    pub rotation: Quat,
}

// ── Trigger tracking ──

#[derive(Clone, Debug, Default)]
pub struct TriggerTracker {
    inside: HashSet<TileId>,
    phase: Phase,
}

impl TriggerTracker {
    /// Record the tiles overlapped this tick; return the newly entered ones
    /// in ascending id order.
    pub fn update(&mut self, overlapping: HashSet<TileId>) -> Vec<TileId> {
        let mut entered: Vec<TileId> = overlapping.difference(&self.inside).copied().collect();
        entered.sort_unstable();
        self.inside = overlapping;
        entered
    }
}

impl PhaseListener for TriggerTracker {
    fn on_phase_changed(&mut self, phase: Phase) {
        if phase == self.phase {
            return;
        }
        self.phase = phase;
        // The player respawns: whatever it overlaps counts as freshly entered.
        self.inside.clear();
    }
}

// ── WorldState ──

pub struct WorldState {
    pub config: SimConfig,
    pub board: Board,
    pub phase: PhaseMachine,
    pub vars: VariableStore,
    pub player: Player,
    pub triggers: TriggerTracker,
    pub schedule: Schedule,
    pub rng: StdRng,

    /// Goal reached this Running phase. Cleared by every phase change.
    pub level_complete: bool,
    /// Simulation clock in seconds, advanced by the fixed tick.
    pub time: f64,
    pub tick: u64,
}

impl WorldState {
    pub fn new(board: Board, spawn: SpawnPose, config: SimConfig) -> Self {
        let rng = match config.fall_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let player = Player::new(spawn.position, spawn.rotation, config.initial_speed, config.max_speed);
        info!("stage '{}' ready: {} tiles, {} floor cells", board.name, board.tiles.len(), board.cells.len());
        WorldState {
            config,
            board,
            phase: PhaseMachine::new(),
            vars: VariableStore::new(),
            player,
            triggers: TriggerTracker::default(),
            schedule: Schedule::new(),
            rng,
            level_complete: false,
            time: 0.0,
            tick: 0,
        }
    }

    #[inline]
    pub fn current_phase(&self) -> Phase {
        self.phase.current()
    }

    /// Switch phase and broadcast it, synchronously and in a fixed order:
    /// variable reset (entering Editing), player, trigger tracker. Pending
    /// gem restores fire immediately so the visuals resynchronise.
    ///
    /// Re-requesting the current phase returns no events and changes nothing.
    pub fn change_phase(&mut self, target: Phase) -> Vec<GameEvent> {
        let mut listeners: [&mut dyn PhaseListener; 2] = [&mut self.player, &mut self.triggers];
        let changed = self.phase.change_phase(target, &mut self.vars, &mut listeners);
        if !changed {
            return vec![];
        }
        self.level_complete = false;

        let mut events = vec![GameEvent::PhaseChanged(target)];
        for action in self.schedule.take_all() {
            match action {
                Deferred::RestoreGem(tile) => events.push(GameEvent::GemRestored { tile }),
            }
        }
        events.extend(self.drain_variable_events());
        events
    }

    /// Variable-change notifications queued since the last drain.
    pub fn drain_variable_events(&mut self) -> Vec<GameEvent> {
        self.vars
            .drain_changes()
            .into_iter()
            .map(|c| GameEvent::VariableChanged { register: c.register, value: c.value })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tile::{Operation, Register};

    fn board() -> Board {
        let mut b = Board::new("test");
        b.add_tile(Tile::new(TileKind::Start, Vec3::ZERO));
        b.add_floor(GridCell::new(0, 1));
        b
    }

    fn world() -> WorldState {
        let spawn = SpawnPose { position: Vec3::new(0.0, 0.5, 0.0), rotation: Quat::IDENTITY };
        let config = SimConfig { fall_seed: Some(1), ..SimConfig::default() };
        WorldState::new(board(), spawn, config)
    }

    #[test]
    fn duplicate_destination_keeps_first() {
        let mut b = Board::new("dup");
        let dest = |x: f32| Tile::new(TileKind::Teleport { group: 2, role: TeleportRole::Destination }, Vec3::new(x, 0.0, 0.0));
        let first = b.add_tile(dest(0.0));
        let second = b.add_tile(dest(1.0));
        assert_eq!(b.teleports.destination(2), Some(first));
        assert_eq!(b.tiles.len(), 2);
        assert_ne!(first, second);
    }

    #[test]
    fn tiles_add_their_cells() {
        let b = board();
        assert!(b.cells.contains(GridCell::new(0, 0)));
        assert!(b.cells.contains(GridCell::new(0, 1)));
        assert_eq!(b.start_tile(), Some(0));
        assert_eq!(b.tile_at(GridCell::new(0, 1)), None);
    }

    #[test]
    fn tracker_reports_entries_once() {
        let mut t = TriggerTracker::default();
        assert_eq!(t.update(HashSet::from([3, 1])), vec![1, 3]);
        assert!(t.update(HashSet::from([3, 1])).is_empty());
        assert_eq!(t.update(HashSet::from([3, 4])), vec![4]);
        assert!(t.update(HashSet::new()).is_empty());
        assert_eq!(t.update(HashSet::from([3])), vec![3]);
    }

    #[test]
    fn tracker_ignores_repeated_phase() {
        let mut t = TriggerTracker::default();
        t.on_phase_changed(Phase::Running);
        assert_eq!(t.update(HashSet::from([2])), vec![2]);

        t.on_phase_changed(Phase::Running);
        assert!(t.update(HashSet::from([2])).is_empty());

        t.on_phase_changed(Phase::Editing);
        assert_eq!(t.update(HashSet::from([2])), vec![2]);
    }

    #[test]
    fn phase_change_emits_and_resets() {
        let mut w = world();
        let events = w.change_phase(Phase::Running);
        assert_eq!(events, vec![GameEvent::PhaseChanged(Phase::Running)]);
        assert!(w.player.is_moving());

        w.vars.operate(Register::Ruby, Operation::Add, 5);
        w.player.body.position = Vec3::new(0.0, 0.5, 0.8);
        let events = w.change_phase(Phase::Editing);
        assert_eq!(events[0], GameEvent::PhaseChanged(Phase::Editing));
        assert!(events.contains(&GameEvent::VariableChanged { register: Register::Ruby, value: 0 }));
        assert_eq!(w.vars.get(Register::Ruby), 0);
        assert_eq!(w.player.position(), Vec3::new(0.0, 0.5, 0.0));
    }

    #[test]
    fn repeated_editing_is_idempotent() {
        let mut w = world();
        w.change_phase(Phase::Running);
        w.change_phase(Phase::Editing);
        let pos = w.player.position();
        assert!(w.change_phase(Phase::Editing).is_empty());
        assert_eq!(w.player.position(), pos);
        assert!(w.vars.drain_changes().is_empty());
    }

    #[test]
    fn phase_change_flushes_pending_gems() {
        let mut w = world();
        w.change_phase(Phase::Running);
        w.schedule.schedule(w.time, 10.0, Deferred::RestoreGem(0));
        let events = w.change_phase(Phase::Editing);
        assert!(events.contains(&GameEvent::GemRestored { tile: 0 }));
        assert_eq!(w.schedule.pending(), 0);
    }
}
