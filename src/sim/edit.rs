/// Tile authoring: the only way tile configuration changes.
///
/// Every mutator requires the Editing phase and the tile's `EditRule`. A
/// successful edit returns `GameEvent::TileEdited` for the presentation
/// layer; a refused one returns an `EditError` and leaves the tile as it was.

use log::debug;
use thiserror::Error;

use crate::domain::phase::Phase;
use crate::domain::tile::{Comparator, Direction, EditRule, Operation, Register, Tile, TileId, TileKind};
use super::event::GameEvent;
use super::world::WorldState;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EditError {
    #[error("tiles can only be changed while editing")]
    NotEditing,
    #[error("no tile with id {0}")]
    NoSuchTile(TileId),
    #[error("tile {0} does not allow this change")]
    Locked(TileId),
    #[error("tile {tile} is a {kind} tile")]
    WrongKind { tile: TileId, kind: &'static str },
    #[error("tile {tile} may not point {direction:?}")]
    ForbiddenDirection { tile: TileId, direction: Direction },
}

#[derive(Clone, Copy, Debug)]
enum Field {
    Register,
    Operation,
    Value,
}

// ══════════════════════════════════════════════════════════════
// Arrows
// ══════════════════════════════════════════════════════════════

pub fn set_direction(world: &mut WorldState, tile: TileId, direction: Direction) -> Result<GameEvent, EditError> {
    let t = editable(world, tile)?;
    let TileKind::Arrow { .. } = t.kind else {
        return Err(EditError::WrongKind { tile, kind: t.kind.label() });
    };
    let EditRule::Arrow { forbidden } = t.edit else {
        return Err(EditError::Locked(tile));
    };
    if forbidden == Some(direction) {
        return Err(EditError::ForbiddenDirection { tile, direction });
    }
    t.kind = TileKind::Arrow { direction };
    debug!("arrow tile {tile} now points {direction:?}");
    Ok(GameEvent::TileEdited { tile })
}

/// Turn the arrow clockwise, stepping over the forbidden direction.
pub fn rotate_arrow(world: &mut WorldState, tile: TileId) -> Result<GameEvent, EditError> {
    let t = editable(world, tile)?;
    let (TileKind::Arrow { direction }, EditRule::Arrow { forbidden }) = (t.kind, t.edit) else {
        return match t.kind {
            TileKind::Arrow { .. } => Err(EditError::Locked(tile)),
            kind => Err(EditError::WrongKind { tile, kind: kind.label() }),
        };
    };
    let mut next = direction.clockwise();
    if forbidden == Some(next) {
        next = next.clockwise();
    }
    set_direction(world, tile, next)
}

// ══════════════════════════════════════════════════════════════
// Variable tiles
// ══════════════════════════════════════════════════════════════

pub fn set_variable_register(world: &mut WorldState, tile: TileId, value: Register) -> Result<GameEvent, EditError> {
    edit_field(world, tile, Field::Register, |kind| match kind {
        TileKind::Variable { register, .. } => { *register = value; true }
        _ => false,
    })
}

pub fn set_variable_operation(world: &mut WorldState, tile: TileId, value: Operation) -> Result<GameEvent, EditError> {
    edit_field(world, tile, Field::Operation, |kind| match kind {
        TileKind::Variable { operation, .. } => { *operation = value; true }
        _ => false,
    })
}

pub fn set_variable_value(world: &mut WorldState, tile: TileId, value: i32) -> Result<GameEvent, EditError> {
    edit_field(world, tile, Field::Value, |kind| match kind {
        TileKind::Variable { operand, .. } => { *operand = value; true }
        _ => false,
    })
}

// ══════════════════════════════════════════════════════════════
// Conditional tiles
// ══════════════════════════════════════════════════════════════

pub fn set_condition_register(world: &mut WorldState, tile: TileId, value: Register) -> Result<GameEvent, EditError> {
    edit_field(world, tile, Field::Register, |kind| match kind {
        TileKind::Conditional { register, .. } => { *register = value; true }
        _ => false,
    })
}

pub fn set_condition_comparator(world: &mut WorldState, tile: TileId, value: Comparator) -> Result<GameEvent, EditError> {
    edit_field(world, tile, Field::Operation, |kind| match kind {
        TileKind::Conditional { comparator, .. } => { *comparator = value; true }
        _ => false,
    })
}

pub fn set_condition_value(world: &mut WorldState, tile: TileId, value: i32) -> Result<GameEvent, EditError> {
    edit_field(world, tile, Field::Value, |kind| match kind {
        TileKind::Conditional { threshold, .. } => { *threshold = value; true }
        _ => false,
    })
}

// ══════════════════════════════════════════════════════════════
// Stepping helpers (variable or conditional)
// ══════════════════════════════════════════════════════════════

pub fn cycle_register(world: &mut WorldState, tile: TileId, step: i32) -> Result<GameEvent, EditError> {
    edit_field(world, tile, Field::Register, |kind| match kind {
        TileKind::Variable { register, .. } | TileKind::Conditional { register, .. } => {
            *register = register.cycled(step);
            true
        }
        _ => false,
    })
}

/// Next operation on a variable tile, next comparator on a conditional.
pub fn cycle_operation(world: &mut WorldState, tile: TileId, step: i32) -> Result<GameEvent, EditError> {
    edit_field(world, tile, Field::Operation, |kind| match kind {
        TileKind::Variable { operation, .. } => { *operation = operation.cycled(step); true }
        TileKind::Conditional { comparator, .. } => { *comparator = comparator.cycled(step); true }
        _ => false,
    })
}

pub fn adjust_value(world: &mut WorldState, tile: TileId, step: i32) -> Result<GameEvent, EditError> {
    edit_field(world, tile, Field::Value, |kind| match kind {
        TileKind::Variable { operand: v, .. } | TileKind::Conditional { threshold: v, .. } => {
            *v = v.saturating_add(step);
            true
        }
        _ => false,
    })
}

// ── Internals ──

fn editable(world: &mut WorldState, tile: TileId) -> Result<&mut Tile, EditError> {
    if world.current_phase() != Phase::Editing {
        return Err(EditError::NotEditing);
    }
    world.board.tiles.get_mut(tile).ok_or(EditError::NoSuchTile(tile))
}

/// Apply `change` to a copy of the tile kind; commit only if the kind fits
/// and the rule opens `field`.
fn edit_field(
    world: &mut WorldState,
    tile: TileId,
    field: Field,
    change: impl FnOnce(&mut TileKind) -> bool,
) -> Result<GameEvent, EditError> {
    let t = editable(world, tile)?;
    let mut kind = t.kind;
    if !change(&mut kind) {
        return Err(EditError::WrongKind { tile, kind: t.kind.label() });
    }
    let open = match t.edit {
        EditRule::Fields { register, operation, value } => match field {
            Field::Register => register,
            Field::Operation => operation,
            Field::Value => value,
        },
        _ => false,
    };
    if !open {
        return Err(EditError::Locked(tile));
    }
    t.kind = kind;
    debug!("tile {tile} {field:?} edited: {kind:?}");
    Ok(GameEvent::TileEdited { tile })
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Quat, Vec3};

    use crate::config::SimConfig;
    use crate::sim::level::parse_stage;
    use crate::sim::step::step;
    use crate::sim::world::{Board, SpawnPose};

    const ARROW: TileId = 1;
    const VAR: TileId = 2;
    const COND: TileId = 3;
    const LOCKED_ARROW: TileId = 4;

    fn world() -> WorldState {
        let mut b = Board::new("edit");
        b.add_tile(Tile::new(TileKind::Start, Vec3::ZERO));
        b.add_tile(
            Tile::new(TileKind::Arrow { direction: Direction::Up }, Vec3::new(1.0, 0.0, 0.0))
                .with_edit(EditRule::Arrow { forbidden: Some(Direction::Right) }),
        );
        b.add_tile(
            Tile::new(
                TileKind::Variable { register: Register::Ruby, operation: Operation::Add, operand: 1 },
                Vec3::new(2.0, 0.0, 0.0),
            )
            .with_edit(EditRule::from_code(10, TileKind::Variable {
                register: Register::Ruby, operation: Operation::Add, operand: 1,
            })),
        );
        b.add_tile(
            Tile::new(
                TileKind::Conditional { register: Register::Ruby, comparator: Comparator::Less, threshold: 0 },
                Vec3::new(3.0, 0.0, 0.0),
            )
            .with_edit(EditRule::Fields { register: false, operation: true, value: false }),
        );
        b.add_tile(Tile::new(TileKind::Arrow { direction: Direction::Left }, Vec3::new(4.0, 0.0, 0.0)));
        let spawn = SpawnPose { position: Vec3::new(0.0, 0.5, 0.0), rotation: Quat::IDENTITY };
        WorldState::new(b, spawn, SimConfig { fall_seed: Some(0), ..SimConfig::default() })
    }

    fn kind(w: &WorldState, id: TileId) -> TileKind {
        w.board.tiles[id].kind
    }

    #[test]
    fn arrow_rotation_skips_forbidden() {
        let mut w = world();
        assert_eq!(rotate_arrow(&mut w, ARROW), Ok(GameEvent::TileEdited { tile: ARROW }));
        assert_eq!(kind(&w, ARROW), TileKind::Arrow { direction: Direction::Down });
        rotate_arrow(&mut w, ARROW).unwrap();
        rotate_arrow(&mut w, ARROW).unwrap();
        assert_eq!(kind(&w, ARROW), TileKind::Arrow { direction: Direction::Up });
    }

    #[test]
    fn forbidden_direction_is_refused() {
        let mut w = world();
        assert_eq!(
            set_direction(&mut w, ARROW, Direction::Right),
            Err(EditError::ForbiddenDirection { tile: ARROW, direction: Direction::Right }),
        );
        assert_eq!(set_direction(&mut w, ARROW, Direction::Left), Ok(GameEvent::TileEdited { tile: ARROW }));
    }

    #[test]
    fn locked_and_wrong_kind() {
        let mut w = world();
        assert_eq!(rotate_arrow(&mut w, LOCKED_ARROW), Err(EditError::Locked(LOCKED_ARROW)));
        assert_eq!(set_direction(&mut w, VAR, Direction::Up), Err(EditError::WrongKind { tile: VAR, kind: "variable" }));
        assert_eq!(set_condition_value(&mut w, VAR, 3), Err(EditError::WrongKind { tile: VAR, kind: "variable" }));
        assert_eq!(adjust_value(&mut w, 0, 1), Err(EditError::WrongKind { tile: 0, kind: "start" }));
        assert_eq!(rotate_arrow(&mut w, 99), Err(EditError::NoSuchTile(99)));
    }

    #[test]
    fn field_permissions() {
        let mut w = world();
        // Conditional: only the comparator is open
        assert_eq!(cycle_register(&mut w, COND, 1), Err(EditError::Locked(COND)));
        assert_eq!(adjust_value(&mut w, COND, 1), Err(EditError::Locked(COND)));
        cycle_operation(&mut w, COND, 1).unwrap();
        assert_eq!(
            kind(&w, COND),
            TileKind::Conditional { register: Register::Ruby, comparator: Comparator::Greater, threshold: 0 },
        );
        set_condition_comparator(&mut w, COND, Comparator::GreaterOrEqual).unwrap();
        assert_eq!(set_condition_register(&mut w, COND, Register::Emerald), Err(EditError::Locked(COND)));
    }

    #[test]
    fn variable_tile_fully_editable() {
        let mut w = world();
        set_variable_register(&mut w, VAR, Register::Emerald).unwrap();
        set_variable_operation(&mut w, VAR, Operation::Multiply).unwrap();
        set_variable_value(&mut w, VAR, 7).unwrap();
        cycle_register(&mut w, VAR, 1).unwrap();
        cycle_operation(&mut w, VAR, -3).unwrap();
        adjust_value(&mut w, VAR, -10).unwrap();
        assert_eq!(
            kind(&w, VAR),
            TileKind::Variable { register: Register::Ruby, operation: Operation::Assign, operand: -3 },
        );
    }

    #[test]
    fn value_adjust_saturates() {
        let mut w = world();
        set_variable_value(&mut w, VAR, i32::MAX).unwrap();
        adjust_value(&mut w, VAR, 1).unwrap();
        assert!(matches!(kind(&w, VAR), TileKind::Variable { operand: i32::MAX, .. }));
    }

    #[test]
    fn running_blocks_every_edit() {
        let mut w = world();
        w.change_phase(Phase::Running);
        assert_eq!(rotate_arrow(&mut w, ARROW), Err(EditError::NotEditing));
        assert_eq!(set_variable_value(&mut w, VAR, 5), Err(EditError::NotEditing));
        assert_eq!(cycle_operation(&mut w, COND, 1), Err(EditError::NotEditing));
        assert_eq!(kind(&w, ARROW), TileKind::Arrow { direction: Direction::Up });
    }

    #[test]
    fn editing_solves_gems_and_gates() {
        let stage = parse_stage(include_str!("../../stages/01_gems_and_gates.toml")).unwrap();
        let mut w = WorldState::new(stage.board, stage.spawn, SimConfig { fall_seed: Some(5), ..SimConfig::default() });
        let gem = w.board.tile_at(crate::domain::physics::GridCell::new(0, -3)).unwrap();

        // As shipped: one ruby, the gate fails and the player runs off the top
        w.change_phase(Phase::Running);
        for _ in 0..2000 {
            step(&mut w);
            if w.player.is_falling() || w.level_complete { break; }
        }
        assert!(w.player.is_falling());

        w.change_phase(Phase::Editing);
        assert_eq!(cycle_register(&mut w, gem, 1), Err(EditError::Locked(gem)));
        adjust_value(&mut w, gem, 1).unwrap();

        w.change_phase(Phase::Running);
        let mut teleported = false;
        for _ in 0..2000 {
            teleported |= step(&mut w).iter().any(|e| matches!(e, GameEvent::Teleported { .. }));
            if w.player.is_falling() || w.level_complete { break; }
        }
        assert!(teleported);
        assert!(w.level_complete);
        assert_eq!(w.vars.get(Register::Ruby), 2);
    }
}
