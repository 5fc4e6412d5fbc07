/// Tile rules: what entering a tile means, decided without touching state.
///
/// The step function asks `effect_of` for the effect and then applies it.

use super::tile::{Direction, Operation, Register, TileKind};
use super::variables::VariableStore;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TileEffect {
    /// Passive tile: nothing happens and the skip flag is left alone.
    Passive,
    /// Snap to the grid, then head this way.
    Turn(Direction),
    /// Run an operation on the variable store.
    Operate { register: Register, operation: Operation, operand: i32 },
    /// Condition evaluated; a failure arms the skip flag.
    Condition { passed: bool },
    /// Jump to the destination of this group.
    Teleport { group: u8 },
    /// Stop and complete the level.
    Goal,
}

/// Decide the effect of entering a tile of `kind`. Conditions are
/// evaluated against `vars` as they are now.
pub fn effect_of(kind: TileKind, vars: &VariableStore) -> TileEffect {
    if !kind.has_effect() {
        return TileEffect::Passive;
    }
    match kind {
        TileKind::Arrow { direction } => TileEffect::Turn(direction),
        TileKind::Variable { register, operation, operand } => {
            TileEffect::Operate { register, operation, operand }
        }
        TileKind::Conditional { register, comparator, threshold } => {
            TileEffect::Condition { passed: comparator.holds(vars.get(register), threshold) }
        }
        TileKind::Teleport { group, .. } => TileEffect::Teleport { group },
        TileKind::Goal => TileEffect::Goal,
        TileKind::Floor | TileKind::Start => TileEffect::Passive,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tile::{Comparator, TeleportRole};

    #[test]
    fn passive_kinds() {
        let vars = VariableStore::new();
        assert_eq!(effect_of(TileKind::Floor, &vars), TileEffect::Passive);
        assert_eq!(effect_of(TileKind::Start, &vars), TileEffect::Passive);
        assert_eq!(
            effect_of(TileKind::Teleport { group: 2, role: TeleportRole::Destination }, &vars),
            TileEffect::Passive
        );
    }

    #[test]
    fn active_kinds() {
        let vars = VariableStore::new();
        assert_eq!(
            effect_of(TileKind::Arrow { direction: Direction::Left }, &vars),
            TileEffect::Turn(Direction::Left)
        );
        assert_eq!(
            effect_of(TileKind::Teleport { group: 4, role: TeleportRole::Source }, &vars),
            TileEffect::Teleport { group: 4 }
        );
        assert_eq!(effect_of(TileKind::Goal, &vars), TileEffect::Goal);
    }

    #[test]
    fn condition_reads_current_value() {
        let mut vars = VariableStore::new();
        let tile = TileKind::Conditional {
            register: Register::Sapphire,
            comparator: Comparator::GreaterOrEqual,
            threshold: 2,
        };
        assert_eq!(effect_of(tile, &vars), TileEffect::Condition { passed: false });
        vars.operate(Register::Sapphire, Operation::Assign, 2);
        assert_eq!(effect_of(tile, &vars), TileEffect::Condition { passed: true });
    }
}
