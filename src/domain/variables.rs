/// Variable store: the three gem registers.
///
/// Values are `i32` with two's-complement wraparound on overflow. Changes are
/// queued as `VariableChange` notifications and drained by the step function
/// once per tick, so every subscriber sees them inside the tick that made them.

use log::{debug, info, warn};

use super::tile::{Operation, Register};

/// Notification: `register` now holds `value`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct VariableChange {
    pub register: Register,
    pub value: i32,
}

#[derive(Clone, Debug, Default)]
pub struct VariableStore {
    values: [i32; 3],
    pending: Vec<VariableChange>,
}

impl VariableStore {
    pub fn new() -> Self {
        VariableStore::default()
    }

    /// Current value. Never fails; all registers start at 0.
    #[inline]
    pub fn get(&self, register: Register) -> i32 {
        self.values[register.index()]
    }

    /// Apply `op` with `operand` to `register`.
    ///
    /// Divide by zero leaves the value untouched and logs a warning.
    /// A notification is queued only when the stored value actually changes.
    pub fn operate(&mut self, register: Register, op: Operation, operand: i32) {
        let current = self.get(register);
        let next = match op {
            Operation::Add      => current.wrapping_add(operand),
            Operation::Subtract => current.wrapping_sub(operand),
            Operation::Multiply => current.wrapping_mul(operand),
            Operation::Divide => {
                if operand == 0 {
                    warn!("{register:?} / 0 skipped: division by zero");
                    return;
                }
                current.wrapping_div(operand)
            }
            Operation::Assign => operand,
        };

        debug!("{register:?} {} {operand}: {current} -> {next}", op.symbol());
        if next != current {
            self.values[register.index()] = next;
            self.pending.push(VariableChange { register, value: next });
        }
    }

    /// Zero every register and notify for each one, even those already 0,
    /// so displays can resynchronise.
    pub fn reset(&mut self) {
        info!("variables reset");
        for register in Register::ALL {
            self.values[register.index()] = 0;
            self.pending.push(VariableChange { register, value: 0 });
        }
    }

    /// Take all notifications queued since the last drain, oldest first.
    pub fn drain_changes(&mut self) -> Vec<VariableChange> {
        std::mem::take(&mut self.pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    fn store_with(register: Register, value: i32) -> VariableStore {
        let mut s = VariableStore::new();
        s.operate(register, Operation::Assign, value);
        s.drain_changes();
        s
    }

    #[test]
    fn registers_default_to_zero() {
        let s = VariableStore::new();
        for r in Register::ALL {
            assert_eq!(s.get(r), 0);
        }
    }

    #[test]
    fn arithmetic_operations() {
        let mut s = store_with(Register::Ruby, 7);
        s.operate(Register::Ruby, Operation::Add, 3);
        assert_eq!(s.get(Register::Ruby), 10);
        s.operate(Register::Ruby, Operation::Subtract, 12);
        assert_eq!(s.get(Register::Ruby), -2);
        s.operate(Register::Ruby, Operation::Multiply, -4);
        assert_eq!(s.get(Register::Ruby), 8);
        s.operate(Register::Ruby, Operation::Assign, 5);
        assert_eq!(s.get(Register::Ruby), 5);
        assert_eq!(s.get(Register::Sapphire), 0);
    }

    #[test]
    fn division_truncates_toward_zero() {
        let mut s = store_with(Register::Emerald, -7);
        s.operate(Register::Emerald, Operation::Divide, 2);
        assert_eq!(s.get(Register::Emerald), -3);

        let mut s = store_with(Register::Emerald, 7);
        s.operate(Register::Emerald, Operation::Divide, -2);
        assert_eq!(s.get(Register::Emerald), -3);
    }

    #[test]
    fn divide_by_zero_is_a_noop() {
        let mut s = store_with(Register::Sapphire, 9);
        s.operate(Register::Sapphire, Operation::Divide, 0);
        assert_eq!(s.get(Register::Sapphire), 9);
        assert!(s.drain_changes().is_empty());
    }

    #[test]
    fn overflow_wraps() {
        let mut s = store_with(Register::Ruby, i32::MAX);
        s.operate(Register::Ruby, Operation::Add, 1);
        assert_eq!(s.get(Register::Ruby), i32::MIN);

        let mut s = store_with(Register::Ruby, i32::MIN);
        s.operate(Register::Ruby, Operation::Divide, -1);
        assert_eq!(s.get(Register::Ruby), i32::MIN);
    }

    #[test]
    fn add_three_twice_is_six() {
        let mut s = VariableStore::new();
        s.operate(Register::Ruby, Operation::Add, 3);
        s.operate(Register::Ruby, Operation::Add, 3);
        assert_eq!(s.get(Register::Ruby), 6);
        let changes = s.drain_changes();
        assert_eq!(
            changes,
            vec![
                VariableChange { register: Register::Ruby, value: 3 },
                VariableChange { register: Register::Ruby, value: 6 },
            ]
        );
    }

    #[test]
    fn unchanged_value_is_not_notified() {
        let mut s = store_with(Register::Ruby, 4);
        s.operate(Register::Ruby, Operation::Assign, 4);
        s.operate(Register::Ruby, Operation::Add, 0);
        assert!(s.drain_changes().is_empty());
    }

    #[test]
    fn reset_notifies_every_register() {
        let mut s = store_with(Register::Sapphire, 2);
        s.reset();
        assert_eq!(s.get(Register::Sapphire), 0);
        let changes = s.drain_changes();
        assert_eq!(changes.len(), 3);
        assert!(changes.iter().all(|c| c.value == 0));
        assert_eq!(changes[0].register, Register::Ruby);
        assert_eq!(changes[2].register, Register::Emerald);
    }
}
