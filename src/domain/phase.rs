/// Phase state machine: Editing (authoring) or Running (simulation).
///
/// `change_phase` is the only transition. It is a no-op when the target is
/// already current; otherwise it records the new phase, resets the variable
/// store when entering Editing, and calls every listener in order before
/// returning. Listeners must treat a repeated phase as a no-op.

use log::info;

use super::variables::VariableStore;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Phase {
    #[default]
    Editing,
    Running,
}

impl Phase {
    pub fn toggled(self) -> Phase {
        match self {
            Phase::Editing => Phase::Running,
            Phase::Running => Phase::Editing,
        }
    }
}

/// Anything that reacts to a phase change.
pub trait PhaseListener {
    fn on_phase_changed(&mut self, phase: Phase);
}

#[derive(Clone, Debug, Default)]
pub struct PhaseMachine {
    current: Phase,
}

impl PhaseMachine {
    pub fn new() -> Self {
        PhaseMachine { current: Phase::Editing }
    }

    #[inline]
    pub fn current(&self) -> Phase {
        self.current
    }

    /// Switch to `target`. Returns false (and touches nothing) when the
    /// machine is already there.
    pub fn change_phase(
        &mut self,
        target: Phase,
        vars: &mut VariableStore,
        listeners: &mut [&mut dyn PhaseListener],
    ) -> bool {
        if self.current == target {
            return false;
        }
        self.current = target;
        info!("phase -> {target:?}");

        if target == Phase::Editing {
            vars.reset();
        }
        for listener in listeners.iter_mut() {
            listener.on_phase_changed(target);
        }
        true
    }
}
