//! The contract every reversible upgrade step implements

use async_trait::async_trait;

use crate::UpgradeError;

/// Lifecycle of a step within one upgrade run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StepState {
    /// `run` has not been called
    #[default]
    NotStarted,
    /// `run` was entered; says nothing about whether it succeeded
    Attempted,
    /// `rollback` was entered
    RolledBack,
}

impl std::fmt::Display for StepState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotStarted => write!(f, "NotStarted"),
            Self::Attempted => write!(f, "Attempted"),
            Self::RolledBack => write!(f, "RolledBack"),
        }
    }
}

/// A reversible unit of an upgrade.
///
/// A single sequencer owns each step: `run` and `rollback` take `&mut self`,
/// so they can never overlap. `rollback` is valid in any state, including
/// before `run` and after a previous `rollback`.
#[async_trait]
pub trait Step: Send {
    /// Human-readable step name
    fn name(&self) -> &str;

    /// Current lifecycle state
    fn state(&self) -> StepState;

    /// Whether the forward action ran in this upgrade (not whether it succeeded)
    fn executed(&self) -> bool {
        self.state() == StepState::Attempted
    }

    /// Perform the forward action
    async fn run(&mut self) -> Result<(), UpgradeError>;

    /// Undo the forward action's effects
    async fn rollback(&mut self) -> Result<(), UpgradeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop(StepState);

    #[async_trait]
    impl Step for Noop {
        fn name(&self) -> &str {
            "noop"
        }
        fn state(&self) -> StepState {
            self.0
        }
        async fn run(&mut self) -> Result<(), UpgradeError> {
            self.0 = StepState::Attempted;
            Ok(())
        }
        async fn rollback(&mut self) -> Result<(), UpgradeError> {
            self.0 = StepState::RolledBack;
            Ok(())
        }
    }

    #[tokio::test]
    async fn executed_tracks_attempted_state_only() {
        let mut step = Noop(StepState::default());
        assert!(!step.executed());
        step.run().await.unwrap();
        assert!(step.executed());
        step.rollback().await.unwrap();
        assert!(!step.executed());
        assert_eq!(step.state().to_string(), "RolledBack");
    }
}
