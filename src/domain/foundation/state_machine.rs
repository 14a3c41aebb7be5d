//! State machine trait for status enums.
//!
//! Provides a consistent interface for validating and performing state
//! transitions on lifecycle statuses such as `SubscriptionStatus`.

use super::ValidationError;

/// Trait for status enums that represent state machines.
///
/// Implementors define valid state transitions and get validated
/// transition methods for free.
///
/// # Example
///
/// ```ignore
/// impl StateMachine for SubscriptionStatus {
///     fn can_transition_to(&self, target: &Self) -> bool {
///         matches!(
///             (self, target),
///             (NotSubscribed, CheckoutPending) |
///             (CheckoutPending, Active) |
///             // ... etc
///         )
///     }
///
///     fn valid_transitions(&self) -> Vec<Self> {
///         match self {
///             NotSubscribed => vec![CheckoutPending],
///             // ... etc
///         }
///     }
/// }
///
/// // Usage:
/// let new_status = current.transition_to(SubscriptionStatus::Active)?;
/// ```
pub trait StateMachine: Sized + Copy + PartialEq + std::fmt::Debug {
    /// Returns true if transition from self to target is valid.
    fn can_transition_to(&self, target: &Self) -> bool;

    /// Returns all valid target states from current state.
    fn valid_transitions(&self) -> Vec<Self>;

    /// Performs transition with validation, returning error if invalid.
    ///
    /// This is the preferred way to change state, as it ensures
    /// the transition is valid according to the state machine rules.
    fn transition_to(&self, target: Self) -> Result<Self, ValidationError> {
        if self.can_transition_to(&target) {
            Ok(target)
        } else {
            Err(ValidationError::invalid_format(
                "state_transition",
                format!("Cannot transition from {:?} to {:?}", self, target),
            ))
        }
    }

    /// Checks if current state is terminal (no valid outgoing transitions).
    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum TestStatus {
        Open,
        Settling,
        Settled,
        Void,
    }

    impl StateMachine for TestStatus {
        fn can_transition_to(&self, target: &Self) -> bool {
            matches!(
                (self, target),
                (TestStatus::Open, TestStatus::Settling)
                    | (TestStatus::Settling, TestStatus::Settled)
                    | (TestStatus::Settling, TestStatus::Void)
            )
        }

        fn valid_transitions(&self) -> Vec<Self> {
            match self {
                TestStatus::Open => vec![TestStatus::Settling],
                TestStatus::Settling => vec![TestStatus::Settled, TestStatus::Void],
                TestStatus::Settled | TestStatus::Void => vec![],
            }
        }
    }

    #[test]
    fn valid_transition_succeeds() {
        let status = TestStatus::Open;
        assert_eq!(
            status.transition_to(TestStatus::Settling),
            Ok(TestStatus::Settling)
        );
    }

    #[test]
    fn invalid_transition_fails() {
        let status = TestStatus::Open;
        assert!(status.transition_to(TestStatus::Settled).is_err());
    }

    #[test]
    fn terminal_states_have_no_transitions() {
        assert!(TestStatus::Settled.is_terminal());
        assert!(TestStatus::Void.is_terminal());
        assert!(!TestStatus::Open.is_terminal());
    }
}
