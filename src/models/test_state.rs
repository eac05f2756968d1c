//! Status and failure reason of a test being authored.
//!
//! The failure reason is only meaningful while the status is failed: moving
//! to any other status clears it, and setting it while not failed does
//! nothing.

use super::TestState;

/// Tracks a test's status together with its failure reason.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusTracker {
    status: TestState,
    failure_reason: String,
}

impl StatusTracker {
    /// Create a tracker. The initial reason is kept only when the initial
    /// status is failed.
    pub fn new(initial_status: Option<TestState>, initial_failure_reason: Option<&str>) -> Self {
        let status = initial_status.unwrap_or_default();
        let failure_reason = match status {
            TestState::Failed => initial_failure_reason.unwrap_or_default().to_string(),
            _ => String::new(),
        };
        Self {
            status,
            failure_reason,
        }
    }

    pub fn status(&self) -> TestState {
        self.status
    }

    pub fn failure_reason(&self) -> &str {
        &self.failure_reason
    }

    pub fn set_status(&mut self, status: TestState) {
        if status != TestState::Failed {
            self.failure_reason.clear();
        }
        self.status = status;
    }

    /// Returns whether the reason was applied.
    pub fn set_failure_reason(&mut self, reason: &str) -> bool {
        if self.status != TestState::Failed {
            return false;
        }
        self.failure_reason = reason.to_string();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_defaults_to_unknown_without_reason() {
        let tracker = StatusTracker::new(None, None);
        assert_eq!(tracker.status(), TestState::Unknown);
        assert_eq!(tracker.failure_reason(), "");
    }

    #[test]
    fn test_initial_reason_discarded_unless_failed() {
        let tracker = StatusTracker::new(Some(TestState::Passed), Some("ignored"));
        assert_eq!(tracker.failure_reason(), "");

        let tracker = StatusTracker::new(Some(TestState::Failed), Some("timeout"));
        assert_eq!(tracker.failure_reason(), "timeout");
    }

    #[test]
    fn test_set_failure_reason_is_noop_when_not_failed() {
        let mut tracker = StatusTracker::new(None, None);
        assert!(!tracker.set_failure_reason("x"));
        assert_eq!(tracker.failure_reason(), "");
    }

    #[test]
    fn test_leaving_failed_clears_reason() {
        let mut tracker = StatusTracker::new(None, None);
        tracker.set_status(TestState::Failed);
        assert!(tracker.set_failure_reason("500 on submit"));
        assert_eq!(tracker.failure_reason(), "500 on submit");

        tracker.set_status(TestState::Failed);
        assert_eq!(tracker.failure_reason(), "500 on submit");

        tracker.set_status(TestState::Passed);
        assert_eq!(tracker.failure_reason(), "");
    }

    #[derive(Debug, Clone)]
    enum Call {
        Status(TestState),
        Reason(String),
    }

    fn arb_state() -> impl Strategy<Value = TestState> {
        prop_oneof![
            Just(TestState::Passed),
            Just(TestState::Failed),
            Just(TestState::Unknown),
        ]
    }

    fn arb_call() -> impl Strategy<Value = Call> {
        prop_oneof![
            arb_state().prop_map(Call::Status),
            "[a-z ]{0,12}".prop_map(Call::Reason),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn reason_empty_whenever_not_failed(
            initial in proptest::option::of(arb_state()),
            initial_reason in proptest::option::of("[a-z]{0,8}"),
            calls in proptest::collection::vec(arb_call(), 0..40),
        ) {
            let mut tracker = StatusTracker::new(initial, initial_reason.as_deref());
            prop_assert!(tracker.status() == TestState::Failed || tracker.failure_reason().is_empty());
            for call in calls {
                let before = tracker.clone();
                match call {
                    Call::Status(s) => tracker.set_status(s),
                    Call::Reason(r) => {
                        tracker.set_failure_reason(&r);
                        if before.status() != TestState::Failed {
                            prop_assert_eq!(&tracker, &before);
                        }
                    }
                }
                prop_assert!(tracker.status() == TestState::Failed || tracker.failure_reason().is_empty());
            }
        }
    }
}
