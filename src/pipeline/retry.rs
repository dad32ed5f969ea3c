//! Corrective retry policy.
//!
//! Two states, one transition. A question starts in `Initial`; an execution
//! failure whose message names a missing column or table moves it to
//! `Retried` and earns exactly one more synthesis + execution. Any other
//! failure, and any failure in `Retried`, ends the question.

use crate::types::AskError;

/// Case-sensitive substrings that mark a naming mismatch.
pub const RETRY_MARKERS: [&str; 2] = ["Unknown column", "doesn't exist"];

/// How an execution failure is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Eligible for one corrective retry
    Recoverable,
    /// Surfaced to the user as-is
    Fatal,
}

/// Classify an execution error message.
pub fn classify(message: &str) -> FailureClass {
    if RETRY_MARKERS.iter().any(|marker| message.contains(marker)) {
        FailureClass::Recoverable
    } else {
        FailureClass::Fatal
    }
}

/// Where a question is in the retry cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetryState {
    #[default]
    Initial,
    Retried,
}

/// Decision after a failed execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Re-synthesize with the carried error message
    Retry { message: String },
    /// Stop and surface the error
    Fail,
}

impl RetryState {
    /// Decide what follows `error` in this state.
    ///
    /// Only `ExecutionError`s can be retried.
    pub fn on_failure(&self, error: &AskError) -> Transition {
        match (self, error.execution_message()) {
            (RetryState::Initial, Some(message))
                if classify(message) == FailureClass::Recoverable =>
            {
                Transition::Retry {
                    message: message.to_string(),
                }
            }
            _ => Transition::Fail,
        }
    }

    /// 1-based attempt number.
    pub fn attempt(&self) -> u8 {
        match self {
            RetryState::Initial => 1,
            RetryState::Retried => 2,
        }
    }
}
