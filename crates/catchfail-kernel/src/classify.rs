//! Outcome classification.
//!
//! Every intercepted call is reduced once to an [`Outcome`]: no failure, a
//! failure assignable to the expected type, or an unrelated failure. The
//! outcome plus the assert flag decides the [`Disposition`]:
//!
//! | outcome    | assert | disposition                         |
//! |------------|--------|-------------------------------------|
//! | Absent     | no     | PassThrough (real result)           |
//! | Absent     | yes    | Reject (not thrown)                 |
//! | Matches    | any    | Store                               |
//! | Mismatches | yes    | Reject (wrong type)                 |
//! | Mismatches | no     | PassThrough (failure reaches caller)|

use crate::failure::{Caught, FailureType};

/// What a delegated call produced, relative to the expected type.
#[derive(Debug, Clone)]
pub enum Outcome {
    Absent,
    Matches(Caught),
    Mismatches(Caught),
}

impl Outcome {
    /// Compare an observed failure against `expected` by subtype relation.
    pub fn observe(observed: Option<Caught>, expected: &FailureType) -> Self {
        match observed {
            None => Self::Absent,
            Some(caught) if expected.is_assignable_from(caught.failure_type()) => {
                Self::Matches(caught)
            }
            Some(caught) => Self::Mismatches(caught),
        }
    }
}

/// What the interceptor does with an outcome.
#[derive(Debug, Clone)]
pub enum Disposition {
    /// The call's own outcome reaches the caller unchanged: its return
    /// value, or the unrelated failure it raised.
    PassThrough,
    /// Keep the failure in the register and return a placeholder.
    Store(Caught),
    /// Replace the call's outcome with an expectation error.
    Reject(ExpectationNotMet),
}

pub fn classify(
    outcome: Outcome,
    expected: &'static FailureType,
    assert_mode: bool,
) -> Disposition {
    match outcome {
        Outcome::Absent if assert_mode => {
            Disposition::Reject(ExpectationNotMet::not_thrown(expected))
        }
        Outcome::Absent => Disposition::PassThrough,
        Outcome::Matches(caught) => Disposition::Store(caught),
        Outcome::Mismatches(caught) if assert_mode => {
            Disposition::Reject(ExpectationNotMet::mismatched(expected, caught))
        }
        Outcome::Mismatches(_) => Disposition::PassThrough,
    }
}

/// An asserting capture did not observe a failure of the expected type.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct ExpectationNotMet {
    expected: &'static FailureType,
    actual: Option<Caught>,
    message: String,
}

impl ExpectationNotMet {
    /// No failure at all was raised.
    pub fn not_thrown(expected: &'static FailureType) -> Self {
        let message = if expected.is_root() {
            format!("{} expected but not thrown", expected.name())
        } else {
            format!(
                "Neither a failure of type {} nor another failure was thrown",
                expected.name()
            )
        };
        Self {
            expected,
            actual: None,
            message,
        }
    }

    /// A failure was raised, but not one assignable to `expected`.
    pub fn mismatched(expected: &'static FailureType, actual: Caught) -> Self {
        let message = format!(
            "Failure of type {} expected but was not thrown. \
             Instead a failure of type {} with message '{}' was thrown.",
            expected.name(),
            actual.failure_type().name(),
            actual.message()
        );
        Self {
            expected,
            actual: Some(actual),
            message,
        }
    }

    pub fn expected(&self) -> &'static FailureType {
        self.expected
    }

    /// The unrelated failure that was raised instead, if any.
    pub fn actual(&self) -> Option<&Caught> {
        self.actual.as_ref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
