//! Post-hoc checks against the register.

use catchfail_kernel::{Caught, ExpectationNotMet, FailureType, Outcome, last_captured};

/// The captured failure, if it is assignable to `expected`.
///
/// Fails with the same messages an asserting proxy would produce: nothing
/// captured, or a capture of an unrelated type.
pub fn expect_captured(expected: &'static FailureType) -> Result<Caught, ExpectationNotMet> {
    match Outcome::observe(last_captured(), expected) {
        Outcome::Matches(caught) => Ok(caught),
        Outcome::Mismatches(caught) => Err(ExpectationNotMet::mismatched(expected, caught)),
        Outcome::Absent => Err(ExpectationNotMet::not_thrown(expected)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catchfail_kernel::{FAILURE, IO, PANIC, Panicked, catch_call, reset_captured};

    #[test]
    fn nothing_captured() {
        reset_captured();
        let err = expect_captured(&FAILURE).expect_err("empty register");
        assert_eq!(err.to_string(), "Failure expected but not thrown");

        let err = expect_captured(&IO).expect_err("empty register");
        assert_eq!(
            err.to_string(),
            "Neither a failure of type Io nor another failure was thrown"
        );
    }

    #[test]
    fn captured_failure_of_expected_type() {
        catch_call(|| Err::<(), _>(std::io::Error::other("socket closed"))).expect("stored");
        let caught = expect_captured(&IO).expect("io failure");
        assert_eq!(caught.message(), "socket closed");
        reset_captured();
    }

    #[test]
    fn captured_failure_of_other_type() {
        catch_call(|| Err::<(), _>(Panicked::new("gauge overflow"))).expect("stored");
        let err = expect_captured(&IO).expect_err("wrong type");
        assert_eq!(
            err.to_string(),
            "Failure of type Io expected but was not thrown. \
             Instead a failure of type Panic with message 'gauge overflow' was thrown."
        );
        assert_eq!(err.actual().map(Caught::failure_type), Some(&PANIC));
        reset_captured();
    }
}
