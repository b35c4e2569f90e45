//! Error types for catchfail kernel operations.

use crate::classify::ExpectationNotMet;
use crate::failure::Caught;

/// Errors surfaced by proxy construction and intercepted calls.
#[derive(Debug, thiserror::Error)]
pub enum CatchError {
    /// A required argument was missing; raised before any proxy exists.
    #[error("invalid argument: {0}")]
    Argument(String),

    /// An asserting proxy saw no failure, or a failure of the wrong type.
    #[error(transparent)]
    ExpectationNotMet(#[from] ExpectationNotMet),

    /// A failure outside the expected type, passed through unchanged.
    #[error(transparent)]
    Propagated(Caught),

    /// Concrete access through a capability-only stand-in.
    #[error(transparent)]
    Cast(#[from] CastError),

    /// Neither stand-in tier could be built.
    #[error("cannot build a stand-in for {type_name}: type is sealed and exposes no capabilities")]
    Unproxyable { type_name: &'static str },
}

impl CatchError {
    /// The propagated failure, if this error carries one.
    pub fn into_propagated(self) -> Option<Caught> {
        match self {
            Self::Propagated(caught) => Some(caught),
            _ => None,
        }
    }

    pub fn as_expectation(&self) -> Option<&ExpectationNotMet> {
        match self {
            Self::ExpectationNotMet(err) => Some(err),
            _ => None,
        }
    }
}

/// Concrete access requested from a stand-in that only exposes capabilities.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("stand-in for {target} cannot be used as {requested}")]
pub struct CastError {
    pub target: &'static str,
    pub requested: &'static str,
}

/// Convenience alias.
pub type CatchResult<T> = Result<T, CatchError>;
