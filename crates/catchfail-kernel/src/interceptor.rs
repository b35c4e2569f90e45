//! Call interception.
//!
//! An [`Interceptor`] wraps every call made through a proxy:
//!
//! 1. reset the register,
//! 2. delegate to the target (inside `catch_unwind`),
//! 3. classify the outcome,
//! 4. store / reject / pass the outcome through, synthesizing a
//!    [`Placeholder`] return value when a failure is swallowed.

use std::any::Any;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::hash::BuildHasher;
use std::panic::{self, AssertUnwindSafe};

use crate::classify::{Disposition, Outcome, classify};
use crate::error::{CatchError, CatchResult};
use crate::failure::{Caught, Failure, FailureType, Panicked};
use crate::register;

/// Value returned by an intercepted call whose failure was stored.
///
/// The value carries no meaning; it only has to exist so the call site can
/// keep going. Zero for numbers, `false`, a space for `char`, `None`, and
/// empty collections. Tuples, arrays and boxes hold placeholders of their
/// element types.
pub trait Placeholder {
    fn placeholder() -> Self;
}

macro_rules! placeholder {
    ($value:expr => $($ty:ty),+ $(,)?) => {
        $(
            impl Placeholder for $ty {
                fn placeholder() -> Self {
                    $value
                }
            }
        )+
    };
}

placeholder!(0 => i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);
placeholder!(0.0 => f32, f64);
placeholder!(false => bool);
placeholder!(' ' => char);
placeholder!(() => ());
placeholder!(String::new() => String);

impl<T> Placeholder for Option<T> {
    fn placeholder() -> Self {
        None
    }
}

impl<T> Placeholder for Vec<T> {
    fn placeholder() -> Self {
        Vec::new()
    }
}

impl<T> Placeholder for VecDeque<T> {
    fn placeholder() -> Self {
        VecDeque::new()
    }
}

impl<K, V> Placeholder for BTreeMap<K, V> {
    fn placeholder() -> Self {
        BTreeMap::new()
    }
}

impl<T> Placeholder for BTreeSet<T> {
    fn placeholder() -> Self {
        BTreeSet::new()
    }
}

impl<K, V, S: BuildHasher + Default> Placeholder for HashMap<K, V, S> {
    fn placeholder() -> Self {
        HashMap::default()
    }
}

impl<T, S: BuildHasher + Default> Placeholder for HashSet<T, S> {
    fn placeholder() -> Self {
        HashSet::default()
    }
}

impl<T: Placeholder> Placeholder for Box<T> {
    fn placeholder() -> Self {
        Box::new(T::placeholder())
    }
}

impl<T: Placeholder, const N: usize> Placeholder for [T; N] {
    fn placeholder() -> Self {
        std::array::from_fn(|_| T::placeholder())
    }
}

macro_rules! placeholder_tuple {
    ($($name:ident),+) => {
        impl<$($name: Placeholder),+> Placeholder for ($($name,)+) {
            fn placeholder() -> Self {
                ($($name::placeholder(),)+)
            }
        }
    };
}

placeholder_tuple!(A);
placeholder_tuple!(A, B);
placeholder_tuple!(A, B, C);
placeholder_tuple!(A, B, C, D);

/// Validated configuration backing exactly one proxy.
#[derive(Debug)]
pub struct InterceptorConfig<T> {
    target: T,
    expected: &'static FailureType,
    assert_mode: bool,
}

impl<T> InterceptorConfig<T> {
    pub fn builder() -> InterceptorConfigBuilder<T> {
        InterceptorConfigBuilder {
            target: None,
            expected: None,
            assert_mode: false,
        }
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    pub fn expected(&self) -> &'static FailureType {
        self.expected
    }

    pub fn assert_mode(&self) -> bool {
        self.assert_mode
    }

    /// Split into the wrapped target and the interceptor that will guard it.
    pub fn into_parts(self) -> (T, Interceptor) {
        (self.target, Interceptor::new(self.expected, self.assert_mode))
    }
}

/// Builder for [`InterceptorConfig`]; `build` rejects missing fields.
#[derive(Debug)]
pub struct InterceptorConfigBuilder<T> {
    target: Option<T>,
    expected: Option<&'static FailureType>,
    assert_mode: bool,
}

impl<T> InterceptorConfigBuilder<T> {
    pub fn target(self, target: T) -> Self {
        self.maybe_target(Some(target))
    }

    pub fn maybe_target(mut self, target: Option<T>) -> Self {
        self.target = target;
        self
    }

    pub fn expected(self, expected: &'static FailureType) -> Self {
        self.maybe_expected(Some(expected))
    }

    pub fn maybe_expected(mut self, expected: Option<&'static FailureType>) -> Self {
        self.expected = expected;
        self
    }

    pub fn assert_mode(mut self, assert_mode: bool) -> Self {
        self.assert_mode = assert_mode;
        self
    }

    pub fn build(self) -> CatchResult<InterceptorConfig<T>> {
        let target = self
            .target
            .ok_or_else(|| CatchError::Argument("target must not be none".to_string()))?;
        let expected = self
            .expected
            .ok_or_else(|| CatchError::Argument("expected type must not be none".to_string()))?;
        Ok(InterceptorConfig {
            target,
            expected,
            assert_mode: self.assert_mode,
        })
    }
}

/// The delegation wrapper invoked on every proxied call.
#[derive(Debug, Clone, Copy)]
pub struct Interceptor {
    expected: &'static FailureType,
    assert_mode: bool,
}

impl Interceptor {
    pub fn new(expected: &'static FailureType, assert_mode: bool) -> Self {
        Self {
            expected,
            assert_mode,
        }
    }

    pub fn expected(&self) -> &'static FailureType {
        self.expected
    }

    pub fn assert_mode(&self) -> bool {
        self.assert_mode
    }

    /// Run `call` against `target` under interception.
    ///
    /// Returns the real result when nothing was raised, a placeholder when a
    /// matching failure was stored, and an error otherwise. An unrelated
    /// panic resumes unwinding with its original payload.
    pub fn intercept<C, R, E, F>(&self, target: &mut C, call: F) -> CatchResult<R>
    where
        C: ?Sized,
        R: Placeholder,
        E: Failure,
        F: FnOnce(&mut C) -> Result<R, E>,
    {
        register::clear();
        tracing::trace!(expected = self.expected.name(), "failure register reset");

        let raised = match panic::catch_unwind(AssertUnwindSafe(|| call(target))) {
            Ok(Ok(value)) => return self.returned(value),
            Ok(Err(failure)) => Raised::Returned(Caught::new(failure)),
            Err(payload) => Raised::unwound(payload),
        };
        self.raised(raised)
    }

    fn returned<R>(&self, value: R) -> CatchResult<R> {
        let disposition = classify(Outcome::Absent, self.expected, self.assert_mode);
        if let Disposition::Reject(err) = disposition {
            tracing::debug!(expected = self.expected.name(), "no failure raised");
            return Err(err.into());
        }
        Ok(value)
    }

    fn raised<R: Placeholder>(&self, raised: Raised) -> CatchResult<R> {
        let outcome = Outcome::observe(Some(raised.caught().clone()), self.expected);
        match classify(outcome, self.expected, self.assert_mode) {
            Disposition::Store(caught) => {
                tracing::debug!(
                    expected = self.expected.name(),
                    actual = caught.failure_type().name(),
                    "failure stored"
                );
                register::set(Some(caught));
                Ok(R::placeholder())
            }
            Disposition::Reject(err) => {
                tracing::debug!(
                    expected = self.expected.name(),
                    actual = raised.caught().failure_type().name(),
                    "failure of unexpected type"
                );
                Err(err.into())
            }
            Disposition::PassThrough => {
                tracing::debug!(
                    expected = self.expected.name(),
                    actual = raised.caught().failure_type().name(),
                    "failure passed through"
                );
                raised.resume()
            }
        }
    }
}

/// A failure raised by the delegate, with enough left over to re-raise it
/// the way it arrived.
enum Raised {
    Returned(Caught),
    Unwound {
        caught: Caught,
        payload: Box<dyn Any + Send>,
    },
}

impl Raised {
    fn unwound(payload: Box<dyn Any + Send>) -> Self {
        match payload.downcast::<Caught>() {
            Ok(thrown) => Self::Unwound {
                caught: (*thrown).clone(),
                payload: thrown as Box<dyn Any + Send>,
            },
            Err(payload) => Self::Unwound {
                caught: Caught::new(Panicked::from_payload(&*payload)),
                payload,
            },
        }
    }

    fn caught(&self) -> &Caught {
        match self {
            Self::Returned(caught) => caught,
            Self::Unwound { caught, .. } => caught,
        }
    }

    fn resume<R>(self) -> CatchResult<R> {
        match self {
            Self::Returned(caught) => Err(CatchError::Propagated(caught)),
            Self::Unwound { payload, .. } => panic::resume_unwind(payload),
        }
    }
}
