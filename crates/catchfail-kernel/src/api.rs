//! Entry points.
//!
//! `catch*` proxies store matching failures and hand back placeholders;
//! `verify*` proxies additionally reject calls that raised nothing or the
//! wrong thing. The `*_call` variants intercept a single closure instead of
//! wrapping a target.

use std::convert::Infallible;
use std::sync::Arc;

use crate::error::CatchResult;
use crate::failure::{Caught, FAILURE, Failure, FailureType};
use crate::interceptor::{Interceptor, InterceptorConfig, Placeholder};
use crate::proxy::{CapabilityProxyFactory, Proxy, ProxyFactory, SubtypeProxyFactory, Target};
use crate::register;

/// Wrap `target`, storing any failure its calls raise.
pub fn catch<T: Target>(target: T) -> CatchResult<Proxy<T>> {
    catch_only(target, &FAILURE)
}

/// Wrap `target`, storing failures of `expected` (or a subtype). Other
/// failures reach the caller unchanged.
pub fn catch_only<T: Target>(target: T, expected: &'static FailureType) -> CatchResult<Proxy<T>> {
    wrap(target, expected, false)
}

/// Like [`catch`], but a call that raises nothing is an error.
pub fn verify<T: Target>(target: T) -> CatchResult<Proxy<T>> {
    verify_only(target, &FAILURE)
}

/// Like [`catch_only`], but a call that raises nothing, or raises a failure
/// outside `expected`, is an error.
pub fn verify_only<T: Target>(target: T, expected: &'static FailureType) -> CatchResult<Proxy<T>> {
    wrap(target, expected, true)
}

fn wrap<T: Target>(
    target: T,
    expected: &'static FailureType,
    assert_mode: bool,
) -> CatchResult<Proxy<T>> {
    let config = InterceptorConfig::builder()
        .target(target)
        .expected(expected)
        .assert_mode(assert_mode)
        .build()?;
    build(config)
}

/// Build an intercepting proxy from a validated config, subtype tier first.
pub fn build<T: Target>(config: InterceptorConfig<T>) -> CatchResult<Proxy<T>> {
    let (target, interceptor) = config.into_parts();
    SubtypeProxyFactory::new().create(target, Some(interceptor))
}

/// Narrow `target` to its capability view without intercepting anything.
///
/// The result is itself a [`Target`], so it can be handed to [`catch`] or
/// [`verify`] afterwards.
pub fn as_capability_proxy<T: Target>(target: T) -> CatchResult<Proxy<T>> {
    CapabilityProxyFactory.create(target, None)
}

/// The failure stored by the last intercepted call on this thread.
pub fn last_captured() -> Option<Caught> {
    register::get()
}

pub fn last_captured_as<F: Failure>() -> Option<Arc<F>> {
    register::get_as::<F>()
}

pub fn reset_captured() {
    register::clear();
}

pub fn catch_call<R, E, F>(call: F) -> CatchResult<R>
where
    R: Placeholder,
    E: Failure,
    F: FnOnce() -> Result<R, E>,
{
    catch_call_only(&FAILURE, call)
}

pub fn catch_call_only<R, E, F>(expected: &'static FailureType, call: F) -> CatchResult<R>
where
    R: Placeholder,
    E: Failure,
    F: FnOnce() -> Result<R, E>,
{
    Interceptor::new(expected, false).intercept(&mut (), |_| call())
}

pub fn verify_call<R, E, F>(call: F) -> CatchResult<R>
where
    R: Placeholder,
    E: Failure,
    F: FnOnce() -> Result<R, E>,
{
    verify_call_only(&FAILURE, call)
}

pub fn verify_call_only<R, E, F>(expected: &'static FailureType, call: F) -> CatchResult<R>
where
    R: Placeholder,
    E: Failure,
    F: FnOnce() -> Result<R, E>,
{
    Interceptor::new(expected, true).intercept(&mut (), |_| call())
}

/// Intercept a closure that can only fail by panicking.
///
/// The panic hook still runs before the panic is captured; install a quiet
/// one with [`std::panic::set_hook`] to keep stored panics off stderr.
pub fn catch_panic<R, F>(call: F) -> CatchResult<R>
where
    R: Placeholder,
    F: FnOnce() -> R,
{
    catch_call(|| Ok::<R, Infallible>(call()))
}
