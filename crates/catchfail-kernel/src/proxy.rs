//! Stand-in construction.
//!
//! A [`Proxy`] owns the wrapped target and routes every call through the
//! [`Interceptor`] bound when it was built. Construction is a two-tier
//! strategy, decided once per proxy:
//!
//! - **Subtype** ([`SubtypeProxyFactory`]): the proxy keeps the concrete
//!   target, so calls may address `&mut T` as well as its capabilities.
//!   Refused for sealed types, in which case the fallback tier is used.
//! - **Capability** ([`CapabilityProxyFactory`]): the target is narrowed to
//!   a boxed trait object of its capabilities. Concrete access fails at the
//!   type boundary with [`CastError`].
//!
//! Rust cannot synthesize subtypes at run time, so the proxy is not a
//! drop-in replacement for `T`: calls are made through closures handed the
//! concrete target or its capability view.

use std::any::type_name;
use std::convert::Infallible;
use std::fmt;

use crate::error::{CastError, CatchError, CatchResult};
use crate::failure::{Caught, Failure};
use crate::interceptor::{Interceptor, Placeholder};

/// Capability set of types that expose none.
pub trait Opaque {}

/// A type that can be wrapped by a [`Proxy`].
///
/// Usually implemented with the [`target!`](crate::target) macro:
///
/// ```
/// use catchfail_kernel::target;
///
/// trait Sequence {
///     fn len(&self) -> usize;
/// }
///
/// struct Letters(Vec<char>);
///
/// impl Sequence for Letters {
///     fn len(&self) -> usize {
///         self.0.len()
///     }
/// }
///
/// target!(Letters => dyn Sequence);
/// ```
pub trait Target: Sized + 'static {
    /// Trait object a capability-only stand-in exposes. Supertraits of the
    /// capability trait come along with it.
    type Capabilities: ?Sized + 'static;

    /// Sealed types refuse subtype stand-ins.
    const SEALED: bool = false;

    fn capabilities(&mut self) -> Option<&mut Self::Capabilities> {
        None
    }

    fn into_capabilities(self: Box<Self>) -> Option<Box<Self::Capabilities>> {
        None
    }
}

/// Implement [`Target`] for a concrete type.
///
/// ```text
/// target!(Plain);                         // no capabilities
/// target!(sealed Plain);                  // sealed, no capabilities
/// target!(List => dyn Sequence);          // capability view
/// target!(sealed List => dyn Sequence);   // sealed, capability view
/// ```
#[macro_export]
macro_rules! target {
    (sealed $ty:ty => $capabilities:ty) => {
        impl $crate::Target for $ty {
            type Capabilities = $capabilities;

            const SEALED: bool = true;

            fn capabilities(&mut self) -> Option<&mut Self::Capabilities> {
                Some(self)
            }

            fn into_capabilities(self: Box<Self>) -> Option<Box<Self::Capabilities>> {
                Some(self)
            }
        }
    };
    (sealed $ty:ty) => {
        impl $crate::Target for $ty {
            type Capabilities = dyn $crate::Opaque;

            const SEALED: bool = true;
        }
    };
    ($ty:ty => $capabilities:ty) => {
        impl $crate::Target for $ty {
            type Capabilities = $capabilities;

            fn capabilities(&mut self) -> Option<&mut Self::Capabilities> {
                Some(self)
            }

            fn into_capabilities(self: Box<Self>) -> Option<Box<Self::Capabilities>> {
                Some(self)
            }
        }
    };
    ($ty:ty) => {
        impl $crate::Target for $ty {
            type Capabilities = dyn $crate::Opaque;
        }
    };
}

/// Which construction tier produced a proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    Subtype,
    Capability,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Subtype => f.write_str("subtype"),
            Self::Capability => f.write_str("capability"),
        }
    }
}

enum StandIn<T: Target> {
    Subtype(T),
    Capability(Box<T::Capabilities>),
}

/// Stand-in for a wrapped target.
///
/// Built with an interceptor, every call resets the register, delegates and
/// classifies. Built without one (see
/// [`as_capability_proxy`](crate::as_capability_proxy)), calls are only
/// forwarded.
pub struct Proxy<T: Target> {
    stand_in: StandIn<T>,
    interceptor: Option<Interceptor>,
}

impl<T: Target> Proxy<T> {
    fn subtype(target: T, interceptor: Option<Interceptor>) -> Self {
        Self {
            stand_in: StandIn::Subtype(target),
            interceptor,
        }
    }

    fn capability(capabilities: Box<T::Capabilities>, interceptor: Option<Interceptor>) -> Self {
        Self {
            stand_in: StandIn::Capability(capabilities),
            interceptor,
        }
    }

    pub fn tier(&self) -> Tier {
        match self.stand_in {
            StandIn::Subtype(_) => Tier::Subtype,
            StandIn::Capability(_) => Tier::Capability,
        }
    }

    /// Marker for proxies that only expose capabilities.
    pub fn is_capability_only(&self) -> bool {
        self.tier() == Tier::Capability
    }

    pub fn is_intercepting(&self) -> bool {
        self.interceptor.is_some()
    }

    pub fn interceptor(&self) -> Option<&Interceptor> {
        self.interceptor.as_ref()
    }

    /// Call a fallible method on the concrete target.
    pub fn call<R, E, F>(&mut self, call: F) -> CatchResult<R>
    where
        R: Placeholder,
        E: Failure,
        F: FnOnce(&mut T) -> Result<R, E>,
    {
        let interceptor = self.interceptor;
        let target = self.concrete_mut()?;
        dispatch(interceptor, target, call)
    }

    /// Call an infallible method on the concrete target; only panics are
    /// intercepted.
    pub fn invoke<R, F>(&mut self, call: F) -> CatchResult<R>
    where
        R: Placeholder,
        F: FnOnce(&mut T) -> R,
    {
        self.call(|target| Ok::<R, Infallible>(call(target)))
    }

    /// Call a fallible method through the capability view.
    pub fn call_capability<R, E, F>(&mut self, call: F) -> CatchResult<R>
    where
        R: Placeholder,
        E: Failure,
        F: FnOnce(&mut T::Capabilities) -> Result<R, E>,
    {
        let interceptor = self.interceptor;
        let capabilities = self.capabilities_mut()?;
        dispatch(interceptor, capabilities, call)
    }

    /// Call an infallible method through the capability view.
    pub fn invoke_capability<R, F>(&mut self, call: F) -> CatchResult<R>
    where
        R: Placeholder,
        F: FnOnce(&mut T::Capabilities) -> R,
    {
        self.call_capability(|capabilities| Ok::<R, Infallible>(call(capabilities)))
    }

    /// Give the wrapped target back. Fails for capability-only proxies.
    pub fn into_target(self) -> Result<T, CastError> {
        match self.stand_in {
            StandIn::Subtype(target) => Ok(target),
            StandIn::Capability(_) => Err(concrete_cast::<T>()),
        }
    }

    fn concrete_mut(&mut self) -> Result<&mut T, CastError> {
        match &mut self.stand_in {
            StandIn::Subtype(target) => Ok(target),
            StandIn::Capability(_) => Err(concrete_cast::<T>()),
        }
    }

    fn capabilities_mut(&mut self) -> Result<&mut T::Capabilities, CastError> {
        match &mut self.stand_in {
            StandIn::Subtype(target) => target.capabilities().ok_or(CastError {
                target: type_name::<T>(),
                requested: type_name::<T::Capabilities>(),
            }),
            StandIn::Capability(capabilities) => Ok(&mut **capabilities),
        }
    }
}

impl<T: Target> fmt::Debug for Proxy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Proxy")
            .field("target", &type_name::<T>())
            .field("tier", &self.tier())
            .field("interceptor", &self.interceptor)
            .finish()
    }
}

/// A proxy can be wrapped again; the outer proxy sees the inner one's
/// capability view. Calls made through the outer proxy reach the inner
/// target directly, so only the outer interceptor applies.
impl<T: Target> Target for Proxy<T> {
    type Capabilities = T::Capabilities;

    fn capabilities(&mut self) -> Option<&mut T::Capabilities> {
        self.capabilities_mut().ok()
    }

    fn into_capabilities(self: Box<Self>) -> Option<Box<T::Capabilities>> {
        match self.stand_in {
            StandIn::Subtype(target) => Box::new(target).into_capabilities(),
            StandIn::Capability(capabilities) => Some(capabilities),
        }
    }
}

fn concrete_cast<T: Target>() -> CastError {
    CastError {
        target: type_name::<T>(),
        requested: type_name::<T>(),
    }
}

fn dispatch<C, R, E, F>(interceptor: Option<Interceptor>, target: &mut C, call: F) -> CatchResult<R>
where
    C: ?Sized,
    R: Placeholder,
    E: Failure,
    F: FnOnce(&mut C) -> Result<R, E>,
{
    match interceptor {
        Some(interceptor) => interceptor.intercept(target, call),
        None => call(target).map_err(|failure| CatchError::Propagated(Caught::new(failure))),
    }
}

/// Builds stand-ins for targets.
pub trait ProxyFactory {
    fn create<T: Target>(&self, target: T, interceptor: Option<Interceptor>)
    -> CatchResult<Proxy<T>>;
}

/// Tier 2: capability-only stand-ins.
#[derive(Debug, Clone, Copy, Default)]
pub struct CapabilityProxyFactory;

impl ProxyFactory for CapabilityProxyFactory {
    fn create<T: Target>(
        &self,
        target: T,
        interceptor: Option<Interceptor>,
    ) -> CatchResult<Proxy<T>> {
        match Box::new(target).into_capabilities() {
            Some(capabilities) => {
                tracing::debug!(ty = type_name::<T>(), tier = %Tier::Capability, "stand-in built");
                Ok(Proxy::capability(capabilities, interceptor))
            }
            None => Err(CatchError::Unproxyable {
                type_name: type_name::<T>(),
            }),
        }
    }
}

/// Tier 1: subtype stand-ins, falling back to `F` for sealed types.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubtypeProxyFactory<F = CapabilityProxyFactory> {
    fallback: F,
}

impl SubtypeProxyFactory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<F> SubtypeProxyFactory<F> {
    pub fn with_fallback(fallback: F) -> Self {
        Self { fallback }
    }

    /// Whether this tier can stand in for `T` itself.
    pub fn accepts<T: Target>(&self) -> bool {
        !T::SEALED
    }
}

impl<F: ProxyFactory> ProxyFactory for SubtypeProxyFactory<F> {
    fn create<T: Target>(
        &self,
        target: T,
        interceptor: Option<Interceptor>,
    ) -> CatchResult<Proxy<T>> {
        if !self.accepts::<T>() {
            tracing::debug!(ty = type_name::<T>(), "sealed type, falling back");
            return self.fallback.create(target, interceptor);
        }
        tracing::debug!(ty = type_name::<T>(), tier = %Tier::Subtype, "stand-in built");
        Ok(Proxy::subtype(target, interceptor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failure::{ERROR, FAILURE, FailureType, PANIC};
    use crate::register;

    static EMPTY: FailureType = FailureType::new("Empty", &ERROR);

    #[derive(Debug, thiserror::Error)]
    #[error("stack is empty")]
    struct Empty;

    impl Failure for Empty {
        fn failure_type(&self) -> &'static FailureType {
            &EMPTY
        }
    }

    trait Depth {
        fn size(&self) -> usize;
    }

    trait Stack: Depth {
        fn pop(&mut self) -> Result<i32, Empty>;
    }

    #[derive(Debug, Default)]
    struct VecStack(Vec<i32>);

    impl Depth for VecStack {
        fn size(&self) -> usize {
            self.0.len()
        }
    }

    impl Stack for VecStack {
        fn pop(&mut self) -> Result<i32, Empty> {
            self.0.pop().ok_or(Empty)
        }
    }

    target!(VecStack => dyn Stack);

    #[derive(Debug, Default)]
    struct FrozenStack(Vec<i32>);

    impl Depth for FrozenStack {
        fn size(&self) -> usize {
            self.0.len()
        }
    }

    impl Stack for FrozenStack {
        fn pop(&mut self) -> Result<i32, Empty> {
            self.0.pop().ok_or(Empty)
        }
    }

    target!(sealed FrozenStack => dyn Stack);

    struct Token;
    target!(sealed Token);

    struct Plain;
    target!(Plain);

    fn interceptor() -> Option<Interceptor> {
        Some(Interceptor::new(&FAILURE, false))
    }

    #[test]
    fn open_type_gets_subtype_tier() {
        let proxy = SubtypeProxyFactory::new()
            .create(VecStack::default(), interceptor())
            .expect("proxy");
        assert_eq!(proxy.tier(), Tier::Subtype);
        assert!(!proxy.is_capability_only());
        assert!(proxy.is_intercepting());
    }

    #[test]
    fn sealed_type_falls_back_to_capability_tier() {
        let factory = SubtypeProxyFactory::new();
        assert!(!factory.accepts::<FrozenStack>());
        let proxy = factory
            .create(FrozenStack::default(), interceptor())
            .expect("proxy");
        assert_eq!(proxy.tier(), Tier::Capability);
        assert!(proxy.is_capability_only());
    }

    #[test]
    fn sealed_type_without_capabilities_is_unproxyable() {
        let err = SubtypeProxyFactory::new()
            .create(Token, interceptor())
            .expect_err("no tier fits");
        assert!(matches!(err, CatchError::Unproxyable { .. }));
        assert!(err.to_string().contains("Token"));
    }

    #[test]
    fn open_type_without_capabilities_still_gets_subtype_tier() {
        let proxy = SubtypeProxyFactory::new()
            .create(Plain, interceptor())
            .expect("proxy");
        assert_eq!(proxy.tier(), Tier::Subtype);
    }

    #[test]
    fn capability_factory_never_keeps_concrete_type() {
        let proxy = CapabilityProxyFactory
            .create(VecStack(vec![1]), interceptor())
            .expect("proxy");
        assert_eq!(proxy.tier(), Tier::Capability);
        let err = proxy.into_target().expect_err("capability only");
        assert!(err.target.contains("VecStack"));
    }

    #[test]
    fn capability_calls_reach_supertrait_methods() {
        let mut proxy = CapabilityProxyFactory
            .create(VecStack(vec![4, 5]), interceptor())
            .expect("proxy");
        assert_eq!(proxy.invoke_capability(|stack| stack.size()).expect("size"), 2);
        assert_eq!(proxy.call_capability(|stack| stack.pop()).expect("pop"), 5);
    }

    #[test]
    fn concrete_call_on_capability_proxy_is_a_cast_error() {
        let mut proxy = SubtypeProxyFactory::new()
            .create(FrozenStack(vec![1]), interceptor())
            .expect("proxy");
        register::set(Some(Caught::new(Empty)));
        let err = proxy.call(|stack| stack.pop()).expect_err("cast");
        assert!(matches!(err, CatchError::Cast(_)));
        // Rejected before delegation: no reset happened.
        assert!(register::get().is_some());
        register::clear();
    }

    #[test]
    fn subtype_capabilities_missing_is_a_cast_error() {
        let mut proxy = SubtypeProxyFactory::new()
            .create(Plain, interceptor())
            .expect("proxy");
        let err = proxy
            .invoke_capability(|_| ())
            .expect_err("no capabilities");
        assert!(matches!(err, CatchError::Cast(_)));
    }

    #[test]
    fn forwarding_proxy_leaves_register_alone() {
        let mut proxy = CapabilityProxyFactory
            .create(VecStack::default(), None)
            .expect("proxy");
        assert!(!proxy.is_intercepting());
        register::set(Some(Caught::new(Empty)));

        let err = proxy.call_capability(|stack| stack.pop()).expect_err("forwarded");
        assert!(err.into_propagated().is_some_and(|c| c.is::<Empty>()));
        assert!(register::get().is_some_and(|c| c.is::<Empty>()));
        register::clear();
    }

    #[test]
    fn proxy_of_proxy_uses_inner_capabilities() {
        let inner = CapabilityProxyFactory
            .create(FrozenStack(vec![]), None)
            .expect("forwarding proxy");
        let mut outer = SubtypeProxyFactory::new()
            .create(inner, interceptor())
            .expect("outer proxy");
        assert_eq!(outer.tier(), Tier::Subtype);

        let value = outer.call_capability(|stack| stack.pop()).expect("stored");
        assert_eq!(value, 0);
        assert!(register::get_as::<Empty>().is_some());
        register::clear();
    }

    #[test]
    fn only_outermost_interceptor_applies() {
        let inner = SubtypeProxyFactory::new()
            .create(FrozenStack(vec![]), Some(Interceptor::new(&PANIC, true)))
            .expect("asserting inner proxy");
        let mut outer = SubtypeProxyFactory::new()
            .create(inner, interceptor())
            .expect("outer proxy");

        // The inner proxy would reject an `Empty`; the outer one stores it.
        assert_eq!(outer.call_capability(|stack| stack.pop()).expect("stored"), 0);
        assert!(register::get_as::<Empty>().is_some());
        register::clear();
    }

    #[test]
    fn into_target_returns_subtype_target() {
        let proxy = SubtypeProxyFactory::new()
            .create(VecStack(vec![9]), interceptor())
            .expect("proxy");
        assert_eq!(proxy.into_target().expect("concrete").0, vec![9]);
    }
}
