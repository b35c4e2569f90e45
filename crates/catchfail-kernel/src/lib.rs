//! # Catchfail Kernel
//!
//! Capture a failure raised by a method call instead of letting it reach the
//! caller, so a test can make its assertions afterwards.
//!
//! A target is wrapped in a [`Proxy`]. Each call made through the proxy
//! resets the per-thread register, delegates to the target, and classifies
//! what came back: a failure of the expected type is stored and a
//! placeholder value returned; anything else is passed through or, for the
//! `verify*` entry points, turned into [`ExpectationNotMet`].
//!
//! Panics are captured after the panic hook has run, so the default hook
//! still reports them on stderr. Tests that capture many panics can install
//! a quiet hook with [`std::panic::set_hook`].
//!
//! ## Architecture
//!
//! ```text
//! api                   ← catch / verify / last_captured / reset_captured
//!     │
//! Proxy<T>              ← Subtype tier, or Capability tier for sealed types
//!     │
//! Interceptor           ← reset → delegate → classify → store/reject/pass
//!     │
//! classify              ← Outcome × assert flag → Disposition
//!     │
//! register              ← thread-local slot holding the last Caught
//!     │
//! Failure / Caught      ← typed failures with a named type hierarchy
//! ```
//!
//! ```
//! use catchfail_kernel::{catch, last_captured, target};
//!
//! struct Shelf(Vec<u32>);
//!
//! impl Shelf {
//!     fn take(&mut self, index: usize) -> Result<u32, std::io::Error> {
//!         self.0
//!             .get(index)
//!             .copied()
//!             .ok_or_else(|| std::io::Error::other(format!("no item at {index}")))
//!     }
//! }
//!
//! target!(Shelf);
//!
//! let mut shelf = catch(Shelf(Vec::new())).unwrap();
//! assert_eq!(shelf.call(|s| s.take(2)).unwrap(), 0);
//! assert_eq!(last_captured().unwrap().message(), "no item at 2");
//! ```

pub mod api;
pub mod classify;
pub mod error;
pub mod failure;
pub mod interceptor;
pub mod proxy;
pub mod register;

pub use api::{
    as_capability_proxy, build, catch, catch_call, catch_call_only, catch_only, catch_panic,
    last_captured, last_captured_as, reset_captured, verify, verify_call, verify_call_only,
    verify_only,
};
pub use classify::{Disposition, ExpectationNotMet, Outcome, classify};
pub use error::{CastError, CatchError, CatchResult};
pub use failure::{
    AsAny, Caught, ERROR, FAILURE, Failure, FailureType, IO, PANIC, PARSE, Panicked, throw,
};
pub use interceptor::{Interceptor, InterceptorConfig, InterceptorConfigBuilder, Placeholder};
pub use proxy::{
    CapabilityProxyFactory, Opaque, Proxy, ProxyFactory, SubtypeProxyFactory, Target, Tier,
};
