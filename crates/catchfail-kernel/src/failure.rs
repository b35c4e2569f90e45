//! Failure model.
//!
//! A failure is anything a delegated call can raise: an `Err` value whose
//! type implements [`Failure`], or a panic unwinding out of the call. Every
//! failure carries a static [`FailureType`] descriptor; descriptors form a
//! single-rooted hierarchy that the classifier walks to decide whether an
//! observed failure is assignable to the expected one.
//!
//! ```text
//! Failure                 root, default expected type
//! ├── Error               values returned through Err
//! │   ├── Io              std::io::Error
//! │   └── Parse           std parse / utf-8 errors
//! └── Panic               panics without a typed payload
//! ```

use std::any::Any;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use crate::error::{CatchError, CatchResult};

/// Root of the failure hierarchy.
pub static FAILURE: FailureType = FailureType::root("Failure");

/// Failures returned through `Err`.
pub static ERROR: FailureType = FailureType::new("Error", &FAILURE);

/// Panics that carry no typed failure payload.
pub static PANIC: FailureType = FailureType::new("Panic", &FAILURE);

/// `std::io::Error`.
pub static IO: FailureType = FailureType::new("Io", &ERROR);

/// Parse and UTF-8 conversion errors from `std`.
pub static PARSE: FailureType = FailureType::new("Parse", &ERROR);

/// Static descriptor of a failure type.
///
/// Declare descriptors as `static` items so they can be referenced as
/// `&'static FailureType`:
///
/// ```
/// use catchfail_kernel::{ERROR, FailureType};
///
/// static INDEX_OUT_OF_BOUNDS: FailureType = FailureType::new("IndexOutOfBounds", &ERROR);
///
/// assert!(ERROR.is_assignable_from(&INDEX_OUT_OF_BOUNDS));
/// assert!(!INDEX_OUT_OF_BOUNDS.is_assignable_from(&ERROR));
/// ```
///
/// A descriptor is identified by its address, not its name: two statics
/// sharing a name are unrelated types. Names are only the registry key.
#[derive(Debug)]
pub struct FailureType {
    name: &'static str,
    parent: Option<&'static FailureType>,
}

impl FailureType {
    /// A descriptor without a parent.
    pub const fn root(name: &'static str) -> Self {
        Self { name, parent: None }
    }

    /// A descriptor below `parent`.
    pub const fn new(name: &'static str, parent: &'static FailureType) -> Self {
        Self {
            name,
            parent: Some(parent),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn parent(&self) -> Option<&'static FailureType> {
        self.parent
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// This type followed by each of its ancestors, ending at the root.
    pub fn ancestors(&self) -> Ancestors<'_> {
        Ancestors { next: Some(self) }
    }

    /// Whether a failure of type `other` may be stored where `self` is
    /// expected, i.e. `other` is `self` or one of its descendants.
    pub fn is_assignable_from(&self, other: &FailureType) -> bool {
        other.ancestors().any(|ancestor| std::ptr::eq(ancestor, self))
    }

    /// Type names from this type up to the root.
    pub fn lineage(&self) -> Vec<&'static str> {
        self.ancestors().map(FailureType::name).collect()
    }

    /// Register a descriptor (and its ancestors) for lookup by name.
    ///
    /// Registering the same descriptor twice is a no-op. A descriptor whose
    /// name is already registered below a different parent is rejected.
    pub fn register(ty: &'static FailureType) -> CatchResult<()> {
        let mut types = registry().write().unwrap_or_else(PoisonError::into_inner);

        let mut chain = Vec::new();
        let mut next = Some(ty);
        while let Some(current) = next {
            if let Some(existing) = types.get(current.name) {
                if !std::ptr::eq(*existing, current)
                    && existing.parent_name() != current.parent_name()
                {
                    return Err(CatchError::Argument(format!(
                        "failure type name already registered with a different parent: {}",
                        current.name
                    )));
                }
            } else {
                chain.push(current);
            }
            next = current.parent;
        }

        for current in chain {
            types.insert(current.name, current);
        }
        Ok(())
    }

    /// Resolve a registered descriptor by name.
    pub fn lookup(name: &str) -> Option<&'static FailureType> {
        registry()
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .copied()
    }

    fn parent_name(&self) -> Option<&'static str> {
        self.parent.map(FailureType::name)
    }
}

impl PartialEq for FailureType {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
    }
}

impl Eq for FailureType {}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Iterator over a type and its ancestors.
pub struct Ancestors<'a> {
    next: Option<&'a FailureType>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a FailureType;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.parent;
        Some(current)
    }
}

fn registry() -> &'static RwLock<BTreeMap<&'static str, &'static FailureType>> {
    static REGISTRY: OnceLock<RwLock<BTreeMap<&'static str, &'static FailureType>>> =
        OnceLock::new();
    REGISTRY.get_or_init(|| {
        let builtins: [&'static FailureType; 5] = [&FAILURE, &ERROR, &PANIC, &IO, &PARSE];
        RwLock::new(builtins.into_iter().map(|ty| (ty.name, ty)).collect())
    })
}

/// Erasure helpers so a `dyn Failure` can be downcast to its concrete type.
pub trait AsAny: Any + Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Any + Send + Sync> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// A value that can be raised by a delegated call.
pub trait Failure: Error + AsAny {
    /// Position of this failure in the hierarchy.
    fn failure_type(&self) -> &'static FailureType;
}

impl Failure for std::io::Error {
    fn failure_type(&self) -> &'static FailureType {
        &IO
    }
}

impl Failure for fmt::Error {
    fn failure_type(&self) -> &'static FailureType {
        &ERROR
    }
}

impl Failure for std::num::ParseIntError {
    fn failure_type(&self) -> &'static FailureType {
        &PARSE
    }
}

impl Failure for std::num::ParseFloatError {
    fn failure_type(&self) -> &'static FailureType {
        &PARSE
    }
}

impl Failure for std::str::ParseBoolError {
    fn failure_type(&self) -> &'static FailureType {
        &PARSE
    }
}

impl Failure for std::str::Utf8Error {
    fn failure_type(&self) -> &'static FailureType {
        &PARSE
    }
}

impl Failure for std::string::FromUtf8Error {
    fn failure_type(&self) -> &'static FailureType {
        &PARSE
    }
}

impl Failure for std::convert::Infallible {
    fn failure_type(&self) -> &'static FailureType {
        match *self {}
    }
}

/// A panic that unwound out of a delegated call without a typed payload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct Panicked {
    message: String,
}

impl Panicked {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Recover the panic message from a payload (`&str` or `String`).
    pub fn from_payload(payload: &(dyn Any + Send)) -> Self {
        let message = if let Some(message) = payload.downcast_ref::<&'static str>() {
            (*message).to_string()
        } else if let Some(message) = payload.downcast_ref::<String>() {
            message.clone()
        } else {
            "panic with a non-string payload".to_string()
        };
        Self { message }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Failure for Panicked {
    fn failure_type(&self) -> &'static FailureType {
        &PANIC
    }
}

/// Type-erased handle to an intercepted failure instance.
///
/// Clones share the same instance; [`Caught::ptr_eq`] tells whether two
/// handles point at the same one.
#[derive(Clone)]
pub struct Caught {
    failure: Arc<dyn Failure>,
}

impl Caught {
    pub fn new<F: Failure>(failure: F) -> Self {
        // A handle raised again keeps pointing at the original instance.
        if let Some(caught) = (&failure as &dyn Any).downcast_ref::<Caught>() {
            return caught.clone();
        }
        Self {
            failure: Arc::new(failure),
        }
    }

    pub fn from_arc(failure: Arc<dyn Failure>) -> Self {
        Self { failure }
    }

    pub fn failure_type(&self) -> &'static FailureType {
        self.failure.failure_type()
    }

    /// Display text of the failure.
    pub fn message(&self) -> String {
        self.failure.to_string()
    }

    pub fn as_failure(&self) -> &dyn Failure {
        &*self.failure
    }

    pub fn is<F: Failure>(&self) -> bool {
        (*self.failure).as_any().is::<F>()
    }

    pub fn downcast_ref<F: Failure>(&self) -> Option<&F> {
        (*self.failure).as_any().downcast_ref::<F>()
    }

    /// Narrow the handle to its concrete failure type.
    ///
    /// On a mismatch the untouched handle comes back as the error.
    pub fn downcast<F: Failure>(self) -> Result<Arc<F>, Caught> {
        if !self.is::<F>() {
            return Err(self);
        }
        let failure = Arc::clone(&self.failure);
        failure.into_any_arc().downcast::<F>().map_err(|_| self)
    }

    /// The `source()` chain of the failure, nearest cause first.
    pub fn causes(&self) -> Causes<'_> {
        Causes {
            next: self.failure.source(),
        }
    }

    pub fn ptr_eq(&self, other: &Caught) -> bool {
        Arc::ptr_eq(&self.failure, &other.failure)
    }
}

impl fmt::Debug for Caught {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Caught")
            .field("failure_type", &self.failure_type().name())
            .field("failure", &self.failure)
            .finish()
    }
}

impl fmt::Display for Caught {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.failure, f)
    }
}

impl Error for Caught {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.failure.source()
    }
}

impl Failure for Caught {
    fn failure_type(&self) -> &'static FailureType {
        self.failure.failure_type()
    }
}

/// Iterator over a failure's cause chain.
pub struct Causes<'a> {
    next: Option<&'a (dyn Error + 'static)>,
}

impl<'a> Iterator for Causes<'a> {
    type Item = &'a (dyn Error + 'static);

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.source();
        Some(current)
    }
}

/// Raise a typed failure from code that cannot return `Result`.
///
/// The interceptor unwraps the payload, so the failure is classified by its
/// own type rather than as a [`Panicked`]. The panic still goes through the
/// installed panic hook, which by default prints to stderr even when the
/// failure ends up stored.
pub fn throw<F: Failure>(failure: F) -> ! {
    std::panic::panic_any(Caught::new(failure))
}
