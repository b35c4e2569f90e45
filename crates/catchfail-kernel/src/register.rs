//! Per-thread failure register.
//!
//! One slot per OS thread, created lazily on first access and dropped with
//! the thread. The slot holds the failure stored by the most recent
//! intercepted call on this thread until the next reset or write.

use std::cell::RefCell;
use std::sync::Arc;

use crate::failure::{Caught, Failure};

thread_local! {
    static CAPTURED: RefCell<Option<Caught>> = const { RefCell::new(None) };
}

/// Store `caught` (or nothing), replacing the previous value.
pub fn set(caught: Option<Caught>) {
    let previous = CAPTURED.with(|slot| slot.replace(caught));
    // Dropped outside the borrow: a failure's Drop may touch the register.
    drop(previous);
}

/// The last stored failure, if any.
///
/// No type check happens here; narrow the handle with
/// [`Caught::downcast_ref`] or [`Caught::downcast`].
pub fn get() -> Option<Caught> {
    CAPTURED.with(|slot| slot.borrow().clone())
}

/// The last stored failure narrowed to `F`.
///
/// `None` when the register is empty or holds a different type.
pub fn get_as<F: Failure>() -> Option<Arc<F>> {
    get()?.downcast::<F>().ok()
}

pub fn clear() {
    set(None);
}

pub fn is_empty() -> bool {
    CAPTURED.with(|slot| slot.borrow().is_none())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failure::Panicked;

    #[test]
    fn set_then_get_returns_same_instance() {
        let caught = Caught::new(Panicked::new("first"));
        set(Some(caught.clone()));
        let stored = get().expect("stored");
        assert!(stored.ptr_eq(&caught));
        clear();
    }

    #[test]
    fn value_stays_until_next_write() {
        set(Some(Caught::new(Panicked::new("kept"))));
        assert_eq!(get().map(|c| c.message()), Some("kept".to_string()));
        assert_eq!(get().map(|c| c.message()), Some("kept".to_string()));

        set(Some(Caught::new(Panicked::new("replaced"))));
        assert_eq!(get().map(|c| c.message()), Some("replaced".to_string()));
        clear();
    }

    #[test]
    fn clear_is_idempotent() {
        set(Some(Caught::new(Panicked::new("gone"))));
        clear();
        assert!(is_empty());
        clear();
        assert!(is_empty());
        assert!(get().is_none());
    }

    #[test]
    fn get_as_narrows_or_misses() {
        set(Some(Caught::new(Panicked::new("typed"))));
        assert_eq!(
            get_as::<Panicked>().map(|p| p.message().to_string()),
            Some("typed".to_string())
        );
        assert!(get_as::<std::io::Error>().is_none());
        // A missed narrowing leaves the slot untouched.
        assert!(get().is_some());
        clear();
    }

    #[test]
    fn threads_do_not_share_slots() {
        set(Some(Caught::new(Panicked::new("main thread"))));

        let seen_by_other = std::thread::spawn(|| {
            let before = get().map(|c| c.message());
            set(Some(Caught::new(Panicked::new("other thread"))));
            (before, get().map(|c| c.message()))
        })
        .join()
        .expect("worker thread");

        assert_eq!(seen_by_other, (None, Some("other thread".to_string())));
        assert_eq!(get().map(|c| c.message()), Some("main thread".to_string()));
        clear();
    }
}
