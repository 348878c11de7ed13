//! Memoizing resolution cell for deferred references.
//!
//! A [`Lazy`] starts unresolved and is resolved at most once by the first
//! successful [`Lazy::force`]. Clones share the same cell, so a property
//! copied into a child entity sees the value its base resolved.
//!
//! Resolution thunks return an [`EntityRef`] and never see a cell, so a
//! chain of thunks that does not settle is caught by the resolver's depth
//! bound, not here. [`LazyError::Reentered`] only fires when a resolver
//! passed to `force` forces the same cell again.
//!
//! [`EntityRef`]: crate::declaration::EntityRef

use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

enum State<T> {
    Unresolved,
    Resolving,
    Resolved(T),
}

/// Failure of [`Lazy::force`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LazyError<E> {
    /// The cell was forced again from inside its own resolver.
    Reentered,
    /// The resolver failed; the cell stays unresolved.
    Failed(E),
}

/// A shared, memoizing resolution cell.
pub struct Lazy<T> {
    state: Arc<Mutex<State<T>>>,
}

impl<T: Clone> Lazy<T> {
    /// Create an unresolved cell.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State::Unresolved)),
        }
    }

    /// Create a cell that is already resolved.
    pub fn resolved(value: T) -> Self {
        Self {
            state: Arc::new(Mutex::new(State::Resolved(value))),
        }
    }

    /// Get the resolved value, if any.
    pub fn get(&self) -> Option<T> {
        match &*self.state.lock() {
            State::Resolved(value) => Some(value.clone()),
            _ => None,
        }
    }

    /// Check if the cell holds a value.
    pub fn is_resolved(&self) -> bool {
        matches!(&*self.state.lock(), State::Resolved(_))
    }

    /// Resolve the cell, running `resolve` only if no value is cached yet.
    ///
    /// The lock is not held while `resolve` runs, so the resolver may touch
    /// other cells freely; touching this one again yields
    /// [`LazyError::Reentered`].
    pub fn force<E>(&self, resolve: impl FnOnce() -> Result<T, E>) -> Result<T, LazyError<E>> {
        {
            let mut state = self.state.lock();
            match &*state {
                State::Resolved(value) => return Ok(value.clone()),
                State::Resolving => return Err(LazyError::Reentered),
                State::Unresolved => *state = State::Resolving,
            }
        }

        let outcome = resolve();

        let mut state = self.state.lock();
        match outcome {
            Ok(value) => {
                *state = State::Resolved(value.clone());
                Ok(value)
            }
            Err(err) => {
                *state = State::Unresolved;
                Err(LazyError::Failed(err))
            }
        }
    }
}

impl<T: Clone> Default for Lazy<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Lazy<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Lazy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.state.lock() {
            State::Unresolved => f.write_str("Lazy(<unresolved>)"),
            State::Resolving => f.write_str("Lazy(<resolving>)"),
            State::Resolved(value) => f.debug_tuple("Lazy").field(value).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::OnceLock;

    #[test]
    fn test_force_memoizes() {
        let calls = AtomicUsize::new(0);
        let cell: Lazy<u32> = Lazy::new();

        let first = cell.force(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, ()>(7)
        });
        let second = cell.force(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, ()>(8)
        });

        assert_eq!(first, Ok(7));
        assert_eq!(second, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(cell.is_resolved());
    }

    #[test]
    fn test_failure_leaves_cell_unresolved() {
        let cell: Lazy<u32> = Lazy::new();

        assert_eq!(cell.force(|| Err("boom")), Err(LazyError::Failed("boom")));
        assert!(!cell.is_resolved());
        assert_eq!(cell.force(|| Ok::<_, &str>(3)), Ok(3));
    }

    #[test]
    fn test_reentrant_force_is_detected() {
        let slot: Arc<OnceLock<Lazy<u32>>> = Arc::new(OnceLock::new());
        let cell = Lazy::new();
        slot.set(cell.clone()).ok();

        let inner = slot.clone();
        let outcome = cell.force(|| match inner.get() {
            Some(same) => match same.force(|| Ok::<_, ()>(1)) {
                Err(LazyError::Reentered) => Err("reentered"),
                _ => Ok(1),
            },
            None => Ok(1),
        });

        assert_eq!(outcome, Err(LazyError::Failed("reentered")));
        assert!(!cell.is_resolved());
    }

    #[test]
    fn test_clones_share_state() {
        let cell: Lazy<&'static str> = Lazy::new();
        let copy = cell.clone();

        copy.force(|| Ok::<_, ()>("Node")).unwrap();
        assert_eq!(cell.get(), Some("Node"));
        assert_eq!(format!("{cell:?}"), "Lazy(\"Node\")");
    }
}
