//! Write-through value bindings.
//!
//! A [`Binding`] is a shared, typed cell. The application keeps one clone and
//! hands another to a flag or argument definition; the parser writes the
//! parsed value through its clone and the application reads it back.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

/// A shared value slot that flag and argument parsing writes into.
///
/// # Examples
///
/// ```
/// use cmdtree_core::Binding;
///
/// let port = Binding::new(8080);
/// let target = port.clone();
/// target.set(9000);
/// assert_eq!(port.get(), 9000);
/// ```
pub struct Binding<T> {
    slot: Arc<RwLock<T>>,
}

impl<T: Clone> Binding<T> {
    pub fn new(value: T) -> Self {
        Self {
            slot: Arc::new(RwLock::new(value)),
        }
    }

    pub fn get(&self) -> T {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set(&self, value: T) {
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = value;
    }

    /// Whether both handles write to the same slot.
    pub fn same_slot(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.slot, &other.slot)
    }
}

impl<T: Clone + Default> Default for Binding<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> Clone for Binding<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T: Clone + fmt::Debug> fmt::Debug for Binding<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Binding").field(&self.get()).finish()
    }
}
