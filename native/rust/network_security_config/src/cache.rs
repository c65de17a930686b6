// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Lock-guarded memoization for derived policy state.

use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// A cache slot that is empty, being computed, or populated.
///
/// The computing state is the slot's lock being held by an initializer: concurrent callers of
/// [`CacheCell::get_or_try_init`] queue on the lock and then observe the populated value instead
/// of running their own initializer. Failed initializations leave the slot empty.
///
/// Initializers must not re-enter the same cell.
pub struct CacheCell<T: ?Sized> {
    slot: Mutex<Option<Arc<T>>>,
}

impl<T: ?Sized> CacheCell<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    /// Current value, without computing one.
    pub fn get(&self) -> Option<Arc<T>> {
        self.slot.lock().clone()
    }

    /// Return the cached value, or run `init` under the slot lock and cache its result.
    pub fn get_or_try_init<E>(
        &self,
        init: impl FnOnce() -> Result<Arc<T>, E>,
    ) -> Result<Arc<T>, E> {
        let mut slot = self.slot.lock();
        if let Some(value) = slot.as_ref() {
            return Ok(Arc::clone(value));
        }

        let value = init()?;
        *slot = Some(Arc::clone(&value));
        Ok(value)
    }

    /// Reset to empty. Returns `true` if a value was dropped.
    ///
    /// Waits for an in-flight initializer to finish first.
    pub fn invalidate(&self) -> bool {
        self.slot.lock().take().is_some()
    }

    pub fn is_populated(&self) -> bool {
        self.slot.lock().is_some()
    }
}

impl<T: ?Sized> Default for CacheCell<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> fmt::Debug for CacheCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.slot.try_lock() {
            Some(slot) if slot.is_some() => "populated",
            Some(_) => "empty",
            None => "locked",
        };
        f.debug_tuple("CacheCell").field(&state).finish()
    }
}
