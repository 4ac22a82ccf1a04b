use std::sync::{Arc, Mutex};

type Callback<T> = Arc<dyn Fn(T) + Send + Sync>;

/// A replaceable delivery sink shared between the caller and worker threads.
///
/// The caller registers (or replaces) a callback at any time; workers emit
/// into whichever callback is registered when the value is ready. The
/// callback runs without the slot locked, so it may replace or clear the
/// slot itself.
pub struct CallbackSlot<T> {
    callback: Mutex<Option<Callback<T>>>,
}

impl<T> CallbackSlot<T> {
    pub fn new() -> Self {
        Self {
            callback: Mutex::new(None),
        }
    }

    pub fn set(&self, callback: Box<dyn Fn(T) + Send + Sync>) {
        *self.callback.lock().unwrap_or_else(|e| e.into_inner()) = Some(Arc::from(callback));
    }

    pub fn clear(&self) {
        *self.callback.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }

    /// Delivers `value`; returns `false` when nothing is registered.
    pub fn emit(&self, value: T) -> bool {
        let current = self.callback.lock().unwrap_or_else(|e| e.into_inner()).clone();
        match current {
            Some(callback) => {
                callback(value);
                true
            }
            None => false,
        }
    }
}

impl<T> Default for CallbackSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}
