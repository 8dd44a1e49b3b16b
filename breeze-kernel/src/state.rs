use parking_lot::Mutex;
use std::sync::Arc;

/// Shared mutable state handed to request handlers and background tasks.
pub type Shared<T> = Arc<Mutex<T>>;

pub fn new_state<T>(value: T) -> Shared<T> {
    Arc::new(Mutex::new(value))
}
