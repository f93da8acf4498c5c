use std::sync::{Mutex, MutexGuard};

/// Acquire a mutex guard, intentionally ignoring poisoning.
///
/// Every mutex in this crate guards a plain lookup table (pending calls,
/// handlers, listeners, port lanes) with no invariant spanning two fields.
/// A panic while holding one leaves at worst a missing or stale entry.
/// Guards are never held across an `.await`.
pub(crate) fn lock_ignore_poison<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    // ---
    match m.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
