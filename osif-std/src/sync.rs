//! Mutex and binary semaphore built on a condition-variable flag.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError, TryLockError};

pub use osif_api::sync::BinarySemaphore;

use crate::time::wait_while;

/// Locks `mutex`, recovering from poisoning.
///
/// Every state guarded in this crate stays consistent across a panic, so a poisoned lock is still usable.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Locks `mutex` if that is possible without blocking.
pub(crate) fn try_lock<T>(mutex: &Mutex<T>) -> Option<MutexGuard<'_, T>> {
    match mutex.try_lock() {
        Ok(guard) => Some(guard),
        Err(TryLockError::Poisoned(poisoned)) => Some(poisoned.into_inner()),
        Err(TryLockError::WouldBlock) => None,
    }
}

/// A boolean that threads can wait to take.
#[derive(Debug)]
struct Flag {
    raised: Mutex<bool>,
    changed: Condvar,
}

impl Flag {
    fn new(raised: bool) -> Self {
        Self {
            raised: Mutex::new(raised),
            changed: Condvar::new(),
        }
    }

    fn raise(&self) {
        *lock(&self.raised) = true;
        self.changed.notify_one();
    }

    /// Waits for the flag to be raised and lowers it again.
    fn take(&self, timeout_ms: u32) -> bool {
        let guard = lock(&self.raised);
        let (mut raised, ready) = wait_while(&self.changed, guard, timeout_ms, |raised| !*raised);
        if ready {
            *raised = false;
        }
        ready
    }
}

/// [`osif_api::sync::Mutex`] for `std`.
///
/// Neither owner-tracked nor reentrant: the flag is raised while the mutex is free.
#[derive(Debug)]
pub struct StdMutex {
    free: Flag,
}

impl StdMutex {
    pub(crate) fn new() -> Self {
        Self {
            free: Flag::new(true),
        }
    }
}

impl osif_api::sync::Mutex for StdMutex {
    fn signal(&self) {
        self.free.raise();
    }

    fn wait(&self, timeout_ms: u32) -> bool {
        self.free.take(timeout_ms)
    }
}

/// [`BinarySemaphore`] for `std`.
#[derive(Debug)]
pub struct StdBinarySemaphore {
    signaled: Flag,
}

impl StdBinarySemaphore {
    pub(crate) fn new() -> Self {
        Self {
            signaled: Flag::new(false),
        }
    }
}

impl BinarySemaphore for StdBinarySemaphore {
    fn signal(&self) {
        self.signaled.raise();
    }

    fn wait(&self, timeout_ms: u32) -> bool {
        self.signaled.take(timeout_ms)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::sync::Mutex;

    use osif_api::NO_WAIT;

    use super::{Flag, try_lock};

    #[test]
    fn flag_take_lowers() {
        let flag = Flag::new(true);
        assert!(flag.take(NO_WAIT));
        assert!(!flag.take(NO_WAIT));

        flag.raise();
        flag.raise();
        assert!(flag.take(NO_WAIT));
        assert!(!flag.take(NO_WAIT));
    }

    #[test]
    fn try_lock_reports_contention() {
        let mutex = Mutex::new(0);
        let guard = mutex.lock().unwrap();
        assert!(try_lock(&mutex).is_none());

        drop(guard);
        assert!(try_lock(&mutex).is_some());
    }

    #[test]
    fn poisoned_lock_is_recovered() {
        let mutex = Mutex::new(1);
        let _ = std::thread::scope(|scope| {
            scope
                .spawn(|| {
                    let _guard = mutex.lock().unwrap();
                    panic!("poison");
                })
                .join()
        });

        assert!(mutex.is_poisoned());
        assert_eq!(*super::lock(&mutex), 1);
        assert_eq!(try_lock(&mutex).map(|guard| *guard), Some(1));
    }
}
