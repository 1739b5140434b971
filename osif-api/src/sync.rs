//! Binary synchronization primitives.
//!
//! Both primitives are deliberately lightweight: neither tracks an owning thread, so any holder of a reference may
//! [`signal`](Mutex::signal) them. No priority inheritance or fairness is guaranteed; waking waiters in FIFO order is
//! a qualitative expectation only.

/// Binary mutual-exclusion primitive.
///
/// Created unlocked. [`wait`](Mutex::wait) acquires it, [`signal`](Mutex::signal) releases it. The mutex is not
/// reentrant: a thread waiting on a mutex it already holds blocks until the timeout elapses.
pub trait Mutex: Send + Sync {
    /// Releases the mutex.
    fn signal(&self);

    /// Acquires the mutex, blocking for at most `timeout_ms` milliseconds.
    ///
    /// Returns `false` if the timeout elapsed before the mutex became available.
    fn wait(&self, timeout_ms: u32) -> bool;

    /// Acquires the mutex and returns a guard that releases it when dropped.
    ///
    /// Returns `None` if the timeout elapsed.
    fn lock(&self, timeout_ms: u32) -> Option<MutexGuard<'_, Self>>
    where
        Self: Sized,
    {
        self.wait(timeout_ms).then(|| MutexGuard { mutex: self })
    }
}

/// Scope guard returned by [`Mutex::lock`]; signals the mutex on drop.
#[derive(Debug)]
#[must_use = "the mutex is released as soon as the guard is dropped"]
pub struct MutexGuard<'a, M>
where
    M: Mutex,
{
    mutex: &'a M,
}

impl<M> Drop for MutexGuard<'_, M>
where
    M: Mutex,
{
    fn drop(&mut self) {
        self.mutex.signal();
    }
}

/// Binary signal/wait primitive.
///
/// Created unsignaled: a [`wait`](BinarySemaphore::wait) only succeeds after a [`signal`](BinarySemaphore::signal).
/// Signaling an already signaled semaphore has no further effect.
pub trait BinarySemaphore: Send + Sync {
    /// Sets the semaphore.
    fn signal(&self);

    /// Waits for the semaphore to be set and clears it, blocking for at most `timeout_ms` milliseconds.
    ///
    /// Returns `false` if the timeout elapsed.
    fn wait(&self, timeout_ms: u32) -> bool;
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use core::sync::atomic::{AtomicBool, Ordering};

    use super::Mutex;

    /// Non-blocking mutex, `true` while held.
    #[derive(Debug, Default)]
    struct FlagMutex(AtomicBool);

    impl Mutex for FlagMutex {
        fn signal(&self) {
            self.0.store(false, Ordering::SeqCst);
        }

        fn wait(&self, _timeout_ms: u32) -> bool {
            !self.0.swap(true, Ordering::SeqCst)
        }
    }

    #[test]
    fn guard_signals_on_drop() {
        let mutex = FlagMutex::default();
        {
            let _guard = mutex.lock(0).unwrap();
            assert!(mutex.0.load(Ordering::SeqCst));
        }
        assert!(!mutex.0.load(Ordering::SeqCst));
    }

    #[test]
    fn failed_lock_does_not_release() {
        let mutex = FlagMutex::default();
        assert!(mutex.wait(0));

        assert!(mutex.lock(0).is_none());
        assert!(
            mutex.0.load(Ordering::SeqCst),
            "a timed out lock must not signal a mutex held elsewhere"
        );
    }
}

#[doc(hidden)]
#[cfg(feature = "test-suites")]
#[cfg_attr(coverage_nightly, coverage(off))]
pub mod test_suite {
    #![expect(missing_docs, reason = "tests")]
    //! Test suite for mutexes and binary semaphores.

    use std::sync::Barrier;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::{Duration, Instant};

    use crate::sync::{BinarySemaphore, Mutex};
    use crate::{NO_WAIT, OsInterface, WAIT_FOREVER};

    pub fn test_mutex_created_unlocked(os: &impl OsInterface) {
        let mutex = os.create_mutex().unwrap();

        assert!(mutex.wait(NO_WAIT), "a fresh mutex should be unlocked");
        assert!(
            !mutex.wait(NO_WAIT),
            "a held mutex should not be acquired twice"
        );

        mutex.signal();
        assert!(mutex.wait(NO_WAIT), "a released mutex should be acquirable");
    }

    pub fn test_mutex_exclusion(os: &impl OsInterface) {
        let mutex = os.create_mutex().unwrap();
        let ready = Barrier::new(3);
        let acquired = AtomicU32::new(0);

        std::thread::scope(|scope| {
            for _ in 0..2 {
                scope.spawn(|| {
                    ready.wait();
                    assert!(mutex.wait(WAIT_FOREVER));
                    acquired.fetch_add(1, Ordering::SeqCst);
                });
            }

            ready.wait();
            std::thread::sleep(Duration::from_millis(50));
            assert_eq!(
                acquired.load(Ordering::SeqCst),
                1,
                "exactly one of two racing waiters should acquire the mutex"
            );

            mutex.signal();
        });

        assert_eq!(acquired.load(Ordering::SeqCst), 2);
    }

    pub fn test_mutex_released_by_other_thread(os: &impl OsInterface) {
        let mutex = os.create_mutex().unwrap();
        assert!(mutex.wait(NO_WAIT));

        std::thread::scope(|scope| {
            scope.spawn(|| mutex.signal());
        });

        assert!(
            mutex.wait(NO_WAIT),
            "any thread should be able to release the mutex"
        );
    }

    pub fn test_mutex_wait_timeout(os: &impl OsInterface) {
        let mutex = os.create_mutex().unwrap();
        assert!(mutex.wait(NO_WAIT));

        let start = Instant::now();
        assert!(!mutex.wait(30));
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    pub fn test_mutex_guard_releases(os: &impl OsInterface) {
        let mutex = os.create_mutex().unwrap();
        let counter = AtomicU32::new(0);

        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..100 {
                        let _guard = mutex.lock(WAIT_FOREVER).unwrap();
                        // Split load and store so that a missing exclusion loses increments.
                        let value = counter.load(Ordering::Relaxed);
                        std::thread::yield_now();
                        counter.store(value + 1, Ordering::Relaxed);
                    }
                });
            }
        });

        assert_eq!(counter.load(Ordering::Relaxed), 400);
        assert!(mutex.lock(NO_WAIT).is_some());
    }

    pub fn test_semaphore_created_unsignaled(os: &impl OsInterface) {
        let semaphore = os.create_binary_semaphore().unwrap();
        assert!(!semaphore.wait(NO_WAIT));
    }

    pub fn test_semaphore_is_binary(os: &impl OsInterface) {
        let semaphore = os.create_binary_semaphore().unwrap();

        semaphore.signal();
        semaphore.signal();

        assert!(semaphore.wait(NO_WAIT));
        assert!(
            !semaphore.wait(NO_WAIT),
            "signals should not accumulate beyond one"
        );
    }

    pub fn test_semaphore_wakes_waiter(os: &impl OsInterface) {
        let semaphore = os.create_binary_semaphore().unwrap();

        std::thread::scope(|scope| {
            let waiter = scope.spawn(|| semaphore.wait(1_000));

            std::thread::sleep(Duration::from_millis(20));
            semaphore.signal();

            assert!(waiter.join().unwrap());
        });
    }

    pub fn test_semaphore_wait_timeout(os: &impl OsInterface) {
        let semaphore = os.create_binary_semaphore().unwrap();

        let start = Instant::now();
        assert!(!semaphore.wait(30));
        assert!(start.elapsed() >= Duration::from_millis(30));
    }
}
