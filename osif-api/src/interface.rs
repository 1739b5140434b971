//! The capability factory.

use core::ops::DerefMut;

use crate::Result;
use crate::queue::{PlainData, Queue, UntypedQueue};
use crate::sync::{BinarySemaphore, Mutex};
use crate::timer::{Timer, TimerMode};

/// A concrete execution environment: creates every primitive and runs processes.
///
/// Application code receives one implementation and obtains all primitives exclusively through it. Every created
/// primitive is an owning handle; dropping it releases the underlying resource.
///
/// Creation failures are reported as [`Err`], so a handle that exists is always fully constructed.
pub trait OsInterface: Send + Sync {
    /// Binary mutex handed out by [`create_mutex`](Self::create_mutex).
    type Mutex: Mutex + 'static;

    /// Binary semaphore handed out by [`create_binary_semaphore`](Self::create_binary_semaphore).
    type BinarySemaphore: BinarySemaphore + 'static;

    /// Timer handed out by [`create_timer`](Self::create_timer).
    type Timer: Timer + 'static;

    /// Byte queue handed out by [`create_untyped_queue`](Self::create_untyped_queue).
    type UntypedQueue: UntypedQueue + 'static;

    /// Owned memory block handed out by [`malloc`](Self::malloc).
    type Allocation: DerefMut<Target = [u8]> + Send + 'static;

    /// Blocks the calling thread for at least `ms` milliseconds.
    fn sleep(&self, ms: u32);

    /// Returns the milliseconds elapsed since an arbitrary, fixed epoch.
    ///
    /// The reading wraps around at [`u32::MAX`]; compare readings with [`deadline_reached`](crate::deadline_reached)
    /// or `wrapping_sub`.
    fn millis(&self) -> u32;

    /// Creates an unlocked mutex.
    fn create_mutex(&self) -> Result<Self::Mutex>;

    /// Creates an unsignaled binary semaphore.
    fn create_binary_semaphore(&self) -> Result<Self::BinarySemaphore>;

    /// Creates a stopped timer that invokes `callback` on every expiry once started.
    ///
    /// A zero `period_ms` is rejected with [`Error::InvalidArgument`](crate::Error::InvalidArgument). `name` is only
    /// used for diagnostics.
    fn create_timer<F>(
        &self,
        period_ms: u32,
        mode: TimerMode,
        name: Option<&str>,
        callback: F,
    ) -> Result<Self::Timer>
    where
        F: FnMut() + Send + 'static;

    /// Creates an empty queue of `max_messages` slots of `message_size` bytes each.
    ///
    /// A zero `max_messages` is rejected with [`Error::InvalidArgument`](crate::Error::InvalidArgument).
    fn create_untyped_queue(
        &self,
        max_messages: u32,
        message_size: u32,
    ) -> Result<Self::UntypedQueue>;

    /// Creates an empty queue of `max_messages` values of `T`.
    fn create_queue<T>(&self, max_messages: u32) -> Result<Queue<T, Self::UntypedQueue>>
    where
        Self: Sized,
        T: PlainData,
    {
        Queue::new(self, max_messages)
    }

    /// Allocates `size` bytes.
    ///
    /// Returns `None` for `size == 0` or if the memory is exhausted.
    fn malloc(&self, size: u32) -> Option<Self::Allocation>;

    /// Releases an allocation. Passing `None` does nothing.
    fn free(&self, allocation: Option<Self::Allocation>) {
        drop(allocation);
    }

    /// Starts `process` concurrently with the caller.
    ///
    /// The process is detached: it can neither be joined nor cancelled. An error means the backend could not start
    /// it; `process` is dropped without running in that case.
    fn run_process<F>(&self, name: Option<&str>, process: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static;
}

#[doc(hidden)]
#[cfg(feature = "test-suites")]
#[cfg_attr(coverage_nightly, coverage(off))]
pub mod test_suite {
    #![expect(missing_docs, reason = "tests")]
    //! Test suite for clock, allocation and process facilities.

    use std::borrow::ToOwned;
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, Instant};

    use crate::sync::BinarySemaphore;
    use crate::{OsInterface, WAIT_FOREVER};

    pub fn test_malloc_zero_is_none(os: &impl OsInterface) {
        assert!(os.malloc(0).is_none());
    }

    pub fn test_free_none_is_noop(os: &impl OsInterface) {
        os.free(None);
    }

    pub fn test_allocation_is_writable(os: &impl OsInterface) {
        let mut allocation = os.malloc(64).unwrap();
        assert_eq!(allocation.len(), 64);

        allocation.fill(0x5A);
        assert!(allocation.iter().all(|byte| *byte == 0x5A));

        os.free(Some(allocation));
    }

    pub fn test_malloc_free_cycles(os: &impl OsInterface) {
        for index in 0u32..10_000 {
            let size = index * 37 % 1024 + 1;
            let mut allocation = os.malloc(size).unwrap();
            assert_eq!(allocation.len(), size as usize);

            let last = allocation.len() - 1;
            allocation[last] = !(index as u8);
            allocation[0] = index as u8;
            assert_eq!(allocation[0], index as u8);
            if last > 0 {
                assert_eq!(allocation[last], !(index as u8));
            }

            os.free(Some(allocation));
        }
    }

    pub fn test_run_process(os: &impl OsInterface) {
        let done = Arc::new(os.create_binary_semaphore().unwrap());

        let signal = Arc::clone(&done);
        os.run_process(None, move || signal.signal()).unwrap();

        assert!(done.wait(5_000), "the process should run to completion");
    }

    pub fn test_run_named_process(os: &impl OsInterface) {
        let done = Arc::new(os.create_binary_semaphore().unwrap());
        let observed = Arc::new(Mutex::new(None));

        let signal = Arc::clone(&done);
        let name = Arc::clone(&observed);
        os.run_process(Some("worker"), move || {
            *name.lock().unwrap() = std::thread::current().name().map(str::to_owned);
            signal.signal();
        })
        .unwrap();

        assert!(done.wait(WAIT_FOREVER));
        let observed = observed.lock().unwrap().clone().unwrap_or_default();
        assert!(
            observed.contains("worker"),
            "expected the process name to carry `worker`, got {observed:?}"
        );
    }

    pub fn test_processes_run_concurrently(os: &impl OsInterface) {
        let started = Arc::new(os.create_binary_semaphore().unwrap());
        let answered = Arc::new(os.create_binary_semaphore().unwrap());
        let done = Arc::new(os.create_binary_semaphore().unwrap());

        // The first process only finishes after the second one answered, which stalls if they run one after another.
        let (signal, wait) = (Arc::clone(&started), Arc::clone(&answered));
        let finish = Arc::clone(&done);
        os.run_process(None, move || {
            signal.signal();
            if wait.wait(2_000) {
                finish.signal();
            }
        })
        .unwrap();
        let (wait, signal) = (Arc::clone(&started), Arc::clone(&answered));
        os.run_process(None, move || {
            if wait.wait(2_000) {
                signal.signal();
            }
        })
        .unwrap();

        assert!(
            done.wait(1_000),
            "both processes should run at the same time"
        );
    }

    pub fn test_sleep_and_millis(os: &impl OsInterface) {
        let before = os.millis();
        let start = Instant::now();
        os.sleep(30);
        let elapsed = os.millis().wrapping_sub(before);

        assert!(start.elapsed() >= Duration::from_millis(30));
        assert!(
            (29..1_000).contains(&elapsed),
            "the millisecond clock advanced by {elapsed}ms during a 30ms sleep"
        );
    }

    pub fn test_millis_monotonic(os: &impl OsInterface) {
        let mut previous = os.millis();
        for _ in 0..1_000 {
            let now = os.millis();
            assert!(now.wrapping_sub(previous) < 1 << 31);
            previous = now;
        }
    }
}
