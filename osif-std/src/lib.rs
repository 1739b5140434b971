//! `std` implementation of the portable operating system interface.
//!
//! Mutexes, semaphores and queues block on condition variables, processes are detached `std` threads and timers
//! run on a small [`tokio`] runtime owned by the interface.
//!
//! ```rust
//! use osif_api::timer::{Timer, TimerMode};
//! use osif_api::{NO_WAIT, OsInterface};
//! use osif_std::StdOsInterface;
//!
//! # fn main() -> osif_api::Result<()> {
//! let os = StdOsInterface::new()?;
//! let queue = os.create_queue::<u32>(4)?;
//! assert!(queue.send_to_back(&7, NO_WAIT));
//!
//! let timer = os.create_timer(10, TimerMode::OneShot, Some("tick"), || {})?;
//! timer.start()?;
//! assert_eq!(queue.receive(NO_WAIT), Some(7));
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

use std::sync::Arc;

use osif_api::OsInterface;
use osif_api::timer::TimerMode;

mod config;
pub mod log;
mod memory;
pub mod queue;
pub mod sync;
mod thread;
mod time;
pub mod timer;

pub use config::Config;
pub use memory::Allocation;
pub use osif_api::{Error, NO_WAIT, Result, WAIT_FOREVER};

use crate::queue::StdUntypedQueue;
use crate::sync::{StdBinarySemaphore, StdMutex};
use crate::time::Clock;
use crate::timer::{StdTimer, TimerService};

/// Implements [`OsInterface`] for standard Rust.
///
/// Cloning is cheap and every clone shares the clock and the timer service. The timer service shuts down once the
/// interface and every timer created through it are dropped.
#[derive(Debug, Clone)]
pub struct StdOsInterface {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    config: Config,
    clock: Clock,
    timers: Arc<TimerService>,
}

impl StdOsInterface {
    /// Creates an interface with the default [`Config`].
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    /// Returns a builder to configure the interface.
    pub fn builder() -> Builder {
        Builder::default()
    }

    /// Returns the configuration the interface was built with.
    pub fn config(&self) -> &Config {
        &self.inner.config
    }
}

/// Configures a [`StdOsInterface`].
#[derive(Debug, Default)]
#[must_use]
pub struct Builder {
    config: Config,
}

impl Builder {
    /// Replaces the whole configuration.
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Sets the prefix of process thread names.
    pub fn thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.thread_name_prefix = prefix.into();
        self
    }

    /// Sets the stack size of process threads.
    pub fn thread_stack_size(mut self, bytes: usize) -> Self {
        self.config.thread_stack_size = Some(bytes);
        self
    }

    /// Sets the number of threads executing timer callbacks.
    pub fn timer_worker_threads(mut self, threads: usize) -> Self {
        self.config.timer_worker_threads = threads;
        self
    }

    /// Starts the timer service and returns the interface.
    ///
    /// Fails if the timer service threads cannot be started.
    pub fn build(self) -> Result<StdOsInterface> {
        let timers = Arc::new(TimerService::new(&self.config)?);
        Ok(StdOsInterface {
            inner: Arc::new(Inner {
                config: self.config,
                clock: Clock::new(),
                timers,
            }),
        })
    }
}

impl OsInterface for StdOsInterface {
    type Mutex = StdMutex;
    type BinarySemaphore = StdBinarySemaphore;
    type Timer = StdTimer;
    type UntypedQueue = StdUntypedQueue;
    type Allocation = Allocation;

    fn sleep(&self, ms: u32) {
        time::sleep(ms);
    }

    fn millis(&self) -> u32 {
        self.inner.clock.millis()
    }

    fn create_mutex(&self) -> Result<Self::Mutex> {
        Ok(StdMutex::new())
    }

    fn create_binary_semaphore(&self) -> Result<Self::BinarySemaphore> {
        Ok(StdBinarySemaphore::new())
    }

    fn create_timer<F>(
        &self,
        period_ms: u32,
        mode: TimerMode,
        name: Option<&str>,
        callback: F,
    ) -> Result<Self::Timer>
    where
        F: FnMut() + Send + 'static,
    {
        StdTimer::new(
            &self.inner.timers,
            self.inner.clock,
            period_ms,
            mode,
            name,
            callback,
        )
    }

    fn create_untyped_queue(
        &self,
        max_messages: u32,
        message_size: u32,
    ) -> Result<Self::UntypedQueue> {
        StdUntypedQueue::new(max_messages, message_size)
    }

    fn malloc(&self, size: u32) -> Option<Self::Allocation> {
        memory::malloc(size)
    }

    fn run_process<F>(&self, name: Option<&str>, process: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        thread::run_process(&self.inner.config, name, process)
    }
}

/// Helper trait to convert errors into osal errors.
///
/// We cannot implement `From` as that would be part of the public API.
pub(crate) trait IntoOsalError<E>
where
    E: core::error::Error,
{
    /// Converts the error into an OSAL error.
    fn into_osal_error(self) -> E;
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use osif_api::OsInterface;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn builder_applies_settings() {
        let os = StdOsInterface::builder()
            .thread_name_prefix("app")
            .thread_stack_size(128 * 1024)
            .timer_worker_threads(2)
            .build()
            .unwrap();

        assert_eq!(
            os.config(),
            &Config {
                thread_name_prefix: "app".to_owned(),
                thread_stack_size: Some(128 * 1024),
                timer_worker_threads: 2,
                timer_thread_name: "osif-timer".to_owned(),
            }
        );
    }

    #[test]
    fn clones_share_the_clock() {
        let os = StdOsInterface::new().unwrap();
        let clone = os.clone();
        os.sleep(5);

        let earlier = clone.millis();
        let later = os.millis();
        assert!(earlier >= 5);
        assert!(later.wrapping_sub(earlier) < 1 << 31);
    }

    #[test]
    fn interface_drops_before_timers() {
        let os = StdOsInterface::new().unwrap();
        let timer = os
            .create_timer(1_000, TimerMode::OneShot, None, || {})
            .unwrap();
        drop(os);
        assert!(osif_api::timer::Timer::start(&timer).is_ok());
    }
}
