//! The portable operating system interface API.
//!
//! Application code is written against [`OsInterface`], the capability factory, and the primitive traits it hands
//! out: [`sync::Mutex`], [`sync::BinarySemaphore`], [`queue::UntypedQueue`] and [`timer::Timer`].
//! The concrete execution environment (RTOS, threads, mock) is picked once when composing the application, by
//! choosing which implementation of [`OsInterface`] to pass around.
//!
//! Besides the contracts, this crate holds the mechanics every backend shares: the fixed-slot circular buffer behind
//! every queue ([`queue::RingBuffer`]), the typed adapter over untyped queues ([`queue::Queue`]) and the timer state
//! machine ([`timer::TimerState`]).
//!
//! # Example
//!
//! ```rust
//! use osif_api::{OsInterface, WAIT_FOREVER};
//! use osif_api::queue::Queue;
//!
//! fn producer<O>(os: &O, queue: &Queue<u32, O::UntypedQueue>)
//! where
//!     O: OsInterface,
//! {
//!     for reading in 0..4 {
//!         if !queue.send_to_back(&reading, WAIT_FOREVER) {
//!             return;
//!         }
//!         os.sleep(10);
//!     }
//! }
//! ```

#![no_std]
#![deny(unsafe_code)]
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

extern crate alloc;

#[cfg(any(test, feature = "test-suites"))]
extern crate std;

mod error;
pub mod interface;
pub mod log;
pub mod queue;
pub mod sync;
pub mod timer;

pub use error::{Error, Result};
pub use interface::OsInterface;

/// Timeout value that makes a blocking operation try exactly once and return immediately.
pub const NO_WAIT: u32 = 0;

/// Timeout value that makes a blocking operation wait until it can complete.
pub const WAIT_FOREVER: u32 = u32::MAX;

/// Returns `true` if the wrapping millisecond clock reading `now` is at or past `deadline`.
///
/// Millisecond readings wrap after roughly 49.7 days, so deadlines are compared on the wrapping difference: anything
/// up to half the clock range behind `now` counts as reached.
pub const fn deadline_reached(now: u32, deadline: u32) -> bool {
    now.wrapping_sub(deadline) < (1 << 31)
}
