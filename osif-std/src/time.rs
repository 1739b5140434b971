//! Millisecond clock and blocking helpers.

use std::sync::{Condvar, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use osif_api::{NO_WAIT, WAIT_FOREVER};

/// Wrapping millisecond clock counting from its creation.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Clock {
    epoch: Instant,
}

impl Clock {
    pub(crate) fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }

    pub(crate) fn millis(&self) -> u32 {
        // Truncation is the wrap-around of the 32-bit clock.
        self.epoch.elapsed().as_millis() as u32
    }
}

/// Blocks the calling thread for `ms` milliseconds.
pub(crate) fn sleep(ms: u32) {
    std::thread::sleep(Duration::from_millis(ms.into()));
}

/// Blocks on `condvar` while `blocked` holds, for at most `timeout_ms` milliseconds.
///
/// Returns the reacquired guard and `true` if `blocked` turned false in time.
pub(crate) fn wait_while<'a, T>(
    condvar: &Condvar,
    mut guard: MutexGuard<'a, T>,
    timeout_ms: u32,
    mut blocked: impl FnMut(&mut T) -> bool,
) -> (MutexGuard<'a, T>, bool) {
    match timeout_ms {
        NO_WAIT => {
            let ready = !blocked(&mut guard);
            (guard, ready)
        }
        WAIT_FOREVER => {
            let guard = condvar
                .wait_while(guard, blocked)
                .unwrap_or_else(PoisonError::into_inner);
            (guard, true)
        }
        timeout_ms => {
            let (guard, result) = condvar
                .wait_timeout_while(guard, Duration::from_millis(timeout_ms.into()), blocked)
                .unwrap_or_else(PoisonError::into_inner);
            (guard, !result.timed_out())
        }
    }
}
