//! Blocking byte queue over a locked [`RingBuffer`].

use std::sync::{Condvar, Mutex};

use osif_api::Result;
use osif_api::queue::RingBuffer;
pub use osif_api::queue::UntypedQueue;

use crate::sync::{lock, try_lock};
use crate::time::wait_while;

/// [`UntypedQueue`] for `std`.
///
/// Blocked senders wait on `not_full`, blocked receivers on `not_empty`. The `*_from_isr` methods only ever
/// `try_lock` the buffer, so they also return `false` if another thread holds the lock at that moment.
#[derive(Debug)]
pub struct StdUntypedQueue {
    buffer: Mutex<RingBuffer>,
    not_empty: Condvar,
    not_full: Condvar,
    size: u32,
    message_size: u32,
}

impl StdUntypedQueue {
    pub(crate) fn new(max_messages: u32, message_size: u32) -> Result<Self> {
        let buffer = RingBuffer::new(max_messages, message_size)?;
        Ok(Self {
            buffer: Mutex::new(buffer),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            size: max_messages,
            message_size,
        })
    }

    fn check_length(&self, length: usize) {
        assert!(
            u32::try_from(length).is_ok_and(|length| length == self.message_size),
            "queue messages must be exactly {} bytes",
            self.message_size
        );
    }

    fn send(&self, message: &[u8], timeout_ms: u32, to_front: bool) -> bool {
        self.check_length(message.len());
        let (mut buffer, ready) = wait_while(
            &self.not_full,
            lock(&self.buffer),
            timeout_ms,
            |buffer| buffer.is_full(),
        );
        if !ready {
            tracing::trace!(timeout_ms, "queue send timed out");
            return false;
        }
        let sent = if to_front {
            buffer.push_front(message)
        } else {
            buffer.push_back(message)
        };
        drop(buffer);
        self.not_empty.notify_one();
        sent
    }

    fn send_from_isr(&self, message: &[u8], to_front: bool) -> bool {
        self.check_length(message.len());
        let Some(mut buffer) = try_lock(&self.buffer) else {
            return false;
        };
        let sent = if to_front {
            buffer.push_front(message)
        } else {
            buffer.push_back(message)
        };
        drop(buffer);
        if sent {
            self.not_empty.notify_one();
        }
        sent
    }
}

impl UntypedQueue for StdUntypedQueue {
    fn length(&self) -> u32 {
        // Never exceeds `size`, which is a `u32`.
        lock(&self.buffer).len() as u32
    }

    fn size(&self) -> u32 {
        self.size
    }

    fn message_size(&self) -> u32 {
        self.message_size
    }

    fn reset(&self) {
        lock(&self.buffer).reset();
        self.not_full.notify_all();
    }

    fn receive(&self, message: &mut [u8], timeout_ms: u32) -> bool {
        self.check_length(message.len());
        let (mut buffer, ready) = wait_while(
            &self.not_empty,
            lock(&self.buffer),
            timeout_ms,
            |buffer| buffer.is_empty(),
        );
        if !ready {
            tracing::trace!(timeout_ms, "queue receive timed out");
            return false;
        }
        let received = buffer.pop_front(message);
        drop(buffer);
        self.not_full.notify_one();
        received
    }

    fn receive_from_isr(&self, message: &mut [u8]) -> bool {
        self.check_length(message.len());
        let Some(mut buffer) = try_lock(&self.buffer) else {
            return false;
        };
        let received = buffer.pop_front(message);
        drop(buffer);
        if received {
            self.not_full.notify_one();
        }
        received
    }

    fn send_to_back(&self, message: &[u8], timeout_ms: u32) -> bool {
        self.send(message, timeout_ms, false)
    }

    fn send_to_back_from_isr(&self, message: &[u8]) -> bool {
        self.send_from_isr(message, false)
    }

    fn send_to_front(&self, message: &[u8], timeout_ms: u32) -> bool {
        self.send(message, timeout_ms, true)
    }

    fn send_to_front_from_isr(&self, message: &[u8]) -> bool {
        self.send_from_isr(message, true)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::time::{Duration, Instant};

    use osif_api::{Error, NO_WAIT, WAIT_FOREVER};

    use super::*;

    #[test]
    fn geometry_is_cached() {
        let queue = StdUntypedQueue::new(3, 12).unwrap();
        assert_eq!(queue.size(), 3);
        assert_eq!(queue.message_size(), 12);
        assert_eq!(queue.available(), 3);
    }

    #[test]
    fn zero_capacity_is_rejected() {
        assert_eq!(
            StdUntypedQueue::new(0, 4).unwrap_err(),
            Error::InvalidArgument
        );
    }

    #[test]
    #[should_panic(expected = "queue messages must be exactly 4 bytes")]
    fn wrong_length_panics_before_blocking() {
        let queue = StdUntypedQueue::new(1, 4).unwrap();
        queue.receive(&mut [0; 2], WAIT_FOREVER);
    }

    #[test]
    fn isr_send_fails_while_locked() {
        let queue = StdUntypedQueue::new(2, 1).unwrap();
        let guard = queue.buffer.lock().unwrap();
        assert!(!queue.send_to_back_from_isr(&[1]));
        assert!(!queue.receive_from_isr(&mut [0]));
        drop(guard);

        assert!(queue.send_to_back_from_isr(&[1]));
    }

    #[test]
    #[ntest_timeout::timeout(5_000)]
    fn reset_wakes_every_blocked_sender() {
        let queue = StdUntypedQueue::new(1, 1).unwrap();
        assert!(queue.send_to_back(&[0], NO_WAIT));

        std::thread::scope(|scope| {
            let senders: Vec<_> = (1..=2)
                .map(|value| {
                    let queue = &queue;
                    scope.spawn(move || queue.send_to_back(&[value], 2_000))
                })
                .collect();

            std::thread::sleep(Duration::from_millis(20));
            queue.reset();
            std::thread::sleep(Duration::from_millis(20));

            // One sender fits after the reset, the other is woken by the receive below.
            let start = Instant::now();
            assert!(queue.receive(&mut [0], 1_000));
            for sender in senders {
                assert!(sender.join().unwrap());
            }
            assert!(start.elapsed() < Duration::from_millis(1_000));
        });
        assert_eq!(queue.length(), 1);
    }
}
