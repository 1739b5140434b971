//! Inter-thread message queues.
//!
//! [`UntypedQueue`] is the contract every backend implements: a FIFO of fixed-size opaque byte messages with blocking
//! and interrupt-safe variants. [`Queue`] layers compile-time type safety on top of it without duplicating any queue
//! logic. [`RingBuffer`] holds the slot bookkeeping backends share.
//!
//! # Ordering
//!
//! [`UntypedQueue::receive`] observes messages in the order they were passed to [`UntypedQueue::send_to_back`].
//! [`UntypedQueue::send_to_front`] places a message ahead of everything currently queued, making it LIFO relative to
//! the head.

mod ring;
mod typed;

pub use self::ring::RingBuffer;
pub use self::typed::{PlainData, Queue};

/// Fixed-capacity, fixed-message-size, thread-safe FIFO of opaque byte messages.
///
/// Every message buffer passed to a queue must be exactly [`message_size`](Self::message_size) bytes long;
/// implementations panic otherwise.
///
/// A `false` return from a blocking method means the timeout elapsed; it does not distinguish timeouts from other
/// failures. The queue is left unchanged in that case. The `*_from_isr` methods never block, allocate or suspend the
/// caller and return `false` whenever the operation cannot complete immediately.
pub trait UntypedQueue: Send + Sync {
    /// Returns the number of messages currently in the queue.
    fn length(&self) -> u32;

    /// Returns the number of slots in the queue.
    fn size(&self) -> u32;

    /// Returns the size of every message in bytes.
    fn message_size(&self) -> u32;

    /// Returns the number of empty slots in the queue.
    fn available(&self) -> u32 {
        self.size() - self.length()
    }

    /// Returns `true` if the queue holds no message.
    fn is_empty(&self) -> bool {
        self.length() == 0
    }

    /// Returns `true` if every slot is occupied.
    fn is_full(&self) -> bool {
        self.length() == self.size()
    }

    /// Drops every queued message.
    ///
    /// Must not race with a send or receive in flight on another thread; the outcome of such a race is unspecified.
    fn reset(&self);

    /// Moves the oldest message into `message`, blocking for at most `timeout_ms` milliseconds while the queue is
    /// empty.
    ///
    /// Returns `false` if the timeout elapsed.
    fn receive(&self, message: &mut [u8], timeout_ms: u32) -> bool;

    /// Moves the oldest message into `message` if there is one, without blocking.
    fn receive_from_isr(&self, message: &mut [u8]) -> bool;

    /// Copies `message` behind the newest message, blocking for at most `timeout_ms` milliseconds while the queue is
    /// full.
    ///
    /// Returns `false` if the timeout elapsed.
    fn send_to_back(&self, message: &[u8], timeout_ms: u32) -> bool;

    /// Copies `message` behind the newest message if there is room, without blocking.
    fn send_to_back_from_isr(&self, message: &[u8]) -> bool;

    /// Copies `message` ahead of the oldest message, blocking for at most `timeout_ms` milliseconds while the queue
    /// is full.
    ///
    /// Returns `false` if the timeout elapsed.
    fn send_to_front(&self, message: &[u8], timeout_ms: u32) -> bool;

    /// Copies `message` ahead of the oldest message if there is room, without blocking.
    fn send_to_front_from_isr(&self, message: &[u8]) -> bool;
}

#[doc(hidden)]
#[cfg(feature = "test-suites")]
#[cfg_attr(coverage_nightly, coverage(off))]
pub mod test_suite {
    #![expect(missing_docs, reason = "tests")]
    //! Test suite for untyped and typed queues.

    use std::time::{Duration, Instant};
    use std::vec::Vec;

    use crate::queue::{PlainData, UntypedQueue};
    use crate::{Error, NO_WAIT, OsInterface, WAIT_FOREVER};

    fn receive_u32(queue: &impl UntypedQueue, timeout_ms: u32) -> Option<u32> {
        let mut message = [0; 4];
        queue
            .receive(&mut message, timeout_ms)
            .then(|| u32::from_le_bytes(message))
    }

    fn assert_accounting(queue: &impl UntypedQueue) {
        assert_eq!(queue.length() + queue.available(), queue.size());
        assert_eq!(queue.is_empty(), queue.length() == 0);
        assert_eq!(queue.is_full(), queue.available() == 0);
    }

    pub fn test_create_rejects_zero_capacity(os: &impl OsInterface) {
        let error = os.create_untyped_queue(0, 4).err();
        assert_eq!(error, Some(Error::InvalidArgument));
    }

    pub fn test_fill_and_reset(os: &impl OsInterface) {
        let queue = os.create_untyped_queue(4, 4).unwrap();
        assert_eq!(queue.size(), 4);
        assert_eq!(queue.message_size(), 4);
        assert!(queue.is_empty());

        for value in [10u32, 20, 30, 40] {
            assert!(queue.send_to_back(&value.to_le_bytes(), NO_WAIT));
            assert_accounting(&queue);
        }
        assert!(queue.is_full());

        let start = Instant::now();
        assert!(!queue.send_to_back(&50u32.to_le_bytes(), NO_WAIT));
        assert!(
            start.elapsed() < Duration::from_millis(20),
            "sending to a full queue without timeout should return immediately"
        );

        assert_eq!(receive_u32(&queue, NO_WAIT), Some(10));
        assert_accounting(&queue);

        queue.reset();
        assert!(queue.is_empty());
        assert_eq!(queue.available(), 4);
    }

    pub fn test_fifo_order(os: &impl OsInterface) {
        let queue = os.create_untyped_queue(8, 4).unwrap();
        for value in 0u32..8 {
            assert!(queue.send_to_back(&value.to_le_bytes(), NO_WAIT));
        }
        let received: Vec<_> = core::iter::from_fn(|| receive_u32(&queue, NO_WAIT)).collect();
        assert_eq!(received, (0..8).collect::<Vec<_>>());
    }

    pub fn test_send_to_front_priority(os: &impl OsInterface) {
        let queue = os.create_untyped_queue(4, 1).unwrap();
        assert!(queue.send_to_back(b"a", NO_WAIT));
        assert!(queue.send_to_back(b"b", NO_WAIT));
        assert!(queue.send_to_front(b"c", NO_WAIT));

        let mut received = Vec::new();
        let mut message = [0; 1];
        while queue.receive(&mut message, NO_WAIT) {
            received.push(message[0]);
        }
        assert_eq!(received, b"cab");
    }

    pub fn test_receive_timeout(os: &impl OsInterface) {
        let queue = os.create_untyped_queue(2, 4).unwrap();

        let start = Instant::now();
        let mut message = [0xAA; 4];
        assert!(!queue.receive(&mut message, 50));
        assert!(start.elapsed() >= Duration::from_millis(50));

        assert!(queue.is_empty());
        assert_eq!(
            message,
            [0xAA; 4],
            "a timed out receive should not touch the buffer"
        );
    }

    pub fn test_send_timeout(os: &impl OsInterface) {
        let queue = os.create_untyped_queue(1, 4).unwrap();
        assert!(queue.send_to_back(&1u32.to_le_bytes(), NO_WAIT));

        let start = Instant::now();
        assert!(!queue.send_to_back(&2u32.to_le_bytes(), 30));
        assert!(!queue.send_to_front(&3u32.to_le_bytes(), 30));
        assert!(start.elapsed() >= Duration::from_millis(60));

        assert_eq!(queue.length(), 1);
        assert_eq!(receive_u32(&queue, NO_WAIT), Some(1));
    }

    pub fn test_blocked_receiver_wakes(os: &impl OsInterface) {
        let queue = os.create_untyped_queue(2, 4).unwrap();

        std::thread::scope(|scope| {
            let receiver = scope.spawn(|| receive_u32(&queue, WAIT_FOREVER));

            std::thread::sleep(Duration::from_millis(20));
            assert!(queue.send_to_back(&7u32.to_le_bytes(), NO_WAIT));

            assert_eq!(receiver.join().unwrap(), Some(7));
        });
    }

    pub fn test_blocked_sender_wakes(os: &impl OsInterface) {
        let queue = os.create_untyped_queue(1, 4).unwrap();
        assert!(queue.send_to_back(&1u32.to_le_bytes(), NO_WAIT));

        std::thread::scope(|scope| {
            let sender = scope.spawn(|| queue.send_to_back(&2u32.to_le_bytes(), 1_000));

            std::thread::sleep(Duration::from_millis(20));
            assert_eq!(receive_u32(&queue, NO_WAIT), Some(1));

            assert!(sender.join().unwrap());
        });

        assert_eq!(receive_u32(&queue, NO_WAIT), Some(2));
    }

    pub fn test_isr_variants_never_block(os: &impl OsInterface) {
        let queue = os.create_untyped_queue(2, 4).unwrap();
        let mut message = [0; 4];

        assert!(!queue.receive_from_isr(&mut message));
        assert!(queue.send_to_back_from_isr(&1u32.to_le_bytes()));
        assert!(queue.send_to_front_from_isr(&2u32.to_le_bytes()));

        let start = Instant::now();
        assert!(!queue.send_to_back_from_isr(&3u32.to_le_bytes()));
        assert!(!queue.send_to_front_from_isr(&3u32.to_le_bytes()));
        assert!(start.elapsed() < Duration::from_millis(20));

        assert!(queue.receive_from_isr(&mut message));
        assert_eq!(u32::from_le_bytes(message), 2);
        assert!(queue.receive_from_isr(&mut message));
        assert_eq!(u32::from_le_bytes(message), 1);
    }

    pub fn test_concurrent_producers(os: &impl OsInterface) {
        const PRODUCERS: u32 = 4;
        const PER_PRODUCER: u32 = 250;

        let queue = os.create_untyped_queue(16, 4).unwrap();
        let mut received = Vec::new();

        std::thread::scope(|scope| {
            for producer in 0..PRODUCERS {
                let queue = &queue;
                scope.spawn(move || {
                    for index in 0..PER_PRODUCER {
                        let value = producer * PER_PRODUCER + index;
                        assert!(queue.send_to_back(&value.to_le_bytes(), WAIT_FOREVER));
                    }
                });
            }

            for _ in 0..PRODUCERS * PER_PRODUCER {
                received.push(receive_u32(&queue, 5_000).unwrap());
            }
        });

        // Each producer's messages must arrive in the order it sent them.
        for producer in 0..PRODUCERS {
            let range = producer * PER_PRODUCER..(producer + 1) * PER_PRODUCER;
            let own: Vec<_> = received
                .iter()
                .copied()
                .filter(|value| range.contains(value))
                .collect();
            assert_eq!(own, range.collect::<Vec<_>>());
        }
        assert!(queue.is_empty());
    }

    #[derive(Debug, Clone, Copy, PartialEq)]
    #[repr(C)]
    pub struct Sample {
        pub id: u32,
        pub payload: [u8; 4],
        pub scale: f64,
    }

    // SAFETY: 4 + 4 + 8 bytes without padding, every field accepts any bit pattern.
    #[allow(unsafe_code, reason = "plain data marker")]
    unsafe impl PlainData for Sample {}

    pub fn test_typed_round_trip(os: &impl OsInterface) {
        let queue = os.create_queue::<Sample>(2).unwrap();
        assert_eq!(queue.size(), 2);

        let first = Sample {
            id: 1,
            payload: *b"osif",
            scale: 0.25,
        };
        let second = Sample {
            id: 2,
            payload: [0xFF; 4],
            scale: -1.0,
        };

        assert!(queue.send_to_back(&first, NO_WAIT));
        assert!(queue.send_to_front(&second, NO_WAIT));
        assert!(queue.is_full());
        assert!(!queue.send_to_back_from_isr(&first));

        assert_eq!(queue.receive(NO_WAIT), Some(second));
        assert_eq!(queue.receive_from_isr(), Some(first));
        assert_eq!(queue.receive(10), None);
    }

    pub fn test_typed_across_threads(os: &impl OsInterface) {
        let queue = os.create_queue::<u64>(4).unwrap();

        std::thread::scope(|scope| {
            scope.spawn(|| {
                for value in 0..100u64 {
                    assert!(queue.send_to_back(&(value << 32), WAIT_FOREVER));
                }
            });

            for value in 0..100u64 {
                assert_eq!(queue.receive(5_000), Some(value << 32));
            }
        });
    }
}
