use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;
use core::ops::Range;

use crate::{Error, Result};

/// Fixed-capacity, fixed-slot-size circular byte buffer.
///
/// This is the non-blocking core of every queue: backends wrap it in whatever lock and wait mechanism their
/// environment provides. Messages are opaque byte strings of exactly [`message_size`](Self::message_size) bytes.
///
/// Storage for `max_messages × message_size` bytes is reserved once at creation and never reallocated.
pub struct RingBuffer {
    storage: Box<[u8]>,
    message_size: usize,
    capacity: usize,
    /// Slot holding the oldest message.
    head: usize,
    len: usize,
}

impl RingBuffer {
    /// Creates an empty buffer with room for `max_messages` messages of `message_size` bytes.
    ///
    /// Zero-sized messages are allowed; the buffer then only counts messages. A zero `max_messages` is rejected with
    /// [`Error::InvalidArgument`], failing to reserve the storage with [`Error::OutOfMemory`].
    pub fn new(max_messages: u32, message_size: u32) -> Result<Self> {
        if max_messages == 0 {
            return Err(Error::InvalidArgument);
        }
        let capacity = usize::try_from(max_messages).map_err(|_| Error::InvalidArgument)?;
        let message_size = usize::try_from(message_size).map_err(|_| Error::InvalidArgument)?;
        let bytes = capacity
            .checked_mul(message_size)
            .filter(|bytes| isize::try_from(*bytes).is_ok())
            .ok_or(Error::InvalidArgument)?;

        let mut storage = Vec::new();
        storage
            .try_reserve_exact(bytes)
            .map_err(|_| Error::OutOfMemory)?;
        storage.resize(bytes, 0);

        Ok(Self {
            storage: storage.into_boxed_slice(),
            message_size,
            capacity,
            head: 0,
            len: 0,
        })
    }

    /// Returns the number of messages currently stored.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns the maximum number of messages.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of free slots.
    pub fn available(&self) -> usize {
        self.capacity - self.len
    }

    /// Returns the size of every message in bytes.
    pub fn message_size(&self) -> usize {
        self.message_size
    }

    /// Returns `true` if no message is stored.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns `true` if every slot is occupied.
    pub fn is_full(&self) -> bool {
        self.len == self.capacity
    }

    /// Drops every stored message.
    pub fn reset(&mut self) {
        self.head = 0;
        self.len = 0;
    }

    /// Appends `message` behind the newest message.
    ///
    /// Returns `false` without modifying the buffer if it is full.
    ///
    /// # Panics
    ///
    /// Panics if `message` is not exactly [`message_size`](Self::message_size) bytes long.
    pub fn push_back(&mut self, message: &[u8]) -> bool {
        self.check_length(message.len());
        if self.is_full() {
            return false;
        }
        let tail = self.advance(self.head, self.len);
        let slot = self.slot(tail);
        self.storage[slot].copy_from_slice(message);
        self.len += 1;
        true
    }

    /// Inserts `message` ahead of the oldest message, so it is the next one popped.
    ///
    /// Returns `false` without modifying the buffer if it is full.
    ///
    /// # Panics
    ///
    /// Panics if `message` is not exactly [`message_size`](Self::message_size) bytes long.
    pub fn push_front(&mut self, message: &[u8]) -> bool {
        self.check_length(message.len());
        if self.is_full() {
            return false;
        }
        self.head = self.advance(self.head, self.capacity - 1);
        let slot = self.slot(self.head);
        self.storage[slot].copy_from_slice(message);
        self.len += 1;
        true
    }

    /// Moves the oldest message into `message`.
    ///
    /// Returns `false` and leaves `message` untouched if the buffer is empty.
    ///
    /// # Panics
    ///
    /// Panics if `message` is not exactly [`message_size`](Self::message_size) bytes long.
    pub fn pop_front(&mut self, message: &mut [u8]) -> bool {
        self.check_length(message.len());
        if self.is_empty() {
            return false;
        }
        let slot = self.slot(self.head);
        message.copy_from_slice(&self.storage[slot]);
        self.head = self.advance(self.head, 1);
        self.len -= 1;
        true
    }

    /// Moves a slot index `by` slots forward, wrapping at the end of the storage.
    fn advance(&self, index: usize, by: usize) -> usize {
        let to_end = self.capacity - index;
        if by < to_end { index + by } else { by - to_end }
    }

    fn slot(&self, index: usize) -> Range<usize> {
        let start = index * self.message_size;
        start..start + self.message_size
    }

    fn check_length(&self, length: usize) {
        assert_eq!(
            length, self.message_size,
            "queue messages must be exactly {} bytes",
            self.message_size
        );
    }
}

impl fmt::Debug for RingBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingBuffer")
            .field("message_size", &self.message_size)
            .field("capacity", &self.capacity)
            .field("len", &self.len)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::format;

    use test_case::test_case;

    use super::*;

    fn pop(buffer: &mut RingBuffer) -> Option<u32> {
        let mut message = [0; 4];
        buffer
            .pop_front(&mut message)
            .then(|| u32::from_le_bytes(message))
    }

    #[test_case(0, 4, Error::InvalidArgument; "zero capacity")]
    #[test_case(u32::MAX, u32::MAX, Error::InvalidArgument; "overflowing geometry")]
    fn new_rejects(max_messages: u32, message_size: u32, expected: Error) {
        assert_eq!(
            RingBuffer::new(max_messages, message_size).unwrap_err(),
            expected
        );
    }

    #[test]
    fn fill_drain_and_reset() {
        let mut buffer = RingBuffer::new(4, 4).unwrap();
        for value in 1u32..=4 {
            assert!(buffer.push_back(&value.to_le_bytes()));
        }
        assert!(buffer.is_full());
        assert!(!buffer.push_back(&5u32.to_le_bytes()));
        assert!(!buffer.push_front(&5u32.to_le_bytes()));

        assert_eq!(pop(&mut buffer), Some(1));
        assert_eq!(buffer.available(), 1);

        buffer.reset();
        assert!(buffer.is_empty());
        assert_eq!(pop(&mut buffer), None);
    }

    #[test]
    fn fifo_across_wrap() {
        let mut buffer = RingBuffer::new(3, 4).unwrap();
        let mut expected = 0;
        for value in 0u32..10 {
            assert!(buffer.push_back(&value.to_le_bytes()));
            if buffer.is_full() {
                assert_eq!(pop(&mut buffer), Some(expected));
                expected += 1;
            }
        }
        while let Some(value) = pop(&mut buffer) {
            assert_eq!(value, expected);
            expected += 1;
        }
        assert_eq!(expected, 10);
    }

    #[test]
    fn push_front_takes_priority() {
        let mut buffer = RingBuffer::new(3, 4).unwrap();
        assert!(buffer.push_back(&1u32.to_le_bytes()));
        assert!(buffer.push_back(&2u32.to_le_bytes()));
        assert!(buffer.push_front(&3u32.to_le_bytes()));

        assert_eq!(pop(&mut buffer), Some(3));
        assert_eq!(pop(&mut buffer), Some(1));
        assert_eq!(pop(&mut buffer), Some(2));
    }

    #[test]
    fn push_front_is_lifo_relative_to_head() {
        let mut buffer = RingBuffer::new(4, 4).unwrap();
        for value in [10u32, 11, 12] {
            assert!(buffer.push_front(&value.to_le_bytes()));
        }
        assert_eq!(pop(&mut buffer), Some(12));
        assert_eq!(pop(&mut buffer), Some(11));
        assert_eq!(pop(&mut buffer), Some(10));
    }

    #[test]
    fn length_invariant_holds() {
        let mut buffer = RingBuffer::new(5, 4).unwrap();
        for step in 0u32..40 {
            if step % 3 == 0 {
                pop(&mut buffer);
            } else if step % 2 == 0 {
                buffer.push_front(&step.to_le_bytes());
            } else {
                buffer.push_back(&step.to_le_bytes());
            }
            assert_eq!(buffer.len() + buffer.available(), buffer.capacity());
        }
    }

    #[test]
    fn zero_sized_messages_are_counted() {
        let mut buffer = RingBuffer::new(2, 0).unwrap();
        assert!(buffer.push_back(&[]));
        assert!(buffer.push_front(&[]));
        assert!(!buffer.push_back(&[]));
        assert!(buffer.pop_front(&mut []));
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    #[should_panic(expected = "queue messages must be exactly 4 bytes")]
    fn wrong_message_length_panics() {
        let mut buffer = RingBuffer::new(2, 4).unwrap();
        buffer.push_back(&[1, 2]);
    }

    #[test]
    fn debug_omits_contents() {
        let buffer = RingBuffer::new(2, 8).unwrap();
        assert_eq!(
            format!("{buffer:?}"),
            "RingBuffer { message_size: 8, capacity: 2, len: 0, .. }"
        );
    }
}
