#![allow(unsafe_code, reason = "byte views of plain data values")]

use core::marker::PhantomData;
use core::mem::{MaybeUninit, size_of};

use crate::queue::UntypedQueue;
use crate::{Error, OsInterface, Result};

/// Types that can travel through a queue as a plain byte copy.
///
/// # Safety
///
/// Every byte of a value of the implementing type must be initialized, so the type must not contain padding, and
/// every bit pattern must be a valid value, as received bytes come from whatever implements [`UntypedQueue`]. The
/// type must not own resources, as copies are made without running any code. `#[repr(C)]` structs built only from
/// `PlainData` fields in an order that leaves no gaps qualify.
pub unsafe trait PlainData: Copy + Send + 'static {}

macro_rules! impl_plain_data {
    ($($ty:ty),* $(,)?) => {
        $(
            // SAFETY: integers and floats have no padding, accept every bit pattern and own no resources.
            unsafe impl PlainData for $ty {}
        )*
    };
}

impl_plain_data!(
    (),
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    f32,
    f64,
);

// SAFETY: array elements are laid out back to back with a stride equal to their size, so an array of padding-free
// elements has no padding either, and its bit patterns are exactly those of its elements.
unsafe impl<T, const N: usize> PlainData for [T; N] where T: PlainData {}

/// A type-safe message queue over an [`UntypedQueue`].
///
/// The adapter fixes the message size to `size_of::<T>()` and moves whole values of `T` in and out by byte copy, so
/// callers never manage raw buffers. The untyped queue remains the single implementation of the queue mechanics;
/// every method forwards to it.
///
/// The queue owns its untyped queue exclusively and releases it when dropped. It is neither `Clone` nor `Copy`.
///
/// # Example
///
/// ```rust
/// use osif_api::{NO_WAIT, OsInterface};
///
/// fn drain<O>(os: &O) -> osif_api::Result<u32>
/// where
///     O: OsInterface,
/// {
///     let queue = os.create_queue::<u32>(8)?;
///     queue.send_to_back(&1, NO_WAIT);
///     queue.send_to_front(&2, NO_WAIT);
///
///     let mut sum = 0;
///     while let Some(value) = queue.receive(NO_WAIT) {
///         sum += value;
///     }
///     Ok(sum)
/// }
/// ```
#[derive(Debug)]
pub struct Queue<T, Q> {
    queue: Q,
    _message: PhantomData<T>,
}

impl<T, Q> Queue<T, Q>
where
    T: PlainData,
    Q: UntypedQueue,
{
    /// Creates a queue holding up to `max_messages` values through the capability factory `os`.
    ///
    /// Fails with the error of [`OsInterface::create_untyped_queue`]; no queue exists in that case.
    pub fn new<O>(os: &O, max_messages: u32) -> Result<Self>
    where
        O: OsInterface<UntypedQueue = Q>,
    {
        let queue = os.create_untyped_queue(max_messages, Self::message_size()?)?;
        Ok(Self {
            queue,
            _message: PhantomData,
        })
    }

    /// Takes ownership of an existing untyped queue.
    ///
    /// The queue must be empty and sized for `T`, otherwise [`Error::InvalidArgument`] is returned.
    pub fn from_untyped(queue: Q) -> Result<Self> {
        if queue.message_size() != Self::message_size()? || !queue.is_empty() {
            return Err(Error::InvalidArgument);
        }
        Ok(Self {
            queue,
            _message: PhantomData,
        })
    }

    /// Returns the underlying untyped queue.
    pub fn into_untyped(self) -> Q {
        self.queue
    }

    fn message_size() -> Result<u32> {
        u32::try_from(size_of::<T>()).map_err(|_| Error::InvalidArgument)
    }

    /// Returns the number of messages currently in the queue.
    pub fn length(&self) -> u32 {
        self.queue.length()
    }

    /// Returns the number of slots in the queue.
    pub fn size(&self) -> u32 {
        self.queue.size()
    }

    /// Returns the number of empty slots in the queue.
    pub fn available(&self) -> u32 {
        self.queue.available()
    }

    /// Returns `true` if the queue holds no message.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Returns `true` if every slot is occupied.
    pub fn is_full(&self) -> bool {
        self.queue.is_full()
    }

    /// Removes all messages. See [`UntypedQueue::reset`].
    pub fn reset(&self) {
        self.queue.reset();
    }

    /// Receives the oldest message, blocking for at most `timeout_ms` milliseconds while the queue is empty.
    pub fn receive(&self, timeout_ms: u32) -> Option<T> {
        receive_with(|bytes| self.queue.receive(bytes, timeout_ms))
    }

    /// Receives the oldest message without blocking. Safe to call from interrupt context.
    pub fn receive_from_isr(&self) -> Option<T> {
        receive_with(|bytes| self.queue.receive_from_isr(bytes))
    }

    /// Appends `message`, blocking for at most `timeout_ms` milliseconds while the queue is full.
    ///
    /// Returns `false` if the timeout elapsed.
    pub fn send_to_back(&self, message: &T, timeout_ms: u32) -> bool {
        self.queue.send_to_back(as_bytes(message), timeout_ms)
    }

    /// Appends `message` without blocking. Safe to call from interrupt context.
    pub fn send_to_back_from_isr(&self, message: &T) -> bool {
        self.queue.send_to_back_from_isr(as_bytes(message))
    }

    /// Inserts `message` ahead of every queued message, blocking for at most `timeout_ms` milliseconds while the
    /// queue is full.
    ///
    /// Returns `false` if the timeout elapsed.
    pub fn send_to_front(&self, message: &T, timeout_ms: u32) -> bool {
        self.queue.send_to_front(as_bytes(message), timeout_ms)
    }

    /// Inserts `message` ahead of every queued message without blocking. Safe to call from interrupt context.
    pub fn send_to_front_from_isr(&self, message: &T) -> bool {
        self.queue.send_to_front_from_isr(as_bytes(message))
    }
}

fn as_bytes<T>(message: &T) -> &[u8]
where
    T: PlainData,
{
    // SAFETY: `PlainData` guarantees every byte of `T` is initialized, the pointer is valid for `size_of::<T>()`
    // bytes for the lifetime of the borrow and `u8` has no alignment requirement.
    unsafe { core::slice::from_raw_parts((message as *const T).cast::<u8>(), size_of::<T>()) }
}

fn receive_with<T>(receive: impl FnOnce(&mut [u8]) -> bool) -> Option<T>
where
    T: PlainData,
{
    let mut message = MaybeUninit::<T>::zeroed();
    // SAFETY: the zeroed storage is initialized as bytes, valid for `size_of::<T>()` bytes and exclusively borrowed.
    let bytes = unsafe {
        core::slice::from_raw_parts_mut(message.as_mut_ptr().cast::<u8>(), size_of::<T>())
    };
    if !receive(bytes) {
        return None;
    }
    // SAFETY: the bytes are initialized and `PlainData` guarantees any bit pattern is a valid `T`.
    Some(unsafe { message.assume_init() })
}
