//! Heap allocation facade.

/// Zero-initialized heap block handed out by [`malloc`].
pub type Allocation = Box<[u8]>;

/// Allocates `size` zeroed bytes without aborting on exhaustion.
pub(crate) fn malloc(size: u32) -> Option<Allocation> {
    if size == 0 {
        return None;
    }
    let size = usize::try_from(size).ok()?;

    let mut block = Vec::new();
    if let Err(error) = block.try_reserve_exact(size) {
        tracing::warn!(size, %error, "allocation failed");
        return None;
    }
    block.resize(size, 0);
    Some(block.into_boxed_slice())
}
