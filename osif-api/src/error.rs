/// A result with the [`Error`] error.
pub type Result<T> = core::result::Result<T, Error>;

/// An error that may happen while creating or reconfiguring an operating system primitive.
///
/// Blocking and interrupt-safe operations do not use this type: they report "timed out" or "could not complete
/// without blocking" as a plain `false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum Error {
    /// Run out of memory during the action.
    #[error("out of memory")]
    OutOfMemory,
    /// A parameter was outside of what the primitive supports, e.g. a zero capacity or a zero period.
    #[error("invalid argument")]
    InvalidArgument,
    /// Could not apply the operation due to unknown error.
    #[error("unknown error")]
    Unknown,
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::string::ToString;

    use test_case::test_case;

    use super::Error;

    #[test_case(Error::OutOfMemory, "out of memory")]
    #[test_case(Error::InvalidArgument, "invalid argument")]
    #[test_case(Error::Unknown, "unknown error")]
    fn display(error: Error, expected: &str) {
        assert_eq!(error.to_string(), expected);
    }
}
