//! Workspace consistency checks live in `tests/checks.rs`; this library is empty.
