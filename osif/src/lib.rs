//! Portable operating system interface.
//!
//! Application code depends on [`osal::api`] and receives an [`OsInterface`] implementation from whoever composes
//! the application. Backends are enabled through features:
//!
//! - `osal-std`: [`osal::std`], threads and condition variables of the standard library.

#![forbid(unsafe_code)]
#![no_std]
#![cfg_attr(docsrs, feature(doc_cfg))]

#[doc(inline)]
pub use osif_api::{Error, NO_WAIT, OsInterface, Result, WAIT_FOREVER};

/// The operating system abstraction layer.
pub mod osal {
    #[doc(inline)]
    pub use osif_api as api;
    #[doc(inline)]
    #[cfg(feature = "osal-std")]
    pub use osif_std as std;
}
