//! Runtime configuration of the `std` backend.

use serde::{Deserialize, Serialize};

/// Configuration for [`StdOsInterface`](crate::StdOsInterface).
///
/// Every field has a default, so partial documents deserialize:
///
/// ```rust
/// let config: osif_std::Config = serde_json::from_str(r#"{ "timer_worker_threads": 2 }"#).unwrap();
/// assert_eq!(config.timer_worker_threads, 2);
/// assert_eq!(config.thread_name_prefix, "osif");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Prefix of the names given to threads started by
    /// [`OsInterface::run_process`](osif_api::OsInterface::run_process).
    pub thread_name_prefix: String,

    /// Stack size in bytes for processes; `None` keeps the platform default.
    pub thread_stack_size: Option<usize>,

    /// Number of threads executing timer callbacks.
    ///
    /// Callbacks of one timer never overlap regardless of this value; more threads only let different timers fire
    /// concurrently.
    pub timer_worker_threads: usize,

    /// Name of the timer service threads.
    pub timer_thread_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            thread_name_prefix: "osif".to_owned(),
            thread_stack_size: None,
            timer_worker_threads: 1,
            timer_thread_name: "osif-timer".to_owned(),
        }
    }
}
