//! Detached processes on `std` threads.

use std::io::ErrorKind;
use std::sync::atomic::{AtomicU32, Ordering};

use osif_api::{Error, Result};

use crate::IntoOsalError;
use crate::config::Config;

/// Source of the numeric suffix of unnamed processes.
static NEXT_PROCESS: AtomicU32 = AtomicU32::new(1);

/// Starts `process` on a new detached thread.
pub(crate) fn run_process<F>(config: &Config, name: Option<&str>, process: F) -> Result<()>
where
    F: FnOnce() + Send + 'static,
{
    let name = match name {
        Some(name) => format!("{}-{name}", config.thread_name_prefix),
        None => {
            // `Relaxed` is enough, the suffix only has to differ between threads.
            let id = NEXT_PROCESS.fetch_add(1, Ordering::Relaxed);
            format!("{}-{id}", config.thread_name_prefix)
        }
    };

    let mut builder = std::thread::Builder::new().name(name.clone());
    if let Some(stack_size) = config.thread_stack_size {
        builder = builder.stack_size(stack_size);
    }

    match builder.spawn(process) {
        // Dropping the handle detaches the thread.
        Ok(_handle) => {
            tracing::debug!(process = %name, "process started");
            Ok(())
        }
        Err(error) => {
            tracing::warn!(process = %name, %error, "failed to start process");
            Err(error.into_osal_error())
        }
    }
}

impl IntoOsalError<Error> for std::io::Error {
    fn into_osal_error(self) -> Error {
        match self.kind() {
            ErrorKind::OutOfMemory => Error::OutOfMemory,
            // `pthread_create` reports exhausted thread resources as `EAGAIN`.
            ErrorKind::WouldBlock => Error::OutOfMemory,
            ErrorKind::InvalidInput => Error::InvalidArgument,
            _ => Error::Unknown,
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::io;
    use std::sync::mpsc;
    use std::time::Duration;

    use test_case::test_case;

    use super::*;

    #[test_case(io::ErrorKind::OutOfMemory, Error::OutOfMemory)]
    #[test_case(io::ErrorKind::WouldBlock, Error::OutOfMemory)]
    #[test_case(io::ErrorKind::InvalidInput, Error::InvalidArgument)]
    #[test_case(io::ErrorKind::PermissionDenied, Error::Unknown)]
    fn io_error_conversion(kind: io::ErrorKind, expected: Error) {
        assert_eq!(io::Error::from(kind).into_osal_error(), expected);
    }

    #[test]
    fn unnamed_processes_get_distinct_names() {
        let config = Config::default();
        let (sender, receiver) = mpsc::channel();

        for _ in 0..2 {
            let sender = sender.clone();
            run_process(&config, None, move || {
                let name = std::thread::current().name().map(str::to_owned);
                sender.send(name).unwrap();
            })
            .unwrap();
        }

        let timeout = Duration::from_secs(5);
        let first = receiver.recv_timeout(timeout).unwrap().unwrap();
        let second = receiver.recv_timeout(timeout).unwrap().unwrap();
        assert!(first.starts_with("osif-"));
        assert!(second.starts_with("osif-"));
        assert_ne!(first, second);
    }

    #[test]
    fn configured_prefix_and_stack_size() {
        let config = Config {
            thread_name_prefix: "sensor".to_owned(),
            thread_stack_size: Some(256 * 1024),
            ..Config::default()
        };
        let (sender, receiver) = mpsc::channel();

        run_process(&config, Some("poll"), move || {
            let name = std::thread::current().name().map(str::to_owned);
            sender.send(name).unwrap();
        })
        .unwrap();

        assert_eq!(
            receiver.recv_timeout(Duration::from_secs(5)).unwrap(),
            Some("sensor-poll".to_owned())
        );
    }
}
