//! Timers driven by a [`tokio`] runtime.
//!
//! Every timer is one task on the timer service runtime. The task sleeps until the deadline held in its
//! [`TimerState`], performs the firing transition and runs the callback inline, so invocations of one timer are
//! serialized by construction. Start, stop and period changes wake the task through a [`Notify`] so it picks up
//! the new deadline.
//!
//! [`Timer::stop`] does not wait for an invocation that is already running. A callback that panics is logged and the
//! timer carries on.

use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use osif_api::Result;
use osif_api::timer::TimerState;
pub use osif_api::timer::{Timer, TimerMode};
use tokio::runtime::Runtime;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::IntoOsalError;
use crate::config::Config;
use crate::sync::lock;
use crate::time::Clock;

/// Owns the runtime that executes timer tasks.
#[derive(Debug)]
pub(crate) struct TimerService {
    runtime: Option<Runtime>,
}

impl TimerService {
    pub(crate) fn new(config: &Config) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(config.timer_worker_threads.max(1))
            .thread_name(config.timer_thread_name.clone())
            .enable_time()
            .build()
            .map_err(IntoOsalError::into_osal_error)?;
        tracing::debug!(
            workers = config.timer_worker_threads.max(1),
            "timer service started"
        );
        Ok(Self {
            runtime: Some(runtime),
        })
    }

    fn spawn<F>(&self, task: F) -> Option<JoinHandle<()>>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.runtime.as_ref().map(|runtime| runtime.spawn(task))
    }
}

impl Drop for TimerService {
    fn drop(&mut self) {
        // Dropping the last handle may happen inside a callback, where a blocking shutdown would panic.
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

/// State shared between a timer handle and its task.
#[derive(Debug)]
struct Shared {
    state: Mutex<TimerState>,
    rearmed: Notify,
}

/// [`Timer`] for `std`.
///
/// Dropping the timer cancels its task; a callback that is already running completes first.
#[derive(Debug)]
pub struct StdTimer {
    shared: Arc<Shared>,
    clock: Clock,
    name: Option<String>,
    task: JoinHandle<()>,
    _service: Arc<TimerService>,
}

impl StdTimer {
    pub(crate) fn new<F>(
        service: &Arc<TimerService>,
        clock: Clock,
        period_ms: u32,
        mode: TimerMode,
        name: Option<&str>,
        callback: F,
    ) -> Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        let shared = Arc::new(Shared {
            state: Mutex::new(TimerState::new(period_ms, mode)?),
            rearmed: Notify::new(),
        });
        let name = name.map(str::to_owned);
        let task = service
            .spawn(run(Arc::clone(&shared), clock, name.clone(), callback))
            .ok_or(osif_api::Error::Unknown)?;
        tracing::debug!(timer = name.as_deref(), period_ms, ?mode, "timer created");

        Ok(Self {
            shared,
            clock,
            name,
            task,
            _service: Arc::clone(service),
        })
    }

    fn update(&self, transition: impl FnOnce(&mut TimerState, u32) -> Result<()>) -> Result<()> {
        transition(&mut lock(&self.shared.state), self.clock.millis())?;
        self.shared.rearmed.notify_one();
        Ok(())
    }
}

impl Timer for StdTimer {
    fn start(&self) -> Result<()> {
        tracing::trace!(timer = self.name.as_deref(), "timer start");
        self.update(|state, now| {
            state.start(now);
            Ok(())
        })
    }

    fn stop(&self) -> Result<()> {
        tracing::trace!(timer = self.name.as_deref(), "timer stop");
        self.update(|state, _| {
            state.stop();
            Ok(())
        })
    }

    fn set_period(&self, period_ms: u32) -> Result<()> {
        self.update(|state, now| state.set_period(now, period_ms))
    }

    fn is_running(&self) -> bool {
        lock(&self.shared.state).is_running()
    }

    fn period(&self) -> u32 {
        lock(&self.shared.state).period()
    }

    fn mode(&self) -> TimerMode {
        lock(&self.shared.state).mode()
    }

    fn timeout(&self) -> Option<u32> {
        lock(&self.shared.state).timeout(self.clock.millis())
    }

    fn timeout_time(&self) -> Option<u32> {
        lock(&self.shared.state).timeout_time()
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl Drop for StdTimer {
    fn drop(&mut self) {
        lock(&self.shared.state).stop();
        self.task.abort();
        tracing::debug!(timer = self.name.as_deref(), "timer deleted");
    }
}

async fn run<F>(shared: Arc<Shared>, clock: Clock, name: Option<String>, mut callback: F)
where
    F: FnMut() + Send + 'static,
{
    loop {
        let timeout = lock(&shared.state).timeout(clock.millis());
        let Some(remaining) = timeout else {
            shared.rearmed.notified().await;
            continue;
        };

        if remaining > 0 {
            tokio::select! {
                () = tokio::time::sleep(Duration::from_millis(remaining.into())) => {}
                () = shared.rearmed.notified() => continue,
            }
        }

        // The state lock is released before the callback runs, so the callback may manage its own timer.
        let fire = lock(&shared.state).expire(clock.millis());
        if fire {
            invoke(&mut callback, name.as_deref());
        }
    }
}

fn invoke(callback: &mut (impl FnMut() + Send), name: Option<&str>) {
    // Hands this worker's other timers to another thread while the callback blocks.
    let outcome =
        tokio::task::block_in_place(|| std::panic::catch_unwind(AssertUnwindSafe(|| callback())));
    if outcome.is_err() {
        tracing::error!(timer = name, "timer callback panicked");
    }
}
