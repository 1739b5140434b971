//! One-shot and periodic software timers.
//!
//! A timer is `STOPPED` or `RUNNING`. While running it holds an absolute expiry time; when the clock reaches it the
//! backend invokes the timer's callback from an execution context of its choosing (typically a dedicated worker
//! thread, never assumed to be interrupt context). A one-shot timer stops after a single invocation, a periodic timer
//! re-arms itself until stopped.
//!
//! # Callback contract
//!
//! - Invocations of one timer's callback never overlap.
//! - The callback's thread-safety, including anything it captures, is the caller's responsibility.
//! - Callbacks must not acquire locks that timer management code or [`Timer::stop`] may hold.
//! - Whether [`Timer::stop`] waits for an in-flight invocation is defined by each backend; portable code must not
//!   rely on either behavior.
//!
//! [`TimerState`] implements the state machine independently of any clock source so backends only have to provide
//! the waiting and the callback execution.

use serde::{Deserialize, Serialize};

use crate::{Error, Result, deadline_reached};

/// Whether a timer fires once or repeatedly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerMode {
    /// Fires once, then stops.
    OneShot,
    /// Fires every period until stopped.
    Periodic,
}

/// Backend-independent timer state machine, driven by explicit millisecond clock readings.
///
/// All times are wrapping `u32` milliseconds as returned by [`OsInterface::millis`](crate::OsInterface::millis).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerState {
    period: u32,
    mode: TimerMode,
    /// Absolute expiry time, `Some` exactly while running.
    expiry: Option<u32>,
}

impl TimerState {
    /// Creates a stopped timer.
    ///
    /// A zero `period` is rejected with [`Error::InvalidArgument`].
    pub fn new(period: u32, mode: TimerMode) -> Result<Self> {
        if period == 0 {
            return Err(Error::InvalidArgument);
        }
        Ok(Self {
            period,
            mode,
            expiry: None,
        })
    }

    /// Starts the timer, or restarts its period from `now` if it is already running.
    pub fn start(&mut self, now: u32) {
        self.expiry = Some(now.wrapping_add(self.period));
    }

    /// Stops the timer. Does nothing if it is already stopped.
    pub fn stop(&mut self) {
        self.expiry = None;
    }

    /// Changes the period.
    ///
    /// A running timer re-arms from `now` with the new period; a stopped timer uses it on the next
    /// [`start`](Self::start). A zero `period` is rejected with [`Error::InvalidArgument`] and leaves the timer
    /// unchanged.
    pub fn set_period(&mut self, now: u32, period: u32) -> Result<()> {
        if period == 0 {
            return Err(Error::InvalidArgument);
        }
        self.period = period;
        if self.is_running() {
            self.start(now);
        }
        Ok(())
    }

    /// Returns `true` while the timer is running.
    pub fn is_running(&self) -> bool {
        self.expiry.is_some()
    }

    /// Returns the period in milliseconds.
    pub fn period(&self) -> u32 {
        self.period
    }

    /// Returns the mode the timer was created with.
    pub fn mode(&self) -> TimerMode {
        self.mode
    }

    /// Returns the milliseconds left until expiry, `0` if it is due, or `None` while stopped.
    pub fn timeout(&self, now: u32) -> Option<u32> {
        self.expiry.map(|expiry| {
            if deadline_reached(now, expiry) {
                0
            } else {
                expiry.wrapping_sub(now)
            }
        })
    }

    /// Returns the absolute expiry time, or `None` while stopped.
    pub fn timeout_time(&self) -> Option<u32> {
        self.expiry
    }

    /// Performs the firing transition if the timer is due at `now`.
    ///
    /// Returns `true` if the callback has to be invoked. A one-shot timer is stopped by this call. A periodic timer
    /// re-arms one period after the expiry it just served, keeping its phase; if that point has already passed
    /// because the previous invocation overran, it re-arms one period after `now` instead of firing a burst of
    /// catch-up invocations.
    pub fn expire(&mut self, now: u32) -> bool {
        let Some(expiry) = self.expiry else {
            return false;
        };
        if !deadline_reached(now, expiry) {
            return false;
        }
        self.expiry = match self.mode {
            TimerMode::OneShot => None,
            TimerMode::Periodic => {
                let next = expiry.wrapping_add(self.period);
                if deadline_reached(now, next) {
                    Some(now.wrapping_add(self.period))
                } else {
                    Some(next)
                }
            }
        };
        true
    }
}

/// A one-shot or periodic software timer created by [`OsInterface::create_timer`](crate::OsInterface::create_timer).
///
/// Dropping the timer stops it and releases its resources. The query methods never block and are safe to call from
/// interrupt context.
pub trait Timer: Send + Sync {
    /// Starts the timer, or restarts its period from now if it is already running.
    fn start(&self) -> Result<()>;

    /// Stops the timer. Does nothing if it is already stopped.
    ///
    /// See the [module documentation](self) on callbacks already in flight.
    fn stop(&self) -> Result<()>;

    /// Changes the period. See [`TimerState::set_period`].
    fn set_period(&self, period_ms: u32) -> Result<()>;

    /// Returns `true` while the timer is running.
    fn is_running(&self) -> bool;

    /// Returns the period in milliseconds.
    fn period(&self) -> u32;

    /// Returns the mode the timer was created with.
    fn mode(&self) -> TimerMode;

    /// Returns the milliseconds left until expiry, or `None` while stopped.
    fn timeout(&self) -> Option<u32>;

    /// Returns the absolute expiry time on the [`OsInterface::millis`](crate::OsInterface::millis) clock, or `None`
    /// while stopped.
    fn timeout_time(&self) -> Option<u32>;

    /// Returns the diagnostic name given at creation.
    fn name(&self) -> Option<&str>;
}


#[doc(hidden)]
#[cfg(feature = "test-suites")]
#[cfg_attr(coverage_nightly, coverage(off))]
pub mod test_suite {
    #![expect(missing_docs, reason = "tests")]
    //! Test suite for timers.

    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, Instant};
    use std::vec::Vec;

    use crate::timer::{Timer, TimerMode};
    use crate::{Error, OsInterface};

    /// Counts callback invocations and detects overlapping ones.
    #[derive(Debug, Default)]
    pub struct Tally {
        pub fired: AtomicU32,
        pub in_flight: AtomicBool,
        pub overlaps: AtomicU32,
        pub instants: Mutex<Vec<Instant>>,
    }

    impl Tally {
        pub fn callback(self: &Arc<Self>, busy: Duration) -> impl FnMut() + Send + 'static {
            let tally = Arc::clone(self);
            move || {
                if tally.in_flight.swap(true, Ordering::SeqCst) {
                    tally.overlaps.fetch_add(1, Ordering::SeqCst);
                }
                tally.instants.lock().unwrap().push(Instant::now());
                tally.fired.fetch_add(1, Ordering::SeqCst);
                std::thread::sleep(busy);
                tally.in_flight.store(false, Ordering::SeqCst);
            }
        }

        pub fn fired(&self) -> u32 {
            self.fired.load(Ordering::SeqCst)
        }
    }

    pub fn test_create_rejects_zero_period(os: &impl OsInterface) {
        assert_eq!(
            os.create_timer(0, TimerMode::OneShot, None, || {}).err(),
            Some(Error::InvalidArgument)
        );
    }

    pub fn test_created_stopped(os: &impl OsInterface) {
        let tally = Arc::new(Tally::default());
        let timer = os
            .create_timer(
                30,
                TimerMode::Periodic,
                Some("idle"),
                tally.callback(Duration::ZERO),
            )
            .unwrap();

        assert!(!timer.is_running());
        assert_eq!(timer.period(), 30);
        assert_eq!(timer.mode(), TimerMode::Periodic);
        assert_eq!(timer.name(), Some("idle"));
        assert_eq!(timer.timeout(), None);
        assert_eq!(timer.timeout_time(), None);

        std::thread::sleep(Duration::from_millis(80));
        assert_eq!(
            tally.fired(),
            0,
            "a timer that was never started must not fire"
        );
    }

    pub fn test_one_shot(os: &impl OsInterface) {
        let tally = Arc::new(Tally::default());
        let timer = os
            .create_timer(50, TimerMode::OneShot, None, tally.callback(Duration::ZERO))
            .unwrap();

        let started = Instant::now();
        let start_millis = os.millis();
        timer.start().unwrap();
        assert!(timer.is_running());
        let armed = timer.timeout_time().unwrap().wrapping_sub(start_millis);
        assert!((50..60).contains(&armed), "expiry {armed}ms after start");
        assert!(timer.timeout().unwrap() <= 50);

        std::thread::sleep(Duration::from_millis(200));

        assert_eq!(tally.fired(), 1);
        assert!(!timer.is_running());
        assert_eq!(timer.timeout(), None);

        let fired_at = tally.instants.lock().unwrap()[0];
        // The millisecond clock truncates, so the deadline may land up to 1ms before `started + 50ms`.
        assert!(
            fired_at.duration_since(started) >= Duration::from_millis(49)
        );
    }

    pub fn test_periodic(os: &impl OsInterface) {
        let tally = Arc::new(Tally::default());
        let timer = os
            .create_timer(
                20,
                TimerMode::Periodic,
                Some("periodic"),
                tally.callback(Duration::from_millis(2)),
            )
            .unwrap();

        timer.start().unwrap();
        std::thread::sleep(Duration::from_millis(110));
        timer.stop().unwrap();
        assert!(!timer.is_running());

        let fired = tally.fired();
        assert!(
            (3..=6).contains(&fired),
            "expected about 5 invocations over 110ms, got {fired}"
        );
        assert_eq!(tally.overlaps.load(Ordering::SeqCst), 0);

        // Allow an invocation that was already in flight to finish, then nothing more may arrive.
        std::thread::sleep(Duration::from_millis(20));
        let after_stop = tally.fired();
        std::thread::sleep(Duration::from_millis(60));
        assert_eq!(tally.fired(), after_stop);
    }

    pub fn test_periodic_callbacks_never_overlap(os: &impl OsInterface) {
        let tally = Arc::new(Tally::default());
        // The callback outlasts the period on purpose.
        let timer = os
            .create_timer(
                5,
                TimerMode::Periodic,
                None,
                tally.callback(Duration::from_millis(12)),
            )
            .unwrap();

        timer.start().unwrap();
        std::thread::sleep(Duration::from_millis(100));
        timer.stop().unwrap();
        std::thread::sleep(Duration::from_millis(30));

        assert!(tally.fired() >= 2);
        assert_eq!(tally.overlaps.load(Ordering::SeqCst), 0);
    }

    pub fn test_restart_extends_deadline(os: &impl OsInterface) {
        let tally = Arc::new(Tally::default());
        let timer = os
            .create_timer(80, TimerMode::OneShot, None, tally.callback(Duration::ZERO))
            .unwrap();

        timer.start().unwrap();
        std::thread::sleep(Duration::from_millis(50));
        timer.start().unwrap();
        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(tally.fired(), 0, "restarting should push the expiry out");

        std::thread::sleep(Duration::from_millis(100));
        assert_eq!(tally.fired(), 1);
    }

    pub fn test_stop_before_expiry(os: &impl OsInterface) {
        let tally = Arc::new(Tally::default());
        let timer = os
            .create_timer(40, TimerMode::OneShot, None, tally.callback(Duration::ZERO))
            .unwrap();

        timer.start().unwrap();
        timer.stop().unwrap();
        timer.stop().unwrap();
        std::thread::sleep(Duration::from_millis(100));

        assert_eq!(tally.fired(), 0);
        assert!(!timer.is_running());
    }

    pub fn test_set_period(os: &impl OsInterface) {
        let tally = Arc::new(Tally::default());
        let timer = os
            .create_timer(
                1_000,
                TimerMode::OneShot,
                None,
                tally.callback(Duration::ZERO),
            )
            .unwrap();

        timer.set_period(30).unwrap();
        assert!(
            !timer.is_running(),
            "changing the period must not start the timer"
        );
        assert_eq!(timer.period(), 30);

        timer.start().unwrap();
        std::thread::sleep(Duration::from_millis(100));
        assert_eq!(tally.fired(), 1);

        assert_eq!(timer.set_period(0).err(), Some(Error::InvalidArgument));
        assert_eq!(timer.period(), 30);
    }

    pub fn test_set_period_rearms_running_timer(os: &impl OsInterface) {
        let tally = Arc::new(Tally::default());
        let timer = os
            .create_timer(
                1_000,
                TimerMode::OneShot,
                None,
                tally.callback(Duration::ZERO),
            )
            .unwrap();

        timer.start().unwrap();
        timer.set_period(30).unwrap();
        assert!(timer.is_running());
        assert!(timer.timeout().unwrap() <= 30);

        std::thread::sleep(Duration::from_millis(120));
        assert_eq!(tally.fired(), 1);
    }

    pub fn test_drop_stops_timer(os: &impl OsInterface) {
        let tally = Arc::new(Tally::default());
        let timer = os
            .create_timer(
                10,
                TimerMode::Periodic,
                None,
                tally.callback(Duration::ZERO),
            )
            .unwrap();

        timer.start().unwrap();
        std::thread::sleep(Duration::from_millis(35));
        drop(timer);

        std::thread::sleep(Duration::from_millis(20));
        let after_drop = tally.fired();
        std::thread::sleep(Duration::from_millis(60));
        assert_eq!(tally.fired(), after_drop);
    }
}
