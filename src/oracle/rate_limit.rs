use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            thread::sleep(duration);
        }
    }
}

/// Enforces a minimum spacing between oracle calls. The lock is held while
/// waiting so concurrent callers queue behind each other.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_call: Mutex::new(None),
        }
    }

    pub fn per_minute(requests_per_minute: u32) -> Self {
        if requests_per_minute == 0 {
            return Self::new(Duration::ZERO);
        }
        Self::new(Duration::from_secs(60) / requests_per_minute)
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    pub fn acquire(&self, clock: &dyn Clock) -> Duration {
        let mut last_call = self.last_call.lock().unwrap_or_else(PoisonError::into_inner);

        let mut waited = Duration::ZERO;
        if let Some(previous) = *last_call {
            let ready_at = previous + self.min_interval;
            let now = clock.now();
            if ready_at > now {
                waited = ready_at - now;
                clock.sleep(waited);
            }
        }

        *last_call = Some(clock.now());
        waited
    }
}
