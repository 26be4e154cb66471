use super::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Calls `operation` until it succeeds, at most `policy.max_attempts` times,
/// blocking on `clock` for `policy.delay` between attempts. Cancellation is
/// only observed before an attempt starts.
pub fn with_retry<T, E, F>(
    policy: &RetryPolicy,
    clock: &dyn Clock,
    cancel: &CancellationToken,
    progress: &dyn ProgressSink,
    label: &str,
    mut operation: F,
) -> Result<T, RetryError<E>>
where
    E: std::error::Error + 'static,
    F: FnMut(u32) -> Result<T, E>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        if cancel.is_cancelled() {
            progress.report(
                ProgressLevel::Warning,
                &format!("{label}: cancelled after {attempt} attempts"),
            );
            return Err(RetryError::Cancelled { attempts: attempt });
        }

        attempt += 1;
        match operation(attempt) {
            Ok(value) => return Ok(value),
            Err(err) if attempt >= max_attempts => {
                progress.report(
                    ProgressLevel::Error,
                    &format!("{label}: attempt {attempt}/{max_attempts} failed: {err}; giving up"),
                );
                return Err(RetryError::Exhausted {
                    attempts: attempt,
                    last: err,
                });
            }
            Err(err) => {
                progress.report(
                    ProgressLevel::Warning,
                    &format!(
                        "{label}: attempt {attempt}/{max_attempts} failed: {err}; retrying in {:?}",
                        policy.delay
                    ),
                );
                clock.sleep(policy.delay);
            }
        }
    }
}
