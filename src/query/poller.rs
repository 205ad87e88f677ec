//! Poll cadence and transient-retry policy.
//!
//! Status polling uses exponential backoff with a floor and a ceiling so a
//! fast query is observed quickly while a slow one does not hammer the
//! engine. Additive jitter spreads concurrent pollers apart. Transient
//! transport failures get their own short retry ladder, separate from the
//! status cadence.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::engine::EngineError;
use crate::query::error::QueryError;

/// Backoff schedule for one query's poll loop.
#[derive(Debug, Clone)]
pub struct PollSettings {
    /// Interval before the first status check.
    pub initial_interval: Duration,
    /// Ceiling for the exponential growth.
    pub max_interval: Duration,
    /// Multiplier applied to the interval after each poll.
    pub multiplier: f64,
    /// Additive jitter as a fraction of the base interval (0.0 disables).
    pub jitter_fraction: f64,
    /// How many times a transient transport failure is retried per call.
    pub transient_retries: u32,
    /// Base delay between transient retries; grows linearly per attempt.
    pub transient_backoff: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(500),
            max_interval: Duration::from_secs(4),
            multiplier: 2.0,
            jitter_fraction: 0.1,
            transient_retries: 3,
            transient_backoff: Duration::from_millis(250),
        }
    }
}

impl PollSettings {
    /// Base interval for the nth poll (0-indexed):
    /// `initial * multiplier^n`, capped at `max_interval`.
    ///
    /// The resulting sequence is non-decreasing until it reaches the ceiling
    /// and never exceeds it.
    pub fn interval_for(&self, attempt: u32) -> Duration {
        let base = self.initial_interval.as_secs_f64() * self.multiplier.powi(attempt as i32);
        Duration::from_secs_f64(base.min(self.max_interval.as_secs_f64()))
    }

    /// [`interval_for`](Self::interval_for) plus up to `jitter_fraction` of
    /// random additive jitter.
    pub fn jittered_interval_for(&self, attempt: u32) -> Duration {
        let base = self.interval_for(attempt);
        if self.jitter_fraction <= 0.0 {
            return base;
        }
        base + base.mul_f64(self.jitter_fraction * rand::random::<f64>())
    }
}

/// Run `op`, retrying transient engine failures per the settings.
///
/// Non-transient failures surface immediately; exhausting the retry budget
/// surfaces the last error. Either way the failure is reported as
/// [`QueryError::Poll`] with the number of calls made.
pub(crate) async fn with_transient_retry<T, F, Fut>(
    settings: &PollSettings,
    operation: &str,
    mut op: F,
) -> Result<T, QueryError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, EngineError>>,
{
    let mut attempt: u32 = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < settings.transient_retries => {
                attempt += 1;
                warn!(
                    operation,
                    attempt,
                    error = %e,
                    "transient engine failure, retrying"
                );
                tokio::time::sleep(settings.transient_backoff * attempt).await;
            }
            Err(e) => {
                return Err(QueryError::Poll {
                    attempts: attempt + 1,
                    source: e,
                })
            }
        }
    }
}
