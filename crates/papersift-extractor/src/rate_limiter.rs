//! Sliding-window token rate limiting
//!
//! The limiter tracks tokens spent over the trailing 60 seconds rather than
//! per calendar minute, so there is no burst of admissions when a minute
//! boundary resets a bucket.
//!
//! [`TokenUsageWindow`] is a plain value whose operations take an explicit
//! `now`; [`RateLimiter`] wraps it in an async mutex, supplies the clock and
//! suspends callers until capacity frees up.

use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::{debug, info};

/// Length of the usage window
pub const WINDOW: Duration = Duration::from_secs(60);

/// Result of an admission check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The call may proceed now
    Admit,
    /// Re-check after this long, when the oldest sample leaves the window
    Wait(Duration),
}

/// Token samples recorded in the trailing 60 seconds, oldest first
#[derive(Debug, Clone, Default)]
pub struct TokenUsageWindow {
    samples: VecDeque<(Instant, usize)>,
}

impl TokenUsageWindow {
    /// Create an empty window
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop samples that are at least `WINDOW` old at `now`
    pub fn prune(&mut self, now: Instant) {
        while let Some(&(at, _)) = self.samples.front() {
            if now.saturating_duration_since(at) >= WINDOW {
                self.samples.pop_front();
            } else {
                break;
            }
        }
    }

    /// Append a sample
    pub fn record(&mut self, at: Instant, tokens: usize) {
        self.samples.push_back((at, tokens));
    }

    /// Sum of all retained samples
    pub fn total(&self) -> usize {
        self.samples.iter().map(|(_, tokens)| tokens).sum()
    }

    /// Whether no samples are retained
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Number of retained samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Time until the oldest sample leaves the window
    pub fn time_until_oldest_expires(&self, now: Instant) -> Option<Duration> {
        self.samples
            .front()
            .map(|&(at, _)| (at + WINDOW).saturating_duration_since(now))
    }

    /// Prune, then decide whether `required` more tokens fit in `budget`
    ///
    /// An empty window always admits, even when `required` alone exceeds
    /// the budget: the service's own limit is then the judge.
    pub fn check(&mut self, now: Instant, required: usize, budget: usize) -> Admission {
        self.prune(now);

        if self.is_empty() || self.total().saturating_add(required) <= budget {
            return Admission::Admit;
        }

        match self.time_until_oldest_expires(now) {
            Some(wait) => Admission::Wait(wait),
            None => Admission::Admit,
        }
    }
}

/// Per-minute token budget shared by every call made through it
///
/// # Examples
///
/// ```
/// use papersift_extractor::RateLimiter;
///
/// # async fn example() {
/// let limiter = RateLimiter::new(20_000);
/// limiter.admit(5_000).await;
/// limiter.record(5_000).await;
/// assert_eq!(limiter.usage().await, 5_000);
/// assert_eq!(limiter.remaining().await, 15_000);
/// # }
/// ```
#[derive(Debug)]
pub struct RateLimiter {
    budget: usize,
    window: Mutex<TokenUsageWindow>,
}

impl RateLimiter {
    /// Create a limiter allowing `budget` tokens per trailing minute
    pub fn new(budget: usize) -> Self {
        Self {
            budget,
            window: Mutex::new(TokenUsageWindow::new()),
        }
    }

    /// Tokens allowed per trailing minute
    pub fn budget(&self) -> usize {
        self.budget
    }

    /// Wait until `required` tokens fit in the budget
    ///
    /// The window stays locked while waiting, so no sample is recorded
    /// between the decision and the caller proceeding. Returns the total time
    /// spent waiting.
    pub async fn admit(&self, required: usize) -> Duration {
        let mut window = self.window.lock().await;
        let mut waited = Duration::ZERO;

        loop {
            match window.check(Instant::now(), required, self.budget) {
                Admission::Admit => {
                    debug!(
                        "Admitted {} tokens ({} used of {})",
                        required,
                        window.total(),
                        self.budget
                    );
                    return waited;
                }
                Admission::Wait(delay) => {
                    info!(
                        "Rate limit reached ({} + {} > {}). Waiting {:.1} seconds...",
                        window.total(),
                        required,
                        self.budget,
                        delay.as_secs_f64()
                    );
                    sleep(delay).await;
                    waited += delay;
                }
            }
        }
    }

    /// Record tokens spent by an admitted call
    pub async fn record(&self, tokens: usize) {
        self.window.lock().await.record(Instant::now(), tokens);
    }

    /// Tokens spent in the trailing minute
    pub async fn usage(&self) -> usize {
        let mut window = self.window.lock().await;
        window.prune(Instant::now());
        window.total()
    }

    /// Tokens still available in the trailing minute
    pub async fn remaining(&self) -> usize {
        self.budget.saturating_sub(self.usage().await)
    }
}
