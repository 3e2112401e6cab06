//! Fixed-window rate limiter.
//!
//! Admission control for the resize pipeline. Each scope key owns a
//! [`RateWindow`]; at most `max_requests` admissions are granted per window,
//! and the count resets once the window has elapsed.
//!
//! Denied requests do not consume quota: the counter only moves when a
//! request is admitted.
//!
//! # Bounded state
//!
//! In per-client mode every new caller adds a window to the map. Once the map
//! reaches the prune threshold, expired windows are swept at most once per
//! window length, so a flood of new callers does not rescan the map on every
//! request. If the map still reaches the hard cap, new callers are denied
//! until the next sweep; callers that already hold a window are unaffected.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

/// Default maximum admissions per window.
pub const DEFAULT_RATE_LIMIT_MAX: u32 = 100;

/// Default window length.
pub const DEFAULT_RATE_LIMIT_WINDOW: Duration = Duration::from_secs(60);

/// Default map size at which expired windows start being swept.
pub const DEFAULT_PRUNE_THRESHOLD: usize = 10_000;

/// Default hard cap on tracked scope keys.
pub const DEFAULT_MAX_TRACKED_SCOPES: usize = 100_000;

/// Scope key shared by every caller in global mode.
const GLOBAL_SCOPE: &str = "*";

/// How callers are grouped into budgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RateLimitScope {
    /// One budget shared by every caller
    #[default]
    Global,

    /// One budget per caller identity (peer IP)
    PerClient,
}

/// Counter state for one scope key.
#[derive(Debug, Clone, Copy)]
pub struct RateWindow {
    /// Start of the current window
    pub window_start: Instant,

    /// Admissions granted in the current window
    pub count: u32,
}

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    /// The request may proceed
    Allowed {
        /// Admissions left in the current window
        remaining: u32,
    },

    /// The budget is exhausted until the window resets
    Denied {
        /// Time until the current window ends
        retry_after: Duration,
    },
}

impl RateDecision {
    /// Whether the request was admitted.
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateDecision::Allowed { .. })
    }
}

/// Windows plus the time of the last sweep.
#[derive(Debug, Default)]
struct LimiterState {
    windows: HashMap<String, RateWindow>,
    last_sweep: Option<Instant>,
}

impl LimiterState {
    fn sweep_due(&self, now: Instant, window: Duration) -> bool {
        self.last_sweep
            .map_or(true, |last| now.duration_since(last) >= window)
    }

    fn sweep(&mut self, now: Instant, window: Duration) {
        let before = self.windows.len();
        self.windows
            .retain(|_, w| now.duration_since(w.window_start) < window);
        self.last_sweep = Some(now);
        debug!(
            before,
            after = self.windows.len(),
            "Swept expired rate windows"
        );
    }
}

/// Fixed-window admission gate.
///
/// # Thread Safety
///
/// Windows live behind a `std::sync::Mutex` that is never held across an
/// `.await`, so the limiter can be shared freely between tasks.
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    scope: RateLimitScope,
    prune_threshold: usize,
    max_tracked_scopes: usize,
    state: Mutex<LimiterState>,
}

impl RateLimiter {
    /// Create a global limiter with default budget (100 per 60 seconds).
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_RATE_LIMIT_MAX, DEFAULT_RATE_LIMIT_WINDOW)
    }

    /// Create a global limiter with a custom budget.
    pub fn with_limits(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            scope: RateLimitScope::Global,
            prune_threshold: DEFAULT_PRUNE_THRESHOLD,
            max_tracked_scopes: DEFAULT_MAX_TRACKED_SCOPES,
            state: Mutex::new(LimiterState::default()),
        }
    }

    /// Set the map size at which expired windows start being swept.
    ///
    /// Raises the hard cap if it would fall below the threshold.
    pub fn with_prune_threshold(mut self, threshold: usize) -> Self {
        self.prune_threshold = threshold;
        self.max_tracked_scopes = self.max_tracked_scopes.max(threshold);
        self
    }

    /// Set the hard cap on tracked scope keys (never below the prune threshold).
    pub fn with_max_tracked_scopes(mut self, max: usize) -> Self {
        self.max_tracked_scopes = max.max(self.prune_threshold);
        self
    }

    /// Set how callers are grouped into budgets.
    pub fn with_scope(mut self, scope: RateLimitScope) -> Self {
        self.scope = scope;
        self
    }

    /// Get the maximum admissions per window.
    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    /// Get the window length.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Get the scope mode.
    pub fn scope(&self) -> RateLimitScope {
        self.scope
    }

    /// Get the hard cap on tracked scope keys.
    pub fn max_tracked_scopes(&self) -> usize {
        self.max_tracked_scopes
    }

    /// Decide whether `caller` may proceed.
    ///
    /// In global mode the caller identity is ignored. A new caller is denied
    /// when the map is at its hard cap and no sweep is due yet.
    pub fn admit(&self, caller: &str) -> RateDecision {
        let key = match self.scope {
            RateLimitScope::Global => GLOBAL_SCOPE,
            RateLimitScope::PerClient => caller,
        };

        let now = Instant::now();
        let mut guard = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let limiter = &mut *guard;

        if !limiter.windows.contains_key(key) {
            if limiter.windows.len() >= self.prune_threshold
                && limiter.sweep_due(now, self.window)
            {
                limiter.sweep(now, self.window);
            }

            if limiter.windows.len() >= self.max_tracked_scopes {
                let retry_after = limiter.last_sweep.map_or(self.window, |last| {
                    self.window.saturating_sub(now.duration_since(last))
                });
                warn!(
                    scope = key,
                    tracked = limiter.windows.len(),
                    "Rate limiter at capacity, denying new caller"
                );
                return RateDecision::Denied { retry_after };
            }
        }

        let state = limiter.windows.entry(key.to_string()).or_insert(RateWindow {
            window_start: now,
            count: 0,
        });

        let elapsed = now.duration_since(state.window_start);
        if elapsed >= self.window {
            state.window_start = now;
            state.count = 0;
        }

        if state.count >= self.max_requests {
            let retry_after = self.window.saturating_sub(now.duration_since(state.window_start));
            debug!(scope = key, count = state.count, "Rate limit exceeded");
            return RateDecision::Denied { retry_after };
        }

        state.count += 1;
        RateDecision::Allowed {
            remaining: self.max_requests - state.count,
        }
    }

    /// Get the number of tracked scope keys.
    pub fn tracked_scopes(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .windows
            .len()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================
