//! Reconnect budget accounting.
//!
//! The event path consults the policy on every disassociation: while the
//! budget allows it, the verdict is to re-issue the association request;
//! once the budget is exhausted the verdict flips to give-up and the attempt
//! ends in the failed state. A new connect request re-arms the policy, a
//! successful address acquisition clears the attempt counter, and an
//! explicit disconnect forces the budget to zero so stale events cannot
//! resurrect the link.

use std::fmt;

/// Number of automatic re-association attempts permitted per connect
/// request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryLimit {
    /// At most this many re-attempts before giving up.
    Limited(u8),
    /// Retry forever. The attempt counter still runs but is never consulted.
    Unlimited,
}

impl RetryLimit {
    fn allows(self, attempted: u8) -> bool {
        match self {
            Self::Unlimited => true,
            Self::Limited(limit) => attempted < limit,
        }
    }
}

impl fmt::Display for RetryLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Limited(limit) => write!(f, "{}", limit),
            Self::Unlimited => write!(f, "unlimited"),
        }
    }
}

/// Verdict for one disassociation event.
#[must_use = "the verdict decides whether the association request is re-issued"]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Budget available: re-issue the association request.
    Reattempt,
    /// Budget exhausted: no further automatic action.
    GiveUp,
}

/// Attempt accounting for the current connect request.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    attempted: u8,
    limit: RetryLimit,
}

impl RetryPolicy {
    /// A disarmed policy: zero budget until the first connect request arms
    /// it.
    pub fn new() -> Self {
        Self {
            attempted: 0,
            limit: RetryLimit::Limited(0),
        }
    }

    /// Re-arms for a new connect request: full budget, zero attempts.
    pub fn arm(&mut self, limit: RetryLimit) {
        self.attempted = 0;
        self.limit = limit;
    }

    /// Forces the budget to zero so in-flight retry logic stops
    /// re-attempting. The attempt counter is left alone.
    pub fn exhaust(&mut self) {
        self.limit = RetryLimit::Limited(0);
    }

    /// Accounts for one disassociation.
    ///
    /// Increments the attempt counter only on [`RetryDecision::Reattempt`].
    /// Under an unlimited policy the counter saturates instead of wrapping.
    pub fn on_disassociation(&mut self) -> RetryDecision {
        if self.limit.allows(self.attempted) {
            self.attempted = self.attempted.saturating_add(1);
            RetryDecision::Reattempt
        } else {
            RetryDecision::GiveUp
        }
    }

    /// Clears the attempt counter after a successful address acquisition.
    pub fn reset_attempts(&mut self) {
        self.attempted = 0;
    }

    /// Re-attempts consumed since the policy was last armed or reset.
    pub fn attempted(&self) -> u8 {
        self.attempted
    }

    pub fn limit(&self) -> RetryLimit {
        self.limit
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new()
    }
}
