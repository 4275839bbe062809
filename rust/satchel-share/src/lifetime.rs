//! How long an access credential minted at resolution time stays valid.

use chrono::Duration;

/// Bounds applied to credentials handed to share-link visitors.
///
/// The granted lifetime is the smallest of the requested lifetime, the daily
/// cap, the object store's ceiling and the time the capability has left,
/// raised to at least the floor and finally capped at the ceiling again.
/// A capability about to expire therefore still yields a short but usable
/// credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifetimePolicy {
    /// Lifetime asked of the object store
    pub requested: Duration,
    /// Upper bound regardless of the capability
    pub daily_cap: Duration,
    /// Lower bound
    pub floor: Duration,
}

impl Default for LifetimePolicy {
    fn default() -> Self {
        Self {
            requested: Duration::hours(24),
            daily_cap: Duration::hours(24),
            floor: Duration::seconds(60),
        }
    }
}

impl LifetimePolicy {
    /// The lifetime to mint with, given the store's `ceiling` and the time
    /// `remaining` on the capability (`None` if it never expires).
    pub fn grant(&self, ceiling: Duration, remaining: Option<Duration>) -> Duration {
        let mut bounded = self.requested.min(self.daily_cap).min(ceiling);
        if let Some(remaining) = remaining {
            bounded = bounded.min(remaining);
        }
        bounded.max(self.floor).min(ceiling)
    }
}
