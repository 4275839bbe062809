//! Periodic cleanup of capabilities that can never resolve again.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::{Capability, Expiry, FileId, Handles, ShareError, Validity};

/// Counters from one sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Capabilities looked at
    pub examined: usize,
    /// Capabilities deleted
    pub purged: usize,
    /// Deletions that failed
    pub failed: usize,
}

/// Deletes capabilities that are revoked or expired for longer than a grace
/// period, or whose file no longer exists.
///
/// Expiry and revocation are enforced when a link is resolved, so the
/// sweeper only reclaims space. The grace period keeps recently dead links
/// visible to their owners for a while.
#[derive(Debug, Clone)]
pub struct Sweeper {
    handles: Handles,
    grace: Duration,
}

impl Sweeper {
    /// A sweeper with a grace period of seven days
    pub fn new(handles: Handles) -> Self {
        Self {
            handles,
            grace: Duration::days(7),
        }
    }

    /// Replace the grace period. Negative periods count as zero.
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace.max(Duration::zero());
        self
    }

    /// The grace period in effect
    pub fn grace(&self) -> Duration {
        self.grace
    }

    fn is_stale(&self, capability: &Capability, now: DateTime<Utc>) -> bool {
        if capability.validate(now) == Validity::Active {
            return false;
        }
        if capability.is_revoked() {
            return capability
                .revoked_at()
                .is_none_or(|at| now >= at + self.grace);
        }
        match capability.expires_at() {
            Expiry::At(at) => now >= at + self.grace,
            Expiry::Never => false,
        }
    }

    /// Run one pass
    pub async fn sweep(&self) -> Result<SweepReport, ShareError> {
        let now = self.handles.clock.now();
        let mut report = SweepReport::default();
        let mut file_exists: HashMap<FileId, bool> = HashMap::new();

        for capability in self.handles.shares.all().await? {
            report.examined += 1;

            let orphaned = match file_exists.get(capability.file()) {
                Some(exists) => !exists,
                None => {
                    let exists = self
                        .handles
                        .files
                        .get_file(capability.file())
                        .await?
                        .is_some();
                    file_exists.insert(capability.file().clone(), exists);
                    !exists
                }
            };

            if !orphaned && !self.is_stale(&capability, now) {
                continue;
            }

            match self.handles.shares.delete(capability.id()).await {
                Ok(_) => report.purged += 1,
                Err(error) => {
                    tracing::warn!(share = %capability.id(), %error, "Sweeper failed to delete share");
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    /// Sweep every `period`, forever. Failures are logged and the next tick
    /// tries again.
    pub async fn run(self, period: std::time::Duration) {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            match self.sweep().await {
                Ok(report) if report.purged > 0 || report.failed > 0 => {
                    tracing::info!(
                        examined = report.examined,
                        purged = report.purged,
                        failed = report.failed,
                        "Swept shares"
                    );
                }
                Ok(_) => tracing::debug!("Sweep found nothing to purge"),
                Err(error) => tracing::warn!(%error, "Sweep failed"),
            }
        }
    }
}
