// ============================================================================
// Death Scheduler
// ============================================================================
//
// A single cooperative polling loop, not a per-person timer: each tick scans
// the store for everyone whose deadline has elapsed and finalizes each match
// independently. Per-record failures are reported and logged, never
// propagated, because one bad record must not stop the reconciliation of
// the rest.

pub mod worker;

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use log::{debug, error, info};
use serde::{Deserialize, Serialize};

use crate::config::RegistryConfig;
use crate::core::{PersonId, Result};
use crate::storage::PersonStore;

pub use worker::SchedulerWorker;

/// Outcome of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    /// People the scan found overdue.
    pub matched: usize,
    /// Finalized by this sweep.
    pub finalized: usize,
    /// Could not be finalized; logged and left for the next sweep.
    pub failed: usize,
}

impl fmt::Display for SweepReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} matched, {} finalized, {} failed",
            self.matched, self.finalized, self.failed
        )
    }
}

enum FinalizeOutcome {
    Finalized,
    /// Another writer settled the record first (finalized, rescheduled, or
    /// deleted it); the record is consistent and nothing is left to do.
    AlreadySettled,
    Failed,
}

/// Scans for overdue people and drives them to a terminal state.
#[derive(Clone)]
pub struct DeathScheduler {
    people: Arc<dyn PersonStore>,
    config: RegistryConfig,
}

impl DeathScheduler {
    pub fn new(people: Arc<dyn PersonStore>, config: RegistryConfig) -> Self {
        Self { people, config }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Runs one sweep at `now`.
    ///
    /// Matches are finalized concurrently and independently; ordering
    /// between different people is unspecified. Errors from the initial
    /// scan propagate, per-record errors only show up in the report.
    pub async fn run_tick(&self, now: DateTime<Utc>) -> Result<SweepReport> {
        let due = self.people.find_due(now).await?;
        if due.is_empty() {
            debug!("sweep at {now}: nothing due");
            return Ok(SweepReport::default());
        }

        debug!("sweep at {now}: {} people due", due.len());

        let outcomes = join_all(due.iter().map(|person| self.finalize_one(person.id, now))).await;

        let mut report = SweepReport {
            matched: due.len(),
            ..SweepReport::default()
        };
        for outcome in outcomes {
            match outcome {
                FinalizeOutcome::Finalized => report.finalized += 1,
                FinalizeOutcome::AlreadySettled => {}
                FinalizeOutcome::Failed => report.failed += 1,
            }
        }

        info!("sweep at {now}: {report}");
        Ok(report)
    }

    /// Optimistic read-modify-write on a single person.
    ///
    /// Always re-reads before writing: the scan result may be stale by the
    /// time this runs. A record that turns out dead, rescheduled, or gone is
    /// already consistent and counts as settled, not failed.
    async fn finalize_one(&self, person_id: PersonId, now: DateTime<Utc>) -> FinalizeOutcome {
        for _ in 0..self.config.write_retry_limit {
            let current = match self.people.get(person_id).await {
                Ok(Some(person)) => person,
                Ok(None) => return FinalizeOutcome::AlreadySettled,
                Err(err) => {
                    error!("sweep: reload of {person_id} failed: {err}");
                    return FinalizeOutcome::Failed;
                }
            };

            if !current.is_due(now) {
                return FinalizeOutcome::AlreadySettled;
            }

            let mut next = current;
            next.finalize_overdue();

            match self.people.update(&next).await {
                Ok(saved) => {
                    debug!(
                        "sweep: finalized '{}' ({}), died {:?}",
                        saved.name, saved.id, saved.death_date
                    );
                    return FinalizeOutcome::Finalized;
                }
                Err(err) if err.is_version_conflict() => continue,
                Err(err) => {
                    error!("sweep: could not save {person_id}: {err}");
                    return FinalizeOutcome::Failed;
                }
            }
        }

        error!("sweep: gave up on {person_id} after repeated write conflicts");
        FinalizeOutcome::Failed
    }
}
