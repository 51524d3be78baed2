use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::RegistryConfig;
use crate::core::{NoteError, NoteId, PersonId, Result, Version};

/// Cause written by default when a name is entered without further details.
pub const DEFAULT_CAUSE_OF_DEATH: &str = "Heart attack";

/// Details written by default when a name is entered without further details.
pub const DEFAULT_DEATH_DETAILS: &str =
    "Automatic death by heart attack 40 seconds after entry (no details specified).";

/// Placeholder details while the detail form is open.
pub const AWAITING_DETAILS_PLACEHOLDER: &str =
    "Awaiting death detail specification (deadline extended to 400 seconds).";

/// Lifecycle status of a written person.
///
/// `DeadTimeout` and `DeadExplicit` are terminal; nothing transitions out of
/// them and `alive` is false exactly while one of them holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PersonStatus {
    /// Just written; dies of the default heart attack when the deadline lapses.
    Pending,
    /// The detail form is open; the deadline is extended from entry time.
    AwaitingDetails,
    /// An explicit future death time was supplied.
    ScheduledExplicit,
    /// Finalized by the scheduler because no explicit details arrived in time.
    DeadTimeout,
    /// Finalized at an explicitly supplied death time.
    DeadExplicit,
}

impl PersonStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PersonStatus::DeadTimeout | PersonStatus::DeadExplicit)
    }
}

/// A person written into a death note.
///
/// All transitions take `now` explicitly so the state machine is testable
/// without waiting on a wall clock. Persistence concerns (id and version
/// assignment) belong to the store; a freshly built record carries a nil id
/// and version 0 until inserted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: PersonId,
    pub name: String,
    pub alive: bool,
    pub status: PersonStatus,
    /// Set once at entry, never mutated afterwards.
    pub entry_time: DateTime<Utc>,
    /// The deadline the scheduler watches. None means no pending deadline.
    pub scheduled_death_time: Option<DateTime<Utc>>,
    /// Set only at finalization.
    pub death_date: Option<DateTime<Utc>>,
    pub death_details: Option<String>,
    pub cause_of_death: Option<String>,
    /// Opaque reference to an externally stored photo asset.
    pub face_photo: Option<String>,
    pub death_note_id: NoteId,
    pub version: Version,
}

impl Person {
    /// Builds the initial pending entry for a freshly written name.
    ///
    /// The person is alive, scheduled to die of the default heart attack
    /// `pending_deadline` after `now`.
    pub fn written(
        name: impl Into<String>,
        face_photo: Option<String>,
        death_note_id: NoteId,
        now: DateTime<Utc>,
        config: &RegistryConfig,
    ) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(NoteError::Validation("name cannot be empty".to_string()));
        }

        Ok(Self {
            id: Uuid::nil(),
            name,
            alive: true,
            status: PersonStatus::Pending,
            entry_time: now,
            scheduled_death_time: Some(now + config.pending_deadline),
            death_date: None,
            death_details: Some(DEFAULT_DEATH_DETAILS.to_string()),
            cause_of_death: Some(DEFAULT_CAUSE_OF_DEATH.to_string()),
            face_photo,
            death_note_id,
            version: 0,
        })
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// True when the scheduler should finalize this person at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.alive
            && !self.is_terminal()
            && self.scheduled_death_time.is_some_and(|t| t <= now)
    }

    /// Opens the detail-specification window: the deadline moves to
    /// `entry_time + detail_extension` and the details become a placeholder.
    /// The cause of death is left untouched.
    ///
    /// Returns false without mutating anything unless the person is still
    /// `Pending`: reopening the form, an explicit schedule, and finished
    /// records are all no-ops.
    pub fn begin_detail_specification(&mut self, config: &RegistryConfig) -> bool {
        if self.status != PersonStatus::Pending {
            return false;
        }

        self.status = PersonStatus::AwaitingDetails;
        self.scheduled_death_time = Some(self.entry_time + config.detail_extension);
        self.death_details = Some(AWAITING_DETAILS_PLACEHOLDER.to_string());
        true
    }

    /// Applies explicitly specified death details.
    ///
    /// A target at or before `now` (within `immediate_tolerance`) kills
    /// immediately; a future target reschedules the death. Attempting either
    /// on a finished record is a conflict.
    pub fn specify_death(
        &mut self,
        target: DateTime<Utc>,
        details: impl Into<String>,
        cause: impl Into<String>,
        now: DateTime<Utc>,
        config: &RegistryConfig,
    ) -> Result<()> {
        if self.is_terminal() {
            return Err(NoteError::Conflict(format!(
                "'{}' is already dead",
                self.name
            )));
        }

        self.death_details = Some(details.into());
        self.cause_of_death = Some(cause.into());

        if target <= now + config.immediate_tolerance {
            self.alive = false;
            self.status = PersonStatus::DeadExplicit;
            self.death_date = Some(target);
            self.scheduled_death_time = None;
        } else {
            self.alive = true;
            self.status = PersonStatus::ScheduledExplicit;
            self.scheduled_death_time = Some(target);
            self.death_date = None;
        }

        Ok(())
    }

    /// Finalizes an overdue person: the scheduled time becomes the death
    /// date and the record goes terminal. Scheduler-driven.
    ///
    /// Idempotent: returns false without re-mutating when the record is
    /// already dead, so a racing sweep that lost the write is harmless.
    pub fn finalize_overdue(&mut self) -> bool {
        if !self.alive {
            return false;
        }

        self.status = if self.status == PersonStatus::ScheduledExplicit {
            PersonStatus::DeadExplicit
        } else {
            PersonStatus::DeadTimeout
        };
        self.alive = false;
        self.death_date = self.scheduled_death_time.take();
        true
    }

    /// `alive == false` iff the status is terminal, and a pending deadline
    /// only ever belongs to a living, non-terminal record.
    pub fn invariants_hold(&self) -> bool {
        let terminal_consistent = self.alive != self.status.is_terminal();
        let schedule_consistent =
            self.scheduled_death_time.is_none() || (self.alive && !self.status.is_terminal());
        terminal_consistent && schedule_consistent
    }
}
