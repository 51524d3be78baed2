use chrono::Duration;

use crate::core::{NoteError, Result};

/// Registry timing and policy configuration
///
/// Every deadline the lifecycle and scheduler consume is overridable here;
/// the defaults match the classic death-note behavior (40 seconds until the
/// automatic heart attack, 400 seconds once the detail form is opened, a
/// sweep every 5 seconds).
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Deadline granted to a freshly written person before the automatic death.
    pub pending_deadline: Duration,

    /// Deadline (measured from entry time) once detail specification begins.
    pub detail_extension: Duration,

    /// Interval between two scheduler sweeps.
    pub sweep_interval: Duration,

    /// An explicit death time within this tolerance of "now" kills immediately.
    pub immediate_tolerance: Duration,

    /// How many times a conditional write is retried from a fresh read
    /// before the operation gives up with a conflict.
    pub write_retry_limit: usize,

    /// When set, at most one death note may be created with an initial owner.
    pub single_initial_owner: bool,
}

impl RegistryConfig {
    pub fn new() -> Self {
        Self {
            pending_deadline: Duration::seconds(40),
            detail_extension: Duration::seconds(400),
            sweep_interval: Duration::seconds(5),
            immediate_tolerance: Duration::seconds(1),
            write_retry_limit: 3,
            single_initial_owner: true,
        }
    }

    /// Set the default pending deadline
    pub fn pending_deadline(mut self, deadline: Duration) -> Self {
        self.pending_deadline = deadline;
        self
    }

    /// Set the extended deadline used while details are being specified
    pub fn detail_extension(mut self, extension: Duration) -> Self {
        self.detail_extension = extension;
        self
    }

    /// Set the scheduler sweep interval
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Set the tolerance under which an explicit death time counts as "now"
    pub fn immediate_tolerance(mut self, tolerance: Duration) -> Self {
        self.immediate_tolerance = tolerance;
        self
    }

    /// Set the conditional-write retry limit
    pub fn write_retry_limit(mut self, limit: usize) -> Self {
        self.write_retry_limit = limit;
        self
    }

    /// Enable or disable the single-initial-owner policy
    pub fn single_initial_owner(mut self, enabled: bool) -> Self {
        self.single_initial_owner = enabled;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.pending_deadline <= Duration::zero() {
            return Err(NoteError::Validation(
                "pending_deadline must be positive".to_string(),
            ));
        }

        if self.detail_extension <= Duration::zero() {
            return Err(NoteError::Validation(
                "detail_extension must be positive".to_string(),
            ));
        }

        if self.sweep_interval <= Duration::zero() {
            return Err(NoteError::Validation(
                "sweep_interval must be positive".to_string(),
            ));
        }

        if self.immediate_tolerance < Duration::zero() {
            return Err(NoteError::Validation(
                "immediate_tolerance cannot be negative".to_string(),
            ));
        }

        if self.write_retry_limit == 0 {
            return Err(NoteError::Validation(
                "write_retry_limit must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self::new()
    }
}
