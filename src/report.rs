//! Batch results and the human-readable run summary.
//!
//! Failure handling is carried in values, not exceptions: every command
//! attempt produces exactly one [`CommandResult`] with an explicit
//! [`AttemptOutcome`] tag, and a device's whole run is summarized by a
//! [`BatchReport`] the orchestrator can render and discard.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Outcome tag of one command attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// The device accepted the command.
    Applied,
    /// The device answered with an error-pattern response.
    Rejected,
    /// A transport-level fault occurred while sending the command.
    Exception,
    /// Not attempted: the session was marked unusable by an earlier fault.
    Skipped,
}

/// Result of one command attempt, immutable once created.
///
/// Retained only for the duration of one batch run; the audit trail lives in
/// the journal.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CommandResult {
    /// The command as supplied by the caller.
    pub command: String,
    /// Raw device output (empty for exceptions and skips).
    pub output: String,
    pub outcome: AttemptOutcome,
    /// Error detail when no device-level response is available.
    pub detail: Option<String>,
}

impl CommandResult {
    pub fn applied(command: &str, output: String) -> Self {
        Self {
            command: command.to_string(),
            output,
            outcome: AttemptOutcome::Applied,
            detail: None,
        }
    }

    pub fn rejected(command: &str, output: String) -> Self {
        Self {
            command: command.to_string(),
            output,
            outcome: AttemptOutcome::Rejected,
            detail: None,
        }
    }

    pub fn exception(command: &str, detail: String) -> Self {
        Self {
            command: command.to_string(),
            output: String::new(),
            outcome: AttemptOutcome::Exception,
            detail: Some(detail),
        }
    }

    pub fn skipped(command: &str, detail: String) -> Self {
        Self {
            command: command.to_string(),
            output: String::new(),
            outcome: AttemptOutcome::Skipped,
            detail: Some(detail),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.outcome == AttemptOutcome::Applied
    }

    /// Why the attempt failed: the error detail when present, otherwise the
    /// device's own response text.
    pub fn failure_reason(&self) -> &str {
        match &self.detail {
            Some(detail) => detail.as_str(),
            None => self.output.as_str(),
        }
    }
}

/// Whether a device's session was usable for the batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SessionStatus {
    /// Session opened; the batch ran (individual commands may have failed).
    Completed,
    /// Session never opened; no commands were attempted.
    ConnectionFailed { reason: String },
}

/// Output of one read-only verification command.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct VerificationEntry {
    pub command: String,
    pub output: String,
}

/// Everything that happened on one device during a batch run.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BatchReport {
    /// Device address.
    pub device: String,
    /// Applied commands, in batch order.
    pub changes: Vec<CommandResult>,
    /// Rejected, faulted and skipped commands, in batch order.
    pub errors: Vec<CommandResult>,
    pub session: SessionStatus,
    /// Post-batch verification outputs (empty when the session never opened).
    pub verification: Vec<VerificationEntry>,
}

impl BatchReport {
    /// An empty report for a device whose batch is about to run.
    pub fn started(device: &str) -> Self {
        Self {
            device: device.to_string(),
            changes: Vec::new(),
            errors: Vec::new(),
            session: SessionStatus::Completed,
            verification: Vec::new(),
        }
    }

    /// A terminal report for a device that could not be reached.
    pub fn connection_failed(device: &str, reason: String) -> Self {
        Self {
            device: device.to_string(),
            changes: Vec::new(),
            errors: Vec::new(),
            session: SessionStatus::ConnectionFailed { reason },
            verification: Vec::new(),
        }
    }

    /// Files a result into the changes or errors list by its outcome.
    pub fn push(&mut self, result: CommandResult) {
        if result.succeeded() {
            self.changes.push(result);
        } else {
            self.errors.push(result);
        }
    }

    /// Total command attempts recorded; always equals the batch length for a
    /// device whose session opened.
    pub fn command_count(&self) -> usize {
        self.changes.len() + self.errors.len()
    }

    pub fn completed(&self) -> bool {
        self.session == SessionStatus::Completed
    }

    /// Human-readable per-device summary: applied commands, failed commands
    /// with reasons, then verification outputs.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "=== Device {} ===", self.device);

        if let SessionStatus::ConnectionFailed { reason } = &self.session {
            let _ = writeln!(out, "!! connection failed: {reason}");
            return out;
        }

        let _ = writeln!(out, "-- Applied --");
        for result in &self.changes {
            let _ = writeln!(out, "✔ {}", result.command);
        }

        if !self.errors.is_empty() {
            let _ = writeln!(out, "-- Errors --");
            for result in &self.errors {
                let _ = writeln!(out, "✘ {} -> {}", result.command, result.failure_reason());
            }
        }

        if !self.verification.is_empty() {
            let _ = writeln!(out, "-- Verification --");
            for entry in &self.verification {
                let _ = writeln!(out, "$ {}", entry.command);
                let _ = writeln!(out, "{}", entry.output.trim_end());
            }
        }

        out
    }
}

/// Success policy for the overall run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExitPolicy {
    /// Success as long as every device's session opened, even if individual
    /// commands were rejected. Matches best-effort apply semantics.
    #[default]
    ConnectivityOnly,
    /// Any rejected or faulted command fails the run.
    Strict,
}

/// All device reports of one run, in processing order.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RunSummary {
    pub reports: Vec<BatchReport>,
}

impl RunSummary {
    /// Applies the chosen exit policy to the collected reports.
    pub fn succeeded(&self, policy: ExitPolicy) -> bool {
        match policy {
            ExitPolicy::ConnectivityOnly => self.reports.iter().all(BatchReport::completed),
            ExitPolicy::Strict => self
                .reports
                .iter()
                .all(|report| report.completed() && report.errors.is_empty()),
        }
    }
}
