//! Per-device batch application.
//!
//! [`run_batch`] owns the whole lifecycle of one device's run: open a
//! session, apply the batch in order, classify every response, verify, close.
//! Network configuration is not transactional (there is no rollback across
//! commands), so the runner optimizes for maximum visibility into partial
//! success: one command's failure never aborts the remaining batch (unless
//! the caller opts into [`FaultPolicy::SkipRemaining`]), and every attempt
//! leaves exactly one report entry and one journal record.
//!
//! No error escapes this boundary; callers always get a complete
//! [`BatchReport`], possibly marked as a connection failure.

use std::time::Duration;

use log::debug;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::classify::{Outcome, classify};
use crate::device::{CommandBatch, DeviceDescriptor};
use crate::journal::{EventLog, LogStatus};
use crate::report::{BatchReport, CommandResult};
use crate::session::{DeviceSession, SessionFactory};
use crate::verify;

/// What to do with the rest of a batch after a transport fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum FaultPolicy {
    /// Keep attempting the remaining commands (best-effort baseline).
    #[default]
    ContinueBatch,
    /// Mark the session unusable after the first session-fatal fault and
    /// record the remaining commands as skipped instead of sending them.
    SkipRemaining,
}

/// Caller-tunable runner behavior.
#[derive(Debug, Clone, Default)]
pub struct RunnerOptions {
    pub fault_policy: FaultPolicy,
    /// Per-command deadline. A command that exceeds it gets a
    /// timeout-specific record and aborts the remaining batch for this
    /// device only. `None` leaves pacing to the transport's own guard.
    pub command_timeout: Option<Duration>,
}

/// Applies one device's command batch and returns the complete report.
pub async fn run_batch<F: SessionFactory>(
    factory: &F,
    descriptor: &DeviceDescriptor,
    batch: &CommandBatch,
    journal: &EventLog,
    options: &RunnerOptions,
) -> BatchReport {
    let addr = descriptor.addr.as_str();
    let _ = journal.marker(&format!("Inicio configuración {addr}"));

    let mut session = match factory.open(descriptor).await {
        Ok(session) => session,
        Err(err) => {
            let reason = err.to_string();
            let _ = journal.record(LogStatus::Error, addr, "conexión", &reason);
            let _ = journal.marker(&format!("Fin configuración {addr}"));
            return BatchReport::connection_failed(addr, reason);
        }
    };
    let _ = journal.record(LogStatus::Ok, addr, "conexión", "sesión establecida");

    let mut report = BatchReport::started(addr);
    let mut skip_reason: Option<String> = None;

    for command in batch.iter() {
        if let Some(reason) = &skip_reason {
            let _ = journal.record(LogStatus::Exception, addr, command, reason);
            report.push(CommandResult::skipped(command, reason.clone()));
            continue;
        }

        let attempt = match options.command_timeout {
            Some(limit) => match tokio::time::timeout(limit, session.apply_command(command)).await
            {
                Ok(result) => result,
                Err(_) => {
                    let detail =
                        format!("timeout: command exceeded {}s deadline", limit.as_secs());
                    let _ = journal.record(LogStatus::Exception, addr, command, &detail);
                    report.push(CommandResult::exception(command, detail));
                    skip_reason =
                        Some("skipped: batch aborted after command timeout".to_string());
                    continue;
                }
            },
            None => session.apply_command(command).await,
        };

        match attempt {
            Ok(raw) => match classify(descriptor.family, &raw) {
                Outcome::Applied => {
                    let _ = journal.record(LogStatus::Ok, addr, command, raw.trim());
                    report.push(CommandResult::applied(command, raw));
                }
                Outcome::Rejected => {
                    let _ = journal.record(LogStatus::Error, addr, command, raw.trim());
                    report.push(CommandResult::rejected(command, raw));
                }
            },
            Err(err) => {
                let session_fatal = err.is_session_fatal();
                let detail = err.to_string();
                let _ = journal.record(LogStatus::Exception, addr, command, &detail);
                report.push(CommandResult::exception(command, detail));
                if session_fatal && options.fault_policy == FaultPolicy::SkipRemaining {
                    skip_reason = Some(
                        "skipped: session marked unusable after transport fault".to_string(),
                    );
                }
            }
        }
    }

    // Surface actual device state even when commands were rejected.
    report.verification =
        verify::verify(&mut session, descriptor.family, descriptor.role, addr, journal).await;

    if let Err(err) = session.close().await {
        debug!("{} error while closing session: {}", addr, err);
    }
    let _ = journal.marker(&format!("Fin configuración {addr}"));

    report
}
