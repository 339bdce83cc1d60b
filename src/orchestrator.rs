//! Run-level orchestration.
//!
//! Processes the inventory strictly in order (switches first, then routers,
//! one device at a time, one command at a time) because configuration
//! commands depend on state established by earlier ones. Device failures are
//! isolated at the runner boundary: the orchestrator only ever sees completed
//! [`BatchReport`]s, so one unreachable device never stops the run.

use crate::device::Inventory;
use crate::journal::EventLog;
use crate::report::{BatchReport, RunSummary};
use crate::runner::{RunnerOptions, run_batch};
use crate::session::SessionFactory;

/// Applies every device's batch and collects all reports.
///
/// Emits start/end marker records bracketing the whole run.
pub async fn run_all<F: SessionFactory>(
    factory: &F,
    inventory: &Inventory,
    journal: &EventLog,
    options: &RunnerOptions,
) -> RunSummary {
    let _ = journal.marker("=== EJECUCIÓN GENERAL INICIADA ===");

    let mut reports: Vec<BatchReport> = Vec::with_capacity(inventory.device_count());
    for plan in inventory.plans() {
        let report = run_batch(factory, &plan.descriptor, &plan.batch, journal, options).await;
        reports.push(report);
    }

    let _ = journal.marker("=== EJECUCIÓN GENERAL FINALIZADA ===");
    RunSummary { reports }
}
