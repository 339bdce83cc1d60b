//! # netapply - Batch Configuration Apply-and-Report Engine
//!
//! `netapply` applies ordered batches of configuration commands to
//! heterogeneous network devices (Cisco IOS switches, MikroTik RouterOS
//! routers) over SSH, classifies every command's outcome from the device's
//! textual response, records each attempt in an append-only audit log, and
//! produces a verification report per device.
//!
//! ## Features
//!
//! - **Best-effort batches**: one rejected command never aborts the rest of
//!   a batch; one unreachable device never stops the run
//! - **Explicit outcomes**: every attempt is a tagged
//!   [`report::CommandResult`], never a hidden exception path
//! - **Family-aware framing**: config-mode command application for Cisco,
//!   single-command-per-call for MikroTik, behind one session trait
//! - **Legacy device compatibility**: per-device SSH algorithm policy for
//!   firmware that only offers outdated key exchange
//! - **Audit trail**: one timestamped log line per attempt, safe under
//!   concurrent writers
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use netapply::device::{
//!     CommandBatch, DeviceDescriptor, DeviceFamily, DevicePlan, DeviceRole, Inventory,
//! };
//! use netapply::journal::EventLog;
//! use netapply::orchestrator::run_all;
//! use netapply::report::ExitPolicy;
//! use netapply::runner::RunnerOptions;
//! use netapply::session::{SshFactory, TransportPolicy};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let switch = DeviceDescriptor {
//!         family: DeviceFamily::CiscoIos,
//!         addr: "10.10.18.57".to_string(),
//!         port: 22,
//!         username: "netadmin".to_string(),
//!         password: "secret".to_string(),
//!         enable_secret: Some("secret".to_string()),
//!         role: DeviceRole::Secondary,
//!         transport: TransportPolicy::legacy_compatible(),
//!     };
//!     let inventory = Inventory {
//!         switches: vec![DevicePlan {
//!             descriptor: switch,
//!             batch: CommandBatch::new(vec![
//!                 "vlan 290".to_string(),
//!                 "name Ventas".to_string(),
//!             ]),
//!         }],
//!         routers: Vec::new(),
//!     };
//!
//!     let journal = EventLog::to_file("netapply_log.txt")?;
//!     let summary = run_all(&SshFactory, &inventory, &journal, &RunnerOptions::default()).await;
//!
//!     for report in &summary.reports {
//!         print!("{}", report.render());
//!     }
//!     if !summary.succeeded(ExitPolicy::ConnectivityOnly) {
//!         std::process::exit(1);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Main Components
//!
//! - [`orchestrator::run_all`] - full-inventory run loop with fault isolation
//! - [`runner::run_batch`] - per-device open/apply/verify/close lifecycle
//! - [`classify::classify`] - response-text outcome heuristics per family
//! - [`session::DeviceSession`] - the transport capability the engine is
//!   generic over; [`session::SshFactory`] is the russh-backed implementation
//! - [`journal::EventLog`] - append-only audit log
//! - [`config`] - SSH algorithm tables for legacy device compatibility

pub mod classify;
pub mod config;
pub mod device;
pub mod error;
pub mod journal;
pub mod orchestrator;
pub mod report;
pub mod runner;
pub mod session;
pub mod verify;
