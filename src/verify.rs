//! Post-batch verification.
//!
//! After a batch attempt the runner issues a fixed, family-specific set of
//! read-only commands against the same session and surfaces their output, so
//! the operator sees the device's actual state, including after partial
//! failure. Primary-role devices additionally get their NAT table printed.

use crate::device::{DeviceFamily, DeviceRole};
use crate::journal::{EventLog, LogStatus};
use crate::report::VerificationEntry;
use crate::session::DeviceSession;

/// Read-only state inspection commands for Cisco switches.
const CISCO_VERIFY_COMMANDS: &[&str] = &["show vlan brief", "show interfaces trunk"];

/// Read-only state inspection commands for MikroTik routers.
const MIKROTIK_VERIFY_COMMANDS: &[&str] =
    &["/interface vlan print", "/ip address print", "/ip route print"];

/// Extra inspection for primary-role MikroTik routers.
const MIKROTIK_PRIMARY_VERIFY_COMMANDS: &[&str] = &["/ip firewall nat print"];

/// The verification command set for a family and role.
pub fn verification_commands(family: DeviceFamily, role: DeviceRole) -> Vec<&'static str> {
    match family {
        DeviceFamily::CiscoIos => CISCO_VERIFY_COMMANDS.to_vec(),
        DeviceFamily::MikrotikRouterOs => {
            let mut commands = MIKROTIK_VERIFY_COMMANDS.to_vec();
            if role == DeviceRole::Primary {
                commands.extend_from_slice(MIKROTIK_PRIMARY_VERIFY_COMMANDS);
            }
            commands
        }
    }
}

/// Runs the verification set against an open session.
///
/// Best-effort: a failing read is surfaced as that entry's output and logged,
/// and never aborts the remaining verification commands.
pub async fn verify<S: DeviceSession>(
    session: &mut S,
    family: DeviceFamily,
    role: DeviceRole,
    addr: &str,
    journal: &EventLog,
) -> Vec<VerificationEntry> {
    let mut entries = Vec::new();

    for command in verification_commands(family, role) {
        match session.run_read_only(command).await {
            Ok(output) => {
                let _ = journal.record(LogStatus::Ok, addr, command, "verificación");
                entries.push(VerificationEntry {
                    command: command.to_string(),
                    output,
                });
            }
            Err(err) => {
                let detail = err.to_string();
                let _ = journal.record(LogStatus::Exception, addr, command, &detail);
                entries.push(VerificationEntry {
                    command: command.to_string(),
                    output: detail,
                });
            }
        }
    }

    entries
}
