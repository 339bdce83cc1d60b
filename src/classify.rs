//! Command outcome classification.
//!
//! Network CLIs do not return machine-readable status codes over a PTY, so
//! the only signal whether a configuration command was accepted is the text
//! the device echoes back. [`classify`] applies a small family-specific set of
//! rejection keywords to that text.
//!
//! This is a heuristic, not a protocol-level success code: output that
//! legitimately contains one of the keywords (a VLAN literally named "Error",
//! a RouterOS comment containing "invalid") will classify as rejected. The
//! keyword sets deliberately match the device families' stock error wording
//! and nothing more.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::device::DeviceFamily;

/// Rejection markers echoed by Cisco IOS for refused commands.
const CISCO_REJECTION_MARKERS: &[&str] = &["Invalid input", "Error"];

/// Rejection markers echoed by MikroTik RouterOS for refused commands.
const MIKROTIK_REJECTION_MARKERS: &[&str] = &["failure", "error", "invalid"];

/// Classification of a single command's device response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The device accepted the command.
    Applied,
    /// The device answered with an error-pattern response.
    Rejected,
}

/// Classifies raw command output for a device family.
///
/// Case-sensitive substring search; any marker match means [`Outcome::Rejected`],
/// otherwise [`Outcome::Applied`]. Pure and total: this function never fails,
/// and repeated classification of the same output is stable.
pub fn classify(family: DeviceFamily, raw_output: &str) -> Outcome {
    let markers = match family {
        DeviceFamily::CiscoIos => CISCO_REJECTION_MARKERS,
        DeviceFamily::MikrotikRouterOs => MIKROTIK_REJECTION_MARKERS,
    };

    if markers.iter().any(|marker| raw_output.contains(marker)) {
        Outcome::Rejected
    } else {
        Outcome::Applied
    }
}
