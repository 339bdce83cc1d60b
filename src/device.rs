//! Device inventory data model.
//!
//! A [`DeviceDescriptor`] identifies one reachable device and how to talk to
//! it; a [`CommandBatch`] is the ordered list of configuration commands to
//! apply to it. Both are immutable caller-owned inputs; this engine never
//! generates command text or stores credentials.
//!
//! The [`Inventory`] groups descriptor/batch pairs by device class (switches
//! first, then routers) and is the typed configuration input the orchestrator
//! consumes. Callers typically build it in code or load it from JSON once at
//! process start.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::session::TransportPolicy;

/// Device family tag, dispatching family-specific framing, outcome keywords
/// and verification commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum DeviceFamily {
    /// Cisco IOS / IOS-XE style CLI: privileged exec plus configuration mode.
    CiscoIos,
    /// MikroTik RouterOS: single command per call, no mode switching.
    MikrotikRouterOs,
}

impl DeviceFamily {
    /// Stable lowercase identifier, matching common inventory conventions.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceFamily::CiscoIos => "cisco_ios",
            DeviceFamily::MikrotikRouterOs => "mikrotik_routeros",
        }
    }
}

/// Device role within the deployment.
///
/// Primary devices get extended verification (e.g. the NAT table) after a
/// batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeviceRole {
    Primary,
    #[default]
    Secondary,
}

/// Everything needed to open a session to one device.
///
/// Immutable once constructed; owned by the caller and borrowed by the engine
/// for the duration of a run.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DeviceDescriptor {
    /// Device family, selecting command framing and response heuristics.
    pub family: DeviceFamily,
    /// Host name or IP address.
    pub addr: String,
    /// SSH port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Login user.
    pub username: String,
    /// Login password.
    pub password: String,
    /// Privileged-mode secret for families that require one (Cisco `enable`).
    #[serde(default)]
    pub enable_secret: Option<String>,
    /// Role controlling extended verification.
    #[serde(default)]
    pub role: DeviceRole,
    /// SSH algorithm and host-key policy for this device.
    #[serde(default)]
    pub transport: TransportPolicy,
}

fn default_port() -> u16 {
    22
}

impl DeviceDescriptor {
    /// `user@addr:port` form used in diagnostics.
    pub fn endpoint(&self) -> String {
        format!("{}@{}:{}", self.username, self.addr, self.port)
    }
}

/// Ordered configuration commands for one device.
///
/// Order is significant: later commands may depend on state established by
/// earlier ones (an interface must exist before it can be put in access
/// mode), so the engine never reorders or parallelizes within a batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct CommandBatch {
    commands: Vec<String>,
}

impl CommandBatch {
    pub fn new(commands: Vec<String>) -> Self {
        Self { commands }
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().map(|c| c.as_str())
    }
}

impl From<Vec<String>> for CommandBatch {
    fn from(commands: Vec<String>) -> Self {
        Self { commands }
    }
}

impl From<&[&str]> for CommandBatch {
    fn from(commands: &[&str]) -> Self {
        Self {
            commands: commands.iter().map(|c| (*c).to_string()).collect(),
        }
    }
}

/// One device together with its command batch.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DevicePlan {
    pub descriptor: DeviceDescriptor,
    pub batch: CommandBatch,
}

/// Full run input: switches first, then routers, each processed in order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct Inventory {
    #[serde(default)]
    pub switches: Vec<DevicePlan>,
    #[serde(default)]
    pub routers: Vec<DevicePlan>,
}

impl Inventory {
    /// Parses an inventory from JSON.
    pub fn from_json(raw: &str) -> Result<Self, EngineError> {
        serde_json::from_str(raw).map_err(|err| EngineError::InvalidInventory(err.to_string()))
    }

    /// All device plans in run order (switches, then routers).
    pub fn plans(&self) -> impl Iterator<Item = &DevicePlan> {
        self.switches.iter().chain(self.routers.iter())
    }

    /// Total number of devices in the run.
    pub fn device_count(&self) -> usize {
        self.switches.len() + self.routers.len()
    }
}
