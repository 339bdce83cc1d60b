//! Device session transport layer.
//!
//! The engine only ever talks to a device through the [`DeviceSession`]
//! capability set: send one configuration command, send one read-only
//! command, close. [`SessionFactory`] opens sessions from descriptors. Both
//! are traits so the batch runner and orchestrator stay polymorphic over the
//! transport: the real SSH implementation lives in [`SshSession`], and tests
//! drive the engine with scripted sessions instead.
//!
//! # Main Components
//!
//! - [`DeviceSession`] / [`SessionFactory`] - the capability seam
//! - [`SshSession`] / [`SshFactory`] - russh-backed implementation
//! - [`TransportPolicy`] - per-device SSH algorithm and host-key policy

use crate::device::DeviceDescriptor;
use crate::error::EngineError;

mod security;
mod ssh;

pub use security::{HostKeyPolicy, SecurityLevel, TransportPolicy};
pub use ssh::{SshFactory, SshSession};

/// A connected, authenticated channel to one device.
///
/// For Cisco-family devices the session is already in a privileged
/// configuration context when handed out; [`apply_command`] runs there and
/// [`run_read_only`] runs in privileged exec. MikroTik-family sessions have a
/// single mode.
///
/// [`apply_command`]: DeviceSession::apply_command
/// [`run_read_only`]: DeviceSession::run_read_only
#[allow(async_fn_in_trait)]
pub trait DeviceSession {
    /// Sends one configuration command and returns the raw textual output.
    async fn apply_command(&mut self, command: &str) -> Result<String, EngineError>;

    /// Sends one read-only (show/print) command and returns the raw output.
    async fn run_read_only(&mut self, command: &str) -> Result<String, EngineError>;

    /// Releases the connection. Idempotent; must be safe to call after any
    /// earlier failure.
    async fn close(&mut self) -> Result<(), EngineError>;
}

/// Opens sessions from device descriptors.
///
/// Any failure here (unreachable host, failed authentication, privileged
/// mode not entered) is terminal for that device.
#[allow(async_fn_in_trait)]
pub trait SessionFactory {
    type Session: DeviceSession;

    async fn open(&self, descriptor: &DeviceDescriptor) -> Result<Self::Session, EngineError>;
}
