//! Error types for session establishment and command application.
//!
//! All transport-level faults funnel into [`EngineError`]. The batch runner
//! catches these at its boundary and converts them into report entries and
//! log records; they never propagate past the orchestrator.

use thiserror::Error;
use tokio::sync::mpsc::error::SendError;

/// Errors raised while establishing a session or applying commands to a device.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The session could not be established.
    ///
    /// Terminal for the affected device: no commands are attempted and no
    /// verification is performed.
    #[error("connection to {addr} failed: {reason}")]
    ConnectionFailed { addr: String, reason: String },

    /// Privileged or configuration mode could not be entered after login.
    ///
    /// Treated exactly like a connection failure: a Cisco-family session that
    /// never reaches a configuration context is unusable for applying commands.
    #[error("privileged mode not reached on {addr}: {reason}")]
    PrivilegedModeFailed { addr: String, reason: String },

    /// The device never produced a recognizable prompt during login.
    ///
    /// The error carries whatever output was received before giving up.
    #[error("timed out waiting for initial prompt: {0}")]
    InitTimeout(String),

    /// Command execution timed out.
    ///
    /// The error contains the partial output received before the timeout.
    #[error("command timed out: {0}")]
    ExecTimeout(String),

    /// The shell channel was closed by the remote side mid-session.
    #[error("channel disconnected")]
    ChannelDisconnect,

    /// The session has already been closed.
    #[error("session closed")]
    SessionClosed,

    /// An error occurred in the async-ssh2-tokio library.
    #[error("async ssh2 error: {0}")]
    Ssh2(#[from] async_ssh2_tokio::Error),

    /// An error occurred in the russh library.
    #[error("russh error: {0}")]
    Russh(#[from] russh::Error),

    /// Failed to send data through the shell channel.
    #[error("failed to send data: {0}")]
    SendData(#[from] SendError<String>),

    /// The audit log sink rejected a write.
    #[error("log sink error: {0}")]
    Journal(#[from] std::io::Error),

    /// The device inventory is malformed.
    #[error("invalid inventory: {0}")]
    InvalidInventory(String),
}

impl EngineError {
    /// True for errors that leave the session unusable for further commands.
    pub fn is_session_fatal(&self) -> bool {
        matches!(
            self,
            EngineError::ChannelDisconnect
                | EngineError::SessionClosed
                | EngineError::Ssh2(_)
                | EngineError::Russh(_)
                | EngineError::SendData(_)
        )
    }
}
