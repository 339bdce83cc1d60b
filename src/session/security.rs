//! Per-device SSH transport policy.
//!
//! Legacy-algorithm compatibility is a property of one device, not of the
//! process: each [`crate::device::DeviceDescriptor`] carries its own
//! [`TransportPolicy`], which maps to a `russh` [`Preferred`] algorithm table
//! from [`crate::config`].

use std::borrow::Cow;

use async_ssh2_tokio::ServerCheckMethod;
use russh::Preferred;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::config;

/// SSH algorithm tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum SecurityLevel {
    /// Strict modern algorithms (default).
    #[default]
    Secure,
    /// Adds SHA-1 era key exchange, CBC ciphers and `ssh-rsa` host keys for
    /// old device firmware that offers nothing newer.
    LegacyCompatible,
}

/// Server host key verification policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum HostKeyPolicy {
    /// Verify against the default known-hosts file.
    #[default]
    DefaultKnownHosts,
    /// Accept any host key. Lab and legacy-device use only.
    NoCheck,
}

/// Transport options applied when establishing a device connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
pub struct TransportPolicy {
    /// SSH algorithm policy.
    #[serde(default)]
    pub level: SecurityLevel,
    /// Host key verification method.
    #[serde(default)]
    pub host_key: HostKeyPolicy,
}

impl TransportPolicy {
    /// Secure-by-default profile (recommended).
    pub fn secure_default() -> Self {
        Self {
            level: SecurityLevel::Secure,
            host_key: HostKeyPolicy::DefaultKnownHosts,
        }
    }

    /// Legacy compatibility profile for older devices.
    pub fn legacy_compatible() -> Self {
        Self {
            level: SecurityLevel::LegacyCompatible,
            host_key: HostKeyPolicy::NoCheck,
        }
    }

    pub(crate) fn server_check(&self) -> ServerCheckMethod {
        match self.host_key {
            HostKeyPolicy::DefaultKnownHosts => ServerCheckMethod::DefaultKnownHostsFile,
            HostKeyPolicy::NoCheck => ServerCheckMethod::NoCheck,
        }
    }

    pub(crate) fn preferred(&self) -> Preferred {
        match self.level {
            SecurityLevel::Secure => Preferred {
                kex: Cow::Borrowed(config::SECURE_KEX_ORDER),
                key: Cow::Borrowed(config::SECURE_KEY_TYPES),
                cipher: Cow::Borrowed(config::SECURE_CIPHERS),
                mac: Cow::Borrowed(config::SECURE_MAC_ALGORITHMS),
                compression: Cow::Borrowed(config::DEFAULT_COMPRESSION_ALGORITHMS),
            },
            SecurityLevel::LegacyCompatible => Preferred {
                kex: Cow::Borrowed(config::LEGACY_KEX_ORDER),
                key: Cow::Borrowed(config::LEGACY_KEY_TYPES),
                cipher: Cow::Borrowed(config::LEGACY_CIPHERS),
                mac: Cow::Borrowed(config::LEGACY_MAC_ALGORITHMS),
                compression: Cow::Borrowed(config::DEFAULT_COMPRESSION_ALGORITHMS),
            },
        }
    }
}
