// Copyright (c) 2026 Anvil Systems
// SPDX-License-Identifier: AGPL-3.0

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Opaque, externally assigned node identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle label assigned to a node by the external provisioning
/// orchestrator. Only a subset of states permits introspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProvisionState {
    Enroll,
    Manageable,
    Inspecting,
    InspectFailed,
    Available,
    Active,
    /// States this core does not interpret, carried verbatim.
    Other(String),
}

impl ProvisionState {
    pub fn as_str(&self) -> &str {
        match self {
            ProvisionState::Enroll => "enroll",
            ProvisionState::Manageable => "manageable",
            ProvisionState::Inspecting => "inspecting",
            ProvisionState::InspectFailed => "inspect failed",
            ProvisionState::Available => "available",
            ProvisionState::Active => "active",
            ProvisionState::Other(state) => state,
        }
    }
}

impl From<String> for ProvisionState {
    fn from(value: String) -> Self {
        match value.as_str() {
            "enroll" => ProvisionState::Enroll,
            "manageable" => ProvisionState::Manageable,
            "inspecting" => ProvisionState::Inspecting,
            "inspect failed" => ProvisionState::InspectFailed,
            "available" => ProvisionState::Available,
            "active" => ProvisionState::Active,
            _ => ProvisionState::Other(value),
        }
    }
}

impl From<ProvisionState> for String {
    fn from(state: ProvisionState) -> Self {
        state.as_str().to_string()
    }
}

impl fmt::Display for ProvisionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The node as reported by the hardware-management API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    #[serde(rename = "uuid")]
    pub id: NodeId,
    pub driver: String,
    #[serde(default)]
    pub driver_info: HashMap<String, String>,
    #[serde(default)]
    pub provision_state: Option<ProvisionState>,
    #[serde(default)]
    pub power_state: Option<String>,
}

/// Boot device requested through the out-of-band interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BootDevice {
    Pxe,
}

impl BootDevice {
    pub fn as_str(&self) -> &str {
        match self {
            BootDevice::Pxe => "pxe",
        }
    }
}

/// Power transition requested through the out-of-band interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerTarget {
    Reboot,
    Off,
}

impl PowerTarget {
    pub fn as_str(&self) -> &str {
        match self {
            PowerTarget::Reboot => "reboot",
            PowerTarget::Off => "off",
        }
    }
}

/// Result of the management API's power interface health check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerValidation {
    #[serde(rename = "result")]
    pub ok: bool,
    #[serde(default)]
    pub reason: Option<String>,
}

/// A network port attached to a node, as known to the node registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    pub uuid: Uuid,
    /// Hardware (MAC) address of the port.
    pub address: String,
}

impl Port {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            address: address.into(),
        }
    }
}

/// IPMI 2.0 caps passwords at 20 bytes.
pub const MAX_IPMI_PASSWORD_LENGTH: usize = 20;

/// Validated IPMI credential pair staged on a record for out-of-band
/// application after the next reboot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpmiCredentials {
    pub username: String,
    pub password: String,
}

/// A requested credential change, before validation. The username may be
/// absent; a driver-supplied default is substituted during preflight.
#[derive(Debug, Clone)]
pub struct IpmiCredentialRequest {
    pub username: Option<String>,
    pub password: String,
}
