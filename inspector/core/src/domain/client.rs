// Copyright (c) 2026 Anvil Systems
// SPDX-License-Identifier: AGPL-3.0

use crate::domain::node::{BootDevice, Node, NodeId, PowerTarget, PowerValidation};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("not found")]
    NotFound,
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("transport failure: {0}")]
    Transport(String),
}

/// Out-of-band hardware-management client. The wire protocol is an
/// infrastructure concern; the orchestration core only depends on this
/// seam.
#[async_trait]
pub trait ManagementClient: Send + Sync {
    async fn get_node(&self, id: &NodeId) -> Result<Node, ClientError>;

    /// Health check of the node's power-management interface.
    async fn validate_power(&self, id: &NodeId) -> Result<PowerValidation, ClientError>;

    async fn set_boot_device(
        &self,
        id: &NodeId,
        device: BootDevice,
        persistent: bool,
    ) -> Result<(), ClientError>;

    async fn set_power_state(&self, id: &NodeId, target: PowerTarget)
        -> Result<(), ClientError>;
}
