// Copyright (c) 2026 Anvil Systems
// SPDX-License-Identifier: AGPL-3.0
//! Node registry contract.
//!
//! The registry owns the per-node introspection record and its lock; this
//! core only holds a transient handle for the duration of one call. One
//! trait per aggregate, interface in the domain layer, implementations in
//! `crate::infrastructure::registry`.

use crate::domain::node::{IpmiCredentials, NodeId, Port};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("node {0} is not in the registry")]
    NotFound(NodeId),
    #[error("registry failure: {0}")]
    Internal(String),
}

/// Handle to one node's introspection record.
///
/// The record is exclusively mutable by the lock holder. `acquire_lock`
/// either waits (`blocking = true`) or probes (`blocking = false`, returning
/// `false` on contention); `release_lock` must be called exactly once per
/// successful acquisition.
#[async_trait]
pub trait NodeRecord: Send + Sync + std::fmt::Debug {
    fn node_id(&self) -> &NodeId;

    async fn acquire_lock(&self, blocking: bool) -> bool;

    async fn release_lock(&self);

    /// Network ports known for this node, in registration order.
    async fn ports(&self) -> Vec<Port>;

    /// Register hardware addresses under the `mac` lookup key. The
    /// attribute only ever grows.
    async fn add_mac_attribute(&self, macs: Vec<String>);

    /// Stage a pending credential change (`None` stages the explicit
    /// "no change" marker).
    async fn set_ipmi_credentials_option(&self, credentials: Option<IpmiCredentials>);

    /// Whether any lookup attribute has been registered for this node.
    async fn has_lookup_attributes(&self) -> bool;

    async fn finished_at(&self) -> Option<DateTime<Utc>>;

    /// Mark the attempt terminal. A non-`None` error records a failed
    /// attempt. Once terminal, later calls are ignored.
    async fn finished(&self, error: Option<String>);
}

#[async_trait]
pub trait NodeRegistry: Send + Sync {
    /// Create or refresh the record for a new introspection attempt and
    /// associate it with the resolved BMC address. The returned record is
    /// unlocked.
    async fn start_introspection(
        &self,
        node_id: &NodeId,
        bmc_address: Option<String>,
    ) -> Result<Arc<dyn NodeRecord>, RegistryError>;

    /// Fetch an existing record, optionally acquiring its lock first.
    async fn get_node(
        &self,
        node_id: &NodeId,
        locked: bool,
    ) -> Result<Arc<dyn NodeRecord>, RegistryError>;
}
