// Copyright (c) 2026 Anvil Systems
// SPDX-License-Identifier: AGPL-3.0
//! Introspection orchestration.
//!
//! `start_introspection` rejects bad requests before the node record is
//! touched; once the record's lock is acquired, every failure is captured
//! as the attempt's terminal error instead of being raised, so a claimed
//! node always reaches an observable terminal state and the lock never
//! leaks. `abort` is the companion cancellation entry point.

use crate::application::bmc::resolve_bmc_address;
use crate::application::preflight;
use crate::application::throttle::IntrospectionThrottle;
use crate::domain::client::{ClientError, ManagementClient};
use crate::domain::error::OperationError;
use crate::domain::filter::PxeFilter;
use crate::domain::node::{
    BootDevice, IpmiCredentialRequest, IpmiCredentials, Node, NodeId, PowerTarget,
};
use crate::domain::registry::{NodeRecord, NodeRegistry, RegistryError};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Terminal error recorded by `abort`.
pub const ABORT_ERROR: &str = "Canceled by operator";

/// Terminal error recorded when the critical section fails in a way it
/// could not describe itself.
pub const UNEXPECTED_ERROR: &str = "Unexpected error during introspection";

const NO_LOOKUP_ATTRIBUTES_ERROR: &str =
    "No lookup attributes were found; the node cannot be matched to its introspection data";

/// Feature flags consumed by the orchestrator (see
/// `infrastructure::config` for how they are loaded).
#[derive(Debug, Clone, Default)]
pub struct IntrospectionPolicy {
    /// Gates the credential-setting flavor of introspection entirely.
    pub enable_setting_ipmi_credentials: bool,
    /// Whether a fallback discovery hook is configured downstream. With a
    /// hook present, a node without ports or lookup attributes may still be
    /// resolved later, so it is not fatal here.
    pub node_not_found_hook: bool,
}

pub struct IntrospectionService {
    client: Arc<dyn ManagementClient>,
    registry: Arc<dyn NodeRegistry>,
    filter: Arc<dyn PxeFilter>,
    throttle: IntrospectionThrottle,
    policy: IntrospectionPolicy,
}

impl IntrospectionService {
    pub fn new(
        client: Arc<dyn ManagementClient>,
        registry: Arc<dyn NodeRegistry>,
        filter: Arc<dyn PxeFilter>,
        throttle: IntrospectionThrottle,
        policy: IntrospectionPolicy,
    ) -> Self {
        Self {
            client,
            registry,
            filter,
            throttle,
            policy,
        }
    }

    /// Start an introspection attempt for `node_id`.
    ///
    /// Returns `Err` only for rejections that happen before the node is
    /// claimed (validation, node lookup, power-interface health). A
    /// successful return acknowledges the attempt was started, not that the
    /// hardware actions succeeded; the authoritative outcome is the
    /// record's terminal state.
    pub async fn start_introspection(
        &self,
        node_id: &NodeId,
        credentials: Option<IpmiCredentialRequest>,
    ) -> Result<(), OperationError> {
        let node = self.fetch_node(node_id).await?;

        preflight::check_provision_state(
            node.provision_state.as_ref(),
            credentials.is_some(),
        )?;

        let credentials = match credentials {
            Some(request) => Some(preflight::validate_ipmi_credentials(
                &node,
                &request,
                self.policy.enable_setting_ipmi_credentials,
            )?),
            None => {
                self.check_power_interface(node_id).await?;
                None
            }
        };

        let bmc_address = resolve_bmc_address(&node.driver, &node.driver_info);
        let record = self
            .registry
            .start_introspection(node_id, bmc_address)
            .await
            .map_err(|err| OperationError::Registry(err.to_string()))?;

        record.acquire_lock(true).await;
        // Critical section. Nothing below may escape past the release:
        // panics are converted into the captured terminal error here at the
        // section boundary.
        let outcome = AssertUnwindSafe(self.run_locked(&node, record.as_ref(), credentials))
            .catch_unwind()
            .await;
        let terminal_error = match outcome {
            Ok(captured) => captured,
            Err(_) => {
                error!(node = %node.id, "introspection panicked inside the critical section");
                Some(UNEXPECTED_ERROR.to_string())
            }
        };
        if let Some(message) = terminal_error {
            record.finished(Some(message)).await;
        }
        record.release_lock().await;
        Ok(())
    }

    async fn fetch_node(&self, node_id: &NodeId) -> Result<Node, OperationError> {
        match self.client.get_node(node_id).await {
            Ok(node) => Ok(node),
            Err(ClientError::NotFound) => Err(OperationError::NodeNotFound(node_id.clone())),
            Err(err) => Err(OperationError::BadRequest {
                id: node_id.clone(),
                reason: err.to_string(),
            }),
        }
    }

    async fn check_power_interface(&self, node_id: &NodeId) -> Result<(), OperationError> {
        let validation = self
            .client
            .validate_power(node_id)
            .await
            .map_err(|err| OperationError::BadRequest {
                id: node_id.clone(),
                reason: err.to_string(),
            })?;
        if !validation.ok {
            return Err(OperationError::PowerValidationFailed {
                reason: validation
                    .reason
                    .unwrap_or_else(|| "no reason reported".to_string()),
            });
        }
        Ok(())
    }

    /// The locked portion of an attempt. Returns the terminal error to
    /// capture, if any; never propagates. The first failure observed wins,
    /// later ones are only logged.
    async fn run_locked(
        &self,
        node: &Node,
        record: &dyn NodeRecord,
        credentials: Option<IpmiCredentials>,
    ) -> Option<String> {
        let mut captured: Option<String> = None;

        let ports = record.ports().await;
        if ports.is_empty() {
            if !record.has_lookup_attributes().await && !self.policy.node_not_found_hook {
                warn!(
                    node = %node.id,
                    "no ports and no lookup attributes; aborting the attempt"
                );
                return Some(NO_LOOKUP_ATTRIBUTES_ERROR.to_string());
            }
        } else {
            let macs: Vec<String> = ports.iter().map(|port| port.address.clone()).collect();
            info!(node = %node.id, macs = ?macs, "registering MAC lookup attribute");
            record.add_mac_attribute(macs).await;
            if let Err(err) = self.filter.update_filters().await {
                // Intentional: a filter-sync failure is recorded but does
                // not stop credential staging or power control.
                warn!(node = %node.id, error = %err, "PXE filter synchronization failed");
                captured
                    .get_or_insert_with(|| format!("Failed to synchronize PXE filters: {err}"));
            }
        }

        record.set_ipmi_credentials_option(credentials.clone()).await;

        if credentials.is_none() {
            self.throttle.pace(&node.driver).await;
            if let Err(err) = self
                .client
                .set_boot_device(&node.id, BootDevice::Pxe, false)
                .await
            {
                warn!(node = %node.id, error = %err, "failed to set boot device to PXE");
                captured
                    .get_or_insert_with(|| format!("Failed to set boot device to PXE: {err}"));
            }
            if let Err(err) = self
                .client
                .set_power_state(&node.id, PowerTarget::Reboot)
                .await
            {
                warn!(node = %node.id, error = %err, "failed to reboot the node");
                captured.get_or_insert_with(|| format!("Failed to reboot the node: {err}"));
            }
        } else {
            // The node cannot be power-cycled while the staged credentials
            // are not yet applied out-of-band.
            info!(node = %node.id, "credential change staged, skipping boot and power control");
        }

        captured
    }

    /// Cancel a running attempt.
    ///
    /// Idempotent for already-finished records. Lock contention and unknown
    /// nodes are the only propagated failures; filter and power-off
    /// failures are swallowed so the record always reaches its canceled
    /// terminal state.
    pub async fn abort(&self, node_id: &NodeId) -> Result<(), OperationError> {
        let record = self
            .registry
            .get_node(node_id, false)
            .await
            .map_err(|err| match err {
                RegistryError::NotFound(id) => OperationError::NodeNotFound(id),
                other => OperationError::Registry(other.to_string()),
            })?;

        if !record.acquire_lock(false).await {
            return Err(OperationError::NodeLocked(node_id.clone()));
        }

        if record.finished_at().await.is_some() {
            record.release_lock().await;
            return Ok(());
        }

        if let Err(err) = self.filter.update_filters().await {
            warn!(node = %node_id, error = %err, "PXE filter synchronization failed during abort");
        }
        if let Err(err) = self.client.set_power_state(node_id, PowerTarget::Off).await {
            warn!(node = %node_id, error = %err, "failed to power off the node during abort");
        }

        info!(node = %node_id, "introspection canceled");
        record.finished(Some(ABORT_ERROR.to_string())).await;
        record.release_lock().await;
        Ok(())
    }
}
