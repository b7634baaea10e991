// Copyright (c) 2026 Anvil Systems
// SPDX-License-Identifier: AGPL-3.0
//! In-memory node registry.
//!
//! Backs development and testing; persistent backends live behind the same
//! `NodeRegistry` trait. Record state sits under a `parking_lot` mutex,
//! the per-record introspection lock is a one-permit semaphore so both
//! blocking and non-blocking acquisition fall out naturally.

use crate::domain::node::{IpmiCredentials, NodeId, Port};
use crate::domain::registry::{NodeRecord, NodeRegistry, RegistryError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::Semaphore;

#[derive(Debug, Default)]
struct RecordState {
    bmc_address: Option<String>,
    ports: Vec<Port>,
    mac_attribute: Vec<String>,
    /// `None` = never staged; `Some(None)` = staged "no change".
    ipmi_credentials: Option<Option<IpmiCredentials>>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
    error: Option<String>,
    lock_held: bool,
}

#[derive(Debug)]
pub struct CachedRecord {
    node_id: NodeId,
    lock: Semaphore,
    state: Mutex<RecordState>,
}

impl CachedRecord {
    fn new(node_id: NodeId) -> Self {
        Self {
            node_id,
            lock: Semaphore::new(1),
            state: Mutex::new(RecordState::default()),
        }
    }

    // Inspection accessors for callers that hold the concrete type
    // (tests, debug endpoints). The orchestration core only sees the
    // `NodeRecord` trait.

    pub fn bmc_address(&self) -> Option<String> {
        self.state.lock().bmc_address.clone()
    }

    pub fn mac_attribute(&self) -> Vec<String> {
        self.state.lock().mac_attribute.clone()
    }

    pub fn staged_credentials(&self) -> Option<Option<IpmiCredentials>> {
        self.state.lock().ipmi_credentials.clone()
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.state.lock().started_at
    }

    pub fn terminal_error(&self) -> Option<String> {
        self.state.lock().error.clone()
    }

    pub fn is_lock_held(&self) -> bool {
        self.state.lock().lock_held
    }
}

#[async_trait]
impl NodeRecord for CachedRecord {
    fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    async fn acquire_lock(&self, blocking: bool) -> bool {
        let acquired = if blocking {
            // The semaphore is never closed, acquire can only succeed.
            match self.lock.acquire().await {
                Ok(permit) => {
                    permit.forget();
                    true
                }
                Err(_) => false,
            }
        } else {
            match self.lock.try_acquire() {
                Ok(permit) => {
                    permit.forget();
                    true
                }
                Err(_) => false,
            }
        };
        if acquired {
            self.state.lock().lock_held = true;
        }
        acquired
    }

    async fn release_lock(&self) {
        let mut state = self.state.lock();
        if state.lock_held {
            state.lock_held = false;
            self.lock.add_permits(1);
        }
    }

    async fn ports(&self) -> Vec<Port> {
        self.state.lock().ports.clone()
    }

    async fn add_mac_attribute(&self, macs: Vec<String>) {
        let mut state = self.state.lock();
        for mac in macs {
            if !state.mac_attribute.contains(&mac) {
                state.mac_attribute.push(mac);
            }
        }
    }

    async fn set_ipmi_credentials_option(&self, credentials: Option<IpmiCredentials>) {
        self.state.lock().ipmi_credentials = Some(credentials);
    }

    async fn has_lookup_attributes(&self) -> bool {
        !self.state.lock().mac_attribute.is_empty()
    }

    async fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.state.lock().finished_at
    }

    async fn finished(&self, error: Option<String>) {
        let mut state = self.state.lock();
        if state.finished_at.is_none() {
            state.finished_at = Some(Utc::now());
            state.error = error;
        }
    }
}

#[derive(Default)]
pub struct InMemoryNodeRegistry {
    records: DashMap<NodeId, Arc<CachedRecord>>,
}

impl InMemoryNodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn record_entry(&self, node_id: &NodeId) -> Arc<CachedRecord> {
        self.records
            .entry(node_id.clone())
            .or_insert_with(|| Arc::new(CachedRecord::new(node_id.clone())))
            .value()
            .clone()
    }

    /// Seed the ports known for a node, creating its record if needed.
    pub fn seed_ports(&self, node_id: &NodeId, ports: Vec<Port>) {
        let record = self.record_entry(node_id);
        record.state.lock().ports = ports;
    }

    /// Concrete record handle, for inspection.
    pub fn record(&self, node_id: &NodeId) -> Option<Arc<CachedRecord>> {
        self.records.get(node_id).map(|entry| entry.value().clone())
    }
}

#[async_trait]
impl NodeRegistry for InMemoryNodeRegistry {
    async fn start_introspection(
        &self,
        node_id: &NodeId,
        bmc_address: Option<String>,
    ) -> Result<Arc<dyn NodeRecord>, RegistryError> {
        let record = self.record_entry(node_id);
        {
            let mut state = record.state.lock();
            state.bmc_address = bmc_address;
            state.started_at = Some(Utc::now());
            state.finished_at = None;
            state.error = None;
        }
        Ok(record)
    }

    async fn get_node(
        &self,
        node_id: &NodeId,
        locked: bool,
    ) -> Result<Arc<dyn NodeRecord>, RegistryError> {
        let record = self
            .records
            .get(node_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| RegistryError::NotFound(node_id.clone()))?;
        if locked {
            record.acquire_lock(true).await;
        }
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn non_blocking_acquire_fails_while_held() {
        let record = CachedRecord::new(NodeId::new("n1"));
        assert!(record.acquire_lock(false).await);
        assert!(!record.acquire_lock(false).await);
        record.release_lock().await;
        assert!(record.acquire_lock(false).await);
    }

    #[tokio::test]
    async fn blocking_acquire_waits_for_release() {
        let record = Arc::new(CachedRecord::new(NodeId::new("n1")));
        assert!(record.acquire_lock(true).await);

        let contender = record.clone();
        let waiter = tokio::spawn(async move { contender.acquire_lock(true).await });
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        record.release_lock().await;
        assert!(waiter.await.unwrap());
    }

    #[tokio::test]
    async fn double_release_does_not_mint_extra_permits() {
        let record = CachedRecord::new(NodeId::new("n1"));
        assert!(record.acquire_lock(false).await);
        record.release_lock().await;
        record.release_lock().await;
        assert!(record.acquire_lock(false).await);
        assert!(!record.acquire_lock(false).await);
    }

    #[tokio::test]
    async fn finished_is_terminal_and_set_once() {
        let record = CachedRecord::new(NodeId::new("n1"));
        record.finished(Some("boom".to_string())).await;
        let first = record.finished_at().await.unwrap();

        record.finished(Some("later".to_string())).await;
        assert_eq!(record.finished_at().await.unwrap(), first);
        assert_eq!(record.terminal_error(), Some("boom".to_string()));
    }

    #[tokio::test]
    async fn mac_attribute_grows_without_duplicates() {
        let record = CachedRecord::new(NodeId::new("n1"));
        record
            .add_mac_attribute(vec!["aa:bb".to_string(), "cc:dd".to_string()])
            .await;
        record
            .add_mac_attribute(vec!["cc:dd".to_string(), "ee:ff".to_string()])
            .await;
        assert_eq!(record.mac_attribute(), vec!["aa:bb", "cc:dd", "ee:ff"]);
        assert!(record.has_lookup_attributes().await);
    }

    #[tokio::test]
    async fn start_introspection_refreshes_a_finished_record() {
        let registry = InMemoryNodeRegistry::new();
        let id = NodeId::new("n1");
        let record = registry.start_introspection(&id, None).await.unwrap();
        record.finished(Some("old failure".to_string())).await;

        registry
            .start_introspection(&id, Some("192.0.2.1".to_string()))
            .await
            .unwrap();
        let record = registry.record(&id).unwrap();
        assert!(record.finished_at().await.is_none());
        assert_eq!(record.terminal_error(), None);
        assert_eq!(record.bmc_address(), Some("192.0.2.1".to_string()));
    }

    #[tokio::test]
    async fn get_node_reports_missing_records() {
        let registry = InMemoryNodeRegistry::new();
        let err = registry
            .get_node(&NodeId::new("ghost"), false)
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::NotFound(_)));
    }
}
