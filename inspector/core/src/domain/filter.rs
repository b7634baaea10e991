// Copyright (c) 2026 Anvil Systems
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FilterError {
    #[error("filter synchronization failed: {0}")]
    Sync(String),
}

/// Network-boot (DHCP/PXE) filter subsystem. Synchronization is always
/// best-effort from the orchestrator's point of view: a failure here never
/// prevents an attempt from reaching a terminal state.
#[async_trait]
pub trait PxeFilter: Send + Sync {
    async fn update_filters(&self) -> Result<(), FilterError>;
}
