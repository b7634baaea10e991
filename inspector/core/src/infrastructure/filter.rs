// Copyright (c) 2026 Anvil Systems
// SPDX-License-Identifier: AGPL-3.0

use crate::domain::filter::{FilterError, PxeFilter};
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

/// Filter backend for deployments without DHCP/PXE filtering (and for
/// tests): every sync succeeds without doing anything.
#[derive(Default)]
pub struct NoopPxeFilter;

#[async_trait]
impl PxeFilter for NoopPxeFilter {
    async fn update_filters(&self) -> Result<(), FilterError> {
        debug!("PXE filter synchronization skipped (noop backend)");
        Ok(())
    }
}

/// Delegates filter synchronization to an external filter service over
/// HTTP. The service owns the dnsmasq/iptables details.
pub struct HttpPxeFilter {
    sync_url: String,
    http: Client,
}

impl HttpPxeFilter {
    pub fn new(sync_url: impl Into<String>) -> Self {
        Self {
            sync_url: sync_url.into(),
            http: Client::new(),
        }
    }
}

#[async_trait]
impl PxeFilter for HttpPxeFilter {
    async fn update_filters(&self) -> Result<(), FilterError> {
        let response = self
            .http
            .post(&self.sync_url)
            .send()
            .await
            .map_err(|err| FilterError::Sync(err.to_string()))?;
        if !response.status().is_success() {
            return Err(FilterError::Sync(format!(
                "filter service returned {}",
                response.status()
            )));
        }
        debug!("PXE filters synchronized");
        Ok(())
    }
}
