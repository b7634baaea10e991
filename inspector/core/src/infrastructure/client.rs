// Copyright (c) 2026 Anvil Systems
// SPDX-License-Identifier: AGPL-3.0
//! HTTP hardware-management client.
//!
//! Talks to an Ironic-style bare-metal management API:
//!
//! - `GET  {base}/v1/nodes/{id}`
//! - `GET  {base}/v1/nodes/{id}/validate`
//! - `PUT  {base}/v1/nodes/{id}/management/boot_device`
//! - `PUT  {base}/v1/nodes/{id}/states/power`

use crate::domain::client::{ClientError, ManagementClient};
use crate::domain::node::{BootDevice, Node, NodeId, PowerTarget, PowerValidation};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub struct HttpManagementClient {
    base_url: String,
    http: Client,
}

impl HttpManagementClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| ClientError::Transport(err.to_string()))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    fn node_url(&self, id: &NodeId, suffix: &str) -> String {
        format!("{}/v1/nodes/{}{}", self.base_url, id, suffix)
    }

    async fn check(response: Response) -> Result<Response, ClientError> {
        match response.status() {
            status if status.is_success() => Ok(response),
            StatusCode::NOT_FOUND => Err(ClientError::NotFound),
            StatusCode::BAD_REQUEST => {
                let body = response.text().await.unwrap_or_default();
                Err(ClientError::BadRequest(body))
            }
            status => Err(ClientError::Transport(format!(
                "unexpected status {status}"
            ))),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ValidateResponse {
    power: PowerValidation,
}

#[derive(Debug, Serialize)]
struct BootDeviceRequest<'a> {
    boot_device: &'a str,
    persistent: bool,
}

#[derive(Debug, Serialize)]
struct PowerStateRequest<'a> {
    target: &'a str,
}

#[async_trait]
impl ManagementClient for HttpManagementClient {
    async fn get_node(&self, id: &NodeId) -> Result<Node, ClientError> {
        let response = self
            .http
            .get(self.node_url(id, ""))
            .send()
            .await
            .map_err(|err| ClientError::Transport(err.to_string()))?;
        Self::check(response)
            .await?
            .json()
            .await
            .map_err(|err| ClientError::Transport(format!("malformed node payload: {err}")))
    }

    async fn validate_power(&self, id: &NodeId) -> Result<PowerValidation, ClientError> {
        let response = self
            .http
            .get(self.node_url(id, "/validate"))
            .send()
            .await
            .map_err(|err| ClientError::Transport(err.to_string()))?;
        let validate: ValidateResponse = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|err| {
                ClientError::Transport(format!("malformed validate payload: {err}"))
            })?;
        Ok(validate.power)
    }

    async fn set_boot_device(
        &self,
        id: &NodeId,
        device: BootDevice,
        persistent: bool,
    ) -> Result<(), ClientError> {
        let response = self
            .http
            .put(self.node_url(id, "/management/boot_device"))
            .json(&BootDeviceRequest {
                boot_device: device.as_str(),
                persistent,
            })
            .send()
            .await
            .map_err(|err| ClientError::Transport(err.to_string()))?;
        Self::check(response).await.map(|_| ())
    }

    async fn set_power_state(
        &self,
        id: &NodeId,
        target: PowerTarget,
    ) -> Result<(), ClientError> {
        let response = self
            .http
            .put(self.node_url(id, "/states/power"))
            .json(&PowerStateRequest {
                target: target.as_str(),
            })
            .send()
            .await
            .map_err(|err| ClientError::Transport(err.to_string()))?;
        Self::check(response).await.map(|_| ())
    }
}
