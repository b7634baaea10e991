// Copyright (c) 2026 Anvil Systems
// SPDX-License-Identifier: AGPL-3.0
//! Service configuration.
//!
//! Loaded from a YAML manifest, e.g.:
//!
//! ```yaml
//! management_api:
//!   base_url: http://ironic.example.com:6385
//!   timeout: 30s
//! processing:
//!   enable_setting_ipmi_credentials: false
//!   introspection_delay: 5s
//!   introspection_delay_drivers: ".*_ipmitool$"
//!   node_not_found_hook: false
//! pxe_filter:
//!   sync_url: http://127.0.0.1:8091/sync
//! ```

use crate::application::introspection::IntrospectionPolicy;
use crate::application::throttle::IntrospectionThrottle;
use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InspectorConfig {
    pub management_api: ManagementApiConfig,
    #[serde(default)]
    pub processing: ProcessingConfig,
    #[serde(default)]
    pub pxe_filter: PxeFilterConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagementApiConfig {
    pub base_url: String,
    #[serde(with = "humantime_serde", default = "default_timeout")]
    pub timeout: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    pub enable_setting_ipmi_credentials: bool,
    /// Minimum spacing between power/boot cycles across all nodes.
    #[serde(with = "humantime_serde")]
    pub introspection_delay: Duration,
    /// Regex over driver names the delay applies to; unset applies to all.
    pub introspection_delay_drivers: Option<String>,
    /// Whether a fallback discovery hook runs downstream.
    pub node_not_found_hook: bool,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            enable_setting_ipmi_credentials: false,
            introspection_delay: Duration::from_secs(5),
            introspection_delay_drivers: None,
            node_not_found_hook: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PxeFilterConfig {
    /// Endpoint of the external filter service; unset selects the noop
    /// backend.
    pub sync_url: Option<String>,
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

impl InspectorConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Self =
            serde_yaml::from_str(&raw).context("failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.delay_driver_pattern()?;
        Ok(())
    }

    pub fn delay_driver_pattern(&self) -> Result<Option<Regex>> {
        self.processing
            .introspection_delay_drivers
            .as_deref()
            .map(|pattern| {
                Regex::new(pattern).with_context(|| {
                    format!("invalid introspection_delay_drivers pattern: {pattern}")
                })
            })
            .transpose()
    }

    pub fn throttle(&self) -> Result<IntrospectionThrottle> {
        Ok(IntrospectionThrottle::new(
            self.processing.introspection_delay,
            self.delay_driver_pattern()?,
        ))
    }

    pub fn policy(&self) -> IntrospectionPolicy {
        IntrospectionPolicy {
            enable_setting_ipmi_credentials: self.processing.enable_setting_ipmi_credentials,
            node_not_found_hook: self.processing.node_not_found_hook,
        }
    }
}
