// Copyright (c) 2026 Anvil Systems
// SPDX-License-Identifier: AGPL-3.0

pub mod client;
pub mod config;
pub mod filter;
pub mod registry;

pub use client::HttpManagementClient;
pub use config::InspectorConfig;
pub use filter::{HttpPxeFilter, NoopPxeFilter};
pub use registry::{CachedRecord, InMemoryNodeRegistry};
