// Copyright (c) 2026 Anvil Systems
// SPDX-License-Identifier: AGPL-3.0
//! Orchestration core of the Anvil bare-metal introspection service.
//!
//! Given a managed node id, this crate decides whether the node may be
//! introspected, claims exclusive control of it, drives the out-of-band
//! hardware (boot device, power) through the management client, keeps the
//! network-boot filters in sync so the node can be discovered, and records
//! the attempt's terminal outcome.
//!
//! # Architecture
//!
//! - **domain** — node vocabulary, error taxonomy, and the trait seams for
//!   the external collaborators (management client, node registry, PXE
//!   filter).
//! - **application** — preflight validation, BMC address resolution, the
//!   global start throttle, and the introspection/abort orchestrator.
//! - **infrastructure** — in-memory registry, HTTP management client, PXE
//!   filter backends, YAML configuration.

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use domain::*;
