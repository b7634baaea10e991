// Copyright (c) 2026 Anvil Systems
// SPDX-License-Identifier: AGPL-3.0

pub mod bmc;
pub mod introspection;
pub mod preflight;
pub mod throttle;

pub use introspection::{IntrospectionPolicy, IntrospectionService, ABORT_ERROR};
pub use throttle::IntrospectionThrottle;
