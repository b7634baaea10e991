// Copyright (c) 2026 Anvil Systems
// SPDX-License-Identifier: AGPL-3.0

pub mod client;
pub mod error;
pub mod filter;
pub mod node;
pub mod registry;

pub use client::{ClientError, ManagementClient};
pub use error::OperationError;
pub use filter::{FilterError, PxeFilter};
pub use node::{
    BootDevice, IpmiCredentialRequest, IpmiCredentials, Node, NodeId, Port, PowerTarget,
    PowerValidation, ProvisionState, MAX_IPMI_PASSWORD_LENGTH,
};
pub use registry::{NodeRecord, NodeRegistry, RegistryError};
