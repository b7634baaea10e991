// Copyright (c) 2026 Anvil Systems
// SPDX-License-Identifier: AGPL-3.0

use crate::domain::node::NodeId;
use thiserror::Error;

/// User-actionable failures surfaced to the caller before any lock is
/// taken. Everything that happens after lock acquisition is captured on the
/// node record instead of being raised (see
/// `application::introspection`).
#[derive(Debug, Error)]
pub enum OperationError {
    #[error("Node {0} was not found")]
    NodeNotFound(NodeId),

    #[error("Cannot get node {id}: {reason}")]
    BadRequest { id: NodeId, reason: String },

    #[error("Failed validation of power interface: {reason}")]
    PowerValidationFailed { reason: String },

    #[error("Invalid provision state for introspection: \"{0}\"")]
    InvalidProvisionState(String),

    #[error("IPMI credentials setup is disabled in configuration")]
    CredentialsDisabled,

    #[error(
        "Setting IPMI credentials requested, but no username was provided \
         and driver_info contains no ipmi_username"
    )]
    MissingUsername,

    #[error(
        "Forbidden characters encountered in the new IPMI password: \"{0}\""
    )]
    ForbiddenPasswordCharacters(String),

    #[error("IPMI password length must be between 1 and 20 characters")]
    PasswordLength,

    #[error("Node {0} is locked, retry later")]
    NodeLocked(NodeId),

    #[error("Node registry failure: {0}")]
    Registry(String),
}

impl OperationError {
    /// HTTP-style status code for API surfaces layered on top of this core.
    pub fn status_code(&self) -> u16 {
        match self {
            OperationError::NodeNotFound(_) => 404,
            OperationError::NodeLocked(_) => 409,
            OperationError::Registry(_) => 500,
            _ => 400,
        }
    }
}
