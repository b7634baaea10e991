// Copyright (c) 2026 Anvil Systems
// SPDX-License-Identifier: AGPL-3.0
//! Preflight validation.
//!
//! Pure decision functions evaluated before the node is locked or any
//! external system is touched. A rejection here has zero side effects.

use crate::domain::error::OperationError;
use crate::domain::node::{
    IpmiCredentialRequest, IpmiCredentials, Node, ProvisionState, MAX_IPMI_PASSWORD_LENGTH,
};

/// Symbols rejected in new IPMI passwords: shell metacharacters and
/// characters some BMC firmwares mangle in transit.
const FORBIDDEN_PASSWORD_SYMBOLS: &str = "\"'`;&|<>\\$!*?#()[]{}~";

const PLAIN_INTROSPECTION_STATES: &[ProvisionState] = &[
    ProvisionState::Enroll,
    ProvisionState::Manageable,
    ProvisionState::Inspecting,
    ProvisionState::InspectFailed,
];

/// Credential-setting is only safe before the node has been taken under
/// management, so this set is strictly narrower than the plain one.
const CREDENTIAL_INTROSPECTION_STATES: &[ProvisionState] = &[ProvisionState::Enroll];

/// Check that the node's provision state permits introspection in the
/// requested mode. An absent state (nodes enrolled before the provisioning
/// orchestrator tracked states) is allowed for plain introspection only.
pub fn check_provision_state(
    state: Option<&ProvisionState>,
    with_credentials: bool,
) -> Result<(), OperationError> {
    let permitted = if with_credentials {
        CREDENTIAL_INTROSPECTION_STATES
    } else {
        PLAIN_INTROSPECTION_STATES
    };

    match state {
        None if !with_credentials => Ok(()),
        Some(state) if permitted.contains(state) => Ok(()),
        other => Err(OperationError::InvalidProvisionState(
            other.map(ProvisionState::to_string).unwrap_or_default(),
        )),
    }
}

/// Validate a requested credential change, substituting the driver-supplied
/// default username when none was given.
pub fn validate_ipmi_credentials(
    node: &Node,
    request: &IpmiCredentialRequest,
    enabled: bool,
) -> Result<IpmiCredentials, OperationError> {
    if !enabled {
        return Err(OperationError::CredentialsDisabled);
    }

    let username = match request.username.as_deref() {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => node
            .driver_info
            .get("ipmi_username")
            .filter(|name| !name.is_empty())
            .cloned()
            .ok_or(OperationError::MissingUsername)?,
    };

    let forbidden: String = request
        .password
        .chars()
        .filter(|c| !is_allowed_password_char(*c))
        .collect();
    if !forbidden.is_empty() {
        return Err(OperationError::ForbiddenPasswordCharacters(forbidden));
    }

    if request.password.is_empty() || request.password.len() > MAX_IPMI_PASSWORD_LENGTH {
        return Err(OperationError::PasswordLength);
    }

    Ok(IpmiCredentials {
        username,
        password: request.password.clone(),
    })
}

fn is_allowed_password_char(c: char) -> bool {
    c.is_ascii_graphic() && !FORBIDDEN_PASSWORD_SYMBOLS.contains(c)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::node::NodeId;

    fn node_with_driver_info(info: &[(&str, &str)]) -> Node {
        Node {
            id: NodeId::new("n1"),
            driver: "agent_ipmitool".to_string(),
            driver_info: info
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            provision_state: Some(ProvisionState::Enroll),
            power_state: None,
        }
    }

    fn request(username: Option<&str>, password: &str) -> IpmiCredentialRequest {
        IpmiCredentialRequest {
            username: username.map(str::to_string),
            password: password.to_string(),
        }
    }

    #[test]
    fn plain_introspection_allows_managed_states_and_absent_state() {
        for state in [
            ProvisionState::Enroll,
            ProvisionState::Manageable,
            ProvisionState::Inspecting,
            ProvisionState::InspectFailed,
        ] {
            check_provision_state(Some(&state), false).unwrap();
        }
        check_provision_state(None, false).unwrap();
    }

    #[test]
    fn active_state_is_rejected_with_the_literal_state_in_the_message() {
        let err = check_provision_state(Some(&ProvisionState::Active), false).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid provision state for introspection: \"active\""
        );
    }

    #[test]
    fn credential_setting_rejects_manageable() {
        check_provision_state(Some(&ProvisionState::Enroll), true).unwrap();
        let err = check_provision_state(Some(&ProvisionState::Manageable), true).unwrap_err();
        assert!(matches!(err, OperationError::InvalidProvisionState(_)));
        // An absent state is not enough to allow a credential change.
        check_provision_state(None, true).unwrap_err();
    }

    #[test]
    fn credentials_rejected_when_feature_disabled() {
        let node = node_with_driver_info(&[]);
        let err =
            validate_ipmi_credentials(&node, &request(Some("user"), "password"), false)
                .unwrap_err();
        assert!(matches!(err, OperationError::CredentialsDisabled));
        assert!(err.to_string().contains("disabled"));
    }

    #[test]
    fn missing_username_falls_back_to_driver_info_then_fails() {
        let node = node_with_driver_info(&[("ipmi_username", "admin")]);
        let creds =
            validate_ipmi_credentials(&node, &request(None, "password"), true).unwrap();
        assert_eq!(creds.username, "admin");

        let bare = node_with_driver_info(&[]);
        let err = validate_ipmi_credentials(&bare, &request(None, "password"), true)
            .unwrap_err();
        assert!(matches!(err, OperationError::MissingUsername));
    }

    #[test]
    fn forbidden_password_characters_are_reported() {
        let node = node_with_driver_info(&[]);
        let err = validate_ipmi_credentials(&node, &request(Some("user"), "p ssw@rd"), true)
            .unwrap_err();
        match err {
            OperationError::ForbiddenPasswordCharacters(chars) => {
                assert!(chars.contains(' '));
                // '@' is printable and safe; only the space is rejected here.
                assert!(!chars.contains('@'));
            }
            other => panic!("unexpected error: {other}"),
        }

        let err = validate_ipmi_credentials(&node, &request(Some("user"), "pass;word"), true)
            .unwrap_err();
        assert!(matches!(
            err,
            OperationError::ForbiddenPasswordCharacters(_)
        ));
    }

    #[test]
    fn password_length_limits() {
        let node = node_with_driver_info(&[]);
        let long = "password".repeat(100);
        let err =
            validate_ipmi_credentials(&node, &request(Some("user"), &long), true).unwrap_err();
        assert!(matches!(err, OperationError::PasswordLength));

        let err =
            validate_ipmi_credentials(&node, &request(Some("user"), ""), true).unwrap_err();
        assert!(matches!(err, OperationError::PasswordLength));

        let max = "x".repeat(MAX_IPMI_PASSWORD_LENGTH);
        validate_ipmi_credentials(&node, &request(Some("user"), &max), true).unwrap();
    }

    #[test]
    fn explicit_username_wins_over_driver_default() {
        let node = node_with_driver_info(&[("ipmi_username", "admin")]);
        let creds =
            validate_ipmi_credentials(&node, &request(Some("operator"), "password"), true)
                .unwrap();
        assert_eq!(creds.username, "operator");
    }
}
