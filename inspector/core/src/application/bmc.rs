// Copyright (c) 2026 Anvil Systems
// SPDX-License-Identifier: AGPL-3.0

use std::collections::HashMap;

/// Driver-family substring paired with the `driver_info` key that holds the
/// out-of-band address for that family. Evaluated in order; first match
/// wins.
const BMC_ADDRESS_KEYS: &[(&str, &str)] = &[
    ("ipmi", "ipmi_address"),
    ("ilo", "ilo_address"),
    ("drac", "drac_host"),
];

const LOOPBACK: &str = "127.0.0.1";

/// Derive the BMC address from a node's driver name and driver metadata.
///
/// Returns `None` for unknown driver families, missing/empty values, and
/// the loopback literal (loopback means the BMC is not externally
/// reachable, so address-scoped filtering is impossible).
pub fn resolve_bmc_address(
    driver: &str,
    driver_info: &HashMap<String, String>,
) -> Option<String> {
    for (family, key) in BMC_ADDRESS_KEYS {
        if !driver.contains(family) {
            continue;
        }
        match driver_info.get(*key).filter(|value| !value.is_empty()) {
            Some(address) if address.as_str() == LOOPBACK => return None,
            Some(address) => return Some(address.clone()),
            None => continue,
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn resolves_per_driver_family() {
        assert_eq!(
            resolve_bmc_address("agent_ipmitool", &info(&[("ipmi_address", "192.0.2.1")])),
            Some("192.0.2.1".to_string())
        );
        assert_eq!(
            resolve_bmc_address("fake_ilo", &info(&[("ilo_address", "192.0.2.2")])),
            Some("192.0.2.2".to_string())
        );
        assert_eq!(
            resolve_bmc_address("pxe_drac", &info(&[("drac_host", "bmc.example.com")])),
            Some("bmc.example.com".to_string())
        );
    }

    #[test]
    fn loopback_is_treated_as_absent() {
        assert_eq!(
            resolve_bmc_address("agent_ipmitool", &info(&[("ipmi_address", "127.0.0.1")])),
            None
        );
    }

    #[test]
    fn unknown_family_or_missing_key_yields_none() {
        assert_eq!(
            resolve_bmc_address("foobar", &info(&[("ipmi_address", "192.0.2.1")])),
            None
        );
        assert_eq!(resolve_bmc_address("agent_ipmitool", &info(&[])), None);
        assert_eq!(
            resolve_bmc_address("agent_ipmitool", &info(&[("ipmi_address", "")])),
            None
        );
    }

    #[test]
    fn wrong_familys_key_is_ignored() {
        // An ilo driver never reads the ipmi key.
        assert_eq!(
            resolve_bmc_address("fake_ilo", &info(&[("ipmi_address", "192.0.2.1")])),
            None
        );
    }
}
