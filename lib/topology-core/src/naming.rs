//! Resource naming.
//!
//! Every name is `<base>-<role>[-<index>]`. Names double as reconciliation
//! keys, so changing the base name changes the identity of every record.

use crate::{CoreError, Result};

/// Longest provider name limit across both clouds (GCP resource names)
pub const MAX_NAME_LEN: usize = 63;

/// Longest suffix the descriptor appends to the base name
const LONGEST_SUFFIX: &str = "-router-0-interface";

/// Role suffixes used by the descriptor
pub mod roles {
    pub const VPC: &str = "vpc";
    pub const SUBNET: &str = "subnet";
    pub const INTERNET_GATEWAY: &str = "igw";
    pub const VPN_GATEWAY: &str = "vgw";
    pub const CUSTOMER_GATEWAY: &str = "cgw";
    pub const DEFAULT_ROUTE_TABLE: &str = "rtb-default";
    pub const VPN_CONNECTION: &str = "vpn-conn";
    pub const FIREWALL: &str = "fwl";
    pub const FIREWALL_INTERNET: &str = "fwl-internet";
    pub const FIREWALL_VPN: &str = "fwl-vpn";
    pub const RESERVED_ADDRESS: &str = "eip-aws-cgw";
    pub const FORWARDING_ESP: &str = "fr-esp";
    pub const FORWARDING_UDP500: &str = "fr-udp500";
    pub const FORWARDING_UDP4500: &str = "fr-udp4500";
    pub const ROUTER: &str = "router";
    pub const VPN_TUNNEL: &str = "vpn-tunnel";
    pub const INTERFACE: &str = "interface";
    pub const PEER: &str = "peer";
}

/// Builds resource names from the base name
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Namer {
    base: String,
}

impl Namer {
    /// Create a namer, rejecting base names either cloud would refuse
    pub fn new(base: &str) -> Result<Self> {
        validate_base_name(base)?;
        Ok(Self {
            base: base.to_string(),
        })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// `<base>-<role>`
    pub fn name(&self, role: &str) -> String {
        format!("{}-{}", self.base, role)
    }

    /// `<base>-<role>-<index>`
    pub fn indexed(&self, role: &str, index: usize) -> String {
        format!("{}-{}-{}", self.base, role, index)
    }

    /// `<base>-<role>-<index>-<suffix>`
    pub fn indexed_child(&self, role: &str, index: usize, suffix: &str) -> String {
        format!("{}-{}-{}-{}", self.base, role, index, suffix)
    }
}

/// Check a base name against the GCP resource name rules, which are the
/// stricter of the two clouds: `[a-z]([-a-z0-9]*[a-z0-9])?`, and the full
/// name including the longest suffix must fit in 63 characters.
pub fn validate_base_name(base: &str) -> Result<()> {
    let invalid = |reason: &str| CoreError::InvalidBaseName {
        name: base.to_string(),
        reason: reason.to_string(),
    };

    let first = base.chars().next().ok_or_else(|| invalid("must not be empty"))?;
    if !first.is_ascii_lowercase() {
        return Err(invalid("must start with a lowercase letter"));
    }
    if !base
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(invalid(
            "may only contain lowercase letters, digits and hyphens",
        ));
    }
    if base.ends_with('-') {
        return Err(invalid("must not end with a hyphen"));
    }
    if base.len() + LONGEST_SUFFIX.len() > MAX_NAME_LEN {
        return Err(invalid(&format!(
            "must be at most {} characters",
            MAX_NAME_LEN - LONGEST_SUFFIX.len()
        )));
    }
    Ok(())
}
