//! Topology configuration.
//!
//! The only required value is the base name. Address blocks and the
//! internet-facing port lists default to the fixed topology and may be
//! overridden per cloud from the config file. Everything is validated
//! before a single record is declared.

use crate::naming::validate_base_name;
use crate::{CoreError, Result};
use ipnetwork::Ipv4Network;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::debug;

/// Environment variable overriding `baseName`
pub const BASE_NAME_ENV: &str = "TOPOLOGY_BASE_NAME";

pub const AWS_VPC_CIDR: &str = "10.0.0.0/22";
pub const AWS_SUBNET_CIDRS: [&str; 3] = ["10.0.0.0/24", "10.0.1.0/24", "10.0.2.0/24"];

pub const GCP_VPC_CIDR: &str = "10.0.4.0/22";
pub const GCP_SUBNET_CIDRS: [&str; 3] = ["10.0.4.0/24", "10.0.5.0/24", "10.0.6.0/24"];

/// TCP ports open to the internet besides ICMP
pub const INTERNET_TCP_PORTS: [&str; 1] = ["22"];

/// Topology configuration as read from YAML
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TopologyConfig {
    /// Prefix of every resource name. Changing it recreates every resource.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_name: Option<String>,

    /// Cloud A network
    #[serde(default = "default_aws_network")]
    pub aws: NetworkConfig,

    /// Cloud B network
    #[serde(default = "default_gcp_network")]
    pub gcp: NetworkConfig,
}

/// Address plan of one cloud
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConfig {
    /// Network block
    pub cidr: String,

    /// Subnet blocks, one subnet each, in index order
    pub subnet_cidrs: Vec<String>,

    /// TCP ports or `low-high` ranges the internet-facing firewall opens
    /// besides ICMP
    #[serde(default = "default_internet_tcp_ports")]
    pub internet_tcp_ports: Vec<String>,
}

fn default_aws_network() -> NetworkConfig {
    NetworkConfig {
        cidr: AWS_VPC_CIDR.to_string(),
        subnet_cidrs: AWS_SUBNET_CIDRS.iter().map(|c| c.to_string()).collect(),
        internet_tcp_ports: default_internet_tcp_ports(),
    }
}

fn default_gcp_network() -> NetworkConfig {
    NetworkConfig {
        cidr: GCP_VPC_CIDR.to_string(),
        subnet_cidrs: GCP_SUBNET_CIDRS.iter().map(|c| c.to_string()).collect(),
        internet_tcp_ports: default_internet_tcp_ports(),
    }
}

fn default_internet_tcp_ports() -> Vec<String> {
    INTERNET_TCP_PORTS.iter().map(|p| p.to_string()).collect()
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            base_name: None,
            aws: default_aws_network(),
            gcp: default_gcp_network(),
        }
    }
}

impl TopologyConfig {
    /// Fixed topology with the given base name
    pub fn new(base_name: impl Into<String>) -> Self {
        Self {
            base_name: Some(base_name.into()),
            ..Self::default()
        }
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| CoreError::ConfigIo {
            path: path.display().to_string(),
            source,
        })?;
        debug!("Loaded configuration from {}", path.display());
        Self::from_yaml_str(&contents)
    }

    /// Read the optional config file, then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        Ok(config.with_env_overrides())
    }

    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(base_name) = std::env::var(BASE_NAME_ENV) {
            debug!("{} overrides baseName", BASE_NAME_ENV);
            self.base_name = Some(base_name);
        }
        self
    }

    /// JSON schema of the config file
    pub fn schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(TopologyConfig)
    }

    /// Check every value and parse the address plan
    pub fn validate(&self) -> Result<ValidatedConfig> {
        let base_name = self
            .base_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or(CoreError::MissingConfig("baseName"))?;
        validate_base_name(base_name)?;

        let aws = self.aws.validate("aws")?;
        let gcp = self.gcp.validate("gcp")?;

        // Both blocks are bridged by the VPN; nothing downstream would notice
        // an overlap until routing misbehaves.
        if blocks_overlap(aws.block, gcp.block) {
            return Err(CoreError::OverlappingBlocks {
                first_field: "aws.cidr".to_string(),
                first: aws.block.to_string(),
                second_field: "gcp.cidr".to_string(),
                second: gcp.block.to_string(),
            });
        }

        Ok(ValidatedConfig {
            base_name: base_name.to_string(),
            aws,
            gcp,
        })
    }
}

impl NetworkConfig {
    fn validate(&self, cloud: &str) -> Result<CloudPlan> {
        let block = parse_block(&format!("{}.cidr", cloud), &self.cidr)?;

        if self.subnet_cidrs.is_empty() {
            return Err(CoreError::InvalidConfiguration(format!(
                "{}.subnetCidrs must list at least one subnet",
                cloud
            )));
        }

        let mut subnets: Vec<Ipv4Network> = Vec::with_capacity(self.subnet_cidrs.len());
        for (index, cidr) in self.subnet_cidrs.iter().enumerate() {
            let field = format!("{}.subnetCidrs[{}]", cloud, index);
            let subnet = parse_block(&field, cidr)?;

            if !is_within(subnet, block) {
                return Err(CoreError::SubnetOutsideNetwork {
                    field,
                    subnet: subnet.to_string(),
                    network: block.to_string(),
                });
            }
            if let Some((other, existing)) = subnets
                .iter()
                .enumerate()
                .find(|(_, existing)| blocks_overlap(**existing, subnet))
            {
                return Err(CoreError::OverlappingBlocks {
                    first_field: format!("{}.subnetCidrs[{}]", cloud, other),
                    first: existing.to_string(),
                    second_field: field,
                    second: subnet.to_string(),
                });
            }
            subnets.push(subnet);
        }

        if self.internet_tcp_ports.is_empty() {
            return Err(CoreError::InvalidConfiguration(format!(
                "{}.internetTcpPorts must list at least one port",
                cloud
            )));
        }
        let internet_tcp_ports = self
            .internet_tcp_ports
            .iter()
            .enumerate()
            .map(|(index, port)| {
                PortRange::parse(port).ok_or_else(|| CoreError::InvalidPort {
                    field: format!("{}.internetTcpPorts[{}]", cloud, index),
                    value: port.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(CloudPlan {
            block,
            subnets,
            internet_tcp_ports,
        })
    }
}

/// Configuration that passed validation
#[derive(Clone, Debug, PartialEq)]
pub struct ValidatedConfig {
    pub base_name: String,
    pub aws: CloudPlan,
    pub gcp: CloudPlan,
}

/// Parsed settings of one cloud
#[derive(Clone, Debug, PartialEq)]
pub struct CloudPlan {
    pub block: Ipv4Network,
    pub subnets: Vec<Ipv4Network>,
    pub internet_tcp_ports: Vec<PortRange>,
}

/// Inclusive TCP/UDP port range
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PortRange {
    pub low: u16,
    pub high: u16,
}

impl PortRange {
    pub const ALL: PortRange = PortRange {
        low: 0,
        high: u16::MAX,
    };

    /// Parse `N` or `N-M`
    pub fn parse(value: &str) -> Option<Self> {
        let (low, high) = match value.split_once('-') {
            Some((low, high)) => (low.parse::<u16>().ok()?, high.parse::<u16>().ok()?),
            None => {
                let port = value.parse::<u16>().ok()?;
                (port, port)
            }
        };
        (low <= high).then_some(Self { low, high })
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.low == self.high {
            write!(f, "{}", self.low)
        } else {
            write!(f, "{}-{}", self.low, self.high)
        }
    }
}

fn parse_block(field: &str, value: &str) -> Result<Ipv4Network> {
    let invalid = |reason: String| CoreError::InvalidCidr {
        field: field.to_string(),
        value: value.to_string(),
        reason,
    };

    if !value.contains('/') {
        return Err(invalid("missing prefix length".to_string()));
    }
    let network: Ipv4Network = value.parse().map_err(|e| invalid(format!("{}", e)))?;
    if network.ip() != network.network() {
        return Err(invalid(format!(
            "host bits set, expected {}/{}",
            network.network(),
            network.prefix()
        )));
    }
    Ok(network)
}

/// Whether two blocks share at least one address
pub fn blocks_overlap(a: Ipv4Network, b: Ipv4Network) -> bool {
    a.contains(b.network()) || b.contains(a.network())
}

fn is_within(inner: Ipv4Network, outer: Ipv4Network) -> bool {
    inner.prefix() >= outer.prefix() && outer.contains(inner.network())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Write;
    use std::net::Ipv4Addr;

    #[test]
    fn test_defaults_validate() {
        let validated = TopologyConfig::new("test").validate().unwrap();
        assert_eq!(validated.base_name, "test");
        assert_eq!(validated.aws.block.to_string(), "10.0.0.0/22");
        assert_eq!(validated.gcp.block.to_string(), "10.0.4.0/22");
        assert_eq!(validated.aws.subnets.len(), 3);
        assert_eq!(
            validated.gcp.internet_tcp_ports,
            vec![PortRange { low: 22, high: 22 }]
        );
    }

    #[test]
    fn test_missing_base_name() {
        let err = TopologyConfig::default().validate().unwrap_err();
        assert!(matches!(err, CoreError::MissingConfig("baseName")));

        let err = TopologyConfig::new("   ").validate().unwrap_err();
        assert!(matches!(err, CoreError::MissingConfig("baseName")));
    }

    #[test]
    fn test_malformed_cidr_names_field() {
        let mut config = TopologyConfig::new("test");
        config.gcp.subnet_cidrs[1] = "10.0.5.0/33".to_string();
        match config.validate().unwrap_err() {
            CoreError::InvalidCidr { field, value, .. } => {
                assert_eq!(field, "gcp.subnetCidrs[1]");
                assert_eq!(value, "10.0.5.0/33");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_host_bits_rejected() {
        let mut config = TopologyConfig::new("test");
        config.aws.cidr = "10.0.1.0/22".to_string();
        assert!(matches!(
            config.validate().unwrap_err(),
            CoreError::InvalidCidr { .. }
        ));
    }

    #[test]
    fn test_overlapping_clouds_rejected() {
        let mut config = TopologyConfig::new("test");
        config.gcp.cidr = "10.0.0.0/21".to_string();
        config.gcp.subnet_cidrs = vec!["10.0.4.0/24".to_string()];
        match config.validate().unwrap_err() {
            CoreError::OverlappingBlocks {
                first_field,
                second_field,
                ..
            } => {
                assert_eq!(first_field, "aws.cidr");
                assert_eq!(second_field, "gcp.cidr");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_subnet_outside_network() {
        let mut config = TopologyConfig::new("test");
        config.aws.subnet_cidrs[2] = "10.0.4.0/24".to_string();
        assert!(matches!(
            config.validate().unwrap_err(),
            CoreError::SubnetOutsideNetwork { .. }
        ));
    }

    #[test]
    fn test_overlapping_subnets() {
        let mut config = TopologyConfig::new("test");
        config.aws.subnet_cidrs[1] = "10.0.0.128/25".to_string();
        assert!(matches!(
            config.validate().unwrap_err(),
            CoreError::OverlappingBlocks { .. }
        ));
    }

    #[test]
    fn test_invalid_port() {
        for port in ["ssh", "70000", "30-20", ""] {
            let mut config = TopologyConfig::new("test");
            config.aws.internet_tcp_ports = vec![port.to_string()];
            assert!(
                matches!(config.validate(), Err(CoreError::InvalidPort { .. })),
                "{:?} should be rejected",
                port
            );
        }

        let mut config = TopologyConfig::new("test");
        config.aws.internet_tcp_ports = vec!["22".to_string(), "8000-8080".to_string()];
        let validated = config.validate().unwrap();
        assert_eq!(
            validated.aws.internet_tcp_ports[1].to_string(),
            "8000-8080"
        );

        config.aws.internet_tcp_ports.clear();
        assert!(matches!(
            config.validate(),
            Err(CoreError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_yaml_partial_override() {
        let config = TopologyConfig::from_yaml_str(
            "baseName: demo\ngcp:\n  cidr: 10.0.8.0/22\n  subnetCidrs: [10.0.8.0/24]\n  internetTcpPorts: [\"22\", \"443\"]\n",
        )
        .unwrap();
        assert_eq!(config.base_name.as_deref(), Some("demo"));
        assert_eq!(config.aws.cidr, AWS_VPC_CIDR);
        assert_eq!(config.aws.internet_tcp_ports, vec!["22"]);
        assert_eq!(config.gcp.internet_tcp_ports, vec!["22", "443"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "baseName: filed").unwrap();
        let config = TopologyConfig::from_file(file.path()).unwrap();
        assert_eq!(config.base_name.as_deref(), Some("filed"));

        let missing = TopologyConfig::from_file(Path::new("/nonexistent/topology.yaml"));
        assert!(matches!(missing, Err(CoreError::ConfigIo { .. })));
    }

    #[test]
    fn test_schema_mentions_base_name() {
        let schema = serde_json::to_string(&TopologyConfig::schema()).unwrap();
        assert!(schema.contains("baseName"));
    }

    #[test]
    fn test_fixed_blocks_do_not_overlap() {
        let aws: Ipv4Network = AWS_VPC_CIDR.parse().unwrap();
        let gcp: Ipv4Network = GCP_VPC_CIDR.parse().unwrap();
        assert!(!blocks_overlap(aws, gcp));
    }

    fn block() -> impl Strategy<Value = Ipv4Network> {
        (any::<u32>(), 8u8..=28).prop_map(|(addr, prefix)| {
            let net = Ipv4Network::new(Ipv4Addr::from(addr), prefix).unwrap();
            Ipv4Network::new(net.network(), prefix).unwrap()
        })
    }

    proptest! {
        #[test]
        fn prop_overlapping_pairs_rejected(aws in block(), gcp in block()) {
            let mut config = TopologyConfig::new("prop");
            config.aws.cidr = aws.to_string();
            config.aws.subnet_cidrs = vec![aws.to_string()];
            config.gcp.cidr = gcp.to_string();
            config.gcp.subnet_cidrs = vec![gcp.to_string()];

            let result = config.validate();
            if blocks_overlap(aws, gcp) {
                let rejected = matches!(result, Err(CoreError::OverlappingBlocks { .. }));
                prop_assert!(rejected);
            } else {
                prop_assert!(result.is_ok());
            }
        }

        #[test]
        fn prop_overlap_is_symmetric(a in block(), b in block()) {
            prop_assert_eq!(blocks_overlap(a, b), blocks_overlap(b, a));
        }
    }
}
