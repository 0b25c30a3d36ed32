use crate::error::{ClusterForgeError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Hostname of node `i` is `{HOSTNAME_PREFIX}{i}.{HOSTNAME_DOMAIN}`
pub const HOSTNAME_PREFIX: &str = "n";
pub const HOSTNAME_DOMAIN: &str = "local";

/// Cluster node id of node `i` is `{NODE_NAME_PREFIX}@{hostname}`
pub const NODE_NAME_PREFIX: &str = "node";

/// Broker data-plane (MQTT) listener inside every container
pub const DATA_PLANE_PORT: u16 = 1883;

/// Host port of node `i` is `DATA_PLANE_BASE_PORT + i`
pub const DATA_PLANE_BASE_PORT: u16 = 1883;

/// Broker dashboard / admin API listener inside every container
pub const DASHBOARD_PORT: u16 = 18083;

/// Metrics are served by the dashboard listener
pub const METRICS_PORT: u16 = DASHBOARD_PORT;
pub const METRICS_PATH: &str = "/api/v5/prometheus/stats";

/// Load-balancer stats endpoint, independent of node count
pub const STATS_PORT: u16 = 8888;

pub const PROMETHEUS_PORT: u16 = 9090;
pub const GRAFANA_PORT: u16 = 3000;

/// Internal network name, also the SAN of the node certificate
pub const BACKPLANE_HOSTNAME: &str = "backplane";

/// Environment variables carrying this prefix configure the broker
pub const BROKER_ENV_PREFIX: &str = "EMQX_";

/// Host ports published by the non-node services. No node may be mapped onto one of them.
pub const RESERVED_PORTS: &[(&str, u16)] = &[
    ("load-balancer data plane", DATA_PLANE_PORT),
    ("dashboard", DASHBOARD_PORT),
    ("stats", STATS_PORT),
    ("metrics", PROMETHEUS_PORT),
    ("monitoring dashboard", GRAFANA_PORT),
];

/// Node role in the cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeRole {
    /// Core: votes on and stores the replicated database
    Core,

    /// Replicant: non-voting replica that follows the core nodes
    Replicant,
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeRole::Core => write!(f, "core"),
            NodeRole::Replicant => write!(f, "replicant"),
        }
    }
}

/// Balancing algorithm of the data-plane pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadBalanceStrategy {
    #[default]
    RoundRobin,
    LeastConn,
    Source,
    First,
}

impl LoadBalanceStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadBalanceStrategy::RoundRobin => "roundrobin",
            LoadBalanceStrategy::LeastConn => "leastconn",
            LoadBalanceStrategy::Source => "source",
            LoadBalanceStrategy::First => "first",
        }
    }
}

impl fmt::Display for LoadBalanceStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LoadBalanceStrategy {
    type Err = ClusterForgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "roundrobin" => Ok(LoadBalanceStrategy::RoundRobin),
            "leastconn" => Ok(LoadBalanceStrategy::LeastConn),
            "source" => Ok(LoadBalanceStrategy::Source),
            "first" => Ok(LoadBalanceStrategy::First),
            other => Err(ClusterForgeError::configuration(format!(
                "unknown load-balancing strategy '{}': expected one of roundrobin, leastconn, source, first",
                other
            ))),
        }
    }
}

/// Console log level handed to every broker node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrokerLogLevel {
    Debug,
    Info,
    #[default]
    Notice,
    Warning,
    Error,
    Critical,
    Alert,
    Emergency,
}

impl BrokerLogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            BrokerLogLevel::Debug => "debug",
            BrokerLogLevel::Info => "info",
            BrokerLogLevel::Notice => "notice",
            BrokerLogLevel::Warning => "warning",
            BrokerLogLevel::Error => "error",
            BrokerLogLevel::Critical => "critical",
            BrokerLogLevel::Alert => "alert",
            BrokerLogLevel::Emergency => "emergency",
        }
    }
}

impl fmt::Display for BrokerLogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The resolved, immutable input of one generation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterSpec {
    total_nodes: usize,
    core_nodes: usize,
    lb_strategy: LoadBalanceStrategy,
    log_level: BrokerLogLevel,
}

impl ClusterSpec {
    /// Resolve a spec, rejecting counts outside `1 <= core_nodes <= total_nodes`
    pub fn new(
        total_nodes: usize,
        core_nodes: usize,
        lb_strategy: LoadBalanceStrategy,
        log_level: BrokerLogLevel,
    ) -> Result<Self> {
        if total_nodes < 1 {
            return Err(ClusterForgeError::configuration(
                "total node count must be at least 1",
            ));
        }
        if core_nodes < 1 {
            return Err(ClusterForgeError::configuration(
                "core node count must be at least 1",
            ));
        }
        if core_nodes > total_nodes {
            return Err(ClusterForgeError::configuration(format!(
                "core node count ({}) exceeds total node count ({})",
                core_nodes, total_nodes
            )));
        }

        Ok(Self {
            total_nodes,
            core_nodes,
            lb_strategy,
            log_level,
        })
    }

    pub fn total_nodes(&self) -> usize {
        self.total_nodes
    }

    pub fn core_nodes(&self) -> usize {
        self.core_nodes
    }

    pub fn replicant_nodes(&self) -> usize {
        self.total_nodes - self.core_nodes
    }

    pub fn lb_strategy(&self) -> LoadBalanceStrategy {
        self.lb_strategy
    }

    pub fn log_level(&self) -> BrokerLogLevel {
        self.log_level
    }

    /// All node indices, `1..=total_nodes`
    pub fn indices(&self) -> std::ops::RangeInclusive<usize> {
        1..=self.total_nodes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_accepts_single_role_cluster() {
        let spec = ClusterSpec::new(3, 3, LoadBalanceStrategy::default(), BrokerLogLevel::default())
            .unwrap();
        assert_eq!(spec.replicant_nodes(), 0);
        assert_eq!(spec.indices().count(), 3);
    }

    #[test]
    fn test_spec_rejects_invalid_counts() {
        let strategy = LoadBalanceStrategy::RoundRobin;
        let level = BrokerLogLevel::Notice;

        assert!(matches!(
            ClusterSpec::new(3, 5, strategy, level),
            Err(ClusterForgeError::Configuration { .. })
        ));
        assert!(ClusterSpec::new(0, 0, strategy, level).is_err());
        assert!(ClusterSpec::new(4, 0, strategy, level).is_err());
    }

    #[test]
    fn test_strategy_parsing() {
        assert_eq!(
            "LeastConn".parse::<LoadBalanceStrategy>().unwrap(),
            LoadBalanceStrategy::LeastConn
        );
        assert!("random".parse::<LoadBalanceStrategy>().is_err());

        let json = serde_json::to_string(&LoadBalanceStrategy::RoundRobin).unwrap();
        assert_eq!(json, "\"roundrobin\"");
    }

    #[test]
    fn test_reserved_ports_are_distinct() {
        let mut ports: Vec<u16> = RESERVED_PORTS.iter().map(|(_, port)| *port).collect();
        ports.sort_unstable();
        ports.dedup();
        assert_eq!(ports.len(), RESERVED_PORTS.len());
    }
}
