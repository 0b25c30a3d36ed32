use crate::certs::{CA_CERT_FILE, NODE_CERT_FILE, NODE_KEY_FILE};
use crate::image::CERTS_HOME;
use clusterforge_cluster::node::service_name;
use clusterforge_cluster::{NodeIdentity, SeedList};
use clusterforge_common::{ClusterSpec, NodeRole, BROKER_ENV_PREFIX, DATA_PLANE_PORT};
use std::fmt;

/// `host:container` port publication
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortMapping {
    pub host: u16,
    pub container: u16,
}

impl fmt::Display for PortMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.container)
    }
}

/// Everything one broker service needs, before it is placed in the compose file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerNodeServiceConfig {
    pub index: usize,
    pub role: NodeRole,
    pub service_name: String,
    pub container_name: String,
    pub hostname: String,
    pub network_alias: String,
    pub port: PortMapping,
    pub environment: Vec<(String, String)>,
    pub depends_on: Vec<String>,
}

impl PerNodeServiceConfig {
    pub fn env(&self, key: &str) -> Option<&str> {
        self.environment
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Name of a broker setting carried as an environment variable
pub fn broker_var(setting: &str) -> String {
    format!("{}{}", BROKER_ENV_PREFIX, setting)
}

/// Settings shared by every node of one run
#[derive(Debug, Clone)]
pub struct NodeTemplate {
    pub dashboard_password: String,
}

impl NodeTemplate {
    pub fn new(dashboard_password: impl Into<String>) -> Self {
        Self {
            dashboard_password: dashboard_password.into(),
        }
    }

    /// Build the service fragment of one node.
    ///
    /// Output differs between nodes only through the identity and its role;
    /// moving a node between core and replicant needs nothing but a new `core_nodes`.
    pub fn emit(
        &self,
        identity: &NodeIdentity,
        seeds: &SeedList,
        spec: &ClusterSpec,
    ) -> PerNodeServiceConfig {
        let mut environment = vec![
            (broker_var("NODE__NAME"), identity.cluster_node_id.clone()),
            (broker_var("LOG__CONSOLE__LEVEL"), spec.log_level().to_string()),
            (broker_var("CLUSTER__DISCOVERY_STRATEGY"), "static".to_string()),
            (broker_var("CLUSTER__STATIC__SEEDS"), seeds.to_setting()),
            (broker_var("NODE__DB_BACKEND"), "rlog".to_string()),
            (broker_var("RPC__DRIVER"), "ssl".to_string()),
            (broker_var("RPC__CERTFILE"), format!("{}/{}", CERTS_HOME, NODE_CERT_FILE)),
            (broker_var("RPC__KEYFILE"), format!("{}/{}", CERTS_HOME, NODE_KEY_FILE)),
            (broker_var("RPC__CACERTFILE"), format!("{}/{}", CERTS_HOME, CA_CERT_FILE)),
            (broker_var("DASHBOARD__DEFAULT_PASSWORD"), self.dashboard_password.clone()),
        ];

        let mut depends_on = Vec::new();
        if identity.role == NodeRole::Replicant {
            environment.push((broker_var("NODE__DB_ROLE"), "replicant".to_string()));
            depends_on = (1..=spec.core_nodes()).map(service_name).collect();
        }

        PerNodeServiceConfig {
            index: identity.index,
            role: identity.role,
            service_name: identity.service_name(),
            container_name: identity.hostname.clone(),
            hostname: identity.hostname.clone(),
            network_alias: identity.hostname.clone(),
            port: PortMapping {
                host: identity.data_plane_port,
                container: DATA_PLANE_PORT,
            },
            environment,
            depends_on,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clusterforge_cluster::ClusterTopology;
    use clusterforge_common::{BrokerLogLevel, LoadBalanceStrategy};

    fn topology(total: usize, core: usize) -> ClusterTopology {
        let spec = ClusterSpec::new(total, core, LoadBalanceStrategy::RoundRobin, BrokerLogLevel::Warning)
            .unwrap();
        ClusterTopology::build(&spec).unwrap()
    }

    fn emit_all(topology: &ClusterTopology) -> Vec<PerNodeServiceConfig> {
        let template = NodeTemplate::new("secret");
        topology
            .nodes()
            .iter()
            .map(|n| template.emit(n, topology.seeds(), topology.spec()))
            .collect()
    }

    #[test]
    fn test_core_node_config() {
        let topology = topology(4, 2);
        let configs = emit_all(&topology);
        let n1 = &configs[0];

        assert_eq!(n1.service_name, "n1");
        assert_eq!(n1.hostname, "n1.local");
        assert_eq!(n1.network_alias, n1.hostname);
        assert_eq!(n1.port.to_string(), "1884:1883");
        assert_eq!(n1.env("EMQX_NODE__NAME"), Some("node@n1.local"));
        assert_eq!(n1.env("EMQX_LOG__CONSOLE__LEVEL"), Some("warning"));
        assert_eq!(n1.env("EMQX_CLUSTER__DISCOVERY_STRATEGY"), Some("static"));
        assert_eq!(n1.env("EMQX_NODE__DB_BACKEND"), Some("rlog"));
        assert_eq!(n1.env("EMQX_DASHBOARD__DEFAULT_PASSWORD"), Some("secret"));
        assert_eq!(n1.env("EMQX_NODE__DB_ROLE"), None);
        assert!(n1.depends_on.is_empty());
    }

    #[test]
    fn test_replicant_node_config() {
        let topology = topology(4, 2);
        let configs = emit_all(&topology);
        let n4 = &configs[3];

        assert_eq!(n4.role, NodeRole::Replicant);
        assert_eq!(n4.env("EMQX_NODE__DB_ROLE"), Some("replicant"));
        assert_eq!(n4.depends_on, vec!["n1", "n2"]);
    }

    #[test]
    fn test_every_node_shares_seed_list() {
        let topology = topology(6, 3);
        let configs = emit_all(&topology);

        for config in &configs {
            assert_eq!(
                config.env("EMQX_CLUSTER__STATIC__SEEDS"),
                Some("[node@n1.local,node@n2.local,node@n3.local]")
            );
        }
    }

    #[test]
    fn test_uniform_templating_across_roles() {
        // node 3 is core in one cluster and replicant in the other; only role-driven
        // entries may differ
        let as_core = emit_all(&topology(4, 3)).remove(2);
        let as_replicant = emit_all(&topology(4, 2)).remove(2);

        assert_eq!(as_core.hostname, as_replicant.hostname);
        assert_eq!(as_core.port, as_replicant.port);

        let replicant_env: Vec<_> = as_replicant
            .environment
            .iter()
            .filter(|(k, _)| k != "EMQX_NODE__DB_ROLE")
            .collect();
        assert_eq!(replicant_env.len(), as_core.environment.len());

        for ((core_key, core_value), (key, value)) in as_core.environment.iter().zip(&replicant_env) {
            assert_eq!(core_key, key);
            if core_key != "EMQX_CLUSTER__STATIC__SEEDS" {
                assert_eq!(core_value, value);
            }
        }
    }

    #[test]
    fn test_all_core_cluster_has_no_replicant_flags() {
        let topology = topology(3, 3);

        for config in emit_all(&topology) {
            assert_eq!(config.env("EMQX_NODE__DB_ROLE"), None);
            assert!(config.depends_on.is_empty());
        }
    }
}
