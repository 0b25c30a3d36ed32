use crate::node::PerNodeServiceConfig;
use clusterforge_cluster::NodeInventory;
use clusterforge_common::{
    ClusterForgeError, Result, BACKPLANE_HOSTNAME, DASHBOARD_PORT, DATA_PLANE_PORT,
    GRAFANA_PORT, PROMETHEUS_PORT, STATS_PORT,
};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

pub const LB_SERVICE: &str = "lb";
pub const PROMETHEUS_SERVICE: &str = "prometheus";
pub const GRAFANA_SERVICE: &str = "grafana";

const HAPROXY_IMAGE: &str = "haproxy:2.8";
const PROMETHEUS_IMAGE: &str = "prom/prometheus:latest";
const GRAFANA_IMAGE: &str = "grafana/grafana:latest";

/// File names the service definition refers to
#[derive(Debug, Clone)]
pub struct ComposeFiles {
    pub dockerfile: String,
    pub env_file: String,
    pub haproxy_config: String,
    pub prometheus_config: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Build {
    pub context: String,
    pub dockerfile: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NetworkAttachment {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Network {
    pub driver: String,
}

/// One service block
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Service {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build: Option<Build>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub env_file: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub environment: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub networks: BTreeMap<String, NetworkAttachment>,
}

/// Services in insertion order (nodes first, then supporting services)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceMap(Vec<(String, Service)>);

impl ServiceMap {
    pub fn insert(&mut self, name: impl Into<String>, service: Service) {
        self.0.push((name.into(), service));
    }

    pub fn get(&self, name: &str) -> Option<&Service> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, s)| s)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Service)> {
        self.0.iter().map(|(n, s)| (n.as_str(), s))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for ServiceMap {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, service) in &self.0 {
            map.serialize_entry(name, service)?;
        }
        map.end()
    }
}

/// Cluster service definition (docker-compose.yml)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComposeFile {
    pub services: ServiceMap,
    pub networks: BTreeMap<String, Network>,
}

impl ComposeFile {
    /// One service per node plus the load balancer and the two monitoring services
    pub fn build(
        nodes: &[PerNodeServiceConfig],
        image_tag: &str,
        monitoring_password: &str,
        files: &ComposeFiles,
    ) -> Self {
        let mut services = ServiceMap::default();
        let node_names: Vec<String> = nodes.iter().map(|n| n.service_name.clone()).collect();

        for node in nodes {
            services.insert(node.service_name.clone(), node_service(node, image_tag, files));
        }

        services.insert(
            LB_SERVICE,
            Service {
                image: Some(HAPROXY_IMAGE.to_string()),
                ports: [DATA_PLANE_PORT, DASHBOARD_PORT, STATS_PORT]
                    .iter()
                    .map(|port| format!("{}:{}", port, port))
                    .collect(),
                volumes: vec![format!(
                    "./{}:/usr/local/etc/haproxy/haproxy.cfg:ro",
                    files.haproxy_config
                )],
                depends_on: node_names.clone(),
                networks: backplane(Vec::new()),
                ..Default::default()
            },
        );

        services.insert(
            PROMETHEUS_SERVICE,
            Service {
                image: Some(PROMETHEUS_IMAGE.to_string()),
                ports: vec![format!("{}:{}", PROMETHEUS_PORT, PROMETHEUS_PORT)],
                volumes: vec![format!(
                    "./{}:/etc/prometheus/prometheus.yml:ro",
                    files.prometheus_config
                )],
                depends_on: node_names,
                networks: backplane(Vec::new()),
                ..Default::default()
            },
        );

        services.insert(
            GRAFANA_SERVICE,
            Service {
                image: Some(GRAFANA_IMAGE.to_string()),
                ports: vec![format!("{}:{}", GRAFANA_PORT, GRAFANA_PORT)],
                environment: vec![format!("GF_SECURITY_ADMIN_PASSWORD={}", monitoring_password)],
                depends_on: vec![PROMETHEUS_SERVICE.to_string()],
                networks: backplane(Vec::new()),
                ..Default::default()
            },
        );

        let mut networks = BTreeMap::new();
        networks.insert(
            BACKPLANE_HOSTNAME.to_string(),
            Network {
                driver: "bridge".to_string(),
            },
        );

        Self { services, networks }
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| ClusterForgeError::Serialization {
            message: format!("Failed to serialize service definition: {}", e),
        })
    }
}

impl NodeInventory for ComposeFile {
    fn artifact_name(&self) -> &str {
        "service definition"
    }

    /// Only broker services carry a hostname
    fn node_hosts(&self) -> Vec<&str> {
        self.services
            .iter()
            .filter_map(|(_, service)| service.hostname.as_deref())
            .collect()
    }
}

fn backplane(aliases: Vec<String>) -> BTreeMap<String, NetworkAttachment> {
    let mut networks = BTreeMap::new();
    networks.insert(BACKPLANE_HOSTNAME.to_string(), NetworkAttachment { aliases });
    networks
}

fn node_service(node: &PerNodeServiceConfig, image_tag: &str, files: &ComposeFiles) -> Service {
    Service {
        image: Some(image_tag.to_string()),
        build: Some(Build {
            context: ".".to_string(),
            dockerfile: files.dockerfile.clone(),
        }),
        container_name: Some(node.container_name.clone()),
        hostname: Some(node.hostname.clone()),
        ports: vec![node.port.to_string()],
        env_file: vec![files.env_file.clone()],
        environment: node
            .environment
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect(),
        volumes: Vec::new(),
        depends_on: node.depends_on.clone(),
        networks: backplane(vec![node.network_alias.clone()]),
    }
}
