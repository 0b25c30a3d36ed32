use clusterforge_cluster::{NodeIdentity, NodeInventory};
use clusterforge_common::{ClusterForgeError, Result, METRICS_PATH, METRICS_PORT};
use serde::Serialize;

pub const SCRAPE_JOB: &str = "broker";
pub const SCRAPE_INTERVAL: &str = "15s";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GlobalSettings {
    pub scrape_interval: String,
    pub evaluation_interval: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StaticConfig {
    pub targets: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScrapeJob {
    pub job_name: String,
    pub metrics_path: String,
    pub static_configs: Vec<StaticConfig>,
}

/// Metrics-scraping configuration (prometheus.yml)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScrapeConfig {
    pub global: GlobalSettings,
    pub scrape_configs: Vec<ScrapeJob>,
}

impl ScrapeConfig {
    /// One target per node, all under a single job
    pub fn emit(identities: &[NodeIdentity]) -> Self {
        let targets = identities
            .iter()
            .map(|n| format!("{}:{}", n.hostname, METRICS_PORT))
            .collect();

        Self {
            global: GlobalSettings {
                scrape_interval: SCRAPE_INTERVAL.to_string(),
                evaluation_interval: SCRAPE_INTERVAL.to_string(),
            },
            scrape_configs: vec![ScrapeJob {
                job_name: SCRAPE_JOB.to_string(),
                metrics_path: METRICS_PATH.to_string(),
                static_configs: vec![StaticConfig { targets }],
            }],
        }
    }

    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.scrape_configs
            .iter()
            .flat_map(|job| job.static_configs.iter())
            .flat_map(|config| config.targets.iter())
            .map(String::as_str)
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| ClusterForgeError::Serialization {
            message: format!("Failed to serialize scrape config: {}", e),
        })
    }
}

impl NodeInventory for ScrapeConfig {
    fn artifact_name(&self) -> &str {
        "scrape config"
    }

    fn node_hosts(&self) -> Vec<&str> {
        self.targets()
            .map(|target| target.rsplit_once(':').map_or(target, |(host, _)| host))
            .collect()
    }
}
