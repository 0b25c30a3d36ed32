use crate::error::{ClusterForgeError, Result};
use crate::types::{BrokerLogLevel, ClusterSpec, LoadBalanceStrategy};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variables with this prefix configure the generator, e.g. `CLUSTERFORGE_TOTAL_NODES`
pub const ENV_PREFIX: &str = "CLUSTERFORGE";

/// Generator configuration, loaded once at startup and passed down explicitly
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Console log level of every broker node
    pub log_level: BrokerLogLevel,

    /// Total number of broker nodes
    pub total_nodes: usize,

    /// Number of core nodes (the first `core_nodes` indices)
    pub core_nodes: usize,

    /// Balancing algorithm of the data-plane pool
    pub lb_strategy: LoadBalanceStrategy,

    /// Directory receiving every generated artifact; also the container build context
    pub output_dir: PathBuf,

    /// Pre-built broker release, relative to `output_dir`
    pub release_dir: PathBuf,

    /// Certificate bundle directory, relative to `output_dir`
    pub cert_dir: PathBuf,

    /// Host os-release file used to pick the container base image
    pub os_release: PathBuf,

    /// Image tag shared by every broker service
    pub image_tag: String,

    /// Orchestration CLI that receives pass-through arguments
    pub compose_command: String,

    /// Certificate authority executable
    pub openssl: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            log_level: BrokerLogLevel::Notice,
            total_nodes: 10,
            core_nodes: 3,
            lb_strategy: LoadBalanceStrategy::RoundRobin,
            output_dir: PathBuf::from("."),
            release_dir: PathBuf::from("_build/emqx/rel/emqx"),
            cert_dir: PathBuf::from("certs"),
            os_release: PathBuf::from("/etc/os-release"),
            image_tag: "clusterforge/broker:latest".to_string(),
            compose_command: "docker compose".to_string(),
            openssl: "openssl".to_string(),
        }
    }
}

impl GeneratorConfig {
    /// Load configuration from an environment captured once at startup, with priority chain:
    /// 1. Variables in `vars` prefixed with `CLUSTERFORGE_`
    /// 2. Built-in defaults
    ///
    /// The process environment itself is never read.
    pub fn from_vars<I>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let source: ::config::Map<String, String> = vars.into_iter().collect();

        let defaults_json = serde_json::to_string(&Self::default()).map_err(|e| {
            ClusterForgeError::Serialization {
                message: format!("Failed to serialize default configuration: {}", e),
            }
        })?;

        let settings = ::config::Config::builder()
            .add_source(::config::File::from_str(
                &defaults_json,
                ::config::FileFormat::Json,
            ))
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .try_parsing(true)
                    .source(Some(source)),
            )
            .build()
            .map_err(|e| ClusterForgeError::configuration(format!("Failed to build config: {}", e)))?;

        let config: Self = settings.try_deserialize().map_err(|e| {
            ClusterForgeError::configuration(format!("Failed to deserialize config: {}", e))
        })?;

        config.validate()?;
        tracing::debug!(
            "Loaded configuration: {} nodes ({} core), output in {}",
            config.total_nodes,
            config.core_nodes,
            config.output_dir.display()
        );
        Ok(config)
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.image_tag.trim().is_empty() {
            return Err(ClusterForgeError::configuration("image_tag cannot be empty"));
        }
        if self.compose_command.split_whitespace().next().is_none() {
            return Err(ClusterForgeError::configuration(
                "compose_command cannot be empty",
            ));
        }
        if self.openssl.trim().is_empty() {
            return Err(ClusterForgeError::configuration("openssl cannot be empty"));
        }
        if self.release_dir.is_absolute() || self.cert_dir.is_absolute() {
            return Err(ClusterForgeError::configuration(
                "release_dir and cert_dir must be relative to output_dir",
            ));
        }
        Ok(())
    }

    /// Resolve the cluster spec, rejecting invalid node counts
    pub fn spec(&self) -> Result<ClusterSpec> {
        ClusterSpec::new(
            self.total_nodes,
            self.core_nodes,
            self.lb_strategy,
            self.log_level,
        )
    }

    pub fn release_path(&self) -> PathBuf {
        self.output_dir.join(&self.release_dir)
    }

    pub fn cert_path(&self) -> PathBuf {
        self.output_dir.join(&self.cert_dir)
    }
}
