use crate::certs::{ensure_certificate, CertificateAuthority, CertificateBundle};
use crate::compose::{ComposeFile, ComposeFiles};
use crate::envfile::EnvironmentFile;
use crate::haproxy::LoadBalancerConfig;
use crate::image::{detect_base_image, ContainerRecipe, IgnoreList};
use crate::node::{NodeTemplate, PerNodeServiceConfig};
use crate::prometheus::ScrapeConfig;
use crate::secrets::GeneratedSecrets;
use crate::writer::{ArtifactWriter, RenderedArtifact};
use clusterforge_cluster::{validate_artifacts, validate_topology, ClusterTopology, NodeInventory};
use clusterforge_common::{
    ClusterForgeError, GeneratorConfig, Result, BACKPLANE_HOSTNAME, BROKER_ENV_PREFIX,
};
use std::path::PathBuf;

pub const COMPOSE_FILE: &str = "docker-compose.yml";
pub const HAPROXY_FILE: &str = "haproxy.cfg";
pub const PROMETHEUS_FILE: &str = "prometheus.yml";
pub const DOCKERFILE: &str = "Dockerfile";
pub const DOCKERIGNORE_FILE: &str = ".dockerignore";
pub const BROKER_ENV_FILE: &str = "broker.env";

/// Every artifact of one run, rendered and validated but not yet written
#[derive(Debug, Clone)]
pub struct RenderedCluster {
    pub topology: ClusterTopology,
    pub compose_yaml: String,
    pub artifacts: Vec<RenderedArtifact>,
}

/// Outcome of a successful [`Generator::generate`]
#[derive(Debug, Clone)]
pub struct GenerationReport {
    pub written: Vec<PathBuf>,
    pub certificates: CertificateBundle,
    pub compose_yaml: String,
    pub node_count: usize,
}

/// Turns a [`GeneratorConfig`] into the full set of cluster artifacts
#[derive(Debug, Clone)]
pub struct Generator {
    config: GeneratorConfig,
    broker_env: EnvironmentFile,
}

impl Generator {
    /// `vars` is the process environment captured at startup; only broker
    /// settings are kept from it.
    pub fn new<I>(config: GeneratorConfig, vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Self {
            config,
            broker_env: EnvironmentFile::extract(vars, BROKER_ENV_PREFIX),
        }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Render with freshly generated secrets
    pub fn render(&self) -> Result<RenderedCluster> {
        self.render_with(&GeneratedSecrets::generate())
    }

    pub fn render_with(&self, secrets: &GeneratedSecrets) -> Result<RenderedCluster> {
        let spec = self.config.spec()?;

        let release_path = self.config.release_path();
        if !release_path.is_dir() {
            return Err(ClusterForgeError::configuration(format!(
                "broker release not found at {}",
                release_path.display()
            )));
        }

        let topology = ClusterTopology::build(&spec)?;
        validate_topology(&topology)?;
        tracing::info!(
            "Validated topology: {} nodes ({} core, {} replicant)",
            spec.total_nodes(),
            spec.core_nodes(),
            spec.replicant_nodes()
        );

        let template = NodeTemplate::new(secrets.dashboard_password.as_str());
        let nodes: Vec<PerNodeServiceConfig> = topology
            .nodes()
            .iter()
            .map(|identity| template.emit(identity, topology.seeds(), &spec))
            .collect();

        let compose = ComposeFile::build(
            &nodes,
            &self.config.image_tag,
            &secrets.monitoring_password,
            &ComposeFiles {
                dockerfile: DOCKERFILE.to_string(),
                env_file: BROKER_ENV_FILE.to_string(),
                haproxy_config: HAPROXY_FILE.to_string(),
                prometheus_config: PROMETHEUS_FILE.to_string(),
            },
        );
        let load_balancer = LoadBalancerConfig::emit(topology.nodes(), &spec);
        let scrape = ScrapeConfig::emit(topology.nodes());

        let mut inventories: Vec<&dyn NodeInventory> = vec![&compose, &scrape];
        inventories.extend(load_balancer.node_pools().map(|l| l as &dyn NodeInventory));
        validate_artifacts(&topology, &inventories)?;

        let recipe = ContainerRecipe::new(
            detect_base_image(&self.config.os_release),
            &self.config.release_dir,
            &self.config.cert_dir,
        );

        let compose_yaml = compose.to_yaml()?;
        let artifacts = vec![
            RenderedArtifact::new(COMPOSE_FILE, compose_yaml.clone()),
            RenderedArtifact::new(HAPROXY_FILE, load_balancer.to_string()),
            RenderedArtifact::new(PROMETHEUS_FILE, scrape.to_yaml()?),
            RenderedArtifact::new(DOCKERFILE, recipe.to_string()),
            RenderedArtifact::new(DOCKERIGNORE_FILE, IgnoreList::default().to_string()),
            RenderedArtifact::new(BROKER_ENV_FILE, self.broker_env.to_string()),
        ];
        for artifact in &artifacts {
            tracing::debug!(
                "Rendered {} ({} bytes)",
                artifact.file_name,
                artifact.contents.len()
            );
        }

        Ok(RenderedCluster {
            topology,
            compose_yaml,
            artifacts,
        })
    }

    /// Render, provision the certificate bundle, then write every artifact
    pub fn generate(&self, authority: &dyn CertificateAuthority) -> Result<GenerationReport> {
        let rendered = self.render()?;

        let certificates =
            ensure_certificate(self.config.cert_path(), BACKPLANE_HOSTNAME, authority)?;

        let writer = ArtifactWriter::new(&self.config.output_dir);
        let written = writer.write_all(&rendered.artifacts)?;
        tracing::info!(
            "Wrote {} artifacts to {}",
            written.len(),
            writer.dir().display()
        );

        Ok(GenerationReport {
            written,
            certificates,
            compose_yaml: rendered.compose_yaml,
            node_count: rendered.topology.nodes().len(),
        })
    }
}
