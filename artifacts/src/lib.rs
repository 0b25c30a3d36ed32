pub mod certs;
pub mod compose;
pub mod envfile;
pub mod generator;
pub mod haproxy;
pub mod image;
pub mod node;
pub mod prometheus;
pub mod secrets;
pub mod writer;

pub use certs::{ensure_certificate, CertificateAuthority, CertificateBundle, OpensslAuthority};
pub use compose::ComposeFile;
pub use envfile::EnvironmentFile;
pub use generator::{GenerationReport, Generator, RenderedCluster};
pub use haproxy::LoadBalancerConfig;
pub use image::{detect_base_image, ContainerRecipe, IgnoreList};
pub use node::{NodeTemplate, PerNodeServiceConfig};
pub use prometheus::ScrapeConfig;
pub use secrets::GeneratedSecrets;
pub use writer::{ArtifactWriter, RenderedArtifact};
