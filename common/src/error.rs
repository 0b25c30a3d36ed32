use thiserror::Error;

/// Errors raised while resolving, validating or writing a cluster definition
#[derive(Debug, Error)]
pub enum ClusterForgeError {
    /// Invalid or unresolvable generator input
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// The resolved node set is internally inconsistent
    #[error("Topology error: {message}")]
    Topology { message: String },

    #[error("Port {port} of node {node} collides with the reserved {reserved} port")]
    PortCollision {
        node: usize,
        port: u16,
        reserved: String,
    },

    /// An emitted artifact does not cover exactly the resolved node set
    #[error("Artifact '{artifact}' does not match the cluster node set: {message}")]
    ArtifactMismatch { artifact: String, message: String },

    /// An external process (certificate authority, orchestration CLI) failed
    #[error("External tool '{tool}' failed: {message}")]
    ExternalTool { tool: String, message: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClusterForgeError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn topology(message: impl Into<String>) -> Self {
        Self::Topology {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ClusterForgeError>;
