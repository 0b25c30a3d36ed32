use clusterforge_common::{
    ClusterForgeError, ClusterSpec, NodeRole, Result, DATA_PLANE_BASE_PORT, HOSTNAME_DOMAIN,
    HOSTNAME_PREFIX, NODE_NAME_PREFIX,
};
use serde::Serialize;

/// Identity of one broker node, derived purely from its 1-based index
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeIdentity {
    pub index: usize,
    pub hostname: String,
    pub cluster_node_id: String,
    pub data_plane_port: u16,
    pub role: NodeRole,
}

impl NodeIdentity {
    /// Service / server name used by the compose file and the load balancer
    pub fn service_name(&self) -> String {
        service_name(self.index)
    }

    pub fn is_core(&self) -> bool {
        matches!(self.role, NodeRole::Core)
    }
}

/// Service name of node `index`, e.g. `n3`
pub fn service_name(index: usize) -> String {
    format!("{}{}", HOSTNAME_PREFIX, index)
}

/// Hostname of node `index`, stable across regenerations
pub fn hostname(index: usize) -> String {
    format!("{}{}.{}", HOSTNAME_PREFIX, index, HOSTNAME_DOMAIN)
}

/// Cluster node identifier of node `index`
pub fn cluster_node_id(index: usize) -> String {
    format!("{}@{}", NODE_NAME_PREFIX, hostname(index))
}

/// Role of node `index`: the first `core_nodes` indices are core, the rest replicants
pub fn classify(index: usize, spec: &ClusterSpec) -> NodeRole {
    if index <= spec.core_nodes() {
        NodeRole::Core
    } else {
        NodeRole::Replicant
    }
}

/// Resolve the identity of node `index` (`1 <= index <= total_nodes`)
pub fn resolve(index: usize, spec: &ClusterSpec) -> Result<NodeIdentity> {
    if index < 1 || index > spec.total_nodes() {
        return Err(ClusterForgeError::topology(format!(
            "node index {} outside 1..={}",
            index,
            spec.total_nodes()
        )));
    }

    let data_plane_port = u16::try_from(DATA_PLANE_BASE_PORT as usize + index).map_err(|_| {
        ClusterForgeError::topology(format!(
            "data-plane port of node {} exceeds {}",
            index,
            u16::MAX
        ))
    })?;

    Ok(NodeIdentity {
        index,
        hostname: hostname(index),
        cluster_node_id: cluster_node_id(index),
        data_plane_port,
        role: classify(index, spec),
    })
}
