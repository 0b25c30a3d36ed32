use crate::topology::ClusterTopology;
use clusterforge_common::{ClusterForgeError, Result, RESERVED_PORTS};
use std::collections::{BTreeSet, HashSet};

/// An emitted artifact that addresses broker nodes by hostname
pub trait NodeInventory {
    /// Name used in error messages
    fn artifact_name(&self) -> &str;

    /// Hostnames of every node entry, in emission order
    fn node_hosts(&self) -> Vec<&str>;
}

/// Check the resolved topology before any artifact is built from it
pub fn validate_topology(topology: &ClusterTopology) -> Result<()> {
    let spec = topology.spec();

    if spec.core_nodes() < 1 || spec.core_nodes() > spec.total_nodes() {
        return Err(ClusterForgeError::configuration(format!(
            "core node count must be within 1..={}, got {}",
            spec.total_nodes(),
            spec.core_nodes()
        )));
    }

    let nodes = topology.nodes();
    if nodes.len() != spec.total_nodes() {
        return Err(ClusterForgeError::topology(format!(
            "resolved {} nodes, expected {}",
            nodes.len(),
            spec.total_nodes()
        )));
    }

    let mut hostnames = HashSet::new();
    let mut node_ids = HashSet::new();
    let mut ports = HashSet::new();

    for (position, node) in nodes.iter().enumerate() {
        if node.index != position + 1 {
            return Err(ClusterForgeError::topology(format!(
                "node indices are not dense: found {} at position {}",
                node.index,
                position + 1
            )));
        }
        if !hostnames.insert(node.hostname.as_str()) {
            return Err(ClusterForgeError::topology(format!(
                "duplicate hostname '{}'",
                node.hostname
            )));
        }
        if !node_ids.insert(node.cluster_node_id.as_str()) {
            return Err(ClusterForgeError::topology(format!(
                "duplicate cluster node id '{}'",
                node.cluster_node_id
            )));
        }
        if !ports.insert(node.data_plane_port) {
            return Err(ClusterForgeError::topology(format!(
                "duplicate data-plane port {}",
                node.data_plane_port
            )));
        }
        if let Some((reserved, _)) = RESERVED_PORTS
            .iter()
            .find(|(_, port)| *port == node.data_plane_port)
        {
            return Err(ClusterForgeError::PortCollision {
                node: node.index,
                port: node.data_plane_port,
                reserved: reserved.to_string(),
            });
        }
    }

    let expected_seeds: Vec<&str> = topology
        .cores()
        .map(|n| n.cluster_node_id.as_str())
        .collect();
    if topology.seeds().as_slice() != expected_seeds.as_slice() {
        return Err(ClusterForgeError::topology(
            "seed list does not match the core node set",
        ));
    }

    Ok(())
}

/// Check that an artifact enumerates exactly the nodes `1..=total_nodes`
pub fn validate_inventory(topology: &ClusterTopology, artifact: &dyn NodeInventory) -> Result<()> {
    let mismatch = |message: String| ClusterForgeError::ArtifactMismatch {
        artifact: artifact.artifact_name().to_string(),
        message,
    };

    let mut seen = BTreeSet::new();
    for host in artifact.node_hosts() {
        let node = topology
            .find_by_hostname(host)
            .ok_or_else(|| mismatch(format!("unknown host '{}'", host)))?;
        if !seen.insert(node.index) {
            return Err(mismatch(format!("node {} listed more than once", host)));
        }
    }

    let missing: Vec<String> = topology
        .nodes()
        .iter()
        .filter(|n| !seen.contains(&n.index))
        .map(|n| n.hostname.clone())
        .collect();
    if !missing.is_empty() {
        return Err(mismatch(format!("missing nodes {}", missing.join(", "))));
    }

    tracing::debug!(
        "Artifact '{}' covers all {} nodes",
        artifact.artifact_name(),
        seen.len()
    );
    Ok(())
}

/// Run [`validate_inventory`] over every artifact, stopping at the first mismatch
pub fn validate_artifacts(
    topology: &ClusterTopology,
    artifacts: &[&dyn NodeInventory],
) -> Result<()> {
    for artifact in artifacts {
        validate_inventory(topology, *artifact)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clusterforge_common::{BrokerLogLevel, ClusterSpec, LoadBalanceStrategy};

    struct HostList {
        hosts: Vec<&'static str>,
    }

    impl NodeInventory for HostList {
        fn artifact_name(&self) -> &str {
            "test"
        }

        fn node_hosts(&self) -> Vec<&str> {
            self.hosts.clone()
        }
    }

    fn topology(total: usize, core: usize) -> ClusterTopology {
        let spec = ClusterSpec::new(total, core, LoadBalanceStrategy::RoundRobin, BrokerLogLevel::Notice)
            .unwrap();
        ClusterTopology::build(&spec).unwrap()
    }

    #[test]
    fn test_valid_topology() {
        assert!(validate_topology(&topology(10, 3)).is_ok());
        assert!(validate_topology(&topology(1, 1)).is_ok());
    }

    #[test]
    fn test_reserved_port_collision() {
        // node 1117 maps to host port 3000
        let result = validate_topology(&topology(1117, 3));

        match result {
            Err(ClusterForgeError::PortCollision { node, port, .. }) => {
                assert_eq!(node, 1117);
                assert_eq!(port, 3000);
            }
            other => panic!("expected port collision, got {:?}", other),
        }
        assert!(validate_topology(&topology(1116, 3)).is_ok());
    }

    #[test]
    fn test_inventory_matches() {
        let topology = topology(3, 1);
        let artifact = HostList {
            hosts: vec!["n1.local", "n2.local", "n3.local"],
        };

        assert!(validate_inventory(&topology, &artifact).is_ok());
    }

    #[test]
    fn test_inventory_mismatches() {
        let topology = topology(3, 1);

        let missing = HostList {
            hosts: vec!["n1.local", "n3.local"],
        };
        let duplicate = HostList {
            hosts: vec!["n1.local", "n2.local", "n2.local", "n3.local"],
        };
        let orphan = HostList {
            hosts: vec!["n1.local", "n2.local", "n3.local", "n4.local"],
        };

        for artifact in [&missing, &duplicate, &orphan] {
            assert!(matches!(
                validate_inventory(&topology, artifact),
                Err(ClusterForgeError::ArtifactMismatch { .. })
            ));
        }
        assert!(validate_artifacts(&topology, &[&missing]).is_err());
    }
}
