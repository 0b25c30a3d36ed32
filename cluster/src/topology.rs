use crate::node::{resolve, NodeIdentity};
use crate::seeds::SeedList;
use clusterforge_common::{ClusterSpec, NodeRole, Result};
use serde::Serialize;

/// Every node identity of one generation run plus the shared seed list.
///
/// Regenerated from scratch on every run; never mutated after `build`.
#[derive(Debug, Clone, Serialize)]
pub struct ClusterTopology {
    spec: ClusterSpec,
    nodes: Vec<NodeIdentity>,
    seeds: SeedList,
}

impl ClusterTopology {
    pub fn build(spec: &ClusterSpec) -> Result<Self> {
        let nodes = spec
            .indices()
            .map(|index| resolve(index, spec))
            .collect::<Result<Vec<_>>>()?;

        let seeds = SeedList::build(spec);

        tracing::debug!(
            "Resolved topology: {} nodes ({} core, {} replicant)",
            spec.total_nodes(),
            spec.core_nodes(),
            spec.replicant_nodes()
        );

        Ok(Self {
            spec: spec.clone(),
            nodes,
            seeds,
        })
    }

    pub fn spec(&self) -> &ClusterSpec {
        &self.spec
    }

    /// Nodes ascending by index
    pub fn nodes(&self) -> &[NodeIdentity] {
        &self.nodes
    }

    pub fn seeds(&self) -> &SeedList {
        &self.seeds
    }

    pub fn node(&self, index: usize) -> Option<&NodeIdentity> {
        self.nodes.iter().find(|n| n.index == index)
    }

    pub fn find_by_hostname(&self, hostname: &str) -> Option<&NodeIdentity> {
        self.nodes.iter().find(|n| n.hostname == hostname)
    }

    pub fn cores(&self) -> impl Iterator<Item = &NodeIdentity> {
        self.nodes.iter().filter(|n| n.role == NodeRole::Core)
    }

    pub fn replicants(&self) -> impl Iterator<Item = &NodeIdentity> {
        self.nodes.iter().filter(|n| n.role == NodeRole::Replicant)
    }
}
