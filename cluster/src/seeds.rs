use crate::node::cluster_node_id;
use clusterforge_common::ClusterSpec;
use serde::Serialize;

/// Cluster node ids of the core nodes, ascending by index.
///
/// Built once per generation run and embedded unchanged in every node's
/// configuration, whatever that node's role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SeedList(Vec<String>);

impl SeedList {
    /// Build the seed list from the core index range `1..=core_nodes`
    pub fn build(spec: &ClusterSpec) -> Self {
        Self((1..=spec.core_nodes()).map(cluster_node_id).collect())
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Comma-joined ids, e.g. `node@n1.local,node@n2.local`
    pub fn joined(&self) -> String {
        self.0.join(",")
    }

    /// Value of the broker's static seeds setting, e.g. `[node@n1.local,node@n2.local]`
    pub fn to_setting(&self) -> String {
        format!("[{}]", self.joined())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clusterforge_common::{BrokerLogLevel, LoadBalanceStrategy};

    #[test]
    fn test_seed_list_covers_core_range() {
        let spec =
            ClusterSpec::new(4, 2, LoadBalanceStrategy::RoundRobin, BrokerLogLevel::Notice).unwrap();
        let seeds = SeedList::build(&spec);

        assert_eq!(seeds.as_slice(), ["node@n1.local", "node@n2.local"]);
        assert_eq!(seeds.joined(), "node@n1.local,node@n2.local");
        assert_eq!(seeds.to_setting(), "[node@n1.local,node@n2.local]");
    }

    #[test]
    fn test_single_core_seed_list() {
        let spec =
            ClusterSpec::new(1, 1, LoadBalanceStrategy::LeastConn, BrokerLogLevel::Info).unwrap();
        let seeds = SeedList::build(&spec);

        assert_eq!(seeds.len(), 1);
        assert!(!seeds.is_empty());
    }
}
