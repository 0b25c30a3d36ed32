pub mod node;
pub mod seeds;
pub mod topology;
pub mod validator;

pub use node::{classify, resolve, NodeIdentity};
pub use seeds::SeedList;
pub use topology::ClusterTopology;
pub use validator::{validate_artifacts, validate_inventory, validate_topology, NodeInventory};
