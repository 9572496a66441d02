pub mod memory;
pub mod snapshot;
pub mod store;

#[cfg(test)]
pub mod fixtures;

pub use memory::MemoryGraph;
pub use snapshot::Snapshot;
pub use store::{GraphStore, NodeIter, RelIter};
