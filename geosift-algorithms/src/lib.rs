//! geosift-algorithms: Search and clustering engines.
//!
//! Two engines over filtered record sets:
//! - **Radius search** - great-circle distance selection around a center,
//!   sorted ascending with deterministic tie-breaks
//! - **Greedy clustering** - online centroid-proximity partitioning in
//!   pinned lexical order, resumable from a checkpoint accumulator
//!
#![warn(missing_docs)]

mod greedy;
mod search;

pub use greedy::{name_clusters, ClusterState, GreedyClusterer};
pub use search::{resolve_center, RadiusSearch, SearchAccumulator};

// Re-export the core types the engines produce
pub use geosift_core::{Cluster, SearchHit};
