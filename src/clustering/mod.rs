// Module declarations
pub mod engine;
pub mod report;
pub mod selector;
pub mod similarity;
pub mod store;
pub mod types;

// Re-export the types callers work with directly
pub use engine::{ClusteringEngine, Phase};
pub use report::{write_graph, write_json_report, write_report};
pub use selector::MaxSimilaritySelector;
pub use similarity::SimilarityIndex;
pub use store::ClusterStore;
pub use types::{Cluster, ClusterId, MergeStep, PairKey, SimilarityEntry};

/// Merging stops once the maximum inter-cluster similarity is at or below
/// this threshold, unless the caller overrides it.
pub const DEFAULT_MERGE_THRESHOLD: f64 = 0.0;

/// Default weight of the domain-specific score when blending two tables.
pub const DEFAULT_BLEND_WEIGHT: f64 = 0.5;
