pub mod clustering;
pub mod element;
pub mod logging;
pub mod partition;
pub mod scores;

pub use clustering::{ClusteringEngine, ClusterStore};
pub use element::Element;
pub use scores::{PairScoreTable, SameLanguagePolicy};
