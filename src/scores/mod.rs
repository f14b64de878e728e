// Pairwise similarity scores: the read-only table consumed by the engine and
// the reader for the external classifier's output format.
pub mod reader;
pub mod table;

pub use reader::read_classified_pairs;
pub use table::{PairScoreTable, SameLanguagePolicy};
