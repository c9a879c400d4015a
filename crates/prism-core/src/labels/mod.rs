//! Label ranking against image embeddings.
//!
//! Candidate labels are embedded once per model, cached on disk keyed by a
//! content hash, and ranked by dot product against an image embedding.

mod cache;
mod rank;
pub mod table;
pub mod vocabulary;

pub use cache::{cache_path, content_hash, sanitize_model_name};
pub use rank::{rank_strings, similarities, similarity};
pub use table::{LabelTable, RankedLabel, TableSettings};
pub use vocabulary::{load_list, Vocabularies};
