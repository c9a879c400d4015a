//! Prompt assembly under a token budget.

mod search;
mod truncate;

pub use search::{search, CategoryTables, SearchParams};
pub use truncate::{truncate_to_fit, SEPARATOR};
