//! CLI command implementations.

pub mod config;
pub mod interrogate;
pub mod score;

mod images;
