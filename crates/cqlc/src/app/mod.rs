//! Application layer orchestrating domain logic and infrastructure.

pub mod decorations;
pub mod generate;
pub mod listing;
pub mod store;
