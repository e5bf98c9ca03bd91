//! Domain types: ranges, question records, and their errors.

pub mod errors;
pub mod model;
pub mod range;
