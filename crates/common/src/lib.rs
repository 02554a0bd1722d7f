//! Shared types for the Retrowoods order backend.

mod types;

pub use types::AggregateId;
