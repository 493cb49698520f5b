pub mod projections;

pub use projections::{AggregationEngine, DetailedResultRow, UserResultRow};
