//! Aggregation: weekly delivery-category tables for a filtered population,
//! and the bucketed slice used for export.

pub mod buckets;
pub mod tabulate;

pub use buckets::{BucketSpec, BucketTable, tabulate_buckets};
pub use tabulate::{CategoryCounts, WeekRow, WeeklyTable, tabulate};
