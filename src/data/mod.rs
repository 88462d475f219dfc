/// Data layer: record types, fixed-width loading, and filtering.
///
/// Architecture:
/// ```text
///  Nat2023us.txt / .parquet / .csv
///        │
///        ▼
///   ┌──────────┐
///   │  layout   │  byte offsets → BirthRecord
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  read file → NatalityDataset
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  apply demographic predicates → matching records
///   └──────────┘
/// ```

pub mod filter;
pub mod layout;
pub mod loader;
pub mod model;
