//! Data layer: record parsing, aggregation, loading and querying.
//!
//! Architecture:
//! ```text
//!  measurements.txt  (Name;Value per line)
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  parser   │  line → Record | rejection
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  loader   │  fold records → StatsAccumulator per city → Dataset
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  query    │  list (substring filter) / get (exact lookup)
//!   └──────────┘
//! ```

pub mod loader;
pub mod model;
pub mod parser;
pub mod query;
