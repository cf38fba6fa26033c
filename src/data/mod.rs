//! Data layer: core types, loading, language filtering, balancing, splitting.
//!
//! Architecture:
//! ```text
//!  .csv / .parquet / .json
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  loader   │  parse table(s) → CommentDataset
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  filter   │  language identification → kept rows
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │ balance   │  label mapping → undersample → shuffle
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  split    │  train / validation (optional)
//!   └──────────┘
//! ```

pub mod balance;
pub mod filter;
pub mod loader;
pub mod model;
pub mod split;
