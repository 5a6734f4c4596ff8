//! Data layer: core types, parsing, statistics and differencing.
//!
//! Architecture:
//! ```text
//!   .s1p            .dat / .txt
//!     │                 │
//!     ▼                 ▼
//!  ┌──────┐         ┌──────┐
//!  │ s1p  │         │ dat  │   parse file → ParseResult
//!  └──────┘         └──────┘
//!        \           /
//!         ▼         ▼
//!    ┌────────────────┐
//!    │ TabularDataset │  fields, rows of Option<f64>, metadata
//!    └────────────────┘
//!       │          │
//!       ▼          ▼
//!  ┌─────────┐ ┌────────────┐
//!  │ summary │ │ difference │  two datasets → resampled A − B
//!  └─────────┘ └────────────┘
//!                   │
//!                   ▼
//!              ┌────────┐
//!              │ export │  dataset → CSV
//!              └────────┘
//! ```

pub mod dat;
pub mod difference;
pub mod error;
pub mod export;
pub mod loader;
pub mod model;
pub mod s1p;
pub mod summary;

pub use dat::{parse_dat, parse_dat_str, ColumnLayout};
pub use difference::{
    difference, difference_with, DifferenceKind, DifferenceOptions, DifferenceResult,
};
pub use error::{DataError, DataResult};
pub use export::{to_csv, write_csv};
pub use loader::{file_kind, load_file};
pub use model::{
    display_label, FileKind, Metadata, MetadataValue, ParseResult, Row, TabularDataset,
};
pub use s1p::{parse_s1p, parse_s1p_str, parse_s1p_with, S1pOptions};
pub use summary::{summarize, FieldStats, Summary};
