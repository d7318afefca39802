//! Data layer: core types, loading, filtering, validation and export.
//!
//! Architecture:
//! ```text
//!  BIM_BOKS_V1.xlsx
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  loader  │  four sheets → Workbook (cached per path)
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐        ┌──────────┐
//!   │  filter  │        │ validate │  (category, topic) ∈ definitions
//!   └──────────┘        └──────────┘
//!        │                    │
//!        ▼                    ▼
//!     TableView         session table (crate::state)
//!                             │
//!                             ▼
//!                       ┌──────────┐
//!                       │  export  │  CSV / XLSX bytes
//!                       └──────────┘
//! ```

pub mod export;
pub mod filter;
pub mod loader;
pub mod model;
pub mod sample;
pub mod validate;
