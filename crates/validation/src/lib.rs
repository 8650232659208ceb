//! `c2t-validation` — attribute validation engine for City2TABULA.
//!
//! Compares calculated building and surface attributes against reference
//! (thematic) values: attribute-aware differences, tolerance checks, error
//! metrics, outliers and flagged-record export.
//!
//! Pure engine crate: receives pre-loaded tables, returns validation records.
//! No CLI dependencies.

pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod export;
pub mod load;
pub mod mapping;
pub mod metrics;
pub mod model;
pub mod semantics;
pub mod validator;

pub use config::ValidationConfig;
pub use diagnostics::{Diagnostic, Diagnostics};
pub use engine::run;
pub use error::ValidationError;
pub use mapping::AttributeMapping;
pub use model::{ValidationInput, ValidationRecord, ValidationReport};
