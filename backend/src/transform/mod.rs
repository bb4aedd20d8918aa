//! Transformation module.
//!
//! - Normalize: positional rows to canonical records
//! - Filter: campus and numeric-grade predicates
//! - Project: enrollment and grade rows
//! - Pipeline: end-to-end run

pub mod filter;
pub mod normalize;
pub mod pipeline;
pub mod project;

pub use filter::{coerce_numeric, filter_records, FilterReport, CAMPUS};
pub use normalize::normalize;
pub use pipeline::*;
pub use project::{project_enrollment, project_grades};
