//! Path utilities.
//!
//! Pure functions for path manipulation.
//!
//! - [`fs`]: Filesystem path normalization (`normalize_path`, `relative_key`)
//! - [`route`]: URL path cleanup (`normalize_url`, `is_safe_relative`)

pub mod fs;
pub mod route;

pub use fs::{normalize_path, relative_key};
