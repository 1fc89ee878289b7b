//! Shared utilities.

pub mod mime;
pub mod path;
