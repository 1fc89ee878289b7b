//! Command-line interface module.

mod args;
pub mod client;
pub mod format;
pub mod serve;

pub use args::{Cli, ClientArgs, Commands};
