//! # CLI Command Implementations
//!
//! Each subcommand of the `manifest-render` tool lives in its own file with:
//! - An `Args` struct that defines the command-specific arguments and options,
//!   derived using `clap`.
//! - An `execute` function that takes the parsed `Args` and calls into the
//!   `manifest_render` library.

pub mod build;
pub mod completions;
