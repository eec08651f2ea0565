//! # Error Handling
//!
//! This module defines the centralized error type for the `manifest-render`
//! library. It uses `thiserror` to describe every failure mode of a render
//! with enough context for an operator to fix the input and re-run.
//!
//! The variants fall into four groups:
//!
//! - **Configuration errors** (`ConfigParse`, `MissingKey`, `EmptyValue`,
//!   `InvalidValue`, `UnsupportedArtifactRepository`): the deployment
//!   definition or params document cannot produce a consistent render. These
//!   are always raised before the scratch tree is touched.
//! - **I/O errors** (`Filesystem`, `Io`): copying, reading or writing files
//!   failed. `Filesystem` carries the operation and path.
//! - **Parse errors** (`Yaml`, `Regex`): wrapped from the underlying crates.
//! - **External tool errors** (`ExternalTool`): the merge step exited
//!   unsuccessfully. Its stderr is surfaced verbatim.
//!
//! The `Result` alias is used throughout the library.

use thiserror::Error;

/// Main error type for manifest rendering
#[derive(Error, Debug)]
pub enum Error {
    /// A configuration or params document could not be parsed.
    #[error("Configuration parsing error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    ConfigParse {
        message: String,
        /// Optional hint for how to fix the document
        hint: Option<String>,
    },

    /// A required configuration path is absent.
    #[error("Missing required value '{key}' in {context}")]
    MissingKey { key: String, context: String },

    /// A required configuration value is present but empty.
    #[error("Required value '{key}' cannot be empty")]
    EmptyValue { key: String },

    /// A configuration value has the wrong shape or type.
    #[error("Invalid value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// The artifact repository section names no supported storage provider.
    #[error("Unsupported artifactRepository configuration: {message}")]
    UnsupportedArtifactRepository { message: String },

    /// A filesystem operation on the template or scratch tree failed.
    #[error("Filesystem operation error: {message}")]
    Filesystem { message: String },

    /// The external manifest build tool failed.
    #[error("External command failed: {command} ({status})\n{stderr}")]
    ExternalTool {
        command: String,
        status: String,
        stderr: String,
    },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A regular expression error, wrapped from `regex::Error`.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),
}

impl Error {
    /// Build a `Filesystem` error for `verb` applied to `path`.
    pub(crate) fn fs(verb: &str, path: &std::path::Path, err: impl std::fmt::Display) -> Self {
        Error::Filesystem {
            message: format!("Failed to {} '{}': {}", verb, path.display(), err),
        }
    }

    /// Returns true for errors caused by the user's configuration rather than
    /// the environment.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Error::ConfigParse { .. }
                | Error::MissingKey { .. }
                | Error::EmptyValue { .. }
                | Error::InvalidValue { .. }
                | Error::UnsupportedArtifactRepository { .. }
        )
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
