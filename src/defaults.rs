//! Default values for manifest-render options.
//!
//! Centralized so the library and the CLI agree on them.

use std::path::PathBuf;

/// Scratch directory holding the rendered template copy, relative to the
/// working directory.
///
/// Overridden by `--scratch-dir` or `MANIFEST_RENDER_SCRATCH`.
pub const DEFAULT_SCRATCH_DIR: &str = ".manifests/cache";

/// Merge tool executable, looked up on `PATH`.
pub const DEFAULT_KUSTOMIZE_PROGRAM: &str = "kustomize";

/// Returns the default deployment definition path.
///
/// Overridden by `--config` or `MANIFEST_RENDER_CONFIG`.
pub fn default_definition_path() -> PathBuf {
    PathBuf::from(crate::config::DEFAULT_DEFINITION_FILE)
}
