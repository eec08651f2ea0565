//! Merge step invocation
//!
//! The rendered scratch tree is handed to an external tool that resolves the
//! kustomization and prints one merged manifest document. The tool sits
//! behind the `ManifestBuilder` trait so tests can stand in for it.

use std::path::{Path, PathBuf};
use std::process::Command;

use log::debug;

use crate::error::{Error, Result};

/// Consumes a rendered directory and returns the merged document.
pub trait ManifestBuilder {
    fn build(&self, dir: &Path) -> Result<String>;
}

/// Runs `kustomize build` on the system.
#[derive(Debug, Clone)]
pub struct KustomizeCli {
    program: PathBuf,
}

impl Default for KustomizeCli {
    fn default() -> Self {
        Self::new("kustomize")
    }
}

impl KustomizeCli {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn args(dir: &Path) -> Vec<String> {
        vec![
            "build".to_string(),
            dir.display().to_string(),
            "--load-restrictor".to_string(),
            "LoadRestrictionsNone".to_string(),
        ]
    }
}

impl ManifestBuilder for KustomizeCli {
    fn build(&self, dir: &Path) -> Result<String> {
        let args = Self::args(dir);
        let command_line = format!("{} {}", self.program.display(), args.join(" "));
        debug!("Running {}", command_line);

        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .map_err(|e| Error::ExternalTool {
                command: command_line.clone(),
                status: "failed to start".to_string(),
                stderr: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(Error::ExternalTool {
                command: command_line,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
