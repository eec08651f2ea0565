//! Build command implementation
//!
//! Renders the deployment definition and prints the merged manifests to
//! stdout, or writes them to `--output`. Progress goes to the log on stderr
//! so the output can be piped straight into `kubectl apply -f -`.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use manifest_render::config::from_file;
use manifest_render::defaults::{
    default_definition_path, DEFAULT_KUSTOMIZE_PROGRAM, DEFAULT_SCRATCH_DIR,
};
use manifest_render::pipeline::{render, RenderOptions};

/// Arguments for the build command
#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Path to the deployment definition
    #[arg(short, long, value_name = "PATH", env = "MANIFEST_RENDER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Use development image tags and always pull
    #[arg(long)]
    pub dev: bool,

    /// Scratch directory for the rendered template copy
    #[arg(long, value_name = "PATH", env = "MANIFEST_RENDER_SCRATCH")]
    pub scratch_dir: Option<PathBuf>,

    /// kustomize executable
    #[arg(long, value_name = "PROGRAM", env = "MANIFEST_RENDER_KUSTOMIZE")]
    pub kustomize: Option<PathBuf>,

    /// Write the merged manifests to a file instead of stdout
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Remove the scratch directory after a successful build
    #[arg(long)]
    pub clean: bool,
}

impl BuildArgs {
    fn options(&self) -> RenderOptions {
        RenderOptions {
            dev: self.dev,
            scratch_dir: self
                .scratch_dir
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SCRATCH_DIR)),
            kustomize: self
                .kustomize
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_KUSTOMIZE_PROGRAM)),
            clean: self.clean,
        }
    }
}

/// Execute the build command
pub fn execute(args: BuildArgs) -> Result<()> {
    let config_path = args.config.clone().unwrap_or_else(default_definition_path);

    if !config_path.exists() {
        anyhow::bail!("Deployment definition not found: {}", config_path.display());
    }

    let definition = from_file(&config_path)
        .with_context(|| format!("Unable to read {}", config_path.display()))?;
    let options = args.options();
    let manifests = render(&definition, &options, &options.builder())?;

    match &args.output {
        Some(path) => {
            std::fs::write(path, &manifests)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            log::info!("Wrote {}", path.display());
        }
        None => print!("{}", manifests),
    }
    Ok(())
}
