//! # Render Pipeline
//!
//! `render` turns a deployment definition into one merged manifest:
//!
//! 1. **Load**: parse the params document into a [`ConfigTree`].
//! 2. **Derive**: compute URLs, image tags, fragments and the artifact
//!    repository block (see [`crate::derive`]).
//! 3. **Flatten**: build the [`FlatMap`] with lowerCamel keys and merge the
//!    hidden workflow settings on top.
//! 4. **Plan**: validate and render env and secret projections.
//! 5. **Stage**: recreate the scratch tree, write the kustomization and the
//!    projections, substitute placeholders in every file.
//! 6. **Build**: hand the scratch tree to the [`ManifestBuilder`].
//!
//! Steps 1 to 4 never touch the filesystem outside of reads, so a
//! configuration error leaves any previous scratch tree as it was.

use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::builder::{KustomizeCli, ManifestBuilder};
use crate::config::Definition;
use crate::defaults::{DEFAULT_KUSTOMIZE_PROGRAM, DEFAULT_SCRATCH_DIR};
use crate::derive::{derive_values, CloudSettings};
use crate::error::{Error, Result};
use crate::flatmap::FlatMap;
use crate::overlay::compose;
use crate::projection::{self, ProjectionPlan};
use crate::tree::{ConfigTree, LowerCamelCase};
use crate::workspace::Workspace;

/// Hidden workflow settings merged over the flattened params.
pub const WORKFLOW_HIDDEN_ENV: &str = "vars/workflow-config-map-hidden.env";

/// Options of one render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    /// Use `dev` image tags with an `Always` pull policy
    pub dev: bool,
    /// Scratch directory, recreated on every render
    pub scratch_dir: PathBuf,
    /// Merge tool executable
    pub kustomize: PathBuf,
    /// Remove the scratch directory after a successful build
    pub clean: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            dev: false,
            scratch_dir: PathBuf::from(DEFAULT_SCRATCH_DIR),
            kustomize: PathBuf::from(DEFAULT_KUSTOMIZE_PROGRAM),
            clean: false,
        }
    }
}

impl RenderOptions {
    /// The builder running the configured kustomize executable.
    pub fn builder(&self) -> KustomizeCli {
        KustomizeCli::new(&self.kustomize)
    }
}

/// Values and projections computed before the scratch tree is touched.
#[derive(Debug, Clone)]
pub struct Prepared {
    pub values: FlatMap,
    pub projections: ProjectionPlan,
}

/// Run the load, derive, flatten and plan steps.
pub fn prepare(definition: &Definition, options: &RenderOptions) -> Result<Prepared> {
    let manifests_repo = definition.manifests_repo();
    let params_path = definition.params_path();
    info!("Loading params from {}", params_path.display());
    let mut tree = ConfigTree::from_file(&params_path)?;

    let cloud = CloudSettings::from_manifests(&manifests_repo)?;
    derive_values(&mut tree, &cloud, options.dev)?;

    let mut values = tree.flatten(&LowerCamelCase);
    let hidden = read_env(&manifests_repo.join(WORKFLOW_HIDDEN_ENV))?;
    let merged = values.merge_env(&hidden);
    debug!(
        "Flattened {} values ({} from {})",
        values.len(),
        merged,
        WORKFLOW_HIDDEN_ENV
    );

    let projections = projection::plan(&tree, &values)?;
    Ok(Prepared {
        values,
        projections,
    })
}

/// Render a deployment definition to a merged manifest.
pub fn render(
    definition: &Definition,
    options: &RenderOptions,
    builder: &dyn ManifestBuilder,
) -> Result<String> {
    let prepared = prepare(definition, options)?;
    let kustomization = compose(&definition.overlay_components());

    let workspace = Workspace::prepare(&definition.manifests_repo(), &options.scratch_dir)?;
    workspace.write_kustomization(&kustomization)?;
    prepared.projections.write(&workspace)?;
    let report = workspace.substitute(&prepared.values)?;
    info!(
        "Rendered {} of {} files in {}",
        report.files_changed,
        report.files_scanned,
        workspace.root().display()
    );

    let output = builder.build(workspace.root())?;
    if options.clean {
        workspace.destroy()?;
    }
    Ok(output)
}

fn read_env(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| Error::fs("read", path, e))
}
