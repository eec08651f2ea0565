//! # Deployment Definition
//!
//! The deployment definition (`config.yaml` by default) tells the renderer
//! where the template tree and params document live, and which components
//! make up the deployment:
//!
//! ```yaml
//! apiVersion: opdef.apps.onepanel.io/v1alpha
//! kind: OpDefinition
//! spec:
//!   manifestsRepo: ./manifests
//!   params: params.yaml
//!   components:
//!     - common/application/base
//!     - path: common/istio/base
//!       overlays:
//!         - common/istio/overlays/minikube
//! ```
//!
//! Component entries are either a bare base path or a mapping with overlays.
//! Relative paths in `spec` resolve against the definition file's directory.

use std::path::{Path, PathBuf};

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::overlay::OverlayComponent;

/// Default file name of the deployment definition.
pub const DEFAULT_DEFINITION_FILE: &str = "config.yaml";

/// A component entry as written in the definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ComponentEntry {
    /// A base path without overlays
    Path(String),
    /// A base path with ordered overlays
    Overlayed(OverlayComponent),
}

impl ComponentEntry {
    pub fn to_component(&self) -> OverlayComponent {
        match self {
            ComponentEntry::Path(path) => OverlayComponent::new(path.clone()),
            ComponentEntry::Overlayed(component) => component.clone(),
        }
    }
}

/// The `spec` block of a definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefinitionSpec {
    /// Root of the template tree
    pub manifests_repo: PathBuf,
    /// Params document
    pub params: PathBuf,
    /// Ordered components
    #[serde(default)]
    pub components: Vec<ComponentEntry>,
}

/// A parsed deployment definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Definition {
    #[serde(default)]
    pub api_version: Option<String>,
    #[serde(default)]
    pub kind: Option<String>,
    pub spec: DefinitionSpec,
    /// Directory relative spec paths resolve against
    #[serde(skip)]
    pub base_dir: PathBuf,
}

impl Definition {
    /// The ordered overlay components of the deployment.
    pub fn overlay_components(&self) -> Vec<OverlayComponent> {
        self.spec
            .components
            .iter()
            .map(ComponentEntry::to_component)
            .collect()
    }

    pub fn manifests_repo(&self) -> PathBuf {
        self.resolve(&self.spec.manifests_repo)
    }

    pub fn params_path(&self) -> PathBuf {
        self.resolve(&self.spec.params)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    fn validate(&self) -> Result<()> {
        if self.spec.manifests_repo.as_os_str().is_empty() {
            return Err(Error::ConfigParse {
                message: "spec.manifestsRepo is empty".to_string(),
                hint: Some("Point manifestsRepo at the template directory".to_string()),
            });
        }
        if self.spec.params.as_os_str().is_empty() {
            return Err(Error::ConfigParse {
                message: "spec.params is empty".to_string(),
                hint: Some("Add 'params: params.yaml' under spec".to_string()),
            });
        }
        for (index, entry) in self.spec.components.iter().enumerate() {
            let component = entry.to_component();
            if component.path.trim().is_empty() {
                return Err(Error::ConfigParse {
                    message: format!("spec.components[{}] has an empty path", index),
                    hint: None,
                });
            }
        }
        if self.spec.components.is_empty() {
            warn!("Deployment definition lists no components");
        }
        Ok(())
    }
}

/// Parse a definition from YAML. Relative paths resolve against the current
/// directory.
pub fn parse(yaml_content: &str) -> Result<Definition> {
    let definition: Definition =
        serde_yaml::from_str(yaml_content).map_err(|e| Error::ConfigParse {
            message: e.to_string(),
            hint: Some("Expected 'spec' with 'manifestsRepo' and 'params'".to_string()),
        })?;
    definition.validate()?;
    Ok(definition)
}

/// Read and parse a definition file.
pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Definition> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| Error::fs("read", path, e))?;
    let mut definition = parse(&content)?;
    definition.base_dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    Ok(definition)
}
