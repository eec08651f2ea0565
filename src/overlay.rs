//! Overlay composition
//!
//! Turns the ordered component list of a deployment definition into the
//! `kustomization.yaml` that drives the merge step. A component contributes
//! either its base path or, when it has overlays, each overlay path in its
//! configured order. The resulting `resources` order is the merge precedence
//! order, so it is never sorted or de-duplicated.

use serde::{Deserialize, Serialize};

use crate::error::Result;

pub const KUSTOMIZE_API_VERSION: &str = "kustomize.config.k8s.io/v1beta1";
pub const KUSTOMIZATION_KIND: &str = "Kustomization";

/// Var reference configuration shipped with every template tree.
pub const VAR_REFERENCE_CONFIG: &str = "configs/varreference.yaml";

/// One deployable unit and its optional overlays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayComponent {
    /// Path of the component's base directory in the template tree
    pub path: String,
    /// Overlay directories replacing the base, in merge order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub overlays: Vec<String>,
}

impl OverlayComponent {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            overlays: Vec::new(),
        }
    }

    pub fn with_overlay(mut self, overlay: impl Into<String>) -> Self {
        self.overlays.push(overlay.into());
        self
    }

    pub fn has_overlays(&self) -> bool {
        !self.overlays.is_empty()
    }

    /// The resource paths this component contributes.
    pub fn resources(&self) -> Vec<&str> {
        if self.has_overlays() {
            self.overlays.iter().map(String::as_str).collect()
        } else {
            vec![self.path.as_str()]
        }
    }
}

/// The generated `kustomization.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Kustomization {
    pub api_version: String,
    pub kind: String,
    pub resources: Vec<String>,
    pub configurations: Vec<String>,
}

impl Kustomization {
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

/// Compose the kustomization for `components`, preserving their order.
pub fn compose(components: &[OverlayComponent]) -> Kustomization {
    Kustomization {
        api_version: KUSTOMIZE_API_VERSION.to_string(),
        kind: KUSTOMIZATION_KIND.to_string(),
        resources: components
            .iter()
            .flat_map(OverlayComponent::resources)
            .map(str::to_string)
            .collect(),
        configurations: vec![VAR_REFERENCE_CONFIG.to_string()],
    }
}
