//! Shared test utilities for integration and E2E tests.
//!
//! This module provides a fixture that lays out a small template tree, a
//! params document and a deployment definition in a temporary directory,
//! plus a fake merge step.
//!
//! ## Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::new().with_defaults();
//!     let definition = fixture.definition();
//!     // ... test code
//! }
//! ```

use assert_fs::prelude::*;
use std::path::{Path, PathBuf};

use manifest_render::builder::ManifestBuilder;
use manifest_render::config::{self, Definition};
use manifest_render::pipeline::RenderOptions;

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    #[allow(unused_imports)]
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::templates;
    #[allow(unused_imports)]
    pub use super::{ConcatBuilder, TestFixture};
}

/// Template and params snippets for testing.
#[allow(dead_code)]
pub mod templates {
    /// Params covering every derived value and projection.
    pub const PARAMS: &str = r#"application:
  name: app
  domain: example.com
  insecure: false
  defaultNamespace: example
  provider: minikube
  nodePool:
    label: node.kubernetes.io/instance-type
    options:
      - name: 'CPU: 2, RAM: 8GB'
        value: Standard_D2s_v3
      - name: 'CPU: 4, RAM: 16GB'
        value: Standard_D4s_v3
artifactRepository:
  s3:
    bucket: my-bucket
    endpoint: s3.amazonaws.com
    insecure: false
    region: us-west-2
    accessKey: AKIA
    secretKey: shh
metalLb:
  secretKey: pinned-secret
  addresses:
    - 192.168.99.0/28
    - 192.168.99.16/28
logging:
  image: fluentd:v1
  volumeStorage: 20Gi
"#;

    pub const DEFINITION: &str = r#"apiVersion: opdef.apps.onepanel.io/v1alpha
kind: OpDefinition
spec:
  manifestsRepo: manifests
  params: params.yaml
  components:
    - common/onepanel/base
    - path: common/metallb/base
      overlays:
        - common/metallb/overlays/minikube
"#;

    pub const CLOUD_SETTINGS: &str =
        "applicationCloudApiPath=/api\napplicationCloudApiGRPCPort=8887\napplicationCloudUiPath=/\n";

    pub const WORKFLOW_HIDDEN: &str = "workflowExecutor=pns\n";

    pub const ONEPANEL_CONFIGMAP: &str = r#"apiVersion: v1
kind: ConfigMap
metadata:
  name: onepanel
  namespace: $(applicationDefaultNamespace)
data:
  apiUrl: $(applicationApiUrl)
  grpcPort: $(applicationApiGrpcPort)
  insecure: $(applicationInsecure)
  executor: $(workflowExecutor)
  secretName: $(artifactRepositoryS3AccessKeySecretName)
  nodePoolOptions: $(applicationNodePoolOptions)
  artifactRepository: $(artifactRepositoryProvider)
"#;

    pub const SECRET: &str = r#"apiVersion: v1
kind: Secret
metadata:
  name: onepanel
  namespace: $(applicationDefaultNamespace)
stringData:
  $(artifactRepositoryProviderSecret)
"#;

    pub const METALLB_CONFIGMAP: &str = r#"apiVersion: v1
kind: ConfigMap
metadata:
  name: config
data:
  config: |
    address-pools:
    - name: default
      addresses:
      $(metalLbAddresses)
  secretkey: $base64(metalLbSecretKey)
"#;
}

/// Fake merge step: concatenates every file of each kustomization resource
/// in path order.
pub struct ConcatBuilder;

impl ManifestBuilder for ConcatBuilder {
    fn build(&self, dir: &Path) -> manifest_render::error::Result<String> {
        let kustomization = std::fs::read_to_string(dir.join("kustomization.yaml"))?;
        let parsed: serde_yaml::Value = serde_yaml::from_str(&kustomization)?;
        let resources = parsed["resources"]
            .as_sequence()
            .cloned()
            .unwrap_or_default();

        let mut out = String::new();
        for resource in resources.iter().filter_map(|r| r.as_str()) {
            let mut files: Vec<PathBuf> = walkdir::WalkDir::new(dir.join(resource))
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .map(|e| e.into_path())
                .collect();
            files.sort();
            for file in files {
                out.push_str("---\n");
                out.push_str(&std::fs::read_to_string(file)?);
            }
        }
        Ok(out)
    }
}

/// A temporary directory holding a deployment definition and its inputs.
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

impl TestFixture {
    /// Create a new test fixture with an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Lay out the default definition, params and template tree.
    pub fn with_defaults(self) -> Self {
        self.with_file("config.yaml", templates::DEFINITION)
            .with_file("params.yaml", templates::PARAMS)
            .with_template("vars/onepanel-config-map-hidden.env", templates::CLOUD_SETTINGS)
            .with_template("vars/workflow-config-map-hidden.env", templates::WORKFLOW_HIDDEN)
            .with_template("configs/varreference.yaml", "varReference: []\n")
            .with_template("common/onepanel/base/configmap.yaml", templates::ONEPANEL_CONFIGMAP)
            .with_template(
                "common/onepanel/base/secret-onepanel-defaultnamespace.yaml",
                templates::SECRET,
            )
            .with_template("common/metallb/base/configmap.yaml", "base: true\n")
            .with_template(
                "common/metallb/overlays/minikube/configmap.yaml",
                templates::METALLB_CONFIGMAP,
            )
    }

    /// Replace the params document.
    #[allow(dead_code)]
    pub fn with_params(self, content: &str) -> Self {
        self.with_file("params.yaml", content)
    }

    /// Add a file under the template tree.
    pub fn with_template(self, path: &str, content: &str) -> Self {
        self.with_file(&format!("manifests/{}", path), content)
    }

    /// Add a file with the given path and content.
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.temp_dir
            .child(path)
            .write_str(content)
            .expect("Failed to write file");
        self
    }

    /// Get the path to the temporary directory.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Get the path to the deployment definition.
    pub fn config_path(&self) -> PathBuf {
        self.temp_dir.path().join("config.yaml")
    }

    /// Scratch directory used by this fixture.
    pub fn scratch_dir(&self) -> PathBuf {
        self.temp_dir.path().join(".manifests/cache")
    }

    /// Parse the fixture's deployment definition.
    #[allow(dead_code)]
    pub fn definition(&self) -> Definition {
        config::from_file(self.config_path()).expect("Failed to parse definition")
    }

    /// Render options pointing at this fixture's scratch directory.
    #[allow(dead_code)]
    pub fn options(&self) -> RenderOptions {
        RenderOptions {
            scratch_dir: self.scratch_dir(),
            ..RenderOptions::default()
        }
    }

    /// Create a command configured to run in this fixture's directory.
    #[allow(dead_code)]
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("manifest-render");
        cmd.current_dir(self.path());
        cmd
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}
