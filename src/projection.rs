//! Env and secret file projections
//!
//! A handful of values are also written outside the placeholder pass: as
//! `KEY=VALUE` env files under `vars/` (consumed by kustomize config map
//! generators) and as a credentials block inside the default-namespace
//! secret. The targets are a fixed table.
//!
//! Projections are planned from the params tree and flat map before the
//! workspace exists. A plan that fails leaves no file behind.

use log::{debug, info};

use crate::error::{Error, Result};
use crate::flatmap::FlatMap;
use crate::tree::{flat_key, ConfigTree, LowerCamelCase};
use crate::workspace::Workspace;

/// Secret manifest receiving the artifact repository credentials.
pub const SECRET_FILE: &str = "common/onepanel/base/secret-onepanel-defaultnamespace.yaml";

/// Token replaced once in [`SECRET_FILE`].
pub const SECRET_PLACEHOLDER: &str = "$(artifactRepositoryProviderSecret)";

/// One env file fed from params.
#[derive(Debug, Clone, Copy)]
pub struct EnvProjection {
    pub file: &'static str,
    /// Params path that must exist for the projection to apply at all
    pub trigger: Option<&'static str>,
    /// Params path and env key, in output order
    pub keys: &'static [(&'static str, &'static str)],
    /// Whether a missing key aborts the render
    pub required: bool,
}

pub const ENV_PROJECTIONS: &[EnvProjection] = &[
    EnvProjection {
        file: "vars/workflow-config-map.env",
        trigger: Some("artifactRepository.s3"),
        keys: &[
            ("artifactRepository.s3.bucket", "artifactRepositoryBucket"),
            ("artifactRepository.s3.endpoint", "artifactRepositoryEndpoint"),
            ("artifactRepository.s3.insecure", "artifactRepositoryInsecure"),
            ("artifactRepository.s3.region", "artifactRepositoryRegion"),
        ],
        required: true,
    },
    EnvProjection {
        file: "vars/logging-config-map.env",
        trigger: None,
        keys: &[
            ("logging.image", "loggingImage"),
            ("logging.volumeStorage", "loggingVolumeStorage"),
        ],
        required: false,
    },
    EnvProjection {
        file: "vars/onepanel-config-map.env",
        trigger: None,
        keys: &[("application.defaultNamespace", "applicationDefaultNamespace")],
        required: true,
    },
];

/// A rendered env file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvFile {
    pub path: &'static str,
    pub content: String,
}

/// Everything the projection step will write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectionPlan {
    pub env_files: Vec<EnvFile>,
    /// Replacement for [`SECRET_PLACEHOLDER`]
    pub secret: Option<String>,
}

impl ProjectionPlan {
    /// Write the planned files into the workspace.
    pub fn write(&self, workspace: &Workspace) -> Result<()> {
        for env in &self.env_files {
            workspace.write_file(env.path, &env.content)?;
            debug!("Projected {}", env.path);
        }
        if let Some(secret) = &self.secret {
            if workspace.replace_once(SECRET_FILE, SECRET_PLACEHOLDER, secret)? {
                debug!("Projected artifact repository secret into {}", SECRET_FILE);
            }
        }
        info!("Wrote {} env projections", self.env_files.len());
        Ok(())
    }
}

/// Plan the env files and the secret block.
pub fn plan(tree: &ConfigTree, values: &FlatMap) -> Result<ProjectionPlan> {
    let mut env_files = Vec::new();
    for projection in ENV_PROJECTIONS {
        if let Some(env) = plan_env(projection, tree, values)? {
            env_files.push(env);
        }
    }

    Ok(ProjectionPlan {
        env_files,
        secret: plan_secret(tree, values)?,
    })
}

fn plan_env(
    projection: &EnvProjection,
    tree: &ConfigTree,
    values: &FlatMap,
) -> Result<Option<EnvFile>> {
    if let Some(trigger) = projection.trigger {
        if !tree.has_key(trigger) {
            return Ok(None);
        }
    }

    let mut content = String::new();
    for (path, env_key) in projection.keys {
        let value = match values.get(&flat_key(&LowerCamelCase, path)) {
            Some(value) => value.raw(),
            None if projection.required => {
                return Err(Error::MissingKey {
                    key: (*path).to_string(),
                    context: format!("params (needed for {})", projection.file),
                })
            }
            None => {
                debug!("Skipping {}: {} is not set", projection.file, path);
                return Ok(None);
            }
        };
        if projection.required && value.is_empty() {
            return Err(Error::EmptyValue {
                key: (*path).to_string(),
            });
        }
        content.push_str(&format!("{}={}\n", env_key, value));
    }

    Ok(Some(EnvFile {
        path: projection.file,
        content,
    }))
}

fn plan_secret(tree: &ConfigTree, values: &FlatMap) -> Result<Option<String>> {
    if tree.has_key("artifactRepository.s3") {
        let access = required_value(values, "artifactRepository.s3.accessKey")?;
        let secret = required_value(values, "artifactRepository.s3.secretKey")?;
        return Ok(Some(format!(
            "artifactRepositoryS3AccessKey: {}\n  artifactRepositoryS3SecretKey: {}",
            access, secret
        )));
    }
    if tree.has_key("artifactRepository.gcs") {
        let key = required_value(values, "artifactRepository.gcs.serviceAccountKey")?;
        if key.is_empty() {
            return Err(Error::EmptyValue {
                key: "artifactRepository.gcs.serviceAccountKey".to_string(),
            });
        }
        return Ok(Some(format!("serviceAccountKey: '{}'", key)));
    }
    Ok(None)
}

fn required_value(values: &FlatMap, path: &str) -> Result<String> {
    values
        .get(&flat_key(&LowerCamelCase, path))
        .map(|v| v.raw())
        .ok_or_else(|| Error::MissingKey {
            key: path.to_string(),
            context: "params (artifact repository credentials)".to_string(),
        })
}
