//! # Derived Values
//!
//! Values computed from the params document before it is flattened. They
//! are written back into the [`ConfigTree`] at the root, so flattening turns
//! `applicationApiUrl` into a flat-map key of the same name and the
//! substitution pass treats them like any other value.
//!
//! Derivation only reads files from the template source, never from the
//! scratch tree, and fails before anything is copied.

use std::path::Path;

use log::debug;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::flatmap::parse_env;
use crate::fragment::{
    format_option_sets, format_scalar_list, option_sets, string_list, ADDRESS_INDENT,
    METALLB_ADDRESSES_KEY, NODE_POOL_OPTIONS_KEY,
};
use crate::tree::{ConfigNode, ConfigTree, Scalar};

/// Cloud settings shipped with the template tree.
pub const CLOUD_SETTINGS_ENV: &str = "vars/onepanel-config-map-hidden.env";

/// Tag of the release images built from this version.
pub const RELEASE_IMAGE_TAG: &str = concat!("v", env!("CARGO_PKG_VERSION"));

/// Flat-map key holding the artifact repository provider block.
pub const ARTIFACT_REPOSITORY_PROVIDER_KEY: &str = "artifactRepositoryProvider";

/// Providers that get an in-cluster load balancer.
const METALLB_PROVIDERS: &[&str] = &["minikube", "microk8s"];

const METALLB_SECRET_KEY: &str = "metalLbSecretKey";
const METALLB_SECRET_LENGTH: usize = 128;
const METALLB_SECRET_COST: u32 = 10;

/// API and UI locations read from [`CLOUD_SETTINGS_ENV`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudSettings {
    pub api_path: String,
    pub api_grpc_port: i64,
    pub ui_path: String,
}

impl CloudSettings {
    pub fn parse(content: &str, source: &str) -> Result<Self> {
        let entries = parse_env(content);
        let lookup = |key: &str| -> Result<String> {
            entries
                .iter()
                .rev()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.trim().to_string())
                .ok_or_else(|| Error::MissingKey {
                    key: key.to_string(),
                    context: source.to_string(),
                })
        };

        let port_text = lookup("applicationCloudApiGRPCPort")?;
        let api_grpc_port = port_text.parse::<i64>().map_err(|e| Error::InvalidValue {
            key: "applicationCloudApiGRPCPort".to_string(),
            message: format!("'{}' is not a port number: {}", port_text, e),
        })?;

        Ok(Self {
            api_path: lookup("applicationCloudApiPath")?,
            api_grpc_port,
            ui_path: lookup("applicationCloudUiPath")?,
        })
    }

    /// Read the cloud settings of a template tree.
    pub fn from_manifests(manifests_repo: &Path) -> Result<Self> {
        let path = manifests_repo.join(CLOUD_SETTINGS_ENV);
        let content =
            std::fs::read_to_string(&path).map_err(|e| Error::fs("read", &path, e))?;
        Self::parse(&content, &path.display().to_string())
    }
}

/// Image tags and pull policies of the core images.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePolicy {
    pub tag: String,
    pub pull_policy: &'static str,
}

impl ImagePolicy {
    pub fn for_build(dev: bool) -> Self {
        if dev {
            Self {
                tag: "dev".to_string(),
                pull_policy: "Always",
            }
        } else {
            Self {
                tag: RELEASE_IMAGE_TAG.to_string(),
                pull_policy: "IfNotPresent",
            }
        }
    }
}

/// Resolve the application FQDN and store it at `application.fqdn`.
///
/// `application.name` and `application.domain` take precedence over an
/// explicit `application.fqdn`.
pub fn fqdn(tree: &mut ConfigTree) -> Result<String> {
    let name = tree.scalar("application.name").map(Scalar::text);
    let fqdn = match name {
        Some(name) => {
            let domain = tree
                .scalar("application.domain")
                .map(Scalar::text)
                .ok_or_else(|| Error::MissingKey {
                    key: "application.domain".to_string(),
                    context: "params (required with application.name)".to_string(),
                })?;
            let fqdn = format!("{}.{}", name, domain);
            tree.put("application.fqdn", fqdn.as_str());
            fqdn
        }
        None => tree
            .scalar("application.fqdn")
            .map(Scalar::text)
            .unwrap_or_default(),
    };

    if fqdn.is_empty() {
        return Err(Error::MissingKey {
            key: "application.name".to_string(),
            context: "params (or set application.fqdn)".to_string(),
        });
    }
    Ok(fqdn)
}

/// Read `application.insecure`. Absent means secure.
pub fn insecure(tree: &ConfigTree) -> Result<bool> {
    match tree.scalar("application.insecure") {
        None | Some(Scalar::Null) => Ok(false),
        Some(Scalar::Bool(b)) => Ok(*b),
        Some(Scalar::String(s)) => s.parse::<bool>().map_err(|_| Error::InvalidValue {
            key: "application.insecure".to_string(),
            message: format!("'{}' is not a bool", s),
        }),
        Some(other) => Err(Error::InvalidValue {
            key: "application.insecure".to_string(),
            message: format!("'{}' is not a bool", other),
        }),
    }
}

/// Escape a URL for embedding in the UI's environment script.
pub fn format_url_for_ui(url: &str) -> String {
    url.replace('/', r"\/")
        .replace('.', r"\.")
        .replace(':', r"\:")
}

/// The bcrypt hash of a random alphanumeric string, base64 encoded.
///
/// The salt is drawn from `rng` as well, so a seeded generator gives a
/// reproducible key.
pub fn generate_secret_key<R: Rng>(rng: &mut R) -> Result<String> {
    use base64::Engine;

    let secret: String = rng
        .sample_iter(&Alphanumeric)
        .take(METALLB_SECRET_LENGTH)
        .map(char::from)
        .collect();
    let salt: [u8; 16] = rng.gen();
    let hashed = bcrypt::hash_with_salt(secret, METALLB_SECRET_COST, salt).map_err(|e| {
        Error::InvalidValue {
            key: METALLB_SECRET_KEY.to_string(),
            message: format!("failed to hash generated secret: {}", e),
        }
    })?;
    let hashed = hashed.format_for_version(bcrypt::Version::TwoA);
    Ok(base64::engine::general_purpose::STANDARD.encode(hashed))
}

/// Secret reference in an artifact repository block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecretKeyRef {
    pub name: String,
    pub key: String,
}

/// `artifactRepository.s3` as written in params.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct S3Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insecure: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing)]
    pub access_key: Option<String>,
    #[serde(default, skip_serializing)]
    pub secret_key: Option<String>,
}

/// `artifactRepository.gcs` as written in params.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GcsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insecure: Option<bool>,
    #[serde(default, skip_serializing)]
    pub service_account_key: Option<String>,
}

/// The configured artifact storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactRepository {
    S3(S3Config),
    Gcs(GcsConfig),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct S3Provider<'a> {
    #[serde(flatten)]
    config: &'a S3Config,
    access_key_secret: SecretKeyRef,
    secret_key_secret: SecretKeyRef,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GcsProvider<'a> {
    #[serde(flatten)]
    config: &'a GcsConfig,
    service_account_key_secret: SecretKeyRef,
}

#[derive(Serialize)]
struct ProviderBlock<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    s3: Option<S3Provider<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    gcs: Option<GcsProvider<'a>>,
}

impl ArtifactRepository {
    /// Decode `artifactRepository` from params.
    pub fn from_tree(tree: &ConfigTree) -> Result<Self> {
        let s3 = tree.get("artifactRepository.s3");
        let gcs = tree.get("artifactRepository.gcs");
        match (s3, gcs) {
            (Some(node), None) => Ok(ArtifactRepository::S3(decode(node, "artifactRepository.s3")?)),
            (None, Some(node)) => Ok(ArtifactRepository::Gcs(decode(node, "artifactRepository.gcs")?)),
            (Some(_), Some(_)) => Err(Error::UnsupportedArtifactRepository {
                message: "configure either s3 or gcs, not both".to_string(),
            }),
            (None, None) => Err(Error::UnsupportedArtifactRepository {
                message: "expected artifactRepository.s3 or artifactRepository.gcs".to_string(),
            }),
        }
    }

    /// The provider block embedded into the workflow controller config, as a
    /// literal block scalar.
    pub fn provider_yaml(&self) -> Result<String> {
        let block = match self {
            ArtifactRepository::S3(config) => ProviderBlock {
                s3: Some(S3Provider {
                    config,
                    access_key_secret: SecretKeyRef {
                        name: "$(artifactRepositoryS3AccessKeySecretName)".to_string(),
                        key: "artifactRepositoryS3AccessKey".to_string(),
                    },
                    secret_key_secret: SecretKeyRef {
                        name: "$(artifactRepositoryS3SecretKeySecretName)".to_string(),
                        key: "artifactRepositoryS3SecretKey".to_string(),
                    },
                }),
                gcs: None,
            },
            ArtifactRepository::Gcs(config) => ProviderBlock {
                s3: None,
                gcs: Some(GcsProvider {
                    config,
                    service_account_key_secret: SecretKeyRef {
                        name: "$(artifactRepositoryGCSServiceAccountKeySecretName)".to_string(),
                        key: "serviceAccountKey".to_string(),
                    },
                }),
            },
        };
        let yaml = serde_yaml::to_string(&block)?;
        Ok(literal_block(&yaml))
    }
}

fn decode<T: serde::de::DeserializeOwned>(node: &ConfigNode, key: &str) -> Result<T> {
    serde_yaml::from_value(node.to_yaml()).map_err(|e| Error::InvalidValue {
        key: key.to_string(),
        message: e.to_string(),
    })
}

fn literal_block(yaml: &str) -> String {
    let mut out = String::from("|\n");
    for line in yaml.lines() {
        out.push_str("    ");
        out.push_str(line);
        out.push('\n');
    }
    out
}

/// Compute every derived value and store it in `tree`.
pub fn derive_values(tree: &mut ConfigTree, cloud: &CloudSettings, dev: bool) -> Result<()> {
    let fqdn = fqdn(tree)?;
    let insecure = insecure(tree)?;
    let (http, ws) = if insecure {
        ("http://", "ws://")
    } else {
        ("https://", "wss://")
    };

    let api_url = format!("{}{}{}", http, fqdn, cloud.api_path);
    let ws_url = format!("{}{}{}", ws, fqdn, cloud.api_path);
    tree.put_with_separator("applicationApiUrl", format_url_for_ui(&api_url), ".");
    tree.put_with_separator("applicationApiWsUrl", format_url_for_ui(&ws_url), ".");
    tree.put_with_separator("applicationApiPath", cloud.api_path.as_str(), ".");
    tree.put_with_separator("applicationUiPath", cloud.ui_path.as_str(), ".");
    tree.put_with_separator("applicationApiGrpcPort", cloud.api_grpc_port, ".");
    tree.put_with_separator("providerType", "cloud", ".");
    tree.put_with_separator("onepanelApiUrl", api_url, ".");

    let images = ImagePolicy::for_build(dev);
    tree.put_with_separator("applicationCoreImageTag", images.tag.as_str(), ".");
    tree.put_with_separator("applicationCoreImagePullPolicy", images.pull_policy, ".");
    tree.put_with_separator("applicationCoreuiImageTag", images.tag.as_str(), ".");
    tree.put_with_separator("applicationCoreuiImagePullPolicy", images.pull_policy, ".");

    node_pool_options(tree)?;
    metal_lb(tree)?;

    let repository = ArtifactRepository::from_tree(tree)?;
    let provider = repository.provider_yaml()?;
    tree.put_with_separator(ARTIFACT_REPOSITORY_PROVIDER_KEY, provider, ".");

    debug!("Derived values for {}", fqdn);
    Ok(())
}

fn node_pool_options(tree: &mut ConfigTree) -> Result<()> {
    let Some(node_pool) = tree.get("application.nodePool") else {
        return Ok(());
    };
    if let Some(sets) = option_sets(node_pool)? {
        let text = format_option_sets(&sets);
        tree.put_with_separator(NODE_POOL_OPTIONS_KEY, text, ".");
    }
    Ok(())
}

/// Address pool fragment and memberlist secret for in-cluster load balancing.
///
/// `metalLb.secretKey` pins the secret. Without it a new key is generated on
/// every render, so two renders of the same params differ in that value.
fn metal_lb(tree: &mut ConfigTree) -> Result<()> {
    let provider = tree
        .scalar("application.provider")
        .map(Scalar::text)
        .unwrap_or_default();
    if !METALLB_PROVIDERS.contains(&provider.as_str()) {
        return Ok(());
    }

    let addresses = tree.get("metalLb.addresses").and_then(string_list);
    if let Some(addresses) = addresses {
        let text = format_scalar_list(&addresses, ADDRESS_INDENT);
        tree.put_with_separator(METALLB_ADDRESSES_KEY, text, ".");
    }

    let secret_key = match tree.scalar("metalLb.secretKey") {
        Some(pinned) if !pinned.text().is_empty() => pinned.text(),
        _ => generate_secret_key(&mut rand::thread_rng())?,
    };
    tree.put_with_separator(METALLB_SECRET_KEY, secret_key, ".");
    Ok(())
}
