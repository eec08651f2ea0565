//! # Manifest Render Library
//!
//! This library renders a deployment definition and its params document into
//! a single merged set of Kubernetes manifests. It is used by the
//! `manifest-render` command-line tool, and can be embedded by anything that
//! needs the same templating without the CLI.
//!
//! ## Quick Example
//!
//! ```
//! use manifest_render::flatmap::FlatMap;
//! use manifest_render::overlay::{compose, OverlayComponent};
//! use manifest_render::substitute::substitute;
//! use manifest_render::tree::{ConfigTree, LowerCamelCase};
//!
//! // Flatten a params document
//! let tree = ConfigTree::parse("application:\n  defaultNamespace: example\n").unwrap();
//! let values: FlatMap = tree.flatten(&LowerCamelCase);
//!
//! // Substitute placeholders
//! let out = substitute("namespace: $(applicationDefaultNamespace)", &values).unwrap();
//! assert_eq!(out, "namespace: example");
//!
//! // Compose a kustomization
//! let k = compose(&[OverlayComponent::new("a").with_overlay("a/overlays/dev")]);
//! assert_eq!(k.resources, vec!["a/overlays/dev"]);
//! ```
//!
//! ## Core Concepts
//!
//! - **Configuration Tree (`tree`)**: the params document with scalar types
//!   and key order preserved, plus path lookup and insertion.
//! - **Flat map (`flatmap`)**: typed key/value table produced by flattening,
//!   rendered differently by each placeholder form.
//! - **Fragments (`fragment`)**: YAML text generated from list-shaped params
//!   sections (node-pool options, address pools).
//! - **Overlays (`overlay`)**: ordered composition of the generated
//!   `kustomization.yaml`.
//! - **Substitution (`substitute`, `workspace`)**: the `$(key)`, `$raw(key)`
//!   and `$base64(key)` pass over a scratch copy of the template tree.
//! - **Builder (`builder`)**: the external merge step behind a trait.
//!
//! ## Execution Flow
//!
//! [`pipeline::render`] loads the params, derives computed values, flattens,
//! plans env and secret projections, stages the scratch tree and runs the
//! builder. Configuration problems are reported before any file is written.

pub mod builder;
pub mod config;
pub mod defaults;
pub mod derive;
pub mod error;
pub mod flatmap;
pub mod fragment;
pub mod overlay;
pub mod pipeline;
pub mod projection;
pub mod substitute;
pub mod tree;
pub mod workspace;

#[cfg(test)]
mod substitute_proptest;
