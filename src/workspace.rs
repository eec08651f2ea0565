//! Scratch copy of a template tree
//!
//! Rendering mutates template files in place, so it always works on a
//! disposable copy. A `Workspace` owns that copy for one render:
//!
//! 1. `prepare` removes any previous scratch directory and copies the
//!    template tree into it (version-control files are skipped). The two
//!    directories must not overlap.
//! 2. The pipeline writes the kustomization, env projections and secrets.
//! 3. `substitute` rewrites placeholders in every file.
//! 4. The merge step reads the directory; `destroy` removes it.
//!
//! Two workspaces must not share a scratch directory at the same time.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::flatmap::FlatMap;
use crate::overlay::Kustomization;
use crate::substitute::Substituter;

/// File name of the generated kustomization at the workspace root.
pub const KUSTOMIZATION_FILE: &str = "kustomization.yaml";

/// Per-file outcome of a substitution pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SubstitutionReport {
    pub files_scanned: usize,
    pub files_changed: usize,
    /// Non UTF-8 files left as they are
    pub files_skipped: usize,
}

/// Handle to a prepared scratch directory.
#[derive(Debug)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Recreate `scratch_dir` as a fresh copy of `template_root`.
    pub fn prepare(template_root: &Path, scratch_dir: &Path) -> Result<Self> {
        if !template_root.is_dir() {
            return Err(Error::Filesystem {
                message: format!(
                    "Template directory not found: {}",
                    template_root.display()
                ),
            });
        }
        check_disjoint(template_root, scratch_dir)?;

        if scratch_dir.exists() {
            debug!("Removing previous scratch tree {}", scratch_dir.display());
            fs::remove_dir_all(scratch_dir).map_err(|e| Error::fs("remove", scratch_dir, e))?;
        }
        fs::create_dir_all(scratch_dir).map_err(|e| Error::fs("create", scratch_dir, e))?;

        let copied = copy_tree(template_root, scratch_dir)?;
        info!(
            "Copied {} template files into {}",
            copied,
            scratch_dir.display()
        );

        Ok(Self {
            root: scratch_dir.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of a workspace-relative file.
    pub fn path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.root.join(relative)
    }

    /// Replace `kustomization.yaml` with the composed one.
    pub fn write_kustomization(&self, kustomization: &Kustomization) -> Result<()> {
        self.write_file(KUSTOMIZATION_FILE, &kustomization.to_yaml()?)
    }

    /// Fully rewrite a workspace file, creating parent directories.
    pub fn write_file(&self, relative: impl AsRef<Path>, content: &str) -> Result<()> {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::fs("create", parent, e))?;
        }
        fs::write(&path, content).map_err(|e| Error::fs("write", &path, e))?;
        debug!("Wrote {}", path.display());
        Ok(())
    }

    /// Replace the first occurrence of `token` in a workspace file.
    ///
    /// The file must exist. A missing token is logged and reported as
    /// `Ok(false)`.
    pub fn replace_once(&self, relative: impl AsRef<Path>, token: &str, value: &str) -> Result<bool> {
        let path = self.path(relative);
        let content = fs::read_to_string(&path).map_err(|e| Error::fs("read", &path, e))?;
        if !content.contains(token) {
            warn!(
                "Key: {} not present in {}, not used.",
                token,
                path.display()
            );
            return Ok(false);
        }
        let updated = content.replacen(token, value, 1);
        fs::write(&path, updated).map_err(|e| Error::fs("write", &path, e))?;
        Ok(true)
    }

    /// Files of the workspace in sorted order, excluding version-control files.
    pub fn files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !is_vcs_entry(e.path()))
        {
            let entry = entry.map_err(|e| Error::Filesystem {
                message: format!("Failed to walk '{}': {}", self.root.display(), e),
            })?;
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }
        Ok(files)
    }

    /// Rewrite placeholders in every file of the workspace.
    pub fn substitute(&self, values: &FlatMap) -> Result<SubstitutionReport> {
        let substituter = Substituter::new(values)?;
        let mut report = SubstitutionReport::default();

        for path in self.files()? {
            report.files_scanned += 1;
            let bytes = fs::read(&path).map_err(|e| Error::fs("read", &path, e))?;
            let Ok(content) = String::from_utf8(bytes) else {
                debug!("Skipping non UTF-8 file {}", path.display());
                report.files_skipped += 1;
                continue;
            };

            let rendered = substituter.apply(&content);
            if rendered.as_ref() != content.as_str() {
                fs::write(&path, rendered.as_bytes()).map_err(|e| Error::fs("write", &path, e))?;
                report.files_changed += 1;
            }
        }

        debug!(
            "Substitution scanned {} files, changed {}",
            report.files_scanned, report.files_changed
        );
        Ok(report)
    }

    /// Remove the scratch directory.
    pub fn destroy(self) -> Result<()> {
        fs::remove_dir_all(&self.root).map_err(|e| Error::fs("remove", &self.root, e))
    }
}

/// `.git` directories and git control files such as `.gitignore`.
fn is_vcs_entry(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with(".git"))
}

/// Refuse a scratch directory that is, contains, or sits inside the template tree.
fn check_disjoint(template_root: &Path, scratch_dir: &Path) -> Result<()> {
    let template = resolve(template_root)?;
    let scratch = resolve(scratch_dir)?;
    if scratch.starts_with(&template) || template.starts_with(&scratch) {
        return Err(Error::Filesystem {
            message: format!(
                "Scratch directory '{}' overlaps template directory '{}'",
                scratch_dir.display(),
                template_root.display()
            ),
        });
    }
    Ok(())
}

/// Absolute, symlink-free form of `path`, which need not exist yet.
fn resolve(path: &Path) -> Result<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|e| Error::fs("resolve", path, e))?
            .join(path)
    };

    let mut existing = absolute.as_path();
    let mut missing = Vec::new();
    while !existing.exists() {
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                existing = parent;
            }
            _ => break,
        }
    }

    let mut resolved = existing
        .canonicalize()
        .map_err(|e| Error::fs("resolve", existing, e))?;
    for name in missing.iter().rev() {
        resolved.push(name);
    }
    Ok(resolved)
}

/// Copy every file under `src` to the same relative path under `dst`.
fn copy_tree(src: &Path, dst: &Path) -> Result<usize> {
    let mut copied = 0;
    for entry in WalkDir::new(src)
        .min_depth(1)
        .into_iter()
        .filter_entry(|e| !is_vcs_entry(e.path()))
    {
        let entry = entry.map_err(|e| Error::Filesystem {
            message: format!("Failed to walk '{}': {}", src.display(), e),
        })?;
        let relative = entry.path().strip_prefix(src).map_err(|e| Error::Filesystem {
            message: format!("Failed to relativize '{}': {}", entry.path().display(), e),
        })?;
        let target = dst.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(|e| Error::fs("create", &target, e))?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|e| Error::fs("create", parent, e))?;
            }
            fs::copy(entry.path(), &target).map_err(|e| Error::fs("copy", entry.path(), e))?;
            copied += 1;
        }
    }
    Ok(copied)
}
