//! Template discovery under an analysis root.

use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;

use super::template::{relative_identity, TemplateInput};
use super::{Error, Result};
use crate::config::Config;

/// Templates under a root directory, respecting .gitignore.
#[derive(Debug, Clone)]
pub struct FileSet {
    root: PathBuf,
    files: Vec<PathBuf>,
}

impl FileSet {
    /// Discover templates using the configured extensions and exclude globs.
    pub fn from_path(path: impl AsRef<Path>, config: &Config) -> Result<Self> {
        Self::from_path_with(path, &config.extensions, &config.exclude_patterns)
    }

    /// Discover templates with explicit extensions and exclude globs.
    pub fn from_path_with(
        path: impl AsRef<Path>,
        extensions: &[String],
        exclude_patterns: &[String],
    ) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let root = path.canonicalize()?;
        let excludes = build_globset(exclude_patterns)?;
        let mut files = Vec::new();

        let walker = WalkBuilder::new(&root)
            .hidden(true)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .require_git(false)
            .build();

        for entry in walker.flatten() {
            let path = entry.path();
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }

            let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
            if !extensions.iter().any(|ext| name.ends_with(ext.as_str())) {
                continue;
            }

            let relative = relative_identity(&root, path);
            if excludes.is_match(&relative) {
                continue;
            }

            files.push(path.to_path_buf());
        }

        files.sort();
        tracing::debug!(root = %root.display(), count = files.len(), "discovered templates");

        Ok(Self { root, files })
    }

    /// Canonical analysis root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute paths, sorted.
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// `/`-separated identity of a file relative to the root.
    pub fn relative_path(&self, path: &Path) -> String {
        relative_identity(&self.root, path)
    }

    /// Batch inputs, one per file, read lazily during analysis.
    pub fn inputs(&self) -> Vec<TemplateInput> {
        self.files
            .iter()
            .map(|file| TemplateInput::from_file(self.relative_path(file), file.clone()))
            .collect()
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern)
            .map_err(|e| Error::config(format!("invalid exclude pattern {pattern:?}: {e}")))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| Error::config(format!("invalid exclude patterns: {e}")))
}
