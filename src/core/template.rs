//! Template identity and source loading.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::{Error, Result};

/// Where a template's source comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    /// Source already in memory.
    Content(String),
    /// Source read from disk when the template is analyzed.
    File(PathBuf),
}

/// One batch input: a stable relative path plus a readable source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateInput {
    pub path: String,
    pub source: InputSource,
}

impl TemplateInput {
    pub fn from_content(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: normalize_path(&path.into()),
            source: InputSource::Content(content.into()),
        }
    }

    pub fn from_file(path: impl Into<String>, file: impl Into<PathBuf>) -> Self {
        Self {
            path: normalize_path(&path.into()),
            source: InputSource::File(file.into()),
        }
    }

    /// Read the source. The file handle is dropped before this returns.
    pub fn load(&self) -> Result<Template> {
        match &self.source {
            InputSource::Content(content) => Ok(Template::new(&self.path, content.clone())),
            InputSource::File(file) => match std::fs::read_to_string(file) {
                Ok(content) => Ok(Template::new(&self.path, content)),
                Err(e) if e.kind() == ErrorKind::NotFound => Err(Error::FileNotFound {
                    path: file.clone(),
                }),
                Err(e) => Err(e.into()),
            },
        }
    }
}

/// A loaded template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    /// `/`-separated path relative to the analysis root.
    pub path: String,
    pub source: String,
    /// Source size in bytes.
    pub size: usize,
}

impl Template {
    pub fn new(path: &str, source: String) -> Self {
        Self {
            path: normalize_path(path),
            size: source.len(),
            source,
        }
    }

    /// Parent directory of the template path, `""` at the root.
    pub fn directory(&self) -> &str {
        directory_of(&self.path)
    }

    /// Final path segment.
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// Use `/` separators and drop a leading `./`.
pub fn normalize_path(path: &str) -> String {
    let path = path.replace('\\', "/");
    path.strip_prefix("./").map(str::to_string).unwrap_or(path)
}

/// Parent directory of a `/`-separated path.
pub fn directory_of(path: &str) -> &str {
    path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

/// Relative `/`-separated identity of `file` under `root`.
pub fn relative_identity(root: &Path, file: &Path) -> String {
    let relative = file.strip_prefix(root).unwrap_or(file);
    normalize_path(&relative.to_string_lossy())
}
