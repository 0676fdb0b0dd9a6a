use std::path::PathBuf;

use thiserror::Error;

/// A required field failed its validator. Recovered at the call site: the
/// field stays unset and the record may end up in the missing report.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("organization name is empty")]
    EmptyName,
    /// No registrable domain could be derived.
    #[error("website '{0}' has no registrable domain")]
    Website(String),
    /// Missing, or not a vector image.
    #[error("logo '{0}' is not an .svg reference")]
    Logo(String),
    /// Missing, or not a canonical organization URL.
    #[error("company database reference '{0}' is not a canonical organization URL")]
    CompanyDb(String),
}

/// An auxiliary source could not be loaded. The source is treated as empty
/// for the rest of the run.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("{source_label}: cannot read {path}: {message}")]
    Read {
        source_label: String,
        path: PathBuf,
        message: String,
    },
    #[error("{source_label}: fetch failed: {message}")]
    Fetch { source_label: String, message: String },
    #[error("{source_label}: cannot parse: {message}")]
    Parse { source_label: String, message: String },
}

/// Startup configuration problem. Fatal: nothing is processed.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config parse error: {0}")]
    Parse(String),
    #[error("config validation error: {0}")]
    Validation(String),
    #[error("cannot read {path}: {message}")]
    Unreadable { path: PathBuf, message: String },
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("directory is not valid YAML: {0}")]
    Yaml(String),
    #[error("directory has no top-level 'landscape' sequence")]
    NoLandscape,
    #[error("directory has no '{0}' category with subcategories")]
    NoMemberCategory(String),
    #[error("cannot serialize directory: {0}")]
    Serialize(String),
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("cannot write missing report: {0}")]
    Csv(#[from] csv::Error),
    #[error("cannot write missing report: {0}")]
    Io(#[from] std::io::Error),
}
