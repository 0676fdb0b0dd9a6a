use thiserror::Error;

use crate::model::LogoRef;

#[derive(Debug, Error)]
pub enum LogoError {
    #[error("cannot download logo {url}: {message}")]
    Download { url: String, message: String },
    #[error("cannot store logo {path}: {message}")]
    Store { path: String, message: String },
    #[error("downloaded logo for {url} is not a valid .svg reference")]
    Invalid { url: String },
}

/// Stores remote logos locally and hands back the local reference.
///
/// Applied only to records that are about to be written to the directory.
/// Local references are returned unchanged.
pub trait LogoHost {
    fn host(&self, name: &str, logo: &LogoRef) -> Result<LogoRef, LogoError>;
}
