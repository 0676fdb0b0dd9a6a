//! Stores remote logos in the landscape's hosted logo directory so entries
//! reference a local file name instead of a third-party URL.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use landscape_recon::config::{resolve_path, LogoConfig};
use landscape_recon::hosting::{LogoError, LogoHost};
use landscape_recon::model::{LogoRef, LOGO_EXTENSION};
use tracing::{debug, info};

use crate::http::HttpClient;

pub struct LogoDownloader {
    hosted_dir: PathBuf,
    client: HttpClient,
}

impl LogoDownloader {
    pub fn new(hosted_dir: impl Into<PathBuf>, client: HttpClient) -> Self {
        Self {
            hosted_dir: hosted_dir.into(),
            client,
        }
    }

    pub fn from_config(config: &LogoConfig, config_path: &Path, client: HttpClient) -> Self {
        Self::new(resolve_path(config_path, &config.hosted_dir), client)
    }

    pub fn hosted_dir(&self) -> &Path {
        &self.hosted_dir
    }

    /// First free `<slug>.svg`, `<slug>-1.svg`, ... in the hosted directory.
    /// A file that already holds `content` is reused. Only a missing file
    /// counts as free; any other read failure is a store error.
    fn target_for(&self, slug: &str, content: &[u8]) -> Result<PathBuf, LogoError> {
        let mut n = 0u32;
        loop {
            let file = if n == 0 {
                format!("{slug}{LOGO_EXTENSION}")
            } else {
                format!("{slug}-{n}{LOGO_EXTENSION}")
            };
            let path = self.hosted_dir.join(file);
            match fs::read(&path) {
                Ok(existing) if existing == content => return Ok(path),
                Ok(_) => n += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => return Ok(path),
                Err(e) => {
                    return Err(LogoError::Store {
                        path: path.display().to_string(),
                        message: e.to_string(),
                    })
                }
            }
        }
    }
}

impl LogoHost for LogoDownloader {
    fn host(&self, name: &str, logo: &LogoRef) -> Result<LogoRef, LogoError> {
        if !logo.is_remote() {
            return Ok(logo.clone());
        }
        let url = logo.as_str();
        let content = self.client.get_bytes(url).map_err(|e| LogoError::Download {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        if !looks_like_svg(&content) {
            return Err(LogoError::Invalid { url: url.to_string() });
        }

        let store_err = |path: &Path, e: std::io::Error| LogoError::Store {
            path: path.display().to_string(),
            message: e.to_string(),
        };
        fs::create_dir_all(&self.hosted_dir).map_err(|e| store_err(self.hosted_dir.as_path(), e))?;
        let path = self.target_for(&slug(name), &content)?;
        if !path.exists() {
            fs::write(&path, &content).map_err(|e| store_err(path.as_path(), e))?;
            info!(name, url, path = %path.display(), "logo downloaded");
        } else {
            debug!(name, path = %path.display(), "logo already hosted");
        }

        let file = path
            .file_name()
            .and_then(|f| f.to_str())
            .ok_or_else(|| LogoError::Invalid { url: url.to_string() })?;
        LogoRef::parse(file).map_err(|_| LogoError::Invalid { url: url.to_string() })
    }
}

/// Lowercase ASCII alphanumerics, everything else collapsed to single `-`.
fn slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.is_empty() && !out.ends_with('-') {
            out.push('-');
        }
    }
    let trimmed = out.trim_end_matches('-');
    if trimmed.is_empty() {
        "logo".to_string()
    } else {
        trimmed.to_string()
    }
}

fn looks_like_svg(content: &[u8]) -> bool {
    let head = &content[..content.len().min(1024)];
    String::from_utf8_lossy(head).to_ascii_lowercase().contains("<svg")
}
