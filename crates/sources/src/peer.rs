//! Peer landscape directories: other landscapes whose member categories list
//! organizations that may also be members here.

use std::path::{Path, PathBuf};

use landscape_recon::config::{resolve_path, PeerConfig};
use landscape_recon::directory::{record_from_mapping, scalar, KEY_LOGO, KEY_NAME};
use landscape_recon::model::OrganizationRecord;
use landscape_recon::source::{CandidateSource, SourceKind};
use landscape_recon::SourceError;
use serde_yaml::{Mapping, Value};
use tracing::debug;

const MEMBER_MARKER: &str = " (member)";

#[derive(Debug, Clone)]
pub struct PeerLandscape {
    label: String,
    path: PathBuf,
    logo_base: Option<String>,
    member_categories: Vec<String>,
}

impl PeerLandscape {
    pub fn new(
        label: impl Into<String>,
        path: impl Into<PathBuf>,
        logo_base: Option<String>,
        member_categories: Vec<String>,
    ) -> Self {
        Self {
            label: label.into(),
            path: path.into(),
            logo_base,
            member_categories,
        }
    }

    pub fn from_config(config: &PeerConfig, config_path: &Path) -> Self {
        Self::new(
            config.name.clone(),
            resolve_path(config_path, &config.file),
            config.logo_base.clone(),
            config.member_categories.clone(),
        )
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Candidates from every member category of a parsed peer document.
    pub fn parse(&self, input: &str) -> Result<Vec<OrganizationRecord>, SourceError> {
        let doc: Value = serde_yaml::from_str(input).map_err(|e| SourceError::Parse {
            source_label: self.label.clone(),
            message: e.to_string(),
        })?;
        let categories = doc
            .get("landscape")
            .and_then(Value::as_sequence)
            .ok_or_else(|| SourceError::Parse {
                source_label: self.label.clone(),
                message: "no top-level 'landscape' sequence".into(),
            })?;

        let mut records = Vec::new();
        for category in categories {
            let Some(name) = category.get(KEY_NAME).and_then(Value::as_str) else {
                continue;
            };
            if !self.is_member_category(name) {
                continue;
            }
            let subcategories = category
                .get("subcategories")
                .and_then(Value::as_sequence)
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            for sub in subcategories {
                let items = sub
                    .get("items")
                    .and_then(Value::as_sequence)
                    .map(Vec::as_slice)
                    .unwrap_or(&[]);
                records.extend(items.iter().filter_map(Value::as_mapping).filter_map(|m| self.to_record(m)));
            }
        }
        debug!(source = %self.label, candidates = records.len(), "peer landscape parsed");
        Ok(records)
    }

    fn is_member_category(&self, name: &str) -> bool {
        self.member_categories.iter().any(|marker| name.contains(marker.as_str()))
    }

    fn to_record(&self, item: &Mapping) -> Option<OrganizationRecord> {
        let raw_name = scalar(item, KEY_NAME)?;
        let name = raw_name.replace(MEMBER_MARKER, "");
        let mut record = OrganizationRecord::new(&name).ok()?;

        let mut item = item.clone();
        if let Some(logo) = scalar(&item, KEY_LOGO).map(|l| self.logo_url(l)) {
            item.insert(KEY_LOGO.into(), Value::String(logo));
        }
        record_from_mapping(&mut record, &item);
        Some(record)
    }

    /// Peer landscapes store hosted logos as bare file names.
    fn logo_url(&self, logo: &str) -> String {
        if logo.starts_with("http://") || logo.starts_with("https://") {
            return logo.to_string();
        }
        match self.logo_base {
            Some(ref base) => format!("{base}{logo}"),
            None => logo.to_string(),
        }
    }
}

impl CandidateSource for PeerLandscape {
    fn label(&self) -> &str {
        &self.label
    }

    fn kind(&self) -> SourceKind {
        SourceKind::PeerDirectory
    }

    fn fetch(&self) -> Result<Vec<OrganizationRecord>, SourceError> {
        let input = crate::text::read_lossy(&self.path).map_err(|e| SourceError::Read {
            source_label: self.label.clone(),
            path: self.path.clone(),
            message: e.to_string(),
        })?;
        self.parse(&input)
    }
}
