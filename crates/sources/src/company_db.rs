//! Company database export: `name,permalink,...` rows.

use std::path::{Path, PathBuf};

use landscape_recon::config::{resolve_path, CompanyDbConfig};
use landscape_recon::model::{CompanyDbRef, OrganizationRecord};
use landscape_recon::source::{CandidateSource, SourceKind};
use landscape_recon::SourceError;
use tracing::debug;

pub struct CompanyDbExport {
    label: String,
    path: PathBuf,
}

impl CompanyDbExport {
    pub fn new(label: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            label: label.into(),
            path: path.into(),
        }
    }

    pub fn from_config(config: &CompanyDbConfig, config_path: &Path) -> Self {
        Self::new("company-db", resolve_path(config_path, &config.file))
    }

    /// One candidate per row with a name and a usable permalink. A first row
    /// reading `name` is treated as a header.
    pub fn parse(&self, csv_data: &str) -> Result<Vec<OrganizationRecord>, SourceError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(csv_data.as_bytes());

        let mut records = Vec::new();
        for (i, row) in reader.records().enumerate() {
            let row = row.map_err(|e| SourceError::Parse {
                source_label: self.label.clone(),
                message: e.to_string(),
            })?;
            let name = row.get(0).unwrap_or("").trim();
            let permalink = row.get(1).unwrap_or("").trim();
            if i == 0 && name.eq_ignore_ascii_case("name") {
                continue;
            }
            let Ok(mut record) = OrganizationRecord::new(name) else {
                continue;
            };
            match CompanyDbRef::from_permalink(permalink) {
                Ok(db) => {
                    if let Err(err) = record.set_company_db(db.as_str()) {
                        debug!(name, error = %err, "company db reference rejected");
                        continue;
                    }
                }
                Err(err) => {
                    debug!(name, error = %err, "company db row without permalink");
                    continue;
                }
            }
            records.push(record);
        }
        debug!(source = %self.label, candidates = records.len(), "company db export parsed");
        Ok(records)
    }
}

impl CandidateSource for CompanyDbExport {
    fn label(&self) -> &str {
        &self.label
    }

    fn kind(&self) -> SourceKind {
        SourceKind::CompanyDb
    }

    fn fetch(&self) -> Result<Vec<OrganizationRecord>, SourceError> {
        let data = crate::text::read_lossy(&self.path).map_err(|e| SourceError::Read {
            source_label: self.label.clone(),
            path: self.path.clone(),
            message: e.to_string(),
        })?;
        self.parse(&data)
    }
}
