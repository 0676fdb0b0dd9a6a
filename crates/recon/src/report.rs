//! Missing-fields report: one CSV row per record that could not be placed
//! in the directory, or that sits there incomplete.

use std::io::Write;

use serde::Serialize;

use crate::error::ReportError;
use crate::model::OrganizationRecord;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingRow {
    pub name: String,
    pub logo: String,
    pub homepage_url: String,
    pub crunchbase: String,
    /// Not written to the CSV; kept for the JSON result.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing: Vec<&'static str>,
}

impl MissingRow {
    /// Report row with whatever valid fields the record has.
    pub fn from_record(record: &OrganizationRecord) -> Self {
        Self {
            name: record.normalized_name(),
            logo: record.logo().map(|l| l.as_str().to_string()).unwrap_or_default(),
            homepage_url: record.website().map(|w| w.url().to_string()).unwrap_or_default(),
            crunchbase: record.company_db().map(|c| c.as_str().to_string()).unwrap_or_default(),
            missing: record.missing_fields(),
        }
    }
}

pub fn write_missing_report<W: Write>(out: W, rows: &[MissingRow]) -> Result<(), ReportError> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(["name", "logo", "homepage_url", "crunchbase"])?;
    for row in rows {
        writer.write_record([&row.name, &row.logo, &row.homepage_url, &row.crunchbase])?;
    }
    writer.flush()?;
    Ok(())
}
