//! The authoritative roster: CRM export rows of
//! `(organization name, logo, website, membership tier label)`.

use serde::Serialize;
use tracing::debug;

use crate::model::OrganizationRecord;

/// Number of leading columns every roster row must have.
pub const ROSTER_COLUMNS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RosterRow {
    pub line: u64,
    pub name: String,
    pub logo: String,
    pub website: String,
    pub tier_label: String,
}

/// A row that could not be used at all. Counted apart from reported records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MalformedRow {
    pub line: u64,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct Roster {
    pub rows: Vec<RosterRow>,
    pub malformed: Vec<MalformedRow>,
}

impl RosterRow {
    /// The row as an authoritative record. Fields that fail validation are
    /// left unset.
    pub fn to_record(&self) -> Option<OrganizationRecord> {
        let mut record = OrganizationRecord::new(&self.name).ok()?;
        if let Err(err) = record.set_website(&self.website) {
            debug!(line = self.line, name = %self.name, error = %err, "roster website rejected");
        }
        if let Err(err) = record.set_logo(&self.logo) {
            debug!(line = self.line, name = %self.name, error = %err, "roster logo rejected");
        }
        Some(record)
    }
}

/// Parse roster CSV. The header row is skipped; columns are positional.
pub fn load_roster(csv_data: &str) -> Roster {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(csv_data.as_bytes());

    let mut roster = Roster::default();
    for result in reader.records() {
        let record = match result {
            Ok(record) => record,
            Err(err) => {
                let line = err.position().map_or(0, |p| p.line());
                roster.malformed.push(MalformedRow {
                    line,
                    reason: err.to_string(),
                });
                continue;
            }
        };
        let line = record.position().map_or(0, |p| p.line());

        if record.len() < ROSTER_COLUMNS {
            roster.malformed.push(MalformedRow {
                line,
                reason: format!("expected {ROSTER_COLUMNS} columns, found {}", record.len()),
            });
            continue;
        }
        let field = |i: usize| record.get(i).unwrap_or("").trim().to_string();
        let name = field(0);
        if name.is_empty() {
            roster.malformed.push(MalformedRow {
                line,
                reason: "empty organization name".into(),
            });
            continue;
        }
        roster.rows.push(RosterRow {
            line,
            name,
            logo: field(1),
            website: field(2),
            tier_label: field(3),
        });
    }
    roster
}
