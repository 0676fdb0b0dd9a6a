use serde::Serialize;

use crate::model::MembershipTier;
use crate::report::MissingRow;
use crate::roster::MalformedRow;

// ---------------------------------------------------------------------------
// Per-row outcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Already in the directory; nothing written.
    Unchanged,
    /// Already in the directory; previously-missing fields were added.
    Updated,
    /// New to the directory and complete; appended to its tier bucket.
    Inserted,
    /// New to the directory but incomplete; only in the missing report.
    Reported,
    /// Not processed: unknown tier label or a test record.
    Skipped,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unchanged => write!(f, "unchanged"),
            Self::Updated => write!(f, "updated"),
            Self::Inserted => write!(f, "inserted"),
            Self::Reported => write!(f, "reported"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    UnknownTier(String),
    TestRecord,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutcomeRow {
    pub line: u64,
    pub name: String,
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket: Option<MembershipTier>,
    /// Candidate source that supplied the match, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_source: Option<String>,
    /// Directory keys added to an existing entry.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub filled: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<SkipReason>,
    /// Entry is in the directory but still lacks required fields.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub incomplete: bool,
}

impl OutcomeRow {
    pub fn new(line: u64, name: &str, outcome: Outcome) -> Self {
        Self {
            line,
            name: name.to_string(),
            outcome,
            bucket: None,
            matched_source: None,
            filled: Vec::new(),
            skip_reason: None,
            incomplete: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub roster_rows: usize,
    pub added: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub reported: usize,
    pub skipped: usize,
    pub malformed: usize,
    /// Existing entries still lacking required fields.
    pub incomplete_existing: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunMeta {
    pub config_name: String,
    pub engine_version: String,
    pub run_at: String,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub meta: RunMeta,
    pub summary: RunSummary,
    pub outcomes: Vec<OutcomeRow>,
    /// Rows that were not processed, also present in `outcomes`.
    pub skipped: Vec<OutcomeRow>,
    pub malformed: Vec<MalformedRow>,
    pub missing: Vec<MissingRow>,
}

/// Tally outcomes.
pub fn compute_summary(outcomes: &[OutcomeRow], malformed: &[MalformedRow]) -> RunSummary {
    let mut summary = RunSummary {
        roster_rows: outcomes.len() + malformed.len(),
        malformed: malformed.len(),
        ..RunSummary::default()
    };
    for row in outcomes {
        match row.outcome {
            Outcome::Unchanged => summary.unchanged += 1,
            Outcome::Updated => summary.updated += 1,
            Outcome::Inserted => summary.added += 1,
            Outcome::Reported => summary.reported += 1,
            Outcome::Skipped => summary.skipped += 1,
        }
        if row.incomplete {
            summary.incomplete_existing += 1;
        }
    }
    summary
}
