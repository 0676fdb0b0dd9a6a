use serde::Serialize;

use crate::model::OrganizationRecord;
use crate::source::{SourceKind, SourceSet};

/// A candidate that denotes the same organization as the record searched for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Match {
    pub source: String,
    pub kind: SourceKind,
    pub candidate: OrganizationRecord,
}

/// First-fit search by source priority.
///
/// Each source is asked by normalized name, then by registrable domain. The
/// first source that yields a candidate ends the search; candidates are not
/// ranked across sources.
pub fn find_match(record: &OrganizationRecord, sources: &SourceSet) -> Option<Match> {
    sources.iter().find_map(|source| {
        source.find(record.name(), record.website()).map(|candidate| Match {
            source: source.label().to_string(),
            kind: source.kind(),
            candidate: candidate.clone(),
        })
    })
}
