//! Candidate sources: the capability every auxiliary provider implements,
//! and the build-once lookup tables the matcher queries.

use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use serde::Serialize;
use tracing::{info, warn};

use crate::error::SourceError;
use crate::model::{CompanyDbRef, OrganizationRecord, Website};
use crate::normalize::{name_key, normalize_url};

/// Kind of auxiliary provider. Declaration order is search priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Another landscape's member directory. Most complete, pre-vetted records.
    PeerDirectory,
    /// The public membership webpage.
    Webpage,
    /// The company-database export.
    CompanyDb,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PeerDirectory => write!(f, "peer_directory"),
            Self::Webpage => write!(f, "webpage"),
            Self::CompanyDb => write!(f, "company_db"),
        }
    }
}

/// An auxiliary provider of organization records.
///
/// `fetch` does the provider's one bulk load. It is called at most once per
/// run by [`CachedSource`].
pub trait CandidateSource: Send + Sync {
    fn label(&self) -> &str;
    fn kind(&self) -> SourceKind;
    fn fetch(&self) -> Result<Vec<OrganizationRecord>, SourceError>;
}

/// Name-based company-database lookup used by the merger.
pub trait CompanyDbLookup {
    fn lookup(&self, name: &str) -> Option<CompanyDbRef>;
}

/// A lookup that never finds anything.
pub struct NoCompanyDb;

impl CompanyDbLookup for NoCompanyDb {
    fn lookup(&self, _name: &str) -> Option<CompanyDbRef> {
        None
    }
}

// ---------------------------------------------------------------------------
// LookupTable
// ---------------------------------------------------------------------------

/// Index over one source's candidates by normalized name and by domain.
/// On duplicate keys the first candidate wins.
#[derive(Debug, Default)]
pub struct LookupTable {
    records: Vec<OrganizationRecord>,
    by_name: HashMap<String, usize>,
    by_domain: HashMap<String, usize>,
}

impl LookupTable {
    pub fn new(records: Vec<OrganizationRecord>) -> Self {
        let mut by_name = HashMap::new();
        let mut by_domain = HashMap::new();
        for (i, record) in records.iter().enumerate() {
            let key = name_key(record.name());
            if !key.is_empty() {
                by_name.entry(key).or_insert(i);
            }
            if let Some(website) = record.website() {
                by_domain.entry(website.domain().to_string()).or_insert(i);
            }
        }
        Self { records, by_name, by_domain }
    }

    /// Name match first; domain match only when the names differ and both
    /// sides have a domain.
    pub fn find(&self, name: &str, website: Option<&Website>) -> Option<&OrganizationRecord> {
        self.find_by_domain_str(name, website.map(Website::domain))
    }

    /// Like [`find`](Self::find), taking a raw, unvalidated URL.
    pub fn find_raw(&self, name: &str, url: Option<&str>) -> Option<&OrganizationRecord> {
        let domain = url.and_then(normalize_url);
        self.find_by_domain_str(name, domain.as_deref())
    }

    fn find_by_domain_str(&self, name: &str, domain: Option<&str>) -> Option<&OrganizationRecord> {
        let key = name_key(name);
        let by_name = (!key.is_empty()).then(|| self.by_name.get(&key)).flatten();
        let idx = by_name.or_else(|| {
            domain
                .filter(|d| !d.is_empty())
                .and_then(|d| self.by_domain.get(d))
        })?;
        self.records.get(*idx)
    }

    pub fn records(&self) -> &[OrganizationRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// ---------------------------------------------------------------------------
// CachedSource
// ---------------------------------------------------------------------------

/// A source whose bulk load happens lazily, at most once.
///
/// A failed load is logged once and leaves the source empty for the rest of
/// the run.
pub struct CachedSource {
    source: Box<dyn CandidateSource>,
    table: OnceLock<LookupTable>,
}

impl CachedSource {
    pub fn new(source: Box<dyn CandidateSource>) -> Self {
        Self {
            source,
            table: OnceLock::new(),
        }
    }

    pub fn label(&self) -> &str {
        self.source.label()
    }

    pub fn kind(&self) -> SourceKind {
        self.source.kind()
    }

    pub fn is_loaded(&self) -> bool {
        self.table.get().is_some()
    }

    /// Load (once) and return the candidate table.
    pub fn load_all(&self) -> &LookupTable {
        self.table.get_or_init(|| match self.source.fetch() {
            Ok(records) => {
                info!(source = self.label(), candidates = records.len(), "built candidate cache");
                LookupTable::new(records)
            }
            Err(err) => {
                warn!(source = self.label(), error = %err, "source unavailable for this run");
                LookupTable::default()
            }
        })
    }

    pub fn find(&self, name: &str, website: Option<&Website>) -> Option<&OrganizationRecord> {
        self.load_all().find(name, website)
    }
}

impl CompanyDbLookup for CachedSource {
    fn lookup(&self, name: &str) -> Option<CompanyDbRef> {
        self.find(name, None).and_then(|r| r.company_db().cloned())
    }
}

impl fmt::Debug for CachedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedSource")
            .field("label", &self.label())
            .field("kind", &self.kind())
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// SourceSet
// ---------------------------------------------------------------------------

/// All candidate sources of a run, in search priority order: peer
/// directories (in the order given), then the webpage, then the company
/// database.
#[derive(Debug, Default)]
pub struct SourceSet {
    sources: Vec<CachedSource>,
}

impl SourceSet {
    pub fn new(mut sources: Vec<Box<dyn CandidateSource>>) -> Self {
        // Stable: keeps configured order within a kind.
        sources.sort_by_key(|s| s.kind());
        Self {
            sources: sources.into_iter().map(CachedSource::new).collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &CachedSource> {
        self.sources.iter()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn company_db(&self) -> Option<&CachedSource> {
        self.sources.iter().find(|s| s.kind() == SourceKind::CompanyDb)
    }
}

impl CompanyDbLookup for SourceSet {
    fn lookup(&self, name: &str) -> Option<CompanyDbRef> {
        self.company_db().and_then(|db| db.lookup(name))
    }
}

// ---------------------------------------------------------------------------
// StaticSource
// ---------------------------------------------------------------------------

/// A source over records already in memory.
pub struct StaticSource {
    label: String,
    kind: SourceKind,
    records: Vec<OrganizationRecord>,
}

impl StaticSource {
    pub fn new(label: impl Into<String>, kind: SourceKind, records: Vec<OrganizationRecord>) -> Self {
        Self {
            label: label.into(),
            kind,
            records,
        }
    }
}

impl CandidateSource for StaticSource {
    fn label(&self) -> &str {
        &self.label
    }

    fn kind(&self) -> SourceKind {
        self.kind
    }

    fn fetch(&self) -> Result<Vec<OrganizationRecord>, SourceError> {
        Ok(self.records.clone())
    }
}
