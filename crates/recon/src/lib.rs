//! `landscape-recon`: Member reconciliation engine for landscape directories.
//!
//! Pure engine crate: receives a parsed directory, a roster and a set of
//! candidate sources, and returns per-row outcomes plus the missing report.
//! Bulk fetching lives behind [`source::CandidateSource`]; network and file
//! access for concrete sources is in `landscape-sources`.

pub mod config;
pub mod directory;
pub mod engine;
pub mod error;
pub mod hosting;
pub mod layout;
pub mod matcher;
pub mod merge;
pub mod model;
pub mod normalize;
pub mod outcome;
pub mod report;
pub mod roster;
pub mod source;

pub use config::{RunConfig, TierMap};
pub use directory::Directory;
pub use engine::{run, RunContext};
pub use error::{ConfigError, DirectoryError, FieldError, ReportError, SourceError};
pub use hosting::{LogoError, LogoHost};
pub use model::{CompanyDbRef, LogoRef, MembershipTier, OrganizationRecord, Website};
pub use outcome::{Outcome, RunResult, RunSummary};
pub use roster::{load_roster, Roster};
pub use source::{CandidateSource, SourceKind, SourceSet};
