use std::time::Instant;

use tracing::{debug, info, warn};

use crate::config::TierMap;
use crate::directory::{Directory, EntryRef};
use crate::hosting::LogoHost;
use crate::matcher::find_match;
use crate::merge::merge;
use crate::model::OrganizationRecord;
use crate::outcome::{compute_summary, Outcome, OutcomeRow, RunMeta, RunResult, SkipReason};
use crate::report::MissingRow;
use crate::roster::{Roster, RosterRow};
use crate::source::{CompanyDbLookup, NoCompanyDb, SourceSet};

/// Everything the driver needs besides the directory and the roster.
pub struct RunContext<'a> {
    pub name: &'a str,
    pub sources: &'a SourceSet,
    pub tiers: &'a TierMap,
    pub logo_host: Option<&'a dyn LogoHost>,
    pub skip_test_records: bool,
}

/// Reconcile every roster row against the directory, in roster order.
///
/// The directory is mutated in place; serializing it is left to the caller.
pub fn run(directory: &mut Directory, roster: &Roster, ctx: &RunContext<'_>) -> RunResult {
    let started = Instant::now();
    let mut outcomes = Vec::with_capacity(roster.rows.len());
    let mut missing = Vec::new();

    for row in &roster.rows {
        let outcome = reconcile_row(directory, row, ctx, &mut missing);
        info!(
            line = outcome.line,
            name = %outcome.name,
            outcome = %outcome.outcome,
            source = outcome.matched_source.as_deref().unwrap_or("-"),
            "row reconciled"
        );
        outcomes.push(outcome);
    }

    for bad in &roster.malformed {
        warn!(line = bad.line, reason = %bad.reason, "malformed roster row");
    }

    let summary = compute_summary(&outcomes, &roster.malformed);
    let skipped = outcomes
        .iter()
        .filter(|o| o.outcome == Outcome::Skipped)
        .cloned()
        .collect();

    RunResult {
        meta: RunMeta {
            config_name: ctx.name.to_string(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
            elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        },
        summary,
        outcomes,
        skipped,
        malformed: roster.malformed.clone(),
        missing,
    }
}

fn reconcile_row(
    directory: &mut Directory,
    row: &RosterRow,
    ctx: &RunContext<'_>,
    missing: &mut Vec<MissingRow>,
) -> OutcomeRow {
    let Some(roster_record) = row.to_record() else {
        // load_roster never yields an empty name
        return OutcomeRow::new(row.line, &row.name, Outcome::Skipped);
    };

    let existing = directory.find_existing(&row.name, None).or_else(|| {
        let db = ctx.sources.lookup(&row.name)?;
        directory.find_existing(&row.name, Some(&db))
    });
    if let Some(at) = existing {
        return update_existing(directory, at, row, &roster_record, ctx, missing);
    }

    if ctx.skip_test_records && is_test_name(&row.name) {
        warn!(line = row.line, name = %row.name, "skipping test record");
        let mut out = OutcomeRow::new(row.line, &row.name, Outcome::Skipped);
        out.skip_reason = Some(SkipReason::TestRecord);
        return out;
    }

    let Some(tier) = ctx.tiers.tier_for(&row.tier_label) else {
        warn!(line = row.line, name = %row.name, tier = %row.tier_label, "unknown membership tier, row skipped");
        let mut out = OutcomeRow::new(row.line, &row.name, Outcome::Skipped);
        out.skip_reason = Some(SkipReason::UnknownTier(row.tier_label.clone()));
        return out;
    };

    let mut record = roster_record;
    record.set_tier(tier);
    let matched = find_match(&record, ctx.sources);
    let mut merged = merge(&record, matched.as_ref().map(|m| &m.candidate), ctx.sources);

    let mut out = OutcomeRow::new(row.line, &row.name, Outcome::Reported);
    out.bucket = Some(tier);
    out.matched_source = matched.map(|m| m.source);

    if !merged.is_directory_eligible() {
        debug!(name = %row.name, missing = ?merged.missing_fields(), "not eligible for insert");
        missing.push(MissingRow::from_record(&merged));
        return out;
    }

    host_logo(&mut merged, ctx);
    if directory.append(tier, &merged).is_some() {
        out.outcome = Outcome::Inserted;
    } else {
        warn!(name = %row.name, "member category has no bucket list, record reported instead");
        missing.push(MissingRow::from_record(&merged));
    }
    out
}

fn update_existing(
    directory: &mut Directory,
    at: EntryRef,
    row: &RosterRow,
    roster_record: &OrganizationRecord,
    ctx: &RunContext<'_>,
    missing: &mut Vec<MissingRow>,
) -> OutcomeRow {
    let mut out = OutcomeRow::new(row.line, &row.name, Outcome::Unchanged);
    out.bucket = directory.bucket_tier(at.bucket);

    if directory.entry_missing_fields(at).is_empty() {
        return out;
    }

    let base = directory
        .entry_record(at)
        .unwrap_or_else(|| roster_record.clone());

    // Match on whatever the entry and the roster know between them.
    let known = merge(&base, Some(roster_record), &NoCompanyDb);
    let matched = find_match(&known, ctx.sources);
    let with_candidate = merge(&base, matched.as_ref().map(|m| &m.candidate), &NoCompanyDb);
    let mut merged = merge(&with_candidate, Some(roster_record), ctx.sources);
    out.matched_source = matched.map(|m| m.source);

    // Only a blank logo key gets filled, so only then is hosting worth it.
    if directory.blank_fields(at).contains(&"logo") {
        host_logo(&mut merged, ctx);
    }

    let filled = directory.fill_missing(at, &merged);
    if !filled.is_empty() {
        debug!(name = %row.name, filled = ?filled, "existing entry updated");
        out.outcome = Outcome::Updated;
        out.filled = filled;
    }

    if !directory.entry_missing_fields(at).is_empty() {
        out.incomplete = true;
        // Report what the entry now holds.
        let current = directory.entry_record(at).unwrap_or(merged);
        let mut report = MissingRow::from_record(&current);
        report.missing = directory.entry_missing_fields(at);
        missing.push(report);
    }
    out
}

fn host_logo(record: &mut OrganizationRecord, ctx: &RunContext<'_>) {
    let Some(host) = ctx.logo_host else {
        return;
    };
    let Some(logo) = record.logo().filter(|l| l.is_remote()).cloned() else {
        return;
    };
    match host.host(&record.normalized_name(), &logo) {
        Ok(local) => {
            debug!(name = %record.name(), from = %logo.as_str(), to = %local.as_str(), "logo hosted");
            record.replace_logo(local);
        }
        Err(err) => warn!(name = %record.name(), error = %err, "logo hosting failed, keeping remote reference"),
    }
}

/// A name containing the word "test" on its own.
fn is_test_name(name: &str) -> bool {
    name.split(|c: char| !c.is_alphanumeric())
        .any(|word| word.eq_ignore_ascii_case("test"))
}
