use std::path::PathBuf;

use landscape_recon::config::TierMap;
use landscape_recon::engine::{run, RunContext};
use landscape_recon::model::{MembershipTier, OrganizationRecord};
use landscape_recon::outcome::{Outcome, RunResult, SkipReason};
use landscape_recon::report::write_missing_report;
use landscape_recon::source::{CandidateSource, SourceKind, SourceSet, StaticSource};
use landscape_recon::{load_roster, Directory, SourceError};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn fixture(name: &str) -> String {
    let path = fixtures_dir().join(name);
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()))
}

/// Company database export: `name,permalink`.
fn company_db_records() -> Vec<OrganizationRecord> {
    let data = fixture("organizations.csv");
    let mut reader = csv::Reader::from_reader(data.as_bytes());
    reader
        .records()
        .map(|row| {
            let row = row.unwrap();
            let mut r = OrganizationRecord::new(&row[0]).unwrap();
            r.set_company_db(&format!("https://www.crunchbase.com/organization/{}", &row[1]))
                .unwrap();
            r
        })
        .collect()
}

/// Peer directory flattened to `name,homepage_url,logo`.
fn peer_records() -> Vec<OrganizationRecord> {
    let data = fixture("peer-landscape.csv");
    let mut reader = csv::Reader::from_reader(data.as_bytes());
    reader
        .records()
        .map(|row| {
            let row = row.unwrap();
            let mut r = OrganizationRecord::new(&row[0]).unwrap();
            r.set_website(&row[1]).unwrap();
            r.set_logo(&row[2]).unwrap();
            r
        })
        .collect()
}

fn fixture_sources() -> SourceSet {
    SourceSet::new(vec![
        Box::new(StaticSource::new("company-db", SourceKind::CompanyDb, company_db_records())),
        Box::new(StaticSource::new("peer", SourceKind::PeerDirectory, peer_records())),
    ])
}

fn run_fixture(sources: &SourceSet) -> (Directory, RunResult) {
    let mut directory = Directory::from_yaml_str(&fixture("landscape.yml"), "LF Member Company").unwrap();
    let roster = load_roster(&fixture("sfdcexport.csv"));
    let tiers = TierMap::default();
    let ctx = RunContext {
        name: "fixture",
        sources,
        tiers: &tiers,
        logo_host: None,
        skip_test_records: true,
    };
    let result = run(&mut directory, &roster, &ctx);
    (directory, result)
}

fn outcome_of<'a>(result: &'a RunResult, name: &str) -> &'a landscape_recon::outcome::OutcomeRow {
    result
        .outcomes
        .iter()
        .find(|o| o.name == name)
        .unwrap_or_else(|| panic!("no outcome for {name}"))
}

// -------------------------------------------------------------------------
// Full roster
// -------------------------------------------------------------------------

#[test]
fn roster_summary() {
    let (_, result) = run_fixture(&fixture_sources());
    let s = &result.summary;
    assert_eq!(s.roster_rows, 9);
    assert_eq!(s.unchanged, 2);
    assert_eq!(s.updated, 1);
    assert_eq!(s.added, 2);
    assert_eq!(s.reported, 1);
    assert_eq!(s.skipped, 2);
    assert_eq!(s.malformed, 1);
    assert_eq!(s.incomplete_existing, 1);
    assert_eq!(result.meta.config_name, "fixture");
}

#[test]
fn complete_entry_left_alone() {
    let sources = fixture_sources();
    let before = Directory::from_yaml_str(&fixture("landscape.yml"), "LF Member Company").unwrap();
    let (after, result) = run_fixture(&sources);
    assert_eq!(outcome_of(&result, "Acme, Inc.").outcome, Outcome::Unchanged);

    let find = |d: &Directory| {
        let at = d.find_existing("Acme", None).unwrap();
        d.entries().find(|(r, _)| *r == at).map(|(_, m)| m.clone()).unwrap()
    };
    assert_eq!(find(&after), find(&before));
}

#[test]
fn existing_entry_filled_from_peer_and_company_db() {
    let (dir, result) = run_fixture(&fixture_sources());
    let out = outcome_of(&result, "Widgets");
    assert_eq!(out.outcome, Outcome::Updated);
    assert_eq!(out.matched_source.as_deref(), Some("peer"));
    assert_eq!(out.filled, vec!["logo".to_string(), "crunchbase".to_string()]);

    let entry = dir.entry_record(dir.find_existing("Widgets", None).unwrap()).unwrap();
    // The entry's own website wins over the peer's.
    assert_eq!(entry.website().unwrap().domain(), "widgets.io");
    assert_eq!(entry.logo().unwrap().as_str(), "https://peer.example.org/logos/widgets.svg");
    assert_eq!(
        entry.company_db().unwrap().as_str(),
        "https://www.crunchbase.com/organization/widgets"
    );
}

#[test]
fn invalid_existing_values_never_overwritten() {
    let (dir, result) = run_fixture(&fixture_sources());
    let out = outcome_of(&result, "Hooli");
    assert_eq!(out.outcome, Outcome::Unchanged);
    assert!(out.incomplete);

    let at = dir.find_existing("Hooli", None).unwrap();
    let (_, entry) = dir.entries().find(|(r, _)| *r == at).unwrap();
    assert_eq!(entry.get("homepage_url").and_then(|v| v.as_str()), Some("not a url"));
    assert_eq!(entry.get("logo").and_then(|v| v.as_str()), Some("hooli.png"));

    // Present but invalid values still count as missing.
    let report = result.missing.iter().find(|m| m.name == "Hooli").unwrap();
    assert_eq!(report.missing, vec!["homepage_url", "logo", "crunchbase"]);
}

#[test]
fn complete_new_members_inserted_into_tier_buckets() {
    let (dir, result) = run_fixture(&fixture_sources());

    let globex = outcome_of(&result, "Globex Corporation");
    assert_eq!(globex.outcome, Outcome::Inserted);
    assert_eq!(globex.bucket, Some(MembershipTier::Silver));
    assert_eq!(globex.matched_source.as_deref(), Some("company-db"));
    let at = dir.find_existing("Globex Corporation", None).unwrap();
    assert_eq!(dir.bucket_tier(at.bucket), Some(MembershipTier::Silver));
    let entry = dir.entry_record(at).unwrap();
    assert_eq!(entry.website().unwrap().domain(), "globex.com");
    assert_eq!(
        entry.company_db().unwrap().as_str(),
        "https://www.crunchbase.com/organization/globex"
    );

    // No Associate bucket in the fixture; created on demand.
    let vandelay = outcome_of(&result, "Vandelay Industries (member)");
    assert_eq!(vandelay.outcome, Outcome::Inserted);
    let at = dir.find_existing("Vandelay Industries", None).unwrap();
    assert_eq!(dir.bucket_tier(at.bucket), Some(MembershipTier::Associate));
    let written = dir.entry_record(at).unwrap();
    assert_eq!(written.name(), "Vandelay Industries");
}

#[test]
fn incomplete_new_member_only_in_report() {
    let (dir, result) = run_fixture(&fixture_sources());
    let out = outcome_of(&result, "Initech LLC");
    assert_eq!(out.outcome, Outcome::Reported);
    assert_eq!(out.matched_source.as_deref(), Some("peer"));
    assert!(dir.find_existing("Initech", None).is_none());

    let report = result.missing.iter().find(|m| m.name == "Initech").unwrap();
    assert_eq!(report.homepage_url, "https://initech.com/");
    assert_eq!(report.logo, "https://peer.example.org/logos/initech.svg");
    assert_eq!(report.crunchbase, "");
}

#[test]
fn skips_and_malformed() {
    let (_, result) = run_fixture(&fixture_sources());
    assert_eq!(
        outcome_of(&result, "Bronze Co").skip_reason,
        Some(SkipReason::UnknownTier("Bronze Membership".into()))
    );
    assert_eq!(outcome_of(&result, "Test Account").skip_reason, Some(SkipReason::TestRecord));
    assert_eq!(result.malformed.len(), 1);
    assert_eq!(result.malformed[0].line, 10);
    assert!(result.missing.iter().all(|m| m.name != "Bronze Co" && m.name != "Test Account"));
}

#[test]
fn missing_report_in_roster_order() {
    let (_, result) = run_fixture(&fixture_sources());
    let mut buf = Vec::new();
    write_missing_report(&mut buf, &result.missing).unwrap();
    let text = String::from_utf8(buf).unwrap();
    assert_eq!(
        text,
        "name,logo,homepage_url,crunchbase\n\
         Initech,https://peer.example.org/logos/initech.svg,https://initech.com/,\n\
         Hooli,,,\n"
    );
}

#[test]
fn eligibility_gate_holds_for_every_directory_entry() {
    let (dir, result) = run_fixture(&fixture_sources());
    let inserted: Vec<_> = result
        .outcomes
        .iter()
        .filter(|o| o.outcome == Outcome::Inserted)
        .collect();
    for out in inserted {
        let at = dir
            .find_existing(&out.name, None)
            .unwrap_or_else(|| panic!("{} not written", out.name));
        assert!(dir.entry_missing_fields(at).is_empty());
    }
    for row in &result.missing {
        if row.name == "Hooli" {
            continue;
        }
        assert!(dir.find_existing(&row.name, None).is_none());
    }
}

#[test]
fn rerun_on_output_is_stable() {
    let sources = fixture_sources();
    let (dir, _) = run_fixture(&sources);
    let first = dir.to_yaml_string().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    let written = scratch.path().join("landscape.yml");
    std::fs::write(&written, &first).unwrap();

    let reread = std::fs::read_to_string(&written).unwrap();
    let mut again = Directory::from_yaml_str(&reread, "LF Member Company").unwrap();
    let roster = load_roster(&fixture("sfdcexport.csv"));
    let tiers = TierMap::default();
    let ctx = RunContext {
        name: "fixture",
        sources: &sources,
        tiers: &tiers,
        logo_host: None,
        skip_test_records: true,
    };
    let result = run(&mut again, &roster, &ctx);
    assert_eq!(result.summary.added, 0);
    assert_eq!(result.summary.updated, 0);
    assert_eq!(again.to_yaml_string().unwrap(), first);
}

// -------------------------------------------------------------------------
// Hand-formatted directory text
// -------------------------------------------------------------------------

const ROSTER_HEADER: &str = "Account Name,Logo,Website,Membership\n";

fn run_rows(doc: &str, rows: &str) -> (Directory, RunResult) {
    let sources = fixture_sources();
    let mut directory = Directory::from_yaml_str(doc, "LF Member Company").unwrap();
    let roster = load_roster(&format!("{ROSTER_HEADER}{rows}"));
    let tiers = TierMap::default();
    let ctx = RunContext {
        name: "commented",
        sources: &sources,
        tiers: &tiers,
        logo_host: None,
        skip_test_records: true,
    };
    let result = run(&mut directory, &roster, &ctx);
    (directory, result)
}

#[test]
fn unchanged_run_keeps_text_byte_for_byte() {
    let doc = fixture("landscape-commented.yml");
    let (dir, result) = run_rows(&doc, "\"Acme, Inc.\",,,Platinum Membership\n");
    assert_eq!(result.outcomes[0].outcome, Outcome::Unchanged);
    assert!(!dir.is_modified());
    assert_eq!(dir.to_yaml_string().unwrap(), doc);
}

#[test]
fn edits_leave_untouched_lines_byte_for_byte() {
    let doc = fixture("landscape-commented.yml");
    let (dir, result) = run_rows(
        &doc,
        "Widgets,,,Gold Membership\n\
         Globex Corporation,https://cdn.example.org/globex.svg,www.globex.com,Silver Membership - MPSF\n",
    );
    assert_eq!(result.outcomes[0].outcome, Outcome::Updated);
    assert_eq!(result.outcomes[1].outcome, Outcome::Inserted);

    let out = dir.to_yaml_string().unwrap();
    let untouched = "            homepage_url: https://widgets.io/\n";
    let head = &doc[..doc.find(untouched).unwrap() + untouched.len()];
    assert!(out.starts_with(head), "lines before the edits changed:\n{out}");
    assert!(out.contains(
        "            logo: https://peer.example.org/logos/widgets.svg\n\
         \x20           crunchbase: https://www.crunchbase.com/organization/widgets\n\
         \x20     - subcategory:\n\
         \x20       name: Silver\n\
         \x20       items:\n\
         \x20         - item:\n\
         \x20           name: Globex Corporation\n"
    ));
    assert!(out.ends_with("\n# end of members\n"));

    let reread = Directory::from_yaml_str(&out, "LF Member Company").unwrap();
    let at = reread.find_existing("Globex Corporation", None).unwrap();
    assert_eq!(reread.bucket_tier(at.bucket), Some(MembershipTier::Silver));
    assert!(reread.entry_missing_fields(at).is_empty());
}

// -------------------------------------------------------------------------
// Source behaviour
// -------------------------------------------------------------------------

struct DownSource;

impl CandidateSource for DownSource {
    fn label(&self) -> &str {
        "peer-down"
    }

    fn kind(&self) -> SourceKind {
        SourceKind::PeerDirectory
    }

    fn fetch(&self) -> Result<Vec<OrganizationRecord>, SourceError> {
        Err(SourceError::Fetch {
            source_label: "peer-down".into(),
            message: "connection refused".into(),
        })
    }
}

#[test]
fn unavailable_source_is_not_fatal() {
    let sources = SourceSet::new(vec![
        Box::new(DownSource),
        Box::new(StaticSource::new("company-db", SourceKind::CompanyDb, company_db_records())),
    ]);
    let (_, result) = run_fixture(&sources);
    // Widgets can no longer get a logo; Initech no longer matches at all.
    assert_eq!(outcome_of(&result, "Widgets").outcome, Outcome::Updated);
    assert!(outcome_of(&result, "Widgets").incomplete);
    assert_eq!(outcome_of(&result, "Initech LLC").matched_source, None);
    assert_eq!(outcome_of(&result, "Globex Corporation").outcome, Outcome::Inserted);
}

#[test]
fn higher_priority_source_wins() {
    let mut webpage_initech = OrganizationRecord::new("Initech").unwrap();
    webpage_initech.set_logo("https://web.example.org/initech.svg").unwrap();
    let sources = SourceSet::new(vec![
        Box::new(StaticSource::new("web", SourceKind::Webpage, vec![webpage_initech])),
        Box::new(StaticSource::new("peer", SourceKind::PeerDirectory, peer_records())),
    ]);
    let (_, result) = run_fixture(&sources);
    assert_eq!(outcome_of(&result, "Initech LLC").matched_source.as_deref(), Some("peer"));
    let report = result.missing.iter().find(|m| m.name == "Initech").unwrap();
    assert_eq!(report.logo, "https://peer.example.org/logos/initech.svg");
}

// -------------------------------------------------------------------------
// End-to-end roster row scenarios
// -------------------------------------------------------------------------

const EMPTY_DOC: &str = "landscape:\n- category: null\n  name: LF Member Company\n  subcategories: []\n";

fn single_row(row: &str, db: Vec<OrganizationRecord>) -> (Directory, RunResult) {
    let sources = SourceSet::new(vec![Box::new(StaticSource::new("company-db", SourceKind::CompanyDb, db))]);
    let mut directory = Directory::from_yaml_str(EMPTY_DOC, "LF Member Company").unwrap();
    let roster = load_roster(&format!("Account Name,Logo,Website,Membership\n{row}\n"));
    let tiers = TierMap::default();
    let ctx = RunContext {
        name: "single",
        sources: &sources,
        tiers: &tiers,
        logo_host: None,
        skip_test_records: true,
    };
    let result = run(&mut directory, &roster, &ctx);
    (directory, result)
}

#[test]
fn png_logo_without_lookup_is_reported() {
    let (dir, result) = single_row("Acme Inc.,logo.png,acme.com,Gold Membership", vec![]);
    assert_eq!(result.outcomes[0].outcome, Outcome::Reported);
    assert_eq!(result.missing[0].name, "Acme");
    assert_eq!(dir.entry_count(), 0);
}

#[test]
fn svg_logo_with_lookup_is_inserted_into_gold() {
    let mut acme = OrganizationRecord::new("Acme").unwrap();
    acme.set_company_db("https://www.crunchbase.com/organization/acme").unwrap();
    let (dir, result) = single_row("Acme Inc.,logo.svg,acme.com,Gold Membership", vec![acme]);
    assert_eq!(result.outcomes[0].outcome, Outcome::Inserted);
    assert_eq!(result.outcomes[0].bucket, Some(MembershipTier::Gold));
    let at = dir.find_existing("Acme", None).unwrap();
    assert_eq!(dir.bucket_tier(at.bucket), Some(MembershipTier::Gold));
    let entry = dir.entry_record(at).unwrap();
    assert_eq!(entry.website().unwrap().domain(), "acme.com");
    assert!(result.missing.is_empty());
}
