use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::directory::DEFAULT_MEMBER_CATEGORY;
use crate::error::ConfigError;
use crate::model::MembershipTier;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    pub name: String,
    /// CRM export CSV.
    pub roster: String,
    /// Landscape YAML, read at start and rewritten at the end.
    pub directory: String,
    /// Missing-fields CSV written at the end.
    pub missing_report: String,
    #[serde(default = "default_member_category")]
    pub member_category: String,
    #[serde(default = "default_true")]
    pub skip_test_records: bool,
    /// Roster tier label → bucket. Merged over the built-in labels.
    #[serde(default)]
    pub tiers: BTreeMap<String, MembershipTier>,
    #[serde(default)]
    pub company_db: Option<CompanyDbConfig>,
    #[serde(default)]
    pub webpage: Option<WebpageConfig>,
    #[serde(default)]
    pub peers: Vec<PeerConfig>,
    #[serde(default)]
    pub logos: Option<LogoConfig>,
}

fn default_member_category() -> String {
    DEFAULT_MEMBER_CATEGORY.into()
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompanyDbConfig {
    /// Organizations export: `name,permalink,...`.
    pub file: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WebpageConfig {
    pub url: String,
    #[serde(default = "default_member_selector")]
    pub selector: String,
}

pub const DEFAULT_MEMBER_SELECTOR: &str = "div.single-member-icon";

fn default_member_selector() -> String {
    DEFAULT_MEMBER_SELECTOR.into()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PeerConfig {
    pub name: String,
    pub file: String,
    /// Prefix for logo file names that are not already URLs.
    #[serde(default)]
    pub logo_base: Option<String>,
    /// Substrings identifying member categories in the peer landscape.
    #[serde(default = "default_member_markers")]
    pub member_categories: Vec<String>,
}

fn default_member_markers() -> Vec<String> {
    vec![
        "Members".into(),
        "Member Company".into(),
        "Existing ODPi Members and other companies to invite".into(),
    ]
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogoConfig {
    /// Directory downloaded logos are stored in.
    pub hosted_dir: String,
}

// ---------------------------------------------------------------------------
// Tier labels
// ---------------------------------------------------------------------------

const DEFAULT_TIER_LABELS: &[(&str, MembershipTier)] = &[
    ("Associate Membership", MembershipTier::Associate),
    ("Gold Membership", MembershipTier::Gold),
    ("Platinum Membership", MembershipTier::Platinum),
    ("Silver Membership", MembershipTier::Silver),
    ("Silver Membership - MPSF", MembershipTier::Silver),
];

/// Roster tier label → directory bucket.
#[derive(Debug, Clone)]
pub struct TierMap {
    labels: BTreeMap<String, MembershipTier>,
}

impl Default for TierMap {
    fn default() -> Self {
        Self {
            labels: DEFAULT_TIER_LABELS
                .iter()
                .map(|(label, tier)| (label.to_lowercase(), *tier))
                .collect(),
        }
    }
}

impl TierMap {
    pub fn with_overrides(overrides: &BTreeMap<String, MembershipTier>) -> Self {
        let mut map = Self::default();
        for (label, tier) in overrides {
            map.labels.insert(label.trim().to_lowercase(), *tier);
        }
        map
    }

    /// Case-insensitive; `None` for unrecognized labels.
    pub fn tier_for(&self, label: &str) -> Option<MembershipTier> {
        self.labels.get(&label.trim().to_lowercase()).copied()
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl RunConfig {
    pub fn from_toml(input: &str) -> Result<Self, ConfigError> {
        let config: RunConfig = toml::from_str(input).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("name", &self.name),
            ("roster", &self.roster),
            ("directory", &self.directory),
            ("missing_report", &self.missing_report),
            ("member_category", &self.member_category),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Validation(format!("'{field}' must not be empty")));
            }
        }

        let mut seen = HashSet::new();
        for peer in &self.peers {
            if peer.name.trim().is_empty() {
                return Err(ConfigError::Validation("peer name must not be empty".into()));
            }
            if peer.file.trim().is_empty() {
                return Err(ConfigError::Validation(format!("peer '{}': 'file' must not be empty", peer.name)));
            }
            if peer.member_categories.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "peer '{}': 'member_categories' must not be empty",
                    peer.name
                )));
            }
            if !seen.insert(peer.name.as_str()) {
                return Err(ConfigError::Validation(format!("duplicate peer '{}'", peer.name)));
            }
        }

        if let Some(ref web) = self.webpage {
            let url = url::Url::parse(&web.url)
                .map_err(|e| ConfigError::Validation(format!("webpage url '{}': {e}", web.url)))?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(ConfigError::Validation(format!("webpage url '{}' must be http(s)", web.url)));
            }
            if web.selector.trim().is_empty() {
                return Err(ConfigError::Validation("webpage selector must not be empty".into()));
            }
        }

        if let Some(ref db) = self.company_db {
            if db.file.trim().is_empty() {
                return Err(ConfigError::Validation("company_db 'file' must not be empty".into()));
            }
        }

        if let Some(ref logos) = self.logos {
            if logos.hosted_dir.trim().is_empty() {
                return Err(ConfigError::Validation("logos 'hosted_dir' must not be empty".into()));
            }
        }

        Ok(())
    }

    pub fn tier_map(&self) -> TierMap {
        TierMap::with_overrides(&self.tiers)
    }
}

/// Resolve a config-relative path against the config file's directory.
pub fn resolve_path(config_path: &Path, file: &str) -> PathBuf {
    let base = config_path.parent().unwrap_or_else(|| Path::new("."));
    base.join(file)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
name = "LF members"
roster = "sfdcexport.csv"
directory = "landscape.yml"
missing_report = "missing.csv"
"#;

    const FULL: &str = r#"
name = "LF members"
roster = "sfdcexport.csv"
directory = "landscape.yml"
missing_report = "missing.csv"
member_category = "Member Company"
skip_test_records = false

[tiers]
"Diamond Membership" = "platinum"

[company_db]
file = "organizations.csv"

[webpage]
url = "https://www.linuxfoundation.org/membership/members/"

[[peers]]
name = "cncf-landscape"
file = "../cncf-landscape/landscape.yml"
logo_base = "https://github.com/cncf/landscape/raw/master/hosted_logos/"

[[peers]]
name = "aswf-landscape"
file = "../aswf-landscape/landscape.yml"
member_categories = ["Members"]

[logos]
hosted_dir = "hosted_logos"
"#;

    #[test]
    fn parse_minimal_uses_defaults() {
        let config = RunConfig::from_toml(MINIMAL).unwrap();
        assert_eq!(config.member_category, "LF Member Company");
        assert!(config.skip_test_records);
        assert!(config.peers.is_empty());
        assert!(config.webpage.is_none());
        assert!(config.company_db.is_none());
    }

    #[test]
    fn parse_full() {
        let config = RunConfig::from_toml(FULL).unwrap();
        assert_eq!(config.member_category, "Member Company");
        assert!(!config.skip_test_records);
        assert_eq!(config.peers.len(), 2);
        assert_eq!(config.peers[0].member_categories.len(), 3);
        assert_eq!(config.peers[1].member_categories, vec!["Members"]);
        assert_eq!(config.webpage.as_ref().unwrap().selector, DEFAULT_MEMBER_SELECTOR);
        assert_eq!(config.logos.as_ref().unwrap().hosted_dir, "hosted_logos");
    }

    #[test]
    fn tier_map_defaults_and_overrides() {
        let config = RunConfig::from_toml(FULL).unwrap();
        let tiers = config.tier_map();
        assert_eq!(tiers.tier_for("Gold Membership"), Some(MembershipTier::Gold));
        assert_eq!(tiers.tier_for("silver membership - mpsf"), Some(MembershipTier::Silver));
        assert_eq!(tiers.tier_for("Diamond Membership"), Some(MembershipTier::Platinum));
        assert_eq!(tiers.tier_for("Bronze Membership"), None);
    }

    #[test]
    fn reject_missing_required_field() {
        let err = RunConfig::from_toml("name = \"x\"\nroster = \"r.csv\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn reject_empty_roster() {
        let input = MINIMAL.replace("sfdcexport.csv", "");
        let err = RunConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("'roster' must not be empty"));
    }

    #[test]
    fn reject_duplicate_peer() {
        let input = format!(
            "{MINIMAL}\n[[peers]]\nname = \"a\"\nfile = \"a.yml\"\n\n[[peers]]\nname = \"a\"\nfile = \"b.yml\"\n"
        );
        let err = RunConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("duplicate peer 'a'"));
    }

    #[test]
    fn reject_bad_webpage_url() {
        let input = format!("{MINIMAL}\n[webpage]\nurl = \"ftp://example.com\"\n");
        assert!(RunConfig::from_toml(&input).is_err());
        let input = format!("{MINIMAL}\n[webpage]\nurl = \"not a url\"\n");
        assert!(RunConfig::from_toml(&input).is_err());
    }

    #[test]
    fn reject_unknown_tier_and_keys() {
        let input = format!("{MINIMAL}\n[tiers]\n\"Gold Membership\" = \"diamond\"\n");
        assert!(matches!(RunConfig::from_toml(&input), Err(ConfigError::Parse(_))));
        let input = format!("{MINIMAL}\nroster_file = \"x\"\n");
        assert!(matches!(RunConfig::from_toml(&input), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn resolve_relative_to_config() {
        let p = resolve_path(Path::new("/etc/lf/run.toml"), "landscape.yml");
        assert_eq!(p, PathBuf::from("/etc/lf/landscape.yml"));
        let p = resolve_path(Path::new("run.toml"), "landscape.yml");
        assert_eq!(p, PathBuf::from("landscape.yml"));
    }
}
