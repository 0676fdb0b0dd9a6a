use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::FieldError;
use crate::normalize::{canonical_url, normalize_name, normalize_url};

/// Every company-database reference starts with this.
pub const COMPANY_DB_ORG_PREFIX: &str = "https://www.crunchbase.com/organization/";

/// File extension a logo must carry.
pub const LOGO_EXTENSION: &str = ".svg";

// ---------------------------------------------------------------------------
// Validated fields
// ---------------------------------------------------------------------------

/// A website that reduces to a registrable domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Website {
    url: String,
    domain: String,
}

impl Website {
    pub fn parse(raw: &str) -> Result<Self, FieldError> {
        match (canonical_url(raw), normalize_url(raw)) {
            (Some(url), Some(domain)) => Ok(Self { url, domain }),
            _ => Err(FieldError::Website(raw.to_string())),
        }
    }

    /// Canonical URL, as written to `homepage_url`.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Registrable domain, the comparison key.
    pub fn domain(&self) -> &str {
        &self.domain
    }
}

/// A reference to a vector-image logo (local file name or remote URL).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct LogoRef(String);

impl LogoRef {
    pub fn parse(raw: &str) -> Result<Self, FieldError> {
        let raw = raw.trim();
        let path = raw.split(&['?', '#'][..]).next().unwrap_or_default();
        if path.to_ascii_lowercase().ends_with(LOGO_EXTENSION) && path.len() > LOGO_EXTENSION.len() {
            Ok(Self(raw.to_string()))
        } else {
            Err(FieldError::Logo(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_remote(&self) -> bool {
        self.0.starts_with("http://") || self.0.starts_with("https://")
    }
}

/// A canonical company-database organization URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct CompanyDbRef(String);

impl CompanyDbRef {
    pub fn parse(raw: &str) -> Result<Self, FieldError> {
        let raw = raw.trim();
        match raw.strip_prefix(COMPANY_DB_ORG_PREFIX) {
            Some(slug) if !slug.is_empty() && !slug.contains(char::is_whitespace) => {
                Ok(Self(raw.to_string()))
            }
            _ => Err(FieldError::CompanyDb(raw.to_string())),
        }
    }

    /// Build from a bare organization permalink (`acme-corp`).
    pub fn from_permalink(permalink: &str) -> Result<Self, FieldError> {
        Self::parse(&format!("{COMPANY_DB_ORG_PREFIX}{}", permalink.trim()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Membership tier
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipTier {
    Associate,
    Gold,
    Platinum,
    Silver,
}

impl MembershipTier {
    pub const ALL: [MembershipTier; 4] = [Self::Associate, Self::Gold, Self::Platinum, Self::Silver];

    /// Subcategory name of this tier's bucket in the directory.
    pub fn bucket_name(&self) -> &'static str {
        match self {
            Self::Associate => "Associate",
            Self::Gold => "Gold",
            Self::Platinum => "Platinum",
            Self::Silver => "Silver",
        }
    }

    pub fn from_bucket_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.bucket_name().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Display for MembershipTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.bucket_name())
    }
}

// ---------------------------------------------------------------------------
// OrganizationRecord
// ---------------------------------------------------------------------------

/// The unit of reconciliation.
///
/// Required fields are only ever assigned through validating setters, so a
/// present field is always a valid one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrganizationRecord {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    website: Option<Website>,
    #[serde(skip_serializing_if = "Option::is_none")]
    logo: Option<LogoRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    company_db: Option<CompanyDbRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tier: Option<MembershipTier>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    extra: BTreeMap<String, String>,
}

impl OrganizationRecord {
    pub fn new(name: &str) -> Result<Self, FieldError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(FieldError::EmptyName);
        }
        Ok(Self {
            name: name.to_string(),
            website: None,
            logo: None,
            company_db: None,
            tier: None,
            extra: BTreeMap::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn normalized_name(&self) -> String {
        normalize_name(&self.name)
    }

    pub fn website(&self) -> Option<&Website> {
        self.website.as_ref()
    }

    pub fn logo(&self) -> Option<&LogoRef> {
        self.logo.as_ref()
    }

    pub fn company_db(&self) -> Option<&CompanyDbRef> {
        self.company_db.as_ref()
    }

    pub fn tier(&self) -> Option<MembershipTier> {
        self.tier
    }

    pub fn extra(&self) -> &BTreeMap<String, String> {
        &self.extra
    }

    pub fn set_website(&mut self, raw: &str) -> Result<(), FieldError> {
        self.website = Some(Website::parse(raw)?);
        Ok(())
    }

    pub fn set_logo(&mut self, raw: &str) -> Result<(), FieldError> {
        self.logo = Some(LogoRef::parse(raw)?);
        Ok(())
    }

    pub fn set_company_db(&mut self, raw: &str) -> Result<(), FieldError> {
        self.company_db = Some(CompanyDbRef::parse(raw)?);
        Ok(())
    }

    pub fn set_tier(&mut self, tier: MembershipTier) {
        self.tier = Some(tier);
    }

    pub fn insert_extra(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.extra.insert(key.into(), value.into());
    }

    pub(crate) fn with_fields(
        mut self,
        website: Option<Website>,
        logo: Option<LogoRef>,
        company_db: Option<CompanyDbRef>,
        tier: Option<MembershipTier>,
        extra: BTreeMap<String, String>,
    ) -> Self {
        self.website = website;
        self.logo = logo;
        self.company_db = company_db;
        self.tier = tier;
        self.extra = extra;
        self
    }

    pub(crate) fn replace_logo(&mut self, logo: LogoRef) {
        self.logo = Some(logo);
    }

    /// All required fields present (and therefore valid).
    pub fn is_directory_eligible(&self) -> bool {
        !self.name.is_empty()
            && self.website.is_some()
            && self.logo.is_some()
            && self.company_db.is_some()
    }

    /// Directory keys of the required fields that are still unset.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.website.is_none() {
            missing.push("homepage_url");
        }
        if self.logo.is_none() {
            missing.push("logo");
        }
        if self.company_db.is_none() {
            missing.push("crunchbase");
        }
        missing
    }
}
