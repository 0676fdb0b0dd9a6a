//! The landscape document: a YAML `landscape:` sequence of categories, one
//! of which holds the membership tier buckets.
//!
//! Only the `items` of the member category's subcategories are ever
//! changed. Queries run on the parsed [`Value`]; every change is also
//! spliced into the loaded text, which is what gets written back, so lines
//! the engine did not touch stay byte for byte as they were.

use serde_yaml::{Mapping, Sequence, Value};
use tracing::{debug, warn};

use crate::error::DirectoryError;
use crate::layout::{SourceText, Unplaced};
use crate::model::{CompanyDbRef, MembershipTier, OrganizationRecord};
use crate::normalize::names_match;

pub const DEFAULT_MEMBER_CATEGORY: &str = "LF Member Company";

pub const KEY_NAME: &str = "name";
pub const KEY_LOGO: &str = "logo";
pub const KEY_HOMEPAGE: &str = "homepage_url";
pub const KEY_COMPANY_DB: &str = "crunchbase";
const KEY_ITEM: &str = "item";
const KEY_ITEMS: &str = "items";
const KEY_SUBCATEGORY: &str = "subcategory";
const KEY_SUBCATEGORIES: &str = "subcategories";
const KEY_LANDSCAPE: &str = "landscape";

/// Position of an entry: subcategory index, then item index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryRef {
    pub bucket: usize,
    pub item: usize,
}

#[derive(Debug, Clone)]
pub struct Directory {
    doc: Value,
    category: usize,
    member_category: String,
    text: SourceText,
    modified: bool,
    /// An edit could not be placed in the text; write the model instead.
    text_lost: bool,
}

impl Directory {
    pub fn from_yaml_str(input: &str, member_category: &str) -> Result<Self, DirectoryError> {
        let doc: Value = serde_yaml::from_str(input).map_err(|e| DirectoryError::Yaml(e.to_string()))?;
        let categories = doc
            .get(KEY_LANDSCAPE)
            .and_then(Value::as_sequence)
            .ok_or(DirectoryError::NoLandscape)?;
        let category = categories
            .iter()
            .position(|c| {
                c.get(KEY_NAME).and_then(Value::as_str) == Some(member_category)
                    && c.get(KEY_SUBCATEGORIES).map_or(false, Value::is_sequence)
            })
            .ok_or_else(|| DirectoryError::NoMemberCategory(member_category.to_string()))?;
        Ok(Self {
            doc,
            category,
            member_category: member_category.to_string(),
            text: SourceText::new(input),
            modified: false,
            text_lost: false,
        })
    }

    /// The document text: the input as loaded plus spliced edits. Falls
    /// back to serializing the parsed document when the edited text does
    /// not read back as that document.
    pub fn to_yaml_string(&self) -> Result<String, DirectoryError> {
        if !self.modified {
            return Ok(self.text.render());
        }
        if !self.text_lost {
            let text = self.text.render();
            match serde_yaml::from_str::<Value>(&text) {
                Ok(reread) if reread == self.doc => return Ok(text),
                _ => warn!("edited directory text does not match the document, writing it re-serialized"),
            }
        }
        serde_yaml::to_string(&self.doc).map_err(|e| DirectoryError::Serialize(e.to_string()))
    }

    /// Whether any entry was added or filled since loading.
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    fn splice(&mut self, edit: impl FnOnce(&mut SourceText, &str) -> Result<(), Unplaced>) {
        self.modified = true;
        if self.text_lost {
            return;
        }
        if let Err(err) = edit(&mut self.text, &self.member_category) {
            warn!(reason = %err, "cannot place edit in the directory text, it will be re-serialized");
            self.text_lost = true;
        }
    }

    fn buckets(&self) -> &[Value] {
        self.doc
            .get(KEY_LANDSCAPE)
            .and_then(|l| l.get(self.category))
            .and_then(|c| c.get(KEY_SUBCATEGORIES))
            .and_then(Value::as_sequence)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn buckets_mut(&mut self) -> Option<&mut Sequence> {
        self.doc
            .get_mut(KEY_LANDSCAPE)?
            .get_mut(self.category)?
            .get_mut(KEY_SUBCATEGORIES)?
            .as_sequence_mut()
    }

    fn items(bucket: &Value) -> &[Value] {
        bucket
            .get(KEY_ITEMS)
            .and_then(Value::as_sequence)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every member entry with its position.
    pub fn entries(&self) -> impl Iterator<Item = (EntryRef, &Mapping)> {
        self.buckets().iter().enumerate().flat_map(|(b, bucket)| {
            Self::items(bucket).iter().enumerate().filter_map(move |(i, item)| {
                item.as_mapping().map(|m| (EntryRef { bucket: b, item: i }, m))
            })
        })
    }

    pub fn entry_count(&self) -> usize {
        self.entries().count()
    }

    fn entry(&self, at: EntryRef) -> Option<&Mapping> {
        Self::items(self.buckets().get(at.bucket)?).get(at.item)?.as_mapping()
    }

    fn entry_mut(&mut self, at: EntryRef) -> Option<&mut Mapping> {
        self.buckets_mut()?
            .get_mut(at.bucket)?
            .get_mut(KEY_ITEMS)?
            .get_mut(at.item)?
            .as_mapping_mut()
    }

    /// Tier of the bucket an entry sits in, if the bucket is a known tier.
    pub fn bucket_tier(&self, bucket: usize) -> Option<MembershipTier> {
        self.buckets()
            .get(bucket)?
            .get(KEY_NAME)
            .and_then(Value::as_str)
            .and_then(MembershipTier::from_bucket_name)
    }

    /// An existing entry for this organization: by normalized name first,
    /// then by company-database reference.
    pub fn find_existing(&self, name: &str, company_db: Option<&CompanyDbRef>) -> Option<EntryRef> {
        let by_name = self.entries().find(|(_, m)| {
            scalar(m, KEY_NAME).map_or(false, |existing| names_match(existing, name))
        });
        if let Some((at, _)) = by_name {
            return Some(at);
        }
        let db = company_db?;
        self.entries()
            .find(|(_, m)| scalar(m, KEY_COMPANY_DB).map(str::trim) == Some(db.as_str()))
            .map(|(at, _)| at)
    }

    /// Parse an entry into a record. Invalid field values are left unset.
    pub fn entry_record(&self, at: EntryRef) -> Option<OrganizationRecord> {
        let entry = self.entry(at)?;
        let mut record = OrganizationRecord::new(scalar(entry, KEY_NAME)?).ok()?;
        record_from_mapping(&mut record, entry);
        if let Some(tier) = self.bucket_tier(at.bucket) {
            record.set_tier(tier);
        }
        Some(record)
    }

    /// Required fields without a valid value on an entry. An invalid value
    /// counts as missing even though [`Directory::fill_missing`] keeps it.
    pub fn entry_missing_fields(&self, at: EntryRef) -> Vec<&'static str> {
        match self.entry_record(at) {
            Some(record) => record.missing_fields(),
            None => self.blank_fields(at),
        }
    }

    /// Required keys that are absent or empty on an entry.
    pub fn blank_fields(&self, at: EntryRef) -> Vec<&'static str> {
        self.entry(at)
            .map(|entry| {
                [KEY_HOMEPAGE, KEY_LOGO, KEY_COMPANY_DB]
                    .into_iter()
                    .filter(|key| is_blank(entry.get(*key)))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Write the record's values into keys the entry lacks. Keys that are
    /// present, valid or not, are never touched. Returns the keys added.
    pub fn fill_missing(&mut self, at: EntryRef, record: &OrganizationRecord) -> Vec<String> {
        let Some(entry) = self.entry_mut(at) else {
            return Vec::new();
        };
        let mut filled = Vec::new();
        for (key, value) in record_fields(record) {
            if is_blank(entry.get(key.as_str())) {
                entry.insert(Value::String(key.clone()), Value::String(value.clone()));
                filled.push((key, value));
            }
        }
        for (key, value) in &filled {
            self.splice(|text, category| text.fill(category, at.bucket, at.item, key, value));
        }
        filled.into_iter().map(|(key, _)| key).collect()
    }

    /// Append a record to its tier's bucket under its normalized name,
    /// creating the bucket if the category does not have one yet.
    pub fn append(&mut self, tier: MembershipTier, record: &OrganizationRecord) -> Option<EntryRef> {
        let buckets = self.buckets_mut()?;
        let bucket = match buckets.iter().position(|b| {
            b.get(KEY_NAME)
                .and_then(Value::as_str)
                .and_then(MembershipTier::from_bucket_name)
                == Some(tier)
        }) {
            Some(b) => b,
            None => {
                debug!(bucket = tier.bucket_name(), "creating missing tier bucket");
                let mut sub = Mapping::new();
                sub.insert(KEY_SUBCATEGORY.into(), Value::Null);
                sub.insert(KEY_NAME.into(), tier.bucket_name().into());
                sub.insert(KEY_ITEMS.into(), Value::Sequence(Sequence::new()));
                buckets.push(Value::Mapping(sub));
                buckets.len() - 1
            }
        };

        let sub = buckets.get_mut(bucket)?.as_mapping_mut()?;
        if !sub.get(KEY_ITEMS).map_or(false, Value::is_sequence) {
            sub.insert(KEY_ITEMS.into(), Value::Sequence(Sequence::new()));
        }
        let items = sub.get_mut(KEY_ITEMS)?.as_sequence_mut()?;

        let mut fields = vec![
            (KEY_ITEM.to_string(), None),
            (KEY_NAME.to_string(), Some(record.normalized_name())),
        ];
        fields.extend(record_fields(record).into_iter().map(|(key, value)| (key, Some(value))));

        let mut entry = Mapping::new();
        for (key, value) in &fields {
            let value = value.clone().map_or(Value::Null, Value::String);
            entry.insert(Value::String(key.clone()), value);
        }
        items.push(Value::Mapping(entry));
        let at = EntryRef {
            bucket,
            item: items.len() - 1,
        };

        self.splice(|text, category| text.append(category, bucket, tier.bucket_name(), &fields));
        Some(at)
    }
}

/// Directory keys and values of a record, in the order entries are written.
fn record_fields(record: &OrganizationRecord) -> Vec<(String, String)> {
    let mut fields = Vec::new();
    if let Some(logo) = record.logo() {
        fields.push((KEY_LOGO.to_string(), logo.as_str().to_string()));
    }
    if let Some(website) = record.website() {
        fields.push((KEY_HOMEPAGE.to_string(), website.url().to_string()));
    }
    if let Some(db) = record.company_db() {
        fields.push((KEY_COMPANY_DB.to_string(), db.as_str().to_string()));
    }
    for (key, value) in record.extra() {
        fields.push((key.clone(), value.clone()));
    }
    fields
}

/// Populate a record's fields from a directory-style mapping. Used for
/// existing entries and for peer directories.
pub fn record_from_mapping(record: &mut OrganizationRecord, entry: &Mapping) {
    if let Some(raw) = scalar(entry, KEY_HOMEPAGE) {
        if let Err(err) = record.set_website(raw) {
            debug!(name = record.name(), error = %err, "ignoring homepage_url");
        }
    }
    if let Some(raw) = scalar(entry, KEY_LOGO) {
        if let Err(err) = record.set_logo(raw) {
            debug!(name = record.name(), error = %err, "ignoring logo");
        }
    }
    if let Some(raw) = scalar(entry, KEY_COMPANY_DB) {
        if let Err(err) = record.set_company_db(raw) {
            debug!(name = record.name(), error = %err, "ignoring crunchbase");
        }
    }
    for (key, value) in entry {
        let Some(key) = key.as_str() else { continue };
        if matches!(key, KEY_ITEM | KEY_NAME | KEY_LOGO | KEY_HOMEPAGE | KEY_COMPANY_DB) {
            continue;
        }
        if let Some(text) = scalar_text(value) {
            record.insert_extra(key, text);
        }
    }
}

/// A non-empty string value under `key`.
pub fn scalar<'a>(entry: &'a Mapping, key: &str) -> Option<&'a str> {
    entry
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"
landscape:
  - category:
    name: Projects
    subcategories:
      - subcategory:
        name: Hosted
        items:
          - item:
            name: Kubernetes
            homepage_url: https://kubernetes.io
  - category:
    name: LF Member Company
    subcategories:
      - subcategory:
        name: Platinum
        items:
          - item:
            name: Acme, Inc.
            homepage_url: https://acme.com
            logo: acme.svg
            crunchbase: https://www.crunchbase.com/organization/acme
            twitter: https://twitter.com/acme
      - subcategory:
        name: Gold
        items:
          - item:
            name: Widgets
            homepage_url: https://widgets.io
            logo: ''
"#;

    fn dir() -> Directory {
        Directory::from_yaml_str(DOC, DEFAULT_MEMBER_CATEGORY).unwrap()
    }

    #[test]
    fn load_requires_member_category() {
        assert!(matches!(
            Directory::from_yaml_str(DOC, "Nope"),
            Err(DirectoryError::NoMemberCategory(_))
        ));
        assert!(matches!(
            Directory::from_yaml_str("foo: 1", DEFAULT_MEMBER_CATEGORY),
            Err(DirectoryError::NoLandscape)
        ));
        assert!(matches!(
            Directory::from_yaml_str("landscape: [unclosed", DEFAULT_MEMBER_CATEGORY),
            Err(DirectoryError::Yaml(_))
        ));
    }

    #[test]
    fn entries_only_cover_member_category() {
        let d = dir();
        assert_eq!(d.entry_count(), 2);
        assert!(d.find_existing("Kubernetes", None).is_none());
    }

    #[test]
    fn find_existing_by_name_or_company_db() {
        let d = dir();
        assert_eq!(d.find_existing("ACME", None), Some(EntryRef { bucket: 0, item: 0 }));
        let db = CompanyDbRef::parse("https://www.crunchbase.com/organization/acme").unwrap();
        assert_eq!(
            d.find_existing("Acme Holdings", Some(&db)),
            Some(EntryRef { bucket: 0, item: 0 })
        );
        assert_eq!(d.find_existing("Acme Holdings", None), None);
    }

    #[test]
    fn entry_record_parses_fields_and_tier() {
        let d = dir();
        let r = d.entry_record(EntryRef { bucket: 0, item: 0 }).unwrap();
        assert_eq!(r.name(), "Acme, Inc.");
        assert!(r.is_directory_eligible());
        assert_eq!(r.tier(), Some(MembershipTier::Platinum));
        assert_eq!(r.extra()["twitter"], "https://twitter.com/acme");
    }

    #[test]
    fn fill_missing_only_adds_blank_keys() {
        let mut d = dir();
        let at = EntryRef { bucket: 1, item: 0 };
        assert_eq!(d.entry_missing_fields(at), vec![KEY_LOGO, KEY_COMPANY_DB]);

        let mut r = OrganizationRecord::new("Widgets").unwrap();
        r.set_website("https://other.io").unwrap();
        r.set_logo("widgets.svg").unwrap();
        r.set_company_db("https://www.crunchbase.com/organization/widgets").unwrap();
        let filled = d.fill_missing(at, &r);
        assert_eq!(filled, vec![KEY_LOGO.to_string(), KEY_COMPANY_DB.to_string()]);

        let after = d.entry_record(at).unwrap();
        assert_eq!(after.website().unwrap().domain(), "widgets.io");
        assert!(d.entry_missing_fields(at).is_empty());
    }

    #[test]
    fn append_goes_to_tier_bucket_and_creates_missing_ones() {
        let mut d = dir();
        let mut r = OrganizationRecord::new("Newco").unwrap();
        r.set_website("newco.com").unwrap();
        let at = d.append(MembershipTier::Gold, &r).unwrap();
        assert_eq!(at, EntryRef { bucket: 1, item: 1 });

        let at = d.append(MembershipTier::Silver, &r).unwrap();
        assert_eq!(at.bucket, 2);
        assert_eq!(d.bucket_tier(2), Some(MembershipTier::Silver));
        assert_eq!(d.entry_count(), 4);
    }

    #[test]
    fn unmodified_directory_writes_input_verbatim() {
        let d = dir();
        assert!(!d.is_modified());
        assert_eq!(d.to_yaml_string().unwrap(), DOC);
    }

    #[test]
    fn filled_keys_are_spliced_in_place() {
        let mut d = dir();
        let mut r = OrganizationRecord::new("Widgets").unwrap();
        r.set_logo("widgets.svg").unwrap();
        r.set_company_db("https://www.crunchbase.com/organization/widgets").unwrap();
        d.fill_missing(EntryRef { bucket: 1, item: 0 }, &r);
        assert!(d.is_modified());

        let expected = DOC.replace(
            "            logo: ''\n",
            "            logo: widgets.svg\n            crunchbase: https://www.crunchbase.com/organization/widgets\n",
        );
        assert_eq!(d.to_yaml_string().unwrap(), expected);
    }

    #[test]
    fn appended_entries_follow_surrounding_indentation() {
        let mut d = dir();
        let r = OrganizationRecord::new("Newco").unwrap();
        d.append(MembershipTier::Platinum, &r).unwrap();
        d.append(MembershipTier::Silver, &r).unwrap();

        let expected = DOC
            .replace(
                "            twitter: https://twitter.com/acme\n",
                "            twitter: https://twitter.com/acme\n          - item:\n            name: Newco\n",
            )
            .replace(
                "            logo: ''\n",
                "            logo: ''\n      - subcategory:\n        name: Silver\n        items:\n          - item:\n            name: Newco\n",
            );
        assert_eq!(d.to_yaml_string().unwrap(), expected);
    }

    #[test]
    fn unplaceable_edit_falls_back_to_reserialized_document() {
        let flow = "landscape:\n- category:\n  name: LF Member Company\n  subcategories: [{subcategory: null, name: Gold, items: []}]\n";
        let mut d = Directory::from_yaml_str(flow, DEFAULT_MEMBER_CATEGORY).unwrap();
        let r = OrganizationRecord::new("Newco").unwrap();
        d.append(MembershipTier::Gold, &r).unwrap();

        let out = d.to_yaml_string().unwrap();
        let reloaded: Value = serde_yaml::from_str(&out).unwrap();
        assert_eq!(
            reloaded["landscape"][0]["subcategories"][0]["items"][0]["name"],
            "Newco"
        );
    }
}
