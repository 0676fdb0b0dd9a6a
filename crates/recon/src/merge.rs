use crate::model::OrganizationRecord;
use crate::source::CompanyDbLookup;

/// Combine an authoritative record with its matched candidate.
///
/// Per field: the authoritative value if present, else the candidate's, and
/// for the company-database reference a name lookup as the last resort.
/// The tier only ever comes from the authoritative record. Extra fields are
/// unioned, authoritative winning on key collisions.
///
/// Inputs are never mutated, so merging again with the same candidate gives
/// the same record.
pub fn merge(
    authoritative: &OrganizationRecord,
    matched: Option<&OrganizationRecord>,
    company_db: &dyn CompanyDbLookup,
) -> OrganizationRecord {
    let website = authoritative
        .website()
        .or_else(|| matched.and_then(OrganizationRecord::website))
        .cloned();
    let logo = authoritative
        .logo()
        .or_else(|| matched.and_then(OrganizationRecord::logo))
        .cloned();
    let company_db_ref = authoritative
        .company_db()
        .or_else(|| matched.and_then(OrganizationRecord::company_db))
        .cloned()
        .or_else(|| company_db.lookup(authoritative.name()));

    let mut extra = matched.map(|m| m.extra().clone()).unwrap_or_default();
    extra.extend(authoritative.extra().iter().map(|(k, v)| (k.clone(), v.clone())));

    authoritative.clone().with_fields(
        website,
        logo,
        company_db_ref,
        authoritative.tier(),
        extra,
    )
}
