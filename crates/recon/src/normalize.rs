//! Canonical comparison keys for organization names and websites.
//!
//! Names are reduced by stripping legal-entity suffixes and parenthetical
//! annotations; websites are reduced to their registrable domain. Both
//! functions are pure and idempotent.

use url::{Host, Url};

/// Legal-entity suffixes, stripped case-insensitively from the end of a name.
///
/// Order matters: a suffix that contains another one (", Ltd" contains
/// " Ltd") must come first, otherwise the shorter one leaves a dangling comma.
const ENTITY_SUFFIXES: &[&str] = &[
    ", Inc.",
    ",Inc.",
    " Inc.",
    " Inc",
    ", Ltd.",
    ", Ltd",
    " Ltd.",
    " Ltd",
    " GmbH",
    ", LLC",
    " LLC",
    " AB",
    " s.r.o.",
    " a.s.",
];

/// Characters trimmed from the end of a name once suffixes are gone.
const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '-'];

/// Public suffixes made of more than one label. Anything not listed here is
/// treated as a single-label suffix (`com`, `io`, `de`, ...).
const MULTI_LABEL_SUFFIXES: &[&str] = &[
    "ac.jp", "ac.uk", "co.at", "co.id", "co.il", "co.in", "co.jp", "co.kr", "co.nz", "co.th",
    "co.uk", "co.za", "com.ar", "com.au", "com.br", "com.cn", "com.co", "com.hk", "com.mx",
    "com.my", "com.pl", "com.sg", "com.tr", "com.tw", "com.ua", "gov.uk", "ltd.uk", "ne.jp",
    "net.au", "net.cn", "or.jp", "org.au", "org.br", "org.cn", "org.in", "org.uk", "plc.uk",
];

/// Default scheme for inputs like `acme.com`.
const DEFAULT_SCHEME: &str = "https";

/// Reduce an organization name to its comparison key.
///
/// The key keeps its original casing; compare keys with [`names_match`].
pub fn normalize_name(raw: &str) -> String {
    let mut current = raw.trim().to_string();
    loop {
        let next = strip_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Case-insensitive equality of normalized names. Empty keys never match.
pub fn names_match(a: &str, b: &str) -> bool {
    let a = normalize_name(a);
    let b = normalize_name(b);
    !a.is_empty() && a.to_lowercase() == b.to_lowercase()
}

/// Lowercased normalized name, for use as a map key.
pub fn name_key(raw: &str) -> String {
    normalize_name(raw).to_lowercase()
}

fn strip_once(name: &str) -> String {
    let mut s = strip_parentheticals(name);
    for suffix in ENTITY_SUFFIXES {
        if let Some(stripped) = strip_suffix_ignore_case(&s, suffix) {
            s = stripped.to_string();
        }
    }
    s.trim_end_matches(|c: char| c.is_whitespace() || TRAILING_PUNCTUATION.contains(&c))
        .trim_start()
        .to_string()
}

fn strip_suffix_ignore_case<'a>(s: &'a str, suffix: &str) -> Option<&'a str> {
    let cut = s.len().checked_sub(suffix.len())?;
    if !s.is_char_boundary(cut) {
        return None;
    }
    let (head, tail) = s.split_at(cut);
    tail.eq_ignore_ascii_case(suffix).then_some(head)
}

/// Remove innermost `(...)` groups together with the whitespace before them.
/// Nested groups fall away over successive passes of [`normalize_name`].
fn strip_parentheticals(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut rest = name;
    while let Some(open) = rest.find('(') {
        let after_open = &rest[open + 1..];
        match (after_open.find(')'), after_open.find('(')) {
            (Some(close), nested) if nested.map_or(true, |n| n > close) => {
                out.push_str(rest[..open].trim_end());
                rest = &after_open[close + 1..];
            }
            (Some(_), Some(nested)) => {
                // Another '(' opens before this one closes: keep this one for now.
                out.push_str(&rest[..open + 1 + nested]);
                rest = &after_open[nested..];
            }
            _ => break,
        }
    }
    out.push_str(rest);
    out
}

/// Parse a loosely-written website into a URL, adding a scheme when missing.
fn parse_loose(raw: &str) -> Option<Url> {
    let raw = raw.trim();
    if raw.is_empty() || raw.chars().any(char::is_whitespace) {
        return None;
    }
    let url = if raw.contains("://") {
        Url::parse(raw).ok()?
    } else {
        Url::parse(&format!("{DEFAULT_SCHEME}://{raw}")).ok()?
    };
    matches!(url.scheme(), "http" | "https").then_some(url)
}

fn registrable_domain_of(url: &Url) -> Option<String> {
    let domain = match url.host()? {
        Host::Domain(d) => d.trim_end_matches('.').to_lowercase(),
        Host::Ipv4(_) | Host::Ipv6(_) => return None,
    };
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|l| l.is_empty()) {
        return None;
    }
    let tld = labels[labels.len() - 1];
    if !tld.chars().all(|c| c.is_ascii_alphabetic()) && !tld.starts_with("xn--") {
        return None;
    }

    let last_two = labels[labels.len() - 2..].join(".");
    let take = if MULTI_LABEL_SUFFIXES.contains(&last_two.as_str()) { 3 } else { 2 };
    if labels.len() < take {
        return None;
    }
    Some(labels[labels.len() - take..].join("."))
}

/// Reduce a website to its registrable domain (`https://www.Example.com/about`
/// and `example.com` both give `example.com`). `None` means the input cannot
/// be compared by URL.
pub fn normalize_url(raw: &str) -> Option<String> {
    registrable_domain_of(&parse_loose(raw)?)
}

/// Canonical URL form for a website: scheme added, host lowercased.
/// Only defined for inputs that also have a registrable domain.
pub fn canonical_url(raw: &str) -> Option<String> {
    let url = parse_loose(raw)?;
    registrable_domain_of(&url)?;
    Some(url.to_string())
}
