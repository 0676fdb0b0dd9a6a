//! Line layout of the member category inside the original document text.
//!
//! Landscapes are hand-maintained block YAML. Edits are spliced into the
//! loaded lines so comments, quoting and indentation survive everywhere
//! the engine does not write. Only block mappings and block sequences are
//! located; any other shape inside the member category is reported as
//! [`Unplaced`] and the caller re-emits the whole document instead.

use std::fmt;

use serde_yaml::Value;

/// An edit that could not be located in the text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unplaced(pub String);

impl fmt::Display for Unplaced {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Inclusive range of significant lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Span {
    first: usize,
    last: usize,
}

/// A `key: value` line of a block mapping.
#[derive(Debug, Clone)]
struct KeyLine {
    idx: usize,
    col: usize,
    key: String,
    /// Byte offset just past the `:`.
    value_at: usize,
    /// Value on the key's own line, comment stripped.
    inline: String,
}

/// One `- ` entry of a block sequence.
#[derive(Debug, Clone, Copy)]
struct SeqItem {
    span: Span,
    dash_col: usize,
    key_col: usize,
}

#[derive(Debug)]
struct Bucket {
    item: SeqItem,
    items: Option<(KeyLine, Option<Span>)>,
    entries: Vec<SeqItem>,
}

#[derive(Debug)]
struct MemberCategory {
    subcategories: KeyLine,
    block: Option<Span>,
    buckets: Vec<Bucket>,
    /// Sequences sit at their parent key's column (`key:\n- a`).
    compact: bool,
}

/// The document text as loaded, split on `\n`. A line keeps its `\r`, so
/// joining the lines back gives the input byte for byte.
#[derive(Debug, Clone)]
pub struct SourceText {
    lines: Vec<String>,
    crlf: bool,
}

impl SourceText {
    pub fn new(input: &str) -> Self {
        Self {
            lines: input.split('\n').map(str::to_string).collect(),
            crlf: input.contains("\r\n"),
        }
    }

    pub fn render(&self) -> String {
        self.lines.join("\n")
    }

    /// Set `key` on an entry: an existing blank key gets the value on its
    /// own line, otherwise a new line is added after the entry's last line.
    pub fn fill(&mut self, category: &str, bucket: usize, item: usize, key: &str, value: &str) -> Result<(), Unplaced> {
        let layout = self.member_category(category)?;
        let entry = layout
            .buckets
            .get(bucket)
            .and_then(|b| b.entries.get(item))
            .copied()
            .ok_or_else(|| Unplaced(format!("entry {bucket}/{item} not found in text")))?;

        match self.keys(entry.span, entry.key_col).into_iter().find(|k| k.key == key) {
            Some(existing) => {
                let head = self.view(existing.idx)[..existing.value_at].to_string();
                self.set_line(existing.idx, format!("{head} {}", yaml_scalar(value)));
            }
            None => {
                let line = format!("{}{}: {}", pad(entry.key_col), yaml_scalar(key), yaml_scalar(value));
                self.insert(entry.span.last + 1, vec![line]);
            }
        }
        Ok(())
    }

    /// Add an entry at the end of a bucket. `bucket` one past the last
    /// existing bucket creates it under `bucket_name`.
    pub fn append(
        &mut self,
        category: &str,
        bucket: usize,
        bucket_name: &str,
        fields: &[(String, Option<String>)],
    ) -> Result<(), Unplaced> {
        let layout = self.member_category(category)?;
        let nested = |col: usize| if layout.compact { col } else { col + 2 };

        if let Some(b) = layout.buckets.get(bucket) {
            match &b.items {
                Some((_, Some(_))) => {
                    let (first, last) = match (b.entries.first(), b.entries.last()) {
                        (Some(first), Some(last)) => (*first, *last),
                        _ => return Err(Unplaced(format!("bucket '{bucket_name}' items are not a block sequence"))),
                    };
                    self.insert(last.span.last + 1, render_mapping(first.dash_col, first.key_col, fields));
                }
                Some((key, None)) => {
                    if !is_empty_inline(&key.inline) {
                        return Err(Unplaced(format!("bucket '{bucket_name}' has inline items")));
                    }
                    let head = self.view(key.idx)[..key.value_at].to_string();
                    self.set_line(key.idx, head);
                    let dash = nested(key.col);
                    self.insert(key.idx + 1, render_mapping(dash, dash + 2, fields));
                }
                None => {
                    let col = b.item.key_col;
                    let dash = nested(col);
                    let mut lines = vec![format!("{}items:", pad(col))];
                    lines.extend(render_mapping(dash, dash + 2, fields));
                    self.insert(b.item.span.last + 1, lines);
                }
            }
            return Ok(());
        }

        if bucket != layout.buckets.len() {
            return Err(Unplaced(format!("bucket {bucket} not found in text")));
        }
        let (dash, key_col, at) = match (layout.buckets.first(), layout.block) {
            (Some(first), Some(block)) => (first.item.dash_col, first.item.key_col, block.last + 1),
            (None, None) => {
                let key = &layout.subcategories;
                if !is_empty_inline(&key.inline) {
                    return Err(Unplaced("member category has inline subcategories".into()));
                }
                let head = self.view(key.idx)[..key.value_at].to_string();
                let at = key.idx + 1;
                let dash = nested(key.col);
                self.set_line(key.idx, head);
                (dash, dash + 2, at)
            }
            _ => return Err(Unplaced("member category subcategories are not a block sequence".into())),
        };
        let header = [
            ("subcategory".to_string(), None),
            ("name".to_string(), Some(bucket_name.to_string())),
            ("items".to_string(), None),
        ];
        let mut lines = render_mapping(dash, key_col, &header);
        let item_dash = nested(key_col);
        lines.extend(render_mapping(item_dash, item_dash + 2, fields));
        self.insert(at, lines);
        Ok(())
    }

    fn view(&self, idx: usize) -> &str {
        let line = &self.lines[idx];
        line.strip_suffix('\r').unwrap_or(line)
    }

    fn set_line(&mut self, idx: usize, text: String) {
        let eol = if self.lines[idx].ends_with('\r') { "\r" } else { "" };
        self.lines[idx] = format!("{text}{eol}");
    }

    fn insert(&mut self, at: usize, lines: Vec<String>) {
        let eol = if self.crlf { "\r" } else { "" };
        let at = at.min(self.lines.len());
        self.lines.splice(at..at, lines.into_iter().map(|l| format!("{l}{eol}")));
    }

    fn member_category(&self, name: &str) -> Result<MemberCategory, Unplaced> {
        let all = Span {
            first: 0,
            last: self.lines.len().saturating_sub(1),
        };
        let landscape = self
            .keys(all, 0)
            .into_iter()
            .find(|k| k.key == "landscape")
            .ok_or_else(|| Unplaced("no top-level 'landscape' key in text".into()))?;
        let block = self
            .value_block(&landscape, all.last)
            .ok_or_else(|| Unplaced("'landscape' is not a block sequence".into()))?;
        let categories = self.seq_items(block);
        let compact = categories.first().map_or(true, |c| c.dash_col == landscape.col);

        for category in &categories {
            let keys = self.keys(category.span, category.key_col);
            if !keys.iter().any(|k| k.key == "name" && unquote(&k.inline) == name) {
                continue;
            }
            let Some(subcategories) = keys.into_iter().find(|k| k.key == "subcategories") else {
                continue;
            };
            let block = self.value_block(&subcategories, category.span.last);
            let buckets = block
                .map(|b| self.seq_items(b))
                .unwrap_or_default()
                .into_iter()
                .map(|item| self.bucket(item))
                .collect();
            return Ok(MemberCategory {
                subcategories,
                block,
                buckets,
                compact,
            });
        }
        Err(Unplaced(format!("no '{name}' category in text")))
    }

    fn bucket(&self, item: SeqItem) -> Bucket {
        let items = self
            .keys(item.span, item.key_col)
            .into_iter()
            .find(|k| k.key == "items")
            .map(|k| {
                let block = self.value_block(&k, item.span.last);
                (k, block)
            });
        let entries = items
            .as_ref()
            .and_then(|(_, block)| *block)
            .map(|block| self.seq_items(block))
            .unwrap_or_default();
        Bucket { item, items, entries }
    }

    /// Keys of the block mapping at `col` within `span`. The first line may
    /// be a sequence dash with the mapping starting after it.
    fn keys(&self, span: Span, col: usize) -> Vec<KeyLine> {
        (span.first..=span.last)
            .filter_map(|idx| {
                let text = self.view(idx);
                if !significant(text) {
                    return None;
                }
                let ind = indent(text);
                let after_dash = idx == span.first && ind < col;
                if !(ind == col || after_dash) || dash_at(text, col) {
                    return None;
                }
                let (key, value_at, inline) = key_at(text, col)?;
                Some(KeyLine {
                    idx,
                    col,
                    key,
                    value_at,
                    inline,
                })
            })
            .collect()
    }

    /// Lines owned by a key's value: deeper-indented lines, or sequence
    /// dashes at the key's own column. `None` when the value is inline.
    fn value_block(&self, key: &KeyLine, limit: usize) -> Option<Span> {
        let mut span: Option<Span> = None;
        for idx in key.idx + 1..=limit {
            let text = self.view(idx);
            if !significant(text) {
                continue;
            }
            if indent(text) > key.col || dash_at(text, key.col) {
                span = Some(match span {
                    Some(s) => Span { first: s.first, last: idx },
                    None => Span { first: idx, last: idx },
                });
            } else {
                break;
            }
        }
        span
    }

    fn seq_items(&self, block: Span) -> Vec<SeqItem> {
        let dash_col = indent(self.view(block.first));
        let starts: Vec<usize> = (block.first..=block.last)
            .filter(|&idx| dash_at(self.view(idx), dash_col))
            .collect();
        if starts.first() != Some(&block.first) {
            return Vec::new();
        }

        starts
            .iter()
            .enumerate()
            .map(|(n, &start)| {
                let last = match starts.get(n + 1) {
                    Some(&next) => self.last_significant_before(next, start),
                    None => block.last,
                };
                let after = &self.view(start)[dash_col + 1..];
                let key_col = if after.trim().is_empty() {
                    (start + 1..=last)
                        .find(|&idx| significant(self.view(idx)))
                        .map_or(dash_col + 2, |idx| indent(self.view(idx)))
                } else {
                    dash_col + 1 + (after.len() - after.trim_start_matches(' ').len())
                };
                SeqItem {
                    span: Span { first: start, last },
                    dash_col,
                    key_col,
                }
            })
            .collect()
    }

    fn last_significant_before(&self, next: usize, floor: usize) -> usize {
        (floor..next)
            .rev()
            .find(|&idx| significant(self.view(idx)))
            .unwrap_or(floor)
    }
}

fn pad(n: usize) -> String {
    " ".repeat(n)
}

fn indent(text: &str) -> usize {
    text.len() - text.trim_start_matches(' ').len()
}

fn significant(text: &str) -> bool {
    let t = text.trim_start();
    !t.is_empty() && !t.starts_with('#')
}

/// A sequence dash (`- x` or a lone `-`) at exactly `col`.
fn dash_at(text: &str, col: usize) -> bool {
    indent(text) == col && {
        let rest = &text[col..];
        rest == "-" || rest.starts_with("- ")
    }
}

/// Split `key: value` starting at `col`: unquoted key, offset past the
/// colon, inline value.
fn key_at(text: &str, col: usize) -> Option<(String, usize, String)> {
    let s = text.get(col..)?;
    let (key, colon) = match s.chars().next()? {
        q @ ('"' | '\'') => {
            let end = s[1..].find(q)? + 1;
            let rest = &s[end + 1..];
            let gap = rest.len() - rest.trim_start_matches(' ').len();
            (s[1..end].to_string(), col + end + 1 + gap)
        }
        '-' | '[' | '{' | '#' | '?' | '&' | '*' | '!' | '|' | '>' => return None,
        _ => {
            let (at, _) = s.char_indices().find(|&(i, c)| {
                c == ':' && s[i + 1..].chars().next().map_or(true, |n| n == ' ' || n == '\t')
            })?;
            (s[..at].trim_end().to_string(), col + at)
        }
    };
    let rest = text[colon..].strip_prefix(':')?;
    Some((key, colon + 1, inline_value(rest)))
}

fn inline_value(rest: &str) -> String {
    let t = rest.trim();
    if t.starts_with('#') {
        return String::new();
    }
    let t = t.find(" #").map_or(t, |i| &t[..i]);
    t.trim_end().to_string()
}

fn unquote(value: &str) -> &str {
    let quoted = value.len() >= 2
        && ((value.starts_with('"') && value.ends_with('"')) || (value.starts_with('\'') && value.ends_with('\'')));
    if quoted {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

fn is_empty_inline(value: &str) -> bool {
    matches!(value, "" | "[]" | "~" | "null")
}

fn render_mapping(dash: usize, key_col: usize, fields: &[(String, Option<String>)]) -> Vec<String> {
    let gap = key_col.saturating_sub(dash + 1).max(1);
    fields
        .iter()
        .enumerate()
        .map(|(n, (key, value))| {
            let pair = match value {
                Some(v) => format!("{}: {}", yaml_scalar(key), yaml_scalar(v)),
                None => format!("{}:", yaml_scalar(key)),
            };
            if n == 0 {
                format!("{}-{}{pair}", pad(dash), pad(gap))
            } else {
                format!("{}{pair}", pad(key_col))
            }
        })
        .collect()
}

/// Words YAML 1.1 readers take as booleans.
const YAML11_BOOLS: &[&str] = &["y", "n", "yes", "no", "on", "off"];

/// A string as a YAML scalar: plain when it reads back as the same string,
/// double-quoted otherwise.
pub fn yaml_scalar(s: &str) -> String {
    let plain = !s.is_empty()
        && s.trim() == s
        && !YAML11_BOOLS.iter().any(|w| w.eq_ignore_ascii_case(s))
        && !s.contains(|c: char| c.is_control())
        && matches!(serde_yaml::from_str::<Value>(s), Ok(Value::String(ref parsed)) if parsed == s);
    if plain {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
