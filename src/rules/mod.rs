//! Network-wide moderation rules
//!
//! A [`RuleSet`] is an immutable snapshot of the three pattern lists plus the
//! wildcard flag. It is built from admin text (one entry per line) or from
//! the persisted settings record, and is normalized on construction: entries
//! are trimmed, sanitized as plain text, stripped of empties and deduplicated.

pub mod email;
pub mod sanitize;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::output::Verdict;
use sanitize::sanitize_text_field;

/// Which list a pattern belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListKind {
    /// Matches go straight to trash
    Reject,
    /// Matches go straight to spam
    Hold,
    /// Matches wait in the moderation queue
    Moderate,
}

impl ListKind {
    /// Evaluation order: reject before hold before moderate
    pub const PRIORITY: [ListKind; 3] = [ListKind::Reject, ListKind::Hold, ListKind::Moderate];

    /// Field name of this list in the persisted record
    pub fn record_key(&self) -> &'static str {
        match self {
            ListKind::Reject => "blocklist",
            ListKind::Hold => "spamlist",
            ListKind::Moderate => "modlist",
        }
    }

    /// Verdict produced when this list matches
    pub fn verdict(&self) -> Verdict {
        match self {
            ListKind::Reject => Verdict::Trash,
            ListKind::Hold => Verdict::Spam,
            ListKind::Moderate => Verdict::Hold,
        }
    }
}

impl std::fmt::Display for ListKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.record_key())
    }
}

/// The text form of a rule set: one entry per line in each block
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleText {
    pub blocklist: String,
    pub spamlist: String,
    pub modlist: String,
    pub wildcards: bool,
}

/// Immutable, normalized moderation rules
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StoredRecord")]
pub struct RuleSet {
    #[serde(rename = "blocklist")]
    reject: Vec<String>,

    #[serde(rename = "spamlist")]
    hold: Vec<String>,

    #[serde(rename = "modlist")]
    moderate: Vec<String>,

    wildcards: bool,
}

impl RuleSet {
    /// Build a rule set from entry lists, normalizing every list
    pub fn new(
        reject: impl IntoIterator<Item = impl AsRef<str>>,
        hold: impl IntoIterator<Item = impl AsRef<str>>,
        moderate: impl IntoIterator<Item = impl AsRef<str>>,
        wildcards: bool,
    ) -> Self {
        Self {
            reject: normalize_entries(reject),
            hold: normalize_entries(hold),
            moderate: normalize_entries(moderate),
            wildcards,
        }
    }

    /// Build a rule set from the three multi-line admin text blocks
    pub fn from_text(text: &RuleText) -> Self {
        Self {
            reject: normalize_entries(text.blocklist.lines()),
            hold: normalize_entries(text.spamlist.lines()),
            moderate: normalize_entries(text.modlist.lines()),
            wildcards: text.wildcards,
        }
    }

    /// Render back to the text form (entries joined by newlines)
    pub fn to_text(&self) -> RuleText {
        RuleText {
            blocklist: self.reject.join("\n"),
            spamlist: self.hold.join("\n"),
            modlist: self.moderate.join("\n"),
            wildcards: self.wildcards,
        }
    }

    /// Placeholder rules seeded on first activation
    pub fn placeholder() -> Self {
        Self::new(
            ["trash@example.com"],
            ["spammer@example.com"],
            ["moderate@example.com"],
            false,
        )
    }

    /// Entries of one list, in first-seen order
    pub fn list(&self, kind: ListKind) -> &[String] {
        match kind {
            ListKind::Reject => &self.reject,
            ListKind::Hold => &self.hold,
            ListKind::Moderate => &self.moderate,
        }
    }

    pub fn wildcards_enabled(&self) -> bool {
        self.wildcards
    }

    /// True when there is nothing to match against
    pub fn is_empty(&self) -> bool {
        self.reject.is_empty() && self.hold.is_empty() && self.moderate.is_empty()
    }

    /// Total number of entries across all lists
    pub fn len(&self) -> usize {
        self.reject.len() + self.hold.len() + self.moderate.len()
    }
}

/// Trim, sanitize, drop empties and deduplicate (keeping first occurrence)
pub fn normalize_entries<I, S>(lines: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut entries = Vec::new();

    for line in lines {
        let trimmed = line.as_ref().trim();
        if trimmed.is_empty() {
            continue;
        }

        let clean = sanitize_text_field(trimmed);
        if clean.is_empty() {
            continue;
        }

        if seen.insert(clean.clone()) {
            entries.push(clean);
        }
    }

    entries
}

/// The persisted record as it may be found in the settings store.
///
/// Older writers stored an emptied list as `""` or as newline-joined text and
/// the wildcard flag as `0`/`1`, so each field accepts those shapes too.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StoredRecord {
    blocklist: Option<StoredList>,
    spamlist: Option<StoredList>,
    modlist: Option<StoredList>,
    wildcards: Option<StoredFlag>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StoredList {
    Entries(Vec<String>),
    Text(String),
}

impl StoredList {
    fn into_entries(self) -> Vec<String> {
        match self {
            StoredList::Entries(entries) => normalize_entries(entries),
            StoredList::Text(text) => normalize_entries(text.lines()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StoredFlag {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl StoredFlag {
    fn is_set(&self) -> bool {
        match self {
            StoredFlag::Bool(b) => *b,
            StoredFlag::Int(n) => *n != 0,
            StoredFlag::Text(s) => {
                let s = s.trim();
                !s.is_empty() && s != "0" && !s.eq_ignore_ascii_case("false")
            }
        }
    }
}

impl From<StoredRecord> for RuleSet {
    fn from(record: StoredRecord) -> Self {
        let entries = |list: Option<StoredList>| list.map(StoredList::into_entries).unwrap_or_default();

        Self {
            reject: entries(record.blocklist),
            hold: entries(record.spamlist),
            moderate: entries(record.modlist),
            wildcards: record.wildcards.map(|f| f.is_set()).unwrap_or(false),
        }
    }
}
