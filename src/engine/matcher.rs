//! Per-list pattern matching
//!
//! Every list entry is free-form admin text. It is escaped before it is
//! compiled, so no entry can change how a field is scanned, and it matches as
//! a case-insensitive substring of the author name, email or address.

use regex::{Regex, RegexBuilder};
use serde::Serialize;
use tracing::warn;

use crate::input::CommentCandidate;
use crate::rules::email::{is_email, split_address};
use crate::rules::{ListKind, RuleSet};

/// Which candidate field an entry matched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchField {
    AuthorName,
    AuthorEmail,
    SourceAddress,
    /// Same domain, local part contains the entry's local part
    WildcardEmail,
}

impl std::fmt::Display for MatchField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MatchField::AuthorName => "author name",
            MatchField::AuthorEmail => "author email",
            MatchField::SourceAddress => "source address",
            MatchField::WildcardEmail => "wildcard email",
        };
        f.write_str(s)
    }
}

/// The first entry that matched a candidate
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleMatch {
    pub list: ListKind,
    pub pattern: String,
    pub field: MatchField,
}

/// Case-insensitive substring search for one entry
#[derive(Debug)]
enum Needle {
    Pattern(Regex),
    /// Fallback when the escaped entry exceeds the regex size limit
    Literal(String),
}

impl Needle {
    fn new(entry: &str) -> Self {
        match RegexBuilder::new(&regex::escape(entry))
            .case_insensitive(true)
            .build()
        {
            Ok(re) => Needle::Pattern(re),
            Err(e) => {
                warn!(entry_len = entry.len(), error = %e, "list entry not compilable, using literal search");
                Needle::Literal(entry.to_lowercase())
            }
        }
    }

    fn is_match(&self, haystack: &str) -> bool {
        match self {
            Needle::Pattern(re) => re.is_match(haystack),
            Needle::Literal(needle) => haystack.to_lowercase().contains(needle.as_str()),
        }
    }
}

/// Local part and domain of an entry that is itself an email address
#[derive(Debug)]
struct WildcardAddress {
    local_lower: String,
    domain: String,
}

impl WildcardAddress {
    fn parse(entry: &str) -> Option<Self> {
        if !is_email(entry) {
            return None;
        }
        let (local, domain) = split_address(entry)?;
        Some(Self {
            local_lower: local.to_lowercase(),
            domain: domain.to_string(),
        })
    }

    /// Domain must be identical (case-sensitive); local part is a substring
    fn matches(&self, author_email: &str) -> bool {
        match split_address(author_email) {
            Some((local, domain)) => {
                domain == self.domain && local.to_lowercase().contains(&self.local_lower)
            }
            None => false,
        }
    }
}

#[derive(Debug)]
struct CompiledEntry {
    source: String,
    needle: Needle,
    wildcard: Option<WildcardAddress>,
}

impl CompiledEntry {
    fn new(source: &str) -> Self {
        Self {
            source: source.to_string(),
            needle: Needle::new(source),
            wildcard: WildcardAddress::parse(source),
        }
    }

    fn find(&self, candidate: &CommentCandidate, wildcards: bool) -> Option<MatchField> {
        let fields = [
            (MatchField::AuthorName, candidate.author_name.as_str()),
            (MatchField::AuthorEmail, candidate.author_email.as_str()),
            (MatchField::SourceAddress, candidate.source_address.as_str()),
        ];

        for (field, value) in fields {
            if self.needle.is_match(value) {
                return Some(field);
            }
        }

        if wildcards {
            if let Some(ref address) = self.wildcard {
                if address.matches(&candidate.author_email) {
                    return Some(MatchField::WildcardEmail);
                }
            }
        }

        None
    }
}

/// One compiled list
#[derive(Debug)]
pub struct CompiledList {
    kind: ListKind,
    entries: Vec<CompiledEntry>,
}

impl CompiledList {
    fn new(kind: ListKind, entries: &[String]) -> Self {
        Self {
            kind,
            entries: entries
                .iter()
                .map(|e| e.trim())
                .filter(|e| !e.is_empty())
                .map(CompiledEntry::new)
                .collect(),
        }
    }

    /// First entry (in list order) that matches the candidate
    pub fn find(&self, candidate: &CommentCandidate, wildcards: bool) -> Option<RuleMatch> {
        self.entries.iter().find_map(|entry| {
            entry.find(candidate, wildcards).map(|field| RuleMatch {
                list: self.kind,
                pattern: entry.source.clone(),
                field,
            })
        })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A rule set with every list compiled for matching
#[derive(Debug)]
pub struct CompiledRules {
    rules: RuleSet,
    lists: [CompiledList; 3],
}

impl CompiledRules {
    pub fn new(rules: RuleSet) -> Self {
        let lists = ListKind::PRIORITY.map(|kind| CompiledList::new(kind, rules.list(kind)));
        Self { rules, lists }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn list(&self, kind: ListKind) -> &CompiledList {
        match kind {
            ListKind::Reject => &self.lists[0],
            ListKind::Hold => &self.lists[1],
            ListKind::Moderate => &self.lists[2],
        }
    }

    /// Scan lists in priority order; the first list with a match wins
    pub fn first_match(&self, candidate: &CommentCandidate) -> Option<RuleMatch> {
        let wildcards = self.rules.wildcards_enabled();
        self.lists
            .iter()
            .find_map(|list| list.find(candidate, wildcards))
    }
}
