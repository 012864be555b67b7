//! The host platform's own disallowed-content check
//!
//! Consulted before the network lists: a comment the host already rejects is
//! left to the host and not annotated a second time.

use regex::{Regex, RegexBuilder};

use crate::input::CommentCandidate;
use crate::rules::sanitize::strip_tags;

/// Boolean oracle over a comment's identity and content fields
pub trait DisallowedCheck: Send + Sync {
    fn is_disallowed(&self, comment: &CommentCandidate) -> bool;
}

/// A host without a disallowed list
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDisallowedList;

impl DisallowedCheck for NoDisallowedList {
    fn is_disallowed(&self, _comment: &CommentCandidate) -> bool {
        false
    }
}

/// The host's keyword list: any key found as a case-insensitive substring of
/// author, email, url, content (raw or without markup), address or agent
#[derive(Debug, Default)]
pub struct DisallowedKeys {
    keys: Vec<Regex>,
}

impl DisallowedKeys {
    pub fn new<S: AsRef<str>>(keys: &[S]) -> Self {
        let keys = keys
            .iter()
            .map(|k| k.as_ref().trim())
            .filter(|k| !k.is_empty())
            .filter_map(|k| {
                RegexBuilder::new(&regex::escape(k))
                    .case_insensitive(true)
                    .build()
                    .ok()
            })
            .collect();
        Self { keys }
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl DisallowedCheck for DisallowedKeys {
    fn is_disallowed(&self, comment: &CommentCandidate) -> bool {
        if self.keys.is_empty() {
            return false;
        }

        let stripped = strip_tags(&comment.content);
        let fields = [
            comment.author_name.as_str(),
            comment.author_email.as_str(),
            comment.author_url.as_str(),
            comment.content.as_str(),
            stripped.as_str(),
            comment.source_address.as_str(),
            comment.user_agent.as_str(),
        ];

        self.keys
            .iter()
            .any(|key| fields.iter().any(|field| key.is_match(field)))
    }
}
