//! Verdicts and hook replies
//!
//! A [`Verdict`] is the classification outcome. It carries everything the
//! pre-persist mutation and the post-persist effect need, so neither side has
//! to re-derive it.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::effector::EffectAction;
use crate::input::CommentCandidate;

/// Priority marker written to a trashed comment's karma field
pub const TRASH_MARKER: i64 = 999;

/// Priority marker written to a spammed comment's karma field
pub const SPAM_MARKER: i64 = 666;

const TRASH_ANNOTATION: &str = "-- FLAGGED AS TRASH BY NETWORK ADMIN";
const SPAM_ANNOTATION: &str = "-- FLAGGED AS SPAM BY NETWORK ADMIN";

/// Classification outcome for one comment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// Let the host apply its usual approval rules
    #[default]
    Allow,

    /// Keep the comment pending for human review
    Hold,

    /// Store, then mark as spam
    Spam,

    /// Store, then move to trash
    Trash,
}

impl Verdict {
    /// Karma marker for hosts that thread the verdict through the record
    pub fn priority_marker(&self) -> Option<i64> {
        match self {
            Verdict::Trash => Some(TRASH_MARKER),
            Verdict::Spam => Some(SPAM_MARKER),
            Verdict::Hold | Verdict::Allow => None,
        }
    }

    /// Recover a verdict from a legacy karma marker
    pub fn from_priority_marker(marker: i64) -> Self {
        match marker {
            TRASH_MARKER => Verdict::Trash,
            SPAM_MARKER => Verdict::Spam,
            _ => Verdict::Allow,
        }
    }

    /// System note appended to the comment content
    pub fn annotation(&self) -> Option<&'static str> {
        match self {
            Verdict::Trash => Some(TRASH_ANNOTATION),
            Verdict::Spam => Some(SPAM_ANNOTATION),
            Verdict::Hold | Verdict::Allow => None,
        }
    }

    /// Whether the comment must be stored unapproved
    pub fn withholds_approval(&self) -> bool {
        !matches!(self, Verdict::Allow)
    }

    /// Apply the pre-persist mutations to a comment record
    pub fn apply_to(&self, comment: &mut CommentCandidate) {
        if self.withholds_approval() {
            comment.set_field("comment_approved", json!(0));
        }

        if let Some(marker) = self.priority_marker() {
            comment.set_field("comment_karma", json!(marker));
        }

        if let Some(note) = self.annotation() {
            comment.content.push_str("\n\n");
            comment.content.push_str(note);
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Verdict::Allow => "allow",
            Verdict::Hold => "hold",
            Verdict::Spam => "spam",
            Verdict::Trash => "trash",
        };
        f.write_str(s)
    }
}

/// Reply to the pre-persist hook: the (possibly mutated) record and verdict
#[derive(Debug, Serialize)]
pub struct PreprocessReply {
    pub comment: CommentCandidate,
    pub verdict: Verdict,
}

/// Reply to the post-persist hook: the action the host should take
#[derive(Debug, Serialize)]
pub struct PostprocessReply {
    pub comment_id: u64,
    pub action: EffectAction,
}

/// Reply to an administrative update
#[derive(Debug, Serialize)]
pub struct AdminReply {
    pub ok: bool,
    pub notice: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
}

/// Reply for a payload that could not be parsed.
///
/// The gate fails open: a pre-persist payload gets its comment object echoed
/// back with an Allow verdict, anything else gets no action.
pub fn fail_open_reply(raw: &str) -> String {
    let payload: Value = serde_json::from_str(raw).unwrap_or(Value::Null);

    if payload.get("hook").and_then(Value::as_str) == Some("comment_post") {
        let comment_id = payload
            .get("comment_id")
            .and_then(Value::as_u64)
            .unwrap_or(0);
        return to_json(&json!({ "comment_id": comment_id, "action": EffectAction::None }));
    }

    let comment = match payload.get("comment") {
        Some(comment @ Value::Object(_)) => comment.clone(),
        _ => json!({}),
    };
    to_json(&json!({ "comment": comment, "verdict": Verdict::Allow }))
}

/// Serialize any reply to a JSON string
pub fn to_json<T: Serialize>(reply: &T) -> String {
    serde_json::to_string(reply).unwrap_or_else(|_| "{}".to_string())
}
