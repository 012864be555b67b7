//! JSONL audit logging for sitewide-comment-control
//!
//! Records every moderation decision to a JSONL file for later analysis.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::effector::EffectAction;
use crate::engine::matcher::MatchField;
use crate::engine::{Classification, Outcome, DISABLED_ENV};
use crate::input::CommentCandidate;
use crate::output::Verdict;
use crate::rules::ListKind;

/// Log level for audit entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Allowed,
    Held,
    Spam,
    Trashed,
    DryRun,
    Disabled,
    Error,
}

impl From<Verdict> for LogLevel {
    fn from(verdict: Verdict) -> Self {
        match verdict {
            Verdict::Allow => LogLevel::Allowed,
            Verdict::Hold => LogLevel::Held,
            Verdict::Spam => LogLevel::Spam,
            Verdict::Trash => LogLevel::Trashed,
        }
    }
}

/// An audit log entry
#[derive(Debug, Serialize)]
pub struct AuditEntry {
    /// Timestamp of the decision
    pub timestamp: DateTime<Utc>,

    /// Log level (ALLOWED, HELD, SPAM, TRASHED, DRYRUN, DISABLED, ERROR)
    pub level: LogLevel,

    /// Hook that produced the entry
    pub hook: String,

    /// Verdict reached, before any dry-run downgrade
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verdict: Option<Verdict>,

    /// List that matched (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list: Option<ListKind>,

    /// Entry that matched
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    /// Comment field the entry matched in
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<MatchField>,

    /// Summary of the input
    pub input_summary: String,

    /// Reason for the decision
    pub reason: String,

    /// Post the comment was left on (if provided)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_id: Option<u64>,

    /// Stored comment id, for post-persist entries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment_id: Option<u64>,
}

impl AuditEntry {
    fn blank(level: LogLevel, hook: &str, input_summary: String, reason: String) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            hook: hook.to_string(),
            verdict: None,
            list: None,
            pattern: None,
            field: None,
            input_summary,
            reason,
            post_id: None,
            comment_id: None,
        }
    }

    /// Create an entry for a pre-persist classification
    pub fn classification(
        comment: &CommentCandidate,
        classification: &Classification,
        dry_run: bool,
    ) -> Self {
        let level = if classification.outcome == Outcome::Disabled {
            LogLevel::Disabled
        } else if dry_run {
            LogLevel::DryRun
        } else {
            LogLevel::from(classification.verdict)
        };

        let reason = match classification.outcome {
            Outcome::Disabled => DISABLED_ENV.to_string(),
            ref outcome => outcome.to_string(),
        };

        let mut entry = Self::blank(level, "preprocess_comment", comment.summary(), reason);
        entry.verdict = Some(classification.verdict);
        entry.post_id = comment.field("comment_post_ID").and_then(json_id);

        if let Some(m) = classification.matched() {
            entry.list = Some(m.list);
            entry.pattern = Some(m.pattern.clone());
            entry.field = Some(m.field);
        }

        entry
    }

    /// Create an entry for a post-persist action
    pub fn effect(comment_id: u64, verdict: Verdict, action: EffectAction, dry_run: bool) -> Self {
        let level = if dry_run {
            LogLevel::DryRun
        } else {
            LogLevel::from(verdict)
        };
        let reason = format!("post-persist action: {:?}", action).to_lowercase();

        let mut entry = Self::blank(
            level,
            "comment_post",
            format!("comment_id={}", comment_id),
            reason,
        );
        entry.verdict = Some(verdict);
        entry.comment_id = Some(comment_id);
        entry
    }

    /// Create an entry for a payload that could not be handled
    pub fn error(hook: &str, input_summary: String, reason: impl Into<String>) -> Self {
        Self::blank(LogLevel::Error, hook, input_summary, reason.into())
    }
}

fn json_id(value: &serde_json::Value) -> Option<u64> {
    match value {
        serde_json::Value::Number(n) => n.as_u64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Audit logger
pub struct AuditLogger {
    writer: Option<BufWriter<File>>,
}

impl AuditLogger {
    /// Create a new audit logger
    pub fn new(path: Option<&Path>) -> Self {
        let writer = path.and_then(|p| {
            // Ensure parent directory exists
            if let Some(parent) = p.parent() {
                let _ = std::fs::create_dir_all(parent);
            }

            OpenOptions::new()
                .create(true)
                .append(true)
                .open(p)
                .ok()
                .map(BufWriter::new)
        });

        Self { writer }
    }

    /// Log an audit entry
    pub fn log(&mut self, entry: &AuditEntry) -> Result<(), std::io::Error> {
        if let Some(ref mut writer) = self.writer {
            let json = serde_json::to_string(entry)?;
            writeln!(writer, "{}", json)?;
            writer.flush()?;
        }
        Ok(())
    }

    /// Check if logging is enabled
    pub fn is_enabled(&self) -> bool {
        self.writer.is_some()
    }
}

/// Create a disabled logger (for when audit logging is off)
impl Default for AuditLogger {
    fn default() -> Self {
        Self { writer: None }
    }
}
