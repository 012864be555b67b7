//! Post-persist side effects
//!
//! Once the host has stored a comment, a Trash or Spam verdict moves it to the
//! matching state. Hold needs nothing more: the record is already pending.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;

use crate::error::EffectError;
use crate::output::Verdict;

/// What the host should do with a stored comment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectAction {
    Trash,
    Spam,
    None,
}

/// The action a verdict calls for, without touching any record
pub fn plan(verdict: Verdict) -> EffectAction {
    match verdict {
        Verdict::Trash => EffectAction::Trash,
        Verdict::Spam => EffectAction::Spam,
        Verdict::Hold | Verdict::Allow => EffectAction::None,
    }
}

/// Moderation state of a stored comment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentStatus {
    Pending,
    Approved,
    Spam,
    Trash,
}

/// Result of applying a verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectOutcome {
    /// The comment was moved to this status
    Applied(CommentStatus),
    /// The comment was already in this status
    AlreadyApplied(CommentStatus),
    /// The verdict needs no post-persist action
    NoAction,
}

/// Host-side storage of comment moderation state
pub trait CommentRepository: Send + Sync {
    fn status(&self, id: u64) -> Result<Option<CommentStatus>, EffectError>;

    fn set_status(&self, id: u64, status: CommentStatus) -> Result<(), EffectError>;
}

/// In-process comment repository
#[derive(Debug, Default)]
pub struct MemoryRepository {
    comments: Mutex<HashMap<u64, CommentStatus>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, id: u64, status: CommentStatus) -> Result<(), EffectError> {
        self.set_status(id, status)
    }
}

impl CommentRepository for MemoryRepository {
    fn status(&self, id: u64) -> Result<Option<CommentStatus>, EffectError> {
        let comments = self.comments.lock().map_err(|_| EffectError::Poisoned)?;
        Ok(comments.get(&id).copied())
    }

    fn set_status(&self, id: u64, status: CommentStatus) -> Result<(), EffectError> {
        let mut comments = self.comments.lock().map_err(|_| EffectError::Poisoned)?;
        comments.insert(id, status);
        Ok(())
    }
}

/// Applies verdicts to stored comments
pub struct Effector<R: CommentRepository> {
    repo: R,
}

impl<R: CommentRepository> Effector<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Apply a verdict to comment `id`. Repeating a call changes nothing.
    pub fn apply(&self, id: u64, verdict: Verdict) -> Result<EffectOutcome, EffectError> {
        let target = match plan(verdict) {
            EffectAction::Trash => CommentStatus::Trash,
            EffectAction::Spam => CommentStatus::Spam,
            EffectAction::None => return Ok(EffectOutcome::NoAction),
        };

        let current = self.repo.status(id)?.ok_or(EffectError::NotFound(id))?;
        if current == target {
            return Ok(EffectOutcome::AlreadyApplied(target));
        }

        self.repo.set_status(id, target)?;
        debug!(comment_id = id, ?current, ?target, "comment status changed");
        Ok(EffectOutcome::Applied(target))
    }
}
