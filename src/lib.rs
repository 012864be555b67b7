//! sitewide-comment-control - Network-wide comment moderation gate
//!
//! This library classifies incoming comments against three network-wide
//! pattern lists and tells the host what to do with them.
//!
//! # Features
//!
//! - **Prioritized lists**: reject (trash), hold (spam) and moderate (pending)
//! - **Field matching**: author name, author email and source address
//! - **Wildcard heuristic**: same-domain lookalike email addresses
//! - **Atomic configuration**: versioned snapshots, all-or-nothing updates
//! - **Legacy upgrade**: explicit, idempotent migration of old settings
//! - **Audit logging**: JSONL log of all decisions
//!
//! # Example
//!
//! ```
//! use sitewide_comment_control::{classify, CommentCandidate, RuleSet, RuleText, Verdict};
//!
//! let rules = RuleSet::from_text(&RuleText {
//!     blocklist: "spammer@example.com".to_string(),
//!     modlist: "10.0.0.".to_string(),
//!     ..RuleText::default()
//! });
//!
//! let comment = CommentCandidate {
//!     author_email: "spammer@example.com".to_string(),
//!     ..CommentCandidate::default()
//! };
//!
//! assert_eq!(classify(&rules, &comment), Verdict::Trash);
//! ```

pub mod admin;
pub mod audit;
pub mod config;
pub mod effector;
pub mod engine;
pub mod error;
pub mod input;
pub mod migrate;
pub mod output;
pub mod rules;
pub mod store;

// Re-exports for convenience
pub use config::Config;
pub use engine::{classify, Classification, Classifier, CommentEngine, Outcome};
pub use input::{CommentCandidate, HookInput};
pub use output::Verdict;
pub use rules::{ListKind, RuleSet, RuleText};
pub use store::{RulesHandle, SettingsStore};
