//! Classification engine for sitewide-comment-control
//!
//! [`Classifier`] is a pure function of a compiled rule snapshot and a
//! candidate. [`CommentEngine`] wraps it with the shared snapshot handle and
//! the environment overrides used by the hook binary.

pub mod disallowed;
pub mod matcher;

use serde::Serialize;
use std::env;
use std::sync::Arc;

use crate::config::Config;
use crate::effector::{self, EffectAction};
use crate::input::CommentCandidate;
use crate::output::{PreprocessReply, Verdict};
use crate::rules::RuleSet;
use crate::store::RulesHandle;

use disallowed::{DisallowedCheck, DisallowedKeys, NoDisallowedList};
use matcher::{CompiledRules, RuleMatch};

/// Environment variable that turns every classification into Allow
pub const DISABLED_ENV: &str = "COMMENT_CONTROL_DISABLED";

/// Environment variable that classifies and logs but never acts
pub const DRY_RUN_ENV: &str = "COMMENT_CONTROL_DRY_RUN";

/// Why a classification ended the way it did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    /// Pingbacks, trackbacks and other non-comment types
    NotAComment,
    RegisteredUser,
    NoRules,
    /// The host's own disallowed list already caught it
    HostDisallowed,
    Matched(RuleMatch),
    NoMatch,
    Disabled,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::NotAComment => write!(f, "not a plain comment"),
            Outcome::RegisteredUser => write!(f, "registered user"),
            Outcome::NoRules => write!(f, "all lists empty"),
            Outcome::HostDisallowed => write!(f, "already on host disallowed list"),
            Outcome::Matched(m) => write!(f, "{} matched {:?} in {}", m.list, m.pattern, m.field),
            Outcome::NoMatch => write!(f, "no list matched"),
            Outcome::Disabled => write!(f, "disabled via {}", DISABLED_ENV),
        }
    }
}

/// A verdict plus the reason for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub verdict: Verdict,
    pub outcome: Outcome,
}

impl Classification {
    fn allow(outcome: Outcome) -> Self {
        Self {
            verdict: Verdict::Allow,
            outcome,
        }
    }

    /// The matched entry, if a list matched
    pub fn matched(&self) -> Option<&RuleMatch> {
        match &self.outcome {
            Outcome::Matched(m) => Some(m),
            _ => None,
        }
    }
}

/// Pure classifier: rules and candidate in, verdict out
pub struct Classifier {
    disallowed: Box<dyn DisallowedCheck>,
}

impl Classifier {
    pub fn new(disallowed: impl DisallowedCheck + 'static) -> Self {
        Self {
            disallowed: Box::new(disallowed),
        }
    }

    /// Classify one candidate against a compiled rule snapshot
    pub fn classify(&self, rules: &CompiledRules, candidate: &CommentCandidate) -> Classification {
        if !candidate.is_plain_comment() {
            return Classification::allow(Outcome::NotAComment);
        }

        if candidate.is_registered_user() {
            return Classification::allow(Outcome::RegisteredUser);
        }

        if rules.rules().is_empty() {
            return Classification::allow(Outcome::NoRules);
        }

        if self.disallowed.is_disallowed(candidate) {
            return Classification::allow(Outcome::HostDisallowed);
        }

        match rules.first_match(candidate) {
            Some(m) => Classification {
                verdict: m.list.verdict(),
                outcome: Outcome::Matched(m),
            },
            None => Classification::allow(Outcome::NoMatch),
        }
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(NoDisallowedList)
    }
}

/// Classify against an uncompiled rule set, with no host disallowed list
pub fn classify(rules: &RuleSet, candidate: &CommentCandidate) -> Verdict {
    let compiled = CompiledRules::new(rules.clone());
    Classifier::default().classify(&compiled, candidate).verdict
}

/// An override is on when set to anything but empty, "0", "false", "no" or "off"
fn env_flag(name: &str) -> bool {
    match env::var(name) {
        Ok(value) => {
            let value = value.trim();
            !(value.is_empty()
                || value == "0"
                || value.eq_ignore_ascii_case("false")
                || value.eq_ignore_ascii_case("no")
                || value.eq_ignore_ascii_case("off"))
        }
        Err(_) => false,
    }
}

/// The hook-facing engine: snapshot handle, classifier and overrides
pub struct CommentEngine {
    classifier: Classifier,
    rules: Arc<RulesHandle>,
}

impl CommentEngine {
    /// Create an engine over a shared rules handle
    pub fn new(config: &Config, rules: Arc<RulesHandle>) -> Self {
        let keys = DisallowedKeys::new(config.disallowed.keys.as_slice());
        Self {
            classifier: Classifier::new(keys),
            rules,
        }
    }

    /// Create an engine with an explicit host oracle
    pub fn with_classifier(classifier: Classifier, rules: Arc<RulesHandle>) -> Self {
        Self { classifier, rules }
    }

    /// Check if classification is disabled via environment
    pub fn is_disabled(&self) -> bool {
        env_flag(DISABLED_ENV)
    }

    /// Check if dry-run mode is enabled
    pub fn is_dry_run(&self) -> bool {
        env_flag(DRY_RUN_ENV)
    }

    /// Classify against the current snapshot
    pub fn classify(&self, candidate: &CommentCandidate) -> Classification {
        if self.is_disabled() {
            return Classification::allow(Outcome::Disabled);
        }

        let snapshot = self.rules.load();
        self.classifier.classify(snapshot.compiled(), candidate)
    }

    /// Run the pre-persist hook: classify and apply the record mutations.
    ///
    /// In dry-run mode the record comes back untouched with an Allow verdict;
    /// the returned classification still carries the real verdict.
    pub fn preprocess(&self, mut comment: CommentCandidate) -> (PreprocessReply, Classification) {
        let classification = self.classify(&comment);

        let verdict = if self.is_dry_run() {
            Verdict::Allow
        } else {
            classification.verdict
        };

        verdict.apply_to(&mut comment);
        (PreprocessReply { comment, verdict }, classification)
    }

    /// Run the post-persist hook: the action the host should take
    pub fn postprocess(&self, verdict: Verdict) -> EffectAction {
        if self.is_dry_run() {
            return EffectAction::None;
        }
        effector::plan(verdict)
    }
}
