//! Integration tests for override mechanisms
//!
//! Environment variables are process-wide, so everything that sets one runs
//! inside a single test.

use std::env;
use std::sync::Arc;

use sitewide_comment_control::{
    audit::{AuditEntry, LogLevel},
    effector::EffectAction,
    engine::{DISABLED_ENV, DRY_RUN_ENV},
    CommentCandidate, CommentEngine, Config, Outcome, RuleSet, RulesHandle, Verdict,
};

fn troll() -> CommentCandidate {
    CommentCandidate {
        author_name: "Troll".to_string(),
        author_email: "troll@example.com".to_string(),
        content: "first".to_string(),
        ..CommentCandidate::default()
    }
}

#[test]
fn test_environment_overrides() {
    let handle = Arc::new(RulesHandle::new(RuleSet::new(["troll"], ["x"], ["y"], false)));
    let engine = CommentEngine::new(&Config::default(), handle);

    // Baseline: trashed and annotated
    let (reply, classification) = engine.preprocess(troll());
    assert_eq!(reply.verdict, Verdict::Trash);
    assert_eq!(classification.verdict, Verdict::Trash);

    // ========================================================================
    // COMMENT_CONTROL_DISABLED
    // ========================================================================

    env::set_var(DISABLED_ENV, "1");
    let (reply, classification) = engine.preprocess(troll());
    env::remove_var(DISABLED_ENV);

    assert_eq!(reply.verdict, Verdict::Allow);
    assert_eq!(reply.comment, troll());
    assert_eq!(classification.outcome, Outcome::Disabled);

    let entry = AuditEntry::classification(&reply.comment, &classification, false);
    assert_eq!(entry.level, LogLevel::Disabled);

    // Switched-off values leave classification running
    for value in ["0", "false", "OFF", ""] {
        env::set_var(DISABLED_ENV, value);
        let disabled = engine.is_disabled();
        let (reply, _) = engine.preprocess(troll());
        env::remove_var(DISABLED_ENV);

        assert!(!disabled, "{:?}", value);
        assert_eq!(reply.verdict, Verdict::Trash, "{:?}", value);
    }

    // ========================================================================
    // COMMENT_CONTROL_DRY_RUN
    // ========================================================================

    env::set_var(DRY_RUN_ENV, "1");
    let dry_run = engine.is_dry_run();
    let (reply, classification) = engine.preprocess(troll());
    let action = engine.postprocess(Verdict::Trash);
    env::remove_var(DRY_RUN_ENV);

    assert!(dry_run);
    // The record is untouched but the real verdict is still reported
    assert_eq!(reply.verdict, Verdict::Allow);
    assert_eq!(reply.comment, troll());
    assert_eq!(classification.verdict, Verdict::Trash);
    assert_eq!(action, EffectAction::None);

    let entry = AuditEntry::classification(&reply.comment, &classification, dry_run);
    assert_eq!(entry.level, LogLevel::DryRun);
    assert_eq!(entry.verdict, Some(Verdict::Trash));

    env::set_var(DRY_RUN_ENV, "0");
    let dry_run = engine.is_dry_run();
    env::remove_var(DRY_RUN_ENV);
    assert!(!dry_run);

    // Cleared again
    assert!(!engine.is_dry_run());
    assert_eq!(engine.postprocess(Verdict::Trash), EffectAction::Trash);
}
