//! Integration tests for settings storage, upgrades and admin updates

use std::sync::Arc;

use serde_json::json;
use sitewide_comment_control::{
    admin::{AdminForm, AdminPage, AdminRequest, StaticToken},
    error::AdminError,
    migrate,
    store::{load_rules, JsonFileStore, RULES_KEY},
    CommentCandidate, CommentEngine, Config, ListKind, RuleSet, RuleText, RulesHandle,
    SettingsStore, Verdict,
};
use tempfile::TempDir;

fn file_store(dir: &TempDir) -> JsonFileStore {
    JsonFileStore::new(dir.path().join("network").join("settings.json"))
}

fn form(blocklist: &str, token: &str) -> AdminForm {
    AdminForm {
        rules: RuleText {
            blocklist: blocklist.to_string(),
            ..RuleText::default()
        },
        token: Some(token.to_string()),
    }
}

fn admin(form: AdminForm) -> AdminRequest {
    AdminRequest {
        can_manage_network: true,
        form,
    }
}

fn guest(email: &str) -> CommentCandidate {
    CommentCandidate {
        author_email: email.to_string(),
        ..CommentCandidate::default()
    }
}

// ============================================================================
// Activation and upgrade
// ============================================================================

#[test]
fn test_activate_then_upgrade_fresh_store() {
    let dir = TempDir::new().unwrap();
    let store = file_store(&dir);

    assert!(migrate::activate(&store).unwrap());
    let report = migrate::upgrade(&store).unwrap();
    assert!(report.applied.is_empty());

    let rules = load_rules(&store);
    assert_eq!(rules, RuleSet::placeholder());
    assert!(!rules.wildcards_enabled());

    // Re-activation never clobbers stored lists
    assert!(!migrate::activate(&store).unwrap());
}

#[test]
fn test_upgrade_legacy_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.json");
    std::fs::write(
        &path,
        r#"{"ippy_scc_keys":"troll@example.com\n192.0.2.","ippy_scc_type":"moderate"}"#,
    )
    .unwrap();
    let store = JsonFileStore::new(&path);

    migrate::upgrade(&store).unwrap();

    let rules = load_rules(&store);
    assert_eq!(
        rules.list(ListKind::Moderate),
        &["troll@example.com".to_string(), "192.0.2.".to_string()]
    );
    assert_eq!(store.get("ippy_scc_keys").unwrap(), None);
    assert_eq!(store.get("ippy_scc_type").unwrap(), None);

    // Upgraded rules hold matching comments
    let handle = Arc::new(RulesHandle::from_store(&store));
    let engine = CommentEngine::new(&Config::default(), handle);
    assert_eq!(engine.classify(&guest("troll@example.com")).verdict, Verdict::Hold);
}

#[test]
fn test_historical_record_shapes_load() {
    let dir = TempDir::new().unwrap();
    let store = file_store(&dir);
    store
        .update(
            RULES_KEY,
            json!({"blocklist": "a\nb\n", "spamlist": "", "modlist": ["c"], "wildcards": "1"}),
        )
        .unwrap();

    let rules = load_rules(&store);
    assert_eq!(rules.list(ListKind::Reject), &["a".to_string(), "b".to_string()]);
    assert!(rules.list(ListKind::Hold).is_empty());
    assert_eq!(rules.list(ListKind::Moderate), &["c".to_string()]);
    assert!(rules.wildcards_enabled());
}

#[test]
fn test_corrupt_store_fails_open() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.json");
    std::fs::write(&path, "{not json").unwrap();
    let store = JsonFileStore::new(&path);

    assert!(load_rules(&store).is_empty());

    let handle = Arc::new(RulesHandle::from_store(&store));
    let engine = CommentEngine::new(&Config::default(), handle);
    assert_eq!(engine.classify(&guest("anyone@example.com")).verdict, Verdict::Allow);
}

// ============================================================================
// Admin updates
// ============================================================================

#[test]
fn test_update_persists_and_swaps_snapshot() {
    let dir = TempDir::new().unwrap();
    let store = file_store(&dir);
    migrate::activate(&store).unwrap();

    let handle = Arc::new(RulesHandle::from_store(&store));
    let engine = CommentEngine::new(&Config::default(), Arc::clone(&handle));
    let verifier = StaticToken::new(Some("letmein".to_string()));
    let page = AdminPage::new(&store, &handle, &verifier);

    assert_eq!(engine.classify(&guest("eve@evil.test")).verdict, Verdict::Allow);

    let notice = page.update(admin(form("evil.test", "letmein"))).unwrap();
    assert_eq!(notice.message, "Options Updated!");
    assert_eq!(notice.version, handle.load().version());

    // The running engine sees the new lists without a reload
    assert_eq!(engine.classify(&guest("eve@evil.test")).verdict, Verdict::Trash);

    // And a fresh process reading the file sees them too
    let reopened = JsonFileStore::new(store.path());
    assert_eq!(load_rules(&reopened).list(ListKind::Reject), &["evil.test".to_string()]);

    // The whole set is replaced: placeholder lists are gone
    assert!(load_rules(&reopened).list(ListKind::Hold).is_empty());
}

#[test]
fn test_bad_token_leaves_everything_untouched() {
    let dir = TempDir::new().unwrap();
    let store = file_store(&dir);
    migrate::activate(&store).unwrap();
    let before = std::fs::read_to_string(store.path()).unwrap();

    let handle = RulesHandle::from_store(&store);
    let verifier = StaticToken::new(Some("letmein".to_string()));
    let page = AdminPage::new(&store, &handle, &verifier);

    let err = page.update(admin(form("everyone", "guess"))).unwrap_err();
    assert!(matches!(err, AdminError::InvalidToken));

    assert_eq!(std::fs::read_to_string(store.path()).unwrap(), before);
    assert_eq!(handle.load().version(), 1);
    assert_eq!(handle.load().rules(), &RuleSet::placeholder());
}

#[test]
fn test_unconfigured_token_rejects_updates() {
    let dir = TempDir::new().unwrap();
    let store = file_store(&dir);
    let handle = RulesHandle::from_store(&store);
    let verifier = StaticToken::new(Config::default().admin.token);
    let page = AdminPage::new(&store, &handle, &verifier);

    let err = page.update(admin(form("x", ""))).unwrap_err();
    assert!(matches!(err, AdminError::InvalidToken));
    assert!(!store.path().exists());
}

#[test]
fn test_prefill_round_trip() {
    let dir = TempDir::new().unwrap();
    let store = file_store(&dir);
    let handle = RulesHandle::from_store(&store);
    let verifier = StaticToken::new(Some("t".to_string()));
    let page = AdminPage::new(&store, &handle, &verifier);

    let submitted = AdminForm {
        rules: RuleText {
            blocklist: "one\n two \none".to_string(),
            spamlist: "10.0.0.1".to_string(),
            modlist: "jo@example.com".to_string(),
            wildcards: true,
        },
        token: Some("t".to_string()),
    };
    page.update(admin(submitted)).unwrap();

    let prefill = page.prefill();
    assert_eq!(prefill.blocklist, "one\ntwo");
    assert_eq!(prefill.spamlist, "10.0.0.1");
    assert_eq!(prefill.modlist, "jo@example.com");
    assert!(prefill.wildcards);

    // Submitting the prefilled form unchanged is a no-op on the lists
    let before = load_rules(&store);
    page.update(admin(AdminForm {
        rules: prefill,
        token: Some("t".to_string()),
    }))
    .unwrap();
    assert_eq!(load_rules(&store), before);
}
