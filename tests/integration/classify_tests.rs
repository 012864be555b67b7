//! Integration tests for comment classification

use sitewide_comment_control::{classify, CommentCandidate, RuleSet, RuleText, Verdict};

fn guest(name: &str, email: &str, ip: &str) -> CommentCandidate {
    CommentCandidate {
        author_name: name.to_string(),
        author_email: email.to_string(),
        source_address: ip.to_string(),
        content: "First!".to_string(),
        ..CommentCandidate::default()
    }
}

fn by_email(email: &str) -> CommentCandidate {
    guest("Visitor", email, "198.51.100.7")
}

fn rules(reject: &[&str], hold: &[&str], moderate: &[&str], wildcards: bool) -> RuleSet {
    RuleSet::new(reject.iter(), hold.iter(), moderate.iter(), wildcards)
}

// ============================================================================
// Pre-checks
// ============================================================================

#[test]
fn test_empty_rules_allow_everything() {
    let empty = RuleSet::default();
    assert_eq!(classify(&empty, &by_email("anyone@example.com")), Verdict::Allow);
    assert_eq!(classify(&empty, &guest("", "", "")), Verdict::Allow);

    // Lists that normalize to nothing are empty too
    let blank = RuleSet::from_text(&RuleText {
        blocklist: "\n   \n\t\n".to_string(),
        wildcards: true,
        ..RuleText::default()
    });
    assert!(blank.is_empty());
    assert_eq!(classify(&blank, &by_email("x@example.com")), Verdict::Allow);
}

#[test]
fn test_non_comment_types_exempt() {
    let rules = rules(&["spam"], &["spam"], &["spam"], true);
    for kind in ["pingback", "trackback", "note"] {
        let mut candidate = guest("spam", "spam@example.com", "spam");
        candidate.comment_type = kind.to_string();
        assert_eq!(classify(&rules, &candidate), Verdict::Allow, "{}", kind);
    }
}

#[test]
fn test_registered_users_exempt() {
    let rules = rules(&["spam"], &["spam"], &["spam"], true);
    let mut candidate = guest("spam", "spam@example.com", "spam");
    candidate.user_id = 1;
    assert_eq!(classify(&rules, &candidate), Verdict::Allow);
}

// ============================================================================
// Priority
// ============================================================================

#[test]
fn test_reject_beats_hold_and_moderate() {
    let rules = rules(&["mallory"], &["mallory"], &["mallory"], false);
    assert_eq!(classify(&rules, &guest("Mallory", "", "")), Verdict::Trash);
}

#[test]
fn test_hold_beats_moderate() {
    let rules = rules(&[], &["mallory"], &["mallory"], false);
    assert_eq!(classify(&rules, &guest("mallory", "", "")), Verdict::Spam);
}

#[test]
fn test_moderate_only() {
    let rules = rules(&[], &[], &["mallory"], false);
    assert_eq!(classify(&rules, &guest("mallory", "", "")), Verdict::Hold);
}

// ============================================================================
// Substring semantics
// ============================================================================

#[test]
fn test_substring_matches_inside_domain() {
    let rules = rules(&["press"], &[], &[], false);
    assert_eq!(classify(&rules, &by_email("matt@wordpress.org")), Verdict::Trash);
    assert_eq!(classify(&rules, &by_email("press@example.com")), Verdict::Trash);
}

#[test]
fn test_case_insensitive() {
    let rules = rules(&[], &[], &["SPAMMER"], false);
    assert_eq!(classify(&rules, &guest("spammer99", "", "")), Verdict::Hold);
}

#[test]
fn test_source_address_prefix() {
    let rules = rules(&[], &["203.0.113."], &[], false);
    assert_eq!(classify(&rules, &guest("a", "a@example.com", "203.0.113.77")), Verdict::Spam);
    assert_eq!(classify(&rules, &guest("a", "a@example.com", "203.0.114.77")), Verdict::Allow);
}

#[test]
fn test_no_false_match() {
    let rules = rules(&["xyz123"], &[], &[], true);
    let candidate = guest("Alice", "alice@example.com", "192.0.2.1");
    assert_eq!(classify(&rules, &candidate), Verdict::Allow);
}

#[test]
fn test_content_and_agent_not_scanned() {
    let rules = rules(&["casino"], &[], &[], false);
    let mut candidate = guest("Alice", "alice@example.com", "192.0.2.1");
    candidate.content = "best casino online".to_string();
    candidate.author_url = "https://casino.example".to_string();
    candidate.user_agent = "casino-bot/1.0".to_string();
    assert_eq!(classify(&rules, &candidate), Verdict::Allow);
}

#[test]
fn test_metacharacters_are_literal() {
    let rules = rules(&["a.b", "(", "[x", "*", "\\d+", "$^"], &[], &[], false);

    assert_eq!(classify(&rules, &guest("axb", "", "")), Verdict::Allow);
    assert_eq!(classify(&rules, &guest("1234", "", "")), Verdict::Allow);
    assert_eq!(classify(&rules, &guest("Alice", "", "")), Verdict::Allow);

    assert_eq!(classify(&rules, &guest("a.b", "", "")), Verdict::Trash);
    assert_eq!(classify(&rules, &guest("smile (:", "", "")), Verdict::Trash);
    assert_eq!(classify(&rules, &guest("five*", "", "")), Verdict::Trash);
    assert_eq!(classify(&rules, &guest("re \\d+", "", "")), Verdict::Trash);
}

#[test]
fn test_markup_entries_are_sanitized() {
    let rules = RuleSet::from_text(&RuleText {
        blocklist: "<b>bob</b>\n<script>alert(1)</script>".to_string(),
        ..RuleText::default()
    });
    assert_eq!(rules.to_text().blocklist, "bob");
    assert_eq!(classify(&rules, &guest("Bobby", "", "")), Verdict::Trash);
    assert_eq!(classify(&rules, &guest("alert(1)", "", "")), Verdict::Allow);
}

// ============================================================================
// Wildcard heuristic
// ============================================================================

#[test]
fn test_wildcard_same_domain() {
    let rules = rules(&[], &[], &["jo@example.com"], true);
    assert_eq!(classify(&rules, &by_email("joseph@example.com")), Verdict::Hold);
    assert_eq!(classify(&rules, &by_email("JOSEPH@example.com")), Verdict::Hold);
}

#[test]
fn test_wildcard_domain_mismatch() {
    let rules = rules(&[], &[], &["jo@example.com"], true);
    assert_eq!(classify(&rules, &by_email("joseph@other.org")), Verdict::Allow);
    // Domain comparison is exact
    assert_eq!(classify(&rules, &by_email("joseph@EXAMPLE.com")), Verdict::Allow);
    assert_eq!(classify(&rules, &by_email("joseph@sub.example.com")), Verdict::Allow);
}

#[test]
fn test_wildcard_off() {
    let rules = rules(&[], &[], &["jo@example.com"], false);
    assert_eq!(classify(&rules, &by_email("joseph@example.com")), Verdict::Allow);
}

#[test]
fn test_wildcard_needs_valid_entry_email() {
    // Not a valid address, so only plain substring matching applies
    let rules = rules(&["jo@example"], &[], &[], true);
    assert_eq!(classify(&rules, &by_email("joseph@example")), Verdict::Allow);
}

#[test]
fn test_wildcard_respects_priority() {
    let rules = rules(&["jo@example.com"], &[], &["joseph"], true);
    assert_eq!(classify(&rules, &by_email("joseph@example.com")), Verdict::Trash);
}

// ============================================================================
// Round trip
// ============================================================================

#[test]
fn test_text_round_trip() {
    let text = RuleText {
        blocklist: "  trash@example.com \n\nTRASH@example.com\ntrash@example.com\n".to_string(),
        spamlist: "10.0.0.1\r\n10.0.0.2".to_string(),
        modlist: String::new(),
        wildcards: true,
    };

    let rules = RuleSet::from_text(&text);
    let again = RuleSet::from_text(&rules.to_text());
    assert_eq!(rules, again);

    assert_eq!(rules.to_text().blocklist, "trash@example.com\nTRASH@example.com");
    assert_eq!(rules.to_text().spamlist, "10.0.0.1\n10.0.0.2");
    assert!(rules.wildcards_enabled());
}
