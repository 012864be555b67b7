//! Email address syntax check used by the wildcard heuristic
//!
//! Deliberately loose: it accepts what a comment form would accept, not the
//! full RFC 5322 grammar.

use once_cell::sync::Lazy;
use regex::Regex;

static LOCAL_PART: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9!#$%&'*+/=?^_`{|}~.-]+$").unwrap());

static DOMAIN_LABEL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^[a-z0-9-]+$").unwrap());

const MIN_LENGTH: usize = 6;

/// Check whether `candidate` is a syntactically valid email address
pub fn is_email(candidate: &str) -> bool {
    if candidate.len() < MIN_LENGTH {
        return false;
    }

    // '@' must exist and must not be the first character
    let (local, domain) = match candidate.split_once('@') {
        Some((local, domain)) if !local.is_empty() => (local, domain),
        _ => return false,
    };

    if !LOCAL_PART.is_match(local) {
        return false;
    }

    if domain.contains("..") {
        return false;
    }

    if domain.trim_matches(|c: char| c.is_whitespace() || c == '.' || c == '\0') != domain {
        return false;
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return false;
    }

    labels.iter().all(|label| {
        label.trim_matches(|c: char| c.is_whitespace() || c == '-' || c == '\0') == *label
            && DOMAIN_LABEL.is_match(label)
    })
}

/// Split an address into its local part and domain.
///
/// Only the first two `@`-separated segments are considered, so
/// `a@b.org@c` yields `("a", "b.org")`.
pub fn split_address(address: &str) -> Option<(&str, &str)> {
    let mut parts = address.split('@');
    let local = parts.next()?;
    let domain = parts.next()?;
    Some((local, domain))
}
