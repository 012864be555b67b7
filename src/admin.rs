//! Network administration of the moderation lists
//!
//! One settings form: three multi-line lists and the wildcard checkbox. An
//! update replaces the whole rule set or nothing at all.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::AdminError;
use crate::rules::{RuleSet, RuleText};
use crate::store::{load_rules, save_rules, RulesHandle, SettingsStore};

/// Action name the anti-forgery token is bound to
pub const TOKEN_ACTION: &str = "scc_saveit";

/// Notice shown after a successful update
pub const UPDATED_NOTICE: &str = "Options Updated!";

/// A submitted settings form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminForm {
    #[serde(flatten)]
    pub rules: RuleText,

    /// Anti-forgery token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// A form submission together with who submitted it
#[derive(Debug, Clone)]
pub struct AdminRequest {
    /// Whether the actor may manage the network
    pub can_manage_network: bool,
    pub form: AdminForm,
}

/// Host-supplied anti-forgery check
pub trait TokenVerifier: Send + Sync {
    fn verify(&self, action: &str, token: &str) -> bool;
}

/// A fixed shared token, for the command-line surface
#[derive(Debug, Clone)]
pub struct StaticToken {
    expected: Option<String>,
}

impl StaticToken {
    /// `None` or an empty token rejects every update
    pub fn new(expected: Option<String>) -> Self {
        Self {
            expected: expected.filter(|t| !t.is_empty()),
        }
    }
}

impl TokenVerifier for StaticToken {
    fn verify(&self, action: &str, token: &str) -> bool {
        if action != TOKEN_ACTION {
            return false;
        }
        match &self.expected {
            Some(expected) => constant_time_eq(expected.as_bytes(), token.as_bytes()),
            None => false,
        }
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// A successful update
#[derive(Debug, Clone)]
pub struct UpdateNotice {
    pub message: &'static str,
    /// Version of the snapshot now in effect
    pub version: u64,
    pub rules: RuleSet,
}

/// The settings page: prefill and update
pub struct AdminPage<'a> {
    store: &'a dyn SettingsStore,
    handle: &'a RulesHandle,
    verifier: &'a dyn TokenVerifier,
}

impl<'a> AdminPage<'a> {
    pub fn new(
        store: &'a dyn SettingsStore,
        handle: &'a RulesHandle,
        verifier: &'a dyn TokenVerifier,
    ) -> Self {
        Self {
            store,
            handle,
            verifier,
        }
    }

    /// Current configuration as form text
    pub fn prefill(&self) -> RuleText {
        load_rules(self.store).to_text()
    }

    /// Replace the whole configuration from a submitted form.
    ///
    /// On any error the stored record and the live snapshot are unchanged.
    pub fn update(&self, request: AdminRequest) -> Result<UpdateNotice, AdminError> {
        if !request.can_manage_network {
            warn!("settings update rejected: missing capability");
            return Err(AdminError::Forbidden);
        }

        let token = request.form.token.as_deref().unwrap_or_default();
        if !self.verifier.verify(TOKEN_ACTION, token) {
            warn!("settings update rejected: bad anti-forgery token");
            return Err(AdminError::InvalidToken);
        }

        let rules = RuleSet::from_text(&request.form.rules);
        save_rules(self.store, &rules)?;
        let version = self.handle.replace(rules.clone());

        info!(version, entries = rules.len(), wildcards = rules.wildcards_enabled(), "moderation rules replaced");

        Ok(UpdateNotice {
            message: UPDATED_NOTICE,
            version,
            rules,
        })
    }
}
