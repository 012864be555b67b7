//! Activation seeding and versioned configuration upgrades
//!
//! `upgrade` is run explicitly before first use. It is gated on a schema
//! version stored next to the rules record, and every step is safe to repeat.

use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::error::StoreError;
use crate::rules::{ListKind, RuleSet};
use crate::store::{save_rules, SettingsStore, RULES_KEY};

/// Key holding the schema version of the stored configuration
pub const SCHEMA_KEY: &str = "sitewide_comment_control_schema";

/// Schema version written by this release
pub const SCHEMA_VERSION: u64 = 2;

/// Single combined list kept by very old installs
const LEGACY_KEYS_KEY: &str = "ippy_scc_keys";

/// List-type selector kept alongside the combined list
const LEGACY_TYPE_KEY: &str = "ippy_scc_type";

/// Field name the reject list had before it was renamed
const LEGACY_REJECT_FIELD: &str = "blacklist";

/// A migration step that changed stored data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpgradeStep {
    /// Combined legacy list became the moderation list
    LegacyCombinedList,
    /// `blacklist` field renamed to `blocklist`
    RejectFieldRename,
}

/// What an upgrade run did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpgradeReport {
    pub from_version: u64,
    pub to_version: u64,
    pub applied: Vec<UpgradeStep>,
}

impl UpgradeReport {
    pub fn is_noop(&self) -> bool {
        self.from_version == self.to_version && self.applied.is_empty()
    }
}

/// Seed the placeholder rules on first activation.
///
/// Returns `true` when a record was written, `false` when one already existed.
pub fn activate(store: &dyn SettingsStore) -> Result<bool, StoreError> {
    if store.get(RULES_KEY)?.is_some() {
        return Ok(false);
    }

    save_rules(store, &RuleSet::placeholder())?;
    info!("seeded placeholder moderation rules");
    Ok(true)
}

/// Stored schema version; anything missing or unreadable counts as 0
pub fn schema_version(store: &dyn SettingsStore) -> Result<u64, StoreError> {
    Ok(match store.get(SCHEMA_KEY)? {
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}

/// Bring the stored configuration up to [`SCHEMA_VERSION`]
pub fn upgrade(store: &dyn SettingsStore) -> Result<UpgradeReport, StoreError> {
    let from_version = schema_version(store)?;
    let mut applied = Vec::new();

    if from_version >= SCHEMA_VERSION {
        return Ok(UpgradeReport {
            from_version,
            to_version: from_version,
            applied,
        });
    }

    if migrate_combined_list(store)? {
        applied.push(UpgradeStep::LegacyCombinedList);
    }

    if rename_reject_field(store)? {
        applied.push(UpgradeStep::RejectFieldRename);
    }

    store.update(SCHEMA_KEY, Value::from(SCHEMA_VERSION))?;
    info!(from_version, to_version = SCHEMA_VERSION, ?applied, "configuration upgraded");

    Ok(UpgradeReport {
        from_version,
        to_version: SCHEMA_VERSION,
        applied,
    })
}

/// Legacy combined list → moderation list, with placeholder reject/hold lists
fn migrate_combined_list(store: &dyn SettingsStore) -> Result<bool, StoreError> {
    let legacy = match store.get(LEGACY_KEYS_KEY)? {
        Some(value) => value,
        None => return Ok(false),
    };

    let moderate: Vec<String> = match legacy {
        Value::String(text) => text.lines().map(str::to_string).collect(),
        Value::Array(items) => items
            .into_iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    };

    let placeholder = RuleSet::placeholder();
    let rules = RuleSet::new(
        placeholder.list(ListKind::Reject),
        placeholder.list(ListKind::Hold),
        moderate,
        false,
    );

    save_rules(store, &rules)?;
    store.delete(LEGACY_KEYS_KEY)?;
    store.delete(LEGACY_TYPE_KEY)?;
    Ok(true)
}

/// Move a `blacklist` field of the rules record to `blocklist`
fn rename_reject_field(store: &dyn SettingsStore) -> Result<bool, StoreError> {
    let mut record = match store.get(RULES_KEY)? {
        Some(Value::Object(record)) => record,
        _ => return Ok(false),
    };

    let legacy = match record.remove(LEGACY_REJECT_FIELD) {
        Some(value) => value,
        None => return Ok(false),
    };

    record.insert("blocklist".to_string(), legacy);
    store.update(RULES_KEY, Value::Object(record))?;
    Ok(true)
}
