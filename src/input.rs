//! Input parsing for host comment-pipeline hooks
//!
//! Parses the JSON payload the host sends on stdin: either a comment about to
//! be persisted, or a comment that has just been persisted.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::output::Verdict;

const AUTHOR_KEYS: &[&str] = &["comment_author"];
const EMAIL_KEYS: &[&str] = &["comment_author_email"];
const URL_KEYS: &[&str] = &["comment_author_url"];
const CONTENT_KEYS: &[&str] = &["comment_content"];
const ADDRESS_KEYS: &[&str] = &["comment_author_IP", "user_ip"];
const AGENT_KEYS: &[&str] = &["comment_agent", "user_agent"];
const USER_KEYS: &[&str] = &["user_ID", "user_id"];
const TYPE_KEYS: &[&str] = &["comment_type"];

/// An incoming comment presented for classification.
///
/// The host record is kept whole in `record`. On the way back out only the
/// typed fields that changed are written into it, under the key they were
/// read from, so the host gets its own record back.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommentCandidate {
    pub author_name: String,
    pub author_email: String,
    pub author_url: String,
    pub content: String,

    /// Network address the comment was submitted from
    pub source_address: String,

    pub user_agent: String,

    /// Host user id; zero for anonymous authors
    pub user_id: u64,

    /// Empty for a plain comment; "pingback", "trackback", ... otherwise
    pub comment_type: String,

    /// The host record as received
    pub record: Map<String, Value>,
}

impl CommentCandidate {
    /// Read the typed fields out of a host record, keeping the record
    pub fn from_record(record: Map<String, Value>) -> Self {
        CommentCandidate {
            author_name: read_string(&record, AUTHOR_KEYS),
            author_email: read_string(&record, EMAIL_KEYS),
            author_url: read_string(&record, URL_KEYS),
            content: read_string(&record, CONTENT_KEYS),
            source_address: read_string(&record, ADDRESS_KEYS),
            user_agent: read_string(&record, AGENT_KEYS),
            user_id: read_user_id(&record, USER_KEYS),
            comment_type: read_string(&record, TYPE_KEYS),
            record,
        }
    }

    /// The host record with every changed field written back
    pub fn to_record(&self) -> Map<String, Value> {
        let recorded = CommentCandidate::from_record(self.record.clone());
        let mut record = self.record.clone();

        write_back(&mut record, AUTHOR_KEYS, &self.author_name, &recorded.author_name);
        write_back(&mut record, EMAIL_KEYS, &self.author_email, &recorded.author_email);
        write_back(&mut record, URL_KEYS, &self.author_url, &recorded.author_url);
        write_back(&mut record, CONTENT_KEYS, &self.content, &recorded.content);
        write_back(&mut record, ADDRESS_KEYS, &self.source_address, &recorded.source_address);
        write_back(&mut record, AGENT_KEYS, &self.user_agent, &recorded.user_agent);
        write_back(&mut record, USER_KEYS, &self.user_id, &recorded.user_id);
        write_back(&mut record, TYPE_KEYS, &self.comment_type, &recorded.comment_type);
        record
    }

    /// Registered authors are never classified
    pub fn is_registered_user(&self) -> bool {
        self.user_id > 0
    }

    /// Only plain comments are classified
    pub fn is_plain_comment(&self) -> bool {
        self.comment_type.is_empty()
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.record.get(key)
    }

    pub fn set_field(&mut self, key: &str, value: Value) {
        self.record.insert(key.to_string(), value);
    }

    /// One-line description for logs
    pub fn summary(&self) -> String {
        format!(
            "author={:?} email={:?} ip={:?}",
            truncate(&self.author_name, 60),
            truncate(&self.author_email, 60),
            self.source_address
        )
    }
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

/// The first of `keys` present in the record, else the primary key
fn key_for(record: &Map<String, Value>, keys: &[&'static str]) -> &'static str {
    keys.iter()
        .copied()
        .find(|key| record.contains_key(*key))
        .unwrap_or(keys[0])
}

/// Read the first present key as a string (numbers are stringified)
fn read_string(record: &Map<String, Value>, keys: &[&'static str]) -> String {
    match record.get(key_for(record, keys)) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

/// Read the first present key as a user id; anything unparseable is anonymous
fn read_user_id(record: &Map<String, Value>, keys: &[&'static str]) -> u64 {
    match record.get(key_for(record, keys)) {
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

fn write_back<T>(record: &mut Map<String, Value>, keys: &[&'static str], current: &T, recorded: &T)
where
    T: PartialEq + Clone + Into<Value>,
{
    if current != recorded {
        let key = key_for(record, keys);
        record.insert(key.to_string(), current.clone().into());
    }
}

impl<'de> Deserialize<'de> for CommentCandidate {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::Object(record) => Ok(CommentCandidate::from_record(record)),
            other => Err(serde::de::Error::custom(format!(
                "comment must be a JSON object, got {}",
                other
            ))),
        }
    }
}

impl Serialize for CommentCandidate {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.to_record().serialize(serializer)
    }
}

/// The persisted comment data handed to the post-persist hook
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PostedComment {
    /// Verdict threaded from the pre-persist reply
    pub verdict: Option<Verdict>,

    /// Legacy numeric marker, used when no verdict was threaded
    pub comment_karma: Option<Value>,
}

impl PostedComment {
    /// The verdict to act on: the explicit one, else the legacy marker
    pub fn verdict(&self) -> Verdict {
        if let Some(verdict) = self.verdict {
            return verdict;
        }

        let marker = match &self.comment_karma {
            Some(Value::Number(n)) => n.as_i64(),
            Some(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        };

        marker.map(Verdict::from_priority_marker).unwrap_or_default()
    }
}

/// A hook payload from the host
#[derive(Debug, Deserialize)]
#[serde(tag = "hook")]
pub enum HookInput {
    /// A comment about to be persisted
    #[serde(rename = "preprocess_comment")]
    Preprocess { comment: CommentCandidate },

    /// A comment that has just been persisted
    #[serde(rename = "comment_post")]
    Postprocess {
        comment_id: u64,
        #[serde(default)]
        comment_approved: Value,
        #[serde(default)]
        commentdata: PostedComment,
    },
}

impl HookInput {
    /// Parse input from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Hook name, for logging
    pub fn hook_name(&self) -> &'static str {
        match self {
            HookInput::Preprocess { .. } => "preprocess_comment",
            HookInput::Postprocess { .. } => "comment_post",
        }
    }

    /// Get a summary of the input for logging
    pub fn summary(&self) -> String {
        match self {
            HookInput::Preprocess { comment } => comment.summary(),
            HookInput::Postprocess { comment_id, .. } => format!("comment_id={}", comment_id),
        }
    }
}
