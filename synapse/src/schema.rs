//! Topic schemas and the registry mapping topics to wire types.
//!
//! A topic's validator is a typed serde round-trip: the candidate
//! payload is deserialized into the topic's payload type (rejecting
//! unknown fields, filling defaults) and re-serialized. The result is
//! the normalized value subscribers receive, so a payload that passed
//! validation always decodes cleanly on the consumer side.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

type Validator =
    Arc<dyn Fn(&serde_json::Value) -> Result<serde_json::Value, String> + Send + Sync>;

/// Errors raised while assembling a schema registry.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SchemaError {
    #[error("topic already registered: {0}")]
    DuplicateTopic(String),

    #[error("signal type already registered: {0}")]
    DuplicateSignalType(String),
}

/// One topic's schema: its short name, its wire-format type string, and
/// the validator that normalizes payloads.
#[derive(Clone)]
pub struct TopicSpec {
    pub topic: String,
    pub signal_type: String,
    validator: Validator,
}

impl TopicSpec {
    /// Build a spec whose validator is a round-trip through `T`.
    pub fn typed<T>(topic: impl Into<String>, signal_type: impl Into<String>) -> Self
    where
        T: Serialize + DeserializeOwned + 'static,
    {
        Self {
            topic: topic.into(),
            signal_type: signal_type.into(),
            validator: Arc::new(|value| {
                let typed: T =
                    serde_json::from_value(value.clone()).map_err(|e| e.to_string())?;
                serde_json::to_value(&typed).map_err(|e| e.to_string())
            }),
        }
    }

    /// Validate a payload, returning its normalized form.
    pub fn validate(&self, value: &serde_json::Value) -> Result<serde_json::Value, String> {
        (self.validator)(value)
    }
}

impl fmt::Debug for TopicSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TopicSpec")
            .field("topic", &self.topic)
            .field("signal_type", &self.signal_type)
            .finish()
    }
}

/// The set of topics the router accepts, with a bijection between
/// topic names and wire-format type strings.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    by_topic: HashMap<String, TopicSpec>,
    topic_by_type: HashMap<String, String>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, spec: TopicSpec) -> Result<(), SchemaError> {
        if self.by_topic.contains_key(&spec.topic) {
            return Err(SchemaError::DuplicateTopic(spec.topic.clone()));
        }
        if self.topic_by_type.contains_key(&spec.signal_type) {
            return Err(SchemaError::DuplicateSignalType(spec.signal_type.clone()));
        }
        self.topic_by_type
            .insert(spec.signal_type.clone(), spec.topic.clone());
        self.by_topic.insert(spec.topic.clone(), spec);
        Ok(())
    }

    pub fn get(&self, topic: &str) -> Option<&TopicSpec> {
        self.by_topic.get(topic)
    }

    /// Reverse lookup: which topic carries this wire type?
    pub fn topic_for_type(&self, signal_type: &str) -> Option<&str> {
        self.topic_by_type.get(signal_type).map(String::as_str)
    }

    pub fn topics(&self) -> impl Iterator<Item = &str> {
        self.by_topic.keys().map(String::as_str)
    }
}
