//! Signal - the validated, typed message envelope flowing through the router.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// An immutable envelope around one validated payload.
///
/// Constructed by the router at publish time (never by hand on the hot
/// path) so that `data` is always the normalized form produced by the
/// topic's validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    /// Unique signal identifier (ULID).
    pub id: String,

    /// Wire-format type string, e.g. `synapse.task.request`.
    #[serde(rename = "type")]
    pub signal_type: String,

    /// Producer identity, e.g. `coordinator` or `specialist:security`.
    pub source: String,

    /// Validated, normalized payload.
    pub data: serde_json::Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,

    pub timestamp: DateTime<Utc>,
}

impl Signal {
    pub fn new(
        signal_type: impl Into<String>,
        source: impl Into<String>,
        data: serde_json::Value,
    ) -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            signal_type: signal_type.into(),
            source: source.into(),
            data,
            subject: None,
            correlation_id: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    /// Decode the payload into its typed form.
    pub fn payload<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.data.clone())
    }
}
