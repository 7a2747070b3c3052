//! Request envelopes
//!
//! An [`Envelope`] is the fully assembled request a session sends exactly
//! once. Construction is pure: no I/O, no network, and validation rejects
//! only an empty destination or an empty payload.

use crate::error::CallError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Request content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    /// Structured key/value document (published as JSON)
    Document(Map<String, Value>),
    /// Free text (prompt)
    Text(String),
}

impl Payload {
    pub fn is_empty(&self) -> bool {
        match self {
            Payload::Document(map) => map.is_empty(),
            Payload::Text(text) => text.is_empty(),
        }
    }

    /// Wire bytes for transports that send raw payloads
    pub fn to_bytes(&self) -> Result<Vec<u8>, CallError> {
        match self {
            Payload::Document(map) => serde_json::to_vec(map)
                .map_err(|e| CallError::validation(format!("Unserializable payload: {e}"))),
            Payload::Text(text) => Ok(text.clone().into_bytes()),
        }
    }
}

/// MQTT delivery guarantee
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryGuarantee {
    AtMostOnce,
    AtLeastOnce,
}

/// Per-call delivery or sampling parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CallParams {
    Delivery {
        qos: DeliveryGuarantee,
        retain: bool,
    },
    Sampling {
        max_tokens: u32,
        temperature: f32,
        top_p: f32,
    },
}

/// One request, sent at most once
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub id: Uuid,
    /// Topic name or model identifier
    pub destination: String,
    pub payload: Payload,
    pub params: CallParams,
    pub created_at: DateTime<Utc>,
}

impl Envelope {
    /// Build an envelope stamped with the current time
    pub fn new(
        destination: impl Into<String>,
        payload: Payload,
        params: CallParams,
    ) -> Result<Self, CallError> {
        Self::new_at(destination, payload, params, Utc::now())
    }

    /// Build an envelope with an explicit creation time
    pub fn new_at(
        destination: impl Into<String>,
        payload: Payload,
        params: CallParams,
        created_at: DateTime<Utc>,
    ) -> Result<Self, CallError> {
        let destination = destination.into();
        if destination.is_empty() {
            return Err(CallError::validation("destination must not be empty"));
        }
        if payload.is_empty() {
            return Err(CallError::validation(format!(
                "payload for '{destination}' must not be empty"
            )));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            destination,
            payload,
            params,
            created_at,
        })
    }

    /// Unix-epoch seconds of construction
    pub fn timestamp(&self) -> i64 {
        self.created_at.timestamp()
    }
}

/// Build the broker message: `{"message": <text>, "ts": <unix seconds>}`
///
/// An empty `message` is rejected; `ts` alone is not content.
pub fn build_publish_envelope(
    topic: &str,
    message: &str,
    qos: DeliveryGuarantee,
) -> Result<Envelope, CallError> {
    if message.is_empty() {
        return Err(CallError::validation(format!(
            "message for '{topic}' must not be empty"
        )));
    }

    let created_at = Utc::now();
    let mut document = Map::new();
    document.insert("message".to_string(), Value::String(message.to_string()));
    document.insert("ts".to_string(), Value::from(created_at.timestamp()));

    Envelope::new_at(
        topic,
        Payload::Document(document),
        CallParams::Delivery { qos, retain: false },
        created_at,
    )
}

/// Build a single-turn text generation request
pub fn build_inference_envelope(
    model_id: &str,
    prompt: &str,
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
) -> Result<Envelope, CallError> {
    Envelope::new(
        model_id,
        Payload::Text(prompt.to_string()),
        CallParams::Sampling {
            max_tokens,
            temperature,
            top_p,
        },
    )
}
