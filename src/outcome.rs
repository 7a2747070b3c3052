//! Call results

use crate::error::{CallError, ErrorKind};
use serde::{Deserialize, Serialize};

/// Token usage statistics reported by the inference endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub total_tokens: u32,
}

/// Successful response payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Broker acknowledged the publish
    Acknowledged { destination: String },
    /// Full generated text
    Generated {
        text: String,
        model: String,
        usage: TokenUsage,
        stop_reason: Option<String>,
    },
}

/// Outcome of exactly one call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CallResult {
    Success { response: Response },
    Failure { kind: ErrorKind, message: String },
}

impl CallResult {
    pub fn is_success(&self) -> bool {
        matches!(self, CallResult::Success { .. })
    }
}

impl From<Result<Response, CallError>> for CallResult {
    fn from(result: Result<Response, CallError>) -> Self {
        match result {
            Ok(response) => CallResult::Success { response },
            Err(error) => CallResult::from(error),
        }
    }
}

impl From<CallError> for CallResult {
    fn from(error: CallError) -> Self {
        CallResult::Failure {
            kind: error.kind(),
            message: error.reportable_message(),
        }
    }
}
