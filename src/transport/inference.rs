//! Text-generation session over HTTPS
//!
//! Speaks the Converse API of a hosted model endpoint: one user turn in,
//! one complete assistant message out. Authentication is a bearer token.

use crate::config::{ConfigError, InferenceSection};
use crate::envelope::{CallParams, Envelope, Payload};
use crate::error::CallError;
use crate::identity::{AuthMaterial, EndpointIdentity};
use crate::outcome::{Response, TokenUsage};
use crate::transport::Session;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;
use tracing::{debug, error, info, warn};

/// Single-prompt inference session
pub struct InferenceSession {
    identity: EndpointIdentity,
    timeout: Duration,
    client: Option<Client>,
}

impl InferenceSession {
    /// Prepare a session; the identity must carry a bearer token
    pub fn new(identity: EndpointIdentity, section: &InferenceSection) -> Result<Self, CallError> {
        if !matches!(identity.auth, AuthMaterial::Bearer { .. }) {
            return Err(CallError::Configuration(ConfigError::InvalidConfig(format!(
                "inference endpoint {} requires a bearer credential",
                identity.address
            ))));
        }

        Ok(Self {
            identity,
            timeout: Duration::from_secs(section.timeout_secs),
            client: None,
        })
    }

    fn bearer_token(&self) -> &str {
        match &self.identity.auth {
            AuthMaterial::Bearer { token } => token,
            _ => "",
        }
    }

    /// Endpoint for one model (pure function)
    ///
    /// The model id is a single path segment, so ARNs containing `/` are
    /// percent-encoded rather than split.
    fn converse_url(base_url: &str, model_id: &str) -> Result<Url, CallError> {
        let invalid = || {
            CallError::Configuration(ConfigError::InvalidConfig(format!(
                "invalid inference base URL: {base_url}"
            )))
        };

        let mut url = Url::parse(base_url).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .pop_if_empty()
            .extend(["model", model_id, "converse"]);
        Ok(url)
    }

    /// Convert an envelope to the Converse request body (pure function)
    fn convert_to_converse_request(envelope: &Envelope) -> Result<ConverseRequest, CallError> {
        let prompt = match &envelope.payload {
            Payload::Text(text) => text.clone(),
            Payload::Document(_) => {
                return Err(CallError::validation(
                    "inference sessions only accept text prompts",
                ))
            }
        };
        let inference_config = match envelope.params {
            CallParams::Sampling {
                max_tokens,
                temperature,
                top_p,
            } => InferenceConfig {
                max_tokens,
                temperature,
                top_p,
            },
            CallParams::Delivery { .. } => {
                return Err(CallError::validation(
                    "inference sessions only accept sampling parameters",
                ))
            }
        };

        Ok(ConverseRequest {
            messages: vec![ConverseMessage {
                role: "user".to_string(),
                content: vec![ContentBlock { text: Some(prompt) }],
            }],
            inference_config,
        })
    }

    /// Extract the generated text and usage (pure function)
    fn parse_converse_response(
        model_id: &str,
        response: ConverseResponse,
    ) -> Result<Response, CallError> {
        let text: String = response
            .output
            .message
            .content
            .into_iter()
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("");

        if text.is_empty() {
            return Err(CallError::remote(format!(
                "model '{model_id}' returned no text content"
            )));
        }

        Ok(Response::Generated {
            text,
            model: model_id.to_string(),
            usage: TokenUsage {
                input_tokens: response.usage.input_tokens,
                output_tokens: response.usage.output_tokens,
                total_tokens: response.usage.total_tokens,
            },
            stop_reason: response.stop_reason,
        })
    }

    /// Classify a non-success HTTP status (pure function)
    ///
    /// Authentication rejections are connection failures; everything else
    /// the service refuses is a remote failure.
    fn classify_status(model_id: &str, status: StatusCode, body: &str) -> CallError {
        let reason = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.message)
            .unwrap_or_else(|| body.trim().to_string());

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => CallError::connection(format!(
                "authentication rejected for model '{model_id}' ({status}): {reason}"
            )),
            _ => CallError::remote(format!(
                "model '{model_id}' rejected the request ({status}): {reason}"
            )),
        }
    }

    /// Make the single API request (impure I/O)
    async fn make_api_request(
        &self,
        client: &Client,
        model_id: &str,
        request: &ConverseRequest,
    ) -> Result<ConverseResponse, CallError> {
        let url = Self::converse_url(&self.identity.address, model_id)?;
        debug!("Inference request: POST {}", url);

        let response = client
            .post(url)
            .bearer_auth(self.bearer_token())
            .json(request)
            .send()
            .await
            .map_err(|e| {
                let error_msg = format!(
                    "HTTP request failed: {} (is_connect: {}, is_timeout: {})",
                    e,
                    e.is_connect(),
                    e.is_timeout()
                );
                warn!("Inference network error: {}", error_msg);
                CallError::connection(error_msg)
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!(
                "Inference API error - Status: {}, Response: {}",
                status, error_text
            );
            return Err(Self::classify_status(model_id, status, &error_text));
        }

        response
            .json()
            .await
            .map_err(|e| CallError::remote(format!("Invalid response from '{model_id}': {e}")))
    }
}

#[async_trait]
impl Session for InferenceSession {
    fn name(&self) -> &str {
        "inference"
    }

    fn is_open(&self) -> bool {
        self.client.is_some()
    }

    async fn open(&mut self) -> Result<(), CallError> {
        if self.client.is_some() {
            return Err(CallError::connection("Session is already open"));
        }

        let client = Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| CallError::connection(format!("Failed to build HTTP client: {e}")))?;

        info!(endpoint = %self.identity.address, "Inference client ready");
        self.client = Some(client);
        Ok(())
    }

    async fn call(&mut self, envelope: &Envelope) -> Result<Response, CallError> {
        let request = Self::convert_to_converse_request(envelope)?;
        let client = self
            .client
            .clone()
            .ok_or_else(|| CallError::connection("Session is not open"))?;

        let response = self
            .make_api_request(&client, &envelope.destination, &request)
            .await?;
        let generated = Self::parse_converse_response(&envelope.destination, response)?;

        if let Response::Generated {
            usage, stop_reason, ..
        } = &generated
        {
            debug!(
                "Inference response: {} tokens used (input: {}, output: {}), stop_reason: {:?}",
                usage.total_tokens, usage.input_tokens, usage.output_tokens, stop_reason
            );
        }
        Ok(generated)
    }

    async fn close(&mut self) -> Result<(), CallError> {
        if self.client.take().is_some() {
            debug!("Inference client released");
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ConverseRequest {
    messages: Vec<ConverseMessage>,
    inference_config: InferenceConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InferenceConfig {
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ConverseMessage {
    role: String,
    content: Vec<ContentBlock>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ContentBlock {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConverseResponse {
    output: ConverseOutput,
    #[serde(default)]
    stop_reason: Option<String>,
    #[serde(default)]
    usage: ConverseUsage,
}

#[derive(Debug, Deserialize)]
struct ConverseOutput {
    message: ConverseMessage,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConverseUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(alias = "Message")]
    message: Option<String>,
}
