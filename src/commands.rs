//! The two one-shot commands
//!
//! Each command resolves its identity first (configuration errors abort
//! before any session exists), builds its envelope, then hands both to a
//! session factory and [`run_once`]. The factory parameter is the
//! injection point tests use to substitute a mock session.

use crate::config::{InferenceSection, MqttSection, SecretSource};
use crate::envelope::{build_inference_envelope, build_publish_envelope, DeliveryGuarantee};
use crate::error::CallError;
use crate::identity::EndpointIdentity;
use crate::outcome::CallResult;
use crate::runner::run_once;
use crate::transport::{InferenceSession, MqttSession, Session};
use tracing::info;

/// Publish `message` to the configured topic over the real broker
pub async fn publish(section: &MqttSection, secrets: &dyn SecretSource, message: &str) -> CallResult {
    publish_with(section, secrets, message, |identity| {
        MqttSession::new(identity, section)
    })
    .await
}

/// Publish with a caller-supplied session factory
pub async fn publish_with<S, F>(
    section: &MqttSection,
    secrets: &dyn SecretSource,
    message: &str,
    make_session: F,
) -> CallResult
where
    S: Session,
    F: FnOnce(EndpointIdentity) -> Result<S, CallError>,
{
    let identity = match section.identity(secrets) {
        Ok(identity) => identity,
        Err(e) => return CallError::from(e).into(),
    };
    let envelope =
        match build_publish_envelope(&section.topic, message, DeliveryGuarantee::AtLeastOnce) {
            Ok(envelope) => envelope,
            Err(e) => return e.into(),
        };
    let mut session = match make_session(identity) {
        Ok(session) => session,
        Err(e) => return e.into(),
    };

    info!(topic = %section.topic, "Publishing one message");
    run_once(&mut session, &envelope).await
}

/// Generate text for `prompt` with the configured model
pub async fn generate(
    section: &InferenceSection,
    secrets: &dyn SecretSource,
    prompt: &str,
) -> CallResult {
    generate_with(section, secrets, prompt, |identity| {
        InferenceSession::new(identity, section)
    })
    .await
}

/// Generate with a caller-supplied session factory
pub async fn generate_with<S, F>(
    section: &InferenceSection,
    secrets: &dyn SecretSource,
    prompt: &str,
    make_session: F,
) -> CallResult
where
    S: Session,
    F: FnOnce(EndpointIdentity) -> Result<S, CallError>,
{
    let identity = match section.identity(secrets) {
        Ok(identity) => identity,
        Err(e) => return CallError::from(e).into(),
    };
    let envelope = match build_inference_envelope(
        &section.model,
        prompt,
        section.max_tokens,
        section.temperature,
        section.top_p,
    ) {
        Ok(envelope) => envelope,
        Err(e) => return e.into(),
    };
    let mut session = match make_session(identity) {
        Ok(session) => session,
        Err(e) => return e.into(),
    };

    info!(model = %section.model, "Requesting one completion");
    run_once(&mut session, &envelope).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::testing::{MockSession, StaticSecrets};
    use std::cell::Cell;

    #[tokio::test]
    async fn test_missing_token_never_builds_session() {
        let built = Cell::new(0);
        let result = generate_with(
            &InferenceSection::default(),
            &StaticSecrets::new(),
            "hello",
            |_| {
                built.set(built.get() + 1);
                Ok(MockSession::generating("unused"))
            },
        )
        .await;

        assert!(matches!(
            result,
            CallResult::Failure {
                kind: ErrorKind::Configuration,
                ..
            }
        ));
        assert_eq!(built.get(), 0);
    }

    #[tokio::test]
    async fn test_empty_prompt_is_validation_failure() {
        let secrets = StaticSecrets::new().with_env("AWS_BEARER_TOKEN_BEDROCK", "tok");
        let mock = MockSession::generating("unused");
        let recorder = mock.recorder();

        let result =
            generate_with(&InferenceSection::default(), &secrets, "", move |_| Ok(mock)).await;

        assert!(matches!(
            result,
            CallResult::Failure {
                kind: ErrorKind::Validation,
                ..
            }
        ));
        assert_eq!(recorder.lock().unwrap().opens, 0);
    }

    #[tokio::test]
    async fn test_plain_scheme_variants_publish_without_certificates() {
        for endpoint in ["tcp://127.0.0.1:1883", "MQTT://127.0.0.1:1883"] {
            let section = MqttSection {
                endpoint: endpoint.to_string(),
                ..MqttSection::default()
            };
            let mock = MockSession::acknowledging();
            let recorder = mock.recorder();

            let result =
                publish_with(&section, &StaticSecrets::new(), "hello", move |_| Ok(mock)).await;

            assert!(result.is_success(), "{endpoint}: {result:?}");
            assert_eq!(recorder.lock().unwrap().calls.len(), 1);
        }
    }

    #[tokio::test]
    async fn test_publish_without_certificates_is_configuration_failure() {
        let result = publish_with(
            &MqttSection::default(),
            &StaticSecrets::new(),
            "hello",
            |_| Ok(MockSession::acknowledging()),
        )
        .await;

        assert!(matches!(
            result,
            CallResult::Failure {
                kind: ErrorKind::Configuration,
                ..
            }
        ));
    }
}
