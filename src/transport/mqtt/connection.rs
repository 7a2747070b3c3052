//! Pure MQTT option building
//!
//! Turns an [`EndpointIdentity`] plus broker settings into rumqttc
//! [`MqttOptions`] without touching the network.

use crate::config::{broker_scheme_uses_tls, ConfigError, MqttSection};
use crate::envelope::DeliveryGuarantee;
use crate::error::CallError;
use crate::identity::{AuthMaterial, EndpointIdentity};
use rumqttc::{MqttOptions, QoS, TlsConfiguration, Transport};
use std::time::Duration;
use thiserror::Error;
use url::Url;

const DEFAULT_TLS_PORT: u16 = 8883;
const DEFAULT_TCP_PORT: u16 = 1883;

/// MQTT transport errors
#[derive(Debug, Error)]
pub enum MqttError {
    #[error("Invalid broker URL: {0}")]
    InvalidBrokerUrl(String),
    #[error("Broker URL {url} requires {expected} credentials, got {actual}")]
    CredentialMismatch {
        url: String,
        expected: &'static str,
        actual: &'static str,
    },
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Publishing failed: {0}")]
    PublishFailed(String),
    #[error("Session is not open")]
    NotConnected,
    #[error("Session is already open")]
    AlreadyOpen,
    #[error("Timed out after {timeout:?} waiting for {waiting_for}")]
    Timeout {
        timeout: Duration,
        waiting_for: &'static str,
    },
}

impl From<MqttError> for CallError {
    fn from(error: MqttError) -> Self {
        match error {
            MqttError::InvalidBrokerUrl(_) | MqttError::CredentialMismatch { .. } => {
                CallError::Configuration(ConfigError::InvalidConfig(error.to_string()))
            }
            other => CallError::connection(other.to_string()),
        }
    }
}

/// Map the envelope delivery guarantee onto an MQTT QoS level
pub fn qos_for(guarantee: DeliveryGuarantee) -> QoS {
    match guarantee {
        DeliveryGuarantee::AtMostOnce => QoS::AtMostOnce,
        DeliveryGuarantee::AtLeastOnce => QoS::AtLeastOnce,
    }
}

/// Build rumqttc options for a single clean, short-lived connection
///
/// `mqtts://` endpoints require mutual-TLS material and default to port
/// 8883; `mqtt://` endpoints connect over plain TCP on 1883.
pub fn configure_mqtt_options(
    identity: &EndpointIdentity,
    section: &MqttSection,
) -> Result<MqttOptions, MqttError> {
    let url = Url::parse(&identity.address)
        .map_err(|_| MqttError::InvalidBrokerUrl(identity.address.clone()))?;

    let host = url
        .host_str()
        .filter(|host| !host.is_empty())
        .ok_or_else(|| MqttError::InvalidBrokerUrl(identity.address.clone()))?;

    let use_tls = broker_scheme_uses_tls(url.scheme())
        .ok_or_else(|| MqttError::InvalidBrokerUrl(identity.address.clone()))?;
    let port = url
        .port()
        .unwrap_or(if use_tls { DEFAULT_TLS_PORT } else { DEFAULT_TCP_PORT });

    let mut mqtt_options = MqttOptions::new(identity.client_id.clone(), host, port);

    match (&identity.auth, use_tls) {
        (
            AuthMaterial::MutualTls {
                client_cert,
                private_key,
                root_ca,
            },
            true,
        ) => {
            let tls_config = TlsConfiguration::Simple {
                ca: root_ca.clone(),
                alpn: None,
                client_auth: Some((client_cert.clone(), private_key.clone())),
            };
            mqtt_options.set_transport(Transport::Tls(tls_config));
        }
        (AuthMaterial::None, false) => {}
        (other, true) => {
            return Err(MqttError::CredentialMismatch {
                url: identity.address.clone(),
                expected: "mtls",
                actual: other.scheme(),
            })
        }
        (other, false) => {
            return Err(MqttError::CredentialMismatch {
                url: identity.address.clone(),
                expected: "none",
                actual: other.scheme(),
            })
        }
    }

    mqtt_options.set_keep_alive(Duration::from_secs(section.keep_alive_secs));
    mqtt_options.set_clean_session(section.clean_session);

    Ok(mqtt_options)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tls_identity(address: &str) -> EndpointIdentity {
        EndpointIdentity {
            address: address.to_string(),
            client_id: "client-1".to_string(),
            auth: AuthMaterial::MutualTls {
                client_cert: b"CERT".to_vec(),
                private_key: b"KEY".to_vec(),
                root_ca: b"CA".to_vec(),
            },
        }
    }

    fn plain_identity(address: &str) -> EndpointIdentity {
        EndpointIdentity {
            address: address.to_string(),
            client_id: "client-1".to_string(),
            auth: AuthMaterial::None,
        }
    }

    #[test]
    fn test_tls_endpoint_defaults_to_8883() {
        let options = configure_mqtt_options(
            &tls_identity("mqtts://abc-ats.iot.us-east-1.amazonaws.com"),
            &MqttSection::default(),
        )
        .unwrap();

        assert_eq!(
            options.broker_address(),
            ("abc-ats.iot.us-east-1.amazonaws.com".to_string(), 8883)
        );
        assert_eq!(options.client_id(), "client-1");
        assert_eq!(options.keep_alive(), Duration::from_secs(30));
        assert!(options.clean_session());
        assert!(matches!(options.transport(), Transport::Tls(_)));
    }

    #[test]
    fn test_plain_endpoint_uses_tcp() {
        let options = configure_mqtt_options(
            &plain_identity("mqtt://localhost:1884"),
            &MqttSection::default(),
        )
        .unwrap();

        assert_eq!(options.broker_address(), ("localhost".to_string(), 1884));
        assert!(matches!(options.transport(), Transport::Tcp));
    }

    #[test]
    fn test_tcp_and_upper_case_schemes_are_plain() {
        for address in ["tcp://localhost", "MQTT://localhost"] {
            let options =
                configure_mqtt_options(&plain_identity(address), &MqttSection::default()).unwrap();
            assert_eq!(options.broker_address(), ("localhost".to_string(), 1883));
            assert!(matches!(options.transport(), Transport::Tcp));
        }
    }

    #[test]
    fn test_placeholder_endpoint_is_invalid() {
        let result = configure_mqtt_options(
            &tls_identity("mqtts://<ID>-ats.iot.us-east-1.amazonaws.com:8883"),
            &MqttSection::default(),
        );
        assert!(matches!(result, Err(MqttError::InvalidBrokerUrl(_))));
    }

    #[test]
    fn test_unknown_scheme_is_invalid() {
        let result =
            configure_mqtt_options(&tls_identity("https://broker:8883"), &MqttSection::default());
        assert!(matches!(result, Err(MqttError::InvalidBrokerUrl(_))));
    }

    #[test]
    fn test_tls_endpoint_without_certificates() {
        let result =
            configure_mqtt_options(&plain_identity("mqtts://broker"), &MqttSection::default());
        assert!(matches!(
            result,
            Err(MqttError::CredentialMismatch { expected: "mtls", .. })
        ));
    }

    #[test]
    fn test_url_errors_become_configuration_errors() {
        let error: CallError = MqttError::InvalidBrokerUrl("bad".to_string()).into();
        assert_eq!(error.kind(), crate::error::ErrorKind::Configuration);

        let error: CallError = MqttError::NotConnected.into();
        assert_eq!(error.kind(), crate::error::ErrorKind::Connection);
    }

    #[test]
    fn test_qos_mapping() {
        assert_eq!(qos_for(DeliveryGuarantee::AtLeastOnce), QoS::AtLeastOnce);
        assert_eq!(qos_for(DeliveryGuarantee::AtMostOnce), QoS::AtMostOnce);
    }
}
