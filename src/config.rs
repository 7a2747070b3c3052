//! Configuration for the broker and inference clients
//!
//! Settings come from an optional TOML file layered over built-in defaults.
//! Secret material (certificates, bearer tokens) is never stored in the file;
//! it is resolved through a [`SecretSource`] when an [`EndpointIdentity`] is
//! assembled, so nothing touches the network before credentials are known
//! to be present.

use crate::identity::{AuthMaterial, EndpointIdentity};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

/// Top-level configuration; both sections are optional in the file
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub mqtt: MqttSection,
    #[serde(default)]
    pub inference: InferenceSection,
}

/// Message-broker settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MqttSection {
    /// Broker URL, `mqtts://host[:port]` (or `mqtt://` for a local broker)
    #[serde(default = "default_mqtt_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_client_id")]
    pub client_id: String,
    /// Destination topic for the single publish
    #[serde(default = "default_topic")]
    pub topic: String,
    #[serde(default = "default_cert_file")]
    pub cert_file: PathBuf,
    #[serde(default = "default_key_file")]
    pub key_file: PathBuf,
    #[serde(default = "default_ca_file")]
    pub ca_file: PathBuf,
    #[serde(default = "default_keep_alive")]
    pub keep_alive_secs: u64,
    #[serde(default = "default_clean_session")]
    pub clean_session: bool,
    /// Upper bound for connect and publish acknowledgement
    #[serde(default = "default_mqtt_timeout")]
    pub timeout_secs: u64,
}

fn default_mqtt_endpoint() -> String {
    "mqtts://<ID>-ats.iot.us-east-1.amazonaws.com:8883".to_string()
}

fn default_client_id() -> String {
    "client-1".to_string()
}

fn default_topic() -> String {
    "topic/hello".to_string()
}

fn default_cert_file() -> PathBuf {
    PathBuf::from("certs/certificate.pem.crt")
}

fn default_key_file() -> PathBuf {
    PathBuf::from("certs/private.pem.key")
}

fn default_ca_file() -> PathBuf {
    PathBuf::from("certs/AmazonRootCA1.pem")
}

fn default_keep_alive() -> u64 {
    30
}

fn default_clean_session() -> bool {
    true
}

fn default_mqtt_timeout() -> u64 {
    30
}

impl Default for MqttSection {
    fn default() -> Self {
        Self {
            endpoint: default_mqtt_endpoint(),
            client_id: default_client_id(),
            topic: default_topic(),
            cert_file: default_cert_file(),
            key_file: default_key_file(),
            ca_file: default_ca_file(),
            keep_alive_secs: default_keep_alive(),
            clean_session: default_clean_session(),
            timeout_secs: default_mqtt_timeout(),
        }
    }
}

/// Text-generation endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InferenceSection {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Model identifier, e.g. `amazon.nova-lite-v1:0`
    #[serde(default = "default_model")]
    pub model: String,
    /// Environment variable holding the bearer credential
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default = "default_inference_timeout")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://bedrock-runtime.us-east-1.amazonaws.com".to_string()
}

fn default_model() -> String {
    "amazon.nova-lite-v1:0".to_string()
}

fn default_api_key_env() -> String {
    "AWS_BEARER_TOKEN_BEDROCK".to_string()
}

fn default_max_tokens() -> u32 {
    512
}

fn default_temperature() -> f32 {
    0.5
}

fn default_top_p() -> f32 {
    0.9
}

fn default_inference_timeout() -> u64 {
    60
}

impl Default for InferenceSection {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            timeout_secs: default_inference_timeout(),
        }
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),
    #[error("Failed to read credential file '{}': {source}", .path.display())]
    CredentialFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Source of secrets: environment variables and credential files
///
/// The process implementation is [`ProcessSecrets`]; tests substitute an
/// in-memory source so identity assembly never touches the real environment.
pub trait SecretSource: Send + Sync {
    /// Look up an environment-style variable
    fn env_var(&self, name: &str) -> Option<String>;

    /// Read a credential file in full
    fn read_file(&self, path: &Path) -> std::io::Result<Vec<u8>>;
}

/// Reads from the process environment and the local filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessSecrets;

impl SecretSource for ProcessSecrets {
    fn env_var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }

    fn read_file(&self, path: &Path) -> std::io::Result<Vec<u8>> {
        std::fs::read(path)
    }
}

impl AppConfig {
    /// Load configuration from a TOML file and validate it
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check ranges and required fields
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.mqtt.validate()?;
        self.inference.validate()
    }
}

impl MqttSection {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.client_id.is_empty() {
            return Err(ConfigError::InvalidConfig(
                "mqtt.client_id must not be empty".to_string(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "mqtt.timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether the endpoint requires the mutual-TLS material
    ///
    /// An endpoint that does not parse counts as TLS; option building
    /// rejects it afterwards.
    pub fn uses_tls(&self) -> bool {
        Url::parse(&self.endpoint)
            .ok()
            .and_then(|url| broker_scheme_uses_tls(url.scheme()))
            .unwrap_or(true)
    }

    /// Assemble the broker identity, loading certificate material
    pub fn identity(&self, secrets: &dyn SecretSource) -> Result<EndpointIdentity, ConfigError> {
        let auth = if self.uses_tls() {
            AuthMaterial::MutualTls {
                client_cert: read_credential(secrets, &self.cert_file)?,
                private_key: read_credential(secrets, &self.key_file)?,
                root_ca: read_credential(secrets, &self.ca_file)?,
            }
        } else {
            AuthMaterial::None
        };

        Ok(EndpointIdentity {
            address: self.endpoint.clone(),
            client_id: self.client_id.clone(),
            auth,
        })
    }
}

impl InferenceSection {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_tokens == 0 {
            return Err(ConfigError::InvalidConfig(
                "inference.max_tokens must be greater than zero".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(ConfigError::InvalidConfig(format!(
                "inference.temperature {} is outside 0.0..=1.0",
                self.temperature
            )));
        }
        if !(0.0..=1.0).contains(&self.top_p) {
            return Err(ConfigError::InvalidConfig(format!(
                "inference.top_p {} is outside 0.0..=1.0",
                self.top_p
            )));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "inference.timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Assemble the inference identity; the bearer credential must be set
    /// and non-empty
    pub fn identity(&self, secrets: &dyn SecretSource) -> Result<EndpointIdentity, ConfigError> {
        let token = secrets
            .env_var(&self.api_key_env)
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| ConfigError::EnvVarNotFound(self.api_key_env.clone()))?;

        Ok(EndpointIdentity {
            address: self.base_url.trim_end_matches('/').to_string(),
            client_id: env!("CARGO_PKG_NAME").to_string(),
            auth: AuthMaterial::Bearer { token },
        })
    }
}

/// Transport security for a broker URL scheme, `None` if unsupported
pub fn broker_scheme_uses_tls(scheme: &str) -> Option<bool> {
    match scheme.to_ascii_lowercase().as_str() {
        "mqtts" | "ssl" => Some(true),
        "mqtt" | "tcp" => Some(false),
        _ => None,
    }
}

fn read_credential(secrets: &dyn SecretSource, path: &Path) -> Result<Vec<u8>, ConfigError> {
    secrets
        .read_file(path)
        .map_err(|source| ConfigError::CredentialFile {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StaticSecrets;

    #[test]
    fn test_defaults_match_reference_setup() {
        let config = AppConfig::default();
        assert_eq!(config.mqtt.client_id, "client-1");
        assert_eq!(config.mqtt.topic, "topic/hello");
        assert_eq!(config.mqtt.keep_alive_secs, 30);
        assert!(config.mqtt.clean_session);
        assert_eq!(config.inference.model, "amazon.nova-lite-v1:0");
        assert_eq!(config.inference.max_tokens, 512);
        assert_eq!(config.inference.temperature, 0.5);
    }

    #[test]
    fn test_empty_toml_yields_defaults() {
        let config = AppConfig::from_toml_str("").unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
[inference]
model = "amazon.nova-micro-v1:0"
"#,
        )
        .unwrap();

        assert_eq!(config.inference.model, "amazon.nova-micro-v1:0");
        assert_eq!(config.inference.max_tokens, 512);
        assert_eq!(config.mqtt, MqttSection::default());
    }

    #[test]
    fn test_temperature_out_of_range_rejected() {
        let result = AppConfig::from_toml_str(
            r#"
[inference]
temperature = 1.5
"#,
        );
        assert!(matches!(result, Err(ConfigError::InvalidConfig(_))));
    }

    #[test]
    fn test_empty_client_id_rejected() {
        let result = AppConfig::from_toml_str(
            r#"
[mqtt]
client_id = ""
"#,
        );
        assert!(matches!(result, Err(ConfigError::InvalidConfig(_))));
    }

    #[test]
    fn test_inference_identity_requires_token() {
        let section = InferenceSection::default();
        let result = section.identity(&StaticSecrets::new());
        match result {
            Err(ConfigError::EnvVarNotFound(name)) => assert_eq!(name, "AWS_BEARER_TOKEN_BEDROCK"),
            other => panic!("Expected EnvVarNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_inference_identity_rejects_blank_token() {
        let secrets = StaticSecrets::new().with_env("AWS_BEARER_TOKEN_BEDROCK", "   ");
        let result = InferenceSection::default().identity(&secrets);
        assert!(matches!(result, Err(ConfigError::EnvVarNotFound(_))));
    }

    #[test]
    fn test_inference_identity_with_token() {
        let secrets = StaticSecrets::new().with_env("AWS_BEARER_TOKEN_BEDROCK", "tok");
        let section = InferenceSection {
            base_url: "https://example.test/".to_string(),
            ..Default::default()
        };

        let identity = section.identity(&secrets).unwrap();
        assert_eq!(identity.address, "https://example.test");
        assert_eq!(
            identity.auth,
            AuthMaterial::Bearer {
                token: "tok".to_string()
            }
        );
    }

    #[test]
    fn test_mqtt_identity_loads_all_pem_files() {
        let secrets = StaticSecrets::new()
            .with_file("certs/certificate.pem.crt", b"CERT")
            .with_file("certs/private.pem.key", b"KEY")
            .with_file("certs/AmazonRootCA1.pem", b"CA");

        let identity = MqttSection::default().identity(&secrets).unwrap();
        assert_eq!(identity.client_id, "client-1");
        assert_eq!(
            identity.auth,
            AuthMaterial::MutualTls {
                client_cert: b"CERT".to_vec(),
                private_key: b"KEY".to_vec(),
                root_ca: b"CA".to_vec(),
            }
        );
    }

    #[test]
    fn test_mqtt_identity_missing_key_file() {
        let secrets = StaticSecrets::new()
            .with_file("certs/certificate.pem.crt", b"CERT")
            .with_file("certs/AmazonRootCA1.pem", b"CA");

        let result = MqttSection::default().identity(&secrets);
        match result {
            Err(ConfigError::CredentialFile { path, .. }) => {
                assert_eq!(path, PathBuf::from("certs/private.pem.key"))
            }
            other => panic!("Expected CredentialFile error, got {other:?}"),
        }
    }

    #[test]
    fn test_scheme_decides_tls_regardless_of_case() {
        for endpoint in [
            "tcp://127.0.0.1:1883",
            "MQTT://127.0.0.1:1883",
            "Tcp://broker.local",
        ] {
            let section = MqttSection {
                endpoint: endpoint.to_string(),
                ..Default::default()
            };
            assert!(!section.uses_tls(), "{endpoint} should be plain");
            let identity = section.identity(&StaticSecrets::new()).unwrap();
            assert_eq!(identity.auth, AuthMaterial::None);
        }

        for endpoint in ["mqtts://broker:8883", "SSL://broker", "MQTTS://broker"] {
            let section = MqttSection {
                endpoint: endpoint.to_string(),
                ..Default::default()
            };
            assert!(section.uses_tls(), "{endpoint} should use TLS");
        }
    }

    #[test]
    fn test_broker_scheme_table() {
        assert_eq!(broker_scheme_uses_tls("mqtts"), Some(true));
        assert_eq!(broker_scheme_uses_tls("TCP"), Some(false));
        assert_eq!(broker_scheme_uses_tls("https"), None);
    }

    #[test]
    fn test_plain_endpoint_skips_certificates() {
        let section = MqttSection {
            endpoint: "mqtt://localhost:1883".to_string(),
            ..Default::default()
        };

        let identity = section.identity(&StaticSecrets::new()).unwrap();
        assert_eq!(identity.auth, AuthMaterial::None);
    }
}
