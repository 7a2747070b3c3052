//! Endpoint identity handed to a session at construction time

use std::fmt;

/// Where to connect, who we are, and how we prove it
#[derive(Clone, PartialEq, Eq)]
pub struct EndpointIdentity {
    /// Broker URL or inference base URL
    pub address: String,
    /// MQTT client id, or a client label for HTTP endpoints
    pub client_id: String,
    pub auth: AuthMaterial,
}

/// Authentication material, already loaded into memory
#[derive(Clone, PartialEq, Eq)]
pub enum AuthMaterial {
    /// PEM-encoded client certificate, private key and root CA
    MutualTls {
        client_cert: Vec<u8>,
        private_key: Vec<u8>,
        root_ca: Vec<u8>,
    },
    /// Bearer token sent with every request
    Bearer { token: String },
    /// No authentication (local development brokers only)
    None,
}

impl AuthMaterial {
    pub fn scheme(&self) -> &'static str {
        match self {
            AuthMaterial::MutualTls { .. } => "mtls",
            AuthMaterial::Bearer { .. } => "bearer",
            AuthMaterial::None => "none",
        }
    }
}

// Secrets never reach Debug output, so identities can be logged freely.
impl fmt::Debug for AuthMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthMaterial::MutualTls {
                client_cert,
                private_key: _,
                root_ca,
            } => f
                .debug_struct("MutualTls")
                .field("client_cert_bytes", &client_cert.len())
                .field("private_key", &"***")
                .field("root_ca_bytes", &root_ca.len())
                .finish(),
            AuthMaterial::Bearer { .. } => f.debug_struct("Bearer").field("token", &"***").finish(),
            AuthMaterial::None => f.write_str("None"),
        }
    }
}

impl fmt::Debug for EndpointIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointIdentity")
            .field("address", &self.address)
            .field("client_id", &self.client_id)
            .field("auth", &self.auth)
            .finish()
    }
}
