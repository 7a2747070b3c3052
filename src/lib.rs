//! Cloud helpers - one-shot remote calls
//!
//! Two small clients share one shape: open a session, send one request,
//! wait for one result, report it, close.
//!
//! - MQTT publish over mutual TLS, waiting for the broker acknowledgement
//! - Text generation against a hosted model endpoint with a bearer token
//!
//! # Quick Start
//!
//! ```rust
//! use cloud_helpers::envelope::{build_publish_envelope, DeliveryGuarantee};
//! use cloud_helpers::testing::MockSession;
//! use cloud_helpers::runner::run_once;
//!
//! # tokio_test::block_on(async {
//! let envelope =
//!     build_publish_envelope("topic/hello", "hello", DeliveryGuarantee::AtLeastOnce).unwrap();
//! let mut session = MockSession::acknowledging();
//!
//! let result = run_once(&mut session, &envelope).await;
//! assert!(result.is_success());
//! assert_eq!(session.close_count(), 1);
//! # });
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod envelope;
pub mod error;
pub mod identity;
pub mod observability;
pub mod outcome;
pub mod report;
pub mod runner;
pub mod testing;
pub mod transport;

pub use config::{AppConfig, ConfigError, ProcessSecrets, SecretSource};
pub use envelope::{CallParams, DeliveryGuarantee, Envelope, Payload};
pub use error::{CallError, ErrorKind};
pub use identity::{AuthMaterial, EndpointIdentity};
pub use outcome::{CallResult, Response};
pub use report::{ExitStatus, Reporter};
pub use runner::run_once;
pub use transport::{InferenceSession, MqttSession, Session};
