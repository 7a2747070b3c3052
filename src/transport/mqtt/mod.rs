//! MQTT publish session
//!
//! Split the same way as the rest of the transport code: pure option
//! building lives in [`connection`], the I/O that drives the rumqttc event
//! loop lives in [`session`].
//!
//! # Usage
//!
//! ```rust,no_run
//! use cloud_helpers::config::{MqttSection, ProcessSecrets};
//! use cloud_helpers::envelope::{build_publish_envelope, DeliveryGuarantee};
//! use cloud_helpers::transport::{MqttSession, Session};
//!
//! # tokio_test::block_on(async {
//! let section = MqttSection::default();
//! let identity = section.identity(&ProcessSecrets)?;
//! let mut session = MqttSession::new(identity, &section)?;
//! session.open().await?;
//! let envelope = build_publish_envelope(&section.topic, "hello", DeliveryGuarantee::AtLeastOnce)?;
//! session.call(&envelope).await?;
//! session.close().await?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! # });
//! ```

pub mod connection;
pub mod session;

pub use connection::{configure_mqtt_options, MqttError};
pub use session::MqttSession;
