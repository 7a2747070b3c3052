//! Transport sessions
//!
//! A [`Session`] wraps one underlying client (an MQTT connection or an HTTPS
//! inference client) and performs exactly one blocking request/response
//! exchange between `open` and `close`. The trait is the seam that lets the
//! runner and reporter be exercised against mocks.

use crate::envelope::Envelope;
use crate::error::CallError;
use crate::outcome::Response;

pub mod inference;
pub mod mqtt;

/// One open channel to a remote service
#[async_trait::async_trait]
pub trait Session: Send {
    /// Short name used in logs ("mqtt", "inference", ...)
    fn name(&self) -> &str;

    /// Whether `open` has succeeded and `close` has not been called yet
    fn is_open(&self) -> bool;

    /// Establish the channel; returns once it is confirmed ready
    async fn open(&mut self) -> Result<(), CallError>;

    /// Send one envelope and wait for its single response
    async fn call(&mut self, envelope: &Envelope) -> Result<Response, CallError>;

    /// Release the channel; safe to call on a session that never opened
    async fn close(&mut self) -> Result<(), CallError>;
}

pub use inference::InferenceSession;
pub use mqtt::MqttSession;
