//! I/O side of the MQTT session
//!
//! The rumqttc event loop is polled inline: `open` drives it until CONNACK,
//! `call` until the PUBACK for the published packet, `close` until the
//! DISCONNECT has gone out. No background task is spawned.

use super::connection::{configure_mqtt_options, qos_for, MqttError};
use crate::config::MqttSection;
use crate::envelope::{CallParams, Envelope};
use crate::error::CallError;
use crate::identity::EndpointIdentity;
use crate::outcome::Response;
use crate::transport::Session;
use async_trait::async_trait;
use rumqttc::{
    AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS,
};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Requests buffered between the client handle and the event loop
const REQUEST_CHANNEL_CAPACITY: usize = 10;

/// Upper bound for flushing DISCONNECT on close
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Single-publish MQTT session
pub struct MqttSession {
    identity: EndpointIdentity,
    options: MqttOptions,
    timeout: Duration,
    connection: Option<(AsyncClient, EventLoop)>,
}

impl MqttSession {
    /// Prepare a session; fails only on invalid configuration
    pub fn new(identity: EndpointIdentity, section: &MqttSection) -> Result<Self, CallError> {
        let options = configure_mqtt_options(&identity, section)?;
        Ok(Self {
            identity,
            options,
            timeout: Duration::from_secs(section.timeout_secs),
            connection: None,
        })
    }
}

/// Run `fut` under `timeout`
async fn bounded<T>(
    timeout: Duration,
    waiting_for: &'static str,
    fut: impl Future<Output = Result<T, MqttError>>,
) -> Result<T, MqttError> {
    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| MqttError::Timeout {
            timeout,
            waiting_for,
        })?
}

/// Poll until the broker accepts the connection
async fn wait_for_connack(event_loop: &mut EventLoop) -> Result<(), MqttError> {
    loop {
        match event_loop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                if ack.code == ConnectReturnCode::Success {
                    return Ok(());
                }
                return Err(MqttError::ConnectionFailed(format!(
                    "broker refused connection: {:?}",
                    ack.code
                )));
            }
            Ok(event) => {
                debug!(target: "mqtt_transport", "MQTT event before ConnAck: {:?}", event);
            }
            Err(e) => return Err(MqttError::ConnectionFailed(e.to_string())),
        }
    }
}

/// Poll until the publish is confirmed at the requested QoS
///
/// QoS 0 completes once the packet has been written; QoS 1 waits for the
/// PUBACK carrying the packet id rumqttc assigned.
async fn wait_for_delivery(event_loop: &mut EventLoop, qos: QoS) -> Result<(), MqttError> {
    let mut packet_id: Option<u16> = None;
    loop {
        match event_loop.poll().await {
            Ok(Event::Outgoing(Outgoing::Publish(pkid))) => {
                if qos == QoS::AtMostOnce {
                    return Ok(());
                }
                debug!(target: "mqtt_transport", "Publish sent with packet id {}", pkid);
                packet_id = Some(pkid);
            }
            Ok(Event::Incoming(Packet::PubAck(ack))) if Some(ack.pkid) == packet_id => {
                return Ok(());
            }
            Ok(Event::Incoming(Packet::Disconnect)) => {
                return Err(MqttError::PublishFailed(
                    "broker closed the session before acknowledging".to_string(),
                ));
            }
            Ok(event) => {
                debug!(target: "mqtt_transport", "MQTT event: {:?}", event);
            }
            Err(e) => return Err(MqttError::PublishFailed(e.to_string())),
        }
    }
}

/// Poll until DISCONNECT has been written or the connection ends
async fn drain_until_disconnected(event_loop: &mut EventLoop) {
    loop {
        match event_loop.poll().await {
            Ok(Event::Outgoing(Outgoing::Disconnect)) => return,
            Ok(_) => continue,
            Err(e) => {
                debug!(target: "mqtt_transport", "Event loop ended during close: {}", e);
                return;
            }
        }
    }
}

#[async_trait]
impl Session for MqttSession {
    fn name(&self) -> &str {
        "mqtt"
    }

    fn is_open(&self) -> bool {
        self.connection.is_some()
    }

    async fn open(&mut self) -> Result<(), CallError> {
        if self.connection.is_some() {
            return Err(MqttError::AlreadyOpen.into());
        }

        info!(
            endpoint = %self.identity.address,
            client_id = %self.identity.client_id,
            auth = self.identity.auth.scheme(),
            "Connecting to MQTT broker"
        );

        let (client, mut event_loop) =
            AsyncClient::new(self.options.clone(), REQUEST_CHANNEL_CAPACITY);
        bounded(self.timeout, "ConnAck", wait_for_connack(&mut event_loop)).await?;

        info!("MQTT connection established");
        self.connection = Some((client, event_loop));
        Ok(())
    }

    async fn call(&mut self, envelope: &Envelope) -> Result<Response, CallError> {
        let (qos, retain) = match envelope.params {
            CallParams::Delivery { qos, retain } => (qos_for(qos), retain),
            CallParams::Sampling { .. } => {
                return Err(CallError::validation(
                    "MQTT sessions only accept delivery envelopes",
                ))
            }
        };
        let payload = envelope.payload.to_bytes()?;

        let timeout = self.timeout;
        let (client, event_loop) = self.connection.as_mut().ok_or(MqttError::NotConnected)?;

        client
            .publish(envelope.destination.as_str(), qos, retain, payload)
            .await
            .map_err(|e| MqttError::PublishFailed(e.to_string()))?;

        bounded(timeout, "PubAck", wait_for_delivery(event_loop, qos)).await?;

        info!(
            topic = %envelope.destination,
            envelope_id = %envelope.id,
            qos = ?qos,
            "Publish acknowledged"
        );
        Ok(Response::Acknowledged {
            destination: envelope.destination.clone(),
        })
    }

    async fn close(&mut self) -> Result<(), CallError> {
        let Some((client, mut event_loop)) = self.connection.take() else {
            return Ok(());
        };

        if let Err(e) = client.disconnect().await {
            warn!("Failed to queue MQTT disconnect: {}", e);
            return Err(MqttError::ConnectionFailed(e.to_string()).into());
        }

        if tokio::time::timeout(CLOSE_TIMEOUT, drain_until_disconnected(&mut event_loop))
            .await
            .is_err()
        {
            warn!("MQTT disconnect did not flush within {:?}", CLOSE_TIMEOUT);
        }

        info!("MQTT client disconnected");
        Ok(())
    }
}
