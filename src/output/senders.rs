use async_trait::async_trait;
use log::{debug, info};
use rumqttc::{AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS};
use std::time::Duration;
use tokio::time::timeout;
use uuid::Uuid;

use crate::acquire::Reading;
use crate::config::MqttConfig;
use crate::utils::error::AcquireError;

#[async_trait]
pub trait ReadingSink: Send + Sync {
    async fn publish(&self, reading: &Reading) -> Result<(), AcquireError>;
    fn sink_type(&self) -> &str;
    fn destination(&self) -> String;
}

/// Fallback when no broker is configured: hand the reading to whoever is
/// watching stdout, as `timestamp,value`.
pub struct ConsoleSink;

#[async_trait]
impl ReadingSink for ConsoleSink {
    async fn publish(&self, reading: &Reading) -> Result<(), AcquireError> {
        println!("{},{}", reading.timestamp, reading.value);
        Ok(())
    }

    fn sink_type(&self) -> &str {
        "console"
    }

    fn destination(&self) -> String {
        "stdout".to_string()
    }
}

const KEEP_ALIVE: Duration = Duration::from_secs(60);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const ACK_TIMEOUT: Duration = Duration::from_secs(10);
const DISCONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Publishes one reading per call: connect, publish, disconnect. The
/// connection is never reused across calls, and disconnect is attempted
/// even when publish fails.
pub struct MqttSink {
    config: MqttConfig,
}

impl MqttSink {
    pub fn new(config: MqttConfig) -> Self {
        Self { config }
    }

    async fn await_connack(&self, eventloop: &mut EventLoop) -> Result<(), AcquireError> {
        let sink = self.destination();
        let wait = timeout(CONNECT_TIMEOUT, async {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                        if ack.code == ConnectReturnCode::Success {
                            return Ok(());
                        }
                        return Err(format!("broker rejected connection: {:?}", ack.code));
                    }
                    Ok(_) => continue,
                    Err(e) => return Err(e.to_string()),
                }
            }
        })
        .await;

        match wait {
            Ok(Ok(())) => Ok(()),
            Ok(Err(reason)) => Err(AcquireError::SinkConnect { sink, reason }),
            Err(_) => Err(AcquireError::SinkConnect {
                sink,
                reason: format!("no ConnAck within {:?}", CONNECT_TIMEOUT),
            }),
        }
    }

    async fn publish_payload(
        &self,
        client: &AsyncClient,
        eventloop: &mut EventLoop,
        payload: &str,
    ) -> Result<(), AcquireError> {
        let sink = self.destination();
        client
            .publish(self.config.topic.as_str(), QoS::AtLeastOnce, false, payload.as_bytes())
            .await
            .map_err(|e| AcquireError::SinkPublish {
                sink: sink.clone(),
                reason: e.to_string(),
            })?;

        // QoS 1: the publish only counts once the broker acknowledges it
        let wait = timeout(ACK_TIMEOUT, async {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::PubAck(_))) => return Ok(()),
                    Ok(_) => continue,
                    Err(e) => return Err(e.to_string()),
                }
            }
        })
        .await;

        match wait {
            Ok(Ok(())) => Ok(()),
            Ok(Err(reason)) => Err(AcquireError::SinkPublish { sink, reason }),
            Err(_) => Err(AcquireError::SinkPublish {
                sink,
                reason: format!("no PubAck within {:?}", ACK_TIMEOUT),
            }),
        }
    }

    async fn disconnect(
        &self,
        client: &AsyncClient,
        eventloop: &mut EventLoop,
    ) -> Result<(), AcquireError> {
        let sink = self.destination();
        client
            .disconnect()
            .await
            .map_err(|e| AcquireError::SinkDisconnect {
                sink: sink.clone(),
                reason: e.to_string(),
            })?;

        let wait = timeout(DISCONNECT_TIMEOUT, async {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Outgoing(Outgoing::Disconnect)) => return Ok(()),
                    Ok(_) => continue,
                    Err(e) => return Err(e.to_string()),
                }
            }
        })
        .await;

        match wait {
            Ok(Ok(())) => {
                debug!("Disconnected from MQTT broker {}", sink);
                Ok(())
            }
            Ok(Err(reason)) => Err(AcquireError::SinkDisconnect { sink, reason }),
            Err(_) => Err(AcquireError::SinkDisconnect {
                sink,
                reason: format!("disconnect not confirmed within {:?}", DISCONNECT_TIMEOUT),
            }),
        }
    }
}

#[async_trait]
impl ReadingSink for MqttSink {
    async fn publish(&self, reading: &Reading) -> Result<(), AcquireError> {
        let payload =
            serde_json::to_string(reading).map_err(|e| AcquireError::SinkPublish {
                sink: self.destination(),
                reason: format!("Failed to serialize reading: {}", e),
            })?;

        let client_id = format!("ranger-acquire-{}", Uuid::new_v4().simple());
        let mut options = MqttOptions::new(client_id, &self.config.broker, self.config.port);
        options.set_keep_alive(KEEP_ALIVE);
        if let (Some(username), Some(password)) =
            (self.config.username.as_ref(), self.config.password.as_ref())
        {
            options.set_credentials(username, password);
        }

        let (client, mut eventloop) = AsyncClient::new(options, 10);

        self.await_connack(&mut eventloop).await?;
        debug!(
            "Connected to MQTT broker {}:{}",
            self.config.broker, self.config.port
        );

        let published = self.publish_payload(&client, &mut eventloop, &payload).await;
        // Disconnect regardless of the publish outcome
        let disconnected = self.disconnect(&client, &mut eventloop).await;

        match (published, disconnected) {
            (Ok(()), Ok(())) => {
                info!(
                    "📻 Published to MQTT broker {}:{} on topic '{}': {}",
                    self.config.broker, self.config.port, self.config.topic, payload
                );
                Ok(())
            }
            (Ok(()), Err(disconnect_err)) => Err(disconnect_err),
            (Err(publish_err), Ok(())) => Err(publish_err),
            (Err(publish_err), Err(disconnect_err)) => {
                Err(publish_err.with_cleanup(disconnect_err))
            }
        }
    }

    fn sink_type(&self) -> &str {
        "mqtt"
    }

    fn destination(&self) -> String {
        format!(
            "{}:{}/{}",
            self.config.broker, self.config.port, self.config.topic
        )
    }
}
