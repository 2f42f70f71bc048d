//! MQTT relay command channel for Hestia
//!
//! Relay drives are published as four independent absolute on/off commands,
//! one per terminal, to `<prefix>/relayL1/command` through `relayN`. The
//! commands always assert the full desired state rather than a delta, so a
//! dropped message self-heals on the next drive for that terminal.
//!
//! A background task polls the client event loop to keep the connection and
//! keepalives alive; it never touches control state.

use crate::config::MqttConfig;
use crate::error::{HestiaError, Result};
use crate::logging::get_logger;
use crate::relay::RelayPattern;
use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Sink for relay drives produced by the control loop
#[async_trait]
pub trait RelayCommander: Send + Sync {
    /// Assert the given terminal states on the physical relays
    async fn drive(&self, pattern: RelayPattern) -> Result<()>;

    /// Release the command channel; called once after the final off drive
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Relay commander publishing over MQTT
pub struct MqttCommander {
    client: AsyncClient,
    topic_prefix: String,
    logger: crate::logging::StructuredLogger,
}

impl MqttCommander {
    /// Connect to the broker and spawn the event-loop maintenance task
    ///
    /// The returned task runs until the process exits or the client is
    /// disconnected; it logs connection transitions and any messages seen
    /// on the status topic.
    pub async fn connect(config: &MqttConfig) -> Result<(Self, JoinHandle<()>)> {
        let logger = get_logger("mqtt");

        let mut options =
            MqttOptions::new(config.client_id.as_str(), config.host.as_str(), config.port);
        options.set_keep_alive(Duration::from_secs(config.keep_alive_secs));

        let (client, mut event_loop) = AsyncClient::new(options, config.channel_capacity);

        // Watch the status topic like the rest of the home automation does;
        // inbound messages are only logged, never acted on.
        client
            .subscribe(config.topic_prefix.as_str(), QoS::AtMostOnce)
            .await?;

        let task_logger = logger.clone();
        let task = tokio::spawn(async move {
            loop {
                match event_loop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        task_logger.info("Connected to MQTT broker");
                    }
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        task_logger.debug(&format!(
                            "Received `{}` on `{}`",
                            String::from_utf8_lossy(&publish.payload),
                            publish.topic
                        ));
                    }
                    Ok(Event::Incoming(Packet::Disconnect)) => {
                        task_logger.info("MQTT broker disconnected the client");
                    }
                    Ok(_) => {}
                    Err(e) => {
                        task_logger.error(&format!("MQTT connection error: {}", e));
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        });

        Ok((
            Self {
                client,
                topic_prefix: config.topic_prefix.clone(),
                logger,
            },
            task,
        ))
    }

    async fn publish_terminal(&self, terminal: &str, energize: bool) -> Result<()> {
        let topic = format!("{}/{}/command", self.topic_prefix, terminal);
        let payload = if energize { "on" } else { "off" };
        self.client
            .publish(topic.as_str(), QoS::AtLeastOnce, false, payload)
            .await?;
        self.logger
            .debug(&format!("Sent `{}` to topic `{}`", payload, topic));
        Ok(())
    }
}

#[async_trait]
impl RelayCommander for MqttCommander {
    async fn drive(&self, pattern: RelayPattern) -> Result<()> {
        // Attempt every terminal even if one publish fails; receivers
        // tolerate partial delivery and the next drive re-asserts state.
        let mut failed = 0usize;
        for (terminal, energize) in pattern.terminals() {
            if let Err(e) = self.publish_terminal(terminal, energize).await {
                self.logger
                    .error(&format!("Failed to publish to {}: {}", terminal, e));
                failed += 1;
            }
        }

        if failed > 0 {
            return Err(HestiaError::mqtt(format!(
                "{} of 4 relay commands failed to publish",
                failed
            )));
        }
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.client.disconnect().await?;
        Ok(())
    }
}
