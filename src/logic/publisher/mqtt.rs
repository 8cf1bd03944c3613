//! MQTT Transport (rumqttc)
//!
//! The rumqttc event loop is driven on a dedicated thread owning a
//! current-thread tokio runtime. Connection events are turned into
//! `ConnectionMonitor` notifications; on link loss the loop waits the retry
//! interval and polls again, which makes rumqttc reconnect.

use parking_lot::Mutex;
use rumqttc::{
    AsyncClient, ClientError, ConnectReturnCode, Event, EventLoop, MqttOptions, Packet, QoS, Transport,
};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tokio::sync::watch;

use super::state::ConnectionMonitor;
use super::transport::{PublishTransport, TransportError};
use crate::constants::MQTT_TLS_PORT;

/// Request channel capacity between the client handle and the event loop
const REQUEST_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub struct MqttSettings {
    pub broker: String,
    pub port: u16,
    pub client_id: String,
    pub keepalive: Duration,
    pub retry_interval: Duration,
}

impl MqttSettings {
    /// TLS is negotiated on the well-known secure port
    pub fn use_tls(&self) -> bool {
        self.port == MQTT_TLS_PORT
    }

    fn options(&self) -> MqttOptions {
        let mut options = MqttOptions::new(self.client_id.clone(), self.broker.clone(), self.port);
        options.set_keep_alive(self.keepalive);
        if self.use_tls() {
            options.set_transport(Transport::tls_with_default_config());
        }
        options
    }
}

struct Session {
    client: AsyncClient,
    shutdown: watch::Sender<bool>,
    worker: JoinHandle<()>,
}

pub struct MqttTransport {
    settings: MqttSettings,
    session: Mutex<Option<Session>>,
}

impl MqttTransport {
    pub fn new(settings: MqttSettings) -> Self {
        Self {
            settings,
            session: Mutex::new(None),
        }
    }

    pub fn settings(&self) -> &MqttSettings {
        &self.settings
    }
}

impl PublishTransport for MqttTransport {
    fn connect(&self, monitor: ConnectionMonitor) -> Result<(), TransportError> {
        let mut session = self.session.lock();
        if session.is_some() {
            return Ok(());
        }

        let (client, eventloop) = AsyncClient::new(self.settings.options(), REQUEST_CAPACITY);
        let (shutdown, shutdown_rx) = watch::channel(false);
        let retry_interval = self.settings.retry_interval;

        log::info!(
            "MQTT connecting to {} as {}{}",
            self.destination(),
            self.settings.client_id,
            if self.settings.use_tls() { " (TLS)" } else { "" }
        );

        let worker = thread::Builder::new()
            .name("mqtt-eventloop".into())
            .spawn(move || {
                let rt = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
                    Ok(rt) => rt,
                    Err(e) => {
                        log::error!("Failed to create tokio runtime for MQTT: {}", e);
                        monitor.notify_disconnected();
                        return;
                    }
                };
                rt.block_on(run_eventloop(eventloop, monitor, shutdown_rx, retry_interval));
            })
            .map_err(|e| TransportError::Setup(e.to_string()))?;

        *session = Some(Session {
            client,
            shutdown,
            worker,
        });
        Ok(())
    }

    fn send(&self, topic: &str, payload: &str) -> Result<(), TransportError> {
        let session = self.session.lock();
        let session = session.as_ref().ok_or(TransportError::NotConnected)?;
        session
            .client
            .try_publish(topic, QoS::AtLeastOnce, false, payload.as_bytes().to_vec())
            .map_err(|e| match e {
                // Event loop has not caught up with queued requests yet
                ClientError::TryRequest(_) => TransportError::Busy,
                other => TransportError::Publish(other.to_string()),
            })
    }

    fn disconnect(&self) {
        let Some(session) = self.session.lock().take() else {
            return;
        };

        if let Err(e) = session.client.try_disconnect() {
            log::debug!("MQTT disconnect request failed: {}", e);
        }
        let _ = session.shutdown.send(true);
        if session.worker.join().is_err() {
            log::error!("MQTT event loop thread panicked");
        }
        log::info!("MQTT disconnected from {}", self.destination());
    }

    fn destination(&self) -> String {
        format!("{}:{}", self.settings.broker, self.settings.port)
    }
}

impl Drop for MqttTransport {
    fn drop(&mut self) {
        self.disconnect();
    }
}

async fn run_eventloop(
    mut eventloop: EventLoop,
    monitor: ConnectionMonitor,
    mut shutdown: watch::Receiver<bool>,
    retry_interval: Duration,
) {
    monitor.notify_connecting();

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            event = eventloop.poll() => match event {
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    if ack.code == ConnectReturnCode::Success {
                        monitor.notify_connected();
                    } else {
                        log::error!("MQTT connect refused: {:?}", ack.code);
                        monitor.notify_disconnected();
                    }
                }
                Ok(Event::Incoming(Packet::Disconnect)) => {
                    monitor.notify_disconnected();
                }
                Ok(_) => {}
                Err(e) => {
                    log::warn!("MQTT connection error: {}", e);
                    monitor.notify_disconnected();
                    tokio::select! {
                        _ = shutdown.changed() => break,
                        _ = tokio::time::sleep(retry_interval) => {}
                    }
                    monitor.notify_connecting();
                }
            },
        }
    }

    monitor.notify_disconnected();
}
