//! Runtime Configuration
//!
//! One typed configuration, layered as: defaults from `constants.rs`, then an
//! optional TOML file, then environment overrides. Validated once at startup.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::constants::*;
use crate::logic::features::{Band, FeatureExtractor};
use crate::logic::handshake::HandshakeSettings;
use crate::logic::publisher::{DrainFailurePolicy, MqttSettings, PublisherSettings};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("configuration validation failed:\n  - {}", .0.join("\n  - "))]
    Invalid(Vec<String>),
}

// ============================================================================
// SECTIONS
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    pub sampling_rate_hz: f64,
    /// Sample ring buffer capacity
    pub buffer_size: usize,
    pub max_consecutive_errors: u32,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            sampling_rate_hz: DEFAULT_SAMPLING_RATE_HZ,
            buffer_size: DEFAULT_SAMPLE_BUFFER_SIZE,
            max_consecutive_errors: DEFAULT_MAX_SENSOR_ERRORS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionConfig {
    /// Readings per extraction batch
    pub batch_size: usize,
    pub send_interval_ms: u64,
    pub offline_queue_size: usize,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            send_interval_ms: DEFAULT_SEND_INTERVAL_MS,
            offline_queue_size: DEFAULT_OFFLINE_QUEUE_SIZE,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    pub broker: String,
    pub port: u16,
    pub topic: String,
    /// Falls back to `rail_sensor_<hostname>`
    pub client_id: Option<String>,
    pub keepalive_secs: u64,
    pub retry_interval_secs: u64,
    pub drain_failure_policy: DrainFailurePolicy,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            broker: DEFAULT_BROKER.to_string(),
            port: DEFAULT_BROKER_PORT,
            topic: DEFAULT_TOPIC.to_string(),
            client_id: None,
            keepalive_secs: DEFAULT_KEEPALIVE_SECS,
            retry_interval_secs: DEFAULT_RETRY_INTERVAL_SECS,
            drain_failure_policy: DrainFailurePolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    pub port: String,
    pub baudrate: u32,
    pub probe_message: String,
    pub attempts: u32,
    pub retry_delay_ms: u64,
    pub timeout_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_MODEM_PORT.to_string(),
            baudrate: DEFAULT_MODEM_BAUDRATE,
            probe_message: DEFAULT_PROBE_MESSAGE.to_string(),
            attempts: DEFAULT_PROBE_ATTEMPTS,
            retry_delay_ms: DEFAULT_PROBE_RETRY_DELAY_MS,
            timeout_ms: DEFAULT_PROBE_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeaturesConfig {
    pub min_samples: usize,
    pub bands: Vec<Band>,
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            min_samples: DEFAULT_MIN_SAMPLES,
            bands: DEFAULT_FREQUENCY_BANDS
                .iter()
                .map(|&(low, high)| Band::new(low, high))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub log_base: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            log_base: default_log_base(),
        }
    }
}

impl PathsConfig {
    pub fn raw_dir(&self) -> PathBuf {
        self.log_base.join("adxl345")
    }

    pub fn processed_dir(&self) -> PathBuf {
        self.log_base.join("processed")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    pub health_interval_secs: u64,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            health_interval_secs: DEFAULT_HEALTH_INTERVAL_SECS,
        }
    }
}

// ============================================================================
// CONFIG
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sensor: SensorConfig,
    pub collection: CollectionConfig,
    pub mqtt: MqttConfig,
    pub serial: SerialConfig,
    pub features: FeaturesConfig,
    pub paths: PathsConfig,
    pub system: SystemConfig,
}

impl Config {
    /// Load from `path` (or `RAIL_CONFIG_PATH`, or defaults when neither is
    /// set), then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| env::var(ENV_CONFIG_PATH).ok().map(PathBuf::from));

        let mut config = match path {
            Some(path) => {
                log::info!("Loading config from {}", path.display());
                let content = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
                    path: path.clone(),
                    source,
                })?;
                Self::from_toml(&content)?
            }
            None => Self::default(),
        };

        config.apply_overrides(|key| env::var(key).ok());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Apply `MQTT_BROKER`, `MQTT_PORT`, `MQTT_TOPIC`, `LOG_BASE_PATH`
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(broker) = get(ENV_BROKER) {
            log::info!("MQTT broker overridden from environment: {}", broker);
            self.mqtt.broker = broker;
        }
        if let Some(port) = get(ENV_BROKER_PORT) {
            match port.trim().parse() {
                Ok(port) => self.mqtt.port = port,
                Err(_) => log::warn!("Ignoring invalid {}={}", ENV_BROKER_PORT, port),
            }
        }
        if let Some(topic) = get(ENV_TOPIC) {
            log::info!("MQTT topic overridden from environment: {}", topic);
            self.mqtt.topic = topic;
        }
        if let Some(base) = get(ENV_LOG_BASE) {
            log::info!("Log paths overridden from environment: {}", base);
            self.paths.log_base = PathBuf::from(base);
        }
    }

    /// Check every setting; all problems are reported together
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        let rate = self.sensor.sampling_rate_hz;
        if !(rate.is_finite() && rate >= MIN_SAMPLING_RATE_HZ) {
            errors.push(format!(
                "sensor.sampling_rate_hz must be at least {} (got {})",
                MIN_SAMPLING_RATE_HZ, rate
            ));
        }
        if self.sensor.max_consecutive_errors == 0 {
            errors.push("sensor.max_consecutive_errors must be at least 1".to_string());
        }
        if self.sensor.buffer_size == 0 {
            errors.push("sensor.buffer_size must be at least 1".to_string());
        }

        if self.collection.batch_size < 2 {
            errors.push("collection.batch_size must be at least 2".to_string());
        }
        if self.collection.batch_size > self.sensor.buffer_size {
            errors.push(format!(
                "collection.batch_size ({}) exceeds sensor.buffer_size ({})",
                self.collection.batch_size, self.sensor.buffer_size
            ));
        }
        if self.collection.send_interval_ms == 0 {
            errors.push("collection.send_interval_ms must be positive".to_string());
        }
        if self.collection.offline_queue_size == 0 {
            errors.push("collection.offline_queue_size must be at least 1".to_string());
        }

        if self.mqtt.broker.trim().is_empty() {
            errors.push("mqtt.broker is required".to_string());
        }
        if self.mqtt.port == 0 {
            errors.push("mqtt.port must be in 1-65535".to_string());
        }
        if self.mqtt.topic.trim().is_empty() {
            errors.push("mqtt.topic is required".to_string());
        }
        if self.mqtt.retry_interval_secs < 1 {
            errors.push("mqtt.retry_interval_secs must be at least 1".to_string());
        }

        if self.serial.attempts == 0 {
            errors.push("serial.attempts must be at least 1".to_string());
        }
        if self.serial.probe_message.is_empty() {
            errors.push("serial.probe_message is required".to_string());
        }

        if self.features.min_samples == 0 {
            errors.push("features.min_samples must be at least 1".to_string());
        }
        if self.features.min_samples > self.collection.batch_size {
            errors.push(format!(
                "features.min_samples ({}) exceeds collection.batch_size ({})",
                self.features.min_samples, self.collection.batch_size
            ));
        }
        for band in &self.features.bands {
            if !(band.low >= 0.0 && band.low < band.high) {
                errors.push(format!("features.bands: invalid band [{}, {})", band.low, band.high));
            }
        }

        if self.system.health_interval_secs == 0 {
            errors.push("system.health_interval_secs must be positive".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(errors))
        }
    }

    // ========================================================================
    // Component settings
    // ========================================================================

    pub fn client_id(&self) -> String {
        self.mqtt.client_id.clone().unwrap_or_else(default_client_id)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.mqtt.retry_interval_secs)
    }

    pub fn send_interval(&self) -> Duration {
        Duration::from_millis(self.collection.send_interval_ms)
    }

    pub fn health_interval(&self) -> Duration {
        Duration::from_secs(self.system.health_interval_secs)
    }

    pub fn publisher_settings(&self) -> PublisherSettings {
        PublisherSettings {
            topic: self.mqtt.topic.clone(),
            queue_capacity: self.collection.offline_queue_size,
            retry_interval: self.retry_interval(),
            drain_failure_policy: self.mqtt.drain_failure_policy,
        }
    }

    pub fn mqtt_settings(&self) -> MqttSettings {
        MqttSettings {
            broker: self.mqtt.broker.clone(),
            port: self.mqtt.port,
            client_id: self.client_id(),
            keepalive: Duration::from_secs(self.mqtt.keepalive_secs),
            retry_interval: self.retry_interval(),
        }
    }

    pub fn handshake_settings(&self) -> HandshakeSettings {
        HandshakeSettings {
            message: self.serial.probe_message.as_bytes().to_vec(),
            attempts: self.serial.attempts,
            retry_delay: Duration::from_millis(self.serial.retry_delay_ms),
            timeout: Duration::from_millis(self.serial.timeout_ms),
        }
    }

    pub fn feature_extractor(&self) -> FeatureExtractor {
        FeatureExtractor::new(self.features.min_samples, self.features.bands.clone())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.mqtt.port, 8883);
        assert_eq!(config.mqtt.topic, "rail/vibration/data");
        assert_eq!(config.collection.batch_size, 10);
        assert_eq!(config.features.bands.len(), 3);
        assert_eq!(config.handshake_settings(), HandshakeSettings::default());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            [mqtt]
            broker = "mqtt.local"
            port = 1883
            drain_failure_policy = "drop"

            [features]
            bands = [{ low = 0.0, high = 5.0 }]
            "#,
        )
        .unwrap();

        assert_eq!(config.mqtt.broker, "mqtt.local");
        assert_eq!(config.mqtt.port, 1883);
        assert_eq!(config.mqtt.drain_failure_policy, DrainFailurePolicy::Drop);
        assert_eq!(config.mqtt.topic, DEFAULT_TOPIC);
        assert_eq!(config.mqtt.keepalive_secs, 60);
        assert_eq!(config.features.bands, vec![Band::new(0.0, 5.0)]);
        assert_eq!(config.features.min_samples, 5);
        assert_eq!(config.sensor.sampling_rate_hz, 20.0);
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let err = Config::from_toml("[mqtt]\nport = \"not a number\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_validation_collects_all_errors() {
        let mut config = Config::default();
        config.collection.offline_queue_size = 0;
        config.sensor.buffer_size = 0;
        config.mqtt.port = 0;

        match config.validate() {
            Err(ConfigError::Invalid(errors)) => {
                assert!(errors.iter().any(|e| e.contains("offline_queue_size")));
                assert!(errors.iter().any(|e| e.contains("buffer_size")));
                assert!(errors.iter().any(|e| e.contains("mqtt.port")));
            }
            other => panic!("expected validation errors, got {:?}", other),
        }
    }

    #[test]
    fn test_validation_rejects_bad_rate_and_band() {
        let mut config = Config::default();
        config.sensor.sampling_rate_hz = 0.0;
        config.features.bands.push(Band::new(50.0, 10.0));

        let Err(ConfigError::Invalid(errors)) = config.validate() else {
            panic!("expected validation errors");
        };
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_validation_rejects_tiny_rate_and_zero_error_limit() {
        let mut config = Config::default();
        config.sensor.sampling_rate_hz = 1e-300;
        config.sensor.max_consecutive_errors = 0;

        let Err(ConfigError::Invalid(errors)) = config.validate() else {
            panic!("expected validation errors");
        };
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().any(|e| e.contains("sampling_rate_hz")));
        assert!(errors.iter().any(|e| e.contains("max_consecutive_errors")));
    }

    #[test]
    fn test_environment_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_BROKER, "edge-broker"),
            (ENV_BROKER_PORT, "1883"),
            (ENV_TOPIC, "rail/test"),
            (ENV_LOG_BASE, "/tmp/rail-logs"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.mqtt.broker, "edge-broker");
        assert_eq!(config.mqtt.port, 1883);
        assert_eq!(config.mqtt.topic, "rail/test");
        assert_eq!(config.paths.raw_dir(), PathBuf::from("/tmp/rail-logs/adxl345"));
        assert_eq!(config.paths.processed_dir(), PathBuf::from("/tmp/rail-logs/processed"));
    }

    #[test]
    fn test_invalid_port_override_ignored() {
        let mut config = Config::default();
        config.apply_overrides(|key| (key == ENV_BROKER_PORT).then(|| "abc".to_string()));
        assert_eq!(config.mqtt.port, DEFAULT_BROKER_PORT);
    }

    #[test]
    fn test_component_settings() {
        let mut config = Config::default();
        config.mqtt.client_id = Some("unit-7".into());

        assert_eq!(config.mqtt_settings().client_id, "unit-7");
        assert_eq!(config.publisher_settings().queue_capacity, 1000);
        assert_eq!(config.publisher_settings().retry_interval, Duration::from_secs(10));
        assert_eq!(config.feature_extractor().min_samples(), 5);
    }
}
