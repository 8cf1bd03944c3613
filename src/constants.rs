//! Central Configuration Constants
//!
//! Single source of truth for all configuration defaults.
//! `logic::config::Config::default()` is built from these values.

/// Default MQTT broker (public broker exposing both 1883 and 8883)
pub const DEFAULT_BROKER: &str = "broker.emqx.io";

/// Well-known secure MQTT port. TLS is negotiated when the broker port matches.
pub const MQTT_TLS_PORT: u16 = 8883;

/// Default MQTT port (secure port gets through most carrier firewalls)
pub const DEFAULT_BROKER_PORT: u16 = MQTT_TLS_PORT;

/// Default publish topic
pub const DEFAULT_TOPIC: &str = "rail/vibration/data";

/// MQTT keepalive (seconds)
pub const DEFAULT_KEEPALIVE_SECS: u64 = 60;

/// Delay between connection / drain retries (seconds)
pub const DEFAULT_RETRY_INTERVAL_SECS: u64 = 10;

/// Maximum number of payloads buffered while offline
pub const DEFAULT_OFFLINE_QUEUE_SIZE: usize = 1000;

/// Accelerometer sampling rate (Hz)
pub const DEFAULT_SAMPLING_RATE_HZ: f64 = 20.0;

/// Slowest accepted sampling rate (Hz)
pub const MIN_SAMPLING_RATE_HZ: f64 = 1e-3;

/// Sample ring buffer capacity
pub const DEFAULT_SAMPLE_BUFFER_SIZE: usize = 1000;

/// Readings per feature-extraction batch
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Main loop period (milliseconds)
pub const DEFAULT_SEND_INTERVAL_MS: u64 = 1000;

/// Minimum readings accepted by the feature extractor
pub const DEFAULT_MIN_SAMPLES: usize = 5;

/// Frequency bands (Hz, half-open `[low, high)`) used for band energy
pub const DEFAULT_FREQUENCY_BANDS: [(f64, f64); 3] = [(0.0, 10.0), (10.0, 50.0), (50.0, 100.0)];

/// Modem serial port and baudrate
pub const DEFAULT_MODEM_PORT: &str = "/dev/ttyUSB3";
pub const DEFAULT_MODEM_BAUDRATE: u32 = 115_200;

/// Modem probe: `AT` makes the modem answer `OK`, accepted as an ACK
pub const DEFAULT_PROBE_MESSAGE: &str = "AT\r";
pub const DEFAULT_PROBE_ATTEMPTS: u32 = 3;
pub const DEFAULT_PROBE_RETRY_DELAY_MS: u64 = 500;
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 1000;

/// Health report period (seconds)
pub const DEFAULT_HEALTH_INTERVAL_SECS: u64 = 30;

/// Consecutive sensor errors before the sampler reports itself unhealthy
pub const DEFAULT_MAX_SENSOR_ERRORS: u32 = 5;

/// Name of the log directory under the platform data dir
pub const LOG_DIR_NAME: &str = "rail-resonance";

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// App name
pub const APP_NAME: &str = "Rail Resonance Transmitter";

// ============================================
// Environment variable names
// ============================================

pub const ENV_CONFIG_PATH: &str = "RAIL_CONFIG_PATH";
pub const ENV_BROKER: &str = "MQTT_BROKER";
pub const ENV_BROKER_PORT: &str = "MQTT_PORT";
pub const ENV_TOPIC: &str = "MQTT_TOPIC";
pub const ENV_LOG_BASE: &str = "LOG_BASE_PATH";

/// Stable client id based on hostname to avoid churn across restarts
pub fn default_client_id() -> String {
    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    format!("rail_sensor_{}", host)
}

/// Get the default base directory for raw / processed logs
pub fn default_log_base() -> std::path::PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join(LOG_DIR_NAME)
        .join("logs")
}
