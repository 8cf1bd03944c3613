//! Rail Resonance Transmitter - Main Entry Point

use anyhow::{Context, Result};
use clap::Parser;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;

use rail_resonance::constants::{APP_NAME, APP_VERSION};
use rail_resonance::logic::config::Config;
use rail_resonance::logic::handshake::{HandshakeGate, SerialChannel};
use rail_resonance::logic::health::{HealthReporter, HealthSnapshot};
use rail_resonance::logic::logs::{ProcessedLog, RawLog};
use rail_resonance::logic::pipeline::{Pipeline, PipelineSettings};
use rail_resonance::logic::publisher::{MqttTransport, ResilientPublisher};
use rail_resonance::logic::sampling::{SampleBuffer, Sampler, SimulatedSensor};
use rail_resonance::logic::shutdown::StopSignal;

#[derive(Debug, Parser)]
#[command(name = "rail-resonance", version, about = "Rail vibration telemetry transmitter")]
struct Args {
    /// TOML config file (defaults to $RAIL_CONFIG_PATH, then built-in defaults)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// MQTT broker host
    #[arg(long)]
    broker: Option<String>,

    /// MQTT topic
    #[arg(long)]
    topic: Option<String>,

    /// Base directory for raw and processed logs
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

fn main() {
    let _ = dotenvy::dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run(Args::parse()) {
        log::error!("Fatal: {:#}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    log::info!("Starting {} v{}", APP_NAME, APP_VERSION);

    let mut config = Config::load(args.config.as_deref()).context("failed to load configuration")?;
    if let Some(broker) = args.broker {
        config.mqtt.broker = broker;
    }
    if let Some(topic) = args.topic {
        config.mqtt.topic = topic;
    }
    if let Some(dir) = args.log_dir {
        config.paths.log_base = dir;
    }
    config.validate()?;

    log::info!(
        "Config: {} Hz sampling, batch {}, broker {}:{} topic {}, modem {}",
        config.sensor.sampling_rate_hz,
        config.collection.batch_size,
        config.mqtt.broker,
        config.mqtt.port,
        config.mqtt.topic,
        config.serial.port
    );

    // Startup allocations; any failure here is fatal
    let buffer = Arc::new(SampleBuffer::new(config.sensor.buffer_size)?);
    let publisher = Arc::new(ResilientPublisher::new(
        MqttTransport::new(config.mqtt_settings()),
        config.publisher_settings(),
    )?);
    let raw_log = RawLog::create(&config.paths.raw_dir()).context("failed to create raw log")?;
    let processed_log =
        ProcessedLog::create(&config.paths.processed_dir()).context("failed to create processed log")?;

    let stop = StopSignal::new();
    {
        let stop = Arc::clone(&stop);
        ctrlc::set_handler(move || {
            log::info!("Shutdown requested");
            stop.trigger();
        })
        .context("failed to install signal handler")?;
    }

    let sampler = Sampler::start(
        SimulatedSensor::new(config.sensor.sampling_rate_hz),
        Arc::clone(&buffer),
        config.sensor.sampling_rate_hz,
        config.sensor.max_consecutive_errors,
    )
    .context("failed to start sampler")?;
    let sampler = Arc::new(Mutex::new(sampler));

    if let Err(e) = publisher.start() {
        sampler.lock().shutdown();
        return Err(e).context("failed to start publisher");
    }

    let mut health = {
        let sampler = Arc::clone(&sampler);
        let buffer = Arc::clone(&buffer);
        let publisher = Arc::clone(&publisher);
        HealthReporter::start(config.health_interval(), move |uptime| {
            HealthSnapshot::new(uptime, sampler.lock().status(), buffer.status(), publisher.status())
        })
        .context("failed to start health reporter")?
    };

    let gate = HandshakeGate::new(
        SerialChannel::new(config.serial.port.clone(), config.serial.baudrate),
        config.handshake_settings(),
    );
    let mut pipeline = Pipeline::new(
        Arc::clone(&buffer),
        config.feature_extractor(),
        gate,
        Arc::clone(&publisher),
        PipelineSettings {
            batch_size: config.collection.batch_size,
            sampling_rate_hz: config.sensor.sampling_rate_hz,
            send_interval: config.send_interval(),
        },
    )
    .with_logs(raw_log, processed_log);

    pipeline.run(&stop);

    // Reverse start order
    health.stop();
    sampler.lock().shutdown();
    publisher.stop();

    let stats = pipeline.stats();
    log::info!(
        "Shutdown complete: {} published, {} buffered, {} still queued",
        stats.published,
        stats.buffered,
        publisher.status().queue_size
    );
    Ok(())
}
