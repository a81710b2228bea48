//! Print live XR25 readings once per second
//!
//! Usage: `xr25dump [CONFIG.yaml]`. Without a config file the defaults are
//! used (Fenix 3 on `/dev/ttyUSB0`). Set `RUST_LOG=xr25=debug` for per-frame
//! detail.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;
use xr25::types::flags::faults;
use xr25::{
    BackgroundReader, DecoderRegistry, EngineRecord, Mailbox, ReaderConfig, SeriesSet, fan_out,
};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = match std::env::args_os().nth(1).map(PathBuf::from) {
        Some(path) => ReaderConfig::load(&path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ReaderConfig::default(),
    };

    let registry = DecoderRegistry::builtin();
    config.validate(registry).context("Invalid reader config")?;
    let decoder = registry.create(&config.decoder)?;
    let source = config
        .open_source()
        .with_context(|| format!("Failed to open {}", config.source.display()))?;

    let latest = Arc::new(Mailbox::<EngineRecord>::new());
    let rpm = Arc::new(config.new_series()?);
    let water = Arc::new(config.new_series()?);
    let series = Arc::new(
        SeriesSet::new()
            .with("rpm", rpm.clone(), |r: &EngineRecord| (r.rpm as f64, None))
            .with("water_temp", water.clone(), |r: &EngineRecord| {
                let sensor = faults::WATER_OPEN_CIRCUIT | faults::WATER_SHORT_CIRCUIT;
                (r.water_temp as f64, Some(r.faults.has_flag(sensor)))
            }),
    );

    let mut reader = BackgroundReader::new(source)
        .with_fps_interval(config.fps_interval())
        .with_hook(fan_out(vec![latest.hook(), series.hook()]));
    reader.start(decoder)?;
    info!(decoder = %config.decoder, "Reading");

    while reader.is_running() {
        std::thread::sleep(Duration::from_secs(1));

        let status = reader.status();
        let record = latest.snapshot();
        println!(
            "[{}] {:>3} fps  {} frames  {} desyncs  {} rejected | {:>5} rpm  {:>4} mbar  water {:>3}°C  air {:>3}°C  {:>5.2} V{}",
            if status.synchronized { "SYNC" } else { "----" },
            status.frames_per_second,
            status.frames_decoded,
            status.sync_errors,
            status.decode_failures,
            record.rpm,
            record.map,
            record.water_temp,
            record.air_temp,
            record.battery_v,
            if record.check_engine() { "  CHECK ENGINE" } else { "" },
        );

        if water.consume_changed() && water.latest().alert {
            println!("       water temperature sensor fault");
        }
    }

    reader.stop();
    info!(
        frames = reader.frames_decoded(),
        rpm_samples = rpm.written(),
        "Source exhausted"
    );
    Ok(())
}
