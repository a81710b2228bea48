//! Config-driven pipelines over captured ECU streams

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use xr25::types::flags::{faults, inputs};
use xr25::types::{encode_frame, push_boundary};
use xr25::{
    BackgroundReader, DecoderRegistry, EngineRecord, Mailbox, ReaderConfig, SeriesSet,
    TelemetryError,
};

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("xr25-{}-{}", std::process::id(), name))
}

/// Fenix 3 payload at 2000 rpm, 85°C water, throttle closed, MAP sensor fault.
fn fenix3_payload() -> [u8; 26] {
    let mut p = [0u8; 26];
    p[0] = 0x31;
    p[1] = 0x07;
    p[2] = inputs::THROTTLE_CLOSED as u8;
    // 30_000_000 / 15_000 = 2000 rpm
    p[5..7].copy_from_slice(&15_000u16.to_be_bytes());
    // 85 = raw * 5 / 8 - 40
    p[12] = 200;
    // battery byte that stuffs to FF FF on the wire
    p[14] = 0xFF;
    p[23] = faults::MAP as u8;
    p
}

fn capture_of(payloads: &[&[u8]]) -> Vec<u8> {
    let mut wire = vec![0x12, 0x34];
    for payload in payloads {
        encode_frame(payload, &mut wire);
    }
    push_boundary(&mut wire);
    wire
}

fn wait_for_exit(reader: &BackgroundReader<Box<dyn xr25::ByteSource>, EngineRecord>) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while reader.is_running() {
        assert!(Instant::now() < deadline, "replay did not finish");
        std::thread::sleep(Duration::from_millis(10));
    }
}

#[test]
fn replayed_capture_decodes_and_is_mirrored() {
    let payload = fenix3_payload();
    let wire = capture_of(&[&payload, &payload, &payload]);
    let input = temp_path("pipeline.bin");
    let capture = temp_path("pipeline-capture.bin");
    std::fs::write(&input, &wire).unwrap();

    let yaml = format!(
        "decoder: Fenix3\nsource: {}\ncapture: {}\nreplay_bytes_per_sec: 100000\nseries_capacity: 8\n",
        input.display(),
        capture.display()
    );
    let config = ReaderConfig::from_yaml_str(&yaml).unwrap();
    let registry = DecoderRegistry::builtin();
    config.validate(registry).unwrap();

    let latest = Arc::new(Mailbox::new());
    let rpm = Arc::new(config.new_series().unwrap());
    let series = Arc::new(SeriesSet::new().with("rpm", rpm.clone(), |r: &EngineRecord| {
        (r.rpm as f64, Some(r.has_active_fault()))
    }));

    let mut reader = BackgroundReader::new(config.open_source().unwrap())
        .with_hook(xr25::fan_out(vec![latest.hook(), series.hook()]));
    reader.start(registry.create(&config.decoder).unwrap()).unwrap();
    wait_for_exit(&reader);
    reader.stop();

    assert_eq!(reader.frames_decoded(), 3);
    assert_eq!(reader.sync_error_count(), 0);

    let record = latest.snapshot();
    assert_eq!(record.program_version, 0x31);
    assert_eq!(record.rpm, 2000);
    assert_eq!(record.water_temp, 85);
    assert!(record.inputs.has_flag(inputs::THROTTLE_CLOSED));
    assert!(record.faults.has_flag(faults::MAP));

    assert_eq!(rpm.len(), 3);
    assert_eq!(rpm.runs().len(), 1);
    assert!(rpm.latest().alert);

    // the tee is flushed when the reader hands the source back and drops it
    drop(reader);
    assert_eq!(std::fs::read(&capture).unwrap(), wire);

    std::fs::remove_file(&input).ok();
    std::fs::remove_file(&capture).ok();
}

#[test]
fn wrong_variant_rejects_every_frame() {
    let payload = fenix3_payload();
    let input = temp_path("wrong-variant.bin");
    std::fs::write(&input, capture_of(&[&payload, &payload])).unwrap();

    let config = ReaderConfig {
        decoder: "Fenix52B".into(),
        source: input.clone(),
        replay_bytes_per_sec: Some(100_000),
        ..Default::default()
    };
    let latest = Arc::new(Mailbox::new());
    let mut reader = BackgroundReader::new(config.open_source().unwrap()).with_hook(latest.hook());
    reader.start(DecoderRegistry::builtin().create(&config.decoder).unwrap()).unwrap();
    wait_for_exit(&reader);
    reader.stop();

    assert_eq!(reader.frames_delivered(), 2);
    assert_eq!(reader.decode_failures(), 2);
    assert_eq!(latest.published(), 0);
    assert_eq!(latest.snapshot(), EngineRecord::default());

    std::fs::remove_file(&input).ok();
}

#[test]
fn missing_device_is_a_file_error() {
    let config = ReaderConfig { source: temp_path("no-such-tty"), ..Default::default() };
    match config.open_source() {
        Err(TelemetryError::File { path, .. }) => assert_eq!(path, temp_path("no-such-tty")),
        Err(other) => panic!("Expected File error, got {other:?}"),
        Ok(_) => panic!("Expected File error"),
    }
}
