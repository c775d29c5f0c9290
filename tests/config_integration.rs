//! Configuration loading tests

use std::io::Write;

use lamco_capture_encoder::config::{Config, Overrides};
use lamco_capture_encoder::encoder::CodecId;
use lamco_capture_encoder::pipeline::{ContextSettings, EncodingContext, OutputTarget};

fn write_config(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_full_config() {
    let file = write_config(
        r#"
        [encoder]
        codec = "rawvideo"
        bitrate = 1000000
        fps = 25
        ticks_per_frame = 2
        gop_size = 30
        threads = 4

        [capture]
        width = 320
        height = 240
        frames = 10

        [output]
        path = "/tmp/out.yuv"

        [logging]
        level = "debug"
        "#,
    );

    let config = Config::load(file.path()).unwrap();
    assert_eq!(config.encoder.codec_id(), CodecId::RAWVIDEO);
    assert_eq!(config.encoder.fps, 25);
    assert_eq!(config.capture.frames, 10);
    assert_eq!(config.logging.level, "debug");

    let tuning = config.encoder.to_tuning();
    assert_eq!(tuning.bit_rate, 1_000_000);
    assert_eq!(tuning.gop_size, 30);
    assert_eq!(tuning.thread_count, 4);
}

#[test]
fn test_load_rejects_invalid_values() {
    let file = write_config(
        r#"
        [encoder]
        codec = "rawvideo"
        fps = 0
        "#,
    );
    let err = Config::load(file.path()).unwrap_err();
    assert!(err.to_string().contains("fps"));

    let file = write_config("[capture]\nwidth = \"wide\"\n");
    assert!(Config::load(file.path()).is_err());

    assert!(Config::load("/nonexistent/lamco-capture-encoder.toml").is_err());
}

#[test]
fn test_empty_file_is_default() {
    let file = write_config("");
    let config = Config::load(file.path()).unwrap();
    assert_eq!(config.capture.width, 640);
    assert_eq!(config.encoder.gop_size, 15);
}

#[test]
fn test_config_drives_context() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::default_config().with_overrides(Overrides {
        codec: Some("rawvideo".to_string()),
        output: Some(dir.path().join("out.yuv")),
        width: Some(32),
        height: Some(16),
        ..Default::default()
    });
    config.validate().unwrap();

    let settings = ContextSettings::new(
        OutputTarget::Path(config.output.path.clone()),
        config.capture.width,
        config.capture.height,
    )
    .with_tuning(config.encoder.to_tuning());
    let mut ctx = EncodingContext::new(settings);
    ctx.open(Some(config.encoder.codec_id())).unwrap();
    ctx.close().unwrap();

    assert!(config.output.path.exists());
}
