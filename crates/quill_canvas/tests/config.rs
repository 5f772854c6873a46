use std::fs;

use quill_canvas::{ConfigError, Surface, SurfaceConfig};

#[test]
fn config_loads_from_file() {
    let path = std::env::temp_dir().join(format!("quill-config-{}.toml", std::process::id()));
    fs::write(
        &path,
        "initial_value_capacity = 256\ninitial_object_capacity = 4\nsize_history = 2\n",
    )
    .unwrap();

    let config = SurfaceConfig::load(&path).unwrap();
    fs::remove_file(&path).unwrap();

    assert_eq!(config.initial_value_capacity, 256);
    assert_eq!(config.initial_object_capacity, 4);
    assert_eq!(config.size_history, 2);
    assert_eq!(config.reset_threshold(), 256);

    let surface = Surface::with_config(config, 10.0, 10.0);
    assert_eq!(surface.next_buffer_capacity(), (256, 4));
}

#[test]
fn missing_file_is_an_io_error() {
    let err = SurfaceConfig::load("/nonexistent/quill.toml").unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
}

#[test]
fn threshold_controls_coverage_reset() {
    let config = SurfaceConfig::default().with_reset_threshold(10);
    let mut surface = Surface::with_config(config, 10.0, 10.0);
    let mut rec = surface.recorder();
    // 5 bytes, under the threshold
    rec.set_line_width(2.0).unwrap();
    rec.fill_rect(0.0, 0.0, 10.0, 10.0).unwrap();
    assert_eq!(
        surface.pending_buffer().unwrap().values()[0],
        quill_canvas::Opcode::LineWidth as u8
    );

    let mut rec = surface.recorder();
    rec.fill_rect(0.0, 0.0, 10.0, 10.0).unwrap();
    assert_eq!(
        surface.pending_buffer().unwrap().values()[0],
        quill_canvas::Opcode::Reset as u8
    );
}
