//! Integration tests for the `riffwork` binary.

use std::process::Command;

fn riffwork_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_riffwork"))
}

#[test]
fn cli_help_lists_subcommands() {
    let output = riffwork_bin()
        .arg("--help")
        .output()
        .expect("failed to run riffwork --help");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(stdout.contains("devices"));
    assert!(stdout.contains("info"));
    assert!(stdout.contains("play"));
    assert!(stdout.contains("config"));
}

#[test]
fn cli_devices_list_runs() {
    let output = riffwork_bin()
        .args(["devices", "list"])
        .output()
        .expect("failed to run riffwork devices list");

    assert!(output.status.success(), "devices list failed");
}

#[test]
fn cli_devices_info_runs() {
    let output = riffwork_bin()
        .args(["devices", "info"])
        .output()
        .expect("failed to run riffwork devices info");

    assert!(output.status.success(), "devices info failed");
}

#[test]
fn cli_info_reports_wav_metadata() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tone.wav");

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 44100,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, spec).unwrap();
    for i in 0..44100 {
        let sample = ((i as f32 * 0.01).sin() * i16::MAX as f32) as i16;
        writer.write_sample(sample).unwrap();
    }
    writer.finalize().unwrap();

    let output = riffwork_bin()
        .arg("info")
        .arg(&path)
        .output()
        .expect("failed to run riffwork info");

    assert!(output.status.success(), "info command failed");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("44100 Hz"));
    assert!(stdout.contains("PCM 16-bit"));
}

#[test]
fn cli_info_missing_file_fails() {
    let output = riffwork_bin()
        .args(["info", "/nonexistent/path/to/file.wav"])
        .output()
        .expect("failed to run riffwork info");

    assert!(!output.status.success());
}

#[test]
fn cli_play_requires_riff_id() {
    let output = riffwork_bin()
        .arg("play")
        .output()
        .expect("failed to run riffwork play");

    assert!(!output.status.success());
}

#[test]
fn cli_config_path_runs() {
    let output = riffwork_bin()
        .args(["config", "path"])
        .output()
        .expect("failed to run riffwork config path");

    assert!(output.status.success());
    assert!(!output.stdout.is_empty());
}
