//! Integration tests for WAV file I/O and disk recording.

use riffwork_io::{
    DiskRecorder, RecordingRequest, StereoSamples, WavSpec, read_wav, read_wav_info,
    read_wav_stereo, write_wav, write_wav_stereo,
};
use tempfile::NamedTempFile;

// ---------------------------------------------------------------------------
// WAV roundtrip tests -- mono
// ---------------------------------------------------------------------------

/// Generate a 1-second sine wave at the given sample rate.
fn sine_wave(sample_rate: u32, freq_hz: f32, num_samples: usize) -> Vec<f32> {
    (0..num_samples)
        .map(|i| (2.0 * std::f32::consts::PI * freq_hz * i as f32 / sample_rate as f32).sin())
        .collect()
}

#[test]
fn wav_roundtrip_mono_f32_44100() {
    let sr = 44100;
    let samples = sine_wave(sr, 440.0, sr as usize);
    let spec = WavSpec {
        channels: 1,
        sample_rate: sr,
        bits_per_sample: 32,
    };

    let file = NamedTempFile::new().unwrap();
    write_wav(file.path(), &samples, spec).unwrap();

    let (loaded, loaded_spec) = read_wav(file.path()).unwrap();
    assert_eq!(loaded_spec.sample_rate, sr);
    assert_eq!(loaded_spec.channels, 1);
    assert_eq!(loaded.len(), samples.len());

    for (a, b) in samples.iter().zip(loaded.iter()) {
        assert!(
            (a - b).abs() < 1e-6,
            "sample mismatch: {a} vs {b} (diff={})",
            (a - b).abs()
        );
    }
}

#[test]
fn wav_roundtrip_mono_f32_48000() {
    let sr = 48000;
    let samples = sine_wave(sr, 440.0, sr as usize);
    let spec = WavSpec {
        channels: 1,
        sample_rate: sr,
        bits_per_sample: 32,
    };

    let file = NamedTempFile::new().unwrap();
    write_wav(file.path(), &samples, spec).unwrap();

    let (loaded, loaded_spec) = read_wav(file.path()).unwrap();
    assert_eq!(loaded_spec.sample_rate, sr);
    assert_eq!(loaded.len(), samples.len());

    for (a, b) in samples.iter().zip(loaded.iter()) {
        assert!((a - b).abs() < 1e-6);
    }
}

#[test]
fn wav_roundtrip_mono_f32_96000() {
    let sr = 96000;
    let samples = sine_wave(sr, 1000.0, sr as usize);
    let spec = WavSpec {
        channels: 1,
        sample_rate: sr,
        bits_per_sample: 32,
    };

    let file = NamedTempFile::new().unwrap();
    write_wav(file.path(), &samples, spec).unwrap();

    let (loaded, loaded_spec) = read_wav(file.path()).unwrap();
    assert_eq!(loaded_spec.sample_rate, sr);
    assert_eq!(loaded.len(), samples.len());

    for (a, b) in samples.iter().zip(loaded.iter()) {
        assert!((a - b).abs() < 1e-6);
    }
}

// ---------------------------------------------------------------------------
// WAV roundtrip tests -- stereo
// ---------------------------------------------------------------------------

#[test]
fn wav_roundtrip_stereo_f32_44100() {
    let sr = 44100;
    let left = sine_wave(sr, 440.0, sr as usize);
    let right = sine_wave(sr, 880.0, sr as usize);
    let samples = StereoSamples::new(left.clone(), right.clone());

    let spec = WavSpec {
        channels: 2,
        sample_rate: sr,
        bits_per_sample: 32,
    };

    let file = NamedTempFile::new().unwrap();
    write_wav_stereo(file.path(), &samples, spec).unwrap();

    let (loaded, loaded_spec) = read_wav_stereo(file.path()).unwrap();
    assert_eq!(loaded_spec.sample_rate, sr);
    assert_eq!(loaded.len(), samples.len());

    for (a, b) in left.iter().zip(loaded.left.iter()) {
        assert!((a - b).abs() < 1e-6);
    }
    for (a, b) in right.iter().zip(loaded.right.iter()) {
        assert!((a - b).abs() < 1e-6);
    }
}

#[test]
fn wav_roundtrip_stereo_f32_48000() {
    let sr = 48000;
    let left = sine_wave(sr, 440.0, sr as usize);
    let right = sine_wave(sr, 880.0, sr as usize);
    let samples = StereoSamples::new(left.clone(), right.clone());

    let spec = WavSpec {
        channels: 2,
        sample_rate: sr,
        bits_per_sample: 32,
    };

    let file = NamedTempFile::new().unwrap();
    write_wav_stereo(file.path(), &samples, spec).unwrap();

    let (loaded, _) = read_wav_stereo(file.path()).unwrap();
    assert_eq!(loaded.len(), samples.len());

    for (a, b) in left.iter().zip(loaded.left.iter()) {
        assert!((a - b).abs() < 1e-6);
    }
    for (a, b) in right.iter().zip(loaded.right.iter()) {
        assert!((a - b).abs() < 1e-6);
    }
}

#[test]
fn wav_roundtrip_stereo_f32_96000() {
    let sr = 96000;
    let left = sine_wave(sr, 440.0, sr as usize);
    let right = sine_wave(sr, 880.0, sr as usize);
    let samples = StereoSamples::new(left.clone(), right.clone());

    let spec = WavSpec {
        channels: 2,
        sample_rate: sr,
        bits_per_sample: 32,
    };

    let file = NamedTempFile::new().unwrap();
    write_wav_stereo(file.path(), &samples, spec).unwrap();

    let (loaded, loaded_spec) = read_wav_stereo(file.path()).unwrap();
    assert_eq!(loaded_spec.sample_rate, sr);
    assert_eq!(loaded.len(), samples.len());

    for (a, b) in left.iter().zip(loaded.left.iter()) {
        assert!((a - b).abs() < 1e-6);
    }
}

// ---------------------------------------------------------------------------
// WAV edge cases
// ---------------------------------------------------------------------------

#[test]
fn wav_write_empty_buffer() {
    let spec = WavSpec {
        channels: 1,
        sample_rate: 48000,
        bits_per_sample: 32,
    };

    let file = NamedTempFile::new().unwrap();
    write_wav(file.path(), &[], spec).unwrap();

    let (loaded, loaded_spec) = read_wav(file.path()).unwrap();
    assert_eq!(loaded_spec.sample_rate, 48000);
    assert!(loaded.is_empty());
}

#[test]
fn wav_write_single_sample() {
    let spec = WavSpec {
        channels: 1,
        sample_rate: 48000,
        bits_per_sample: 32,
    };

    let file = NamedTempFile::new().unwrap();
    write_wav(file.path(), &[0.42], spec).unwrap();

    let (loaded, _) = read_wav(file.path()).unwrap();
    assert_eq!(loaded.len(), 1);
    assert!((loaded[0] - 0.42).abs() < 1e-6);
}

#[test]
fn wav_stereo_write_empty_buffer() {
    let spec = WavSpec {
        channels: 2,
        sample_rate: 48000,
        bits_per_sample: 32,
    };
    let samples = StereoSamples::new(vec![], vec![]);

    let file = NamedTempFile::new().unwrap();
    write_wav_stereo(file.path(), &samples, spec).unwrap();

    let (loaded, _) = read_wav_stereo(file.path()).unwrap();
    assert!(loaded.is_empty());
}

#[test]
fn wav_stereo_write_single_sample() {
    let spec = WavSpec {
        channels: 2,
        sample_rate: 48000,
        bits_per_sample: 32,
    };
    let samples = StereoSamples::new(vec![0.25], vec![0.75]);

    let file = NamedTempFile::new().unwrap();
    write_wav_stereo(file.path(), &samples, spec).unwrap();

    let (loaded, _) = read_wav_stereo(file.path()).unwrap();
    assert_eq!(loaded.len(), 1);
    assert!((loaded.left[0] - 0.25).abs() < 1e-6);
    assert!((loaded.right[0] - 0.75).abs() < 1e-6);
}

// ---------------------------------------------------------------------------
// WAV i16 format tests
// ---------------------------------------------------------------------------

#[test]
fn wav_roundtrip_mono_i16() {
    let sr = 44100;
    // Use a signal well within [-1, 1] to stay safe with i16 quantization
    let samples = sine_wave(sr, 440.0, sr as usize)
        .into_iter()
        .map(|s| s * 0.9)
        .collect::<Vec<_>>();

    let spec = WavSpec {
        channels: 1,
        sample_rate: sr,
        bits_per_sample: 16,
    };

    let file = NamedTempFile::new().unwrap();
    write_wav(file.path(), &samples, spec).unwrap();

    let (loaded, loaded_spec) = read_wav(file.path()).unwrap();
    assert_eq!(loaded_spec.sample_rate, sr);
    assert_eq!(loaded_spec.bits_per_sample, 16);
    assert_eq!(loaded.len(), samples.len());

    // 16-bit has quantization error of about 1/32768 ~= 3e-5
    for (a, b) in samples.iter().zip(loaded.iter()) {
        assert!((a - b).abs() < 0.001, "i16 roundtrip mismatch: {a} vs {b}");
    }
}

#[test]
fn wav_roundtrip_stereo_i16() {
    let sr = 48000;
    let left: Vec<f32> = sine_wave(sr, 440.0, 1000)
        .into_iter()
        .map(|s| s * 0.9)
        .collect();
    let right: Vec<f32> = sine_wave(sr, 880.0, 1000)
        .into_iter()
        .map(|s| s * 0.9)
        .collect();
    let samples = StereoSamples::new(left.clone(), right.clone());

    let spec = WavSpec {
        channels: 2,
        sample_rate: sr,
        bits_per_sample: 16,
    };

    let file = NamedTempFile::new().unwrap();
    write_wav_stereo(file.path(), &samples, spec).unwrap();

    let (loaded, loaded_spec) = read_wav_stereo(file.path()).unwrap();
    assert_eq!(loaded_spec.bits_per_sample, 16);
    assert_eq!(loaded.len(), 1000);

    for (a, b) in left.iter().zip(loaded.left.iter()) {
        assert!((a - b).abs() < 0.001);
    }
    for (a, b) in right.iter().zip(loaded.right.iter()) {
        assert!((a - b).abs() < 0.001);
    }
}

#[test]
fn wav_roundtrip_mono_i24() {
    let sr = 48000;
    let samples = sine_wave(sr, 440.0, 1000)
        .into_iter()
        .map(|s| s * 0.9)
        .collect::<Vec<_>>();

    let spec = WavSpec {
        channels: 1,
        sample_rate: sr,
        bits_per_sample: 24,
    };

    let file = NamedTempFile::new().unwrap();
    write_wav(file.path(), &samples, spec).unwrap();

    let (loaded, loaded_spec) = read_wav(file.path()).unwrap();
    assert_eq!(loaded_spec.bits_per_sample, 24);
    assert_eq!(loaded.len(), samples.len());

    // 24-bit has quantization error of about 1/8388608 ~= 1.2e-7
    for (a, b) in samples.iter().zip(loaded.iter()) {
        assert!((a - b).abs() < 0.0001, "i24 roundtrip mismatch: {a} vs {b}");
    }
}

// ---------------------------------------------------------------------------
// read_wav_info tests
// ---------------------------------------------------------------------------

#[test]
fn wav_info_mono_f32() {
    let sr = 48000;
    let num_samples = 2400; // 50ms
    let samples = sine_wave(sr, 440.0, num_samples);

    let spec = WavSpec {
        channels: 1,
        sample_rate: sr,
        bits_per_sample: 32,
    };

    let file = NamedTempFile::new().unwrap();
    write_wav(file.path(), &samples, spec).unwrap();

    let info = read_wav_info(file.path()).unwrap();
    assert_eq!(info.channels, 1);
    assert_eq!(info.sample_rate, sr);
    assert_eq!(info.bits_per_sample, 32);
    assert_eq!(info.num_frames, num_samples as u64);
    assert!((info.duration_secs - 0.05).abs() < 1e-6);
}

#[test]
fn wav_info_stereo_i16() {
    let sr = 44100;
    let num_samples = 44100; // 1 second
    let left = sine_wave(sr, 440.0, num_samples);
    let right = sine_wave(sr, 880.0, num_samples);
    let samples = StereoSamples::new(left, right);

    let spec = WavSpec {
        channels: 2,
        sample_rate: sr,
        bits_per_sample: 16,
    };

    let file = NamedTempFile::new().unwrap();
    write_wav_stereo(file.path(), &samples, spec).unwrap();

    let info = read_wav_info(file.path()).unwrap();
    assert_eq!(info.channels, 2);
    assert_eq!(info.sample_rate, sr);
    assert_eq!(info.bits_per_sample, 16);
    assert_eq!(info.num_frames, num_samples as u64);
    assert!((info.duration_secs - 1.0).abs() < 1e-6);
}

// ---------------------------------------------------------------------------
// StereoSamples utility tests
// ---------------------------------------------------------------------------

#[test]
fn stereo_from_mono_duplicates() {
    let mono = vec![0.1, 0.2, 0.3];
    let stereo = StereoSamples::from_mono(mono.clone());
    assert_eq!(stereo.left, mono);
    assert_eq!(stereo.right, mono);
    assert_eq!(stereo.len(), 3);
    assert!(!stereo.is_empty());
}

#[test]
fn stereo_to_mono_averages() {
    let stereo = StereoSamples::new(vec![1.0, 0.0], vec![0.0, 1.0]);
    let mono = stereo.to_mono();
    assert!((mono[0] - 0.5).abs() < 1e-6);
    assert!((mono[1] - 0.5).abs() < 1e-6);
}

#[test]
fn stereo_interleaved_roundtrip() {
    let left = vec![0.1, 0.3, 0.5];
    let right = vec![0.2, 0.4, 0.6];
    let stereo = StereoSamples::new(left.clone(), right.clone());

    let interleaved = stereo.to_interleaved();
    assert_eq!(interleaved, vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6]);

    let back = StereoSamples::from_interleaved(&interleaved);
    assert_eq!(back.left, left);
    assert_eq!(back.right, right);
}

// ---------------------------------------------------------------------------
// Read mono file as stereo (should duplicate channels)
// ---------------------------------------------------------------------------

#[test]
fn read_mono_as_stereo_duplicates_channels() {
    let sr = 48000;
    let samples = sine_wave(sr, 440.0, 1000);
    let spec = WavSpec {
        channels: 1,
        sample_rate: sr,
        bits_per_sample: 32,
    };

    let file = NamedTempFile::new().unwrap();
    write_wav(file.path(), &samples, spec).unwrap();

    let (stereo, _) = read_wav_stereo(file.path()).unwrap();
    assert_eq!(stereo.len(), 1000);

    for (orig, left) in samples.iter().zip(stereo.left.iter()) {
        assert!((orig - left).abs() < 1e-6);
    }
    for (orig, right) in samples.iter().zip(stereo.right.iter()) {
        assert!((orig - right).abs() < 1e-6);
    }
}


// ---------------------------------------------------------------------------
// Disk recorder
// ---------------------------------------------------------------------------

#[test]
fn recorder_stereo_session_writes_nonempty_flac() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session_finalmix.flac");

    let mut recorder = DiskRecorder::new(1024);
    recorder
        .begin(&RecordingRequest::Stereo { path: path.clone() }, 48000)
        .unwrap();

    let left = sine_wave(48000, 220.0, 2048);
    let right = sine_wave(48000, 330.0, 2048);
    for chunk in left.chunks(256).zip(right.chunks(256)) {
        let mut interleaved = Vec::with_capacity(512);
        for (l, r) in chunk.0.iter().zip(chunk.1) {
            interleaved.push(*l);
            interleaved.push(*r);
        }
        recorder.push_stereo(&interleaved);
    }

    recorder.stop();
    assert!(path.exists());
    assert!(std::fs::metadata(&path).unwrap().len() > 44, "flac output should be non-trivial");
}

#[test]
fn recorder_multitrack_session_writes_eight_files() {
    use riffwork_io::RECORDER_TRACKS;

    let dir = tempfile::tempdir().unwrap();
    let mut recorder = DiskRecorder::new(1024);
    recorder
        .begin(
            &RecordingRequest::Multitrack {
                dir: dir.path().to_path_buf(),
                timestamp: "20260101T120000Z".into(),
            },
            44100,
        )
        .unwrap();

    let stem_samples: Vec<Vec<f32>> = (0..RECORDER_TRACKS)
        .map(|i| sine_wave(44100, 110.0 * (i as f32 + 1.0), 512))
        .collect();

    for _ in 0..4 {
        let refs: [&[f32]; RECORDER_TRACKS] =
            std::array::from_fn(|i| stem_samples[i].as_slice());
        recorder.push_multitrack(&refs, false);
    }
    recorder.stop();

    for channel in 0..RECORDER_TRACKS {
        let path = dir
            .path()
            .join(format!("20260101T120000Zbeam_channel{channel}.flac"));
        assert!(path.exists());
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }
}
