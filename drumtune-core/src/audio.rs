//! # Audio Input Module
//!
//! This module turns audio from any source into fixed-size [`AudioWindow`]s for
//! the pitch estimator. It provides the microphone source (CPAL), a WAV file
//! source (hound) and a synthetic sine source used by tests and demos.
//!
//! ## Features
//! - Automatic input device and stream format selection
//! - Down-mixing of interleaved multi-channel input to mono
//! - Framing of arbitrary callback sizes into fixed windows
//! - Sources that can be swapped without touching the estimator

use anyhow::{Context, Result, anyhow};
use cpal::SupportedStreamConfigRange;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{Sender, TrySendError};
use std::path::Path;
use std::thread;

/// Reference number of samples per analysis window.
///
/// At 44.1 kHz this is ~93 ms of audio, enough for several periods of the
/// lowest drum fundamentals.
pub const WINDOW_SIZE: usize = 4096;

/// Sample rate requested from the input device.
pub const PREFERRED_SAMPLE_RATE: u32 = 44_100;

/// A block of normalized mono samples and the rate they were captured at.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioWindow {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl AudioWindow {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Length of the window in seconds.
    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

/// Averages interleaved frames down to a single channel.
pub fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Collects device callbacks until a full window is available.
///
/// Windows do not overlap; leftover samples wait for the next push.
#[derive(Debug)]
pub struct WindowAssembler {
    buffer: Vec<f32>,
    window_size: usize,
    sample_rate: u32,
    channels: usize,
}

impl WindowAssembler {
    pub fn new(window_size: usize, sample_rate: u32, channels: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(window_size * 2),
            window_size: window_size.max(1),
            sample_rate,
            channels: channels.max(1),
        }
    }

    /// Appends interleaved samples and returns every window that became complete.
    pub fn push(&mut self, interleaved: &[f32]) -> Vec<AudioWindow> {
        if self.channels == 1 {
            self.buffer.extend_from_slice(interleaved);
        } else {
            self.buffer.extend(downmix(interleaved, self.channels));
        }

        let mut windows = Vec::new();
        while self.buffer.len() >= self.window_size {
            let samples = self.buffer[..self.window_size].to_vec();
            self.buffer.drain(..self.window_size);
            windows.push(AudioWindow::new(samples, self.sample_rate));
        }
        windows
    }

    /// Samples waiting for the next window.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

/// Anything that can deliver audio windows to the listener.
///
/// `start` runs on the listener's worker thread. The returned guard keeps the
/// source alive and is dropped when listening stops, which releases the
/// underlying resource. A source signals exhaustion by dropping `sink`.
///
/// `sink` is bounded (see [`WINDOW_BACKLOG`](crate::listener::WINDOW_BACKLOG)).
/// Real-time sources use `try_send` and drop windows while it is full; `start`
/// must not block on it, since nothing drains the sink until `start` returns.
pub trait AudioSource: Send + 'static {
    type Guard;

    fn start(self, sink: Sender<AudioWindow>) -> Result<Self::Guard>;
}

/// Live capture from the default input device.
#[derive(Debug, Clone)]
pub struct MicrophoneSource {
    pub window_size: usize,
    pub preferred_sample_rate: u32,
}

impl Default for MicrophoneSource {
    fn default() -> Self {
        Self {
            window_size: WINDOW_SIZE,
            preferred_sample_rate: PREFERRED_SAMPLE_RATE,
        }
    }
}

impl AudioSource for MicrophoneSource {
    type Guard = cpal::Stream;

    /// Opens the default input device and streams windows into `sink`.
    ///
    /// Prefers a mono 32-bit float format at the rate closest to
    /// `preferred_sample_rate`; multi-channel input is down-mixed.
    fn start(self, sink: Sender<AudioWindow>) -> Result<cpal::Stream> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| anyhow!("No input device available"))?;

        log::info!("[AUDIO] Using audio input device: {}", device.name()?);

        let configs = device.supported_input_configs()?.collect::<Vec<_>>();
        let supported_config = find_supported_config(configs, self.preferred_sample_rate)
            .ok_or_else(|| anyhow!("No suitable f32 input format found"))?;

        let rate = self.preferred_sample_rate.clamp(
            supported_config.min_sample_rate().0,
            supported_config.max_sample_rate().0,
        );
        let config = supported_config.with_sample_rate(cpal::SampleRate(rate));
        let sample_rate = config.sample_rate().0;
        let channels = config.channels() as usize;
        let config: cpal::StreamConfig = config.into();

        log::info!(
            "[AUDIO] Selected sample rate: {} Hz, {} channel(s)",
            sample_rate,
            channels
        );

        let err_fn = |err| log::error!("[AUDIO] An error occurred on the audio stream: {}", err);

        let mut assembler = WindowAssembler::new(self.window_size, sample_rate, channels);

        let stream = device.build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                for window in assembler.push(data) {
                    // A full channel means the consumer is behind; drop the window.
                    if let Err(TrySendError::Full(_)) = sink.try_send(window) {
                        log::trace!("[AUDIO] Estimator behind, window dropped");
                    }
                }
            },
            err_fn,
            None,
        )?;

        stream.play()?;

        Ok(stream)
    }
}

/// Picks the input format closest to what the estimator wants:
/// f32 samples, mono if possible, sample rate as close as possible to `target_rate`.
fn find_supported_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<SupportedStreamConfigRange> {
    configs
        .into_iter()
        .filter(|c| c.sample_format() == cpal::SampleFormat::F32)
        .min_by_key(|c| {
            let min_rate = c.min_sample_rate().0;
            let max_rate = c.max_sample_rate().0;
            let rate_diff = if (min_rate..=max_rate).contains(&target_rate) {
                0
            } else {
                min_rate.abs_diff(target_rate).min(max_rate.abs_diff(target_rate))
            };
            (c.channels() != 1, rate_diff)
        })
}

/// A finite, pre-computed sequence of windows.
///
/// Used for file playback and synthetic signals; the listener sees the
/// source end once every window has been delivered.
#[derive(Debug, Clone, Default)]
pub struct WindowSequence {
    windows: Vec<AudioWindow>,
}

impl WindowSequence {
    pub fn new(windows: Vec<AudioWindow>) -> Self {
        Self { windows }
    }

    /// Splits a WAV file into non-overlapping windows of `window_size` samples.
    ///
    /// Integer formats are normalized to [-1, 1] and multi-channel files are
    /// down-mixed. A trailing partial window is discarded.
    pub fn from_wav(path: &Path, window_size: usize) -> Result<Self> {
        let mut reader = hound::WavReader::open(path)
            .with_context(|| format!("Failed to open WAV file '{}'", path.display()))?;
        let spec = reader.spec();

        let interleaved: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .samples::<f32>()
                .collect::<std::result::Result<_, _>>()
                .context("Failed to decode float samples")?,
            hound::SampleFormat::Int => {
                let scale = (1_i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / scale))
                    .collect::<std::result::Result<_, _>>()
                    .context("Failed to decode integer samples")?
            }
        };

        let mut assembler =
            WindowAssembler::new(window_size, spec.sample_rate, spec.channels as usize);
        let windows = assembler.push(&interleaved);

        log::info!(
            "[AUDIO] Read {} windows from {} ({} Hz, {} channel(s), {} samples left over)",
            windows.len(),
            path.display(),
            spec.sample_rate,
            spec.channels,
            assembler.pending()
        );

        Ok(Self::new(windows))
    }

    /// `count` consecutive windows of a continuous sine tone.
    pub fn sine(
        frequency: f32,
        amplitude: f32,
        sample_rate: u32,
        window_size: usize,
        count: usize,
    ) -> Self {
        let windows = (0..count)
            .map(|n| {
                let offset = n * window_size;
                let samples = (0..window_size)
                    .map(|i| sine_sample(frequency, amplitude, sample_rate, offset + i))
                    .collect();
                AudioWindow::new(samples, sample_rate)
            })
            .collect();
        Self::new(windows)
    }

    pub fn windows(&self) -> &[AudioWindow] {
        &self.windows
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

impl IntoIterator for WindowSequence {
    type Item = AudioWindow;
    type IntoIter = std::vec::IntoIter<AudioWindow>;

    fn into_iter(self) -> Self::IntoIter {
        self.windows.into_iter()
    }
}

impl AudioSource for WindowSequence {
    type Guard = thread::JoinHandle<()>;

    /// Feeds the windows from a separate thread. Delivery blocks while the
    /// sink is full, so a stored sequence is never thinned out.
    fn start(self, sink: Sender<AudioWindow>) -> Result<Self::Guard> {
        thread::Builder::new()
            .name("window-feed".into())
            .spawn(move || {
                for window in self.windows {
                    if sink.send(window).is_err() {
                        break;
                    }
                }
            })
            .context("Failed to spawn window feeder")
    }
}

/// A single window of a sine tone starting at phase zero.
pub fn sine_window(frequency: f32, amplitude: f32, sample_rate: u32, len: usize) -> AudioWindow {
    let samples = (0..len)
        .map(|i| sine_sample(frequency, amplitude, sample_rate, i))
        .collect();
    AudioWindow::new(samples, sample_rate)
}

fn sine_sample(frequency: f32, amplitude: f32, sample_rate: u32, index: usize) -> f32 {
    let t = index as f64 / sample_rate as f64;
    amplitude * (2.0 * std::f64::consts::PI * frequency as f64 * t).sin() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assembler_emits_full_windows_only() {
        let mut assembler = WindowAssembler::new(4, 8000, 1);
        assert!(assembler.push(&[0.1, 0.2, 0.3]).is_empty());
        assert_eq!(assembler.pending(), 3);

        let windows = assembler.push(&[0.4, 0.5, 0.6, 0.7, 0.8, 0.9]);
        assert_eq!(windows.len(), 2);
        assert_eq!(windows[0].samples, vec![0.1, 0.2, 0.3, 0.4]);
        assert_eq!(windows[1].samples, vec![0.5, 0.6, 0.7, 0.8]);
        assert_eq!(windows[1].sample_rate, 8000);
        assert_eq!(assembler.pending(), 1);
    }

    #[test]
    fn assembler_downmixes_stereo() {
        let mut assembler = WindowAssembler::new(2, 48000, 2);
        let windows = assembler.push(&[1.0, 0.0, 0.5, 0.5]);
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].samples, vec![0.5, 0.5]);
    }

    #[test]
    fn sine_sequence_is_continuous() {
        let sequence = WindowSequence::sine(100.0, 0.5, 8000, 40, 2);
        let joined: Vec<f32> = sequence
            .windows()
            .iter()
            .flat_map(|w| w.samples.iter().copied())
            .collect();
        let single = sine_window(100.0, 0.5, 8000, 80);
        for (a, b) in joined.iter().zip(single.samples.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn window_duration() {
        let window = AudioWindow::new(vec![0.0; 4410], 44100);
        assert!((window.duration_secs() - 0.1).abs() < 1e-6);
        assert_eq!(AudioWindow::new(vec![], 0).duration_secs(), 0.0);
    }

    #[test]
    fn wav_file_is_split_into_windows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        let tone = sine_window(200.0, 0.5, 8000, 1000);
        for s in &tone.samples {
            writer.write_sample((s * i16::MAX as f32) as i16).unwrap();
        }
        writer.finalize().unwrap();

        let sequence = WindowSequence::from_wav(&path, 256).unwrap();
        assert_eq!(sequence.len(), 3);
        let first = &sequence.windows()[0];
        assert_eq!(first.sample_rate, 8000);
        for (decoded, expected) in first.samples.iter().zip(tone.samples.iter()) {
            assert!((decoded - expected).abs() < 1e-3);
        }
    }

    #[test]
    fn missing_wav_file_is_an_error() {
        assert!(WindowSequence::from_wav(Path::new("/nonexistent/tone.wav"), 256).is_err());
    }
}
