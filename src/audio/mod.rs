//! Audio capture and spectrum analysis.
//!
//! The waterfall pipeline only ever sees this module through the
//! `SpectrumSource` trait: a fixed-length snapshot of normalized magnitudes,
//! refreshed on demand. `MicSpectrumSource` is the live implementation,
//! composing cpal capture with a rustfft analyzer.

pub mod capture;
pub mod spectrum;

pub use capture::AudioCapture;
pub use spectrum::SpectrumAnalyzer;

use crate::config::AudioConfig;
use anyhow::Result;

/// One sampled frequency spectrum: magnitudes in [0, 1], immutable once produced.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrumSnapshot {
    values: Vec<f32>,
}

impl SpectrumSnapshot {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Source of spectrum snapshots at a negotiated window length.
pub trait SpectrumSource {
    /// Snapshot length, fixed once the source is initialized.
    fn window_len(&self) -> usize;

    /// False until actual audio has been captured; admission is skipped
    /// while this returns false.
    fn is_ready(&self) -> bool;

    /// Current spectrum. Only meaningful once `is_ready` returned true.
    fn snapshot(&mut self) -> SpectrumSnapshot;
}

/// Live microphone spectrum: a capture stream feeding an FFT analyzer.
pub struct MicSpectrumSource {
    capture: AudioCapture,
    analyzer: SpectrumAnalyzer,
}

impl MicSpectrumSource {
    /// Opens the configured input device and negotiates the spectrum window
    /// against its actual sample rate.
    ///
    /// # Errors
    /// - If the device is unavailable or the stream cannot be started
    /// - If the configured frequency window resolves to fewer than two bins
    pub fn start(config: &AudioConfig) -> Result<Self> {
        let capture = AudioCapture::start(config)?;
        let analyzer = SpectrumAnalyzer::new(
            config.fft_size,
            config.min_freq_hz,
            config.max_freq_hz,
            capture.sample_rate(),
            config.reference_level_db,
        )?;
        tracing::info!(
            "Spectrum window: {} bins covering {}-{} Hz at {} Hz sample rate",
            analyzer.window_len(),
            config.min_freq_hz,
            config.max_freq_hz,
            capture.sample_rate()
        );
        Ok(Self { capture, analyzer })
    }
}

impl SpectrumSource for MicSpectrumSource {
    fn window_len(&self) -> usize {
        self.analyzer.window_len()
    }

    fn is_ready(&self) -> bool {
        self.capture.buffered_len() >= self.analyzer.fft_size()
    }

    fn snapshot(&mut self) -> SpectrumSnapshot {
        let samples = self.capture.latest(self.analyzer.fft_size());
        self.analyzer.analyze(&samples)
    }
}
