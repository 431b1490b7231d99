//! Frequency spectrum analysis using FFT.
//!
//! Converts raw mono samples into normalized magnitudes over a configured
//! frequency window. The window is negotiated once against the actual device
//! sample rate; its bin count is the snapshot length the rest of the pipeline
//! builds geometry for.

use crate::audio::SpectrumSnapshot;
use anyhow::{ensure, Result};
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::ops::Range;
use std::sync::Arc;

/// Stateful spectrum analyzer with a pre-planned FFT.
pub struct SpectrumAnalyzer {
    fft: Arc<dyn Fft<f32>>,
    fft_size: usize,
    window: Range<usize>,
    reference_level_db: f32,
}

impl SpectrumAnalyzer {
    /// Plans the FFT and negotiates the displayed bin window.
    ///
    /// # Errors
    /// - If the frequency window resolves to fewer than two FFT bins at the
    ///   given sample rate
    pub fn new(
        fft_size: usize,
        min_freq_hz: f32,
        max_freq_hz: f32,
        sample_rate: u32,
        reference_level_db: i8,
    ) -> Result<Self> {
        let window = frequency_window(fft_size, sample_rate, min_freq_hz, max_freq_hz)?;
        let fft = FftPlanner::new().plan_fft_forward(fft_size);
        Ok(Self {
            fft,
            fft_size,
            window,
            reference_level_db: reference_level_db as f32,
        })
    }

    /// Number of bins in the negotiated window, and thus the snapshot length.
    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Computes one spectrum snapshot from the newest samples.
    ///
    /// Magnitudes are normalized to [0, 1] against the reference level, with
    /// a noise gate 40 dB below it.
    pub fn analyze(&self, samples: &[f32]) -> SpectrumSnapshot {
        let count = samples.len().min(self.fft_size);
        let recent = &samples[samples.len() - count..];

        // Apply Hann window to reduce spectral leakage
        let mut buffer: Vec<Complex<f32>> = recent
            .iter()
            .enumerate()
            .map(|(i, &s)| {
                let window =
                    0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / count as f32).cos());
                Complex::new(s * window, 0.0)
            })
            .collect();
        buffer.resize(self.fft_size, Complex::new(0.0, 0.0));

        self.fft.process(&mut buffer);

        let noise_gate_db = self.reference_level_db - 40.0;
        let db_range = self.reference_level_db - noise_gate_db;

        let values = self
            .window
            .clone()
            .map(|bin| {
                let magnitude = buffer[bin].norm() * 2.0 / self.fft_size as f32;
                let db = if magnitude > 1e-10 {
                    20.0 * magnitude.log10()
                } else {
                    -100.0
                };
                ((db - noise_gate_db) / db_range).clamp(0.0, 1.0)
            })
            .collect();

        SpectrumSnapshot::new(values)
    }
}

/// Maps the configured frequency window onto FFT bin indices for the actual
/// sample rate, clamped to Nyquist.
fn frequency_window(
    fft_size: usize,
    sample_rate: u32,
    min_freq_hz: f32,
    max_freq_hz: f32,
) -> Result<Range<usize>> {
    let freq_resolution = sample_rate as f32 / fft_size as f32;
    let from = (min_freq_hz / freq_resolution) as usize;
    let to = ((max_freq_hz / freq_resolution) as usize).min(fft_size / 2);
    ensure!(
        to >= from + 2,
        "frequency window {}-{} Hz resolves to fewer than two FFT bins at {} Hz sample rate",
        min_freq_hz,
        max_freq_hz,
        sample_rate
    );
    Ok(from..to)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_negotiation() {
        // 48 kHz / 1024 bins = 46.875 Hz per bin
        let window = frequency_window(1024, 48000, 0.0, 5000.0).unwrap();
        assert_eq!(window, 0..106);

        let window = frequency_window(1024, 48000, 1000.0, 2000.0).unwrap();
        assert_eq!(window, 21..42);
    }

    #[test]
    fn test_window_clamps_to_nyquist() {
        let window = frequency_window(1024, 48000, 0.0, 40000.0).unwrap();
        assert_eq!(window.end, 512);
    }

    #[test]
    fn test_degenerate_window_is_rejected() {
        assert!(frequency_window(1024, 48000, 1000.0, 1010.0).is_err());
        assert!(frequency_window(1024, 48000, 30000.0, 40000.0).is_err());
    }

    #[test]
    fn test_silence_analyzes_to_zeros() {
        let analyzer = SpectrumAnalyzer::new(1024, 0.0, 5000.0, 48000, -20).unwrap();
        let snapshot = analyzer.analyze(&vec![0.0; 1024]);
        assert_eq!(snapshot.len(), analyzer.window_len());
        assert!(snapshot.values().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_sine_peaks_at_its_bin() {
        let analyzer = SpectrumAnalyzer::new(1024, 0.0, 5000.0, 48000, -20).unwrap();

        // 1500 Hz sits exactly on bin 32 at 46.875 Hz resolution
        let freq = 1500.0f32;
        let samples: Vec<f32> = (0..1024)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / 48000.0).sin() * 0.5)
            .collect();

        let snapshot = analyzer.analyze(&samples);
        let values = snapshot.values();
        assert!(values.iter().all(|&v| (0.0..=1.0).contains(&v)));
        assert!(values[32] > 0.9);
        // Bins far from the tone stay below the noise gate
        assert!(values[100] < 0.1);
    }

    #[test]
    fn test_short_buffer_is_zero_padded() {
        let analyzer = SpectrumAnalyzer::new(1024, 0.0, 5000.0, 48000, -20).unwrap();
        let snapshot = analyzer.analyze(&vec![0.1; 256]);
        assert_eq!(snapshot.len(), analyzer.window_len());
    }
}
