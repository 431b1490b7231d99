//! Spectrum snapshot to vertex geometry conversion.
//!
//! Both builders are pure: they allocate and return the vertex buffer and
//! leave ownership with the caller.

use crate::audio::SpectrumSnapshot;
use crate::waterfall::backend::Vertex;
use anyhow::{ensure, Result};

/// Builds line and ribbon geometry for snapshots of a negotiated length.
#[derive(Debug, Clone, Copy)]
pub struct GeometryBuilder {
    window_len: usize,
}

impl GeometryBuilder {
    /// Creates a builder for snapshots of exactly `window_len` magnitudes.
    ///
    /// `window_len` must be at least 2; the frequency-window negotiation in
    /// the audio layer guarantees this before the builder is constructed.
    pub fn new(window_len: usize) -> Self {
        assert!(window_len >= 2, "spectrum window must span at least 2 bins");
        Self { window_len }
    }

    /// Builds the line strip: one vertex per magnitude, x spread evenly
    /// across [0, 1], y the magnitude itself.
    ///
    /// # Errors
    /// - If the snapshot length does not match the negotiated window length
    pub fn build_line(&self, snapshot: &SpectrumSnapshot) -> Result<Vec<Vertex>> {
        self.check_len(snapshot)?;
        let n = snapshot.len();
        let vertices = snapshot
            .values()
            .iter()
            .enumerate()
            .map(|(i, &magnitude)| Vertex::new(i as f32 / (n - 1) as f32, magnitude))
            .collect();
        Ok(vertices)
    }

    /// Builds the filled ribbon as a triangle strip: each magnitude vertex is
    /// paired with a baseline vertex at the same x, interleaved.
    ///
    /// # Errors
    /// - If the snapshot length does not match the negotiated window length
    pub fn build_ribbon(&self, snapshot: &SpectrumSnapshot) -> Result<Vec<Vertex>> {
        self.check_len(snapshot)?;
        let n = snapshot.len();
        let mut vertices = Vec::with_capacity(2 * n);
        for (i, &magnitude) in snapshot.values().iter().enumerate() {
            let x = i as f32 / (n - 1) as f32;
            vertices.push(Vertex::new(x, magnitude));
            vertices.push(Vertex::new(x, 0.0));
        }
        Ok(vertices)
    }

    fn check_len(&self, snapshot: &SpectrumSnapshot) -> Result<()> {
        ensure!(
            snapshot.len() == self.window_len,
            "snapshot length {} does not match the negotiated spectrum window of {} bins",
            snapshot.len(),
            self.window_len
        );
        Ok(())
    }
}
