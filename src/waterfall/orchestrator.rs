//! Per-frame driver for the waterfall.
//!
//! Owns the admission clock, the history ring and the scene transforms, and
//! turns one render tick into: maybe admit a new spectrum strip, then draw
//! every strip at its interpolated scroll position.

use crate::audio::SpectrumSource;
use crate::config::{ColorMode, RenderStyle, WaterfallConfig};
use crate::waterfall::backend::{Paint, Primitive, RenderBackend, Uniforms};
use crate::waterfall::camera::Camera;
use crate::waterfall::clock::AdmissionClock;
use crate::waterfall::geometry::GeometryBuilder;
use crate::waterfall::history::{FrameRecord, HistoryRing};
use anyhow::Result;
use cgmath::{Matrix4, Point3, Rad, Vector3};
use std::time::Instant;

/// Scene framing: model space [0,1]² is widened and dropped below the camera
/// so the newest strip starts just ahead of the viewer.
const SCENE_SCALE: [f32; 3] = [4.0, 1.0, 4.0];
const SCENE_TRANSLATION: [f32; 3] = [-0.5, -1.0, 0.0];
const CAMERA_EYE: [f32; 3] = [0.0, 1.0, 4.0];

/// Drives admission and drawing for one waterfall session.
pub struct RenderOrchestrator {
    clock: AdmissionClock,
    ring: HistoryRing,
    builder: GeometryBuilder,
    camera: Camera,
    model_to_world: Matrix4<f32>,
}

impl RenderOrchestrator {
    /// Creates an orchestrator for snapshots of `window_len` bins, with the
    /// admission interval measured from `now`.
    pub fn new(config: &WaterfallConfig, window_len: usize, now: Instant) -> Self {
        let mut camera = Camera::new(Rad(std::f32::consts::FRAC_PI_4), 1.0, 0.1, 1000.0);
        camera.look_at(
            Point3::from(CAMERA_EYE),
            Point3::new(0.0, 0.0, 0.0),
            Vector3::unit_y(),
        );

        let model_to_world = Matrix4::from_nonuniform_scale(
            SCENE_SCALE[0],
            SCENE_SCALE[1],
            SCENE_SCALE[2],
        ) * Matrix4::from_translation(Vector3::from(SCENE_TRANSLATION));

        Self {
            clock: AdmissionClock::new(config.admission_hz, now),
            ring: HistoryRing::new(config.capacity),
            builder: GeometryBuilder::new(window_len),
            camera,
            model_to_world,
        }
    }

    /// Updates the camera projection for a new output aspect ratio.
    pub fn set_aspect(&mut self, aspect: f32) {
        self.camera.set_aspect(aspect);
    }

    pub fn history(&self) -> &HistoryRing {
        &self.ring
    }

    /// Runs one render tick: polls the admission clock, possibly admits a new
    /// strip from the source, then draws the whole history.
    ///
    /// A failed admission (source hiccup, buffer creation failure) is logged
    /// and skipped without touching the history; only draw errors propagate.
    pub fn frame(
        &mut self,
        now: Instant,
        source: &mut dyn SpectrumSource,
        gpu: &mut dyn RenderBackend,
        style: &RenderStyle,
    ) -> Result<()> {
        if self.clock.tick(now) && source.is_ready() {
            if let Err(err) = self.admit(source, gpu) {
                tracing::warn!("Skipping spectrum strip this frame: {err:#}");
            }
        }
        self.draw(gpu, style)
    }

    /// Pulls a snapshot, builds its geometry, uploads both buffers and pushes
    /// the record. The ring is only touched once both uploads succeeded.
    fn admit(&mut self, source: &mut dyn SpectrumSource, gpu: &mut dyn RenderBackend) -> Result<()> {
        let snapshot = source.snapshot();
        let line = self.builder.build_line(&snapshot)?;
        let ribbon = self.builder.build_ribbon(&snapshot)?;

        let line_buffer = gpu.create_buffer(&line)?;
        let ribbon_buffer = match gpu.create_buffer(&ribbon) {
            Ok(id) => id,
            Err(err) => {
                gpu.destroy_buffer(line_buffer);
                return Err(err);
            }
        };

        self.ring.push(
            FrameRecord::new(line_buffer, line.len(), Some(ribbon_buffer), ribbon.len()),
            gpu,
        );
        Ok(())
    }

    /// Draws the ribbon layer, then the line layer, newest strip first.
    ///
    /// Depth testing is not assumed, so each layer walks the whole history in
    /// depth order before the next layer starts.
    fn draw(&mut self, gpu: &mut dyn RenderBackend, style: &RenderStyle) -> Result<()> {
        let world_to_clip = self.camera.world_to_clip_matrix();
        let paint = match style.color_mode {
            ColorMode::Hue => Paint::Hue,
            ColorMode::Uniform => {
                let [r, g, b] = style.uniform_color;
                Paint::Uniform([r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0])
            }
        };

        if style.ribbon {
            for (record, depth) in self.ring.iter() {
                if let Some(ribbon) = record.ribbon() {
                    let uniforms = self.uniforms(depth, world_to_clip, paint);
                    gpu.draw(
                        ribbon,
                        Primitive::TriangleStrip,
                        record.ribbon_vertex_count(),
                        &uniforms,
                    )?;
                }
            }
        }
        if style.line {
            for (record, depth) in self.ring.iter() {
                let uniforms = self.uniforms(depth, world_to_clip, paint);
                gpu.draw(
                    record.line(),
                    Primitive::LineStrip,
                    record.line_vertex_count(),
                    &uniforms,
                )?;
            }
        }
        Ok(())
    }

    /// Scroll placement for one strip. The newest strip advances by the
    /// fractional carry-over so motion stays continuous between admissions;
    /// older strips sit one full slot-step further back.
    fn uniforms(&self, depth: usize, world_to_clip: Matrix4<f32>, paint: Paint) -> Uniforms {
        let capacity = self.ring.capacity() as f32;
        let time_offset = if depth == 0 {
            self.clock.progress() / capacity
        } else {
            1.0 / capacity
        };
        Uniforms {
            line_offset: depth as f32 / capacity,
            time_offset,
            model_to_world: self.model_to_world,
            world_to_clip,
            paint,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::waterfall::test_support::{FakeSpectrumSource, RecordingBackend};
    use std::time::Duration;

    fn config(capacity: usize, admission_hz: f64) -> WaterfallConfig {
        WaterfallConfig {
            capacity,
            admission_hz,
            style: RenderStyle::default(),
        }
    }

    fn at(base: Instant, ms: u64) -> Instant {
        base + Duration::from_millis(ms)
    }

    #[test]
    fn test_end_to_end_admission_and_eviction() {
        let base = Instant::now();
        let mut orchestrator = RenderOrchestrator::new(&config(3, 10.0), 8, base);
        let mut source = FakeSpectrumSource::new(8);
        let mut gpu = RecordingBackend::new();
        let style = RenderStyle::default();

        // A admitted; a tick inside the interval admits nothing
        orchestrator.frame(at(base, 110), &mut source, &mut gpu, &style).unwrap();
        assert_eq!(orchestrator.history().len(), 1);
        orchestrator.frame(at(base, 160), &mut source, &mut gpu, &style).unwrap();
        assert_eq!(orchestrator.history().len(), 1);

        // B, C fill the ring
        orchestrator.frame(at(base, 220), &mut source, &mut gpu, &style).unwrap();
        orchestrator.frame(at(base, 330), &mut source, &mut gpu, &style).unwrap();
        assert_eq!(orchestrator.history().len(), 3);
        assert!(gpu.destroyed.is_empty());

        // D evicts A: the first two buffers ever created (A's line + ribbon)
        let a_buffers: Vec<_> = gpu.created[0..2].to_vec();
        orchestrator.frame(at(base, 440), &mut source, &mut gpu, &style).unwrap();
        assert_eq!(orchestrator.history().len(), 3);
        assert_eq!(gpu.destroyed, a_buffers);
        // 4 records * 2 buffers, minus the 2 released
        assert_eq!(gpu.live_buffer_count(), 6);
    }

    #[test]
    fn test_source_not_ready_skips_admission() {
        let base = Instant::now();
        let mut orchestrator = RenderOrchestrator::new(&config(3, 10.0), 8, base);
        let mut source = FakeSpectrumSource::new(8);
        source.ready = false;
        let mut gpu = RecordingBackend::new();

        orchestrator
            .frame(at(base, 500), &mut source, &mut gpu, &RenderStyle::default())
            .unwrap();
        assert!(orchestrator.history().is_empty());
        assert!(gpu.created.is_empty());
    }

    #[test]
    fn test_failed_line_upload_leaves_ring_untouched() {
        let base = Instant::now();
        let mut orchestrator = RenderOrchestrator::new(&config(3, 10.0), 8, base);
        let mut source = FakeSpectrumSource::new(8);
        let mut gpu = RecordingBackend::new();
        gpu.fail_next_creates = 1;

        orchestrator
            .frame(at(base, 110), &mut source, &mut gpu, &RenderStyle::default())
            .unwrap();
        assert!(orchestrator.history().is_empty());
        assert_eq!(gpu.live_buffer_count(), 0);
    }

    #[test]
    fn test_failed_ribbon_upload_releases_line_buffer() {
        let base = Instant::now();
        let mut orchestrator = RenderOrchestrator::new(&config(3, 10.0), 8, base);
        let mut source = FakeSpectrumSource::new(8);
        let mut gpu = RecordingBackend::new();
        // Line upload succeeds, ribbon upload fails
        gpu.fail_after_creates = Some(1);

        orchestrator
            .frame(at(base, 110), &mut source, &mut gpu, &RenderStyle::default())
            .unwrap();
        assert!(orchestrator.history().is_empty());
        assert_eq!(gpu.created.len(), 1);
        assert_eq!(gpu.destroyed, gpu.created);
        assert_eq!(gpu.live_buffer_count(), 0);
    }

    #[test]
    fn test_draw_order_and_offsets() {
        let base = Instant::now();
        let mut orchestrator = RenderOrchestrator::new(&config(4, 10.0), 8, base);
        let mut source = FakeSpectrumSource::new(8);
        let mut gpu = RecordingBackend::new();
        let style = RenderStyle::default();

        orchestrator.frame(at(base, 105), &mut source, &mut gpu, &style).unwrap();
        gpu.draws.clear();
        // Second admission with 15ms carry-over: progress = 0.15
        orchestrator.frame(at(base, 215), &mut source, &mut gpu, &style).unwrap();

        // Ribbon layer first (both strips), then the line layer
        assert_eq!(gpu.draws.len(), 4);
        assert_eq!(gpu.draws[0].primitive, Primitive::TriangleStrip);
        assert_eq!(gpu.draws[1].primitive, Primitive::TriangleStrip);
        assert_eq!(gpu.draws[2].primitive, Primitive::LineStrip);
        assert_eq!(gpu.draws[3].primitive, Primitive::LineStrip);
        assert_eq!(gpu.draws[2].vertex_count, 8);
        assert_eq!(gpu.draws[0].vertex_count, 16);
        // The newest line draw uses the buffer from the second admission
        assert_eq!(gpu.draws[2].id, gpu.created[2]);

        // depth 0 gets the fractional carry-over, depth 1 a full slot-step
        let newest = &gpu.draws[2];
        let older = &gpu.draws[3];
        assert_eq!(newest.line_offset, 0.0);
        assert_eq!(older.line_offset, 0.25);
        assert!((newest.time_offset - 0.15 / 4.0).abs() < 1e-4);
        assert!((older.time_offset - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_style_toggles_gate_layers() {
        let base = Instant::now();
        let mut orchestrator = RenderOrchestrator::new(&config(3, 10.0), 8, base);
        let mut source = FakeSpectrumSource::new(8);
        let mut gpu = RecordingBackend::new();

        let mut style = RenderStyle::default();
        style.ribbon = false;
        orchestrator.frame(at(base, 110), &mut source, &mut gpu, &style).unwrap();
        assert!(gpu
            .draws
            .iter()
            .all(|draw| draw.primitive == Primitive::LineStrip));

        gpu.draws.clear();
        style.ribbon = true;
        style.line = false;
        orchestrator.frame(at(base, 120), &mut source, &mut gpu, &style).unwrap();
        assert!(gpu
            .draws
            .iter()
            .all(|draw| draw.primitive == Primitive::TriangleStrip));
    }
}
