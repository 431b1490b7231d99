//! Terminal implementation of the render backend.
//!
//! Vertex buffers live on the heap; draw calls run the full transform chain
//! (model → world → clip → NDC) on the CPU and emit colored segments that the
//! TUI paints onto a braille canvas.

use crate::waterfall::backend::{BufferId, Paint, Primitive, RenderBackend, Uniforms, Vertex};
use anyhow::{bail, Result};
use cgmath::Vector4;
use ratatui::style::Color;
use std::collections::HashMap;

/// Colored segment in normalized device coordinates ([-1, 1] both axes).
#[derive(Debug, Clone, Copy)]
pub struct Segment {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub color: Color,
}

/// Render backend that rasterizes into a per-frame segment list.
pub struct TerminalBackend {
    buffers: HashMap<BufferId, Vec<Vertex>>,
    next_id: u64,
    segments: Vec<Segment>,
    viewport: (u16, u16),
}

impl TerminalBackend {
    pub fn new() -> Self {
        Self {
            buffers: HashMap::new(),
            next_id: 0,
            segments: Vec::new(),
            viewport: (80, 24),
        }
    }

    /// Discards the previous frame's segments.
    pub fn begin_frame(&mut self) {
        self.segments.clear();
    }

    /// Segments produced by the draw calls since `begin_frame`.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Width/height ratio of the viewport, corrected for the roughly 2:1
    /// shape of a terminal cell.
    pub fn aspect_ratio(&self) -> f32 {
        let (width, height) = self.viewport;
        width as f32 / (height.max(1) as f32 * 2.0)
    }

    fn push_segment(&mut self, a: Vertex, b: Vertex, uniforms: &Uniforms) {
        let (Some(from), Some(to)) = (project(a, uniforms), project(b, uniforms)) else {
            // Behind the camera; nothing to paint
            return;
        };
        self.segments.push(Segment {
            x1: from.0,
            y1: from.1,
            x2: to.0,
            y2: to.1,
            color: color_for(a, uniforms),
        });
    }
}

impl Default for TerminalBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderBackend for TerminalBackend {
    fn create_buffer(&mut self, vertices: &[Vertex]) -> Result<BufferId> {
        let id = BufferId(self.next_id);
        self.next_id += 1;
        self.buffers.insert(id, vertices.to_vec());
        Ok(id)
    }

    fn destroy_buffer(&mut self, id: BufferId) {
        self.buffers.remove(&id);
    }

    fn draw(
        &mut self,
        id: BufferId,
        primitive: Primitive,
        vertex_count: usize,
        uniforms: &Uniforms,
    ) -> Result<()> {
        let Some(vertices) = self.buffers.get(&id) else {
            bail!("draw against unknown buffer {id:?}");
        };
        if vertex_count > vertices.len() {
            bail!(
                "draw requested {vertex_count} vertices from a buffer of {}",
                vertices.len()
            );
        }
        let vertices = vertices[..vertex_count].to_vec();

        match primitive {
            Primitive::LineStrip => {
                for pair in vertices.windows(2) {
                    self.push_segment(pair[0], pair[1], uniforms);
                }
            }
            Primitive::TriangleStrip => {
                // Ribbon pairs arrive as (magnitude, baseline) at the same x;
                // each pair fills one column of the strip.
                for pair in vertices.chunks_exact(2) {
                    self.push_segment(pair[0], pair[1], uniforms);
                }
            }
        }
        Ok(())
    }

    fn set_viewport(&mut self, width: u16, height: u16) {
        self.viewport = (width, height);
    }
}

/// Runs one vertex through the transform chain, returning NDC coordinates or
/// None when the vertex lands behind the camera.
fn project(vertex: Vertex, uniforms: &Uniforms) -> Option<(f64, f64)> {
    let scroll = uniforms.line_offset + uniforms.time_offset;
    let clip = uniforms.world_to_clip
        * uniforms.model_to_world
        * Vector4::new(vertex.x, vertex.y, -scroll, 1.0);
    if clip.w <= 0.0 {
        return None;
    }
    Some(((clip.x / clip.w) as f64, (clip.y / clip.w) as f64))
}

fn color_for(vertex: Vertex, uniforms: &Uniforms) -> Color {
    match uniforms.paint {
        Paint::Uniform(rgb) => to_rgb(rgb),
        Paint::Hue => {
            let scroll = uniforms.line_offset + uniforms.time_offset;
            let hue = (vertex.y * 1.2).min(1.0);
            let value = (1.0 - scroll * 0.6).clamp(0.0, 1.0);
            to_rgb(hsv_to_rgb(hue, 1.0, value))
        }
    }
}

fn to_rgb([r, g, b]: [f32; 3]) -> Color {
    Color::Rgb(
        (r.clamp(0.0, 1.0) * 255.0).round() as u8,
        (g.clamp(0.0, 1.0) * 255.0).round() as u8,
        (b.clamp(0.0, 1.0) * 255.0).round() as u8,
    )
}

/// HSV to RGB, all components in [0, 1].
fn hsv_to_rgb(h: f32, s: f32, v: f32) -> [f32; 3] {
    let h = (h.rem_euclid(1.0)) * 6.0;
    let i = h.floor();
    let f = h - i;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));
    match i as u32 % 6 {
        0 => [v, t, p],
        1 => [q, v, p],
        2 => [p, v, t],
        3 => [p, q, v],
        4 => [t, p, v],
        _ => [v, p, q],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{Matrix4, SquareMatrix};

    fn identity_uniforms(paint: Paint) -> Uniforms {
        Uniforms {
            line_offset: 0.0,
            time_offset: 0.0,
            model_to_world: Matrix4::identity(),
            world_to_clip: Matrix4::identity(),
            paint,
        }
    }

    #[test]
    fn test_line_strip_produces_joined_segments() {
        let mut backend = TerminalBackend::new();
        let id = backend
            .create_buffer(&[
                Vertex::new(0.0, 0.1),
                Vertex::new(0.5, 0.6),
                Vertex::new(1.0, 0.2),
            ])
            .unwrap();

        let uniforms = identity_uniforms(Paint::Uniform([1.0, 0.0, 0.0]));
        backend.draw(id, Primitive::LineStrip, 3, &uniforms).unwrap();

        let segments = backend.segments();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].x1, 0.0);
        assert_eq!(segments[0].x2, 0.5);
        assert_eq!(segments[1].x2, 1.0);
        assert_eq!(segments[0].color, Color::Rgb(255, 0, 0));
    }

    #[test]
    fn test_triangle_strip_fills_columns() {
        let mut backend = TerminalBackend::new();
        let id = backend
            .create_buffer(&[
                Vertex::new(0.0, 0.4),
                Vertex::new(0.0, 0.0),
                Vertex::new(1.0, 0.8),
                Vertex::new(1.0, 0.0),
            ])
            .unwrap();

        let uniforms = identity_uniforms(Paint::Uniform([0.0, 1.0, 0.0]));
        backend
            .draw(id, Primitive::TriangleStrip, 4, &uniforms)
            .unwrap();

        let segments = backend.segments();
        assert_eq!(segments.len(), 2);
        // Each column drops from the magnitude down to the baseline
        assert_eq!(segments[0].x1, segments[0].x2);
        assert_eq!(segments[0].y2, 0.0);
        assert_eq!(segments[1].x1, 1.0);
    }

    #[test]
    fn test_vertex_count_limits_the_draw() {
        let mut backend = TerminalBackend::new();
        let id = backend
            .create_buffer(&[
                Vertex::new(0.0, 0.0),
                Vertex::new(0.5, 0.5),
                Vertex::new(1.0, 1.0),
            ])
            .unwrap();

        let uniforms = identity_uniforms(Paint::Uniform([1.0, 1.0, 1.0]));
        backend.draw(id, Primitive::LineStrip, 2, &uniforms).unwrap();
        assert_eq!(backend.segments().len(), 1);

        assert!(backend.draw(id, Primitive::LineStrip, 4, &uniforms).is_err());
    }

    #[test]
    fn test_destroyed_buffer_cannot_be_drawn() {
        let mut backend = TerminalBackend::new();
        let id = backend.create_buffer(&[Vertex::new(0.0, 0.0)]).unwrap();
        backend.destroy_buffer(id);

        let uniforms = identity_uniforms(Paint::Hue);
        assert!(backend.draw(id, Primitive::LineStrip, 1, &uniforms).is_err());
    }

    #[test]
    fn test_hue_paint_dims_with_depth() {
        let brightness = |color: Color| match color {
            Color::Rgb(r, g, b) => r as u32 + g as u32 + b as u32,
            _ => panic!("expected rgb color"),
        };
        let near = identity_uniforms(Paint::Hue);
        let mut far = identity_uniforms(Paint::Hue);
        far.line_offset = 0.8;

        let vertex = Vertex::new(0.5, 0.3);
        assert!(brightness(color_for(vertex, &near)) > brightness(color_for(vertex, &far)));
    }

    #[test]
    fn test_begin_frame_clears_segments() {
        let mut backend = TerminalBackend::new();
        let id = backend
            .create_buffer(&[Vertex::new(0.0, 0.0), Vertex::new(1.0, 1.0)])
            .unwrap();
        let uniforms = identity_uniforms(Paint::Hue);
        backend.draw(id, Primitive::LineStrip, 2, &uniforms).unwrap();
        assert!(!backend.segments().is_empty());

        backend.begin_frame();
        assert!(backend.segments().is_empty());
    }

    #[test]
    fn test_aspect_ratio_accounts_for_cell_shape() {
        let mut backend = TerminalBackend::new();
        backend.set_viewport(100, 25);
        assert_eq!(backend.aspect_ratio(), 2.0);
    }
}
