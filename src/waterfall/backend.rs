//! Rendering backend abstraction.
//!
//! The waterfall pipeline produces geometry and draw calls against this
//! interface; the concrete backend decides how vertices become pixels (or
//! terminal cells). Keeping the boundary here lets the history/orchestration
//! logic be tested against a recording fake.

use anyhow::Result;
use cgmath::Matrix4;

/// Opaque handle to a vertex buffer owned by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(pub(crate) u64);

/// 2D vertex in model space, x and y both in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub x: f32,
    pub y: f32,
}

impl Vertex {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Primitive topology for a draw call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    /// Consecutive vertices joined into a polyline
    LineStrip,
    /// Alternating top/baseline vertex pairs forming a filled strip
    TriangleStrip,
}

/// How a draw call is colored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Paint {
    /// Hue from vertex height, brightness falling off with depth
    Hue,
    /// Fixed color, components in [0, 1]
    Uniform([f32; 3]),
}

/// Per-draw uniform values.
///
/// `line_offset + time_offset` is the strip's scroll position: vertices are
/// placed at z = -(line_offset + time_offset) in model space before the
/// transform chain is applied.
#[derive(Debug, Clone, Copy)]
pub struct Uniforms {
    /// Normalized history rank of the strip, 0 = newest
    pub line_offset: f32,
    /// Sub-slot interpolation toward the next rank
    pub time_offset: f32,
    pub model_to_world: Matrix4<f32>,
    pub world_to_clip: Matrix4<f32>,
    pub paint: Paint,
}

/// Vertex-buffer and draw-call surface consumed by the waterfall pipeline.
pub trait RenderBackend {
    /// Uploads vertices into a new buffer and returns its handle.
    fn create_buffer(&mut self, vertices: &[Vertex]) -> Result<BufferId>;

    /// Releases a buffer. Unknown handles are ignored.
    fn destroy_buffer(&mut self, id: BufferId);

    /// Draws the first `vertex_count` vertices of a buffer.
    ///
    /// # Errors
    /// - If the handle does not refer to a live buffer
    fn draw(
        &mut self,
        id: BufferId,
        primitive: Primitive,
        vertex_count: usize,
        uniforms: &Uniforms,
    ) -> Result<()>;

    /// Informs the backend of the current output size in cells/pixels.
    fn set_viewport(&mut self, width: u16, height: u16);
}
