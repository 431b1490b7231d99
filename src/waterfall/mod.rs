//! Audio-reactive waterfall rendering pipeline.
//!
//! A fixed cadence admits spectrum snapshots into a fixed-capacity history;
//! every render frame draws the whole history as receding line/ribbon strips,
//! interpolating the newest strip's position so the scroll appears continuous
//! between admissions.

pub mod backend;
pub mod camera;
pub mod clock;
pub mod geometry;
pub mod history;
pub mod orchestrator;
pub mod terminal;
pub mod ui;

pub use backend::{BufferId, Paint, Primitive, RenderBackend, Uniforms, Vertex};
pub use camera::Camera;
pub use clock::AdmissionClock;
pub use geometry::GeometryBuilder;
pub use history::{FrameRecord, HistoryRing};
pub use orchestrator::RenderOrchestrator;
pub use terminal::TerminalBackend;
pub use ui::{InputCommand, WaterfallTui};

#[cfg(test)]
pub(crate) mod test_support {
    //! Test doubles shared by the pipeline tests.

    use super::backend::{BufferId, Primitive, RenderBackend, Uniforms, Vertex};
    use crate::audio::{SpectrumSnapshot, SpectrumSource};
    use anyhow::{bail, Result};
    use std::collections::HashSet;

    /// One recorded `draw` invocation.
    #[derive(Debug, Clone, Copy)]
    pub struct DrawCall {
        pub id: BufferId,
        pub primitive: Primitive,
        pub vertex_count: usize,
        pub line_offset: f32,
        pub time_offset: f32,
    }

    /// Backend that records every call and can simulate allocation failures.
    pub struct RecordingBackend {
        next_id: u64,
        alive: HashSet<BufferId>,
        pub created: Vec<BufferId>,
        pub destroyed: Vec<BufferId>,
        pub draws: Vec<DrawCall>,
        /// Fail this many upcoming `create_buffer` calls
        pub fail_next_creates: usize,
        /// Fail every `create_buffer` call once this many have succeeded
        pub fail_after_creates: Option<usize>,
    }

    impl RecordingBackend {
        pub fn new() -> Self {
            Self {
                next_id: 0,
                alive: HashSet::new(),
                created: Vec::new(),
                destroyed: Vec::new(),
                draws: Vec::new(),
                fail_next_creates: 0,
                fail_after_creates: None,
            }
        }

        pub fn live_buffer_count(&self) -> usize {
            self.alive.len()
        }
    }

    impl RenderBackend for RecordingBackend {
        fn create_buffer(&mut self, _vertices: &[Vertex]) -> Result<BufferId> {
            if self.fail_next_creates > 0 {
                self.fail_next_creates -= 1;
                bail!("simulated buffer allocation failure");
            }
            if let Some(limit) = self.fail_after_creates {
                if self.created.len() >= limit {
                    bail!("simulated buffer allocation failure");
                }
            }
            let id = BufferId(self.next_id);
            self.next_id += 1;
            self.alive.insert(id);
            self.created.push(id);
            Ok(id)
        }

        fn destroy_buffer(&mut self, id: BufferId) {
            if self.alive.remove(&id) {
                self.destroyed.push(id);
            }
        }

        fn draw(
            &mut self,
            id: BufferId,
            primitive: Primitive,
            vertex_count: usize,
            uniforms: &Uniforms,
        ) -> Result<()> {
            if !self.alive.contains(&id) {
                bail!("draw on destroyed buffer {id:?}");
            }
            self.draws.push(DrawCall {
                id,
                primitive,
                vertex_count,
                line_offset: uniforms.line_offset,
                time_offset: uniforms.time_offset,
            });
            Ok(())
        }

        fn set_viewport(&mut self, _width: u16, _height: u16) {}
    }

    /// Spectrum source returning a fixed snapshot.
    pub struct FakeSpectrumSource {
        pub ready: bool,
        pub values: Vec<f32>,
    }

    impl FakeSpectrumSource {
        pub fn new(window_len: usize) -> Self {
            Self {
                ready: true,
                values: vec![0.5; window_len],
            }
        }
    }

    impl SpectrumSource for FakeSpectrumSource {
        fn window_len(&self) -> usize {
            self.values.len()
        }

        fn is_ready(&self) -> bool {
            self.ready
        }

        fn snapshot(&mut self) -> SpectrumSnapshot {
            SpectrumSnapshot::new(self.values.clone())
        }
    }
}
