//! Fixed-capacity history of admitted spectrum strips.
//!
//! The ring exclusively owns the vertex buffers of its records: eviction and
//! release happen together inside `push`, so no handle outlives its slot.

use crate::waterfall::backend::{BufferId, RenderBackend};
use std::collections::VecDeque;

/// Renderable geometry for one admitted spectrum snapshot.
#[derive(Debug)]
pub struct FrameRecord {
    line: BufferId,
    line_vertex_count: usize,
    ribbon: Option<BufferId>,
    ribbon_vertex_count: usize,
}

impl FrameRecord {
    pub fn new(
        line: BufferId,
        line_vertex_count: usize,
        ribbon: Option<BufferId>,
        ribbon_vertex_count: usize,
    ) -> Self {
        Self {
            line,
            line_vertex_count,
            ribbon,
            ribbon_vertex_count,
        }
    }

    pub fn line(&self) -> BufferId {
        self.line
    }

    pub fn line_vertex_count(&self) -> usize {
        self.line_vertex_count
    }

    pub fn ribbon(&self) -> Option<BufferId> {
        self.ribbon
    }

    pub fn ribbon_vertex_count(&self) -> usize {
        self.ribbon_vertex_count
    }

    /// Releases the record's buffers back to the backend.
    fn release(self, gpu: &mut dyn RenderBackend) {
        gpu.destroy_buffer(self.line);
        if let Some(ribbon) = self.ribbon {
            gpu.destroy_buffer(ribbon);
        }
    }
}

/// Ordered history of `FrameRecord`s, newest at the front.
#[derive(Debug)]
pub struct HistoryRing {
    records: VecDeque<FrameRecord>,
    capacity: usize,
}

impl HistoryRing {
    /// Creates an empty ring holding at most `capacity` records.
    ///
    /// # Panics
    /// If `capacity` is zero. Configuration validation rejects this before a
    /// ring is ever constructed.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity >= 1, "history ring capacity must be at least 1");
        Self {
            records: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Inserts a record at the front (newest). When the ring is full the
    /// oldest record is evicted and its buffers released, exactly one per
    /// push.
    pub fn push(&mut self, record: FrameRecord, gpu: &mut dyn RenderBackend) {
        self.records.push_front(record);
        if self.records.len() > self.capacity {
            // push grows the ring by exactly one, so one eviction restores
            // the invariant
            debug_assert_eq!(self.records.len(), self.capacity + 1);
            if let Some(evicted) = self.records.pop_back() {
                evicted.release(gpu);
            }
        }
    }

    /// Iterates records from newest to oldest, paired with their depth index
    /// (0 = newest). Non-mutating and restartable.
    pub fn iter(&self) -> impl Iterator<Item = (&FrameRecord, usize)> {
        self.records.iter().enumerate().map(|(depth, record)| (record, depth))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::waterfall::test_support::RecordingBackend;

    fn record(gpu: &mut RecordingBackend) -> FrameRecord {
        let line = gpu.create_buffer(&[]).unwrap();
        let ribbon = gpu.create_buffer(&[]).unwrap();
        FrameRecord::new(line, 3, Some(ribbon), 6)
    }

    #[test]
    fn test_len_tracks_min_of_pushes_and_capacity() {
        let mut gpu = RecordingBackend::new();
        let mut ring = HistoryRing::new(4);

        for pushes in 1..=10 {
            let r = record(&mut gpu);
            ring.push(r, &mut gpu);
            assert_eq!(ring.len(), pushes.min(4));
        }
    }

    #[test]
    fn test_first_pushed_record_is_evicted_first() {
        let mut gpu = RecordingBackend::new();
        let mut ring = HistoryRing::new(3);

        let first = record(&mut gpu);
        let first_line = first.line();
        let first_ribbon = first.ribbon().unwrap();
        ring.push(first, &mut gpu);

        for _ in 0..2 {
            let r = record(&mut gpu);
            ring.push(r, &mut gpu);
        }
        assert!(gpu.destroyed.is_empty());

        let r = record(&mut gpu);
        ring.push(r, &mut gpu);
        assert_eq!(gpu.destroyed, vec![first_line, first_ribbon]);
        assert_eq!(ring.len(), 3);
    }

    #[test]
    fn test_exactly_one_eviction_per_push() {
        let mut gpu = RecordingBackend::new();
        let mut ring = HistoryRing::new(2);

        for _ in 0..6 {
            let r = record(&mut gpu);
            ring.push(r, &mut gpu);
        }
        // 6 pushes into capacity 2: 4 evictions, 2 buffers each
        assert_eq!(gpu.destroyed.len(), 8);
        assert_eq!(gpu.live_buffer_count(), 4);
    }

    #[test]
    fn test_iteration_is_newest_first_and_idempotent() {
        let mut gpu = RecordingBackend::new();
        let mut ring = HistoryRing::new(3);

        let mut lines = Vec::new();
        for _ in 0..3 {
            let r = record(&mut gpu);
            lines.push(r.line());
            ring.push(r, &mut gpu);
        }

        let pass: Vec<_> = ring.iter().map(|(r, depth)| (r.line(), depth)).collect();
        assert_eq!(
            pass,
            vec![(lines[2], 0), (lines[1], 1), (lines[0], 2)]
        );

        let again: Vec<_> = ring.iter().map(|(r, depth)| (r.line(), depth)).collect();
        assert_eq!(pass, again);
    }

    #[test]
    #[should_panic]
    fn test_zero_capacity_fails_fast() {
        let _ = HistoryRing::new(0);
    }
}
