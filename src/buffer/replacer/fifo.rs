//! FIFO-over-unpin replacement policy.
//!
//! Frames become candidates when their pin count drops to zero and are
//! victimized in the order they became candidates. Touching a candidate
//! again without pinning it does not move it. This approximates LRU by
//! "time of becoming unpinned", not by access recency.

use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;

use crate::common::FrameId;

/// Candidate queue with lazy deletion.
///
/// Each enqueue gets a fresh sequence number; `members` holds the live
/// sequence number of every candidate, so queue entries whose number no
/// longer matches are stale and skipped.
struct FifoState {
    queue: VecDeque<(u64, FrameId)>,
    members: HashMap<FrameId, u64>,
    next_seq: u64,
}

impl FifoState {
    fn enqueue_back(&mut self, frame_id: FrameId) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.members.insert(frame_id, seq);
        self.queue.push_back((seq, frame_id));
    }

    fn enqueue_front(&mut self, frame_id: FrameId) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.members.insert(frame_id, seq);
        self.queue.push_front((seq, frame_id));
    }

    /// Drop stale entries once they outnumber live ones.
    fn compact(&mut self) {
        if self.queue.len() > 2 * self.members.len() + 16 {
            let members = &self.members;
            self.queue
                .retain(|(seq, fid)| members.get(fid) == Some(seq));
        }
    }
}

/// FIFO replacer for the buffer pool.
///
/// Has its own latch. The buffer pool only calls into it while holding
/// the pool latch (pool outer, replacer inner).
pub struct FifoReplacer {
    inner: Mutex<FifoState>,
    num_frames: usize,
}

impl FifoReplacer {
    /// Create a replacer tracking up to `num_frames` frames.
    pub fn new(num_frames: usize) -> Self {
        Self {
            inner: Mutex::new(FifoState {
                queue: VecDeque::with_capacity(num_frames),
                members: HashMap::with_capacity(num_frames),
                next_seq: 0,
            }),
            num_frames,
        }
    }

    /// Remove and return the earliest candidate, or None if there is none.
    pub fn victim(&self) -> Option<FrameId> {
        let mut state = self.inner.lock();
        while let Some((seq, frame_id)) = state.queue.pop_front() {
            if state.members.get(&frame_id) == Some(&seq) {
                state.members.remove(&frame_id);
                return Some(frame_id);
            }
        }
        None
    }

    /// The frame is pinned: it stops being a candidate. Idempotent.
    pub fn pin(&self, frame_id: FrameId) {
        let mut state = self.inner.lock();
        if state.members.remove(&frame_id).is_some() {
            state.compact();
        }
    }

    /// The frame's pin count reached zero: append it as a candidate unless
    /// it already is one. Idempotent.
    pub fn unpin(&self, frame_id: FrameId) {
        debug_assert!(frame_id.0 < self.num_frames, "{} out of range", frame_id);
        let mut state = self.inner.lock();
        if !state.members.contains_key(&frame_id) {
            state.enqueue_back(frame_id);
        }
    }

    /// Forget a frame entirely (its page was deleted).
    pub fn remove(&self, frame_id: FrameId) {
        self.pin(frame_id);
    }

    /// Put a frame returned by [`victim`](Self::victim) back at the head of
    /// the queue, undoing an eviction that could not be completed.
    pub fn restore(&self, frame_id: FrameId) {
        let mut state = self.inner.lock();
        if !state.members.contains_key(&frame_id) {
            state.enqueue_front(frame_id);
        }
    }

    /// Whether the frame is currently an eviction candidate.
    pub fn is_candidate(&self, frame_id: FrameId) -> bool {
        self.inner.lock().members.contains_key(&frame_id)
    }

    /// Number of eviction candidates.
    pub fn size(&self) -> usize {
        self.inner.lock().members.len()
    }
}
