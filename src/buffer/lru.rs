//! Clock-free LRU replacement policy over a fixed set of frame ids.
//!
//! Grounded on `examples/original_source/lib/buffer/lru_replacer.go`'s
//! `DoubleLinkedList` + `index` map. Go builds that list from raw pointers;
//! here the list lives in an arena indexed by frame id (frame ids are a
//! dense `0..capacity` range, so a `Vec`-backed arena needs no allocation
//! per node and no unsafe code).

use parking_lot::Mutex;

#[derive(Debug, Clone, Copy)]
struct Link {
    prev: Option<usize>,
    next: Option<usize>,
}

struct State {
    nodes: Vec<Link>,
    present: Vec<bool>,
    head: Option<usize>, // most recently unpinned
    tail: Option<usize>, // least recently unpinned, next victim
    len: usize,
}

/// Tracks which frames are eligible for eviction, ordered by recency of
/// their last [`unpin`](LruReplacer::unpin) call.
pub struct LruReplacer {
    capacity: usize,
    state: Mutex<State>,
}

impl LruReplacer {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let nodes = vec![Link { prev: None, next: None }; capacity];
        let present = vec![false; capacity];
        Self { capacity, state: Mutex::new(State { nodes, present, head: None, tail: None, len: 0 }) }
    }

    /// Marks `frame_id` eligible for eviction (most recently used end).
    pub fn unpin(&self, frame_id: usize) {
        let mut s = self.state.lock();
        if s.present[frame_id] {
            return;
        }
        s.present[frame_id] = true;
        s.len += 1;

        let old_head = s.head;
        s.nodes[frame_id] = Link { prev: None, next: old_head };
        if let Some(h) = old_head {
            s.nodes[h].prev = Some(frame_id);
        }
        s.head = Some(frame_id);
        if s.tail.is_none() {
            s.tail = Some(frame_id);
        }
    }

    /// Marks `frame_id` ineligible for eviction (removes it from the list).
    pub fn pin(&self, frame_id: usize) {
        self.remove(frame_id);
    }

    /// Evicts and returns the least recently unpinned frame id, if any.
    pub fn victim(&self) -> Option<usize> {
        let mut s = self.state.lock();
        let tail = s.tail?;
        self.unlink(&mut s, tail);
        Some(tail)
    }

    /// Removes `frame_id` from the replacer if present, leaving eviction
    /// eligibility unchanged for every other frame.
    pub fn remove(&self, frame_id: usize) {
        let mut s = self.state.lock();
        if s.present[frame_id] {
            self.unlink(&mut s, frame_id);
        }
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.state.lock().len
    }

    fn unlink(&self, s: &mut State, frame_id: usize) {
        let Link { prev, next } = s.nodes[frame_id];
        match prev {
            Some(p) => s.nodes[p].next = next,
            None => s.head = next,
        }
        match next {
            Some(n) => s.nodes[n].prev = prev,
            None => s.tail = prev,
        }
        s.present[frame_id] = false;
        s.len -= 1;
    }
}
