//! Identity-keyed LRU vertex cache.
//!
//! Maps a vertex identity (an element index for array draws, or an internal
//! counter for immediate-mode vertices) to one of [`VERTEX_CACHE_SIZE`] slots.
//! A miss always succeeds by evicting the least recently used slot. A locked
//! slot is never evicted until the next reset.

pub const VERTEX_CACHE_SIZE: usize = 32;

const INFINITE_AGE: u32 = u32::MAX;

#[derive(Clone, Debug)]
pub struct VertexCache {
    ids: [Option<u32>; VERTEX_CACHE_SIZE],
    ages: [u32; VERTEX_CACHE_SIZE],
    next_age: u32,
}

impl Default for VertexCache {
    fn default() -> Self {
        Self {
            ids: [None; VERTEX_CACHE_SIZE],
            ages: [0; VERTEX_CACHE_SIZE],
            next_age: 1,
        }
    }
}

impl VertexCache {
    /// Forget every identity binding and lock.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Look up `id`, returning its slot and whether it was already resident.
    ///
    /// On a miss the least recently used slot is rebound to `id`; the caller
    /// must treat its contents as stale.
    pub fn get_cache_slot(&mut self, id: u32) -> (usize, bool) {
        self.lookup(id, false)
    }

    /// Like [`VertexCache::get_cache_slot`], but pins the slot so it survives
    /// until the next reset.
    pub fn get_locked_cache_slot(&mut self, id: u32) -> (usize, bool) {
        self.lookup(id, true)
    }

    fn lookup(&mut self, id: u32, lock: bool) -> (usize, bool) {
        let mut oldest = 0;
        let mut hit = None;
        for slot in 0..VERTEX_CACHE_SIZE {
            if self.ids[slot] == Some(id) {
                hit = Some(slot);
                break;
            }
            if self.ages[slot] < self.ages[oldest] {
                oldest = slot;
            }
        }

        let (slot, is_hit) = match hit {
            Some(slot) => (slot, true),
            None => {
                debug_assert!(
                    self.ages[oldest] != INFINITE_AGE,
                    "every vertex cache slot is locked"
                );
                self.ids[oldest] = Some(id);
                (oldest, false)
            }
        };

        if lock {
            self.ages[slot] = INFINITE_AGE;
        } else if self.ages[slot] != INFINITE_AGE {
            self.ages[slot] = self.next_age;
            self.next_age += 1;
        }

        (slot, is_hit)
    }

    /// Identity currently bound to `slot`.
    pub fn identity(&self, slot: usize) -> Option<u32> {
        self.ids[slot]
    }

    /// Number of slots bound to an identity.
    pub fn resident(&self) -> usize {
        self.ids.iter().filter(|id| id.is_some()).count()
    }
}
