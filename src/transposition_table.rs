use std::sync::{atomic::*, Arc};

use crate::SIZE;

// prime capacity spreads the additive position keys well
const TABLE_MAX_SIZE: usize = (1 << 23) + 9;

// a fail-low stores the window edge itself, and search windows can sit a few
// plies outside the provable score range, so the packing spans the widest
// window rather than [MIN_SCORE, MAX_SCORE]
const PACK_FLOOR: i32 = -(SIZE as i32) / 2 - 1;

/// How a stored score relates to the true value of the position
///
/// Alpha-beta with fail-soft semantics proves exact values only inside the
/// open window; a beta-cutoff proves a lower bound and a fail-low an upper
/// bound.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Bound {
    Upper,
    Lower,
    Exact,
}

/// Packs a score and its bound into one non-zero byte
///
/// Bits 0-5 hold `score - PACK_FLOOR + 1` (so a packed value is never 0,
/// which marks a vacant entry), bits 6-7 hold the bound.
pub fn pack_entry(score: i32, bound: Bound) -> u8 {
    let flag = match bound {
        Bound::Upper => 0,
        Bound::Lower => 1,
        Bound::Exact => 2,
    };
    (score - PACK_FLOOR + 1) as u8 | (flag << 6)
}

pub fn unpack_entry(value: u8) -> (i32, Bound) {
    let score = (value & 0x3f) as i32 + PACK_FLOOR - 1;
    let bound = match value >> 6 {
        0 => Bound::Upper,
        1 => Bound::Lower,
        _ => Bound::Exact,
    };
    (score, bound)
}

/// Storage interface shared by the single-threaded and the concurrent table
///
/// A table is a performance hint only: `get` may miss for a position that was
/// stored earlier (collisions overwrite unconditionally), and the search must
/// recompute on a miss. Disabling the table entirely never changes a computed
/// score.
pub trait PositionTable {
    /// Returns the packed entry for `key`, or 0 on a miss
    fn get(&self, key: u64) -> u8;
    /// Stores a packed entry, unconditionally replacing any collision
    fn set(&mut self, key: u64, value: u8);
}

#[derive(Copy, Clone)]
struct Entry {
    key: u32,
    value: u8,
}

impl Entry {
    pub fn new() -> Self {
        Self { key: 0, value: 0 }
    }
}

/// Fixed-capacity cache from position key to packed score/bound
///
/// Only the low 32 bits of the key are stored; the table index supplies the
/// rest of the discrimination.
#[derive(Clone)]
pub struct TranspositionTable {
    entries: Vec<Entry>,
}

impl TranspositionTable {
    pub fn new() -> Self {
        Self {
            entries: vec![Entry::new(); TABLE_MAX_SIZE],
        }
    }
}

impl PositionTable for TranspositionTable {
    fn set(&mut self, key: u64, value: u8) {
        let len = self.entries.len();
        self.entries[key as usize % len] = Entry {
            key: key as u32,
            value,
        };
    }

    fn get(&self, key: u64) -> u8 {
        let entry = self.entries[key as usize % self.entries.len()];
        if entry.key == key as u32 {
            entry.value
        } else {
            0
        }
    }
}

impl Default for TranspositionTable {
    fn default() -> Self {
        Self::new()
    }
}

struct SharedEntry {
    key: AtomicU32,
    value: AtomicU8,
}

impl SharedEntry {
    pub fn new() -> Self {
        Self {
            key: AtomicU32::new(0),
            value: AtomicU8::new(0),
        }
    }
}

/// A transposition table safe for concurrent root-move searches
///
/// The key is stored XOR-ed with the value so that a torn write from another
/// thread reads back as a miss instead of a wrong score. Replacement is
/// last-writer-wins; entries are advisory, so a lost write only costs
/// recomputation.
#[derive(Clone)]
pub struct SharedTranspositionTable {
    entries: Arc<Vec<SharedEntry>>,
}

impl SharedTranspositionTable {
    pub fn new() -> Self {
        let mut entries = Vec::with_capacity(TABLE_MAX_SIZE);
        for _ in 0..TABLE_MAX_SIZE {
            entries.push(SharedEntry::new());
        }
        Self {
            entries: Arc::new(entries),
        }
    }
}

impl PositionTable for SharedTranspositionTable {
    fn set(&mut self, key: u64, value: u8) {
        let entry = &self.entries[key as usize % self.entries.len()];
        entry.key.store(key as u32 ^ value as u32, Ordering::Relaxed);
        entry.value.store(value, Ordering::Relaxed);
    }

    fn get(&self, key: u64) -> u8 {
        let entry = &self.entries[key as usize % self.entries.len()];
        let value = entry.value.load(Ordering::Relaxed);
        if entry.key.load(Ordering::Relaxed) == key as u32 ^ value as u32 {
            value
        } else {
            0
        }
    }
}

impl Default for SharedTranspositionTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::{MAX_SCORE, MIN_SCORE};

    #[test]
    fn pack_round_trips_every_score_and_bound() {
        for score in PACK_FLOOR..=MAX_SCORE + 3 {
            for &bound in &[Bound::Upper, Bound::Lower, Bound::Exact] {
                let packed = pack_entry(score, bound);
                assert_ne!(packed, 0);
                assert_eq!(unpack_entry(packed), (score, bound));
            }
        }
    }

    #[test]
    fn widest_window_edges_pack_non_zero() {
        // a fail-low one point below the provable range must not collide
        // with the vacant marker
        let packed = pack_entry(MIN_SCORE - 1, Bound::Upper);
        assert_ne!(packed, 0);
        assert_eq!(unpack_entry(packed), (MIN_SCORE - 1, Bound::Upper));
    }

    #[test]
    fn stores_and_retrieves() {
        let mut table = TranspositionTable::new();
        let value = pack_entry(5, Bound::Exact);
        table.set(0xdead_beef, value);
        assert_eq!(table.get(0xdead_beef), value);
        assert_eq!(table.get(0xdead_beee), 0);
    }

    #[test]
    fn colliding_keys_replace() {
        let mut table = TranspositionTable::new();
        let key = 42u64;
        let collision = key + TABLE_MAX_SIZE as u64;
        table.set(key, pack_entry(1, Bound::Lower));
        table.set(collision, pack_entry(2, Bound::Upper));
        // the second write evicted the first, which now misses
        assert_eq!(table.get(key), 0);
        assert_eq!(table.get(collision), pack_entry(2, Bound::Upper));
    }

    #[test]
    fn shared_table_round_trips() {
        let mut table = SharedTranspositionTable::new();
        let value = pack_entry(-3, Bound::Lower);
        table.set(0x1234_5678_9abc, value);
        assert_eq!(table.get(0x1234_5678_9abc), value);
    }
}
