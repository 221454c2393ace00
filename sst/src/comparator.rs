//! The ordering imposed over keys is pluggable: everything downstream of this module -- block
//! builders, block cursors, the table builder and reader -- is written against the [Comparator]
//! trait rather than against `Ord` directly, so a caller that needs e.g. a reverse ordering or a
//! locale-aware one can supply it without touching the block or table code.

use std::cmp::Ordering;
use std::fmt::Debug;

/// A total ordering over byte strings, plus the two key-shortening operations the table builder
/// uses to keep index entries small.
///
/// `find_shortest_separator` and `find_short_successor` are permitted to leave their argument
/// unchanged; a comparator that always does so (just not shortening) is correct, merely larger on
/// disk than necessary.
pub trait Comparator: Debug + Send + Sync {
    /// Compare `a` to `b`, returning `Less`/`Equal`/`Greater` per the comparator's ordering.
    fn compare(&self, a: &[u8], b: &[u8]) -> Ordering;

    /// Shorten `start` in place to any string `s` satisfying `start <= s < limit`.  `start` is
    /// assumed to already satisfy `start < limit`; the implementation may leave it unchanged.
    fn find_shortest_separator(&self, start: &mut Vec<u8>, limit: &[u8]);

    /// Shorten `key` in place to any string `s >= key`.  May leave `key` unchanged.
    fn find_short_successor(&self, key: &mut Vec<u8>);
}

/// Plain unsigned byte-lexicographic ordering: the default, and the only comparator this crate
/// ships.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct BytewiseComparator;

// Content under CC By-SA. https://codereview.stackexchange.com/questions/233872
fn compare_bytes(a: &[u8], b: &[u8]) -> Ordering {
    for (ai, bi) in a.iter().zip(b.iter()) {
        match ai.cmp(bi) {
            Ordering::Equal => continue,
            ord => return ord,
        }
    }
    a.len().cmp(&b.len())
}

impl Comparator for BytewiseComparator {
    fn compare(&self, a: &[u8], b: &[u8]) -> Ordering {
        compare_bytes(a, b)
    }

    fn find_shortest_separator(&self, start: &mut Vec<u8>, limit: &[u8]) {
        let max_shared = std::cmp::min(start.len(), limit.len());
        let mut shared = 0;
        while shared < max_shared && start[shared] == limit[shared] {
            shared += 1;
        }
        if shared < max_shared && start[shared] < 0xff && start[shared] + 1 < limit[shared] {
            start.truncate(shared + 1);
            start[shared] += 1;
            debug_assert_eq!(Ordering::Less, compare_bytes(start, limit));
        }
        // Otherwise `start` is a prefix of `limit`, or the first differing byte in `start`
        // already has no room to round up; leave `start` as-is.
    }

    fn find_short_successor(&self, key: &mut Vec<u8>) {
        for i in 0..key.len() {
            if key[i] != 0xff {
                key[i] += 1;
                key.truncate(i + 1);
                return;
            }
        }
        // `key` is all 0xff bytes (or empty); there is no shorter successor.
    }
}
