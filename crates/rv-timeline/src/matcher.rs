//! Deterministic longest-contiguous-match block search.
//!
//! Finds the longest run shared by two sequences, then recurses into the
//! regions on either side of it. Ties go to the run that starts earliest in
//! the first sequence, then earliest in the second. No element is ever
//! treated as junk, regardless of how often it repeats.

use std::collections::HashMap;
use std::hash::Hash;

/// `a[a..a + size] == b[b..b + size]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchingBlock {
    /// Start index in the first sequence.
    pub a: usize,
    /// Start index in the second sequence.
    pub b: usize,
    pub size: usize,
}

impl MatchingBlock {
    /// Offset of the second sequence relative to the first along this block.
    pub fn diagonal(&self) -> i64 {
        self.a as i64 - self.b as i64
    }

    /// Whether the block runs up to the end of the first sequence.
    pub fn touches_tail_of_a(&self, a_len: usize) -> bool {
        self.a + self.size == a_len
    }

    /// Whether the block begins at the start of the second sequence.
    pub fn touches_head_of_b(&self) -> bool {
        self.b == 0
    }
}

/// Positions of every element of `b`, in increasing order.
fn index_positions<T: Eq + Hash>(b: &[T]) -> HashMap<&T, Vec<usize>> {
    let mut b2j: HashMap<&T, Vec<usize>> = HashMap::new();
    for (j, item) in b.iter().enumerate() {
        b2j.entry(item).or_default().push(j);
    }
    b2j
}

/// Longest block within `a[alo..ahi]` and `b[blo..bhi]`; `size == 0` when
/// nothing matches.
fn find_longest_match<T: Eq + Hash>(
    a: &[T],
    b2j: &HashMap<&T, Vec<usize>>,
    (alo, ahi): (usize, usize),
    (blo, bhi): (usize, usize),
) -> MatchingBlock {
    let mut best = MatchingBlock {
        a: alo,
        b: blo,
        size: 0,
    };
    // Length of the match ending at b[j] for the previous row of a.
    let mut j2len: HashMap<usize, usize> = HashMap::new();

    for i in alo..ahi {
        let mut next_j2len = HashMap::new();
        if let Some(positions) = b2j.get(&a[i]) {
            for &j in positions {
                if j < blo {
                    continue;
                }
                if j >= bhi {
                    break;
                }
                let k = j
                    .checked_sub(1)
                    .and_then(|prev| j2len.get(&prev))
                    .copied()
                    .unwrap_or(0)
                    + 1;
                next_j2len.insert(j, k);
                if k > best.size {
                    best = MatchingBlock {
                        a: i + 1 - k,
                        b: j + 1 - k,
                        size: k,
                    };
                }
            }
        }
        j2len = next_j2len;
    }

    best
}

/// All maximal matching blocks between `a` and `b`, ordered by position.
///
/// Blocks that continue each other along the same diagonal are merged, so no
/// two returned blocks are adjacent in both sequences.
pub fn matching_blocks<T: Eq + Hash>(a: &[T], b: &[T]) -> Vec<MatchingBlock> {
    let b2j = index_positions(b);
    let mut pending = vec![((0, a.len()), (0, b.len()))];
    let mut blocks = Vec::new();

    while let Some(((alo, ahi), (blo, bhi))) = pending.pop() {
        let m = find_longest_match(a, &b2j, (alo, ahi), (blo, bhi));
        if m.size == 0 {
            continue;
        }
        blocks.push(m);
        if alo < m.a && blo < m.b {
            pending.push(((alo, m.a), (blo, m.b)));
        }
        if m.a + m.size < ahi && m.b + m.size < bhi {
            pending.push(((m.a + m.size, ahi), (m.b + m.size, bhi)));
        }
    }

    blocks.sort_by_key(|m| (m.a, m.b));

    let mut merged: Vec<MatchingBlock> = Vec::with_capacity(blocks.len());
    for m in blocks {
        if let Some(last) = merged.last_mut() {
            if last.a + last.size == m.a && last.b + last.size == m.b {
                last.size += m.size;
                continue;
            }
        }
        merged.push(m);
    }
    merged
}
