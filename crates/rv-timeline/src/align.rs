//! Canonical-offset alignment of successive captures.
//!
//! Capture 0 occupies canonical positions `0..len`. Every later capture is
//! matched against its predecessor's key sequence and placed so that shared
//! segments land on the same canonical position.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use rv_core::{AlignKey, Error, GapPolicy, Result};

use crate::matcher::{matching_blocks, MatchingBlock};
use crate::segment::{Part, Segment};

/// How a capture's offset was established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Anchor {
    /// The first capture defines the origin.
    Origin,
    /// Matched against the previous capture along this block.
    Block {
        previous_start: usize,
        current_start: usize,
        len: usize,
    },
    /// Shared nothing with the previous capture and was placed after it.
    Appended,
}

/// Canonical placement of one capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartAlignment {
    /// Canonical position of the capture's first segment.
    pub offset: usize,
    pub anchor: Anchor,
}

/// One segment placed at a canonical position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// Index of the capture in input order.
    pub part: usize,
    /// Index of the segment within that capture.
    pub segment: usize,
}

/// Result of aligning a list of captures.
#[derive(Debug, Clone)]
pub struct Alignment {
    parts: Vec<PartAlignment>,
    /// `table[pos]` lists the placements at canonical position `pos`, in
    /// increasing capture order.
    table: Vec<Vec<Placement>>,
}

impl Alignment {
    pub fn parts(&self) -> &[PartAlignment] {
        &self.parts
    }

    pub fn table(&self) -> &[Vec<Placement>] {
        &self.table
    }

    /// Number of canonical positions.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

/// Hashable view of the value a segment is aligned on.
#[derive(Debug, PartialEq, Eq, Hash)]
enum SegmentKey<'a> {
    Keyframe(&'a str),
    Content(&'a str, &'a str),
}

fn key_of(segment: &Segment, key: AlignKey) -> SegmentKey<'_> {
    match key {
        AlignKey::KeyframeHash => SegmentKey::Keyframe(&segment.keyframe_hash),
        AlignKey::SegmentHash => {
            SegmentKey::Content(&segment.segment_hash.video, &segment.segment_hash.audio)
        }
    }
}

fn key_sequence(part: &Part, key: AlignKey) -> Vec<SegmentKey<'_>> {
    part.segments().iter().map(|s| key_of(s, key)).collect()
}

/// Outcome of inspecting the matching blocks between two captures.
enum Decision {
    Anchored(MatchingBlock),
    Disjoint,
    Ambiguous(String),
}

/// Pick the block that anchors `current` onto `previous`.
///
/// A block is anchored when it reaches the end of the previous sequence or
/// starts at the beginning of the current one.
fn decide(blocks: &[MatchingBlock], previous_len: usize) -> Decision {
    let anchored = |m: &&MatchingBlock| m.touches_tail_of_a(previous_len) || m.touches_head_of_b();

    match blocks {
        [] => Decision::Disjoint,
        [only] => Decision::Anchored(*only),
        [first, second] => {
            let candidates: Vec<&MatchingBlock> = blocks.iter().filter(anchored).collect();
            match candidates.as_slice() {
                [one] => Decision::Anchored(**one),
                [_, _] if first.diagonal() == second.diagonal() => Decision::Anchored(*first),
                [_, _] => Decision::Ambiguous(format!(
                    "two anchored matching blocks disagree on offset ({} vs {})",
                    first.diagonal(),
                    second.diagonal()
                )),
                _ => Decision::Ambiguous(
                    "two matching blocks, neither touches the capture boundary".into(),
                ),
            }
        }
        many => Decision::Ambiguous(format!("{} disjoint matching blocks", many.len())),
    }
}

/// Align `parts` (in capture-session order) onto one canonical coordinate.
pub fn align(parts: &[Arc<Part>], key: AlignKey, gaps: GapPolicy) -> Result<Alignment> {
    let Some(first) = parts.first() else {
        return Ok(Alignment {
            parts: Vec::new(),
            table: Vec::new(),
        });
    };

    // Offsets are signed until every capture is placed: a capture may begin
    // before the matched region of its predecessor.
    let mut offsets: Vec<(i64, Anchor)> = vec![(0, Anchor::Origin)];
    let mut previous_keys = key_sequence(first, key);

    for i in 1..parts.len() {
        let previous = &parts[i - 1];
        let current = &parts[i];
        let current_keys = key_sequence(current, key);
        let blocks = matching_blocks(&previous_keys, &current_keys);
        let (previous_offset, _) = offsets[i - 1];

        let placed = match decide(&blocks, previous_keys.len()) {
            Decision::Anchored(m) => {
                tracing::debug!(
                    "Aligned '{}' onto '{}' at block a={} b={} size={}",
                    current.name(),
                    previous.name(),
                    m.a,
                    m.b,
                    m.size
                );
                (
                    previous_offset + m.diagonal(),
                    Anchor::Block {
                        previous_start: m.a,
                        current_start: m.b,
                        len: m.size,
                    },
                )
            }
            Decision::Disjoint if gaps == GapPolicy::Append => {
                tracing::debug!(
                    "'{}' shares no segment with '{}'; appending after a gap",
                    current.name(),
                    previous.name()
                );
                (previous_offset + previous.len() as i64, Anchor::Appended)
            }
            Decision::Disjoint => {
                return Err(Error::alignment(
                    previous.name(),
                    current.name(),
                    "no matching segments",
                ));
            }
            Decision::Ambiguous(reason) => {
                return Err(Error::alignment(previous.name(), current.name(), reason));
            }
        };

        offsets.push(placed);
        previous_keys = current_keys;
    }

    let shift = offsets.iter().map(|(o, _)| *o).min().unwrap_or(0);
    let aligned: Vec<PartAlignment> = offsets
        .into_iter()
        .map(|(offset, anchor)| PartAlignment {
            offset: (offset - shift) as usize,
            anchor,
        })
        .collect();

    let width = aligned
        .iter()
        .zip(parts)
        .map(|(a, p)| a.offset + p.len())
        .max()
        .unwrap_or(0);

    let mut table: Vec<Vec<Placement>> = vec![Vec::new(); width];
    for (part_index, (placement, part)) in aligned.iter().zip(parts).enumerate() {
        for segment in 0..part.len() {
            table[placement.offset + segment].push(Placement {
                part: part_index,
                segment,
            });
        }
    }

    Ok(Alignment {
        parts: aligned,
        table,
    })
}
