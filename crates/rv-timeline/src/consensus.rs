//! Hash-consensus selection of the authoritative capture for a span.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use rv_core::{format_timestamp, Error, FrameCount, ReconcileConfig, Result, StreamKind};

use crate::group::Candidate;
use crate::segment::{slots_match, Segment};

/// Why a span's selection deserves operator review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WarningKind {
    /// Candidates disagree on the last compared segment.
    TailMismatch { stream: StreamKind },
    /// No candidate was in the majority at every position.
    NoConsensus,
}

/// A non-fatal disagreement between captures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorruptionWarning {
    #[serde(flatten)]
    pub kind: WarningKind,
    /// Canonical position where the disagreement was found.
    pub canonical_position: usize,
    pub start_seconds: f64,
    /// Names of every capture compared in the span, in capture order.
    pub parts: Vec<String>,
    /// Name of the capture that was chosen regardless.
    pub chosen: String,
}

impl std::fmt::Display for CorruptionWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let at = format_timestamp(self.start_seconds);
        match &self.kind {
            WarningKind::TailMismatch { stream } => write!(
                f,
                "{stream} tail mismatch at {at} among [{}], using '{}'",
                self.parts.join(", "),
                self.chosen
            ),
            WarningKind::NoConsensus => write!(
                f,
                "no unanimous winner for span starting {at} among [{}], falling back to '{}'",
                self.parts.join(", "),
                self.chosen
            ),
        }
    }
}

/// The outcome of voting over one span.
#[derive(Debug, Clone)]
pub struct Verdict {
    /// Index into the candidate list of the authoritative view.
    pub chosen: usize,
    /// Whether the chosen candidate was in the majority at every position.
    pub unanimous: bool,
    pub warnings: Vec<CorruptionWarning>,
}

/// Candidates holding equal segments at one position.
struct EqualityClass<'a> {
    members: Vec<usize>,
    representative: Option<&'a Segment>,
}

impl EqualityClass<'_> {
    fn frames(&self) -> Option<FrameCount> {
        self.representative.map(|s| s.frame_count)
    }
}

fn equality_classes<'a>(slots: &[Option<&'a Segment>]) -> Vec<EqualityClass<'a>> {
    let mut classes: Vec<EqualityClass<'a>> = Vec::new();
    for (index, slot) in slots.iter().enumerate() {
        match classes
            .iter_mut()
            .find(|c| slots_match(c.representative, *slot))
        {
            Some(class) => {
                class.members.push(index);
                // Keep the fullest copy as the face of the class.
                if let (Some(current), Some(seg)) = (class.representative, *slot) {
                    if seg.cmp_frames(current) == Ordering::Greater {
                        class.representative = Some(seg);
                    }
                }
            }
            None => classes.push(EqualityClass {
                members: vec![index],
                representative: *slot,
            }),
        }
    }
    classes
}

/// Largest class first, then most frames, then lowest candidate index.
fn top_class<'c, 'a>(classes: &'c [EqualityClass<'a>]) -> Option<&'c EqualityClass<'a>> {
    classes.iter().min_by(|x, y| {
        y.members
            .len()
            .cmp(&x.members.len())
            .then_with(|| y.frames().cmp(&x.frames()))
            .then_with(|| x.members[0].cmp(&y.members[0]))
    })
}

/// Whether every real segment at this position carries the same `kind` hash.
fn stream_agrees(slots: &[Option<&Segment>], kind: StreamKind) -> bool {
    let mut hashes = slots.iter().flatten().map(|s| s.segment_hash.get(kind));
    match hashes.next() {
        Some(first) => hashes.all(|h| h == first),
        None => true,
    }
}

fn ends_its_part(candidate: &Candidate) -> bool {
    candidate.view.end() == candidate.view.part().len()
}

/// Vote among the candidates of one span.
///
/// `canonical_start` is the canonical position of the span's first segment
/// and is only used for reporting. The last position is exempt from the hash
/// check only when some candidate's capture ends there.
pub fn select(
    candidates: &[Candidate],
    canonical_start: usize,
    config: &ReconcileConfig,
) -> Result<Verdict> {
    if candidates.len() <= 1 {
        return Ok(Verdict {
            chosen: 0,
            unanimous: true,
            warnings: Vec::new(),
        });
    }

    let names: Vec<String> = candidates.iter().map(|c| c.view.name().to_string()).collect();
    let width = candidates.iter().map(|c| c.view.len()).max().unwrap_or(0);
    // Only a capture's own last segment may be cut short. A span that ends
    // because another capture joins has no such segment.
    let tail_exempt = config.tail_exemption && candidates.iter().any(ends_its_part);
    let mut in_majority = vec![true; candidates.len()];
    let mut tail_mismatches: Vec<(StreamKind, f64)> = Vec::new();

    for position in 0..width {
        let slots: Vec<Option<&Segment>> =
            candidates.iter().map(|c| c.view.get(position)).collect();
        let start_seconds = slots
            .iter()
            .flatten()
            .next()
            .map(|s| s.start_seconds())
            .unwrap_or_default();
        let is_tail = position + 1 == width;

        for &kind in &config.required_streams {
            if stream_agrees(&slots, kind) {
                continue;
            }
            if is_tail && tail_exempt {
                tail_mismatches.push((kind, start_seconds));
            } else {
                return Err(Error::HashCheckDifference {
                    stream: kind,
                    start_seconds,
                });
            }
        }

        let classes = equality_classes(&slots);
        if let Some(top) = top_class(&classes) {
            for (index, flag) in in_majority.iter_mut().enumerate() {
                *flag &= top.members.contains(&index);
            }
        }
    }

    let winner = in_majority.iter().position(|&w| w);
    let chosen = winner.unwrap_or(0);
    let mut warnings = Vec::new();

    for (stream, start_seconds) in tail_mismatches {
        warnings.push(CorruptionWarning {
            kind: WarningKind::TailMismatch { stream },
            canonical_position: canonical_start + width - 1,
            start_seconds,
            parts: names.clone(),
            chosen: names[chosen].clone(),
        });
    }

    if winner.is_none() {
        let start_seconds = candidates[0]
            .view
            .first()
            .map(Segment::start_seconds)
            .unwrap_or_default();
        warnings.push(CorruptionWarning {
            kind: WarningKind::NoConsensus,
            canonical_position: canonical_start,
            start_seconds,
            parts: names.clone(),
            chosen: names[chosen].clone(),
        });
    }

    for warning in &warnings {
        tracing::warn!("Corruption: {warning}");
    }

    Ok(Verdict {
        chosen,
        unanimous: winner.is_some(),
        warnings,
    })
}
