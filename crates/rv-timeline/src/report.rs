//! Serializable snapshot of a [`ReconciledTimeline`] for downstream tools.

use serde::{Deserialize, Serialize};

use crate::align::Anchor;
use crate::consensus::CorruptionWarning;
use crate::group::Candidate;
use crate::timeline::{Group, ReconciledTimeline, Span};

/// A view into one capture, flattened for output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewReport {
    pub part: String,
    pub part_index: usize,
    pub start: usize,
    pub end: usize,
    pub time_start: Option<String>,
    pub time_end: Option<String>,
}

impl From<&Candidate> for ViewReport {
    fn from(c: &Candidate) -> Self {
        Self {
            part: c.view.name().to_string(),
            part_index: c.part_index,
            start: c.view.start(),
            end: c.view.end(),
            time_start: c.view.first().map(|s| s.start_str()),
            time_end: c.view.last().and_then(|s| s.end_str()),
        }
    }
}

/// Placement of one capture on the canonical axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartReport {
    pub name: String,
    pub segments: usize,
    pub offset: usize,
    pub anchor: Anchor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpanReport {
    pub canonical_start: usize,
    pub canonical_end: usize,
    pub candidates: Vec<ViewReport>,
    pub authoritative: ViewReport,
    pub unanimous: bool,
}

impl From<&Span> for SpanReport {
    fn from(span: &Span) -> Self {
        let range = span.canonical_range();
        Self {
            canonical_start: range.start,
            canonical_end: range.end,
            candidates: span.candidates().iter().map(ViewReport::from).collect(),
            authoritative: ViewReport::from(span.authoritative()),
            unanimous: span.is_unanimous(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupReport {
    pub canonical_start: usize,
    pub canonical_end: usize,
    pub contributors: Vec<ViewReport>,
    pub spans: Vec<SpanReport>,
    pub selected: Vec<ViewReport>,
}

impl From<&Group> for GroupReport {
    fn from(group: &Group) -> Self {
        let range = group.canonical_range();
        Self {
            canonical_start: range.start,
            canonical_end: range.end,
            contributors: group.contributors().iter().map(ViewReport::from).collect(),
            spans: group.spans().iter().map(SpanReport::from).collect(),
            selected: group.selected().iter().map(ViewReport::from).collect(),
        }
    }
}

/// Everything a splicing step needs to know about a reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineReport {
    pub parts: Vec<PartReport>,
    pub groups: Vec<GroupReport>,
    pub warnings: Vec<CorruptionWarning>,
    /// Number of chosen segments, gap markers excluded.
    pub canonical_segments: usize,
    pub gaps: usize,
}

impl From<&ReconciledTimeline> for TimelineReport {
    fn from(timeline: &ReconciledTimeline) -> Self {
        let parts = timeline
            .parts()
            .iter()
            .zip(timeline.alignments())
            .map(|(part, alignment)| PartReport {
                name: part.name().to_string(),
                segments: part.len(),
                offset: alignment.offset,
                anchor: alignment.anchor,
            })
            .collect();

        let gaps = timeline
            .canonical_segments()
            .iter()
            .filter(|e| e.is_gap())
            .count();

        Self {
            parts,
            groups: timeline.groups().iter().map(GroupReport::from).collect(),
            warnings: timeline.warnings().to_vec(),
            canonical_segments: timeline.canonical_segments().len() - gaps,
            gaps,
        }
    }
}

impl ReconciledTimeline {
    /// Snapshot this timeline for serialization.
    pub fn report(&self) -> TimelineReport {
        TimelineReport::from(self)
    }
}
