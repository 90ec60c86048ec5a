//! The reconciled, gap-aware timeline of a set of redundant captures.

use std::ops::Range;
use std::sync::Arc;

use rv_core::{Error, ReconcileConfig, Result};

use crate::align::{align, PartAlignment};
use crate::consensus::{self, CorruptionWarning};
use crate::group::{build_groups, Candidate};
use crate::segment::{slots_match, Part, Segment};

/// Canonical positions covered by a constant set of captures, with the
/// capture chosen to represent them.
#[derive(Debug, Clone)]
pub struct Span {
    canonical: Range<usize>,
    candidates: Vec<Candidate>,
    chosen: usize,
    unanimous: bool,
}

impl Span {
    pub fn canonical_range(&self) -> Range<usize> {
        self.canonical.clone()
    }

    /// One view per contributing capture, in capture order.
    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn authoritative(&self) -> &Candidate {
        &self.candidates[self.chosen]
    }

    /// Whether the authoritative view was in the majority at every position.
    pub fn is_unanimous(&self) -> bool {
        self.unanimous
    }
}

/// A maximal stretch of the timeline without a gap.
#[derive(Debug, Clone)]
pub struct Group {
    canonical: Range<usize>,
    contributors: Vec<Candidate>,
    spans: Vec<Span>,
    selected: Vec<Candidate>,
}

impl Group {
    pub fn canonical_range(&self) -> Range<usize> {
        self.canonical.clone()
    }

    /// Number of canonical positions in the group.
    pub fn len(&self) -> usize {
        self.canonical.len()
    }

    pub fn is_empty(&self) -> bool {
        self.canonical.is_empty()
    }

    /// One view per capture that contributed anywhere in the group, narrowed
    /// to exactly what it covered.
    pub fn contributors(&self) -> &[Candidate] {
        &self.contributors
    }

    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    /// The authoritative views in canonical order. Consecutive picks from the
    /// same capture that continue each other are merged into one view.
    pub fn selected(&self) -> &[Candidate] {
        &self.selected
    }
}

/// One entry of the flattened canonical segment list.
#[derive(Debug, Clone)]
pub enum TimelineEntry {
    /// A segment chosen from one capture.
    Segment {
        part: Arc<Part>,
        part_index: usize,
        index: usize,
    },
    /// Marks the gap between two groups.
    Gap,
}

impl TimelineEntry {
    /// The chosen segment, or `None` for a gap marker.
    pub fn segment(&self) -> Option<&Segment> {
        match self {
            TimelineEntry::Segment { part, index, .. } => part.get(*index),
            TimelineEntry::Gap => None,
        }
    }

    pub fn is_gap(&self) -> bool {
        matches!(self, TimelineEntry::Gap)
    }
}

impl PartialEq for TimelineEntry {
    fn eq(&self, other: &Self) -> bool {
        slots_match(self.segment(), other.segment())
    }
}

/// Redundant captures of one stream reconciled into a single timeline.
///
/// Everything is computed during construction; the value is immutable
/// afterwards and can be shared freely across threads.
#[derive(Debug, Clone)]
pub struct ReconciledTimeline {
    parts: Vec<Arc<Part>>,
    alignments: Vec<PartAlignment>,
    groups: Vec<Group>,
    canonical_segments: Vec<TimelineEntry>,
    warnings: Vec<CorruptionWarning>,
}

impl ReconciledTimeline {
    /// Reconcile `parts` (in capture-session order) with default settings.
    pub fn new(parts: Vec<Part>) -> Result<Self> {
        Self::with_config(parts, &ReconcileConfig::default())
    }

    pub fn with_config(parts: Vec<Part>, config: &ReconcileConfig) -> Result<Self> {
        Self::from_shared(parts.into_iter().map(Arc::new).collect(), config)
    }

    /// Reconcile captures that are already shared elsewhere.
    pub fn from_shared(parts: Vec<Arc<Part>>, config: &ReconcileConfig) -> Result<Self> {
        check_time_base(&parts)?;

        let parts: Vec<Arc<Part>> = parts
            .into_iter()
            .filter(|p| {
                if p.is_empty() {
                    tracing::warn!("Skipping capture '{}' with no segments", p.name());
                }
                !p.is_empty()
            })
            .collect();
        if parts.is_empty() {
            return Err(Error::invalid_input("no segments to reconcile"));
        }

        let alignment = align(&parts, config.align_key, config.gap_policy)?;
        let (layouts, stats) = build_groups(&parts, &alignment)?;

        let mut groups = Vec::with_capacity(layouts.len());
        let mut warnings = Vec::new();
        for layout in layouts {
            let mut spans = Vec::with_capacity(layout.spans.len());
            for span in layout.spans {
                let verdict = consensus::select(&span.candidates, span.canonical.start, config)?;
                warnings.extend(verdict.warnings);
                spans.push(Span {
                    canonical: span.canonical,
                    candidates: span.candidates,
                    chosen: verdict.chosen,
                    unanimous: verdict.unanimous,
                });
            }

            let selected = merge_selections(&spans);
            groups.push(Group {
                canonical: layout.canonical,
                contributors: layout.contributors,
                spans,
                selected,
            });
        }

        let canonical_segments = flatten(&groups);

        tracing::info!(
            "Reconciled {} capture(s) into {} group(s), {} span(s), {} canonical segment(s), {} warning(s)",
            parts.len(),
            stats.groups,
            stats.spans,
            canonical_segments.len() - groups.len().saturating_sub(1),
            warnings.len()
        );

        Ok(Self {
            parts,
            alignments: alignment.parts().to_vec(),
            groups,
            canonical_segments,
            warnings,
        })
    }

    /// Captures that took part, in input order (empty captures are skipped).
    pub fn parts(&self) -> &[Arc<Part>] {
        &self.parts
    }

    /// Canonical placement of each capture, parallel to [`Self::parts`].
    pub fn alignments(&self) -> &[PartAlignment] {
        &self.alignments
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// Chosen segments in canonical order with a [`TimelineEntry::Gap`]
    /// between consecutive groups.
    pub fn canonical_segments(&self) -> &[TimelineEntry] {
        &self.canonical_segments
    }

    /// The chosen segments without gap markers.
    pub fn real_segments(&self) -> impl Iterator<Item = &Segment> {
        self.canonical_segments.iter().filter_map(TimelineEntry::segment)
    }

    pub fn warnings(&self) -> &[CorruptionWarning] {
        &self.warnings
    }

    /// Whether any gap separates the captured material.
    pub fn has_gaps(&self) -> bool {
        self.groups.len() > 1
    }
}

fn check_time_base(parts: &[Arc<Part>]) -> Result<()> {
    let Some(first) = parts.first() else {
        return Err(Error::invalid_input("no captures to reconcile"));
    };
    for part in &parts[1..] {
        if part.time_base() != first.time_base() {
            return Err(Error::invalid_input(format!(
                "time base of '{}' ({}, {}) differs from '{}' ({}, {})",
                part.name(),
                part.time_base().video,
                part.time_base().audio,
                first.name(),
                first.time_base().video,
                first.time_base().audio
            )));
        }
    }
    Ok(())
}

fn merge_selections(spans: &[Span]) -> Vec<Candidate> {
    let mut selected: Vec<Candidate> = Vec::with_capacity(spans.len());
    for span in spans {
        let pick = span.authoritative();
        if let Some(last) = selected.last_mut() {
            if let Some(merged) = last.view.merged_with(&pick.view) {
                last.view = merged;
                continue;
            }
        }
        selected.push(pick.clone());
    }
    selected
}

fn flatten(groups: &[Group]) -> Vec<TimelineEntry> {
    let mut entries = Vec::new();
    for (i, group) in groups.iter().enumerate() {
        if i > 0 {
            entries.push(TimelineEntry::Gap);
        }
        for pick in &group.selected {
            for index in pick.view.range() {
                entries.push(TimelineEntry::Segment {
                    part: Arc::clone(pick.view.part()),
                    part_index: pick.part_index,
                    index,
                });
            }
        }
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rv_core::{GapPolicy, PerStream, Rational, TimeBase};

    fn tb() -> TimeBase {
        let r = Rational::new(1, 1000).unwrap();
        PerStream::new(r, r)
    }

    fn part(name: &str, keys: Range<u32>) -> Part {
        let segments = keys
            .map(|k| Segment {
                start_pts: k as i64 * 2000,
                end_pts: Some(k as i64 * 2000 + 1960),
                frame_count: PerStream::new(50, 94),
                keyframe_hash: format!("{k:04x}"),
                segment_hash: PerStream::new(format!("{k:04x}0"), format!("{k:04x}1")),
                time_base: tb(),
            })
            .collect();
        Part::new(name, tb(), segments).unwrap()
    }

    #[test]
    fn merges_selection_across_spans() {
        let timeline = ReconciledTimeline::new(vec![part("a", 0..5), part("b", 2..8)]).unwrap();
        assert_eq!(timeline.groups().len(), 1);

        let group = &timeline.groups()[0];
        assert_eq!(group.spans().len(), 3);
        let selected: Vec<_> = group
            .selected()
            .iter()
            .map(|c| (c.view.name().to_string(), c.view.range()))
            .collect();
        assert_eq!(
            selected,
            vec![("a".to_string(), 0..5), ("b".to_string(), 3..6)]
        );
        assert_eq!(timeline.canonical_segments().len(), 8);
        assert!(!timeline.has_gaps());
    }

    #[test]
    fn gap_marker_between_groups() {
        let config = ReconcileConfig {
            gap_policy: GapPolicy::Append,
            ..Default::default()
        };
        let timeline =
            ReconciledTimeline::with_config(vec![part("a", 0..3), part("b", 10..12)], &config)
                .unwrap();
        let entries = timeline.canonical_segments();
        assert_eq!(entries.len(), 6);
        assert!(entries[3].is_gap());
        assert_eq!(entries[3], TimelineEntry::Gap);
        assert_ne!(entries[2], TimelineEntry::Gap);
        assert_eq!(timeline.real_segments().count(), 5);
        assert!(timeline.has_gaps());
    }

    #[test]
    fn mismatched_time_base_is_rejected() {
        let a = part("a", 0..3);
        let other = PerStream::new(Rational::new(1, 90000).unwrap(), tb().audio);
        let b = Part::new("b", other, vec![]).unwrap();
        let err = ReconciledTimeline::new(vec![a, b]).unwrap_err();
        assert_matches!(err, Error::InvalidInput(ref msg) if msg.contains("time base of 'b'"));
    }

    #[test]
    fn empty_parts_are_skipped() {
        let empty = Part::new("empty", tb(), vec![]).unwrap();
        let timeline = ReconciledTimeline::new(vec![part("a", 0..3), empty]).unwrap();
        assert_eq!(timeline.parts().len(), 1);
        assert_eq!(timeline.canonical_segments().len(), 3);
    }

    #[test]
    fn nothing_to_reconcile() {
        assert!(ReconciledTimeline::new(vec![]).is_err());
        let empty = Part::new("empty", tb(), vec![]).unwrap();
        assert!(ReconciledTimeline::new(vec![empty]).is_err());
    }

    #[test]
    fn timeline_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ReconciledTimeline>();
    }
}
