//! Grouping of aligned canonical positions into spans and groups.
//!
//! The build runs in two passes. The first pass scans the canonical table and
//! records only boundaries: a new group starts wherever the set of
//! contributing captures becomes disjoint from the previous position's set,
//! and a new span starts wherever that set merely changes. The second pass
//! materializes the final [`SubPart`] views from those boundaries.

use std::collections::BTreeMap;
use std::ops::Range;
use std::sync::Arc;

use serde::Serialize;

use rv_core::Result;

use crate::align::{Alignment, Placement};
use crate::segment::{Part, SubPart};

/// One capture's contribution to a span or group.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Index of the capture in input order.
    pub part_index: usize,
    pub view: SubPart,
}

/// Canonical positions with a constant set of contributing captures.
#[derive(Debug, Clone)]
pub(crate) struct SpanLayout {
    pub canonical: Range<usize>,
    /// One view per contributing capture, in capture order. All views have
    /// the same length as `canonical`.
    pub candidates: Vec<Candidate>,
}

/// A maximal run of positions whose contributor sets keep overlapping.
#[derive(Debug, Clone)]
pub(crate) struct GroupLayout {
    pub canonical: Range<usize>,
    pub spans: Vec<SpanLayout>,
    /// One view per capture that appears anywhere in the group.
    pub contributors: Vec<Candidate>,
}

/// Boundary counts, handy for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LayoutStats {
    pub groups: usize,
    pub spans: usize,
}

fn disjoint(previous: &[Placement], here: &[Placement]) -> bool {
    !here
        .iter()
        .any(|h| previous.iter().any(|p| p.part == h.part))
}

fn same_parts(previous: &[Placement], here: &[Placement]) -> bool {
    previous.len() == here.len() && previous.iter().zip(here).all(|(p, h)| p.part == h.part)
}

/// First pass: span boundaries, bucketed per group.
fn span_boundaries(table: &[Vec<Placement>]) -> Vec<Vec<Range<usize>>> {
    let mut groups: Vec<Vec<Range<usize>>> = Vec::new();
    let mut previous: &[Placement] = &[];

    for (pos, here) in table.iter().enumerate() {
        if here.is_empty() {
            previous = here;
            continue;
        }

        let opens_group = previous.is_empty() || disjoint(previous, here);
        match groups.last_mut() {
            Some(spans) if !opens_group => match spans.last_mut() {
                Some(last) if same_parts(previous, here) => last.end = pos + 1,
                _ => spans.push(pos..pos + 1),
            },
            _ => groups.push(vec![pos..pos + 1]),
        }
        previous = here;
    }

    groups
}

/// Second pass: build immutable views for one span.
fn materialize_span(
    parts: &[Arc<Part>],
    table: &[Vec<Placement>],
    canonical: Range<usize>,
) -> Result<SpanLayout> {
    let width = canonical.len();
    let candidates = table[canonical.start]
        .iter()
        .map(|p| {
            let view = SubPart::new(Arc::clone(&parts[p.part]), p.segment..p.segment + width)?;
            Ok(Candidate {
                part_index: p.part,
                view,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(SpanLayout {
        canonical,
        candidates,
    })
}

fn contributors(parts: &[Arc<Part>], spans: &[SpanLayout]) -> Result<Vec<Candidate>> {
    let mut ranges: BTreeMap<usize, Range<usize>> = BTreeMap::new();
    for candidate in spans.iter().flat_map(|s| &s.candidates) {
        let view = candidate.view.range();
        ranges
            .entry(candidate.part_index)
            .and_modify(|r| {
                r.start = r.start.min(view.start);
                r.end = r.end.max(view.end);
            })
            .or_insert(view);
    }

    ranges
        .into_iter()
        .map(|(part_index, range)| {
            Ok(Candidate {
                part_index,
                view: SubPart::new(Arc::clone(&parts[part_index]), range)?,
            })
        })
        .collect()
}

/// Turn an alignment into ordered groups of co-spanning views.
pub(crate) fn build_groups(
    parts: &[Arc<Part>],
    alignment: &Alignment,
) -> Result<(Vec<GroupLayout>, LayoutStats)> {
    let table = alignment.table();
    let mut stats = LayoutStats::default();
    let mut groups = Vec::new();

    for boundaries in span_boundaries(table) {
        let (Some(first), Some(last)) = (boundaries.first(), boundaries.last()) else {
            continue;
        };
        let canonical = first.start..last.end;

        let spans = boundaries
            .into_iter()
            .map(|range| materialize_span(parts, table, range))
            .collect::<Result<Vec<_>>>()?;
        let contributors = contributors(parts, &spans)?;

        tracing::debug!(
            "Group {}..{}: {} span(s), {} contributor(s)",
            canonical.start,
            canonical.end,
            spans.len(),
            contributors.len()
        );

        stats.groups += 1;
        stats.spans += spans.len();
        groups.push(GroupLayout {
            canonical,
            spans,
            contributors,
        });
    }

    Ok((groups, stats))
}
