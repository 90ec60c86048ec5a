//! Segment records, captures ([`Part`]), and index-range views ([`SubPart`]).

use std::cmp::Ordering;
use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use rv_core::{format_timestamp, Error, FrameCount, PerStream, Result, TimeBase};

// ---------------------------------------------------------------------------
// Segment
// ---------------------------------------------------------------------------

/// One keyframe-bounded chunk of a capture.
///
/// Two segments are equal exactly when their per-stream content hashes are
/// equal. Keyframe hash, timestamps, and frame counts do not take part in
/// equality.
#[derive(Debug, Clone)]
pub struct Segment {
    /// Presentation timestamp of the leading keyframe, in video ticks.
    pub start_pts: i64,
    /// Largest video timestamp in the segment; unknown for an unfinished tail.
    pub end_pts: Option<i64>,
    pub frame_count: FrameCount,
    /// Content hash of the leading keyframe packet.
    pub keyframe_hash: String,
    /// Content hash of each re-muxed stream within the segment.
    pub segment_hash: PerStream<String>,
    pub time_base: TimeBase,
}

impl Segment {
    pub fn start_seconds(&self) -> f64 {
        self.time_base.video.ticks_to_seconds(self.start_pts)
    }

    pub fn end_seconds(&self) -> Option<f64> {
        self.end_pts
            .map(|pts| self.time_base.video.ticks_to_seconds(pts))
    }

    /// `MM:SS.sss` rendering of [`Segment::start_seconds`].
    pub fn start_str(&self) -> String {
        format_timestamp(self.start_seconds())
    }

    /// `MM:SS.sss` rendering of [`Segment::end_seconds`], if known.
    pub fn end_str(&self) -> Option<String> {
        self.end_seconds().map(format_timestamp)
    }

    /// Tie-breaking order: compares frame counts only, never hashes.
    pub fn cmp_frames(&self, other: &Segment) -> Ordering {
        self.frame_count.cmp(&other.frame_count)
    }
}

impl PartialEq for Segment {
    fn eq(&self, other: &Self) -> bool {
        self.segment_hash == other.segment_hash
    }
}

impl Eq for Segment {}

/// Compare two positions that may hold a gap sentinel (`None`).
///
/// A sentinel equals only another sentinel, never a real segment.
pub fn slots_match(a: Option<&Segment>, b: Option<&Segment>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// Part
// ---------------------------------------------------------------------------

/// The complete, ordered segment sequence recorded by one capture instance.
#[derive(Debug, Clone)]
pub struct Part {
    name: String,
    time_base: TimeBase,
    segments: Vec<Segment>,
}

impl Part {
    /// Build a capture, checking that every segment shares `time_base` and that
    /// start timestamps strictly increase.
    pub fn new(name: impl Into<String>, time_base: TimeBase, segments: Vec<Segment>) -> Result<Self> {
        let name = name.into();

        for (i, seg) in segments.iter().enumerate() {
            if seg.time_base != time_base {
                return Err(Error::invalid_input(format!(
                    "part '{name}' segment {i}: time base {}/{} differs from part time base {}/{}",
                    seg.time_base.video, seg.time_base.audio, time_base.video, time_base.audio
                )));
            }
        }

        for (i, pair) in segments.windows(2).enumerate() {
            if pair[1].start_pts <= pair[0].start_pts {
                return Err(Error::invalid_input(format!(
                    "part '{name}' segment {}: start_pts {} does not follow {}",
                    i + 1,
                    pair[1].start_pts,
                    pair[0].start_pts
                )));
            }
        }

        Ok(Self {
            name,
            time_base,
            segments,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn time_base(&self) -> &TimeBase {
        &self.time_base
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Segment> {
        self.segments.get(index)
    }

    /// Start of the first segment and end of the last one, in seconds.
    pub fn time_range(&self) -> Option<(f64, Option<f64>)> {
        let first = self.segments.first()?;
        let last = self.segments.last()?;
        Some((first.start_seconds(), last.end_seconds()))
    }
}

// ---------------------------------------------------------------------------
// SubPart
// ---------------------------------------------------------------------------

/// A read-only view of the segments `[start, end)` of one [`Part`].
///
/// Cloning a `SubPart` only bumps the reference count of the underlying part.
#[derive(Debug, Clone)]
pub struct SubPart {
    part: Arc<Part>,
    start: usize,
    end: usize,
}

impl SubPart {
    /// Create a view over `range` of `part`.
    pub fn new(part: Arc<Part>, range: Range<usize>) -> Result<Self> {
        if range.start > range.end || range.end > part.len() {
            return Err(Error::invalid_input(format!(
                "range {}..{} is out of bounds for part '{}' with {} segments",
                range.start,
                range.end,
                part.name(),
                part.len()
            )));
        }
        Ok(Self {
            part,
            start: range.start,
            end: range.end,
        })
    }

    /// A view covering every segment of `part`.
    pub fn whole(part: Arc<Part>) -> Self {
        let end = part.len();
        Self { part, start: 0, end }
    }

    pub fn part(&self) -> &Arc<Part> {
        &self.part
    }

    pub fn name(&self) -> &str {
        self.part.name()
    }

    pub fn time_base(&self) -> &TimeBase {
        self.part.time_base()
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// The viewed segments, borrowed from the part.
    pub fn segments(&self) -> &[Segment] {
        &self.part.segments()[self.start..self.end]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Segment> {
        self.segments().iter()
    }

    /// Segment at `index` relative to the start of the view.
    pub fn get(&self, index: usize) -> Option<&Segment> {
        self.segments().get(index)
    }

    pub fn first(&self) -> Option<&Segment> {
        self.segments().first()
    }

    pub fn last(&self) -> Option<&Segment> {
        self.segments().last()
    }

    /// Start of the first viewed segment and end of the last, in seconds.
    pub fn time_range(&self) -> Option<(f64, Option<f64>)> {
        let first = self.first()?;
        let last = self.last()?;
        Some((first.start_seconds(), last.end_seconds()))
    }

    /// Seconds between the first segment's start and the last segment's end.
    pub fn duration(&self) -> Option<f64> {
        let (start, end) = self.time_range()?;
        end.map(|end| end - start)
    }

    /// Whether both views look into the same part instance.
    pub fn same_part(&self, other: &SubPart) -> bool {
        Arc::ptr_eq(&self.part, &other.part)
    }

    /// Join `next` onto the end of this view when it continues it directly.
    pub fn merged_with(&self, next: &SubPart) -> Option<SubPart> {
        if self.same_part(next) && self.end == next.start {
            Some(SubPart {
                part: Arc::clone(&self.part),
                start: self.start,
                end: next.end,
            })
        } else {
            None
        }
    }
}

impl<'a> IntoIterator for &'a SubPart {
    type Item = &'a Segment;
    type IntoIter = std::slice::Iter<'a, Segment>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl PartialEq for SubPart {
    fn eq(&self, other: &Self) -> bool {
        self.same_part(other) && self.start == other.start && self.end == other.end
    }
}

impl fmt::Display for SubPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let start = self
            .first()
            .map(Segment::start_str)
            .unwrap_or_else(|| "--:--.---".into());
        let end = self
            .last()
            .and_then(Segment::end_str)
            .unwrap_or_else(|| "--:--.---".into());
        write!(f, "{} [{start}-{end}] {}..{}", self.name(), self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rv_core::Rational;

    fn tb() -> TimeBase {
        let r = Rational::new(1, 1000).unwrap();
        PerStream::new(r, Rational::new(1, 48000).unwrap())
    }

    fn seg(i: i64, video: &str) -> Segment {
        Segment {
            start_pts: i * 2000,
            end_pts: Some(i * 2000 + 1960),
            frame_count: PerStream::new(50, 94),
            keyframe_hash: format!("k{i}"),
            segment_hash: PerStream::new(video.to_string(), format!("a{i}")),
            time_base: tb(),
        }
    }

    fn part(n: i64) -> Arc<Part> {
        let segments = (0..n).map(|i| seg(i, &format!("v{i}"))).collect();
        Arc::new(Part::new("cap.flv", tb(), segments).unwrap())
    }

    #[test]
    fn segment_seconds() {
        let s = seg(3, "v");
        assert_eq!(s.start_seconds(), 6.0);
        assert_eq!(s.end_seconds(), Some(7.96));
        assert_eq!(s.start_str(), "00:06.000");
        assert_eq!(s.end_str().as_deref(), Some("00:07.960"));
    }

    #[test]
    fn unknown_end() {
        let mut s = seg(0, "v");
        s.end_pts = None;
        assert_eq!(s.end_seconds(), None);
        assert_eq!(s.end_str(), None);
    }

    #[test]
    fn equality_uses_segment_hash_only() {
        let mut a = seg(0, "same");
        let b = seg(7, "same");
        assert_eq!(a, b);
        a.segment_hash.audio = "other".into();
        assert_ne!(a, b);
    }

    #[test]
    fn sentinel_only_matches_sentinel() {
        let s = seg(0, "v");
        assert!(slots_match(None, None));
        assert!(!slots_match(Some(&s), None));
        assert!(!slots_match(None, Some(&s)));
        assert!(slots_match(Some(&s), Some(&s)));
    }

    #[test]
    fn frame_ordering_ignores_hashes() {
        let a = seg(0, "x");
        let mut b = seg(0, "y");
        assert_eq!(a.cmp_frames(&b), Ordering::Equal);
        b.frame_count.video = 49;
        assert_eq!(a.cmp_frames(&b), Ordering::Greater);
    }

    #[test]
    fn part_rejects_non_monotonic_pts() {
        let segments = vec![seg(1, "a"), seg(0, "b")];
        let err = Part::new("bad.flv", tb(), segments).unwrap_err();
        assert!(err.to_string().contains("does not follow"));
    }

    #[test]
    fn part_rejects_mixed_time_base() {
        let mut s = seg(1, "b");
        s.time_base.video = Rational::new(1, 90000).unwrap();
        let err = Part::new("bad.flv", tb(), vec![seg(0, "a"), s]).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn part_time_range() {
        let p = part(3);
        assert_eq!(p.time_range(), Some((0.0, Some(5.96))));
        let empty = Part::new("empty.flv", tb(), vec![]).unwrap();
        assert!(empty.is_empty());
        assert_eq!(empty.time_range(), None);
    }

    #[test]
    fn sub_part_views_without_copying() {
        let p = part(5);
        let view = SubPart::new(Arc::clone(&p), 1..4).unwrap();
        assert_eq!(view.len(), 3);
        assert_eq!(view.name(), "cap.flv");
        assert_eq!(view.get(0).unwrap().start_pts, 2000);
        assert!(view.get(3).is_none());
        assert!(std::ptr::eq(&view.segments()[0], &p.segments()[1]));
        assert_eq!(view.time_range(), Some((2.0, Some(7.96))));
        assert!((view.duration().unwrap() - 5.96).abs() < 1e-9);

        let hashes: Vec<&str> = (&view).into_iter().map(|s| s.segment_hash.video.as_str()).collect();
        assert_eq!(hashes, vec!["v1", "v2", "v3"]);
    }

    #[test]
    fn sub_part_bounds_checked() {
        let p = part(2);
        assert!(SubPart::new(Arc::clone(&p), 1..3).is_err());
        assert!(SubPart::new(p, 0..2).is_ok());
    }

    #[test]
    fn sub_part_merge_requires_adjacency() {
        let p = part(6);
        let a = SubPart::new(Arc::clone(&p), 0..2).unwrap();
        let b = SubPart::new(Arc::clone(&p), 2..5).unwrap();
        let c = SubPart::new(Arc::clone(&p), 3..5).unwrap();
        assert_eq!(a.merged_with(&b).unwrap().range(), 0..5);
        assert!(a.merged_with(&c).is_none());

        let other = part(6);
        let d = SubPart::new(other, 2..5).unwrap();
        assert!(a.merged_with(&d).is_none());
    }

    #[test]
    fn sub_part_display() {
        let view = SubPart::new(part(5), 1..3).unwrap();
        assert_eq!(view.to_string(), "cap.flv [00:02.000-00:05.960] 1..3");
    }
}
