//! # rv-timeline
//!
//! Reconciles redundant captures of one live stream into a single verified
//! timeline.
//!
//! Several recorder instances capture the same event; each produces its own
//! sequence of keyframe-bounded segments with independent start points, gaps,
//! and occasional corruption. This crate:
//!
//! - aligns successive captures on their keyframe hashes ([`align`])
//! - groups the aligned positions into gap-free groups of co-spanning views
//! - votes on content hashes to pick the authoritative capture per span
//!   ([`consensus`]), failing hard on confirmed mid-stream divergence
//!
//! ## Quick start
//!
//! ```no_run
//! use rv_timeline::{load_parts_from_path, ReconciledTimeline};
//! use std::path::Path;
//!
//! let parts = load_parts_from_path(Path::new("checksum.json")).unwrap();
//! let timeline = ReconciledTimeline::new(parts).unwrap();
//! for group in timeline.groups() {
//!     for pick in group.selected() {
//!         println!("{}", pick.view);
//!     }
//! }
//! ```

pub mod align;
pub mod consensus;
pub mod group;
pub mod input;
pub mod matcher;
pub mod report;
pub mod segment;
pub mod timeline;

// Re-export key types at crate root for convenience.
pub use align::{Anchor, PartAlignment};
pub use consensus::{CorruptionWarning, WarningKind};
pub use group::Candidate;
pub use input::{load_parts_from_path, load_parts_from_str, PartRecord, SegmentRecord};
pub use report::TimelineReport;
pub use segment::{Part, Segment, SubPart};
pub use timeline::{Group, ReconciledTimeline, Span, TimelineEntry};

use rv_core::{ReconcileConfig, Result};

/// Reconcile `parts` (in capture-session order) under `config`.
pub fn reconcile(parts: Vec<Part>, config: &ReconcileConfig) -> Result<ReconciledTimeline> {
    ReconciledTimeline::with_config(parts, config)
}
