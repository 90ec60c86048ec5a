//! Checksum records produced by the segment-hashing step, and their
//! conversion into validated [`Part`]s.
//!
//! A checksum file is a JSON array with one record per capture file:
//!
//! ```json
//! [{"name": "rec-01.flv",
//!   "time_base": {"video": 0.001, "audio": 0.001},
//!   "data": [{"start_pts": 0, "end_pts": 1960,
//!             "frames": {"video": 50, "audio": 94},
//!             "keyframe_md5": "…",
//!             "segment_md5": {"video": "…", "audio": "…"}}]}]
//! ```

use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use rv_core::{Error, FrameCount, PerStream, Result, TimeBase};

use crate::segment::{Part, Segment};

/// One capture as emitted by the hashing step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartRecord {
    pub name: String,
    pub time_base: TimeBase,
    pub data: Vec<SegmentRecord>,
}

/// One keyframe-delimited chunk as emitted by the hashing step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentRecord {
    pub start_pts: i64,
    #[serde(default)]
    pub end_pts: Option<i64>,
    pub frames: FrameCount,
    pub keyframe_md5: String,
    pub segment_md5: PerStream<String>,
}

impl PartRecord {
    /// Validate the record and build a [`Part`] from it.
    pub fn into_part(self) -> Result<Part> {
        let PartRecord {
            name,
            time_base,
            data,
        } = self;

        let mut segments = Vec::with_capacity(data.len());
        for (i, record) in data.into_iter().enumerate() {
            let context = |field: &str| format!("part '{name}' segment {i}: {field}");
            segments.push(Segment {
                start_pts: record.start_pts,
                end_pts: record.end_pts,
                frame_count: record.frames,
                keyframe_hash: normalize_hash(&record.keyframe_md5, || context("keyframe_md5"))?,
                segment_hash: PerStream::new(
                    normalize_hash(&record.segment_md5.video, || context("segment_md5.video"))?,
                    normalize_hash(&record.segment_md5.audio, || context("segment_md5.audio"))?,
                ),
                time_base,
            });
        }

        Part::new(name, time_base, segments)
    }
}

/// Lowercase a hex digest after checking it is well-formed.
fn normalize_hash(value: &str, context: impl Fn() -> String) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::invalid_input(format!("{} is empty", context())));
    }
    hex::decode(value)
        .map_err(|e| Error::invalid_input(format!("{} is not a hex digest: {e}", context())))?;
    Ok(value.to_ascii_lowercase())
}

/// Parse a checksum document into validated parts, preserving record order.
pub fn load_parts_from_str(json: &str) -> Result<Vec<Part>> {
    let records: Vec<PartRecord> =
        serde_json::from_str(json).map_err(|e| Error::parse(format!("checksum file: {e}")))?;
    records.into_iter().map(PartRecord::into_part).collect()
}

/// Read and parse a checksum document from any reader.
pub fn load_parts_from_reader(mut reader: impl Read) -> Result<Vec<Part>> {
    let mut json = String::new();
    reader.read_to_string(&mut json)?;
    load_parts_from_str(&json)
}

/// Read and parse a checksum file.
pub fn load_parts_from_path(path: &Path) -> Result<Vec<Part>> {
    let file = std::fs::File::open(path)?;
    tracing::debug!("Loading checksum file {}", path.display());
    load_parts_from_reader(std::io::BufReader::new(file))
}
