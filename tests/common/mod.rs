//! Shared fixtures for integration tests.
//!
//! Builds checksum documents for synthetic captures of one stream. Segment `i`
//! of the stream always starts at `i * 2s` and carries hashes derived from `i`,
//! so captures that overlap agree wherever they share a segment.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use serde_json::{json, Value};
use tempfile::TempDir;

pub fn segment(i: u32) -> Value {
    json!({
        "start_pts": i as i64 * 2000,
        "end_pts": i as i64 * 2000 + 1960,
        "frames": {"video": 50, "audio": 94},
        "keyframe_md5": format!("{:032x}", i),
        "segment_md5": {
            "video": format!("{:031x}0", i),
            "audio": format!("{:031x}1", i),
        },
    })
}

/// A capture holding stream segments `range`.
pub fn capture(name: &str, range: std::ops::Range<u32>) -> Value {
    json!({
        "name": name,
        "time_base": {"video": 0.001, "audio": 0.001},
        "data": range.map(segment).collect::<Vec<_>>(),
    })
}

/// Temporary directory holding checksum files.
pub struct Fixtures {
    dir: TempDir,
}

impl Fixtures {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write a checksum document made of `captures`.
    pub fn write(&self, file_name: &str, captures: Vec<Value>) -> PathBuf {
        self.write_raw(file_name, &Value::Array(captures).to_string())
    }

    pub fn write_raw(&self, file_name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(file_name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    /// Two overlapping captures that reconcile cleanly into 8 segments.
    pub fn clean(&self) -> PathBuf {
        self.write("clean.json", vec![capture("a.flv", 0..5), capture("b.flv", 2..8)])
    }

    /// Three captures where the second corrupts a mid-stream video segment
    /// starting at 00:04.000.
    pub fn diverged(&self) -> PathBuf {
        let mut bad = capture("b.flv", 0..6);
        bad["data"][2]["segment_md5"]["video"] = json!("ffffffffffffffffffffffffffffffff");
        self.write(
            "diverged.json",
            vec![capture("a.flv", 0..6), bad, capture("c.flv", 0..6)],
        )
    }

    /// Two captures with nothing in common.
    pub fn disjoint(&self) -> PathBuf {
        self.write("disjoint.json", vec![capture("a.flv", 0..3), capture("b.flv", 10..13)])
    }
}
