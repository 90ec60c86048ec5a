//! Reconciliation configuration types.
//!
//! [`ReconcileConfig`] tunes a single reconciliation run. Every field defaults
//! sensibly so an empty `{}` (or an empty TOML table) is valid.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::media::StreamKind;
use crate::Error;

/// Which per-segment value is used to align successive captures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignKey {
    /// Hash of the leading keyframe packet.
    #[default]
    KeyframeHash,
    /// The per-stream content hash pair of the whole segment.
    SegmentHash,
}

/// What to do when two successive captures share no segment at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapPolicy {
    /// Fail the reconciliation with an alignment error.
    #[default]
    Reject,
    /// Place the later capture directly after the earlier one, separated by a
    /// gap marker.
    Append,
}

/// Knobs for one reconciliation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    pub align_key: AlignKey,
    pub gap_policy: GapPolicy,
    /// Streams whose content hashes must agree at every non-tail position.
    pub required_streams: Vec<StreamKind>,
    /// Excuse disagreement at the last compared position of a span.
    pub tail_exemption: bool,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            align_key: AlignKey::default(),
            gap_policy: GapPolicy::default(),
            required_streams: StreamKind::ALL.to_vec(),
            tail_exemption: true,
        }
    }
}

impl ReconcileConfig {
    /// Deserialize a `ReconcileConfig` from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str)
            .map_err(|e| Error::Parse(format!("reconcile config parse error: {e}")))
    }

    /// Whether content hashes of `kind` must agree across candidates.
    pub fn is_required(&self, kind: StreamKind) -> bool {
        self.required_streams.contains(&kind)
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.required_streams.is_empty() {
            warnings.push(
                "required_streams is empty; content disagreement will never be fatal".into(),
            );
        }

        let mut seen = Vec::new();
        for kind in &self.required_streams {
            if seen.contains(kind) {
                warnings.push(format!("required_streams lists '{kind}' more than once"));
            }
            seen.push(*kind);
        }

        if !self.tail_exemption {
            warnings.push(
                "tail_exemption is disabled; captures still recording will fail verification"
                    .into(),
            );
        }

        warnings
    }
}
