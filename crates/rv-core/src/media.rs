//! Media-domain value types shared by segment records.
//!
//! Captures always carry exactly one video and one audio stream, so every
//! per-stream quantity (hashes, frame counts, time bases) is held in a small
//! fixed [`PerStream`] pair instead of a map.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// StreamKind
// ---------------------------------------------------------------------------

/// The elementary stream types present in every capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Video,
    Audio,
}

impl StreamKind {
    /// Both stream kinds, video first.
    pub const ALL: [StreamKind; 2] = [StreamKind::Video, StreamKind::Audio];
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Video => write!(f, "video"),
            Self::Audio => write!(f, "audio"),
        }
    }
}

// ---------------------------------------------------------------------------
// PerStream
// ---------------------------------------------------------------------------

/// A pair of values, one per [`StreamKind`].
///
/// Ordering is lexicographic with video first, which is what frame-count
/// tie-breaking relies on.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct PerStream<T> {
    pub video: T,
    pub audio: T,
}

impl<T> PerStream<T> {
    pub fn new(video: T, audio: T) -> Self {
        Self { video, audio }
    }

    /// Borrow the value for one stream.
    pub fn get(&self, kind: StreamKind) -> &T {
        match kind {
            StreamKind::Video => &self.video,
            StreamKind::Audio => &self.audio,
        }
    }

    /// Iterate `(kind, value)` pairs, video first.
    pub fn iter(&self) -> impl Iterator<Item = (StreamKind, &T)> {
        [(StreamKind::Video, &self.video), (StreamKind::Audio, &self.audio)].into_iter()
    }
}

/// Frames contained in one segment, per stream.
pub type FrameCount = PerStream<u64>;

/// Ticks-to-seconds conversion factors, per stream.
pub type TimeBase = PerStream<Rational>;

// ---------------------------------------------------------------------------
// Rational
// ---------------------------------------------------------------------------

/// Largest denominator produced when approximating a float time base.
pub const MAX_TIME_BASE_DENOMINATOR: i64 = 1_000_000;

/// A positive, fully reduced fraction.
///
/// Deserializes from either a JSON number (approximated to the closest
/// fraction with a denominator of at most [`MAX_TIME_BASE_DENOMINATOR`]) or a
/// `"num/den"` string. Serializes as the `"num/den"` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RationalRepr", into = "String")]
pub struct Rational {
    num: i64,
    den: i64,
}

impl Rational {
    /// Build a reduced fraction. Both parts must be positive.
    pub fn new(num: i64, den: i64) -> Result<Self> {
        if num <= 0 || den <= 0 {
            return Err(Error::invalid_input(format!(
                "time base must be positive, got {num}/{den}"
            )));
        }
        let g = gcd(num, den);
        Ok(Self {
            num: num / g,
            den: den / g,
        })
    }

    /// Closest fraction to `value` with a bounded denominator.
    pub fn from_f64(value: f64) -> Result<Self> {
        if !value.is_finite() || value <= 0.0 {
            return Err(Error::invalid_input(format!(
                "time base must be a positive finite number, got {value}"
            )));
        }

        // Continued-fraction convergents p/q.
        let (mut p0, mut q0, mut p1, mut q1) = (0i64, 1i64, 1i64, 0i64);
        let mut x = value;
        loop {
            let a = x.floor() as i64;
            let q2 = q0.saturating_add(a.saturating_mul(q1));
            if q2 > MAX_TIME_BASE_DENOMINATOR {
                break;
            }
            let p2 = p0.saturating_add(a.saturating_mul(p1));
            (p0, q0, p1, q1) = (p1, q1, p2, q2);

            let frac = x - x.floor();
            let approx = p1 as f64 / q1 as f64;
            if frac < 1e-12 || (approx - value).abs() <= value * 1e-12 {
                break;
            }
            x = 1.0 / frac;
        }

        if q1 == 0 {
            return Err(Error::invalid_input(format!(
                "time base {value} cannot be represented"
            )));
        }
        Self::new(p1, q1)
    }

    pub fn numerator(&self) -> i64 {
        self.num
    }

    pub fn denominator(&self) -> i64 {
        self.den
    }

    pub fn as_f64(&self) -> f64 {
        self.num as f64 / self.den as f64
    }

    /// Convert a tick count in this time base to seconds.
    pub fn ticks_to_seconds(&self, ticks: i64) -> f64 {
        ticks as f64 * self.num as f64 / self.den as f64
    }
}

fn gcd(mut a: i64, mut b: i64) -> i64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a.abs().max(1)
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

impl FromStr for Rational {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        match s.split_once('/') {
            Some((num, den)) => {
                let num = num
                    .trim()
                    .parse::<i64>()
                    .map_err(|e| Error::parse(format!("invalid time base '{s}': {e}")))?;
                let den = den
                    .trim()
                    .parse::<i64>()
                    .map_err(|e| Error::parse(format!("invalid time base '{s}': {e}")))?;
                Self::new(num, den)
            }
            None => {
                let value = s
                    .parse::<f64>()
                    .map_err(|e| Error::parse(format!("invalid time base '{s}': {e}")))?;
                Self::from_f64(value)
            }
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RationalRepr {
    Number(f64),
    Text(String),
}

impl TryFrom<RationalRepr> for Rational {
    type Error = Error;

    fn try_from(repr: RationalRepr) -> Result<Self> {
        match repr {
            RationalRepr::Number(value) => Rational::from_f64(value),
            RationalRepr::Text(text) => text.parse(),
        }
    }
}

impl From<Rational> for String {
    fn from(r: Rational) -> Self {
        r.to_string()
    }
}

// ---------------------------------------------------------------------------
// Timestamps
// ---------------------------------------------------------------------------

/// Render seconds as `MM:SS.sss`. Minutes are not wrapped into hours.
pub fn format_timestamp(seconds: f64) -> String {
    let sign = if seconds < 0.0 { "-" } else { "" };
    let seconds = seconds.abs();
    let minutes = (seconds / 60.0).floor() as u64;
    let rest = seconds - minutes as f64 * 60.0;
    format!("{sign}{minutes:02}:{rest:06.3}")
}
