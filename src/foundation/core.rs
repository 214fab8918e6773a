use std::time::Duration;

use crate::foundation::error::{VoxError, VoxResult};

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Frames-per-second represented as a rational `num/den`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    /// Numerator (frames).
    pub num: u32,
    /// Denominator (seconds), must be non-zero.
    pub den: u32,
}

impl Fps {
    /// Create a validated FPS value.
    pub fn new(num: u32, den: u32) -> VoxResult<Self> {
        if den == 0 {
            return Err(VoxError::transform("Fps den must be > 0"));
        }
        if num == 0 {
            return Err(VoxError::transform("Fps num must be > 0"));
        }
        Ok(Self { num, den })
    }

    /// Parse ffprobe's `r_frame_rate` / `avg_frame_rate` notation (`30000/1001` or `25`).
    pub fn parse_ratio(s: &str) -> VoxResult<Self> {
        let s = s.trim();
        let (num, den) = match s.split_once('/') {
            Some((n, d)) => (n.trim(), d.trim()),
            None => (s, "1"),
        };
        let num = num
            .parse::<u32>()
            .map_err(|e| VoxError::transform(format!("invalid frame rate '{s}': {e}")))?;
        let den = den
            .parse::<u32>()
            .map_err(|e| VoxError::transform(format!("invalid frame rate '{s}': {e}")))?;
        Self::new(num, den)
    }

    /// Convert to floating-point FPS.
    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }

    /// Number of whole frames that fit in `duration` (floor), computed without floats.
    pub fn frames_in(self, duration: Duration) -> u64 {
        let n = duration.as_nanos() * u128::from(self.num);
        let d = NANOS_PER_SEC * u128::from(self.den);
        (n / d) as u64
    }
}

impl std::fmt::Display for Fps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

/// Frame dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct FrameSize {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl FrameSize {
    /// Canonical portrait delivery size.
    pub const PORTRAIT_1080P: FrameSize = FrameSize {
        width: 1080,
        height: 1920,
    };

    /// Create a frame size.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Return `true` when either side is zero.
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Both sides even (needed for yuv420p output).
    pub fn is_even(self) -> bool {
        self.width.is_multiple_of(2) && self.height.is_multiple_of(2)
    }

    /// Byte length of one tightly packed RGBA8 frame.
    pub fn rgba_len(self) -> usize {
        (self.width as usize)
            .saturating_mul(self.height as usize)
            .saturating_mul(4)
    }
}

impl std::fmt::Display for FrameSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Parse a non-negative decimal seconds string (`"5.005000"`) into an exact [`Duration`].
///
/// Digits past nanosecond precision are truncated. Returns `None` for signs, exponents, empty
/// input or anything else that is not plain `digits[.digits]`.
pub fn duration_from_decimal_secs(s: &str) -> Option<Duration> {
    let s = s.trim();
    let (whole, frac) = match s.split_once('.') {
        Some((w, f)) => (w, f),
        None => (s, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return None;
    }
    if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let secs = if whole.is_empty() {
        0
    } else {
        whole.parse::<u64>().ok()?
    };
    let mut nanos = 0u32;
    for (i, b) in frac.bytes().take(9).enumerate() {
        nanos += u32::from(b - b'0') * 10u32.pow(8 - i as u32);
    }
    Some(Duration::new(secs, nanos))
}

/// Format a duration the way `ffmpeg -t` expects (`seconds.nanoseconds`).
pub(crate) fn duration_to_ffmpeg_secs(d: Duration) -> String {
    format!("{}.{:09}", d.as_secs(), d.subsec_nanos())
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
