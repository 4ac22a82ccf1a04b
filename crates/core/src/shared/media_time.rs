use std::cmp::Ordering;
use std::fmt;
use std::time::Duration;

/// Finest tick `offset_by` is guaranteed to resolve.
pub const MIN_OFFSET_TIMESCALE: i32 = 1000;

/// A position on the media timeline, expressed as `value / timescale` seconds.
///
/// Capture devices stamp buffers with a rational time base, so comparisons
/// are done by cross-multiplication and stay exact across timescales.
#[derive(Clone, Copy)]
pub struct MediaTime {
    value: i64,
    timescale: i32,
}

impl MediaTime {
    pub fn new(value: i64, timescale: i32) -> Self {
        debug_assert!(timescale > 0, "timescale must be positive");
        Self { value, timescale }
    }

    pub fn zero() -> Self {
        Self::new(0, 1)
    }

    /// Rounds `seconds` to the nearest tick of `timescale`.
    pub fn from_secs_f64(seconds: f64, timescale: i32) -> Self {
        Self::new((seconds * timescale as f64).round() as i64, timescale)
    }

    pub fn value(&self) -> i64 {
        self.value
    }

    pub fn timescale(&self) -> i32 {
        self.timescale
    }

    pub fn as_secs_f64(&self) -> f64 {
        self.value as f64 / self.timescale as f64
    }

    /// Shifts forward by `delay`.
    ///
    /// Timescales coarser than a millisecond are first multiplied up to at
    /// least [`MIN_OFFSET_TIMESCALE`], so the delay survives on a `5/1` clock.
    pub fn offset_by(&self, delay: Duration) -> Self {
        let factor = if self.timescale < MIN_OFFSET_TIMESCALE {
            (MIN_OFFSET_TIMESCALE + self.timescale - 1) / self.timescale
        } else {
            1
        };
        let timescale = self.timescale * factor;
        let ticks = (delay.as_secs_f64() * timescale as f64).round() as i64;
        Self::new(self.value * factor as i64 + ticks, timescale)
    }

    /// Signed distance `self - earlier` in seconds.
    pub fn seconds_since(&self, earlier: MediaTime) -> f64 {
        self.as_secs_f64() - earlier.as_secs_f64()
    }

    /// Expresses this time in another timescale, rounding to the nearest tick.
    pub fn rescale(&self, timescale: i32) -> i64 {
        if timescale == self.timescale {
            return self.value;
        }
        let scaled = self.value as i128 * timescale as i128;
        let divisor = self.timescale as i128;
        let half = divisor / 2;
        let rounded = if scaled >= 0 {
            (scaled + half) / divisor
        } else {
            (scaled - half) / divisor
        };
        rounded as i64
    }
}

impl PartialEq for MediaTime {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for MediaTime {}

impl PartialOrd for MediaTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MediaTime {
    fn cmp(&self, other: &Self) -> Ordering {
        let lhs = self.value as i128 * other.timescale as i128;
        let rhs = other.value as i128 * self.timescale as i128;
        lhs.cmp(&rhs)
    }
}

impl fmt::Debug for MediaTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MediaTime({}/{} = {:.3}s)", self.value, self.timescale, self.as_secs_f64())
    }
}

impl fmt::Display for MediaTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}s", self.as_secs_f64())
    }
}
