//! Track time-scale handling.
//!
//! A media track expresses timestamps in integer ticks of its time scale
//! (ticks per second, commonly 90000 for video and the sample rate for
//! audio). PES timestamps use a fixed 90 kHz clock.

use std::fmt;

/// Ticks per second of a track's timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeScale(u32);

impl TimeScale {
    /// The MPEG PES/PCR base clock (90 kHz).
    pub const MPEG: TimeScale = TimeScale(90_000);

    /// Create a new time scale. A zero value is clamped to 1 so that
    /// conversions stay total.
    pub fn new(ticks_per_second: u32) -> Self {
        Self(ticks_per_second.max(1))
    }

    /// Ticks per second.
    pub fn ticks_per_second(&self) -> u32 {
        self.0
    }

    /// Convert a tick count to seconds.
    pub fn to_seconds(&self, value: u64) -> f64 {
        value as f64 / self.0 as f64
    }

    /// Convert a tick count to seconds in single precision.
    ///
    /// Adequate for keyframe indexes, where the 0.2 s alignment tolerance
    /// dominates rounding noise.
    pub fn to_seconds_f32(&self, value: u64) -> f32 {
        (value as f64 / self.0 as f64) as f32
    }

    /// Rescale a tick count to the 90 kHz MPEG clock.
    pub fn to_90khz(&self, value: u64) -> u64 {
        if self.0 == Self::MPEG.0 {
            return value;
        }
        (value as u128 * Self::MPEG.0 as u128 / self.0 as u128) as u64
    }
}

impl fmt::Display for TimeScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}Hz", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_seconds() {
        let ts = TimeScale::new(90_000);
        assert!((ts.to_seconds(90_000) - 1.0).abs() < 1e-9);
        assert!((ts.to_seconds(45_000) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_to_90khz() {
        let audio = TimeScale::new(48_000);
        assert_eq!(audio.to_90khz(48_000), 90_000);
        assert_eq!(audio.to_90khz(24_000), 45_000);

        let video = TimeScale::new(90_000);
        assert_eq!(video.to_90khz(123_456), 123_456);
    }

    #[test]
    fn test_to_90khz_no_overflow() {
        // Several hours of 48 kHz audio.
        let audio = TimeScale::new(48_000);
        let ten_hours = 48_000u64 * 3600 * 10;
        assert_eq!(audio.to_90khz(ten_hours), 90_000u64 * 3600 * 10);
    }

    #[test]
    fn test_zero_clamped() {
        let ts = TimeScale::new(0);
        assert_eq!(ts.ticks_per_second(), 1);
    }
}
