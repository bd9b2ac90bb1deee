//! Per-rendition packaging statistics.
//!
//! Owned by the segmenter run that produces them; the master playlist
//! emitter is their only downstream consumer.

use serde::Serialize;

/// Tallies for one packaged rendition.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RenditionStats {
    /// Segment durations in seconds, in emission order.
    pub segment_durations: Vec<f64>,
    /// Segment sizes in bytes, in emission order.
    pub segment_sizes: Vec<u64>,
    /// Peak segment bitrate in bits per second.
    pub peak_bitrate: f64,
    /// RFC 6381 codec tags, video first, comma separated.
    pub codecs: String,
    /// Video resolution, if a video track is present.
    pub resolution: Option<(u32, u32)>,
}

impl RenditionStats {
    /// Record one finished segment.
    pub fn record_segment(&mut self, duration: f64, size: u64) {
        self.segment_durations.push(duration);
        self.segment_sizes.push(size);
        if duration > 0.0 {
            let bitrate = 8.0 * size as f64 / duration;
            if bitrate > self.peak_bitrate {
                self.peak_bitrate = bitrate;
            }
        }
    }

    /// Number of segments emitted.
    pub fn segment_count(&self) -> usize {
        self.segment_durations.len()
    }

    /// Total bytes across all segments.
    pub fn total_bytes(&self) -> u64 {
        self.segment_sizes.iter().sum()
    }

    /// Total duration across all segments in seconds.
    pub fn total_duration(&self) -> f64 {
        self.segment_durations.iter().sum()
    }

    /// Average bandwidth in bits per second, rounded up.
    pub fn average_bandwidth(&self) -> u64 {
        let duration = self.total_duration();
        if duration > 0.0 {
            (8.0 * self.total_bytes() as f64 / duration).ceil() as u64
        } else {
            0
        }
    }

    /// Peak bandwidth in bits per second, rounded up.
    pub fn bandwidth(&self) -> u64 {
        self.peak_bitrate.ceil() as u64
    }

    /// Playlist target duration: the rounded maximum segment duration.
    pub fn target_duration(&self) -> u64 {
        self.segment_durations
            .iter()
            .map(|&d| (d + 0.5).floor() as u64)
            .max()
            .unwrap_or(0)
    }

    /// Resolution as a `WxH` string, if video is present.
    pub fn resolution_string(&self) -> Option<String> {
        self.resolution.map(|(w, h)| format!("{}x{}", w, h))
    }
}
