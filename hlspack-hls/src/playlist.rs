//! HLS playlist rendering.
//!
//! Version 3 playlists, ASCII with CRLF line endings. The media playlist
//! lists one `#EXTINF` per emitted segment; the master playlist declares one
//! variant per rendition with its measured bandwidths.

use crate::stats::RenditionStats;

/// Fixed playlist version for this packager.
const HLS_VERSION: u32 = 3;

/// Segment filename for a zero-based ordinal.
pub fn segment_file_name(index: usize) -> String {
    format!("segment-{}.ts", index)
}

/// Media playlist filename within a rendition directory.
pub const MEDIA_PLAYLIST_NAME: &str = "stream.m3u8";

/// Per-rendition media playlist.
#[derive(Debug, Clone)]
pub struct MediaPlaylist {
    /// Rounded maximum segment duration.
    pub target_duration: u64,
    /// Present only when the rendition carries video.
    pub independent_segments: bool,
    /// Segment durations in seconds, in emission order.
    pub segment_durations: Vec<f64>,
}

impl MediaPlaylist {
    /// Build a playlist from a rendition's statistics.
    pub fn from_stats(stats: &RenditionStats, has_video: bool) -> Self {
        Self {
            target_duration: stats.target_duration(),
            independent_segments: has_video,
            segment_durations: stats.segment_durations.clone(),
        }
    }

    /// Render as M3U8, CRLF line endings.
    pub fn render(&self) -> String {
        let mut lines = vec![
            "#EXTM3U".to_string(),
            format!("#EXT-X-VERSION:{}", HLS_VERSION),
            "#EXT-X-PLAYLIST-TYPE:VOD".to_string(),
        ];

        if self.independent_segments {
            lines.push("#EXT-X-INDEPENDENT-SEGMENTS".to_string());
        }

        lines.push(format!("#EXT-X-TARGETDURATION:{}", self.target_duration));
        lines.push("#EXT-X-MEDIA-SEQUENCE:0".to_string());

        for (i, duration) in self.segment_durations.iter().enumerate() {
            lines.push(format!("#EXTINF:{:.6},", duration));
            lines.push(segment_file_name(i));
        }

        lines.push("#EXT-X-ENDLIST".to_string());
        lines.push(String::new());
        lines.join("\r\n")
    }
}

/// Variant stream entry in the master playlist.
#[derive(Debug, Clone)]
pub struct VariantStream {
    /// Average bandwidth in bits per second.
    pub average_bandwidth: u64,
    /// Peak bandwidth in bits per second.
    pub bandwidth: u64,
    /// RFC 6381 codec tags, video first.
    pub codecs: String,
    /// Resolution, if the variant carries video.
    pub resolution: Option<(u32, u32)>,
    /// Relative URI of the variant's media playlist.
    pub uri: String,
}

/// Multi-variant master playlist.
#[derive(Debug, Clone, Default)]
pub struct MasterPlaylist {
    /// Variants, one per rendition.
    pub variants: Vec<VariantStream>,
}

impl MasterPlaylist {
    /// Create an empty master playlist.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a variant stream.
    pub fn add_variant(&mut self, variant: VariantStream) {
        self.variants.push(variant);
    }

    /// Render as M3U8, CRLF line endings.
    pub fn render(&self) -> String {
        let mut lines = vec![
            "#EXTM3U".to_string(),
            format!("#EXT-X-VERSION:{}", HLS_VERSION),
        ];

        for variant in &self.variants {
            let mut attrs = vec![
                format!("AVERAGE-BANDWIDTH={}", variant.average_bandwidth),
                format!("BANDWIDTH={}", variant.bandwidth),
                format!("CODECS=\"{}\"", variant.codecs),
            ];
            if let Some((width, height)) = variant.resolution {
                attrs.push(format!("RESOLUTION={}x{}", width, height));
            }
            lines.push(format!("#EXT-X-STREAM-INF:{}", attrs.join(",")));
            lines.push(variant.uri.clone());
        }

        lines.push(String::new());
        lines.join("\r\n")
    }
}
