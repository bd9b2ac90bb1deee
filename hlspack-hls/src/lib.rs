//! HLS packaging core: keyframe alignment, segmentation and playlists.
//!
//! Converts one or more ISO-BMFF inputs into an HLS version 3 presentation:
//! per-rendition MPEG-2 TS segments and media playlists, plus one master
//! playlist. Multi-rendition runs share a single aligned boundary list so a
//! player can switch variants at any segment edge.

pub mod align;
pub mod error;
pub mod packager;
pub mod playlist;
pub mod rendition;
pub mod segmenter;
pub mod stats;

pub use align::{plan_boundaries, MAX_DTS_DELTA};
pub use error::{HlsError, Result};
pub use packager::{package, PackagerConfig};
pub use playlist::{MasterPlaylist, MediaPlaylist, VariantStream};
pub use rendition::InputRendition;
pub use segmenter::{Segmenter, SegmenterConfig};
pub use stats::RenditionStats;
