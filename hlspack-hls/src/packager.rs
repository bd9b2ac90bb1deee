//! Batch packaging driver.
//!
//! Opens every input rendition, plans the shared boundary list once, runs
//! one segmenter per rendition, then writes the master playlist. Renditions
//! are independent after planning and run on the rayon pool.

use crate::align::plan_boundaries;
use crate::error::{HlsError, Result};
use crate::playlist::{MasterPlaylist, VariantStream, MEDIA_PLAYLIST_NAME};
use crate::rendition::InputRendition;
use crate::segmenter::{Segmenter, SegmenterConfig};
use crate::stats::RenditionStats;
use rayon::prelude::*;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Default segment duration in seconds.
pub const DEFAULT_SEGMENT_DURATION: f64 = 6.0;

/// Default master playlist filename.
pub const DEFAULT_MASTER_PLAYLIST: &str = "master.m3u8";

/// Packager configuration.
#[derive(Debug, Clone)]
pub struct PackagerConfig {
    /// Input container files, one per rendition.
    pub input_files: Vec<PathBuf>,
    /// Output root. Renditions land in `media-<i>/` below it.
    pub output_dir: PathBuf,
    /// Target segment duration in seconds.
    pub segment_duration: f64,
    /// Master playlist filename within the output root.
    pub master_playlist_name: String,
}

impl PackagerConfig {
    /// Configuration with default segment duration and master name.
    pub fn new(input_files: Vec<PathBuf>, output_dir: PathBuf) -> Self {
        Self {
            input_files,
            output_dir,
            segment_duration: DEFAULT_SEGMENT_DURATION,
            master_playlist_name: DEFAULT_MASTER_PLAYLIST.to_string(),
        }
    }

    /// Directory of the i-th rendition below the output root.
    pub fn rendition_dir(&self, index: usize) -> PathBuf {
        self.output_dir.join(format!("media-{}", index))
    }
}

/// Package every input into an HLS presentation.
///
/// Returns the per-rendition statistics in input order.
pub fn package(config: &PackagerConfig) -> Result<Vec<RenditionStats>> {
    if config.input_files.is_empty() {
        return Err(HlsError::InvalidConfig(
            "at least one input file is required".into(),
        ));
    }
    if !(config.segment_duration > 0.0) {
        return Err(HlsError::InvalidConfig(format!(
            "segment duration must be positive, got {}",
            config.segment_duration
        )));
    }

    let renditions = config
        .input_files
        .iter()
        .map(InputRendition::open)
        .collect::<Result<Vec<_>>>()?;

    let indexes: Vec<Vec<f32>> = renditions
        .iter()
        .map(|r| r.keyframe_index().to_vec())
        .collect();
    let boundaries = Arc::new(plan_boundaries(&indexes, config.segment_duration));

    info!(
        inputs = renditions.len(),
        boundaries = boundaries.len(),
        target = config.segment_duration,
        "starting packaging run"
    );

    fs::create_dir_all(&config.output_dir).map_err(|source| HlsError::OutputDir {
        path: config.output_dir.clone(),
        source,
    })?;

    let stats = renditions
        .into_par_iter()
        .enumerate()
        .map(|(index, rendition)| {
            let dir = config.rendition_dir(index);
            // A pre-existing rendition directory is fatal: stale segments
            // from an earlier run must never mix with fresh ones.
            fs::create_dir(&dir).map_err(|source| HlsError::OutputDir {
                path: dir.clone(),
                source,
            })?;

            let segmenter = Segmenter::new(
                rendition,
                SegmenterConfig {
                    output_dir: dir,
                    target_duration: config.segment_duration,
                    boundaries: Arc::clone(&boundaries),
                },
            );
            segmenter.run()
        })
        .collect::<Result<Vec<_>>>()?;

    let mut master = MasterPlaylist::new();
    for (index, rendition_stats) in stats.iter().enumerate() {
        master.add_variant(VariantStream {
            average_bandwidth: rendition_stats.average_bandwidth(),
            bandwidth: rendition_stats.bandwidth(),
            codecs: rendition_stats.codecs.clone(),
            resolution: rendition_stats.resolution,
            uri: format!("media-{}/{}", index, MEDIA_PLAYLIST_NAME),
        });
    }
    let master_path = config.output_dir.join(&config.master_playlist_name);
    fs::write(&master_path, master.render())?;

    info!(
        master = %master_path.display(),
        variants = stats.len(),
        "packaging complete"
    );

    Ok(stats)
}
