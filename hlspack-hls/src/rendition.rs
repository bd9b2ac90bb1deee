//! Input renditions: one container plus its selected tracks and sources.

use crate::error::{HlsError, Result};
use hlspack_core::codec::CodecId;
use hlspack_core::error::{ContainerError, Error};
use hlspack_core::sample::Sample;
use hlspack_core::timescale::TimeScale;
use hlspack_mp4::{DecoderConfig, Mp4Demuxer, SampleDescription, SampleSource, Track, TrackType};
use hlspack_ts::adapt::{AudioAdapter, VideoAdapter};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Payload adapter for one track.
#[derive(Debug, Clone)]
pub(crate) enum TrackAdapter {
    Video(VideoAdapter),
    Audio(AudioAdapter),
}

impl TrackAdapter {
    pub(crate) fn adapt(&self, sample: &Sample) -> hlspack_ts::Result<Vec<u8>> {
        match self {
            TrackAdapter::Video(v) => v.adapt(sample.data(), sample.sync),
            TrackAdapter::Audio(a) => a.adapt(sample.data()),
        }
    }
}

/// One selected track of a rendition, ready for muxing.
pub(crate) struct RenditionTrack {
    pub codec: CodecId,
    pub codec_string: String,
    pub width: u32,
    pub height: u32,
    pub timescale: TimeScale,
    pub adapter: TrackAdapter,
    pub source: SampleSource,
}

/// A single input to the packager: one container, at most one audio and at
/// most one video track, with their sample sources.
///
/// Created before alignment and consumed by the segmenter that packages it.
pub struct InputRendition {
    path: PathBuf,
    keyframes: Vec<f32>,
    pub(crate) audio: Option<RenditionTrack>,
    pub(crate) video: Option<RenditionTrack>,
}

impl InputRendition {
    /// Open a container and select its tracks.
    ///
    /// Fails fast on unreadable files, missing movie headers, inputs with
    /// neither audio nor video, and codecs outside the remux table.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let demuxer = Mp4Demuxer::open(&path).map_err(|e| match e {
            Error::Io(source) => HlsError::InputOpen {
                path: path.clone(),
                source,
            },
            Error::Container(ContainerError::NoMovie) => HlsError::NoMovie { path: path.clone() },
            other => HlsError::Container(other),
        })?;

        let audio_track = demuxer
            .tracks()
            .iter()
            .find(|t| t.track_type == TrackType::Audio)
            .cloned();
        let video_track = demuxer
            .tracks()
            .iter()
            .find(|t| t.track_type == TrackType::Video)
            .cloned();

        if audio_track.is_none() && video_track.is_none() {
            return Err(HlsError::NoMedia { path });
        }

        if demuxer.tracks().len() > 2 {
            warn!(
                path = %path.display(),
                "container has more than one track per media type, using the first of each"
            );
        }

        let keyframes = video_track
            .as_ref()
            .map(|t| demuxer.sync_sample_times(t.track_id))
            .unwrap_or_default();

        let audio = audio_track
            .map(|t| open_track(&demuxer, &path, t))
            .transpose()?;
        let video = video_track
            .map(|t| open_track(&demuxer, &path, t))
            .transpose()?;

        debug!(
            path = %path.display(),
            audio = audio.is_some(),
            video = video.is_some(),
            keyframes = keyframes.len(),
            "opened rendition"
        );

        Ok(Self {
            path,
            keyframes,
            audio,
            video,
        })
    }

    /// The container path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True when a video track is selected.
    pub fn has_video(&self) -> bool {
        self.video.is_some()
    }

    /// True when an audio track is selected.
    pub fn has_audio(&self) -> bool {
        self.audio.is_some()
    }

    /// Sync-sample timestamps of the video track in seconds; empty for
    /// audio-only inputs.
    pub fn keyframe_index(&self) -> &[f32] {
        &self.keyframes
    }

    /// Comma-separated RFC 6381 codec tags, video first.
    pub fn codecs_string(&self) -> String {
        let mut tags = Vec::new();
        if let Some(video) = &self.video {
            tags.push(video.codec_string.clone());
        }
        if let Some(audio) = &self.audio {
            tags.push(audio.codec_string.clone());
        }
        tags.join(",")
    }

    /// Video resolution in pixels, if a video track is present.
    pub fn resolution(&self) -> Option<(u32, u32)> {
        self.video.as_ref().map(|v| (v.width, v.height))
    }
}

fn open_track(demuxer: &Mp4Demuxer, path: &Path, track: Track) -> Result<RenditionTrack> {
    let description = track
        .description()
        .cloned()
        .ok_or_else(|| HlsError::UnsupportedCodec {
            fourcc: "none".to_string(),
            path: path.to_path_buf(),
        })?;

    let unsupported = || HlsError::UnsupportedCodec {
        fourcc: description.fourcc_str(),
        path: path.to_path_buf(),
    };

    let codec = description.codec.ok_or_else(unsupported)?;
    let codec_string = description.codec_string().ok_or_else(unsupported)?;
    let adapter = build_adapter(&description, codec).ok_or_else(unsupported)?;

    // Prefer the sample-entry dimensions, fall back to the track header.
    let (width, height) = if description.width > 0 {
        (description.width as u32, description.height as u32)
    } else {
        (track.width, track.height)
    };

    let source = demuxer.sample_source(track.track_id)?;

    Ok(RenditionTrack {
        codec,
        codec_string,
        width,
        height,
        timescale: track.timescale,
        adapter,
        source,
    })
}

fn build_adapter(description: &SampleDescription, codec: CodecId) -> Option<TrackAdapter> {
    match (&description.config, codec) {
        (DecoderConfig::Avc(config), _) => {
            VideoAdapter::h264(config).ok().map(TrackAdapter::Video)
        }
        (DecoderConfig::Hevc(config), _) => {
            VideoAdapter::h265(config).ok().map(TrackAdapter::Video)
        }
        (DecoderConfig::Aac(config), _) => AudioAdapter::aac(config).ok().map(TrackAdapter::Audio),
        (DecoderConfig::None, CodecId::Ac3 | CodecId::Eac3) => {
            Some(TrackAdapter::Audio(AudioAdapter::passthrough()))
        }
        // A supported fourcc without its configuration record cannot be
        // remuxed (no parameter sets / no ADTS fields).
        _ => None,
    }
}
