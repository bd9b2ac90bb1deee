//! Interleaved sample muxer and segmenter.
//!
//! Drives the TS writer over one rendition: audio and video samples are
//! emitted in interleaved decode order, segments are cut at the planned
//! boundaries (video) or at the target duration (audio-only), and PAT/PMT
//! open every segment.

use crate::align::MAX_DTS_DELTA;
use crate::error::Result;
use crate::playlist::{segment_file_name, MediaPlaylist, MEDIA_PLAYLIST_NAME};
use crate::rendition::{InputRendition, RenditionTrack, TrackAdapter};
use crate::stats::RenditionStats;
use hlspack_core::sample::Sample;
use hlspack_core::timescale::TimeScale;
use hlspack_mp4::SampleSource;
use hlspack_ts::writer::{StreamConfig, PID_AUDIO, PID_VIDEO};
use hlspack_ts::{TsWriter, TS_PACKET_SIZE};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Configuration for one segmenter run.
#[derive(Debug, Clone)]
pub struct SegmenterConfig {
    /// Directory receiving this rendition's segments and media playlist.
    pub output_dir: PathBuf,
    /// Target segment duration in seconds.
    pub target_duration: f64,
    /// Shared aligned boundary list. Empty means time-based mode: cut at
    /// the target duration directly.
    pub boundaries: Arc<Vec<f32>>,
}

/// Muxing cursor over one track.
struct TrackCursor {
    source: SampleSource,
    timescale: TimeScale,
    adapter: TrackAdapter,
    stream_index: usize,
    /// Current primed sample, `None` once end-of-stream is reached.
    sample: Option<Sample>,
    /// DTS of the current sample in seconds; after end-of-stream, the
    /// synthesized trailing timestamp (last dts + last duration).
    ts: f64,
    /// Duration of the current sample in seconds.
    dur: f64,
    eos: bool,
}

impl TrackCursor {
    fn new(track: RenditionTrack, stream_index: usize) -> Self {
        Self {
            timescale: track.timescale,
            source: track.source,
            adapter: track.adapter,
            stream_index,
            sample: None,
            ts: 0.0,
            dur: 0.0,
            eos: false,
        }
    }

    /// Read the next sample; on end-of-stream extrapolate the trailing
    /// timestamp used for the final segment's duration.
    fn advance(&mut self) -> Result<()> {
        match self.source.next()? {
            Some(sample) => {
                self.ts = self.timescale.to_seconds(sample.dts);
                self.dur = self.timescale.to_seconds(sample.duration as u64);
                self.sample = Some(sample);
            }
            None => {
                self.eos = true;
                self.ts += self.dur;
                self.dur = 0.0;
                self.sample = None;
            }
        }
        Ok(())
    }
}

/// Which track the main loop selected for this step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Chosen {
    Audio,
    Video,
}

/// Packages one rendition into TS segments plus a media playlist.
///
/// Takes ownership of its input rendition; nothing else may alias the
/// sample sources while a run is in flight.
pub struct Segmenter {
    config: SegmenterConfig,
    writer: TsWriter,
    audio: Option<TrackCursor>,
    video: Option<TrackCursor>,
    stats: RenditionStats,
}

impl Segmenter {
    /// Create a segmenter for a rendition, registering its elementary
    /// streams with the TS writer.
    pub fn new(rendition: InputRendition, config: SegmenterConfig) -> Self {
        let mut writer = TsWriter::new();
        let stats = RenditionStats {
            codecs: rendition.codecs_string(),
            resolution: rendition.resolution(),
            ..Default::default()
        };

        let audio = rendition.audio.map(|track| {
            let index = writer.add_stream(StreamConfig::for_codec(track.codec, PID_AUDIO));
            TrackCursor::new(track, index)
        });
        let video = rendition.video.map(|track| {
            let index = writer.add_stream(StreamConfig::for_codec(track.codec, PID_VIDEO));
            TrackCursor::new(track, index)
        });

        Self {
            config,
            writer,
            audio,
            video,
            stats,
        }
    }

    /// Run the main loop to completion and write the media playlist.
    pub fn run(mut self) -> Result<RenditionStats> {
        // Prime each track with its first sample.
        if let Some(audio) = self.audio.as_mut() {
            audio.advance()?;
        }
        if let Some(video) = self.video.as_mut() {
            video.advance()?;
        }

        let boundaries = Arc::clone(&self.config.boundaries);
        let mut boundary_cursor = 0usize;
        let mut seg_no = 0usize;
        let mut seg_out: Option<BufWriter<File>> = None;
        let mut seg_packets_start = 0u64;
        let mut last_ts = 0f64;

        loop {
            // Track selection: audio by default, video once its DTS has
            // caught up (or when audio is absent or drained).
            let mut chosen = None;
            if self.audio.as_ref().is_some_and(|a| !a.eos) {
                chosen = Some(Chosen::Audio);
            }
            if let Some(video) = &self.video {
                if !video.eos {
                    let take = match (&chosen, &self.audio) {
                        (Some(_), Some(audio)) => video.ts <= audio.ts,
                        _ => true,
                    };
                    if take {
                        chosen = Some(Chosen::Video);
                    }
                }
            }

            // Only video sync samples may start a segment; with no video
            // track, every audio sample is a permissible boundary.
            let sync_frame = match chosen {
                Some(Chosen::Video) => self
                    .video
                    .as_ref()
                    .and_then(|v| v.sample.as_ref())
                    .is_some_and(|s| s.sync),
                Some(Chosen::Audio) => self.video.is_none(),
                None => false,
            };

            // Boundary test, before this step's sample is written.
            if chosen.is_none() || sync_frame {
                let candidate = match (&self.video, &self.audio) {
                    (Some(video), _) => video.ts,
                    (None, Some(audio)) => audio.ts,
                    (None, None) => 0.0,
                };
                let seg_dur = candidate - last_ts;

                let cut = seg_out.is_some()
                    && (chosen.is_none()
                        || self.should_cut(candidate, seg_dur, &boundaries, &mut boundary_cursor));

                if cut {
                    let mut out = seg_out.take().expect("segment sink present at cut");
                    out.flush()?;
                    let seg_size =
                        (self.writer.packets_written() - seg_packets_start) * TS_PACKET_SIZE as u64;
                    self.stats.record_segment(seg_dur, seg_size);
                    debug!(
                        segment = seg_no,
                        duration = seg_dur,
                        bytes = seg_size,
                        "closed segment"
                    );
                    seg_no += 1;
                    last_ts = candidate;
                }
            }

            let Some(chosen) = chosen else {
                break;
            };

            // Open the next segment on demand, tables first.
            if seg_out.is_none() {
                let path = self.config.output_dir.join(segment_file_name(seg_no));
                let file = File::create(&path)?;
                let mut out = BufWriter::new(file);
                seg_packets_start = self.writer.packets_written();
                self.writer.write_tables(&mut out)?;
                seg_out = Some(out);
            }
            let out = seg_out.as_mut().expect("segment sink open");

            // Emit the chosen track's sample and advance its cursor.
            let video_present = self.video.is_some();
            let cursor = match chosen {
                Chosen::Audio => self.audio.as_mut(),
                Chosen::Video => self.video.as_mut(),
            }
            .expect("chosen track exists");

            let sample = cursor.sample.take().expect("chosen track has a sample");
            let payload = cursor.adapter.adapt(&sample)?;
            let pts = cursor.timescale.to_90khz(sample.cts);
            let dts = cursor.timescale.to_90khz(sample.dts);
            let with_pcr = match chosen {
                Chosen::Video => true,
                Chosen::Audio => !video_present,
            };
            self.writer.write_sample(
                out,
                cursor.stream_index,
                &payload,
                pts,
                dts,
                sample.sync,
                with_pcr,
            )?;
            cursor.advance()?;
        }

        let playlist = MediaPlaylist::from_stats(&self.stats, self.video.is_some());
        fs::write(
            self.config.output_dir.join(MEDIA_PLAYLIST_NAME),
            playlist.render(),
        )?;

        info!(
            dir = %self.config.output_dir.display(),
            segments = self.stats.segment_count(),
            duration = self.stats.total_duration(),
            "packaged rendition"
        );

        Ok(self.stats)
    }

    /// Decide whether a segment ends at `candidate`.
    ///
    /// With video and a boundary list, cut when the candidate falls within
    /// twice the alignment tolerance of the next planned boundary. With an
    /// empty list (single-input runs) or no video, fall back to the target
    /// duration.
    fn should_cut(
        &self,
        candidate: f64,
        seg_dur: f64,
        boundaries: &[f32],
        boundary_cursor: &mut usize,
    ) -> bool {
        if self.video.is_some() && !boundaries.is_empty() {
            let window = 2.0 * MAX_DTS_DELTA as f64;
            while *boundary_cursor < boundaries.len()
                && (boundaries[*boundary_cursor] as f64) < candidate - window
            {
                *boundary_cursor += 1;
            }
            match boundaries.get(*boundary_cursor) {
                Some(&boundary) if ((boundary as f64) - candidate).abs() <= window => {
                    *boundary_cursor += 1;
                    true
                }
                _ => false,
            }
        } else {
            seg_dur >= self.config.target_duration
        }
    }
}
