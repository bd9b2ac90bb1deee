//! MP4 demuxer: opens a file, exposes its tracks and sample sources.

use crate::atoms::{AtomHeader, HdlrAtom, MdhdAtom, MvhdAtom, SampleDescription, StblInfo, TkhdAtom};
use crate::fragment::{FragmentIndex, TrexDefaults};
use crate::source::SampleSource;
use hlspack_core::error::{ContainerError, Error, Result};
use hlspack_core::timescale::TimeScale;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Track media type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackType {
    /// Audio track (`soun` handler).
    Audio,
    /// Video track (`vide` handler).
    Video,
}

/// One media track of an opened container.
#[derive(Debug, Clone)]
pub struct Track {
    /// Track ID from tkhd.
    pub track_id: u32,
    /// Audio or video.
    pub track_type: TrackType,
    /// Media time scale.
    pub timescale: TimeScale,
    /// Duration in media time-scale units (mdhd).
    pub duration: u64,
    /// Video width in pixels.
    pub width: u32,
    /// Video height in pixels.
    pub height: u32,
    /// Sample tables from the moov (empty sample lists for fragmented files).
    pub(crate) stbl: Arc<StblInfo>,
}

impl Track {
    /// Sample descriptions of this track.
    pub fn descriptions(&self) -> &[SampleDescription] {
        &self.stbl.descriptions
    }

    /// The primary (first) sample description.
    pub fn description(&self) -> Option<&SampleDescription> {
        self.stbl.descriptions.first()
    }

    /// Number of samples described by the moov sample tables.
    pub fn sample_count(&self) -> usize {
        self.stbl.sample_count()
    }
}

/// MP4 demuxer.
///
/// Parses the box hierarchy up front: the moov sample tables, and for
/// fragmented files one pass over the moof chain building a sample index.
/// Payload bytes are only read by the sample sources, each over its own
/// file handle.
#[derive(Debug)]
pub struct Mp4Demuxer {
    path: PathBuf,
    movie_timescale: u32,
    tracks: Vec<Track>,
    fragments: Option<FragmentIndex>,
}

impl Mp4Demuxer {
    /// Open and parse a container file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        let mut reader = BufReader::new(file);

        let mut mvhd = None;
        let mut tracks = Vec::new();
        let mut trex: HashMap<u32, TrexDefaults> = HashMap::new();
        let mut fragments: Option<FragmentIndex> = None;

        while let Some(header) = AtomHeader::read(&mut reader)? {
            match &header.atom_type {
                b"moov" => {
                    parse_moov(&mut reader, &header, &mut mvhd, &mut tracks, &mut trex)?;
                }
                b"moof" => {
                    let index = fragments.get_or_insert_with(FragmentIndex::new);
                    index.add_moof(&mut reader, &header, &trex)?;
                }
                _ => {}
            }
            reader.seek(SeekFrom::Start(header.end_offset()))?;
        }

        let Some(mvhd) = mvhd else {
            return Err(ContainerError::NoMovie.into());
        };

        debug!(
            path = %path.display(),
            tracks = tracks.len(),
            fragmented = fragments.is_some(),
            "opened container"
        );

        Ok(Self {
            path,
            movie_timescale: mvhd.timescale,
            tracks,
            fragments,
        })
    }

    /// Path of the container file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Movie time scale (mvhd).
    pub fn movie_timescale(&self) -> u32 {
        self.movie_timescale
    }

    /// All audio/video tracks.
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Look up a track by ID.
    pub fn track(&self, track_id: u32) -> Option<&Track> {
        self.tracks.iter().find(|t| t.track_id == track_id)
    }

    /// True when the file carries movie fragments.
    pub fn is_fragmented(&self) -> bool {
        self.fragments.as_ref().is_some_and(|f| !f.is_empty())
    }

    /// The fragment sample index, if the file is fragmented.
    pub fn fragment_index(&self) -> Option<&FragmentIndex> {
        self.fragments.as_ref()
    }

    /// Create a forward-only sample source for a track.
    ///
    /// Each source owns its own file handle so the audio and video sources
    /// of one container never contend for a seek position.
    pub fn sample_source(&self, track_id: u32) -> Result<SampleSource> {
        let track = self
            .track(track_id)
            .ok_or(Error::Container(ContainerError::TrackNotFound { track_id }))?;
        let file = File::open(&self.path)?;

        if let Some(index) = &self.fragments {
            if let Some(samples) = index.samples(track_id) {
                if !samples.is_empty() {
                    return Ok(SampleSource::new_fragmented(
                        file,
                        track.timescale,
                        samples.to_vec(),
                    ));
                }
            }
        }

        Ok(SampleSource::new_static(
            file,
            track.timescale,
            Arc::clone(&track.stbl),
        ))
    }

    /// Decode timestamps of a track's sync samples, in seconds.
    ///
    /// Derived from the stss table (plain files) or the fragment index,
    /// without consuming the track's sample source. A video track with no
    /// stss table has every sample as a sync sample.
    pub fn sync_sample_times(&self, track_id: u32) -> Vec<f32> {
        let Some(track) = self.track(track_id) else {
            return Vec::new();
        };

        if let Some(index) = &self.fragments {
            let times = index.sync_sample_times(track_id);
            if !times.is_empty() || index.samples(track_id).is_some() {
                return times
                    .iter()
                    .map(|&t| track.timescale.to_seconds_f32(t))
                    .collect();
            }
        }

        let times = if track.stbl.stss.is_empty() {
            track.stbl.all_sample_times()
        } else {
            track.stbl.sync_sample_times()
        };
        times
            .iter()
            .map(|&t| track.timescale.to_seconds_f32(t))
            .collect()
    }
}

fn parse_moov<R: Read + Seek>(
    reader: &mut R,
    moov: &AtomHeader,
    mvhd: &mut Option<MvhdAtom>,
    tracks: &mut Vec<Track>,
    trex: &mut HashMap<u32, TrexDefaults>,
) -> Result<()> {
    let end = moov.end_offset();
    while reader.stream_position()? < end {
        let Some(header) = AtomHeader::read(reader)? else {
            break;
        };
        match &header.atom_type {
            b"mvhd" => {
                let content = header.read_content(reader)?;
                *mvhd = Some(MvhdAtom::parse(&content)?);
            }
            b"trak" => {
                if let Some(track) = parse_trak(reader, &header)? {
                    tracks.push(track);
                }
            }
            b"mvex" => {
                parse_mvex(reader, &header, trex)?;
            }
            _ => {}
        }
        reader.seek(SeekFrom::Start(header.end_offset()))?;
    }
    Ok(())
}

fn parse_mvex<R: Read + Seek>(
    reader: &mut R,
    mvex: &AtomHeader,
    trex: &mut HashMap<u32, TrexDefaults>,
) -> Result<()> {
    let end = mvex.end_offset();
    while reader.stream_position()? < end {
        let Some(header) = AtomHeader::read(reader)? else {
            break;
        };
        if &header.atom_type == b"trex" {
            let content = header.read_content(reader)?;
            let (track_id, defaults) = TrexDefaults::parse(&content)?;
            trex.insert(track_id, defaults);
        }
        reader.seek(SeekFrom::Start(header.end_offset()))?;
    }
    Ok(())
}

fn parse_trak<R: Read + Seek>(reader: &mut R, trak: &AtomHeader) -> Result<Option<Track>> {
    let mut tkhd = None;
    let mut mdhd = None;
    let mut hdlr: Option<HdlrAtom> = None;
    let mut stbl = None;

    let trak_end = trak.end_offset();
    while reader.stream_position()? < trak_end {
        let Some(header) = AtomHeader::read(reader)? else {
            break;
        };
        match &header.atom_type {
            b"tkhd" => {
                let content = header.read_content(reader)?;
                tkhd = Some(TkhdAtom::parse(&content)?);
            }
            b"mdia" => {
                let mdia_end = header.end_offset();
                while reader.stream_position()? < mdia_end {
                    let Some(child) = AtomHeader::read(reader)? else {
                        break;
                    };
                    match &child.atom_type {
                        b"mdhd" => {
                            let content = child.read_content(reader)?;
                            mdhd = Some(MdhdAtom::parse(&content)?);
                        }
                        b"hdlr" => {
                            let content = child.read_content(reader)?;
                            hdlr = Some(HdlrAtom::parse(&content)?);
                        }
                        b"minf" => {
                            let minf_end = child.end_offset();
                            while reader.stream_position()? < minf_end {
                                let Some(grandchild) = AtomHeader::read(reader)? else {
                                    break;
                                };
                                if &grandchild.atom_type == b"stbl" {
                                    stbl = Some(StblInfo::parse(
                                        reader,
                                        grandchild.content_size(),
                                    )?);
                                }
                                reader.seek(SeekFrom::Start(grandchild.end_offset()))?;
                            }
                        }
                        _ => {}
                    }
                    reader.seek(SeekFrom::Start(child.end_offset()))?;
                }
            }
            _ => {}
        }
        reader.seek(SeekFrom::Start(header.end_offset()))?;
    }

    let (Some(tkhd), Some(mdhd), Some(hdlr)) = (tkhd, mdhd, hdlr) else {
        return Ok(None);
    };

    let track_type = if hdlr.is_video() {
        TrackType::Video
    } else if hdlr.is_audio() {
        TrackType::Audio
    } else {
        debug!(
            handler = %String::from_utf8_lossy(&hdlr.handler_type),
            "skipping non-media track"
        );
        return Ok(None);
    };

    Ok(Some(Track {
        track_id: tkhd.track_id,
        track_type,
        timescale: TimeScale::new(mdhd.timescale),
        duration: mdhd.duration,
        width: tkhd.width_pixels(),
        height: tkhd.height_pixels(),
        stbl: Arc::new(stbl.unwrap_or_default()),
    }))
}
