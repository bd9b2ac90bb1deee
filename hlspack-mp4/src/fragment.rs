//! Fragmented MP4 (`moof`) sample indexing.
//!
//! Fragmented files carry their sample tables in movie fragments instead of
//! the `moov` sample tables. The index below is built in one pass over the
//! `moof` chain at open time; it holds per-track sample metadata (never
//! payloads) so both the linear sample source and the keyframe index can
//! consult it.

use crate::atoms::AtomHeader;
use crate::{read_u32_be, read_u64_be};
use hlspack_core::error::{Error, Result};
use std::collections::HashMap;
use std::io::{Read, Seek};

/// Sample flag bit: sample_is_non_sync_sample.
const FLAG_NON_SYNC: u32 = 0x0001_0000;

/// Per-track defaults from the `trex` atom.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct TrexDefaults {
    pub description_index: u32,
    pub duration: u32,
    pub size: u32,
    pub flags: u32,
}

impl TrexDefaults {
    /// Parse a trex atom content, returning (track_id, defaults).
    pub(crate) fn parse(data: &[u8]) -> Result<(u32, Self)> {
        if data.len() < 24 {
            return Err(Error::Container("trex too short".into()));
        }
        let track_id = read_u32_be(&data[4..8])?;
        Ok((
            track_id,
            Self {
                description_index: read_u32_be(&data[8..12])?,
                duration: read_u32_be(&data[12..16])?,
                size: read_u32_be(&data[16..20])?,
                flags: read_u32_be(&data[20..24])?,
            },
        ))
    }
}

/// Metadata for one sample described by a track run.
#[derive(Debug, Clone, Copy)]
pub struct FragmentSample {
    /// Absolute file offset of the payload.
    pub offset: u64,
    /// Payload size in bytes.
    pub size: u32,
    /// Decode timestamp in media timescale units.
    pub dts: u64,
    /// Composition offset (cts - dts) in media timescale units.
    pub cts_offset: i32,
    /// Duration in media timescale units.
    pub duration: u32,
    /// True iff this is a sync sample.
    pub sync: bool,
    /// 1-based sample description index.
    pub description_index: u32,
}

/// Flat per-track sample index over all movie fragments, in moof order.
#[derive(Debug, Default)]
pub struct FragmentIndex {
    tracks: HashMap<u32, Vec<FragmentSample>>,
    next_dts: HashMap<u32, u64>,
}

impl FragmentIndex {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// True when no fragment contributed any samples.
    pub fn is_empty(&self) -> bool {
        self.tracks.values().all(|v| v.is_empty())
    }

    /// Samples of one track, in delivery (moof) order.
    pub fn samples(&self, track_id: u32) -> Option<&[FragmentSample]> {
        self.tracks.get(&track_id).map(|v| v.as_slice())
    }

    /// Decode timestamps of the track's sync samples, in timescale units.
    pub fn sync_sample_times(&self, track_id: u32) -> Vec<u64> {
        self.tracks
            .get(&track_id)
            .map(|samples| {
                samples
                    .iter()
                    .filter(|s| s.sync)
                    .map(|s| s.dts)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Parse one `moof` atom and append its runs to the index.
    pub(crate) fn add_moof<R: Read + Seek + ?Sized>(
        &mut self,
        reader: &mut R,
        header: &AtomHeader,
        trex: &HashMap<u32, TrexDefaults>,
    ) -> Result<()> {
        let content = header.read_content(reader)?;
        let moof_offset = header.offset;

        // Running data position for trafs without an explicit base offset.
        let mut data_position = moof_offset;

        let mut offset = 0usize;
        while offset + 8 <= content.len() {
            let size = read_u32_be(&content[offset..offset + 4])? as usize;
            if size < 8 || offset + size > content.len() {
                return Err(Error::Container("moof child box overruns moof".into()));
            }
            let fourcc = &content[offset + 4..offset + 8];
            if fourcc == b"traf" {
                data_position = self.parse_traf(
                    &content[offset + 8..offset + size],
                    moof_offset,
                    data_position,
                    trex,
                )?;
            }
            offset += size;
        }

        Ok(())
    }

    /// Parse one traf. Returns the data position after this traf's runs.
    fn parse_traf(
        &mut self,
        data: &[u8],
        moof_offset: u64,
        data_position: u64,
        trex: &HashMap<u32, TrexDefaults>,
    ) -> Result<u64> {
        let mut tfhd = None;
        let mut tfdt = None;
        let mut truns = Vec::new();

        let mut offset = 0usize;
        while offset + 8 <= data.len() {
            let size = read_u32_be(&data[offset..offset + 4])? as usize;
            if size < 8 || offset + size > data.len() {
                return Err(Error::Container("traf child box overruns traf".into()));
            }
            let body = &data[offset + 8..offset + size];
            match &data[offset + 4..offset + 8] {
                b"tfhd" => tfhd = Some(Tfhd::parse(body)?),
                b"tfdt" => tfdt = Some(parse_tfdt(body)?),
                b"trun" => truns.push(Trun::parse(body)?),
                _ => {}
            }
            offset += size;
        }

        let Some(tfhd) = tfhd else {
            return Err(Error::Container("traf without tfhd".into()));
        };

        let defaults = trex.get(&tfhd.track_id).copied().unwrap_or_default();
        let samples = self.tracks.entry(tfhd.track_id).or_default();

        let mut dts = match tfdt {
            Some(t) => t,
            None => *self.next_dts.get(&tfhd.track_id).unwrap_or(&0),
        };

        let base = tfhd
            .base_data_offset
            .unwrap_or(if tfhd.default_base_is_moof {
                moof_offset
            } else {
                data_position
            });
        let mut position = base;

        let description_index = tfhd
            .description_index
            .or(nonzero(defaults.description_index))
            .unwrap_or(1);
        let default_duration = tfhd.default_duration.or(nonzero(defaults.duration));
        let default_size = tfhd.default_size.or(nonzero(defaults.size));
        let default_flags = tfhd.default_flags.unwrap_or(defaults.flags);

        for trun in &truns {
            if let Some(data_offset) = trun.data_offset {
                position = base.wrapping_add_signed(data_offset as i64);
            }

            for (i, entry) in trun.entries.iter().enumerate() {
                let duration = entry
                    .duration
                    .or(default_duration)
                    .ok_or_else(|| Error::Container("trun sample without duration".into()))?;
                let size = entry
                    .size
                    .or(default_size)
                    .ok_or_else(|| Error::Container("trun sample without size".into()))?;
                let flags = if i == 0 {
                    trun.first_sample_flags
                        .or(entry.flags)
                        .unwrap_or(default_flags)
                } else {
                    entry.flags.unwrap_or(default_flags)
                };

                samples.push(FragmentSample {
                    offset: position,
                    size,
                    dts,
                    cts_offset: entry.cts_offset,
                    duration,
                    sync: flags & FLAG_NON_SYNC == 0,
                    description_index,
                });

                position += size as u64;
                dts += duration as u64;
            }
        }

        self.next_dts.insert(tfhd.track_id, dts);
        Ok(position)
    }
}

fn nonzero(value: u32) -> Option<u32> {
    (value != 0).then_some(value)
}

fn take_u32(data: &[u8], offset: &mut usize) -> Result<u32> {
    if *offset + 4 > data.len() {
        return Err(Error::Container("fragment box field truncated".into()));
    }
    let value = read_u32_be(&data[*offset..*offset + 4])?;
    *offset += 4;
    Ok(value)
}

/// Track fragment header.
#[derive(Debug)]
struct Tfhd {
    track_id: u32,
    base_data_offset: Option<u64>,
    description_index: Option<u32>,
    default_duration: Option<u32>,
    default_size: Option<u32>,
    default_flags: Option<u32>,
    default_base_is_moof: bool,
}

impl Tfhd {
    fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < 8 {
            return Err(Error::Container("tfhd too short".into()));
        }
        let flags = read_u32_be(&data[0..4])? & 0x00FF_FFFF;
        let track_id = read_u32_be(&data[4..8])?;

        let mut offset = 8usize;

        let base_data_offset = if flags & 0x000001 != 0 {
            if offset + 8 > data.len() {
                return Err(Error::Container("tfhd base data offset truncated".into()));
            }
            let v = read_u64_be(&data[offset..offset + 8])?;
            offset += 8;
            Some(v)
        } else {
            None
        };

        let description_index = (flags & 0x000002 != 0)
            .then(|| take_u32(data, &mut offset))
            .transpose()?;
        let default_duration = (flags & 0x000008 != 0)
            .then(|| take_u32(data, &mut offset))
            .transpose()?;
        let default_size = (flags & 0x000010 != 0)
            .then(|| take_u32(data, &mut offset))
            .transpose()?;
        let default_flags = (flags & 0x000020 != 0)
            .then(|| take_u32(data, &mut offset))
            .transpose()?;

        Ok(Self {
            track_id,
            base_data_offset,
            description_index,
            default_duration,
            default_size,
            default_flags,
            default_base_is_moof: flags & 0x020000 != 0,
        })
    }
}

/// Parse a tfdt atom content into the base media decode time.
fn parse_tfdt(data: &[u8]) -> Result<u64> {
    if data.len() < 8 {
        return Err(Error::Container("tfdt too short".into()));
    }
    let version = data[0];
    if version == 1 {
        if data.len() < 12 {
            return Err(Error::Container("tfdt v1 too short".into()));
        }
        read_u64_be(&data[4..12])
    } else {
        Ok(read_u32_be(&data[4..8])? as u64)
    }
}

/// One trun entry, fields present per the run's flags.
#[derive(Debug, Clone, Copy, Default)]
struct TrunEntry {
    duration: Option<u32>,
    size: Option<u32>,
    flags: Option<u32>,
    cts_offset: i32,
}

/// Track run.
#[derive(Debug)]
struct Trun {
    data_offset: Option<i32>,
    first_sample_flags: Option<u32>,
    entries: Vec<TrunEntry>,
}

impl Trun {
    fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < 8 {
            return Err(Error::Container("trun too short".into()));
        }
        let version_flags = read_u32_be(&data[0..4])?;
        let flags = version_flags & 0x00FF_FFFF;
        let sample_count = read_u32_be(&data[4..8])? as usize;

        let mut offset = 8usize;

        let data_offset = (flags & 0x000001 != 0)
            .then(|| take_u32(data, &mut offset))
            .transpose()?
            .map(|v| v as i32);
        let first_sample_flags = (flags & 0x000004 != 0)
            .then(|| take_u32(data, &mut offset))
            .transpose()?;

        let mut entries = Vec::with_capacity(sample_count.min(4096));
        for _ in 0..sample_count {
            let mut entry = TrunEntry::default();
            if flags & 0x000100 != 0 {
                entry.duration = Some(take_u32(data, &mut offset)?);
            }
            if flags & 0x000200 != 0 {
                entry.size = Some(take_u32(data, &mut offset)?);
            }
            if flags & 0x000400 != 0 {
                entry.flags = Some(take_u32(data, &mut offset)?);
            }
            if flags & 0x000800 != 0 {
                entry.cts_offset = take_u32(data, &mut offset)? as i32;
            }
            entries.push(entry);
        }

        Ok(Self {
            data_offset,
            first_sample_flags,
            entries,
        })
    }
}
