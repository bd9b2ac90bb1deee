//! ISO-BMFF (MOV/MP4) reading for HLS packaging.
//!
//! Supports plain (`moov` sample tables) and fragmented (`moof` runs) files
//! with H.264/H.265 video and AAC/AC-3/E-AC-3 audio, exposing tracks, sample
//! descriptions and a forward-only sample source per track.

mod atoms;
mod demuxer;
mod fragment;
mod source;

pub use atoms::{DecoderConfig, SampleDescription, StblInfo};
pub use demuxer::{Mp4Demuxer, Track, TrackType};
pub use fragment::{FragmentIndex, FragmentSample};
pub use source::SampleSource;

use hlspack_core::error::{Error, Result};

/// Read a 32-bit big-endian integer.
pub(crate) fn read_u32_be(data: &[u8]) -> Result<u32> {
    if data.len() < 4 {
        return Err(Error::Container("Not enough data for u32".into()));
    }
    Ok(u32::from_be_bytes([data[0], data[1], data[2], data[3]]))
}

/// Read a 64-bit big-endian integer.
pub(crate) fn read_u64_be(data: &[u8]) -> Result<u64> {
    if data.len() < 8 {
        return Err(Error::Container("Not enough data for u64".into()));
    }
    Ok(u64::from_be_bytes([
        data[0], data[1], data[2], data[3], data[4], data[5], data[6], data[7],
    ]))
}
