//! MP4 atom (box) parsing.

use crate::{read_u32_be, read_u64_be};
use hlspack_core::codec::{AacConfig, AvcConfig, CodecId, HevcConfig};
use hlspack_core::error::{Error, Result};
use std::io::{Read, Seek, SeekFrom};

/// Maximum size for atom content allocation (100 MB).
/// Prevents denial of service from malformed files with huge atom sizes.
const MAX_ATOM_CONTENT_SIZE: u64 = 100 * 1024 * 1024;

/// Validate that an allocation size is within acceptable limits.
pub(crate) fn validate_allocation_size(size: u64) -> Result<usize> {
    if size > MAX_ATOM_CONTENT_SIZE {
        return Err(Error::Container(
            format!(
                "Atom content size {} exceeds maximum allowed size {}",
                size, MAX_ATOM_CONTENT_SIZE
            )
            .into(),
        ));
    }
    Ok(size as usize)
}

/// Atom header.
#[derive(Debug, Clone)]
pub struct AtomHeader {
    /// Atom type (4 bytes).
    pub atom_type: [u8; 4],
    /// Atom size (including header).
    pub size: u64,
    /// Header size (8 or 16 bytes).
    pub header_size: u8,
    /// Offset in file.
    pub offset: u64,
}

impl AtomHeader {
    /// Read an atom header from the reader. Returns `None` at end of file.
    pub fn read<R: Read + Seek + ?Sized>(reader: &mut R) -> Result<Option<Self>> {
        let offset = reader.stream_position()?;

        let mut header = [0u8; 8];
        match reader.read_exact(&mut header) {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        }

        let size = u32::from_be_bytes([header[0], header[1], header[2], header[3]]);
        let atom_type = [header[4], header[5], header[6], header[7]];

        let (size, header_size) = if size == 1 {
            // Extended size
            let mut ext_size = [0u8; 8];
            reader.read_exact(&mut ext_size)?;
            (u64::from_be_bytes(ext_size), 16)
        } else if size == 0 {
            // Size extends to end of file
            let current = reader.stream_position()?;
            let end = reader.seek(SeekFrom::End(0))?;
            reader.seek(SeekFrom::Start(current))?;
            (end - offset, 8)
        } else {
            (size as u64, 8)
        };

        if size < header_size as u64 {
            return Err(Error::Container(
                format!("Atom size {} smaller than its header at offset {}", size, offset).into(),
            ));
        }

        Ok(Some(Self {
            atom_type,
            size,
            header_size,
            offset,
        }))
    }

    /// Get content size (size - header).
    pub fn content_size(&self) -> u64 {
        self.size.saturating_sub(self.header_size as u64)
    }

    /// Get the file offset just past this atom.
    pub fn end_offset(&self) -> u64 {
        self.offset + self.size
    }

    /// Read this atom's content into a buffer.
    pub fn read_content<R: Read + Seek + ?Sized>(&self, reader: &mut R) -> Result<Vec<u8>> {
        let size = validate_allocation_size(self.content_size())?;
        let mut content = vec![0u8; size];
        reader.read_exact(&mut content)?;
        Ok(content)
    }
}

/// Movie header atom (mvhd).
#[derive(Debug, Clone)]
pub struct MvhdAtom {
    /// Timescale (units per second).
    pub timescale: u32,
    /// Duration in movie timescale units.
    pub duration: u64,
}

impl MvhdAtom {
    /// Parse mvhd atom content.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.is_empty() {
            return Err(Error::Container("mvhd atom empty".into()));
        }

        let version = data[0];
        let (timescale, duration) = if version == 1 {
            if data.len() < 32 {
                return Err(Error::Container("mvhd v1 atom too short".into()));
            }
            (read_u32_be(&data[20..24])?, read_u64_be(&data[24..32])?)
        } else {
            if data.len() < 20 {
                return Err(Error::Container("mvhd v0 atom too short".into()));
            }
            (read_u32_be(&data[12..16])?, read_u32_be(&data[16..20])? as u64)
        };

        Ok(Self { timescale, duration })
    }
}

/// Track header atom (tkhd).
#[derive(Debug, Clone)]
pub struct TkhdAtom {
    /// Track ID.
    pub track_id: u32,
    /// Width (fixed-point 16.16).
    pub width: u32,
    /// Height (fixed-point 16.16).
    pub height: u32,
}

impl TkhdAtom {
    /// Parse tkhd atom content.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.is_empty() {
            return Err(Error::Container("tkhd atom empty".into()));
        }

        let version = data[0];
        let (track_id, offset) = if version == 1 {
            if data.len() < 36 {
                return Err(Error::Container("tkhd v1 atom too short".into()));
            }
            (read_u32_be(&data[20..24])?, 36)
        } else {
            if data.len() < 24 {
                return Err(Error::Container("tkhd v0 atom too short".into()));
            }
            (read_u32_be(&data[12..16])?, 24)
        };

        // Skip to width/height past reserved fields and the matrix.
        let dim_offset = offset + 52;
        let (width, height) = if data.len() >= dim_offset + 8 {
            (
                read_u32_be(&data[dim_offset..dim_offset + 4])?,
                read_u32_be(&data[dim_offset + 4..dim_offset + 8])?,
            )
        } else {
            (0, 0)
        };

        Ok(Self {
            track_id,
            width,
            height,
        })
    }

    /// Get width in pixels.
    pub fn width_pixels(&self) -> u32 {
        self.width >> 16
    }

    /// Get height in pixels.
    pub fn height_pixels(&self) -> u32 {
        self.height >> 16
    }
}

/// Media header atom (mdhd).
#[derive(Debug, Clone)]
pub struct MdhdAtom {
    /// Media timescale.
    pub timescale: u32,
    /// Duration in media timescale units.
    pub duration: u64,
}

impl MdhdAtom {
    /// Parse mdhd atom content.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.is_empty() {
            return Err(Error::Container("mdhd atom empty".into()));
        }

        let version = data[0];
        let (timescale, duration) = if version == 1 {
            if data.len() < 32 {
                return Err(Error::Container("mdhd v1 atom too short".into()));
            }
            (read_u32_be(&data[20..24])?, read_u64_be(&data[24..32])?)
        } else {
            if data.len() < 20 {
                return Err(Error::Container("mdhd v0 atom too short".into()));
            }
            (read_u32_be(&data[12..16])?, read_u32_be(&data[16..20])? as u64)
        };

        Ok(Self { timescale, duration })
    }
}

/// Handler reference atom (hdlr).
#[derive(Debug, Clone)]
pub struct HdlrAtom {
    /// Handler type.
    pub handler_type: [u8; 4],
}

impl HdlrAtom {
    /// Parse hdlr atom content.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < 12 {
            return Err(Error::Container("hdlr atom too short".into()));
        }

        let handler_type = [data[8], data[9], data[10], data[11]];
        Ok(Self { handler_type })
    }

    /// Check if this is a video handler.
    pub fn is_video(&self) -> bool {
        &self.handler_type == b"vide"
    }

    /// Check if this is an audio handler.
    pub fn is_audio(&self) -> bool {
        &self.handler_type == b"soun"
    }
}

/// Parsed decoder configuration carried by a sample description.
#[derive(Debug, Clone)]
pub enum DecoderConfig {
    /// avcC record for H.264.
    Avc(AvcConfig),
    /// hvcC record for H.265.
    Hevc(HevcConfig),
    /// AudioSpecificConfig for AAC.
    Aac(AacConfig),
    /// No configuration needed (AC-3 / E-AC-3 passthrough, unknown codecs).
    None,
}

/// Sample description (`stsd` entry).
#[derive(Debug, Clone)]
pub struct SampleDescription {
    /// Entry fourcc.
    pub fourcc: [u8; 4],
    /// Resolved codec, `None` when the fourcc is not supported.
    pub codec: Option<CodecId>,
    /// Video width in pixels.
    pub width: u16,
    /// Video height in pixels.
    pub height: u16,
    /// Audio sample rate in Hz.
    pub sample_rate: u32,
    /// Audio channel count.
    pub channel_count: u16,
    /// Decoder configuration record.
    pub config: DecoderConfig,
}

impl SampleDescription {
    /// RFC 6381 codec tag for this description.
    pub fn codec_string(&self) -> Option<String> {
        match (&self.config, self.codec) {
            (DecoderConfig::Avc(c), _) => Some(c.codec_string()),
            (DecoderConfig::Hevc(c), _) => Some(c.codec_string()),
            (DecoderConfig::Aac(c), _) => Some(c.codec_string()),
            (DecoderConfig::None, Some(CodecId::Ac3)) => Some("ac-3".to_string()),
            (DecoderConfig::None, Some(CodecId::Eac3)) => Some("ec-3".to_string()),
            _ => None,
        }
    }

    /// Printable fourcc for diagnostics.
    pub fn fourcc_str(&self) -> String {
        String::from_utf8_lossy(&self.fourcc).into_owned()
    }
}

/// Sample table box (stbl) contents.
#[derive(Debug, Clone, Default)]
pub struct StblInfo {
    /// Sample descriptions.
    pub descriptions: Vec<SampleDescription>,
    /// Sample sizes.
    pub sample_sizes: Vec<u32>,
    /// Sample to chunk mapping: (first_chunk, samples_per_chunk, description_index).
    pub stsc: Vec<(u32, u32, u32)>,
    /// Chunk offsets.
    pub chunk_offsets: Vec<u64>,
    /// Time to sample mapping: (sample_count, sample_delta).
    pub stts: Vec<(u32, u32)>,
    /// Composition time offsets: (sample_count, offset).
    pub ctts: Vec<(u32, i32)>,
    /// Sync samples (1-based sample numbers). Empty means every sample syncs.
    pub stss: Vec<u32>,
}

impl StblInfo {
    /// Parse stbl contents.
    pub fn parse<R: Read + Seek + ?Sized>(reader: &mut R, stbl_size: u64) -> Result<Self> {
        let start = reader.stream_position()?;
        let end = start + stbl_size;
        let mut info = StblInfo::default();

        while reader.stream_position()? < end {
            let Some(header) = AtomHeader::read(reader)? else {
                break;
            };
            let content = header.read_content(reader)?;

            match &header.atom_type {
                b"stsd" => info.descriptions = Self::parse_stsd(&content)?,
                b"stsz" | b"stz2" => info.sample_sizes = Self::parse_stsz(&content)?,
                b"stsc" => info.stsc = Self::parse_stsc(&content)?,
                b"stco" => info.chunk_offsets = Self::parse_stco(&content)?,
                b"co64" => info.chunk_offsets = Self::parse_co64(&content)?,
                b"stts" => info.stts = Self::parse_stts(&content)?,
                b"ctts" => info.ctts = Self::parse_ctts(&content)?,
                b"stss" => info.stss = Self::parse_stss(&content)?,
                _ => {}
            }
        }

        Ok(info)
    }

    /// Number of samples in the table.
    pub fn sample_count(&self) -> usize {
        self.sample_sizes.len()
    }

    /// Total track duration in media timescale units.
    pub fn total_duration(&self) -> u64 {
        self.stts
            .iter()
            .map(|&(count, delta)| count as u64 * delta as u64)
            .sum()
    }

    /// Decode timestamps of every sample, in media timescale units.
    ///
    /// Used for keyframe indexing when a video track has no stss table
    /// (every sample is then a sync sample).
    pub fn all_sample_times(&self) -> Vec<u64> {
        let mut times = Vec::with_capacity(self.sample_count());
        let mut dts = 0u64;
        for &(count, delta) in &self.stts {
            for _ in 0..count {
                times.push(dts);
                dts += delta as u64;
            }
        }
        times
    }

    /// Decode timestamps of all sync samples, in media timescale units.
    pub fn sync_sample_times(&self) -> Vec<u64> {
        if self.stss.is_empty() {
            return Vec::new();
        }

        // Walk stss and stts together; both are ordered by sample number.
        let mut times = Vec::with_capacity(self.stss.len());
        let mut stts_iter = self.stts.iter();
        let mut entry = stts_iter.next().copied();
        let mut entry_start = 0u64; // first sample index of current entry
        let mut entry_dts = 0u64; // dts of that sample

        for &sample_number in &self.stss {
            let target = sample_number.saturating_sub(1) as u64;
            while let Some((count, delta)) = entry {
                if target < entry_start + count as u64 {
                    times.push(entry_dts + (target - entry_start) * delta as u64);
                    break;
                }
                entry_dts += count as u64 * delta as u64;
                entry_start += count as u64;
                entry = stts_iter.next().copied();
            }
        }

        times
    }

    fn parse_stsd(data: &[u8]) -> Result<Vec<SampleDescription>> {
        if data.len() < 8 {
            return Err(Error::Container("stsd too short".into()));
        }

        let entry_count = read_u32_be(&data[4..8])?;
        let mut entries = Vec::with_capacity(entry_count as usize);
        let mut offset = 8;

        for _ in 0..entry_count {
            if offset + 8 > data.len() {
                break;
            }

            let entry_size = read_u32_be(&data[offset..offset + 4])? as usize;
            let fourcc = [
                data[offset + 4],
                data[offset + 5],
                data[offset + 6],
                data[offset + 7],
            ];

            if entry_size < 8 || offset + entry_size > data.len() {
                break;
            }

            let entry_data = &data[offset..offset + entry_size];
            let codec = CodecId::from_fourcc(&fourcc);

            let entry = match codec {
                Some(c) if c.is_video() => Self::parse_video_entry(fourcc, c, entry_data)?,
                Some(c) => Self::parse_audio_entry(fourcc, c, entry_data)?,
                None => SampleDescription {
                    fourcc,
                    codec: None,
                    width: 0,
                    height: 0,
                    sample_rate: 0,
                    channel_count: 0,
                    config: DecoderConfig::None,
                },
            };

            entries.push(entry);
            offset += entry_size;
        }

        Ok(entries)
    }

    fn parse_video_entry(
        fourcc: [u8; 4],
        codec: CodecId,
        data: &[u8],
    ) -> Result<SampleDescription> {
        // Fixed VisualSampleEntry part is 86 bytes including the box header.
        if data.len() < 86 {
            return Err(Error::Container("Video sample entry too short".into()));
        }

        let width = u16::from_be_bytes([data[32], data[33]]);
        let height = u16::from_be_bytes([data[34], data[35]]);

        // Child boxes (avcC, hvcC, ...) follow the fixed visual header.
        let config = match codec {
            CodecId::H264 => find_child_box(&data[86..], b"avcC")?
                .map(AvcConfig::parse)
                .transpose()?
                .map(DecoderConfig::Avc),
            CodecId::H265 => find_child_box(&data[86..], b"hvcC")?
                .map(HevcConfig::parse)
                .transpose()?
                .map(DecoderConfig::Hevc),
            _ => None,
        }
        .unwrap_or(DecoderConfig::None);

        Ok(SampleDescription {
            fourcc,
            codec: Some(codec),
            width,
            height,
            sample_rate: 0,
            channel_count: 0,
            config,
        })
    }

    fn parse_audio_entry(
        fourcc: [u8; 4],
        codec: CodecId,
        data: &[u8],
    ) -> Result<SampleDescription> {
        if data.len() < 36 {
            return Err(Error::Container("Audio sample entry too short".into()));
        }

        let channel_count = u16::from_be_bytes([data[24], data[25]]);
        // Sample rate is fixed-point 16.16.
        let sample_rate = read_u32_be(&data[32..36])? >> 16;

        let config = match codec {
            CodecId::Aac => find_child_box(&data[36..], b"esds")?
                .map(parse_esds)
                .transpose()?
                .flatten()
                .map(DecoderConfig::Aac),
            _ => None,
        }
        .unwrap_or(DecoderConfig::None);

        Ok(SampleDescription {
            fourcc,
            codec: Some(codec),
            width: 0,
            height: 0,
            sample_rate,
            channel_count,
            config,
        })
    }

    fn parse_stsz(data: &[u8]) -> Result<Vec<u32>> {
        if data.len() < 12 {
            return Err(Error::Container("stsz too short".into()));
        }

        let sample_size = read_u32_be(&data[4..8])?;
        let sample_count = read_u32_be(&data[8..12])? as usize;

        if sample_size != 0 {
            // Constant sample size
            Ok(vec![sample_size; sample_count])
        } else {
            let mut sizes = Vec::with_capacity(sample_count);
            let mut offset = 12;
            for _ in 0..sample_count {
                if offset + 4 > data.len() {
                    break;
                }
                sizes.push(read_u32_be(&data[offset..offset + 4])?);
                offset += 4;
            }
            Ok(sizes)
        }
    }

    fn parse_stsc(data: &[u8]) -> Result<Vec<(u32, u32, u32)>> {
        if data.len() < 8 {
            return Err(Error::Container("stsc too short".into()));
        }

        let entry_count = read_u32_be(&data[4..8])? as usize;
        let mut entries = Vec::with_capacity(entry_count);
        let mut offset = 8;
        for _ in 0..entry_count {
            if offset + 12 > data.len() {
                break;
            }
            let first_chunk = read_u32_be(&data[offset..offset + 4])?;
            let samples_per_chunk = read_u32_be(&data[offset + 4..offset + 8])?;
            let description_index = read_u32_be(&data[offset + 8..offset + 12])?;
            entries.push((first_chunk, samples_per_chunk, description_index));
            offset += 12;
        }
        Ok(entries)
    }

    fn parse_stco(data: &[u8]) -> Result<Vec<u64>> {
        if data.len() < 8 {
            return Err(Error::Container("stco too short".into()));
        }

        let entry_count = read_u32_be(&data[4..8])? as usize;
        let mut offsets = Vec::with_capacity(entry_count);
        let mut offset = 8;
        for _ in 0..entry_count {
            if offset + 4 > data.len() {
                break;
            }
            offsets.push(read_u32_be(&data[offset..offset + 4])? as u64);
            offset += 4;
        }
        Ok(offsets)
    }

    fn parse_co64(data: &[u8]) -> Result<Vec<u64>> {
        if data.len() < 8 {
            return Err(Error::Container("co64 too short".into()));
        }

        let entry_count = read_u32_be(&data[4..8])? as usize;
        let mut offsets = Vec::with_capacity(entry_count);
        let mut offset = 8;
        for _ in 0..entry_count {
            if offset + 8 > data.len() {
                break;
            }
            offsets.push(read_u64_be(&data[offset..offset + 8])?);
            offset += 8;
        }
        Ok(offsets)
    }

    fn parse_stts(data: &[u8]) -> Result<Vec<(u32, u32)>> {
        if data.len() < 8 {
            return Err(Error::Container("stts too short".into()));
        }

        let entry_count = read_u32_be(&data[4..8])? as usize;
        let mut entries = Vec::with_capacity(entry_count);
        let mut offset = 8;
        for _ in 0..entry_count {
            if offset + 8 > data.len() {
                break;
            }
            let sample_count = read_u32_be(&data[offset..offset + 4])?;
            let sample_delta = read_u32_be(&data[offset + 4..offset + 8])?;
            entries.push((sample_count, sample_delta));
            offset += 8;
        }
        Ok(entries)
    }

    fn parse_ctts(data: &[u8]) -> Result<Vec<(u32, i32)>> {
        if data.len() < 8 {
            return Err(Error::Container("ctts too short".into()));
        }

        let entry_count = read_u32_be(&data[4..8])? as usize;
        let mut entries = Vec::with_capacity(entry_count);
        let mut offset = 8;
        for _ in 0..entry_count {
            if offset + 8 > data.len() {
                break;
            }
            let sample_count = read_u32_be(&data[offset..offset + 4])?;
            let sample_offset = read_u32_be(&data[offset + 4..offset + 8])? as i32;
            entries.push((sample_count, sample_offset));
            offset += 8;
        }
        Ok(entries)
    }

    fn parse_stss(data: &[u8]) -> Result<Vec<u32>> {
        if data.len() < 8 {
            return Err(Error::Container("stss too short".into()));
        }

        let entry_count = read_u32_be(&data[4..8])? as usize;
        let mut entries = Vec::with_capacity(entry_count);
        let mut offset = 8;
        for _ in 0..entry_count {
            if offset + 4 > data.len() {
                break;
            }
            entries.push(read_u32_be(&data[offset..offset + 4])?);
            offset += 4;
        }
        Ok(entries)
    }
}

/// Locate a child box by fourcc within a sample entry's trailing bytes.
fn find_child_box<'a>(data: &'a [u8], fourcc: &[u8; 4]) -> Result<Option<&'a [u8]>> {
    let mut offset = 0;
    while offset + 8 <= data.len() {
        let size = read_u32_be(&data[offset..offset + 4])? as usize;
        if size < 8 || offset + size > data.len() {
            return Ok(None);
        }
        if &data[offset + 4..offset + 8] == fourcc {
            return Ok(Some(&data[offset + 8..offset + size]));
        }
        offset += size;
    }
    Ok(None)
}

/// Parse an esds box down to the AudioSpecificConfig.
///
/// The descriptor chain is ES_Descriptor (0x03) → DecoderConfigDescriptor
/// (0x04) → DecoderSpecificInfo (0x05).
fn parse_esds(data: &[u8]) -> Result<Option<AacConfig>> {
    // 4 bytes version/flags, then descriptors.
    if data.len() < 4 {
        return Ok(None);
    }
    let mut cursor = &data[4..];

    let Some(es) = read_descriptor(&mut cursor, 0x03)? else {
        return Ok(None);
    };
    // ES_ID (2 bytes) + stream flags byte; optional fields per flag bits.
    if es.len() < 3 {
        return Ok(None);
    }
    let flags = es[2];
    let mut offset = 3;
    if flags & 0x80 != 0 {
        offset += 2; // streamDependenceFlag: dependsOn_ES_ID
    }
    if flags & 0x40 != 0 {
        // URL_Flag: length-prefixed URL string
        if offset >= es.len() {
            return Ok(None);
        }
        offset += 1 + es[offset] as usize;
    }
    if flags & 0x20 != 0 {
        offset += 2; // OCRstreamFlag: OCR_ES_ID
    }
    if offset > es.len() {
        return Ok(None);
    }

    let mut inner = &es[offset..];
    let Some(dcd) = read_descriptor(&mut inner, 0x04)? else {
        return Ok(None);
    };
    // objectTypeIndication + streamType/bufferSize (4) + maxBitrate (4)
    // + avgBitrate (4), then nested descriptors.
    if dcd.len() < 13 {
        return Ok(None);
    }
    let mut dsi_cursor = &dcd[13..];
    let Some(asc) = read_descriptor(&mut dsi_cursor, 0x05)? else {
        return Ok(None);
    };

    Ok(Some(AacConfig::parse(asc)?))
}

/// Read one MPEG-4 descriptor with the expected tag, skipping others.
fn read_descriptor<'a>(cursor: &mut &'a [u8], want_tag: u8) -> Result<Option<&'a [u8]>> {
    while cursor.len() >= 2 {
        let tag = cursor[0];
        let mut size = 0usize;
        let mut offset = 1;
        // Expandable size: 7 bits per byte, high bit is a continuation flag.
        loop {
            if offset >= cursor.len() || offset > 4 {
                return Ok(None);
            }
            let byte = cursor[offset];
            size = (size << 7) | (byte & 0x7F) as usize;
            offset += 1;
            if byte & 0x80 == 0 {
                break;
            }
        }
        if offset + size > cursor.len() {
            return Ok(None);
        }
        let body = &cursor[offset..offset + size];
        *cursor = &cursor[offset + size..];
        if tag == want_tag {
            return Ok(Some(body));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atom_header_read() {
        let mut data = Vec::new();
        data.extend_from_slice(&16u32.to_be_bytes());
        data.extend_from_slice(b"ftyp");
        data.extend_from_slice(b"isom");
        data.extend_from_slice(&0u32.to_be_bytes());

        let mut cursor = std::io::Cursor::new(data);
        let header = AtomHeader::read(&mut cursor).unwrap().unwrap();
        assert_eq!(&header.atom_type, b"ftyp");
        assert_eq!(header.size, 16);
        assert_eq!(header.content_size(), 8);
    }

    #[test]
    fn test_atom_header_eof() {
        let mut cursor = std::io::Cursor::new(Vec::<u8>::new());
        assert!(AtomHeader::read(&mut cursor).unwrap().is_none());
    }

    #[test]
    fn test_mvhd_parse_v0() {
        let mut data = vec![0u8; 100];
        data[12..16].copy_from_slice(&90_000u32.to_be_bytes());
        data[16..20].copy_from_slice(&900_000u32.to_be_bytes());
        let mvhd = MvhdAtom::parse(&data).unwrap();
        assert_eq!(mvhd.timescale, 90_000);
        assert_eq!(mvhd.duration, 900_000);
    }

    #[test]
    fn test_stts_sync_sample_times() {
        let stbl = StblInfo {
            stts: vec![(4, 3000), (4, 6000)],
            stss: vec![1, 3, 6],
            ..Default::default()
        };
        // Sample dts: 0, 3000, 6000, 9000, 12000, 18000, 24000, 30000
        assert_eq!(stbl.sync_sample_times(), vec![0, 6000, 18000]);
    }

    #[test]
    fn test_sync_sample_times_empty_stss() {
        let stbl = StblInfo {
            stts: vec![(4, 3000)],
            ..Default::default()
        };
        assert!(stbl.sync_sample_times().is_empty());
    }

    #[test]
    fn test_find_child_box() {
        let mut data = Vec::new();
        data.extend_from_slice(&12u32.to_be_bytes());
        data.extend_from_slice(b"colr");
        data.extend_from_slice(&[0, 0, 0, 0]);
        data.extend_from_slice(&10u32.to_be_bytes());
        data.extend_from_slice(b"avcC");
        data.extend_from_slice(&[0xAB, 0xCD]);

        let found = find_child_box(&data, b"avcC").unwrap().unwrap();
        assert_eq!(found, &[0xAB, 0xCD]);
        assert!(find_child_box(&data, b"hvcC").unwrap().is_none());
    }

    #[test]
    fn test_parse_esds() {
        // Hand-built esds: version/flags, ES descriptor wrapping a decoder
        // config descriptor wrapping an AudioSpecificConfig for AAC LC 48k.
        let asc = [0x11u8, 0x90];
        let mut dcd = vec![0x40, 0x15, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        dcd.push(0x05);
        dcd.push(asc.len() as u8);
        dcd.extend_from_slice(&asc);

        let mut es = vec![0x00, 0x01, 0x00]; // ES_ID, no optional flags
        es.push(0x04);
        es.push(dcd.len() as u8);
        es.extend_from_slice(&dcd);

        let mut esds = vec![0, 0, 0, 0];
        esds.push(0x03);
        esds.push(es.len() as u8);
        esds.extend_from_slice(&es);

        let config = parse_esds(&esds).unwrap().unwrap();
        assert_eq!(config.object_type, 2);
        assert_eq!(config.sampling_frequency, 48_000);
    }
}
