//! Codec identifiers and decoder-configuration records.
//!
//! Maps ISO-BMFF sample-entry fourccs onto the codecs this packager can
//! remux, and parses the decoder configuration records (`avcC`, `hvcC`,
//! AudioSpecificConfig) needed for elementary-stream adaptation and for
//! RFC 6381 codec strings.

use crate::error::{Error, Result};

/// Codecs supported for remuxing into MPEG-2 TS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodecId {
    /// H.264 / AVC.
    H264,
    /// H.265 / HEVC.
    H265,
    /// AAC.
    Aac,
    /// AC-3.
    Ac3,
    /// E-AC-3.
    Eac3,
}

impl CodecId {
    /// Map a sample-entry fourcc to a codec. Dolby Vision AVC/HEVC
    /// sample-entry aliases map to their base codec.
    pub fn from_fourcc(fourcc: &[u8; 4]) -> Option<Self> {
        match fourcc {
            b"avc1" | b"avc2" | b"avc3" | b"avc4" | b"dvav" | b"dva1" => Some(CodecId::H264),
            b"hev1" | b"hvc1" | b"dvhe" | b"dvh1" => Some(CodecId::H265),
            b"mp4a" => Some(CodecId::Aac),
            b"ac-3" => Some(CodecId::Ac3),
            b"ec-3" => Some(CodecId::Eac3),
            _ => None,
        }
    }

    /// Check if this is a video codec.
    pub fn is_video(&self) -> bool {
        matches!(self, CodecId::H264 | CodecId::H265)
    }

    /// Check if this is an audio codec.
    pub fn is_audio(&self) -> bool {
        !self.is_video()
    }
}

/// A bit reader over a decoder configuration payload.
#[derive(Debug, Clone)]
struct BitReader<'a> {
    data: &'a [u8],
    byte_pos: usize,
    bit_pos: u8,
}

impl<'a> BitReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            byte_pos: 0,
            bit_pos: 0,
        }
    }

    fn read_bit(&mut self) -> Result<bool> {
        if self.byte_pos >= self.data.len() {
            return Err(Error::invalid_param("unexpected end of config record"));
        }
        let bit = (self.data[self.byte_pos] >> (7 - self.bit_pos)) & 1;
        self.bit_pos += 1;
        if self.bit_pos == 8 {
            self.bit_pos = 0;
            self.byte_pos += 1;
        }
        Ok(bit != 0)
    }

    fn read_bits(&mut self, n: u8) -> Result<u32> {
        let mut value: u32 = 0;
        for _ in 0..n {
            value = (value << 1) | (self.read_bit()? as u32);
        }
        Ok(value)
    }
}

/// Parsed `avcC` (AVCDecoderConfigurationRecord).
#[derive(Debug, Clone)]
pub struct AvcConfig {
    /// AVC profile indication.
    pub profile: u8,
    /// Profile compatibility byte.
    pub compatibility: u8,
    /// AVC level indication.
    pub level: u8,
    /// Size in bytes of each NAL length prefix (1, 2 or 4).
    pub nal_length_size: u8,
    /// Sequence parameter sets.
    pub sps: Vec<Vec<u8>>,
    /// Picture parameter sets.
    pub pps: Vec<Vec<u8>>,
}

impl AvcConfig {
    /// Parse an avcC payload (the box content, after the box header).
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < 7 {
            return Err(Error::invalid_param("avcC record too short"));
        }

        let profile = data[1];
        let compatibility = data[2];
        let level = data[3];
        let nal_length_size = (data[4] & 0x03) + 1;

        let mut offset = 5;
        let sps_count = (data[offset] & 0x1F) as usize;
        offset += 1;
        let sps = read_nal_list(data, &mut offset, sps_count)?;

        if offset >= data.len() {
            return Err(Error::invalid_param("avcC record truncated before PPS"));
        }
        let pps_count = data[offset] as usize;
        offset += 1;
        let pps = read_nal_list(data, &mut offset, pps_count)?;

        Ok(Self {
            profile,
            compatibility,
            level,
            nal_length_size,
            sps,
            pps,
        })
    }

    /// RFC 6381 codec tag, e.g. `avc1.64001f`.
    pub fn codec_string(&self) -> String {
        format!(
            "avc1.{:02x}{:02x}{:02x}",
            self.profile, self.compatibility, self.level
        )
    }
}

/// Parsed `hvcC` (HEVCDecoderConfigurationRecord).
#[derive(Debug, Clone)]
pub struct HevcConfig {
    /// general_profile_space (0..3).
    pub profile_space: u8,
    /// general_tier_flag.
    pub tier: bool,
    /// general_profile_idc.
    pub profile_idc: u8,
    /// general_profile_compatibility_flags.
    pub compatibility_flags: u32,
    /// general_constraint_indicator_flags (48 bits).
    pub constraint_flags: u64,
    /// general_level_idc.
    pub level_idc: u8,
    /// Size in bytes of each NAL length prefix.
    pub nal_length_size: u8,
    /// Video parameter sets.
    pub vps: Vec<Vec<u8>>,
    /// Sequence parameter sets.
    pub sps: Vec<Vec<u8>>,
    /// Picture parameter sets.
    pub pps: Vec<Vec<u8>>,
}

impl HevcConfig {
    const NAL_TYPE_VPS: u8 = 32;
    const NAL_TYPE_SPS: u8 = 33;
    const NAL_TYPE_PPS: u8 = 34;

    /// Parse an hvcC payload.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < 23 {
            return Err(Error::invalid_param("hvcC record too short"));
        }

        let profile_space = data[1] >> 6;
        let tier = (data[1] & 0x20) != 0;
        let profile_idc = data[1] & 0x1F;
        let compatibility_flags = u32::from_be_bytes([data[2], data[3], data[4], data[5]]);
        let constraint_flags = ((data[6] as u64) << 40)
            | ((data[7] as u64) << 32)
            | ((data[8] as u64) << 24)
            | ((data[9] as u64) << 16)
            | ((data[10] as u64) << 8)
            | (data[11] as u64);
        let level_idc = data[12];
        let nal_length_size = (data[21] & 0x03) + 1;

        let mut vps = Vec::new();
        let mut sps = Vec::new();
        let mut pps = Vec::new();

        let array_count = data[22] as usize;
        let mut offset = 23;
        for _ in 0..array_count {
            if offset + 3 > data.len() {
                return Err(Error::invalid_param("hvcC array header truncated"));
            }
            let nal_type = data[offset] & 0x3F;
            let nal_count =
                u16::from_be_bytes([data[offset + 1], data[offset + 2]]) as usize;
            offset += 3;
            let nals = read_nal_list(data, &mut offset, nal_count)?;
            match nal_type {
                Self::NAL_TYPE_VPS => vps = nals,
                Self::NAL_TYPE_SPS => sps = nals,
                Self::NAL_TYPE_PPS => pps = nals,
                _ => {}
            }
        }

        Ok(Self {
            profile_space,
            tier,
            profile_idc,
            compatibility_flags,
            constraint_flags,
            level_idc,
            nal_length_size,
            vps,
            sps,
            pps,
        })
    }

    /// RFC 6381 / ISO 14496-15 Annex E codec tag, e.g. `hvc1.1.6.L93.B0`.
    pub fn codec_string(&self) -> String {
        let space = match self.profile_space {
            1 => "A",
            2 => "B",
            3 => "C",
            _ => "",
        };
        let mut tag = format!(
            "hvc1.{}{}.{:X}.{}{}",
            space,
            self.profile_idc,
            self.compatibility_flags.reverse_bits(),
            if self.tier { "H" } else { "L" },
            self.level_idc
        );
        // Constraint bytes, big-endian, trailing zero bytes omitted.
        let bytes = [
            (self.constraint_flags >> 40) as u8,
            (self.constraint_flags >> 32) as u8,
            (self.constraint_flags >> 24) as u8,
            (self.constraint_flags >> 16) as u8,
            (self.constraint_flags >> 8) as u8,
            self.constraint_flags as u8,
        ];
        let keep = bytes
            .iter()
            .rposition(|&b| b != 0)
            .map(|i| i + 1)
            .unwrap_or(0);
        for b in &bytes[..keep] {
            tag.push_str(&format!(".{:X}", b));
        }
        tag
    }
}

/// Parsed AudioSpecificConfig (ISO/IEC 14496-3 1.6.2.1), top fields only.
#[derive(Debug, Clone, Copy)]
pub struct AacConfig {
    /// Audio object type (2 = AAC LC).
    pub object_type: u8,
    /// Sampling frequency index (4-bit table value, 15 = escape).
    pub frequency_index: u8,
    /// Sampling frequency in Hz.
    pub sampling_frequency: u32,
    /// Channel configuration.
    pub channel_config: u8,
}

/// Sampling frequencies addressable by a 4-bit ADTS frequency index.
const AAC_SAMPLE_RATES: [u32; 13] = [
    96_000, 88_200, 64_000, 48_000, 44_100, 32_000, 24_000, 22_050, 16_000, 12_000, 11_025,
    8_000, 7_350,
];

impl AacConfig {
    /// Parse the leading fields of an AudioSpecificConfig.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut reader = BitReader::new(data);

        let mut object_type = reader.read_bits(5)?;
        if object_type == 31 {
            object_type = 32 + reader.read_bits(6)?;
        }

        let frequency_index = reader.read_bits(4)? as u8;
        let sampling_frequency = if frequency_index == 15 {
            reader.read_bits(24)?
        } else {
            *AAC_SAMPLE_RATES
                .get(frequency_index as usize)
                .ok_or_else(|| Error::invalid_param("reserved AAC frequency index"))?
        };

        let channel_config = reader.read_bits(4)? as u8;

        Ok(Self {
            object_type: object_type as u8,
            frequency_index,
            sampling_frequency,
            channel_config,
        })
    }

    /// RFC 6381 codec tag, e.g. `mp4a.40.2`.
    pub fn codec_string(&self) -> String {
        format!("mp4a.40.{}", self.object_type)
    }
}

fn read_nal_list(data: &[u8], offset: &mut usize, count: usize) -> Result<Vec<Vec<u8>>> {
    let mut nals = Vec::with_capacity(count);
    for _ in 0..count {
        if *offset + 2 > data.len() {
            return Err(Error::invalid_param("NAL list truncated"));
        }
        let len = u16::from_be_bytes([data[*offset], data[*offset + 1]]) as usize;
        *offset += 2;
        if *offset + len > data.len() {
            return Err(Error::invalid_param("NAL payload truncated"));
        }
        nals.push(data[*offset..*offset + len].to_vec());
        *offset += len;
    }
    Ok(nals)
}
