//! PES (Packetized Elementary Stream) framing.

use crate::error::{Result, TsError};

/// PES start code prefix.
pub const PES_START_CODE_PREFIX: [u8; 3] = [0x00, 0x00, 0x01];

/// PES stream ID helpers.
pub struct StreamId;

impl StreamId {
    /// Audio stream base ID (0xC0 - 0xDF).
    pub const AUDIO_BASE: u8 = 0xC0;
    /// Video stream base ID (0xE0 - 0xEF).
    pub const VIDEO_BASE: u8 = 0xE0;
    /// Private stream 1 (AC-3 / E-AC-3 carriage).
    pub const PRIVATE_STREAM_1: u8 = 0xBD;

    /// Check if stream ID is video.
    pub fn is_video(id: u8) -> bool {
        (0xE0..=0xEF).contains(&id)
    }
}

/// A 33-bit PTS or DTS value on the 90 kHz clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PesTimestamp {
    /// 33-bit timestamp value.
    pub value: u64,
}

impl PesTimestamp {
    /// Maximum value for a 33-bit timestamp.
    pub const MAX_VALUE: u64 = (1u64 << 33) - 1;

    /// Create a new PES timestamp; the value wraps at 33 bits.
    pub fn new(value: u64) -> Self {
        Self {
            value: value & Self::MAX_VALUE,
        }
    }

    /// Parse PTS/DTS from 5 bytes.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < 5 {
            return Err(TsError::invalid_pes("Timestamp requires 5 bytes"));
        }

        let value = ((data[0] as u64 & 0x0E) << 29)
            | ((data[1] as u64) << 22)
            | ((data[2] as u64 & 0xFE) << 14)
            | ((data[3] as u64) << 7)
            | ((data[4] as u64) >> 1);

        Ok(Self::new(value))
    }

    /// Write PTS/DTS to 5 bytes with prefix.
    ///
    /// `prefix` should be:
    /// - 0x20 for PTS only
    /// - 0x30 for PTS when DTS also present
    /// - 0x10 for DTS
    pub fn write(&self, data: &mut [u8], prefix: u8) -> Result<()> {
        if data.len() < 5 {
            return Err(TsError::BufferOverflow(
                "Need 5 bytes for timestamp".to_string(),
            ));
        }

        data[0] = prefix | ((((self.value >> 30) as u8) & 0x07) << 1) | 0x01;
        data[1] = ((self.value >> 22) & 0xFF) as u8;
        data[2] = (((self.value >> 15) & 0x7F) << 1) as u8 | 0x01;
        data[3] = ((self.value >> 7) & 0xFF) as u8;
        data[4] = ((self.value & 0x7F) << 1) as u8 | 0x01;

        Ok(())
    }
}

/// PES packet header builder for muxing.
#[derive(Debug)]
pub struct PesPacketBuilder {
    stream_id: u8,
    pts: Option<PesTimestamp>,
    dts: Option<PesTimestamp>,
    data_alignment: bool,
}

impl PesPacketBuilder {
    /// Builder for a video elementary stream.
    pub fn video() -> Self {
        Self::with_stream_id(StreamId::VIDEO_BASE)
    }

    /// Builder for an audio elementary stream.
    pub fn audio() -> Self {
        Self::with_stream_id(StreamId::AUDIO_BASE)
    }

    /// Builder for private stream 1 (AC-3 / E-AC-3).
    pub fn private_stream_1() -> Self {
        Self::with_stream_id(StreamId::PRIVATE_STREAM_1)
    }

    /// Builder with a specific stream ID.
    pub fn with_stream_id(stream_id: u8) -> Self {
        Self {
            stream_id,
            pts: None,
            dts: None,
            data_alignment: true,
        }
    }

    /// Set PTS only.
    pub fn pts(mut self, pts: PesTimestamp) -> Self {
        self.pts = Some(pts);
        self
    }

    /// Set PTS and DTS.
    pub fn pts_dts(mut self, pts: PesTimestamp, dts: PesTimestamp) -> Self {
        self.pts = Some(pts);
        self.dts = Some(dts);
        self
    }

    /// Build the PES packet header for a payload of the given length.
    pub fn build_header(&self, payload_length: usize) -> Result<Vec<u8>> {
        let header_data_length: usize = match (self.pts.is_some(), self.dts.is_some()) {
            (true, true) => 10,
            (true, false) => 5,
            _ => 0,
        };

        // Video PES packets use the unbounded length of zero.
        let pes_packet_length = if StreamId::is_video(self.stream_id) {
            0u16
        } else {
            (3 + header_data_length + payload_length).min(0xFFFF) as u16
        };

        let mut header = Vec::with_capacity(9 + header_data_length);
        header.extend_from_slice(&PES_START_CODE_PREFIX);
        header.push(self.stream_id);
        header.push((pes_packet_length >> 8) as u8);
        header.push((pes_packet_length & 0xFF) as u8);

        let pts_dts_flags: u8 = match (self.pts.is_some(), self.dts.is_some()) {
            (true, true) => 0x03,
            (true, false) => 0x02,
            _ => 0x00,
        };

        // Marker '10', data alignment, original.
        header.push(0x80 | ((self.data_alignment as u8) << 2) | 0x01);
        header.push(pts_dts_flags << 6);
        header.push(header_data_length as u8);

        if let Some(pts) = &self.pts {
            let mut bytes = [0u8; 5];
            let prefix = if self.dts.is_some() { 0x30 } else { 0x20 };
            pts.write(&mut bytes, prefix)?;
            header.extend_from_slice(&bytes);
        }
        if let Some(dts) = &self.dts {
            let mut bytes = [0u8; 5];
            dts.write(&mut bytes, 0x10)?;
            header.extend_from_slice(&bytes);
        }

        Ok(header)
    }
}

/// Parsed PES header, used by the crate's own output-validation tests.
#[derive(Debug, Clone)]
pub struct PesHeader {
    /// Stream ID.
    pub stream_id: u8,
    /// PES packet length (0 for unbounded video).
    pub packet_length: u16,
    /// Presentation timestamp.
    pub pts: Option<PesTimestamp>,
    /// Decode timestamp.
    pub dts: Option<PesTimestamp>,
    /// Total header size including start code.
    pub header_size: usize,
}

impl PesHeader {
    /// Parse a PES header from data.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < 9 {
            return Err(TsError::invalid_pes("Data too short for PES header"));
        }
        if data[0..3] != PES_START_CODE_PREFIX {
            return Err(TsError::invalid_pes("Invalid PES start code prefix"));
        }

        let stream_id = data[3];
        let packet_length = ((data[4] as u16) << 8) | (data[5] as u16);

        if (data[6] & 0xC0) != 0x80 {
            return Err(TsError::invalid_pes("Invalid PES optional header marker"));
        }

        let pts_dts_flags = (data[7] >> 6) & 0x03;
        let header_data_length = data[8] as usize;
        let header_size = 9 + header_data_length;
        if data.len() < header_size {
            return Err(TsError::invalid_pes("Truncated PES header data"));
        }

        let mut pts = None;
        let mut dts = None;
        if pts_dts_flags & 0x02 != 0 {
            pts = Some(PesTimestamp::parse(&data[9..14])?);
            if pts_dts_flags == 0x03 {
                dts = Some(PesTimestamp::parse(&data[14..19])?);
            }
        }

        Ok(Self {
            stream_id,
            packet_length,
            pts,
            dts,
            header_size,
        })
    }
}
