//! Segment-oriented transport stream writer.
//!
//! Unlike a whole-file muxer, HLS segmentation rotates the byte sink under
//! the writer: PAT/PMT are re-emitted at each segment head while per-stream
//! continuity counters run on, so concatenated segments form one conformant
//! stream. The sink is therefore passed per call instead of being owned.

use crate::error::{Result, TsError};
use crate::packet::{
    AdaptationField, AdaptationFieldControl, Pcr, TsHeader, PID_PAT, TS_PACKET_SIZE,
};
use crate::pes::{PesPacketBuilder, PesTimestamp, StreamId};
use crate::psi::{Pat, Pmt, StreamType};
use hlspack_core::codec::CodecId;
use std::io::Write;

/// PMT PID used by this packager.
pub const PID_PMT: u16 = 0x100;
/// Audio elementary stream PID.
pub const PID_AUDIO: u16 = 0x101;
/// Video elementary stream PID.
pub const PID_VIDEO: u16 = 0x102;

/// Stream configuration for muxing.
#[derive(Debug, Clone, Copy)]
pub struct StreamConfig {
    /// Elementary stream PID.
    pub pid: u16,
    /// TS stream type.
    pub stream_type: StreamType,
    /// PES stream ID.
    pub stream_id: u8,
}

impl StreamConfig {
    /// Stream configuration for a codec, per the HLS carriage table:
    /// AAC as ADTS on the audio stream ID, AC-3/E-AC-3 on private stream 1,
    /// AVC/HEVC on the video stream ID.
    pub fn for_codec(codec: CodecId, pid: u16) -> Self {
        let (stream_type, stream_id) = match codec {
            CodecId::H264 => (StreamType::H264, StreamId::VIDEO_BASE),
            CodecId::H265 => (StreamType::H265, StreamId::VIDEO_BASE),
            CodecId::Aac => (StreamType::AacAdts, StreamId::AUDIO_BASE),
            CodecId::Ac3 => (StreamType::Ac3, StreamId::PRIVATE_STREAM_1),
            CodecId::Eac3 => (StreamType::Eac3, StreamId::PRIVATE_STREAM_1),
        };
        Self {
            pid,
            stream_type,
            stream_id,
        }
    }

    /// Check if this stream carries video.
    pub fn is_video(&self) -> bool {
        self.stream_type.is_video()
    }
}

/// Stream state during muxing.
#[derive(Debug)]
struct StreamState {
    config: StreamConfig,
    continuity_counter: u8,
}

impl StreamState {
    fn next_cc(&mut self) -> u8 {
        let cc = self.continuity_counter;
        self.continuity_counter = (self.continuity_counter + 1) & 0x0F;
        cc
    }
}

/// MPEG Transport Stream writer.
#[derive(Debug)]
pub struct TsWriter {
    streams: Vec<StreamState>,
    pcr_pid: Option<u16>,
    pat: Pat,
    pmt: Pmt,
    pat_cc: u8,
    pmt_cc: u8,
    packets_written: u64,
}

impl TsWriter {
    /// Create a writer for a single program (transport stream ID 1,
    /// program number 1, PMT on `PID_PMT`).
    pub fn new() -> Self {
        let mut pat = Pat::new(1);
        pat.add_program(1, PID_PMT);
        let pmt = Pmt::new(1, 0x1FFF);

        Self {
            streams: Vec::new(),
            pcr_pid: None,
            pat,
            pmt,
            pat_cc: 0,
            pmt_cc: 0,
            packets_written: 0,
        }
    }

    /// Register an elementary stream. Returns its stream index.
    ///
    /// A video stream always takes over PCR carriage; otherwise the first
    /// registered stream carries it.
    pub fn add_stream(&mut self, config: StreamConfig) -> usize {
        if config.is_video() || self.pcr_pid.is_none() {
            self.pcr_pid = Some(config.pid);
            self.pmt.pcr_pid = config.pid;
        }

        self.pmt.add_stream(config.stream_type as u8, config.pid);
        self.streams.push(StreamState {
            config,
            continuity_counter: 0,
        });
        self.streams.len() - 1
    }

    /// Write PAT and PMT. Called at the head of every segment.
    pub fn write_tables<W: Write>(&mut self, writer: &mut W) -> Result<()> {
        let pat_section = self.pat.serialize();
        write_section(
            writer,
            PID_PAT,
            &pat_section,
            &mut self.pat_cc,
            &mut self.packets_written,
        )?;

        let pmt_section = self.pmt.serialize();
        write_section(
            writer,
            PID_PMT,
            &pmt_section,
            &mut self.pmt_cc,
            &mut self.packets_written,
        )?;

        Ok(())
    }

    /// Write one adapted sample as a PES packet.
    ///
    /// `pts`/`dts` are on the 90 kHz clock. When `with_pcr` is set, the
    /// first TS packet of the PES carries a PCR derived from the DTS.
    pub fn write_sample<W: Write>(
        &mut self,
        writer: &mut W,
        stream_index: usize,
        payload: &[u8],
        pts: u64,
        dts: u64,
        keyframe: bool,
        with_pcr: bool,
    ) -> Result<()> {
        let config = self
            .streams
            .get(stream_index)
            .ok_or(TsError::StreamNotFound(stream_index))?
            .config;

        let builder = PesPacketBuilder::with_stream_id(config.stream_id);
        let builder = if pts != dts {
            builder.pts_dts(PesTimestamp::new(pts), PesTimestamp::new(dts))
        } else {
            builder.pts(PesTimestamp::new(pts))
        };

        let mut pes_data = builder.build_header(payload.len())?;
        pes_data.extend_from_slice(payload);

        let pcr = if with_pcr && Some(config.pid) == self.pcr_pid {
            Some(Pcr::from_90khz(dts))
        } else {
            None
        };

        self.write_pes(writer, stream_index, &pes_data, keyframe, pcr)
    }

    /// Packetize PES data into TS packets.
    fn write_pes<W: Write>(
        &mut self,
        writer: &mut W,
        stream_index: usize,
        pes_data: &[u8],
        keyframe: bool,
        pcr: Option<Pcr>,
    ) -> Result<()> {
        let pid = self.streams[stream_index].config.pid;
        let mut remaining = pes_data;
        let mut first = true;

        while !remaining.is_empty() {
            let mut packet_data = [0xFFu8; TS_PACKET_SIZE];

            let mut af: Option<AdaptationField> = None;
            if first {
                if let Some(pcr) = pcr {
                    af = Some(AdaptationField::with_pcr(pcr));
                }
                if keyframe {
                    let a = af.get_or_insert_with(|| AdaptationField::stuffing(2));
                    a.random_access = true;
                }
            }

            // Stuff the adaptation field out so the payload fills the packet.
            let af_size = af.as_ref().map(|a| a.total_size()).unwrap_or(0);
            let available = TS_PACKET_SIZE - TsHeader::SIZE - af_size;
            if remaining.len() < available {
                let shortfall = available - remaining.len();
                match af.as_mut() {
                    Some(a) => a.length += shortfall as u8,
                    None => af = Some(AdaptationField::stuffing(shortfall)),
                }
            }

            let af_size = af.as_ref().map(|a| a.total_size()).unwrap_or(0);
            let payload_len = (TS_PACKET_SIZE - TsHeader::SIZE - af_size).min(remaining.len());

            let mut header = TsHeader::new(pid);
            header.payload_unit_start = first;
            header.continuity_counter = self.streams[stream_index].next_cc();
            header.adaptation_field_control = if af.is_some() {
                AdaptationFieldControl::AdaptationFieldAndPayload
            } else {
                AdaptationFieldControl::PayloadOnly
            };
            header.write(&mut packet_data[..TsHeader::SIZE])?;

            let mut offset = TsHeader::SIZE;
            if let Some(af) = &af {
                offset += af.write(&mut packet_data[offset..])?;
            }
            packet_data[offset..offset + payload_len].copy_from_slice(&remaining[..payload_len]);
            remaining = &remaining[payload_len..];

            writer.write_all(&packet_data)?;
            self.packets_written += 1;
            first = false;
        }

        Ok(())
    }

    /// Total TS packets written so far.
    pub fn packets_written(&self) -> u64 {
        self.packets_written
    }

    /// Total bytes written so far (packets are fixed-size).
    pub fn bytes_written(&self) -> u64 {
        self.packets_written * TS_PACKET_SIZE as u64
    }
}

impl Default for TsWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Write one PSI section as TS packets with a leading pointer field.
fn write_section<W: Write>(
    writer: &mut W,
    pid: u16,
    section: &[u8],
    cc: &mut u8,
    packets_written: &mut u64,
) -> Result<()> {
    let mut remaining = section;
    let mut first = true;

    while !remaining.is_empty() || first {
        let mut packet_data = [0xFFu8; TS_PACKET_SIZE];

        let mut header = TsHeader::new(pid);
        header.payload_unit_start = first;
        header.continuity_counter = *cc;
        header.adaptation_field_control = AdaptationFieldControl::PayloadOnly;
        header.write(&mut packet_data[..TsHeader::SIZE])?;

        let payload_start = TsHeader::SIZE;
        let available = TS_PACKET_SIZE - payload_start;

        if first {
            // Pointer field
            packet_data[payload_start] = 0;
            let section_len = remaining.len().min(available - 1);
            packet_data[payload_start + 1..payload_start + 1 + section_len]
                .copy_from_slice(&remaining[..section_len]);
            remaining = &remaining[section_len..];
        } else {
            let section_len = remaining.len().min(available);
            packet_data[payload_start..payload_start + section_len]
                .copy_from_slice(&remaining[..section_len]);
            remaining = &remaining[section_len..];
        }

        writer.write_all(&packet_data)?;
        *packets_written += 1;
        *cc = (*cc + 1) & 0x0F;
        first = false;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::SYNC_BYTE;
    use crate::pes::PesHeader;

    fn video_writer() -> TsWriter {
        let mut writer = TsWriter::new();
        writer.add_stream(StreamConfig::for_codec(CodecId::H264, PID_VIDEO));
        writer
    }

    #[test]
    fn test_stream_config_for_codec() {
        let video = StreamConfig::for_codec(CodecId::H264, PID_VIDEO);
        assert_eq!(video.stream_type, StreamType::H264);
        assert_eq!(video.stream_id, StreamId::VIDEO_BASE);

        let aac = StreamConfig::for_codec(CodecId::Aac, PID_AUDIO);
        assert_eq!(aac.stream_type, StreamType::AacAdts);
        assert_eq!(aac.stream_id, StreamId::AUDIO_BASE);

        let ac3 = StreamConfig::for_codec(CodecId::Ac3, PID_AUDIO);
        assert_eq!(ac3.stream_type, StreamType::Ac3);
        assert_eq!(ac3.stream_id, StreamId::PRIVATE_STREAM_1);
    }

    #[test]
    fn test_video_takes_pcr() {
        let mut writer = TsWriter::new();
        writer.add_stream(StreamConfig::for_codec(CodecId::Aac, PID_AUDIO));
        writer.add_stream(StreamConfig::for_codec(CodecId::H264, PID_VIDEO));
        assert_eq!(writer.pcr_pid, Some(PID_VIDEO));
        assert_eq!(writer.pmt.pcr_pid, PID_VIDEO);
    }

    #[test]
    fn test_tables_written_as_packets() {
        let mut writer = video_writer();
        let mut buf = Vec::new();
        writer.write_tables(&mut buf).unwrap();

        assert_eq!(buf.len(), 2 * TS_PACKET_SIZE);
        assert_eq!(buf[0], SYNC_BYTE);
        assert_eq!(buf[TS_PACKET_SIZE], SYNC_BYTE);

        // PAT on PID 0, pointer field 0, then the section.
        let pat_header = TsHeader::parse(&buf[..4]).unwrap();
        assert_eq!(pat_header.pid, PID_PAT);
        let pat = Pat::parse(&buf[5..]).unwrap();
        assert_eq!(pat.programs[0].pid, PID_PMT);

        let pmt_header = TsHeader::parse(&buf[TS_PACKET_SIZE..TS_PACKET_SIZE + 4]).unwrap();
        assert_eq!(pmt_header.pid, PID_PMT);
        let pmt = Pmt::parse(&buf[TS_PACKET_SIZE + 5..]).unwrap();
        assert_eq!(pmt.video_stream().unwrap().pid, PID_VIDEO);
    }

    #[test]
    fn test_sample_packetization() {
        let mut writer = video_writer();
        let mut buf = Vec::new();

        let payload = vec![0xABu8; 1000];
        writer
            .write_sample(&mut buf, 0, &payload, 93_000, 90_000, true, true)
            .unwrap();

        assert!(buf.len() > TS_PACKET_SIZE);
        assert_eq!(buf.len() % TS_PACKET_SIZE, 0);
        for i in (0..buf.len()).step_by(TS_PACKET_SIZE) {
            assert_eq!(buf[i], SYNC_BYTE, "Invalid sync byte at offset {}", i);
        }

        // First packet: payload start, adaptation field with PCR and the
        // random-access bit, then the PES header.
        let header = TsHeader::parse(&buf[..4]).unwrap();
        assert!(header.payload_unit_start);
        assert_eq!(header.pid, PID_VIDEO);
        assert!(header.adaptation_field_control.has_adaptation_field());

        let af = AdaptationField::parse(&buf[4..]).unwrap();
        assert!(af.random_access);
        assert_eq!(af.pcr.unwrap().base, 90_000);

        let pes_offset = 4 + af.total_size();
        let pes = PesHeader::parse(&buf[pes_offset..]).unwrap();
        assert_eq!(pes.pts.unwrap().value, 93_000);
        assert_eq!(pes.dts.unwrap().value, 90_000);
    }

    #[test]
    fn test_small_sample_stuffed_to_one_packet() {
        let mut writer = video_writer();
        let mut buf = Vec::new();

        writer
            .write_sample(&mut buf, 0, &[0x01, 0x02], 0, 0, false, false)
            .unwrap();

        assert_eq!(buf.len(), TS_PACKET_SIZE);
        let header = TsHeader::parse(&buf[..4]).unwrap();
        assert!(header.adaptation_field_control.has_adaptation_field());
        // Payload sits at the packet tail, after the stuffing.
        assert_eq!(&buf[TS_PACKET_SIZE - 2..], &[0x01, 0x02]);
    }

    #[test]
    fn test_continuity_counters_persist() {
        let mut writer = video_writer();
        let mut buf = Vec::new();
        writer
            .write_sample(&mut buf, 0, &[0u8; 200], 0, 0, false, false)
            .unwrap();
        let packets_first = buf.len() / TS_PACKET_SIZE;

        let mut buf2 = Vec::new();
        writer
            .write_sample(&mut buf2, 0, &[0u8; 10], 3000, 3000, false, false)
            .unwrap();

        let header = TsHeader::parse(&buf2[..4]).unwrap();
        assert_eq!(header.continuity_counter as usize, packets_first & 0x0F);
    }

    #[test]
    fn test_unknown_stream_rejected() {
        let mut writer = video_writer();
        let mut buf = Vec::new();
        assert!(matches!(
            writer.write_sample(&mut buf, 3, &[0u8; 4], 0, 0, false, false),
            Err(TsError::StreamNotFound(3))
        ));
    }
}
