//! Elementary-stream payload adaptation.
//!
//! Container samples are not directly emittable into PES: AVC/HEVC samples
//! carry length-prefixed NAL units and their parameter sets live in the
//! sample description; AAC samples are raw frames without ADTS headers.
//! The adapters below rewrite payloads into the self-contained form TS
//! players expect. AC-3 and E-AC-3 samples pass through unchanged.

use crate::error::{Result, TsError};
use hlspack_core::codec::{AacConfig, AvcConfig, HevcConfig};

/// Annex B start code.
const START_CODE: [u8; 4] = [0x00, 0x00, 0x00, 0x01];

/// H.264 access unit delimiter (pic_type = any).
const AUD_H264: [u8; 2] = [0x09, 0xF0];

/// H.265 access unit delimiter NAL.
const AUD_H265: [u8; 3] = [0x46, 0x01, 0x50];

/// Video payload adapter: AVCC/HVCC sample layout to Annex B.
#[derive(Debug, Clone)]
pub struct VideoAdapter {
    nal_length_size: usize,
    /// AUD NAL prepended to every access unit, start code included.
    aud: Vec<u8>,
    /// Parameter sets (VPS/SPS/PPS) in Annex B form, inserted at sync samples.
    parameter_sets: Vec<u8>,
}

impl VideoAdapter {
    /// Adapter for H.264 from an avcC record.
    pub fn h264(config: &AvcConfig) -> Result<Self> {
        let mut parameter_sets = Vec::new();
        for nal in config.sps.iter().chain(config.pps.iter()) {
            parameter_sets.extend_from_slice(&START_CODE);
            parameter_sets.extend_from_slice(nal);
        }

        let mut aud = START_CODE.to_vec();
        aud.extend_from_slice(&AUD_H264);

        Self::new(config.nal_length_size as usize, aud, parameter_sets)
    }

    /// Adapter for H.265 from an hvcC record.
    pub fn h265(config: &HevcConfig) -> Result<Self> {
        let mut parameter_sets = Vec::new();
        for nal in config
            .vps
            .iter()
            .chain(config.sps.iter())
            .chain(config.pps.iter())
        {
            parameter_sets.extend_from_slice(&START_CODE);
            parameter_sets.extend_from_slice(nal);
        }

        let mut aud = START_CODE.to_vec();
        aud.extend_from_slice(&AUD_H265);

        Self::new(config.nal_length_size as usize, aud, parameter_sets)
    }

    fn new(nal_length_size: usize, aud: Vec<u8>, parameter_sets: Vec<u8>) -> Result<Self> {
        if !matches!(nal_length_size, 1 | 2 | 4) {
            return Err(TsError::Adaptation(format!(
                "unsupported NAL length prefix size {}",
                nal_length_size
            )));
        }
        Ok(Self {
            nal_length_size,
            aud,
            parameter_sets,
        })
    }

    /// Convert one sample to an Annex B access unit.
    ///
    /// The AUD leads the unit; parameter sets are inserted before the
    /// sample's own NALs on sync samples so every segment can start decoding
    /// from its first access unit.
    pub fn adapt(&self, data: &[u8], sync: bool) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(
            self.aud.len()
                + if sync { self.parameter_sets.len() } else { 0 }
                + data.len()
                + 16,
        );
        out.extend_from_slice(&self.aud);
        if sync {
            out.extend_from_slice(&self.parameter_sets);
        }

        let mut offset = 0;
        while offset < data.len() {
            if offset + self.nal_length_size > data.len() {
                return Err(TsError::Adaptation("partial NAL length prefix".to_string()));
            }
            let mut nal_length = 0usize;
            for &byte in &data[offset..offset + self.nal_length_size] {
                nal_length = (nal_length << 8) | byte as usize;
            }
            offset += self.nal_length_size;

            if offset + nal_length > data.len() {
                return Err(TsError::Adaptation("partial NAL body".to_string()));
            }
            out.extend_from_slice(&START_CODE);
            out.extend_from_slice(&data[offset..offset + nal_length]);
            offset += nal_length;
        }

        Ok(out)
    }
}

/// Audio payload adapter.
#[derive(Debug, Clone)]
pub enum AudioAdapter {
    /// AAC frames get a 7-byte ADTS header each.
    Adts {
        /// ADTS profile bits (audio object type - 1).
        profile: u8,
        /// Sampling-frequency index.
        frequency_index: u8,
        /// Channel configuration.
        channel_config: u8,
    },
    /// AC-3 / E-AC-3 frames are already self-framing.
    Passthrough,
}

impl AudioAdapter {
    /// ADTS header size in bytes (no CRC).
    pub const ADTS_HEADER_SIZE: usize = 7;

    /// Adapter for AAC from an AudioSpecificConfig.
    pub fn aac(config: &AacConfig) -> Result<Self> {
        if config.frequency_index >= 13 {
            return Err(TsError::Adaptation(format!(
                "AAC sampling frequency {} not addressable in ADTS",
                config.sampling_frequency
            )));
        }
        if config.object_type == 0 || config.object_type > 4 {
            return Err(TsError::Adaptation(format!(
                "AAC object type {} not addressable in ADTS",
                config.object_type
            )));
        }
        Ok(AudioAdapter::Adts {
            profile: config.object_type - 1,
            frequency_index: config.frequency_index,
            channel_config: config.channel_config,
        })
    }

    /// Pass-through adapter.
    pub fn passthrough() -> Self {
        AudioAdapter::Passthrough
    }

    /// Frame one sample for the elementary stream.
    pub fn adapt(&self, data: &[u8]) -> Result<Vec<u8>> {
        match self {
            AudioAdapter::Passthrough => Ok(data.to_vec()),
            AudioAdapter::Adts {
                profile,
                frequency_index,
                channel_config,
            } => {
                let frame_length = Self::ADTS_HEADER_SIZE + data.len();
                if frame_length > 0x1FFF {
                    return Err(TsError::Adaptation(format!(
                        "AAC frame of {} bytes exceeds the ADTS length field",
                        data.len()
                    )));
                }

                let mut out = Vec::with_capacity(frame_length);
                out.push(0xFF);
                out.push(0xF1); // MPEG-4, layer 0, no CRC
                out.push((profile << 6) | (frequency_index << 2) | (channel_config >> 2));
                out.push(((channel_config & 0x03) << 6) | ((frame_length >> 11) as u8 & 0x03));
                out.push((frame_length >> 3) as u8);
                out.push(((frame_length as u8 & 0x07) << 5) | 0x1F); // buffer fullness: VBR
                out.push(0xFC);
                out.extend_from_slice(data);
                Ok(out)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn avc_config() -> AvcConfig {
        AvcConfig {
            profile: 0x64,
            compatibility: 0,
            level: 0x1F,
            nal_length_size: 4,
            sps: vec![vec![0x67, 0x64, 0x00, 0x1F]],
            pps: vec![vec![0x68, 0xEB]],
        }
    }

    #[test]
    fn test_annexb_conversion_sync() {
        let adapter = VideoAdapter::h264(&avc_config()).unwrap();

        // Two NALs with 4-byte length prefixes.
        let mut sample = Vec::new();
        sample.extend_from_slice(&3u32.to_be_bytes());
        sample.extend_from_slice(&[0x65, 0x88, 0x84]);
        sample.extend_from_slice(&2u32.to_be_bytes());
        sample.extend_from_slice(&[0x41, 0x9A]);

        let out = adapter.adapt(&sample, true).unwrap();

        // AUD, SPS, PPS, then the two sample NALs.
        let mut expected = Vec::new();
        expected.extend_from_slice(&[0, 0, 0, 1, 0x09, 0xF0]);
        expected.extend_from_slice(&[0, 0, 0, 1, 0x67, 0x64, 0x00, 0x1F]);
        expected.extend_from_slice(&[0, 0, 0, 1, 0x68, 0xEB]);
        expected.extend_from_slice(&[0, 0, 0, 1, 0x65, 0x88, 0x84]);
        expected.extend_from_slice(&[0, 0, 0, 1, 0x41, 0x9A]);
        assert_eq!(out, expected);
    }

    #[test]
    fn test_annexb_no_parameter_sets_on_non_sync() {
        let adapter = VideoAdapter::h264(&avc_config()).unwrap();

        let mut sample = Vec::new();
        sample.extend_from_slice(&2u32.to_be_bytes());
        sample.extend_from_slice(&[0x41, 0x9A]);

        let out = adapter.adapt(&sample, false).unwrap();
        assert_eq!(out, &[0, 0, 0, 1, 0x09, 0xF0, 0, 0, 0, 1, 0x41, 0x9A]);
    }

    #[test]
    fn test_partial_nal_rejected() {
        let adapter = VideoAdapter::h264(&avc_config()).unwrap();
        let mut sample = Vec::new();
        sample.extend_from_slice(&10u32.to_be_bytes());
        sample.extend_from_slice(&[0x41]);
        assert!(adapter.adapt(&sample, false).is_err());
    }

    #[test]
    fn test_adts_header() {
        let adapter = AudioAdapter::aac(&AacConfig {
            object_type: 2,
            frequency_index: 3,
            sampling_frequency: 48_000,
            channel_config: 2,
        })
        .unwrap();

        let payload = vec![0xAAu8; 100];
        let out = adapter.adapt(&payload).unwrap();
        assert_eq!(out.len(), 107);

        // Sync word.
        assert_eq!(out[0], 0xFF);
        assert_eq!(out[1], 0xF1);
        // Profile 1 (LC), frequency index 3, channels 2.
        assert_eq!(out[2], (1 << 6) | (3 << 2) | 0);
        assert_eq!(out[3] >> 6, 2);
        // 13-bit frame length covers header + payload.
        let frame_length =
            ((out[3] as usize & 0x03) << 11) | ((out[4] as usize) << 3) | (out[5] as usize >> 5);
        assert_eq!(frame_length, 107);
        assert_eq!(&out[7..], &payload[..]);
    }

    #[test]
    fn test_aac_escape_frequency_rejected() {
        let config = AacConfig {
            object_type: 2,
            frequency_index: 15,
            sampling_frequency: 12_345,
            channel_config: 2,
        };
        assert!(AudioAdapter::aac(&config).is_err());
    }

    #[test]
    fn test_passthrough() {
        let adapter = AudioAdapter::passthrough();
        let data = vec![1u8, 2, 3];
        assert_eq!(adapter.adapt(&data).unwrap(), data);
    }
}
