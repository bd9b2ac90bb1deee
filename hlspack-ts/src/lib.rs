//! MPEG-2 Transport Stream writing for HLS segments.
//!
//! Provides the 188-byte packet layer, PES framing, PAT/PMT tables, the
//! elementary-stream payload adapters (AVCC→Annex B, AAC→ADTS) and the
//! segment-oriented `TsWriter` that ties them together.

pub mod adapt;
pub mod error;
pub mod packet;
pub mod pes;
pub mod psi;
pub mod writer;

pub use adapt::{AudioAdapter, VideoAdapter};
pub use error::{Result, TsError};
pub use packet::{AdaptationField, Pcr, TsHeader, TS_PACKET_SIZE};
pub use psi::{Pat, Pmt, StreamType};
pub use writer::{StreamConfig, TsWriter};
