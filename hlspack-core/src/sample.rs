//! Media sample abstraction.
//!
//! A sample is one encoded media unit read from a container track, before
//! elementary-stream adaptation.

use std::fmt;

/// An encoded media sample.
///
/// Timestamps are integer ticks of the owning track's time scale. Samples
/// are immutable once read from the container.
#[derive(Clone)]
pub struct Sample {
    /// Decode timestamp in track time-scale ticks.
    pub dts: u64,
    /// Composition (presentation) timestamp in track time-scale ticks.
    pub cts: u64,
    /// Duration in track time-scale ticks.
    pub duration: u32,
    /// True iff this is a sync sample (IDR / random-access point).
    pub sync: bool,
    /// 1-based sample description index into the track's `stsd` entries.
    pub description_index: u32,
    /// The encoded payload.
    data: Vec<u8>,
}

impl Sample {
    /// Create a new sample with owned payload data.
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            dts: 0,
            cts: 0,
            duration: 0,
            sync: false,
            description_index: 1,
            data,
        }
    }

    /// Get the sample payload.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Get the payload size in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Composition offset (cts - dts) in ticks.
    pub fn composition_offset(&self) -> i64 {
        self.cts as i64 - self.dts as i64
    }

    /// Decode timestamp of the next sample, assuming contiguous decode order.
    pub fn end_dts(&self) -> u64 {
        self.dts + self.duration as u64
    }
}

impl fmt::Debug for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sample")
            .field("dts", &self.dts)
            .field("cts", &self.cts)
            .field("duration", &self.duration)
            .field("sync", &self.sync)
            .field("size", &self.size())
            .finish()
    }
}
