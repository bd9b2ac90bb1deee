//! Forward-only sample sources.
//!
//! Two realizations behind one enum: plain files stream the moov sample
//! tables through monotone cursors; fragmented files walk the pre-built
//! fragment index. Neither is restartable and there is no seek.

use crate::atoms::StblInfo;
use crate::fragment::FragmentSample;
use hlspack_core::error::{Error, Result};
use hlspack_core::sample::Sample;
use hlspack_core::timescale::TimeScale;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::sync::Arc;

/// A forward-only producer of samples for one track.
#[derive(Debug)]
pub enum SampleSource {
    /// Indexed access over moov sample tables behind a monotone cursor.
    Static(StaticSource),
    /// Linear walk of the fragment index, in moof order.
    Fragmented(FragmentedSource),
}

impl SampleSource {
    pub(crate) fn new_static(file: File, timescale: TimeScale, stbl: Arc<StblInfo>) -> Self {
        SampleSource::Static(StaticSource::new(file, timescale, stbl))
    }

    pub(crate) fn new_fragmented(
        file: File,
        timescale: TimeScale,
        samples: Vec<FragmentSample>,
    ) -> Self {
        SampleSource::Fragmented(FragmentedSource {
            file,
            timescale,
            samples,
            cursor: 0,
        })
    }

    /// Read the next sample. `Ok(None)` signals end of stream.
    pub fn next(&mut self) -> Result<Option<Sample>> {
        match self {
            SampleSource::Static(s) => s.next(),
            SampleSource::Fragmented(s) => s.next(),
        }
    }

    /// The track's media time scale. Constant for the source's lifetime.
    pub fn timescale(&self) -> TimeScale {
        match self {
            SampleSource::Static(s) => s.timescale,
            SampleSource::Fragmented(s) => s.timescale,
        }
    }
}

/// Streaming cursor over the moov sample tables.
#[derive(Debug)]
pub struct StaticSource {
    file: File,
    timescale: TimeScale,
    stbl: Arc<StblInfo>,
    sample_idx: usize,
    // stts cursor
    stts_idx: usize,
    stts_left: u32,
    dts: u64,
    // ctts cursor
    ctts_idx: usize,
    ctts_left: u32,
    // chunk cursor
    stsc_idx: usize,
    chunk_idx: usize,
    sample_in_chunk: u32,
    chunk_byte_offset: u64,
    // stss cursor
    stss_idx: usize,
}

impl StaticSource {
    fn new(file: File, timescale: TimeScale, stbl: Arc<StblInfo>) -> Self {
        let stts_left = stbl.stts.first().map(|e| e.0).unwrap_or(0);
        let ctts_left = stbl.ctts.first().map(|e| e.0).unwrap_or(0);
        Self {
            file,
            timescale,
            stbl,
            sample_idx: 0,
            stts_idx: 0,
            stts_left,
            dts: 0,
            ctts_idx: 0,
            ctts_left,
            stsc_idx: 0,
            chunk_idx: 0,
            sample_in_chunk: 0,
            chunk_byte_offset: 0,
            stss_idx: 0,
        }
    }

    fn next(&mut self) -> Result<Option<Sample>> {
        let stbl = Arc::clone(&self.stbl);
        if self.sample_idx >= stbl.sample_count() {
            return Ok(None);
        }

        let size = stbl.sample_sizes[self.sample_idx];
        let chunk_offset = *stbl.chunk_offsets.get(self.chunk_idx).ok_or_else(|| {
            Error::Container(
                format!("chunk {} not in stco for sample {}", self.chunk_idx, self.sample_idx)
                    .into(),
            )
        })?;
        let offset = chunk_offset + self.chunk_byte_offset;

        let duration = stbl.stts.get(self.stts_idx).map(|e| e.1).unwrap_or(0);
        let cts_offset = stbl.ctts.get(self.ctts_idx).map(|e| e.1).unwrap_or(0) as i64;

        let sync = if stbl.stss.is_empty() {
            true
        } else if stbl.stss.get(self.stss_idx) == Some(&(self.sample_idx as u32 + 1)) {
            self.stss_idx += 1;
            true
        } else {
            false
        };

        let description_index = stbl.stsc.get(self.stsc_idx).map(|e| e.2).unwrap_or(1);

        self.file.seek(SeekFrom::Start(offset))?;
        let mut data = vec![0u8; size as usize];
        self.file.read_exact(&mut data)?;

        let mut sample = Sample::new(data);
        sample.dts = self.dts;
        sample.cts = (self.dts as i64 + cts_offset).max(0) as u64;
        sample.duration = duration;
        sample.sync = sync;
        sample.description_index = description_index;

        self.advance(size, duration);
        Ok(Some(sample))
    }

    fn advance(&mut self, size: u32, duration: u32) {
        let stbl = &self.stbl;
        self.sample_idx += 1;
        self.dts += duration as u64;

        if self.stts_left > 0 {
            self.stts_left -= 1;
            if self.stts_left == 0 {
                self.stts_idx += 1;
                self.stts_left = stbl.stts.get(self.stts_idx).map(|e| e.0).unwrap_or(0);
            }
        }

        if self.ctts_left > 0 {
            self.ctts_left -= 1;
            if self.ctts_left == 0 {
                self.ctts_idx += 1;
                self.ctts_left = stbl.ctts.get(self.ctts_idx).map(|e| e.0).unwrap_or(0);
            }
        }

        self.sample_in_chunk += 1;
        self.chunk_byte_offset += size as u64;
        let samples_per_chunk = stbl.stsc.get(self.stsc_idx).map(|e| e.1).unwrap_or(u32::MAX);
        if self.sample_in_chunk >= samples_per_chunk {
            self.chunk_idx += 1;
            self.sample_in_chunk = 0;
            self.chunk_byte_offset = 0;
            if let Some(next) = stbl.stsc.get(self.stsc_idx + 1) {
                if next.0 as usize == self.chunk_idx + 1 {
                    self.stsc_idx += 1;
                }
            }
        }
    }
}

/// Linear reader over the pre-built fragment index.
#[derive(Debug)]
pub struct FragmentedSource {
    file: File,
    timescale: TimeScale,
    samples: Vec<FragmentSample>,
    cursor: usize,
}

impl FragmentedSource {
    fn next(&mut self) -> Result<Option<Sample>> {
        let Some(meta) = self.samples.get(self.cursor).copied() else {
            return Ok(None);
        };
        self.cursor += 1;

        self.file.seek(SeekFrom::Start(meta.offset))?;
        let mut data = vec![0u8; meta.size as usize];
        self.file.read_exact(&mut data)?;

        let mut sample = Sample::new(data);
        sample.dts = meta.dts;
        sample.cts = (meta.dts as i64 + meta.cts_offset as i64).max(0) as u64;
        sample.duration = meta.duration;
        sample.sync = meta.sync;
        sample.description_index = meta.description_index;
        Ok(Some(sample))
    }
}
