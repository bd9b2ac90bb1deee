#![allow(dead_code)] // each test binary uses a different subset

//! In-memory MP4 builders for the packaging tests.
//!
//! Produces minimal but structurally correct containers: plain files carry
//! full moov sample tables, fragmented files carry an empty moov plus a
//! moof/mdat chain. Payloads are synthetic length-prefixed NALs (video) and
//! filler frames (audio).

/// Wrap a body in a box with the given fourcc.
pub fn boxed(fourcc: &[u8; 4], body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(body.len() + 8);
    out.extend_from_slice(&((body.len() + 8) as u32).to_be_bytes());
    out.extend_from_slice(fourcc);
    out.extend_from_slice(body);
    out
}

/// Video track description for the builder.
#[derive(Clone)]
pub struct VideoTrackSpec {
    pub fourcc: [u8; 4],
    pub timescale: u32,
    pub stts: Vec<(u32, u32)>,
    /// 1-based sync sample numbers (stss).
    pub sync: Vec<u32>,
    pub width: u16,
    pub height: u16,
    pub sample_size: u32,
}

impl VideoTrackSpec {
    /// A constant-frame-rate track with a sync sample every `gop` frames.
    pub fn with_gop(sample_count: u32, sample_duration: u32, timescale: u32, gop: u32) -> Self {
        Self {
            fourcc: *b"avc1",
            timescale,
            stts: vec![(sample_count, sample_duration)],
            sync: (0..sample_count).step_by(gop as usize).map(|i| i + 1).collect(),
            width: 1280,
            height: 720,
            sample_size: 64,
        }
    }

    pub fn sample_count(&self) -> u32 {
        self.stts.iter().map(|e| e.0).sum()
    }

    fn is_sync(&self, index: u32) -> bool {
        self.sync.contains(&(index + 1))
    }

    fn payload(&self, index: u32) -> Vec<u8> {
        let nal_len = self.sample_size - 4;
        let mut out = Vec::with_capacity(self.sample_size as usize);
        out.extend_from_slice(&nal_len.to_be_bytes());
        out.push(if self.is_sync(index) { 0x65 } else { 0x41 });
        out.resize(self.sample_size as usize, (index & 0xFF) as u8);
        out
    }
}

/// Audio track description for the builder.
#[derive(Clone)]
pub struct AudioTrackSpec {
    pub timescale: u32,
    pub stts: Vec<(u32, u32)>,
    pub sample_size: u32,
}

impl AudioTrackSpec {
    /// A constant-duration AAC track.
    pub fn new(sample_count: u32, sample_duration: u32, timescale: u32) -> Self {
        Self {
            timescale,
            stts: vec![(sample_count, sample_duration)],
            sample_size: 32,
        }
    }

    pub fn sample_count(&self) -> u32 {
        self.stts.iter().map(|e| e.0).sum()
    }

    fn payload(&self, index: u32) -> Vec<u8> {
        vec![(index & 0xFF) as u8; self.sample_size as usize]
    }
}

fn full_box_body(body: &[u8]) -> Vec<u8> {
    let mut out = vec![0u8; 4];
    out.extend_from_slice(body);
    out
}

fn avcc_box() -> Vec<u8> {
    let body = vec![
        0x01, 0x64, 0x00, 0x1F, 0xFF, 0xE1, // version, profile, compat, level, sizes, 1 SPS
        0x00, 0x04, 0x67, 0x64, 0x00, 0x1F, // SPS
        0x01, 0x00, 0x02, 0x68, 0xEB, // 1 PPS
    ];
    boxed(b"avcC", &body)
}

fn esds_box() -> Vec<u8> {
    // AAC LC, 48 kHz, stereo.
    let asc = [0x11u8, 0x90];
    let mut dcd = vec![0x40, 0x15, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
    dcd.push(0x05);
    dcd.push(asc.len() as u8);
    dcd.extend_from_slice(&asc);

    let mut es = vec![0x00, 0x01, 0x00];
    es.push(0x04);
    es.push(dcd.len() as u8);
    es.extend_from_slice(&dcd);

    let mut body = vec![0u8; 4];
    body.push(0x03);
    body.push(es.len() as u8);
    body.extend_from_slice(&es);
    boxed(b"esds", &body)
}

fn video_sample_entry(spec: &VideoTrackSpec) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&[0u8; 6]); // reserved
    body.extend_from_slice(&1u16.to_be_bytes()); // data reference index
    body.extend_from_slice(&[0u8; 16]); // pre_defined / reserved
    body.extend_from_slice(&spec.width.to_be_bytes());
    body.extend_from_slice(&spec.height.to_be_bytes());
    body.extend_from_slice(&0x0048_0000u32.to_be_bytes()); // horizresolution
    body.extend_from_slice(&0x0048_0000u32.to_be_bytes()); // vertresolution
    body.extend_from_slice(&[0u8; 4]); // reserved
    body.extend_from_slice(&1u16.to_be_bytes()); // frame count
    body.extend_from_slice(&[0u8; 32]); // compressor name
    body.extend_from_slice(&0x0018u16.to_be_bytes()); // depth
    body.extend_from_slice(&0xFFFFu16.to_be_bytes()); // pre_defined
    if &spec.fourcc == b"avc1" {
        body.extend_from_slice(&avcc_box());
    }
    boxed(&spec.fourcc, &body)
}

fn audio_sample_entry() -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&[0u8; 6]); // reserved
    body.extend_from_slice(&1u16.to_be_bytes()); // data reference index
    body.extend_from_slice(&[0u8; 8]); // reserved
    body.extend_from_slice(&2u16.to_be_bytes()); // channel count
    body.extend_from_slice(&16u16.to_be_bytes()); // sample size
    body.extend_from_slice(&[0u8; 4]); // pre_defined / reserved
    body.extend_from_slice(&(48_000u32 << 16).to_be_bytes()); // sample rate 16.16
    body.extend_from_slice(&esds_box());
    boxed(b"mp4a", &body)
}

fn stsd_box(entry: Vec<u8>) -> Vec<u8> {
    let mut body = full_box_body(&1u32.to_be_bytes());
    body.extend_from_slice(&entry);
    boxed(b"stsd", &body)
}

fn stts_box(entries: &[(u32, u32)]) -> Vec<u8> {
    let mut body = full_box_body(&(entries.len() as u32).to_be_bytes());
    for &(count, delta) in entries {
        body.extend_from_slice(&count.to_be_bytes());
        body.extend_from_slice(&delta.to_be_bytes());
    }
    boxed(b"stts", &body)
}

fn stsz_box(sample_size: u32, sample_count: u32) -> Vec<u8> {
    let mut body = full_box_body(&sample_size.to_be_bytes());
    body.extend_from_slice(&sample_count.to_be_bytes());
    boxed(b"stsz", &body)
}

fn stsc_box(sample_count: u32) -> Vec<u8> {
    let mut body = full_box_body(&1u32.to_be_bytes());
    if sample_count > 0 {
        body.extend_from_slice(&1u32.to_be_bytes());
        body.extend_from_slice(&sample_count.to_be_bytes());
        body.extend_from_slice(&1u32.to_be_bytes());
    } else {
        body = full_box_body(&0u32.to_be_bytes());
    }
    boxed(b"stsc", &body)
}

fn stco_box(offsets: &[u64]) -> Vec<u8> {
    let mut body = full_box_body(&(offsets.len() as u32).to_be_bytes());
    for &offset in offsets {
        body.extend_from_slice(&(offset as u32).to_be_bytes());
    }
    boxed(b"stco", &body)
}

fn stss_box(entries: &[u32]) -> Vec<u8> {
    let mut body = full_box_body(&(entries.len() as u32).to_be_bytes());
    for &entry in entries {
        body.extend_from_slice(&entry.to_be_bytes());
    }
    boxed(b"stss", &body)
}

fn mvhd_box(timescale: u32, duration: u32) -> Vec<u8> {
    let mut body = full_box_body(&[0u8; 8]); // creation, modification
    body.extend_from_slice(&timescale.to_be_bytes());
    body.extend_from_slice(&duration.to_be_bytes());
    body.extend_from_slice(&0x0001_0000u32.to_be_bytes()); // rate
    body.extend_from_slice(&0x0100u16.to_be_bytes()); // volume
    body.extend_from_slice(&[0u8; 10]); // reserved
    body.extend_from_slice(&identity_matrix());
    body.extend_from_slice(&[0u8; 24]); // pre_defined
    body.extend_from_slice(&3u32.to_be_bytes()); // next track id
    boxed(b"mvhd", &body)
}

fn identity_matrix() -> [u8; 36] {
    let mut matrix = [0u8; 36];
    matrix[0..4].copy_from_slice(&0x0001_0000u32.to_be_bytes());
    matrix[16..20].copy_from_slice(&0x0001_0000u32.to_be_bytes());
    matrix[32..36].copy_from_slice(&0x4000_0000u32.to_be_bytes());
    matrix
}

fn tkhd_box(track_id: u32, duration: u32, width: u16, height: u16) -> Vec<u8> {
    let mut body = vec![0, 0, 0, 7]; // version 0, enabled flags
    body.extend_from_slice(&[0u8; 8]); // creation, modification
    body.extend_from_slice(&track_id.to_be_bytes());
    body.extend_from_slice(&[0u8; 4]); // reserved
    body.extend_from_slice(&duration.to_be_bytes());
    body.extend_from_slice(&[0u8; 8]); // reserved
    body.extend_from_slice(&[0u8; 8]); // layer, group, volume, reserved
    body.extend_from_slice(&identity_matrix());
    body.extend_from_slice(&((width as u32) << 16).to_be_bytes());
    body.extend_from_slice(&((height as u32) << 16).to_be_bytes());
    boxed(b"tkhd", &body)
}

fn mdhd_box(timescale: u32, duration: u32) -> Vec<u8> {
    let mut body = full_box_body(&[0u8; 8]); // creation, modification
    body.extend_from_slice(&timescale.to_be_bytes());
    body.extend_from_slice(&duration.to_be_bytes());
    body.extend_from_slice(&0x55C4u16.to_be_bytes()); // language "und"
    body.extend_from_slice(&[0u8; 2]); // pre_defined
    boxed(b"mdhd", &body)
}

fn hdlr_box(handler: &[u8; 4]) -> Vec<u8> {
    let mut body = full_box_body(&[0u8; 4]); // pre_defined
    body.extend_from_slice(handler);
    body.extend_from_slice(&[0u8; 12]); // reserved
    body.push(0); // empty name
    boxed(b"hdlr", &body)
}

fn trak_box(
    track_id: u32,
    handler: &[u8; 4],
    timescale: u32,
    duration: u32,
    dims: Option<(u16, u16)>,
    stbl_children: Vec<Vec<u8>>,
) -> Vec<u8> {
    let mut stbl_body = Vec::new();
    for child in stbl_children {
        stbl_body.extend_from_slice(&child);
    }
    let stbl = boxed(b"stbl", &stbl_body);
    let minf = boxed(b"minf", &stbl);

    let mut mdia_body = mdhd_box(timescale, duration);
    mdia_body.extend_from_slice(&hdlr_box(handler));
    mdia_body.extend_from_slice(&minf);
    let mdia = boxed(b"mdia", &mdia_body);

    let (width, height) = dims.unwrap_or((0, 0));
    let mut trak_body = tkhd_box(track_id, duration, width, height);
    trak_body.extend_from_slice(&mdia);
    boxed(b"trak", &trak_body)
}

fn ftyp_box() -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(b"isom");
    body.extend_from_slice(&0u32.to_be_bytes());
    boxed(b"ftyp", &body)
}

/// Build a plain (moov-indexed) MP4 with the given tracks.
///
/// Layout: ftyp, mdat (video payloads then audio payloads), moov.
pub fn build_mp4(video: Option<&VideoTrackSpec>, audio: Option<&AudioTrackSpec>) -> Vec<u8> {
    let ftyp = ftyp_box();

    let mut mdat_payload = Vec::new();
    let video_offset = ftyp.len() as u64 + 8;
    if let Some(spec) = video {
        for i in 0..spec.sample_count() {
            mdat_payload.extend_from_slice(&spec.payload(i));
        }
    }
    let audio_offset = video_offset + mdat_payload.len() as u64;
    if let Some(spec) = audio {
        for i in 0..spec.sample_count() {
            mdat_payload.extend_from_slice(&spec.payload(i));
        }
    }
    let mdat = boxed(b"mdat", &mdat_payload);

    let mut moov_body = mvhd_box(1000, 0);
    if let Some(spec) = video {
        let count = spec.sample_count();
        let duration: u32 = spec.stts.iter().map(|e| e.0 * e.1).sum();
        moov_body.extend_from_slice(&trak_box(
            1,
            b"vide",
            spec.timescale,
            duration,
            Some((spec.width, spec.height)),
            vec![
                stsd_box(video_sample_entry(spec)),
                stts_box(&spec.stts),
                stsz_box(spec.sample_size, count),
                stsc_box(count),
                stco_box(&[video_offset]),
                stss_box(&spec.sync),
            ],
        ));
    }
    if let Some(spec) = audio {
        let count = spec.sample_count();
        let duration: u32 = spec.stts.iter().map(|e| e.0 * e.1).sum();
        moov_body.extend_from_slice(&trak_box(
            2,
            b"soun",
            spec.timescale,
            duration,
            None,
            vec![
                stsd_box(audio_sample_entry()),
                stts_box(&spec.stts),
                stsz_box(spec.sample_size, count),
                stsc_box(count),
                stco_box(&[audio_offset]),
            ],
        ));
    }
    let moov = boxed(b"moov", &moov_body);

    let mut out = ftyp;
    out.extend_from_slice(&mdat);
    out.extend_from_slice(&moov);
    out
}

/// Build a fragmented MP4 for a video track: empty moov sample tables plus
/// an mvex, then one moof+mdat pair per `samples_per_fragment` samples.
pub fn build_fragmented_mp4(spec: &VideoTrackSpec, samples_per_fragment: u32) -> Vec<u8> {
    assert_eq!(spec.stts.len(), 1, "fragmented builder wants uniform stts");
    let (sample_count, sample_duration) = spec.stts[0];

    let mut out = ftyp_box();

    // moov with stsd only; sample data lives in the fragments.
    let mut trex_body = vec![0u8; 4];
    trex_body.extend_from_slice(&1u32.to_be_bytes()); // track id
    trex_body.extend_from_slice(&1u32.to_be_bytes()); // default description index
    trex_body.extend_from_slice(&sample_duration.to_be_bytes());
    trex_body.extend_from_slice(&0u32.to_be_bytes()); // default size
    trex_body.extend_from_slice(&0x0101_0000u32.to_be_bytes()); // non-sync default
    let mvex = boxed(b"mvex", &boxed(b"trex", &trex_body));

    let mut moov_body = mvhd_box(1000, 0);
    moov_body.extend_from_slice(&trak_box(
        1,
        b"vide",
        spec.timescale,
        0,
        Some((spec.width, spec.height)),
        vec![
            stsd_box(video_sample_entry(spec)),
            stts_box(&[]),
            stsz_box(0, 0),
            stsc_box(0),
            stco_box(&[]),
        ],
    ));
    moov_body.extend_from_slice(&mvex);
    out.extend_from_slice(&boxed(b"moov", &moov_body));

    let mut sequence = 1u32;
    let mut first_sample = 0u32;
    while first_sample < sample_count {
        let in_fragment = samples_per_fragment.min(sample_count - first_sample);

        let mut mfhd_body = vec![0u8; 4];
        mfhd_body.extend_from_slice(&sequence.to_be_bytes());
        let mfhd = boxed(b"mfhd", &mfhd_body);

        // default-base-is-moof | default-sample-duration | default-sample-size
        let mut tfhd_body = 0x0002_0018u32.to_be_bytes().to_vec();
        tfhd_body.extend_from_slice(&1u32.to_be_bytes());
        tfhd_body.extend_from_slice(&sample_duration.to_be_bytes());
        tfhd_body.extend_from_slice(&spec.sample_size.to_be_bytes());
        let tfhd = boxed(b"tfhd", &tfhd_body);

        let mut tfdt_body = vec![1, 0, 0, 0];
        tfdt_body.extend_from_slice(&((first_sample as u64 * sample_duration as u64).to_be_bytes()));
        let tfdt = boxed(b"tfdt", &tfdt_body);

        // trun: data-offset | sample-flags
        let trun_size = 8 + 4 + 4 + 4 + in_fragment as usize * 4;
        let traf_size = 8 + tfhd.len() + tfdt.len() + trun_size;
        let moof_size = 8 + mfhd.len() + traf_size;

        let mut trun_body = 0x0000_0401u32.to_be_bytes().to_vec();
        trun_body.extend_from_slice(&in_fragment.to_be_bytes());
        trun_body.extend_from_slice(&((moof_size as i32 + 8).to_be_bytes()));
        for i in first_sample..first_sample + in_fragment {
            let flags: u32 = if spec.is_sync(i) { 0x0200_0000 } else { 0x0101_0000 };
            trun_body.extend_from_slice(&flags.to_be_bytes());
        }
        let trun = boxed(b"trun", &trun_body);

        let mut traf_body = tfhd;
        traf_body.extend_from_slice(&tfdt);
        traf_body.extend_from_slice(&trun);
        let traf = boxed(b"traf", &traf_body);

        let mut moof_body = mfhd;
        moof_body.extend_from_slice(&traf);
        let moof = boxed(b"moof", &moof_body);
        assert_eq!(moof.len(), moof_size);

        let mut mdat_payload = Vec::new();
        for i in first_sample..first_sample + in_fragment {
            mdat_payload.extend_from_slice(&spec.payload(i));
        }

        out.extend_from_slice(&moof);
        out.extend_from_slice(&boxed(b"mdat", &mdat_payload));

        first_sample += in_fragment;
        sequence += 1;
    }

    out
}
