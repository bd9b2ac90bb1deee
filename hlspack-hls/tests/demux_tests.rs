//! Container-reader tests over synthetic MP4 files.

mod common;

use common::{build_fragmented_mp4, build_mp4, AudioTrackSpec, VideoTrackSpec};
use hlspack_mp4::{Mp4Demuxer, TrackType};
use std::fs;
use tempfile::TempDir;

#[test]
fn plain_file_exposes_tracks_and_samples() {
    let tmp = TempDir::new().unwrap();
    let video = VideoTrackSpec::with_gop(60, 20, 600, 30);
    let audio = AudioTrackSpec::new(94, 1024, 48_000);
    let path = tmp.path().join("av.mp4");
    fs::write(&path, build_mp4(Some(&video), Some(&audio))).unwrap();

    let demuxer = Mp4Demuxer::open(&path).unwrap();
    assert!(!demuxer.is_fragmented());
    assert_eq!(demuxer.tracks().len(), 2);

    let video_track = demuxer
        .tracks()
        .iter()
        .find(|t| t.track_type == TrackType::Video)
        .unwrap();
    assert_eq!(video_track.timescale.ticks_per_second(), 600);
    assert_eq!(video_track.sample_count(), 60);
    assert_eq!(video_track.width, 1280);
    assert_eq!(video_track.height, 720);
    let description = video_track.description().unwrap();
    assert_eq!(description.codec_string().unwrap(), "avc1.64001f");

    // Keyframes every second (30 frames at 600/20 = 30 fps).
    let keyframes = demuxer.sync_sample_times(video_track.track_id);
    assert_eq!(keyframes, vec![0.0, 1.0]);

    // Sources deliver every sample with monotone DTS and correct sync flags.
    let mut source = demuxer.sample_source(video_track.track_id).unwrap();
    let mut count = 0u32;
    let mut last_dts = 0u64;
    while let Some(sample) = source.next().unwrap() {
        assert!(sample.dts >= last_dts);
        assert_eq!(sample.duration, 20);
        assert_eq!(sample.size(), 64);
        assert_eq!(sample.sync, count % 30 == 0);
        // Payload begins with the 4-byte NAL length prefix.
        assert_eq!(&sample.data()[..4], &60u32.to_be_bytes());
        last_dts = sample.dts;
        count += 1;
    }
    assert_eq!(count, 60);

    let audio_track = demuxer
        .tracks()
        .iter()
        .find(|t| t.track_type == TrackType::Audio)
        .unwrap();
    let mut source = demuxer.sample_source(audio_track.track_id).unwrap();
    let mut count = 0u32;
    while let Some(sample) = source.next().unwrap() {
        assert!(sample.sync);
        assert_eq!(sample.dts, count as u64 * 1024);
        count += 1;
    }
    assert_eq!(count, 94);
}

#[test]
fn fragmented_file_exposes_the_same_samples() {
    let tmp = TempDir::new().unwrap();
    let spec = VideoTrackSpec::with_gop(60, 20, 600, 30);
    let path = tmp.path().join("frag.mp4");
    fs::write(&path, build_fragmented_mp4(&spec, 25)).unwrap();

    let demuxer = Mp4Demuxer::open(&path).unwrap();
    assert!(demuxer.is_fragmented());

    let track = demuxer.tracks().first().unwrap();
    let keyframes = demuxer.sync_sample_times(track.track_id);
    assert_eq!(keyframes, vec![0.0, 1.0]);

    let mut source = demuxer.sample_source(track.track_id).unwrap();
    let mut count = 0u32;
    while let Some(sample) = source.next().unwrap() {
        assert_eq!(sample.dts, count as u64 * 20);
        assert_eq!(sample.duration, 20);
        assert_eq!(sample.sync, count % 30 == 0);
        assert_eq!(sample.size(), 64);
        assert_eq!(&sample.data()[..4], &60u32.to_be_bytes());
        count += 1;
    }
    assert_eq!(count, 60);
}

#[test]
fn missing_moov_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("noise.mp4");
    // An ftyp with no movie.
    let mut data = Vec::new();
    data.extend_from_slice(&16u32.to_be_bytes());
    data.extend_from_slice(b"ftyp");
    data.extend_from_slice(b"isom");
    data.extend_from_slice(&0u32.to_be_bytes());
    fs::write(&path, data).unwrap();

    assert!(Mp4Demuxer::open(&path).is_err());
}
