//! Segment-boundary alignment across renditions.
//!
//! For adaptive switching, segment boundaries must fall at identical
//! presentation times in every rendition, and boundaries are constrained to
//! video sync frames. The planner intersects the per-input keyframe indexes
//! under a small tolerance, then decimates the common timestamps to the
//! target segment duration.

use tracing::debug;

/// Keyframe alignment tolerance in seconds.
///
/// Tolerates PTS rounding when the same source has been encoded by separate
/// pipelines. Single precision keyframe indexes are adequate because this
/// tolerance dominates rounding noise.
pub const MAX_DTS_DELTA: f32 = 0.2;

/// Slack around the target duration when decimating, in seconds. Absorbs
/// sub-GOP drift between near-target keyframe gaps.
const TARGET_SLACK: f64 = 1.0;

/// Compute the aligned boundary list for a set of keyframe indexes.
///
/// Each index is an ordered list of sync-sample timestamps in seconds;
/// audio-only inputs contribute empty indexes and do not constrain the
/// result. The returned list is a subsequence (within [`MAX_DTS_DELTA`]) of
/// every non-empty index, decimated so successive entries are no closer
/// than `target_duration` minus the slack.
///
/// The intersection is a linear cursor sweep over monotone inputs, not a
/// generic set intersection. Coverage is not guaranteed: if keyframes are
/// too sparse, segments may exceed the target significantly.
pub fn plan_boundaries(indexes: &[Vec<f32>], target_duration: f64) -> Vec<f32> {
    let non_empty: Vec<&Vec<f32>> = indexes.iter().filter(|index| !index.is_empty()).collect();
    let Some(front) = non_empty.first() else {
        return Vec::new();
    };

    let aligned: Vec<f32> = if non_empty.len() == 1 {
        (*front).clone()
    } else {
        let mut cursors = vec![0usize; non_empty.len()];
        let mut aligned = Vec::new();

        'front: for &t in front.iter() {
            for (i, index) in non_empty.iter().enumerate().skip(1) {
                let cursor = &mut cursors[i];
                while *cursor < index.len() && index[*cursor] < t - MAX_DTS_DELTA {
                    *cursor += 1;
                }
                match index.get(*cursor) {
                    Some(&near) if (near - t).abs() < MAX_DTS_DELTA => {}
                    _ => continue 'front,
                }
            }
            aligned.push(t);
        }
        aligned
    };

    let decimated = decimate(&aligned, target_duration);
    debug!(
        inputs = indexes.len(),
        common = aligned.len(),
        boundaries = decimated.len(),
        "planned segment boundaries"
    );
    decimated
}

/// Keep boundaries spaced at least the target apart, with a slack window
/// that forgives near-target gaps.
fn decimate(aligned: &[f32], target_duration: f64) -> Vec<f32> {
    let mut out = Vec::new();
    let mut last = 0f64;
    for &t in aligned {
        let gap = t as f64 - last;
        if gap >= target_duration || (gap - target_duration).abs() < TARGET_SLACK {
            out.push(t);
            last = t as f64;
        }
    }
    out
}
