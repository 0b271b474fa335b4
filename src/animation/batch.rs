use super::{
    sample::{check_pose, slerp, step_key, weight, wrap_time},
    types::{AnimationClip, Channel, Interpolation},
};
use crate::{anim_error::AnimError, skeleton::Skeleton, transform::Transform};
use nalgebra_glm as glm;

const TRANSLATION: usize = 0;
const ROTATION: usize = 1;
const SCALE: usize = 2;

/// Scratch state for `sample_clip`. Remembers which key interval each
/// channel of each track was last sampled in, so that playing forward only
/// has to step a few keys instead of searching again.
///
/// A context belongs to one playing instance and must be resized whenever
/// that instance switches to a clip with a different track list.
#[derive(Clone, Debug, Default)]
pub struct SamplingContext {
    cursors: Vec<[usize; 3]>,
}

impl SamplingContext {
    #[must_use]
    pub fn new(track_count: usize) -> Self {
        Self {
            cursors: vec![[0; 3]; track_count],
        }
    }

    /// Resizes for a clip with `track_count` tracks and forgets all cursors
    pub fn resize(&mut self, track_count: usize) {
        self.cursors.clear();
        self.cursors.resize(track_count, [0; 3]);
    }

    #[must_use]
    pub fn track_count(&self) -> usize {
        self.cursors.len()
    }
}

/// Moves `cursor` to the interval containing `time` and returns the
/// interpolation weight. Finds the same interval as `sample::interval`.
fn seek(times: &[f32], cursor: &mut usize, time: f32) -> f32 {
    let last = times.len() - 2;
    if *cursor > last || times[*cursor] > time {
        // Time went backwards, usually because the clip looped
        *cursor = times
            .partition_point(|&t| t <= time)
            .saturating_sub(1)
            .min(last);
    }
    while *cursor < last && times[*cursor + 1] <= time {
        *cursor += 1;
    }
    weight(times[*cursor], times[*cursor + 1], time)
}

fn seek_vec3(
    channel: &Channel<glm::Vec3>,
    fallback: glm::Vec3,
    cursor: &mut usize,
    time: f32,
) -> glm::Vec3 {
    let values = channel.values();
    match values.len() {
        0 => fallback,
        1 => values[0],
        _ => {
            let w = seek(channel.times(), cursor, time);
            match channel.interpolation() {
                Interpolation::Linear => {
                    glm::lerp(&values[*cursor], &values[*cursor + 1], w)
                }
                Interpolation::Step => {
                    values[step_key(channel.times(), *cursor, time)]
                }
            }
        }
    }
}

fn seek_quat(
    channel: &Channel<glm::Quat>,
    fallback: glm::Quat,
    cursor: &mut usize,
    time: f32,
) -> glm::Quat {
    let values = channel.values();
    match values.len() {
        0 => fallback,
        1 => values[0],
        _ => {
            let w = seek(channel.times(), cursor, time);
            match channel.interpolation() {
                Interpolation::Linear => {
                    slerp(&values[*cursor], &values[*cursor + 1], w)
                }
                Interpolation::Step => {
                    values[step_key(channel.times(), *cursor, time)]
                }
            }
        }
    }
}

/// Samples the local transform of every joint using the cursors in
/// `context`. Gives the same result as `sample::sample_pose`.
///
/// # Errors
/// May return `AnimError`, in which case `output` is left unchanged
pub fn sample_clip(
    skeleton: &Skeleton,
    clip: &AnimationClip,
    time: f32,
    context: &mut SamplingContext,
    output: &mut [Transform],
) -> Result<(), AnimError> {
    check_pose(skeleton, clip, output.len())?;
    if context.track_count() != clip.track_count() {
        return Err(AnimError::ContextMismatch {
            expected: clip.track_count(),
            found: context.track_count(),
        });
    }
    let time = wrap_time(time, clip.duration())?;

    for (out, joint) in output.iter_mut().zip(skeleton.joints()) {
        *out = joint.bind_local;
    }
    for (track, cursors) in clip.tracks().iter().zip(&mut context.cursors) {
        let out = &mut output[track.joint()];
        let bind = *out;
        out.translation = seek_vec3(
            &track.translations,
            bind.translation,
            &mut cursors[TRANSLATION],
            time,
        );
        out.rotation = seek_quat(
            &track.rotations,
            bind.rotation,
            &mut cursors[ROTATION],
            time,
        );
        out.scale =
            seek_vec3(&track.scales, bind.scale, &mut cursors[SCALE], time);
    }
    Ok(())
}
