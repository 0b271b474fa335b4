//! Reference keyframe interpolation.
//!
//! These functions search the keys from scratch on every call. The batched
//! sampler in `batch` gives the same results faster when a clip is played
//! forward frame after frame, and is what `Animator` uses. This module is the
//! definition both are tested against.

use super::types::{AnimationClip, Channel, Interpolation, Track};
use crate::{anim_error::AnimError, skeleton::Skeleton, transform::Transform};
use log::trace;
use nalgebra::UnitQuaternion;
use nalgebra_glm as glm;

/// Wraps an accumulated time into `[0, duration)`. Negative times wrap from
/// the end.
///
/// # Errors
/// Returns `AnimError::InvalidDuration` if `duration` is not a positive
/// number, or `AnimError::InvalidTime` if `time` is not finite.
pub fn wrap_time(time: f32, duration: f32) -> Result<f32, AnimError> {
    if !duration.is_finite() || duration <= 0.0_f32 {
        return Err(AnimError::InvalidDuration(duration));
    }
    if !time.is_finite() {
        return Err(AnimError::InvalidTime(time));
    }
    let wrapped = time.rem_euclid(duration);
    // Rounding can land a tiny negative time on `duration` itself
    Ok(if wrapped < duration { wrapped } else { 0.0 })
}

/// Helper to calculate the parameter used for interpolation
pub(crate) fn weight(start: f32, end: f32, current: f32) -> f32 {
    ((current - start) / (end - start)).clamp(0.0_f32, 1.0_f32)
}

/// Finds the key starting the interval that contains `time` and the weight
/// within that interval. Needs at least two keys. Times before the first key
/// or after the last are clamped to the first or last interval.
pub(crate) fn interval(times: &[f32], time: f32) -> (usize, f32) {
    let last = times.len() - 2;
    let next = times.partition_point(|&t| t <= time);
    if next > last + 1 {
        trace!("time {} is past the last key {}", time, times[last + 1]);
    }
    let i = next.saturating_sub(1).min(last);
    (i, weight(times[i], times[i + 1], time))
}

/// Key whose value a step channel holds at `time`, given the interval
/// found for that time
pub(crate) fn step_key(times: &[f32], i: usize, time: f32) -> usize {
    if time >= times[i + 1] {
        i + 1
    } else {
        i
    }
}

/// Shortest path spherical interpolation, normalized to guard against drift
#[must_use]
pub fn slerp(from: &glm::Quat, to: &glm::Quat, w: f32) -> glm::Quat {
    let a = UnitQuaternion::new_normalize(*from);
    let b = UnitQuaternion::new_normalize(*to);
    a.try_slerp(&b, w, f32::EPSILON).map_or_else(
        || {
            // Too close together for slerp so blend linearly instead
            let b = if a.dot(&b) < 0.0_f32 {
                -b.into_inner()
            } else {
                b.into_inner()
            };
            glm::quat_normalize(&(a.into_inner() * (1.0_f32 - w) + b * w))
        },
        |q| glm::quat_normalize(&q.into_inner()),
    )
}

/// Samples a translation or scale channel, returning `fallback` if it has
/// no keys
#[must_use]
pub fn sample_vec3(
    channel: &Channel<glm::Vec3>,
    fallback: glm::Vec3,
    time: f32,
) -> glm::Vec3 {
    let values = channel.values();
    match values.len() {
        0 => fallback,
        1 => values[0],
        _ => {
            let (i, w) = interval(channel.times(), time);
            match channel.interpolation() {
                Interpolation::Linear => glm::lerp(&values[i], &values[i + 1], w),
                Interpolation::Step => values[step_key(channel.times(), i, time)],
            }
        }
    }
}

/// Samples a rotation channel, returning `fallback` if it has no keys
#[must_use]
pub fn sample_quat(
    channel: &Channel<glm::Quat>,
    fallback: glm::Quat,
    time: f32,
) -> glm::Quat {
    let values = channel.values();
    match values.len() {
        0 => fallback,
        1 => values[0],
        _ => {
            let (i, w) = interval(channel.times(), time);
            match channel.interpolation() {
                Interpolation::Linear => slerp(&values[i], &values[i + 1], w),
                Interpolation::Step => values[step_key(channel.times(), i, time)],
            }
        }
    }
}

/// Samples all channels of a track at a time already wrapped into the clip.
/// Channels without keys keep the value from `bind`.
#[must_use]
pub fn sample_track(track: &Track, bind: &Transform, time: f32) -> Transform {
    Transform {
        translation: sample_vec3(&track.translations, bind.translation, time),
        rotation: sample_quat(&track.rotations, bind.rotation, time),
        scale: sample_vec3(&track.scales, bind.scale, time),
    }
}

/// Samples the local transform of every joint. Joints the clip doesn't
/// animate keep their bind pose. `time` is wrapped into the clip first.
///
/// # Errors
/// May return `AnimError`, in which case `output` is left unchanged
pub fn sample_pose(
    skeleton: &Skeleton,
    clip: &AnimationClip,
    time: f32,
    output: &mut [Transform],
) -> Result<(), AnimError> {
    check_pose(skeleton, clip, output.len())?;
    let time = wrap_time(time, clip.duration())?;
    for (out, joint) in output.iter_mut().zip(skeleton.joints()) {
        *out = joint.bind_local;
    }
    for track in clip.tracks() {
        let joint = track.joint();
        output[joint] = sample_track(track, &skeleton.joints()[joint].bind_local, time);
    }
    Ok(())
}

/// Checks an output size and that every track of `clip` fits `skeleton`
pub(crate) fn check_pose(
    skeleton: &Skeleton,
    clip: &AnimationClip,
    output_len: usize,
) -> Result<(), AnimError> {
    let joint_count = skeleton.joint_count();
    if output_len != joint_count {
        return Err(AnimError::JointCountMismatch {
            expected: joint_count,
            found: output_len,
        });
    }
    // Tracks are sorted by joint so the last one has the largest index
    match clip.tracks().last() {
        Some(track) if track.joint() >= joint_count => {
            Err(AnimError::TrackJointOutOfRange {
                joint: track.joint(),
                joint_count,
            })
        }
        _ => Ok(()),
    }
}
