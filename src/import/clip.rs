use super::{
    options::ImportOptions,
    types::{ImportError, RawAnimation, RawKey},
};
use crate::{
    anim_error::AnimError,
    animation::{AnimationClip, Channel, Interpolation, Key, Track},
    skeleton::Skeleton,
};
use ahash::{HashMap, HashMapExt};
use itertools::Itertools;
use log::{debug, info, trace, warn};
use nalgebra_glm as glm;

/// Keys gathered for one joint before they become a `Track`. When several
/// channels fill the same list the last one with keys sets its
/// interpolation.
#[derive(Default)]
struct PendingTrack {
    translations: PendingKeys<glm::Vec3>,
    rotations: PendingKeys<glm::Quat>,
    scales: PendingKeys<glm::Vec3>,
}

struct PendingKeys<T> {
    keys: Vec<Key<T>>,
    interpolation: Interpolation,
}

impl<T> Default for PendingKeys<T> {
    fn default() -> Self {
        Self {
            keys: Vec::new(),
            interpolation: Interpolation::Linear,
        }
    }
}

impl<T: Copy> PendingKeys<T> {
    fn extend(&mut self, keys: Vec<Key<T>>, interpolation: Interpolation) {
        if !keys.is_empty() {
            self.keys.extend(keys);
            self.interpolation = interpolation;
        }
    }

    /// Sorts keys by time and drops any that repeat an earlier key's time
    fn finish(self) -> Result<Channel<T>, AnimError> {
        let before = self.keys.len();
        let keys: Vec<Key<T>> = self
            .keys
            .into_iter()
            .sorted_by(|a, b| a.time.total_cmp(&b.time))
            .dedup_by(|a, b| a.time.total_cmp(&b.time).is_eq())
            .collect();
        if keys.len() != before {
            debug!("{} keys with repeated times dropped", before - keys.len());
        }
        Ok(Channel::new(&keys)?.with_interpolation(self.interpolation))
    }
}

/// Converts tick times to seconds
#[allow(clippy::cast_possible_truncation)]
fn convert_keys<T: Copy>(
    keys: &[RawKey<T>],
    ticks_per_second: f64,
    map: impl Fn(T) -> T,
) -> Vec<Key<T>> {
    keys.iter()
        .map(|k| Key {
            time: (k.time / ticks_per_second) as f32,
            value: map(k.value),
        })
        .collect()
}

/// Builds a clip from raw importer keyframes. Times are converted from ticks
/// to seconds. A channel for a node the skeleton doesn't have is discarded,
/// leaving that node in its bind pose. Several channels for the same node are
/// merged.
///
/// # Errors
/// Returns `ImportError::InvalidDuration` if the clip has no positive
/// duration, or another `AnimError` if keys are not finite
#[allow(clippy::cast_possible_truncation)]
pub fn import_clip(
    raw: &RawAnimation,
    skeleton: &Skeleton,
    options: &ImportOptions,
) -> Result<AnimationClip, AnimError> {
    let ticks_per_second = options.ticks_per_second(raw.ticks_per_second);
    if ticks_per_second.to_bits() != raw.ticks_per_second.to_bits() {
        debug!(
            "animation {:?} declares {} ticks per second, using {}",
            raw.name, raw.ticks_per_second, ticks_per_second
        );
    }
    let duration = (raw.duration / ticks_per_second) as f32;
    if !duration.is_finite() || duration <= 0.0 {
        return Err(ImportError::InvalidDuration(raw.name.clone()).into());
    }

    let mut pending: HashMap<usize, PendingTrack> = HashMap::new();
    for channel in &raw.channels {
        let Some(joint) = skeleton.find(&channel.node_name) else {
            warn!(
                "animation {:?} channel for unknown node {:?} discarded",
                raw.name, channel.node_name
            );
            continue;
        };
        trace!(
            "node {:?} joint {} keys t={} r={} s={}",
            channel.node_name,
            joint,
            channel.translations.len(),
            channel.rotations.len(),
            channel.scales.len()
        );
        let track = pending.entry(joint).or_default();
        track.translations.extend(
            convert_keys(&channel.translations, ticks_per_second, |v| v),
            channel.translation_interpolation,
        );
        track.rotations.extend(
            convert_keys(&channel.rotations, ticks_per_second, |q| {
                glm::quat_normalize(&q)
            }),
            channel.rotation_interpolation,
        );
        track.scales.extend(
            convert_keys(&channel.scales, ticks_per_second, |v| v),
            channel.scale_interpolation,
        );
    }

    let mut tracks = Vec::with_capacity(pending.len());
    for (joint, p) in pending {
        tracks.push(Track::new(
            joint,
            p.translations.finish()?,
            p.rotations.finish()?,
            p.scales.finish()?,
        ));
    }
    AnimationClip::new(&raw.name, duration, tracks)
}

/// Imports every animation. A clip that fails is logged and skipped unless
/// `options.strict_clips` is set.
///
/// # Errors
/// With `strict_clips`, returns the first clip's error
pub fn import_clips(
    raws: &[RawAnimation],
    skeleton: &Skeleton,
    options: &ImportOptions,
) -> Result<Vec<AnimationClip>, AnimError> {
    let mut clips = Vec::with_capacity(raws.len());
    for raw in raws {
        match import_clip(raw, skeleton, options) {
            Ok(clip) => {
                info!(
                    "animation {:?} duration={}s tracks={}",
                    clip.name(),
                    clip.duration(),
                    clip.track_count()
                );
                clips.push(clip);
            }
            Err(e) if options.strict_clips => return Err(e),
            Err(e) => warn!("animation {:?} skipped: {}", raw.name, e),
        }
    }
    Ok(clips)
}
