use crate::anim_error::AnimError;
use ahash::{HashMap, HashMapExt};
use nalgebra_glm as glm;

/// A keyframe. Time is in seconds from the start of the clip.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Key<T> {
    pub time: f32,
    pub value: T,
}

/// How values between two keys are found
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Interpolation {
    #[default]
    Linear,
    /// Holds each key's value until the next key
    Step,
}

/// Keyframes for one channel of one joint. Times and values are held in
/// separate arrays so that the key search only touches the times.
///
/// Times are strictly ascending. This is checked when the channel is created.
#[derive(Clone, Debug, PartialEq)]
pub struct Channel<T> {
    times: Vec<f32>,
    values: Vec<T>,
    interpolation: Interpolation,
}

impl<T> Default for Channel<T> {
    fn default() -> Self {
        Self {
            times: Vec::new(),
            values: Vec::new(),
            interpolation: Interpolation::Linear,
        }
    }
}

impl<T: Copy> Channel<T> {
    /// Creates a channel from keys sorted by time
    ///
    /// # Errors
    /// Returns `AnimError::UnsortedKeys` with the index of the first key that
    /// is not later than the one before it, or `AnimError::InvalidTime` for
    /// a non-finite time.
    pub fn new(keys: &[Key<T>]) -> Result<Self, AnimError> {
        let mut times = Vec::with_capacity(keys.len());
        let mut values = Vec::with_capacity(keys.len());
        for (i, key) in keys.iter().enumerate() {
            if !key.time.is_finite() {
                return Err(AnimError::InvalidTime(key.time));
            }
            if let Some(&previous) = times.last() {
                if key.time <= previous {
                    return Err(AnimError::UnsortedKeys(i));
                }
            }
            times.push(key.time);
            values.push(key.value);
        }
        Ok(Self {
            times,
            values,
            interpolation: Interpolation::Linear,
        })
    }

    /// Creates a channel from separate time and value arrays
    ///
    /// # Errors
    /// May return `AnimError`
    pub fn from_parts(times: Vec<f32>, values: Vec<T>) -> Result<Self, AnimError> {
        if times.len() != values.len() {
            return Err(AnimError::KeyCountMismatch);
        }
        let keys: Vec<Key<T>> = times
            .iter()
            .zip(&values)
            .map(|(&time, &value)| Key { time, value })
            .collect();
        Self::new(&keys)
    }
}

impl<T> Channel<T> {
    #[must_use]
    pub fn with_interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    #[must_use]
    pub const fn interpolation(&self) -> Interpolation {
        self.interpolation
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.times.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    #[must_use]
    pub fn times(&self) -> &[f32] {
        &self.times
    }

    #[must_use]
    pub fn values(&self) -> &[T] {
        &self.values
    }

    /// Time of the last key, if there is one
    #[must_use]
    pub fn end_time(&self) -> Option<f32> {
        self.times.last().copied()
    }
}

/// Translation, rotation and scale channels animating one joint
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Track {
    joint: usize,
    pub translations: Channel<glm::Vec3>,
    pub rotations: Channel<glm::Quat>,
    pub scales: Channel<glm::Vec3>,
}

impl Track {
    #[must_use]
    pub const fn new(
        joint: usize,
        translations: Channel<glm::Vec3>,
        rotations: Channel<glm::Quat>,
        scales: Channel<glm::Vec3>,
    ) -> Self {
        Self {
            joint,
            translations,
            rotations,
            scales,
        }
    }

    /// Index of the skeleton joint this track animates
    #[must_use]
    pub const fn joint(&self) -> usize {
        self.joint
    }

    /// True if no channel has any keys
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.translations.is_empty()
            && self.rotations.is_empty()
            && self.scales.is_empty()
    }
}

/// A named animation. Tracks are kept ordered by joint index and there is at
/// most one track per joint.
#[derive(Clone, Debug)]
pub struct AnimationClip {
    name: String,
    duration: f32,
    tracks: Vec<Track>,
    lookup: HashMap<usize, usize>,
}

impl AnimationClip {
    /// Creates a clip. The duration is not checked here. A clip without a
    /// positive duration can be built but reports an error when sampled.
    ///
    /// # Errors
    /// Returns `AnimError::DuplicateTrack` if two tracks animate one joint
    pub fn new(
        name: &str,
        duration: f32,
        mut tracks: Vec<Track>,
    ) -> Result<Self, AnimError> {
        tracks.sort_by_key(Track::joint);
        let mut lookup = HashMap::with_capacity(tracks.len());
        for (slot, track) in tracks.iter().enumerate() {
            if lookup.insert(track.joint, slot).is_some() {
                return Err(AnimError::DuplicateTrack(track.joint));
            }
        }
        Ok(Self {
            name: name.to_string(),
            duration,
            tracks,
            lookup,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Duration in seconds
    #[must_use]
    pub const fn duration(&self) -> f32 {
        self.duration
    }

    #[must_use]
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    #[must_use]
    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// Track for a joint, if the clip animates it
    #[must_use]
    pub fn track(&self, joint: usize) -> Option<&Track> {
        self.lookup.get(&joint).map(|&slot| &self.tracks[slot])
    }
}
