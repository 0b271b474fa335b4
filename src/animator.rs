use crate::{
    anim_error::AnimError,
    animation::{sample_clip, wrap_time, AnimationClip, SamplingContext},
    import::{import_clips, ImportOptions, SceneImport},
    pose,
    skeleton::{self, Skeleton},
    skinning::{self, JointMatrix},
    transform::Transform,
    types::MAX_JOINTS,
};
use log::{debug, info, warn};
use nalgebra_glm as glm;
use std::sync::Arc;

/// A skeleton with the clips that animate it. Immutable once built, so one
/// set is shared through an `Arc` by every instance of a model.
#[derive(Clone, Debug)]
pub struct AnimationSet {
    skeleton: Skeleton,
    clips: Vec<AnimationClip>,
    max_joints: usize,
}

impl AnimationSet {
    /// # Errors
    /// Returns `AnimError::TrackJointOutOfRange` if a clip animates a joint
    /// the skeleton doesn't have
    pub fn new(
        skeleton: Skeleton,
        clips: Vec<AnimationClip>,
    ) -> Result<Self, AnimError> {
        let joint_count = skeleton.joint_count();
        for clip in &clips {
            if let Some(track) = clip.tracks().last() {
                if track.joint() >= joint_count {
                    return Err(AnimError::TrackJointOutOfRange {
                        joint: track.joint(),
                        joint_count,
                    });
                }
            }
        }
        for (i, clip) in clips.iter().enumerate() {
            if clips[..i].iter().any(|c| c.name() == clip.name()) {
                warn!(
                    "clip name {:?} repeated, lookup by name finds the first",
                    clip.name()
                );
            }
        }
        Ok(Self {
            skeleton,
            clips,
            max_joints: MAX_JOINTS,
        })
    }

    /// Builds the skeleton and clips of an imported scene
    ///
    /// # Errors
    /// May return `AnimError`
    pub fn from_scene(
        scene: &SceneImport,
        options: &ImportOptions,
    ) -> Result<Self, AnimError> {
        options.validate()?;
        let skeleton = skeleton::build(&scene.nodes, scene.bones())?;
        let clips = import_clips(&scene.animations, &skeleton, options)?;
        info!(
            "animation set joints={} clips={}",
            skeleton.joint_count(),
            clips.len()
        );
        let mut set = Self::new(skeleton, clips)?;
        set.max_joints = options.max_joints;
        Ok(set)
    }

    #[must_use]
    pub const fn skeleton(&self) -> &Skeleton {
        &self.skeleton
    }

    #[must_use]
    pub fn clips(&self) -> &[AnimationClip] {
        &self.clips
    }

    #[must_use]
    pub fn clip(&self, index: usize) -> Option<&AnimationClip> {
        self.clips.get(index)
    }

    /// Index of the first clip with the given name
    #[must_use]
    pub fn find_clip(&self, name: &str) -> Option<usize> {
        self.clips.iter().position(|c| c.name() == name)
    }

    /// Clip names in index order
    #[must_use]
    pub fn clip_names(&self) -> Vec<&str> {
        self.clips.iter().map(AnimationClip::name).collect()
    }

    /// Joint limit applied to instances of this set
    #[must_use]
    pub const fn max_joints(&self) -> usize {
        self.max_joints
    }
}

/// Playback state of one model instance
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AnimationState {
    Idle,
    Playing { clip: usize, time: f32 },
}

/// Selects a clip by name or by index
#[derive(Clone, Copy, Debug)]
pub enum ClipSelector<'a> {
    Name(&'a str),
    Index(usize),
}

impl<'a> From<&'a str> for ClipSelector<'a> {
    fn from(name: &'a str) -> Self {
        Self::Name(name)
    }
}

impl From<usize> for ClipSelector<'_> {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

/// Animates one model instance. Owns the playback state and every buffer
/// used per frame. The matrices handed out always come from the last frame
/// that evaluated without error.
#[derive(Clone, Debug)]
pub struct Animator {
    set: Arc<AnimationSet>,
    state: AnimationState,
    context: SamplingContext,
    locals: Vec<Transform>,
    globals: Vec<glm::Mat4>,
    scratch: Vec<glm::Mat4>,
    matrices: Vec<glm::Mat4>,
}

impl Animator {
    /// Creates an idle instance. All joint matrices start as the identity.
    ///
    /// # Errors
    /// Returns `AnimError::TooManyJoints` if the skeleton has more joints
    /// than the set's limit
    pub fn new(set: Arc<AnimationSet>) -> Result<Self, AnimError> {
        let max = set.max_joints();
        Self::with_max_joints(set, max)
    }

    /// Creates an idle instance for a shader with a lower joint limit
    ///
    /// # Errors
    /// Returns `AnimError::InvalidOption` if `max_joints` is zero or above
    /// `MAX_JOINTS`, or `AnimError::TooManyJoints`
    pub fn with_max_joints(
        set: Arc<AnimationSet>,
        max_joints: usize,
    ) -> Result<Self, AnimError> {
        if max_joints == 0 || max_joints > MAX_JOINTS {
            return Err(AnimError::InvalidOption("max_joints"));
        }
        let count = set.skeleton().joint_count();
        if count > max_joints {
            return Err(AnimError::TooManyJoints {
                count,
                max: max_joints,
            });
        }
        let identity = vec![glm::Mat4::identity(); count];
        Ok(Self {
            set,
            state: AnimationState::Idle,
            context: SamplingContext::default(),
            locals: vec![Transform::identity(); count],
            globals: identity.clone(),
            scratch: identity.clone(),
            matrices: identity,
        })
    }

    #[must_use]
    pub const fn set(&self) -> &Arc<AnimationSet> {
        &self.set
    }

    #[must_use]
    pub const fn state(&self) -> AnimationState {
        self.state
    }

    /// Playback time in seconds, if a clip is playing
    #[must_use]
    pub const fn current_time(&self) -> Option<f32> {
        match self.state {
            AnimationState::Playing { time, .. } => Some(time),
            AnimationState::Idle => None,
        }
    }

    #[must_use]
    pub const fn has_active_animation(&self) -> bool {
        matches!(self.state, AnimationState::Playing { .. })
    }

    #[must_use]
    pub fn clip_names(&self) -> Vec<&str> {
        self.set.clip_names()
    }

    /// One matrix per joint, ready for the vertex shader
    #[must_use]
    pub fn final_joint_matrices(&self) -> &[glm::Mat4] {
        &self.matrices
    }

    /// Final matrices in the uniform buffer layout
    #[must_use]
    pub fn uniform_matrices(&self) -> Vec<JointMatrix> {
        skinning::to_uniform(&self.matrices)
    }

    /// Starts playing a clip from time zero. The joint matrices are
    /// evaluated straight away. If that fails the failure is logged, the
    /// previous matrices are kept and the next `advance` reports it.
    ///
    /// # Errors
    /// Returns `AnimError::ClipNotFound` or `AnimError::ClipIndexOutOfRange`
    /// and leaves the current state unchanged
    pub fn set_current_animation<'a>(
        &mut self,
        selector: impl Into<ClipSelector<'a>>,
    ) -> Result<(), AnimError> {
        let clip = match selector.into() {
            ClipSelector::Name(name) => self
                .set
                .find_clip(name)
                .ok_or_else(|| AnimError::ClipNotFound(name.to_string()))?,
            ClipSelector::Index(index) => {
                if index >= self.set.clips().len() {
                    return Err(AnimError::ClipIndexOutOfRange(index));
                }
                index
            }
        };
        debug!("playing clip {} {:?}", clip, self.set.clips()[clip].name());
        self.state = AnimationState::Playing { clip, time: 0.0 };
        self.context.resize(self.set.clips()[clip].track_count());
        if let Err(e) = self.evaluate(clip, 0.0) {
            warn!("clip {clip} could not be evaluated: {e}");
        }
        Ok(())
    }

    /// Stops playback and resets every joint matrix to the identity
    pub fn stop(&mut self) {
        self.state = AnimationState::Idle;
        self.matrices.fill(glm::Mat4::identity());
    }

    /// Moves playback on by `dt` seconds, wrapping at the end of the clip,
    /// and evaluates the joint matrices. Does nothing when idle.
    ///
    /// # Errors
    /// May return `AnimError`. The previous frame's matrices and the
    /// playback time are kept in that case.
    pub fn advance(&mut self, dt: f32) -> Result<(), AnimError> {
        let AnimationState::Playing { clip, time } = self.state else {
            return Ok(());
        };
        let result = self.step(clip, time, dt);
        if let Err(e) = &result {
            warn!("clip {clip} at {time}s + {dt}s, keeping last pose: {e}");
        }
        result
    }

    fn step(&mut self, clip: usize, time: f32, dt: f32) -> Result<(), AnimError> {
        if !dt.is_finite() {
            return Err(AnimError::InvalidTime(dt));
        }
        let duration = self.set.clips()[clip].duration();
        let time = wrap_time(time + dt, duration)?;
        self.evaluate(clip, time)?;
        self.state = AnimationState::Playing { clip, time };
        Ok(())
    }

    /// Runs the whole pipeline into the scratch buffer and only swaps it in
    /// when every stage succeeded
    fn evaluate(&mut self, clip: usize, time: f32) -> Result<(), AnimError> {
        let set = &*self.set;
        let skeleton = set.skeleton();
        sample_clip(
            skeleton,
            &set.clips()[clip],
            time,
            &mut self.context,
            &mut self.locals,
        )?;
        pose::local_to_model(skeleton, &self.locals, &mut self.globals)?;
        skinning::build_skinning_matrices(
            skeleton,
            &self.globals,
            &mut self.scratch,
        )?;
        std::mem::swap(&mut self.scratch, &mut self.matrices);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{AnimationSet, AnimationState, Animator, ClipSelector};
    use crate::{
        anim_error::AnimError,
        animation::{AnimationClip, Channel, Track},
        import::{BoneBinding, SourceNode},
        skeleton,
        transform::Transform,
        types::MAX_JOINTS,
    };
    use std::sync::Arc;

    fn chain(count: usize) -> skeleton::Skeleton {
        let nodes: Vec<SourceNode> = (0..count)
            .map(|i| SourceNode {
                name: format!("j{i}"),
                parent: i.checked_sub(1),
                transform: Transform::identity(),
            })
            .collect();
        skeleton::build(&nodes, std::iter::empty::<&BoneBinding>()).unwrap()
    }

    fn empty_clip(name: &str, joint: usize) -> AnimationClip {
        let track = Track::new(
            joint,
            Channel::default(),
            Channel::default(),
            Channel::default(),
        );
        AnimationClip::new(name, 1.0, vec![track]).unwrap()
    }

    #[test]
    fn selector_from() {
        assert!(matches!(ClipSelector::from("run"), ClipSelector::Name("run")));
        assert!(matches!(ClipSelector::from(3), ClipSelector::Index(3)));
    }

    #[test]
    fn set_rejects_bad_track() {
        let res = AnimationSet::new(chain(2), vec![empty_clip("a", 2)]);
        assert!(matches!(
            res,
            Err(AnimError::TrackJointOutOfRange {
                joint: 2,
                joint_count: 2
            })
        ));
    }

    #[test]
    fn duplicate_names_find_first() {
        let set = AnimationSet::new(
            chain(2),
            vec![empty_clip("a", 0), empty_clip("b", 0), empty_clip("a", 1)],
        )
        .unwrap();
        assert_eq!(set.find_clip("a"), Some(0));
        assert_eq!(set.clip_names(), ["a", "b", "a"]);
    }

    #[test]
    fn joint_limit() {
        let set = Arc::new(AnimationSet::new(chain(3), Vec::new()).unwrap());
        assert!(Animator::new(set.clone()).is_ok());
        assert!(matches!(
            Animator::with_max_joints(set.clone(), 2),
            Err(AnimError::TooManyJoints { count: 3, max: 2 })
        ));
        assert!(matches!(
            Animator::with_max_joints(set, MAX_JOINTS + 1),
            Err(AnimError::InvalidOption(_))
        ));
    }

    #[test]
    fn idle_advance_does_nothing() {
        let set = Arc::new(AnimationSet::new(chain(2), Vec::new()).unwrap());
        let mut animator = Animator::new(set).unwrap();
        assert!(animator.advance(0.5).is_ok());
        assert_eq!(animator.state(), AnimationState::Idle);
        assert_eq!(animator.current_time(), None);
    }

    #[test]
    fn non_finite_step_keeps_time() {
        let set = Arc::new(
            AnimationSet::new(chain(2), vec![empty_clip("a", 1)]).unwrap(),
        );
        let mut animator = Animator::new(set).unwrap();
        animator.set_current_animation(0).unwrap();
        animator.advance(0.25).unwrap();
        assert!(matches!(
            animator.advance(f32::NAN),
            Err(AnimError::InvalidTime(_))
        ));
        assert_eq!(animator.current_time(), Some(0.25));
    }
}
