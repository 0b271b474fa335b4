//! Skeletal animation for skinned meshes.
//!
//! A scene is imported into a [`Skeleton`] and a set of [`AnimationClip`]s.
//! Each model instance owns an [`Animator`] which samples the playing clip,
//! walks the joint hierarchy and produces one skinning matrix per joint for
//! the vertex shader.
pub mod anim_error;
pub mod animation;
pub mod animator;
pub mod import;
pub mod influence;
pub mod pose;
pub mod skeleton;
pub mod skinning;
pub mod transform;
pub mod types;

// Re-exports
pub use {
    anim_error::AnimError,
    animation::AnimationClip,
    animator::{AnimationSet, AnimationState, Animator, ClipSelector},
    skeleton::Skeleton,
    transform::Transform,
};
