pub mod batch;
pub mod sample;
mod types;

// Re-exports
pub use {
    batch::{sample_clip, SamplingContext},
    sample::{sample_pose, sample_track, slerp, wrap_time},
    types::{AnimationClip, Channel, Interpolation, Key, Track},
};
