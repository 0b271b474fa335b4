use crate::import::ImportError;
use std::{error, fmt};

/// Unified error type
///
/// Import errors are fatal to building a model and are returned to the
/// caller. The remaining variants are reported by the per frame pipeline,
/// where the caller is expected to keep rendering with the last good joint
/// matrices.
#[derive(Debug)]
pub enum AnimError {
    InvalidDuration(f32),
    InvalidTime(f32),
    UnsortedKeys(usize),
    KeyCountMismatch,
    DuplicateTrack(usize),
    TrackJointOutOfRange { joint: usize, joint_count: usize },
    JointCountMismatch { expected: usize, found: usize },
    ContextMismatch { expected: usize, found: usize },
    NonFiniteMatrix(usize),
    TooManyJoints { count: usize, max: usize },
    InvalidOption(&'static str),
    ClipNotFound(String),
    ClipIndexOutOfRange(usize),
    StdIoError(std::io::Error),
    SerdeYamlError(Box<serde_yaml::Error>),
    GltfError(Box<gltf::Error>),
    ImportError(ImportError),
}

impl error::Error for AnimError {}

impl fmt::Display for AnimError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::InvalidDuration(d) => {
                write!(f, "clip duration {d} is not a positive number")
            }
            Self::InvalidTime(t) => write!(f, "time {t} is not finite"),
            Self::UnsortedKeys(i) => {
                write!(f, "key {i} is not later than the key before it")
            }
            Self::KeyCountMismatch => {
                write!(f, "key times and values have different lengths")
            }
            Self::DuplicateTrack(j) => {
                write!(f, "joint {j} has more than one track")
            }
            Self::TrackJointOutOfRange { joint, joint_count } => {
                write!(
                    f,
                    "track targets joint {joint} but skeleton has \
                     {joint_count} joints"
                )
            }
            Self::JointCountMismatch { expected, found } => {
                write!(f, "expected {expected} joints, found {found}")
            }
            Self::ContextMismatch { expected, found } => {
                write!(
                    f,
                    "sampling context sized for {found} tracks but clip has \
                     {expected}"
                )
            }
            Self::NonFiniteMatrix(j) => {
                write!(f, "joint {j} produced a non-finite matrix")
            }
            Self::TooManyJoints { count, max } => {
                write!(f, "skeleton has {count} joints, shader supports {max}")
            }
            Self::InvalidOption(name) => {
                write!(f, "invalid value for option {name}")
            }
            Self::ClipNotFound(name) => {
                write!(f, "animation clip {name:?} not found")
            }
            Self::ClipIndexOutOfRange(i) => {
                write!(f, "animation clip index {i} out of range")
            }
            Self::StdIoError(e) => write!(f, "std::io::Error: {}", e.kind()),
            Self::SerdeYamlError(e) => {
                write!(f, "serde_yaml::Error: {e}")
            }
            Self::GltfError(e) => {
                write!(f, "gltf Error: {e}")
            }
            Self::ImportError(e) => write!(f, "import error: {e}"),
        }
    }
}

impl From<serde_yaml::Error> for AnimError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::SerdeYamlError(Box::new(e))
    }
}

impl From<std::io::Error> for AnimError {
    fn from(e: std::io::Error) -> Self {
        Self::StdIoError(e)
    }
}

impl From<gltf::Error> for AnimError {
    fn from(e: gltf::Error) -> Self {
        Self::GltfError(Box::new(e))
    }
}

impl From<ImportError> for AnimError {
    fn from(e: ImportError) -> Self {
        Self::ImportError(e)
    }
}
