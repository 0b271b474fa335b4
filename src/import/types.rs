use crate::{animation::Interpolation, transform::Transform};
use nalgebra_glm as glm;

/// A node of the source scene hierarchy. Nodes are stored in an arena and
/// refer to their parent by index.
#[derive(Clone, Debug)]
pub struct SourceNode {
    pub name: String,
    pub parent: Option<usize>,
    pub transform: Transform,
}

/// One vertex influenced by a bone
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VertexWeight {
    pub vertex: u32,
    pub weight: f32,
}

/// Skin data for a bone of one mesh. The bone is matched to a skeleton joint
/// by name.
#[derive(Clone, Debug)]
pub struct BoneBinding {
    pub name: String,
    pub inverse_bind: glm::Mat4,
    pub weights: Vec<VertexWeight>,
}

/// Bones of a single skinned mesh
#[derive(Clone, Debug, Default)]
pub struct MeshSkin {
    pub name: String,
    pub vertex_count: usize,
    pub bones: Vec<BoneBinding>,
}

/// Keyframe with a time in source ticks
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RawKey<T> {
    pub time: f64,
    pub value: T,
}

/// Keyframes for one node. Any of the lists may be empty.
#[derive(Clone, Debug, Default)]
pub struct RawChannel {
    pub node_name: String,
    pub translations: Vec<RawKey<glm::Vec3>>,
    pub rotations: Vec<RawKey<glm::Quat>>,
    pub scales: Vec<RawKey<glm::Vec3>>,
    pub translation_interpolation: Interpolation,
    pub rotation_interpolation: Interpolation,
    pub scale_interpolation: Interpolation,
}

/// Animation as provided by the scene importer. Times and duration are in
/// ticks. A `ticks_per_second` of zero means the source did not declare one.
#[derive(Clone, Debug, Default)]
pub struct RawAnimation {
    pub name: String,
    pub duration: f64,
    pub ticks_per_second: f64,
    pub channels: Vec<RawChannel>,
}

/// Everything the animation pipeline needs from an imported scene
#[derive(Clone, Debug, Default)]
pub struct SceneImport {
    pub nodes: Vec<SourceNode>,
    pub meshes: Vec<MeshSkin>,
    pub animations: Vec<RawAnimation>,
}

impl SceneImport {
    /// Iterates the bones of every mesh
    pub fn bones(&self) -> impl Iterator<Item = &BoneBinding> {
        self.meshes.iter().flat_map(|m| m.bones.iter())
    }
}

/// Errors specific to importing data. `AnimError` has a `From` trait to
/// handle these.
#[derive(Debug)]
pub enum ImportError {
    EmptyHierarchy,
    NoRootNode,
    NoScene,
    ParentOutOfRange(usize),
    Cycle(usize),
    DuplicateName(String),
    MissingJoint(String),
    SingularRoot,
    InvalidDuration(String),
    VertexOutOfRange(u32),
    JointIndexOutOfRange(usize),
    SparseAnimation,
    NoSampler,
}

impl std::fmt::Display for ImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::EmptyHierarchy => write!(f, "node hierarchy is empty"),
            Self::NoRootNode => write!(f, "node hierarchy has no root node"),
            Self::NoScene => write!(f, "file contains no scene"),
            Self::ParentOutOfRange(a) => {
                write!(f, "node {a} has a parent index out of range")
            }
            Self::Cycle(a) => {
                write!(f, "node {a} is part of a cycle in the hierarchy")
            }
            Self::DuplicateName(name) => {
                write!(f, "node name {name:?} is used more than once")
            }
            Self::MissingJoint(name) => {
                write!(f, "bone {name:?} has no matching node")
            }
            Self::SingularRoot => {
                write!(f, "root node transform can not be inverted")
            }
            Self::InvalidDuration(name) => {
                write!(f, "animation {name:?} has no positive duration")
            }
            Self::VertexOutOfRange(a) => {
                write!(f, "bone weight refers to missing vertex {a}")
            }
            Self::JointIndexOutOfRange(a) => {
                write!(f, "vertex joint index {a} is not in the skin")
            }
            Self::SparseAnimation => {
                write!(f, "sparse animation data is not supported")
            }
            Self::NoSampler => {
                write!(f, "a sampler is required for animation")
            }
        }
    }
}
