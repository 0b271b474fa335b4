use crate::transform::Transform;
use ahash::HashMap;
use nalgebra_glm as glm;

#[derive(Clone, Debug)]
pub struct Joint {
    pub name: String,
    /// Always a smaller index than this joint's own
    pub parent: Option<usize>,
    pub bind_local: Transform,
    pub inverse_bind: glm::Mat4,
    /// No mesh is skinned to this joint. It only passes its transform on to
    /// its children and its inverse bind is the identity.
    pub pass_through: bool,
}

/// Immutable joint hierarchy. Joints are ordered so that every parent comes
/// before its children, which lets the hierarchy be evaluated in one forward
/// pass. Created by `skeleton::build`.
#[derive(Clone, Debug)]
pub struct Skeleton {
    joints: Vec<Joint>,
    names: HashMap<String, usize>,
    global_inverse: glm::Mat4,
}

impl Skeleton {
    pub(crate) fn from_parts(
        joints: Vec<Joint>,
        names: HashMap<String, usize>,
        global_inverse: glm::Mat4,
    ) -> Self {
        Self {
            joints,
            names,
            global_inverse,
        }
    }

    #[must_use]
    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    #[must_use]
    pub fn joints(&self) -> &[Joint] {
        &self.joints
    }

    #[must_use]
    pub fn joint(&self, index: usize) -> Option<&Joint> {
        self.joints.get(index)
    }

    /// Index of the joint with the given name
    #[must_use]
    pub fn find(&self, name: &str) -> Option<usize> {
        self.names.get(name).copied()
    }

    /// Inverse of the first root's bind transform. Applied to every skinning
    /// matrix to bring the result back into model space.
    #[must_use]
    pub const fn global_inverse(&self) -> &glm::Mat4 {
        &self.global_inverse
    }

    /// Indices of joints without a parent
    pub fn roots(&self) -> impl Iterator<Item = usize> + '_ {
        self.joints
            .iter()
            .enumerate()
            .filter(|(_, j)| j.parent.is_none())
            .map(|(i, _)| i)
    }

    /// Bind pose local transforms for every joint
    #[must_use]
    pub fn bind_pose(&self) -> Vec<Transform> {
        self.joints.iter().map(|j| j.bind_local).collect()
    }
}
