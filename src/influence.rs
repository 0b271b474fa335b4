use crate::{
    import::{ImportError, MeshSkin},
    skeleton::Skeleton,
    types::MAX_INFLUENCES,
};
use bytemuck::{Pod, Zeroable};
use log::debug;
use nalgebra_glm as glm;

/// Joint id marking an unused influence slot
pub const NO_JOINT: i32 = -1;

/// Joint ids and weights for one vertex, in the layout the vertex shader
/// reads. Unused slots have id `NO_JOINT` and weight 0.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Zeroable, Pod)]
pub struct VertexInfluences {
    pub joint_ids: [i32; MAX_INFLUENCES],
    pub weights: [f32; MAX_INFLUENCES],
}

impl Default for VertexInfluences {
    fn default() -> Self {
        Self {
            joint_ids: [NO_JOINT; MAX_INFLUENCES],
            weights: [0.0; MAX_INFLUENCES],
        }
    }
}

impl VertexInfluences {
    /// Puts an influence in the first free slot. Returns false if all slots
    /// are taken.
    pub fn add(&mut self, joint: i32, weight: f32) -> bool {
        let Some(slot) = self.joint_ids.iter().position(|&id| id == NO_JOINT)
        else {
            return false;
        };
        self.joint_ids[slot] = joint;
        self.weights[slot] = weight;
        true
    }
}

/// Collects per vertex influences for a mesh from its bones' vertex weights.
/// Each vertex keeps the first `MAX_INFLUENCES` non-zero weights it is given,
/// in bone order. Joint ids are skeleton joint indices.
///
/// # Errors
/// Returns `ImportError::MissingJoint` for a bone not in the skeleton or
/// `ImportError::VertexOutOfRange` for a weight on a vertex the mesh doesn't
/// have.
pub fn gather(
    mesh: &MeshSkin,
    skeleton: &Skeleton,
) -> Result<Vec<VertexInfluences>, ImportError> {
    let mut out = vec![VertexInfluences::default(); mesh.vertex_count];
    let mut dropped = 0_usize;
    for bone in &mesh.bones {
        let joint = skeleton
            .find(&bone.name)
            .and_then(|j| i32::try_from(j).ok())
            .ok_or_else(|| ImportError::MissingJoint(bone.name.clone()))?;
        for w in &bone.weights {
            if w.weight <= 0.0 {
                continue;
            }
            let vertex = out
                .get_mut(w.vertex as usize)
                .ok_or(ImportError::VertexOutOfRange(w.vertex))?;
            if !vertex.add(joint, w.weight) {
                dropped += 1;
            }
        }
    }
    if dropped > 0 {
        debug!(
            "mesh {:?}: {} influences beyond {} per vertex dropped",
            mesh.name, dropped, MAX_INFLUENCES
        );
    }
    Ok(out)
}

/// Skins one position on the CPU the way the vertex shader does: a weighted
/// sum of the position transformed by each influencing joint's matrix.
///
/// Empty slots are skipped. If any joint id is at or above `max_joints`, or
/// past the end of `matrices`, the position is returned unskinned, as is a
/// vertex with no weight at all.
#[must_use]
pub fn skin_position(
    position: &glm::Vec3,
    influences: &VertexInfluences,
    matrices: &[glm::Mat4],
    max_joints: usize,
) -> glm::Vec3 {
    let p = glm::vec4(position.x, position.y, position.z, 1.0_f32);
    let mut total = glm::Vec4::zeros();
    let mut weight_sum = 0.0_f32;
    for (&id, &weight) in influences.joint_ids.iter().zip(&influences.weights) {
        // Negative ids are empty slots
        let Ok(index) = usize::try_from(id) else {
            continue;
        };
        if index >= max_joints {
            return *position;
        }
        let Some(m) = matrices.get(index) else {
            return *position;
        };
        total += m * p * weight;
        weight_sum += weight;
    }
    if weight_sum <= 0.0 {
        *position
    } else {
        total.xyz()
    }
}

#[cfg(test)]
mod tests {
    use super::{VertexInfluences, NO_JOINT};
    use crate::{
        import::{BoneBinding, ImportError, MeshSkin, SourceNode, VertexWeight},
        skeleton,
        transform::Transform,
    };
    use nalgebra_glm as glm;

    fn skeleton_with(names: &[&str]) -> skeleton::Skeleton {
        let nodes: Vec<SourceNode> = names
            .iter()
            .enumerate()
            .map(|(i, name)| SourceNode {
                name: (*name).to_string(),
                parent: if i == 0 { None } else { Some(0) },
                transform: Transform::identity(),
            })
            .collect();
        skeleton::build(&nodes, std::iter::empty::<&BoneBinding>()).unwrap()
    }

    fn bone(name: &str, weights: &[(u32, f32)]) -> BoneBinding {
        BoneBinding {
            name: name.to_string(),
            inverse_bind: glm::Mat4::identity(),
            weights: weights
                .iter()
                .map(|&(vertex, weight)| VertexWeight { vertex, weight })
                .collect(),
        }
    }

    #[test]
    fn gather_caps_influences() {
        let skeleton = skeleton_with(&["root", "a", "b", "c", "d", "e"]);
        let mesh = MeshSkin {
            name: "body".to_string(),
            vertex_count: 2,
            bones: ["a", "b", "c", "d", "e"]
                .iter()
                .map(|n| bone(n, &[(0, 0.2), (1, 0.0)]))
                .collect(),
        };
        let influences = super::gather(&mesh, &skeleton).unwrap();
        assert_eq!(influences[0].joint_ids, [1, 2, 3, 4]);
        assert_eq!(influences[0].weights, [0.2; 4]);
        // Zero weights are not influences
        assert_eq!(influences[1], VertexInfluences::default());
    }

    #[test]
    fn gather_errors() {
        let skeleton = skeleton_with(&["root"]);
        let mesh = MeshSkin {
            name: "body".to_string(),
            vertex_count: 1,
            bones: vec![bone("root", &[(3, 1.0)])],
        };
        assert!(matches!(
            super::gather(&mesh, &skeleton),
            Err(ImportError::VertexOutOfRange(3))
        ));
        let mesh = MeshSkin {
            name: "body".to_string(),
            vertex_count: 1,
            bones: vec![bone("nobody", &[(0, 1.0)])],
        };
        assert!(matches!(
            super::gather(&mesh, &skeleton),
            Err(ImportError::MissingJoint(_))
        ));
    }

    #[test]
    fn blends_weighted_matrices() {
        let matrices = [
            glm::translation(&glm::vec3(2.0, 0.0, 0.0)),
            glm::translation(&glm::vec3(0.0, 4.0, 0.0)),
        ];
        let influences = VertexInfluences {
            joint_ids: [0, 1, NO_JOINT, NO_JOINT],
            weights: [0.5, 0.5, 0.0, 0.0],
        };
        let p = super::skin_position(&glm::vec3(1.0, 1.0, 1.0), &influences, &matrices, 2);
        let c = glm::equal_eps(&p, &glm::vec3(2.0, 3.0, 1.0), 1e-5);
        assert!(c.x && c.y && c.z);
    }

    #[test]
    fn joint_at_cap_is_unskinned() {
        let matrices = vec![glm::translation(&glm::vec3(9.0, 9.0, 9.0)); 8];
        let position = glm::vec3(1.0, 2.0, 3.0);
        let at_cap = VertexInfluences {
            joint_ids: [0, 4, NO_JOINT, NO_JOINT],
            weights: [0.5, 0.5, 0.0, 0.0],
        };
        // Cap of 4 even though more matrices were supplied
        assert_eq!(super::skin_position(&position, &at_cap, &matrices, 4), position);
        // Past the end of the matrix array
        let past_end = VertexInfluences {
            joint_ids: [i32::MAX, NO_JOINT, NO_JOINT, NO_JOINT],
            weights: [1.0, 0.0, 0.0, 0.0],
        };
        assert_eq!(
            super::skin_position(&position, &past_end, &matrices, usize::MAX),
            position
        );
        // No influences at all
        assert_eq!(
            super::skin_position(&position, &VertexInfluences::default(), &matrices, 4),
            position
        );
    }
}
