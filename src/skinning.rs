use crate::{anim_error::AnimError, skeleton::Skeleton};
use bytemuck::{Pod, Zeroable};
use nalgebra_glm as glm;

/// Column major matrix ready to copy into the shader's joint matrix array
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Zeroable, Pod)]
pub struct JointMatrix {
    pub cols: [[f32; 4]; 4],
}

impl From<&glm::Mat4> for JointMatrix {
    fn from(m: &glm::Mat4) -> Self {
        Self { cols: (*m).into() }
    }
}

/// Computes `global_inverse * global[j] * inverse_bind[j]` for every joint.
///
/// `output` is scratch space. On error it may hold a partial result and must
/// not be handed to the renderer.
///
/// # Errors
/// Returns `AnimError::JointCountMismatch` if a slice has the wrong length,
/// or `AnimError::NonFiniteMatrix` naming the first joint whose matrix
/// contains a NaN or infinity.
pub fn build_skinning_matrices(
    skeleton: &Skeleton,
    globals: &[glm::Mat4],
    output: &mut [glm::Mat4],
) -> Result<(), AnimError> {
    let expected = skeleton.joint_count();
    for found in [globals.len(), output.len()] {
        if found != expected {
            return Err(AnimError::JointCountMismatch { expected, found });
        }
    }

    let root = skeleton.global_inverse();
    for (index, ((out, global), joint)) in output
        .iter_mut()
        .zip(globals)
        .zip(skeleton.joints())
        .enumerate()
    {
        let m = root * global * joint.inverse_bind;
        if m.iter().any(|x| !x.is_finite()) {
            return Err(AnimError::NonFiniteMatrix(index));
        }
        *out = m;
    }
    Ok(())
}

/// Copies matrices into the layout used for the shader uniform array
#[must_use]
pub fn to_uniform(matrices: &[glm::Mat4]) -> Vec<JointMatrix> {
    matrices.iter().map(JointMatrix::from).collect()
}

#[cfg(test)]
mod tests {
    use crate::{
        anim_error::AnimError,
        import::{BoneBinding, SourceNode},
        pose, skeleton,
        transform::Transform,
    };
    use nalgebra_glm as glm;

    const EPSILON: f32 = 0.0001_f32;

    fn mat_eq(a: &glm::Mat4, b: &glm::Mat4) {
        let c = glm::equal_columns_eps(a, b, EPSILON);
        assert!(c.x && c.y && c.z && c.w, "{a:?} != {b:?}");
    }

    /// Root with a non-identity transform and one bone below it whose
    /// inverse bind undoes its bind pose world transform
    fn rig() -> skeleton::Skeleton {
        let root = Transform::new(
            glm::vec3(0.0, 0.0, 3.0),
            glm::quat_angle_axis(0.4, &glm::vec3(1.0, 0.0, 0.0)),
            glm::vec3(0.5, 0.5, 0.5),
        );
        let bone = Transform::new(
            glm::vec3(1.0, 2.0, 0.0),
            glm::quat_angle_axis(1.1, &glm::vec3(0.0, 1.0, 0.0)),
            glm::vec3(1.0, 1.0, 1.0),
        );
        let nodes = vec![
            SourceNode {
                name: "root".to_string(),
                parent: None,
                transform: root,
            },
            SourceNode {
                name: "bone".to_string(),
                parent: Some(0),
                transform: bone,
            },
        ];
        // Inverse bind is relative to the root, which is how importers
        // express it when the root carries a transform
        let inverse_bind = bone.to_mat4().try_inverse().unwrap();
        let bones = [BoneBinding {
            name: "bone".to_string(),
            inverse_bind,
            weights: Vec::new(),
        }];
        skeleton::build(&nodes, &bones).unwrap()
    }

    #[test]
    fn formula() {
        let skeleton = rig();
        let globals = pose::bind_pose_globals(&skeleton).unwrap();
        let mut output = vec![glm::Mat4::zeros(); 2];
        super::build_skinning_matrices(&skeleton, &globals, &mut output).unwrap();
        for j in 0..2 {
            let expected = skeleton.global_inverse()
                * globals[j]
                * skeleton.joints()[j].inverse_bind;
            mat_eq(&output[j], &expected);
        }
    }

    #[test]
    fn rest_pose_is_identity() {
        let skeleton = rig();
        let globals = pose::bind_pose_globals(&skeleton).unwrap();
        let mut output = vec![glm::Mat4::zeros(); 2];
        super::build_skinning_matrices(&skeleton, &globals, &mut output).unwrap();
        mat_eq(&output[1], &glm::Mat4::identity());
        // The root is pass-through with an identity inverse bind
        mat_eq(&output[0], &glm::Mat4::identity());
    }

    #[test]
    fn rejects_non_finite() {
        let skeleton = rig();
        let mut globals = pose::bind_pose_globals(&skeleton).unwrap();
        globals[1][(0, 3)] = f32::NAN;
        let mut output = vec![glm::Mat4::zeros(); 2];
        let res = super::build_skinning_matrices(&skeleton, &globals, &mut output);
        assert!(matches!(res, Err(AnimError::NonFiniteMatrix(1))));
    }

    #[test]
    fn uniform_layout() {
        let m = glm::translation(&glm::vec3(5.0, 6.0, 7.0));
        let u = super::to_uniform(&[m]);
        // Translation is in the last column
        assert_eq!(u[0].cols[3], [5.0, 6.0, 7.0, 1.0]);
        let bytes: &[u8] = bytemuck::cast_slice(&u);
        assert_eq!(bytes.len(), 64);
    }
}
