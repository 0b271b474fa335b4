use crate::{anim_error::AnimError, skeleton::Skeleton, transform::Transform};
use nalgebra_glm as glm;

/// Converts local joint transforms to model space by composing each joint
/// with its parent: `global = parent_global * local`. A root uses its local
/// transform as is.
///
/// Joints are stored parents first so a single forward pass is enough and
/// every parent is finished before its children read it. The result only
/// depends on the skeleton and `locals`.
///
/// # Errors
/// Returns `AnimError::JointCountMismatch` if either slice doesn't have one
/// entry per joint. `output` is not written in that case.
pub fn local_to_model(
    skeleton: &Skeleton,
    locals: &[Transform],
    output: &mut [glm::Mat4],
) -> Result<(), AnimError> {
    let expected = skeleton.joint_count();
    for found in [locals.len(), output.len()] {
        if found != expected {
            return Err(AnimError::JointCountMismatch { expected, found });
        }
    }

    for (index, (joint, local)) in skeleton.joints().iter().zip(locals).enumerate()
    {
        let local = local.to_mat4();
        output[index] = match joint.parent {
            Some(parent) => output[parent] * local,
            None => local,
        };
    }
    Ok(())
}

/// Model space transforms of the bind pose
///
/// # Errors
/// Passes on any error from `local_to_model`.
pub fn bind_pose_globals(skeleton: &Skeleton) -> Result<Vec<glm::Mat4>, AnimError> {
    let mut globals = vec![glm::Mat4::identity(); skeleton.joint_count()];
    local_to_model(skeleton, &skeleton.bind_pose(), &mut globals)?;
    Ok(globals)
}

#[cfg(test)]
mod tests {
    use crate::{
        import::{BoneBinding, SourceNode},
        skeleton,
        transform::Transform,
    };
    use nalgebra_glm as glm;

    const EPSILON: f32 = 0.0001_f32;

    fn mat_eq(a: &glm::Mat4, b: &glm::Mat4) {
        let c = glm::equal_columns_eps(a, b, EPSILON);
        assert!(c.x && c.y && c.z && c.w, "{a:?} != {b:?}");
    }

    fn transform(t: [f32; 3], angle: f32) -> Transform {
        Transform::new(
            glm::vec3(t[0], t[1], t[2]),
            glm::quat_angle_axis(angle, &glm::vec3(0.0, 0.0, 1.0)),
            glm::vec3(1.0, 1.0, 1.0),
        )
    }

    #[test]
    fn composes_parent_then_local() {
        let nodes = vec![
            SourceNode {
                name: "root".to_string(),
                parent: None,
                transform: transform([1.0, 0.0, 0.0], 0.0),
            },
            SourceNode {
                name: "upper".to_string(),
                parent: Some(0),
                transform: transform([0.0, 2.0, 0.0], std::f32::consts::FRAC_PI_2),
            },
            SourceNode {
                name: "lower".to_string(),
                parent: Some(1),
                transform: transform([0.0, 3.0, 0.0], 0.0),
            },
            SourceNode {
                name: "other".to_string(),
                parent: None,
                transform: transform([0.0, 0.0, 5.0], 0.0),
            },
        ];
        let skeleton =
            skeleton::build(&nodes, std::iter::empty::<&BoneBinding>()).unwrap();
        let locals = skeleton.bind_pose();
        let mut globals = vec![glm::Mat4::identity(); 4];
        super::local_to_model(&skeleton, &locals, &mut globals).unwrap();

        mat_eq(&globals[0], &locals[0].to_mat4());
        mat_eq(&globals[3], &locals[3].to_mat4());
        for child in 1..3 {
            let parent = skeleton.joints()[child].parent.unwrap();
            mat_eq(&globals[child], &(globals[parent] * locals[child].to_mat4()));
        }

        // Rotated 90 degrees about z by "upper", so "lower" ends up along -x
        let origin = globals[2] * glm::vec4(0.0, 0.0, 0.0, 1.0);
        let c = glm::equal_eps(&origin.xyz(), &glm::vec3(-2.0, 2.0, 0.0), EPSILON);
        assert!(c.x && c.y && c.z, "{origin:?}");

        // Same input, same output
        let mut again = vec![glm::Mat4::identity(); 4];
        super::local_to_model(&skeleton, &locals, &mut again).unwrap();
        assert_eq!(globals, again);
        assert_eq!(globals, super::bind_pose_globals(&skeleton).unwrap());
    }

    #[test]
    fn size_mismatch() {
        let nodes = vec![SourceNode {
            name: "root".to_string(),
            parent: None,
            transform: Transform::identity(),
        }];
        let skeleton =
            skeleton::build(&nodes, std::iter::empty::<&BoneBinding>()).unwrap();
        let mut globals = vec![glm::Mat4::identity(); 1];
        assert!(super::local_to_model(&skeleton, &[], &mut globals).is_err());
        let mut globals = vec![glm::Mat4::identity(); 2];
        assert!(super::local_to_model(&skeleton, &skeleton.bind_pose(), &mut globals)
            .is_err());
    }
}
