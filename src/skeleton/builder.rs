use super::types::{Joint, Skeleton};
use crate::import::{BoneBinding, ImportError, SourceNode};
use ahash::{HashMap, HashMapExt};
use log::{debug, info, trace};
use nalgebra_glm as glm;
use smallvec::SmallVec;

/// Builds a skeleton from a source node hierarchy and the bones referenced by
/// mesh skins.
///
/// Every source node becomes a joint, not only the ones named by a bone,
/// because nodes that don't deform the mesh may still be animated and carry
/// that motion to their children. Joints are numbered in depth first
/// pre-order starting from each root in turn, so parents always come first.
/// Bones fill in the inverse bind matrix of the joint with the same name.
/// Joints no bone refers to are marked as pass-through.
///
/// # Errors
/// Returns `ImportError` if the hierarchy is empty, has no root, has a bad
/// parent index or a cycle, repeats a node name, a bone names a node that
/// isn't in the hierarchy, or the root transform can't be inverted. Nothing
/// is returned in those cases.
pub fn build<'a, I>(nodes: &[SourceNode], bones: I) -> Result<Skeleton, ImportError>
where
    I: IntoIterator<Item = &'a BoneBinding>,
{
    if nodes.is_empty() {
        return Err(ImportError::EmptyHierarchy);
    }

    // Child lists in source order
    let mut children: Vec<SmallVec<[usize; 4]>> = vec![SmallVec::new(); nodes.len()];
    let mut roots = Vec::new();
    for (index, node) in nodes.iter().enumerate() {
        match node.parent {
            None => roots.push(index),
            Some(parent) if parent == index => {
                return Err(ImportError::Cycle(index));
            }
            Some(parent) => {
                let siblings = children
                    .get_mut(parent)
                    .ok_or(ImportError::ParentOutOfRange(index))?;
                siblings.push(index);
            }
        }
    }
    if roots.is_empty() {
        return Err(ImportError::NoRootNode);
    }

    // Walk with an explicit stack. Children are pushed in reverse so they
    // are visited in source order.
    let mut joints: Vec<Joint> = Vec::with_capacity(nodes.len());
    let mut names = HashMap::with_capacity(nodes.len());
    let mut visited = vec![false; nodes.len()];
    let mut stack: SmallVec<[(usize, Option<usize>); 16]> =
        roots.iter().rev().map(|&r| (r, None)).collect();
    while let Some((node_index, parent)) = stack.pop() {
        if visited[node_index] {
            return Err(ImportError::Cycle(node_index));
        }
        visited[node_index] = true;

        let node = &nodes[node_index];
        let joint_index = joints.len();
        if names.insert(node.name.clone(), joint_index).is_some() {
            return Err(ImportError::DuplicateName(node.name.clone()));
        }
        trace!(
            "node {} {:?} -> joint {} parent {:?}",
            node_index,
            node.name,
            joint_index,
            parent
        );
        joints.push(Joint {
            name: node.name.clone(),
            parent,
            bind_local: node.transform,
            inverse_bind: glm::Mat4::identity(),
            pass_through: true,
        });
        for &child in children[node_index].iter().rev() {
            stack.push((child, Some(joint_index)));
        }
    }

    // Anything not reached from a root hangs off a cycle
    if let Some(unreached) = visited.iter().position(|v| !v) {
        return Err(ImportError::Cycle(unreached));
    }

    // Fix up the inverse binds. The same bone may appear in several meshes,
    // in which case the last one wins.
    let mut bone_count = 0_usize;
    for bone in bones {
        let Some(&joint_index) = names.get(&bone.name) else {
            return Err(ImportError::MissingJoint(bone.name.clone()));
        };
        let joint = &mut joints[joint_index];
        if joint.pass_through {
            bone_count += 1;
        } else {
            debug!("bone {:?} bound more than once", bone.name);
        }
        joint.inverse_bind = bone.inverse_bind;
        joint.pass_through = false;
    }

    // The first joint is always the first root
    let global_inverse = joints[0]
        .bind_local
        .to_mat4()
        .try_inverse()
        .ok_or(ImportError::SingularRoot)?;

    info!(
        "skeleton joints={} roots={} bones={} pass-through={}",
        joints.len(),
        roots.len(),
        bone_count,
        joints.len() - bone_count,
    );

    Ok(Skeleton::from_parts(joints, names, global_inverse))
}
