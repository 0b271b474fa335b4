use super::types::{
    BoneBinding, ImportError, MeshSkin, RawAnimation, RawChannel, RawKey,
    SceneImport, SourceNode, VertexWeight,
};
use crate::{
    anim_error::AnimError, animation::Interpolation, transform::Transform,
};
use ahash::{HashMap, HashMapExt, HashSet, HashSetExt};
use gltf::{
    accessor::Iter,
    animation::util::ReadOutputs,
    buffer::Data,
    Document, Gltf, Node, Semantic,
};
use log::{debug, info, trace, warn};
use nalgebra_glm as glm;
use std::{fs, io, path::Path};

/// Name given to the node added above the roots of a scene that has more
/// than one
pub const SYNTHETIC_ROOT: &str = "scene.root";

fn node_name(node: &Node) -> String {
    node.name()
        .map_or_else(|| format!("node.{}", node.index()), ToString::to_string)
}

fn load_impl(path: &Path) -> Result<(Document, Vec<Data>), AnimError> {
    let base = path.parent().unwrap_or_else(|| Path::new("./"));
    let file = fs::File::open(path)?;
    let reader = io::BufReader::new(file);
    let gltf = Gltf::from_reader(reader)?;
    let buffers = gltf::import_buffers(&gltf.document, Some(base), gltf.blob)?;
    info!(
        "{:?}, base path={:?}, buffer count={}",
        path,
        base,
        buffers.len(),
    );
    Ok((gltf.document, buffers))
}

/// Loads the node hierarchy, skins and animations of a glTF file. Meshes
/// themselves are not loaded, only the bone weights of skinned meshes.
///
/// # Errors
/// May return `AnimError`
pub fn load_scene(path: &Path) -> Result<SceneImport, AnimError> {
    let (document, buffers) = load_impl(path)?;
    scene_from_document(&document, &buffers)
}

/// Same as `load_scene` for a glTF or GLB held in memory. External buffers
/// can't be resolved so all data must be embedded.
///
/// # Errors
/// May return `AnimError`
pub fn from_slice(bytes: &[u8]) -> Result<SceneImport, AnimError> {
    let Gltf { document, blob } = Gltf::from_slice(bytes)?;
    let buffers = gltf::import_buffers(&document, None, blob)?;
    scene_from_document(&document, &buffers)
}

fn scene_from_document(
    document: &Document,
    buffers: &[Data],
) -> Result<SceneImport, AnimError> {
    let scene = document
        .default_scene()
        .or_else(|| document.scenes().next())
        .ok_or(ImportError::NoScene)?;

    // Flatten the node tree with an explicit stack. Several roots are
    // joined under a synthetic root so the skeleton has a single origin.
    let mut nodes = Vec::new();
    let mut names: HashMap<usize, String> = HashMap::new();
    let mut used: HashSet<String> = HashSet::new();
    let roots: Vec<Node> = scene.nodes().collect();
    let top = if roots.len() > 1 {
        used.insert(SYNTHETIC_ROOT.to_string());
        debug!("scene has {} roots, adding {}", roots.len(), SYNTHETIC_ROOT);
        nodes.push(SourceNode {
            name: SYNTHETIC_ROOT.to_string(),
            parent: None,
            transform: Transform::identity(),
        });
        Some(0)
    } else {
        None
    };
    let mut stack: Vec<(Node, Option<usize>)> =
        roots.into_iter().rev().map(|n| (n, top)).collect();
    while let Some((node, parent)) = stack.pop() {
        if names.contains_key(&node.index()) {
            return Err(ImportError::Cycle(node.index()).into());
        }
        // Skeleton joint names must be unique
        let mut name = node_name(&node);
        while used.contains(&name) {
            let unique = format!("{}.{}", name, node.index());
            debug!("node {} name {:?} taken, using {:?}", node.index(), name, unique);
            name = unique;
        }
        used.insert(name.clone());
        let (t, r, s) = node.transform().decomposed();
        let index = nodes.len();
        nodes.push(SourceNode {
            name: name.clone(),
            parent,
            transform: Transform::new(t.into(), r.into(), s.into()),
        });
        names.insert(node.index(), name);
        let children: Vec<Node> = node.children().collect();
        for child in children.into_iter().rev() {
            stack.push((child, Some(index)));
        }
    }

    let mut meshes = Vec::new();
    for node in document.nodes() {
        if !names.contains_key(&node.index()) {
            continue;
        }
        if let (Some(mesh), Some(skin)) = (node.mesh(), node.skin()) {
            meshes.push(load_mesh_skin(&mesh, &skin, &names, buffers)?);
        }
    }

    let mut animations = Vec::new();
    for animation in document.animations() {
        animations.push(load_animation(&animation, &names, buffers)?);
    }

    info!(
        "scene nodes={} skinned meshes={} animations={}",
        nodes.len(),
        meshes.len(),
        animations.len()
    );
    Ok(SceneImport {
        nodes,
        meshes,
        animations,
    })
}

fn load_mesh_skin(
    mesh: &gltf::Mesh,
    skin: &gltf::Skin,
    names: &HashMap<usize, String>,
    buffers: &[Data],
) -> Result<MeshSkin, AnimError> {
    let reader = skin.reader(|x| Some(&buffers[x.index()]));
    let inverse_binds: Vec<glm::Mat4> = reader
        .read_inverse_bind_matrices()
        .map_or_else(Vec::new, |it| it.map(glm::Mat4::from).collect());
    if inverse_binds.is_empty() {
        warn!("skin {} has no inverse bind matrices", skin.index());
    }

    let mut bones = Vec::new();
    for (i, joint) in skin.joints().enumerate() {
        let name = names.get(&joint.index()).cloned().unwrap_or_else(|| {
            // Not in the scene. The skeleton builder reports it.
            node_name(&joint)
        });
        bones.push(BoneBinding {
            name,
            inverse_bind: inverse_binds
                .get(i)
                .copied()
                .unwrap_or_else(glm::Mat4::identity),
            weights: Vec::new(),
        });
    }

    // Vertex numbering runs on across the primitives of the mesh
    let mut vertex_offset = 0_u32;
    for p in mesh.primitives() {
        let vertex_count =
            p.get(&Semantic::Positions).map_or(0, |a| a.count());
        let reader = p.reader(|x| Some(&buffers[x.index()]));
        if let (Some(joints), Some(weights)) =
            (reader.read_joints(0), reader.read_weights(0))
        {
            for (v, (ids, w)) in
                joints.into_u16().zip(weights.into_f32()).enumerate()
            {
                trace!("vertex {} joint ids={:?} weights={:?}", v, ids, w);
                let vertex = vertex_offset
                    + u32::try_from(v)
                        .map_err(|_| ImportError::VertexOutOfRange(u32::MAX))?;
                for (&id, &weight) in ids.iter().zip(&w) {
                    if weight == 0.0 {
                        continue;
                    }
                    let bone = bones
                        .get_mut(usize::from(id))
                        .ok_or(ImportError::JointIndexOutOfRange(id.into()))?;
                    bone.weights.push(VertexWeight { vertex, weight });
                }
            }
        }
        vertex_offset += u32::try_from(vertex_count)
            .map_err(|_| ImportError::VertexOutOfRange(u32::MAX))?;
    }

    let name = mesh
        .name()
        .map_or_else(|| format!("mesh.{}", mesh.index()), ToString::to_string);
    debug!(
        "mesh {:?} skin {} bones={} vertices={}",
        name,
        skin.index(),
        bones.len(),
        vertex_offset
    );
    Ok(MeshSkin {
        name,
        vertex_count: vertex_offset as usize,
        bones,
    })
}

/// Cubic spline outputs hold an in tangent, the value and an out tangent
/// for every key. Only the value is kept.
fn spline_values<T>(
    values: Vec<T>,
    interpolation: gltf::animation::Interpolation,
) -> Vec<T> {
    if interpolation == gltf::animation::Interpolation::CubicSpline {
        values.into_iter().skip(1).step_by(3).collect()
    } else {
        values
    }
}

fn keys<T: Copy>(times: &[f32], values: &[T]) -> Vec<RawKey<T>> {
    times
        .iter()
        .zip(values)
        .map(|(&time, &value)| RawKey {
            time: f64::from(time),
            value,
        })
        .collect()
}

fn load_animation(
    animation: &gltf::Animation,
    names: &HashMap<usize, String>,
    buffers: &[Data],
) -> Result<RawAnimation, AnimError> {
    let name = animation.name().map_or_else(
        || format!("animation.{}", animation.index()),
        ToString::to_string,
    );
    let mut channels: Vec<RawChannel> = Vec::new();
    let mut by_node: HashMap<usize, usize> = HashMap::new();
    let mut duration = 0.0_f32;

    for channel in animation.channels() {
        let node = channel.target().node();
        let interpolation = channel.sampler().interpolation();
        let mode = match interpolation {
            gltf::animation::Interpolation::Step => Interpolation::Step,
            gltf::animation::Interpolation::Linear => Interpolation::Linear,
            gltf::animation::Interpolation::CubicSpline => {
                warn!("animation {:?} cubic spline read as linear", name);
                Interpolation::Linear
            }
        };
        let reader = channel.reader(|x| Some(&buffers[x.index()]));
        let times: Vec<f32> = match reader.read_inputs() {
            Some(Iter::Standard(times)) => times.collect(),
            Some(Iter::Sparse(_)) => {
                return Err(ImportError::SparseAnimation.into());
            }
            None => return Err(ImportError::NoSampler.into()),
        };
        duration = times.iter().copied().fold(duration, f32::max);

        let slot = *by_node.entry(node.index()).or_insert_with(|| {
            channels.push(RawChannel {
                node_name: names
                    .get(&node.index())
                    .cloned()
                    .unwrap_or_else(|| node_name(&node)),
                ..Default::default()
            });
            channels.len() - 1
        });
        let target = &mut channels[slot];

        match reader.read_outputs() {
            Some(ReadOutputs::Translations(it)) => {
                let values: Vec<glm::Vec3> = it.map(Into::into).collect();
                let values = spline_values(values, interpolation);
                target.translations.extend(keys(&times, &values));
                target.translation_interpolation = mode;
            }
            Some(ReadOutputs::Rotations(it)) => {
                let values: Vec<glm::Quat> =
                    it.into_f32().map(Into::into).collect();
                let values = spline_values(values, interpolation);
                target.rotations.extend(keys(&times, &values));
                target.rotation_interpolation = mode;
            }
            Some(ReadOutputs::Scales(it)) => {
                let values: Vec<glm::Vec3> = it.map(Into::into).collect();
                let values = spline_values(values, interpolation);
                target.scales.extend(keys(&times, &values));
                target.scale_interpolation = mode;
            }
            Some(ReadOutputs::MorphTargetWeights(_)) => {
                warn!("animation {:?} morph target weights skipped", name);
            }
            None => return Err(ImportError::NoSampler.into()),
        }
    }

    debug!(
        "animation {:?} channels={} duration={}s",
        name,
        channels.len(),
        duration
    );
    // glTF times are in seconds
    Ok(RawAnimation {
        name,
        duration: f64::from(duration),
        ticks_per_second: 1.0,
        channels,
    })
}
