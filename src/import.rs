pub mod clip;
pub mod gltf_file;
mod options;
mod types;

// Re-exports
pub use {
    clip::{import_clip, import_clips},
    options::ImportOptions,
    types::{
        BoneBinding, ImportError, MeshSkin, RawAnimation, RawChannel, RawKey,
        SceneImport, SourceNode, VertexWeight,
    },
};
