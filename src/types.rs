/// Maximum joints for a skinned mesh. This is the size of the joint matrix
/// uniform array in the vertex shader, so it can't be raised here without
/// also changing the shader. Skeletons with more joints are rejected rather
/// than truncated.
pub const MAX_JOINTS: usize = 100;

/// Maximum joint influences per vertex
pub const MAX_INFLUENCES: usize = 4;

/// Rate used when a source animation declares zero ticks per second
pub const DEFAULT_TICKS_PER_SECOND: f64 = 25.0;
