pub const ASSET_FOLDER: &str = "assets/";

/// Where the avatar appears on level entry.
pub const AVATAR_START_XZ: (f32, f32) = (0.0, 0.0);

/// Capsule center height above the ground sample.
pub const AVATAR_GROUND_OFFSET: f32 = 0.9;

/// How close (XZ meters) counts as having reached a waypoint.
pub const WAYPOINT_REACH_DISTANCE: f32 = 0.15;

/// Cross-fade used for Idle <-> Walk switches, in seconds.
pub const ANIM_BLEND_SECONDS: f32 = 0.2;

pub const FOOT_IK_WEIGHT: f32 = 1.0;

/// Vertex grid per rendered chunk mesh (quads per side).
pub const CHUNK_MESH_QUADS: u32 = 64;
