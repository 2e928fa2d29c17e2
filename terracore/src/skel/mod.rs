pub mod animator;
pub mod ik;
pub mod mesh;
pub mod skeleton;

pub use animator::Animator;
pub use ik::TwoBoneIK;
pub use mesh::{SkinnedMesh, SkinnedVertex};
pub use skeleton::{Animation, Bone, BoneTransform, Keyframe, Skeleton};
