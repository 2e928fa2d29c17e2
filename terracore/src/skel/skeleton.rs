use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};
use glam::{Mat4, Quat, Vec3};

use crate::errors::AssetError;

/// Compile-time cap on bones per skeleton; the matrix palette and every
/// scratch pose buffer are sized against it.
pub const MAX_BONES: usize = 64;

const MAX_ANIMATIONS: i32 = 256;
const MAX_KEYFRAMES: i32 = 16384;

/// Animation quaternions are renormalized on load; anything further from
/// unit length than this is treated as corrupt data, not drift.
const UNIT_QUAT_TOLERANCE: f32 = 1e-2;

const MAGIC: &[u8; 4] = b"SKEL";

/// A bone-local transform. Quaternions are xyzw everywhere in the system;
/// asset load is the only conversion site.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoneTransform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl BoneTransform {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    /// Component-wise interpolation: lerp for position and scale, slerp
    /// for rotation.
    pub fn lerp(a: &Self, b: &Self, t: f32) -> Self {
        Self {
            position: a.position.lerp(b.position, t),
            rotation: a.rotation.slerp(b.rotation, t).normalize(),
            scale: a.scale.lerp(b.scale, t),
        }
    }

    pub fn to_mat4(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }
}

#[derive(Clone, Debug)]
pub struct Bone {
    pub name: String,
    /// Parent bone index, -1 for the root. Always less than the bone's own
    /// index: parents come first, so one forward pass composes the chain.
    pub parent: i32,
    pub inverse_bind: Mat4,
    pub local_bind: BoneTransform,
}

#[derive(Clone, Debug)]
pub struct Keyframe {
    pub time: f32,
    /// One transform per bone, indexed like `Skeleton::bones`.
    pub transforms: Vec<BoneTransform>,
}

#[derive(Clone, Debug)]
pub struct Animation {
    pub name: String,
    pub duration: f32,
    pub looping: bool,
    pub keyframes: Vec<Keyframe>,
}

/// A shared skeletal asset: bind-pose bones plus their animations.
/// Immutable after load; per-avatar state lives in [`super::Animator`].
pub struct Skeleton {
    pub bones: Vec<Bone>,
    pub animations: Vec<Animation>,
}

impl Skeleton {
    pub fn load(path: &Path) -> Result<Self, AssetError> {
        let file = File::open(path).map_err(|e| AssetError::from_open(e, path))?;
        Self::read_from(&mut BufReader::new(file))
    }

    pub fn read_from<R: Read>(r: &mut R) -> Result<Self, AssetError> {
        let mut magic = [0u8; 4];
        r.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(AssetError::malformed(format!(
                "skeleton magic is {magic:02x?}, expected \"SKEL\""
            )));
        }

        let bone_count = r.read_i32::<LittleEndian>()?;
        if bone_count <= 0 || bone_count as usize > MAX_BONES {
            return Err(AssetError::malformed(format!(
                "skeleton bone count {bone_count} outside 1..={MAX_BONES}"
            )));
        }

        let mut bones = Vec::with_capacity(bone_count as usize);
        for i in 0..bone_count {
            let name = read_name32(r)?;
            let parent = r.read_i32::<LittleEndian>()?;
            if parent != -1 && (parent < 0 || parent >= i) {
                return Err(AssetError::malformed(format!(
                    "bone '{name}' has parent {parent}, breaking topological order"
                )));
            }
            let inverse_bind = read_mat4(r)?;
            let local_bind = read_transform(r)
                .map_err(|e| with_bone_context(e, &name))?;
            bones.push(Bone {
                name,
                parent,
                inverse_bind,
                local_bind,
            });
        }

        let animation_count = r.read_i32::<LittleEndian>()?;
        if animation_count < 0 || animation_count > MAX_ANIMATIONS {
            return Err(AssetError::malformed(format!(
                "animation count {animation_count} outside 0..={MAX_ANIMATIONS}"
            )));
        }

        let mut animations = Vec::with_capacity(animation_count as usize);
        for _ in 0..animation_count {
            let name = read_name32(r)?;
            let duration = r.read_f32::<LittleEndian>()?;
            let looping = match r.read_u8()? {
                0 => false,
                1 => true,
                other => {
                    return Err(AssetError::malformed(format!(
                        "animation '{name}' loop flag is {other}"
                    )));
                }
            };
            let keyframe_count = r.read_i32::<LittleEndian>()?;
            if keyframe_count <= 0 || keyframe_count > MAX_KEYFRAMES {
                return Err(AssetError::malformed(format!(
                    "animation '{name}' keyframe count {keyframe_count} outside 1..={MAX_KEYFRAMES}"
                )));
            }

            let mut keyframes = Vec::with_capacity(keyframe_count as usize);
            let mut prev_time = f32::NEG_INFINITY;
            for _ in 0..keyframe_count {
                let time = r.read_f32::<LittleEndian>()?;
                if time <= prev_time {
                    return Err(AssetError::malformed(format!(
                        "animation '{name}' timestamps not increasing at t={time}"
                    )));
                }
                prev_time = time;

                let mut transforms = Vec::with_capacity(bone_count as usize);
                for _ in 0..bone_count {
                    transforms
                        .push(read_transform(r).map_err(|e| with_bone_context(e, &name))?);
                }
                keyframes.push(Keyframe { time, transforms });
            }
            animations.push(Animation {
                name,
                duration,
                looping,
                keyframes,
            });
        }

        Ok(Self { bones, animations })
    }

    pub fn bone_index(&self, name: &str) -> Option<usize> {
        self.bones.iter().position(|b| b.name == name)
    }

    pub fn animation_index(&self, name: &str) -> Option<usize> {
        self.animations.iter().position(|a| a.name == name)
    }

    /// Global bind-pose transform of a bone, composed up the parent chain.
    pub fn bind_global(&self, bone: usize) -> Mat4 {
        let b = &self.bones[bone];
        let local = b.local_bind.to_mat4();
        if b.parent >= 0 {
            self.bind_global(b.parent as usize) * local
        } else {
            local
        }
    }

    /// Sample animation `anim` at time `t` into `out` (one transform per
    /// bone). Past the last keyframe both bracket keys are the last one.
    pub fn sample_into(&self, anim: usize, t: f32, out: &mut [BoneTransform]) {
        let animation = &self.animations[anim];
        let keys = &animation.keyframes;
        debug_assert_eq!(out.len(), self.bones.len());

        let after = keys.iter().position(|k| k.time > t).unwrap_or(keys.len());
        let (k0, k1) = if after == 0 {
            (0, 0)
        } else if after == keys.len() {
            (keys.len() - 1, keys.len() - 1)
        } else {
            (after - 1, after)
        };

        let span = keys[k1].time - keys[k0].time;
        let alpha = if span > 0.0 {
            (t - keys[k0].time) / span
        } else {
            0.0
        };

        for (b, slot) in out.iter_mut().enumerate() {
            *slot = BoneTransform::lerp(
                &keys[k0].transforms[b],
                &keys[k1].transforms[b],
                alpha,
            );
        }
    }
}

fn with_bone_context(err: AssetError, owner: &str) -> AssetError {
    match err {
        AssetError::Malformed(msg) => AssetError::Malformed(format!("'{owner}': {msg}")),
        other => other,
    }
}

fn read_name32<R: Read>(r: &mut R) -> Result<String, AssetError> {
    let mut raw = [0u8; 32];
    r.read_exact(&mut raw)?;
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    String::from_utf8(raw[..end].to_vec())
        .map_err(|_| AssetError::malformed("name is not valid UTF-8"))
}

fn read_mat4<R: Read>(r: &mut R) -> Result<Mat4, AssetError> {
    let mut cols = [0f32; 16];
    for v in &mut cols {
        *v = r.read_f32::<LittleEndian>()?;
    }
    Ok(Mat4::from_cols_array(&cols))
}

fn read_vec3<R: Read>(r: &mut R) -> Result<Vec3, AssetError> {
    Ok(Vec3::new(
        r.read_f32::<LittleEndian>()?,
        r.read_f32::<LittleEndian>()?,
        r.read_f32::<LittleEndian>()?,
    ))
}

/// Read pos/rot/scale; the quaternion is checked against the unit
/// tolerance and renormalized.
fn read_transform<R: Read>(r: &mut R) -> Result<BoneTransform, AssetError> {
    let position = read_vec3(r)?;
    let rotation = Quat::from_xyzw(
        r.read_f32::<LittleEndian>()?,
        r.read_f32::<LittleEndian>()?,
        r.read_f32::<LittleEndian>()?,
        r.read_f32::<LittleEndian>()?,
    );
    let scale = read_vec3(r)?;

    let len = rotation.length();
    if !len.is_finite() || (len - 1.0).abs() > UNIT_QUAT_TOLERANCE {
        return Err(AssetError::malformed(format!(
            "quaternion length {len} beyond unit tolerance"
        )));
    }
    Ok(BoneTransform {
        position,
        rotation: rotation.normalize(),
        scale,
    })
}
