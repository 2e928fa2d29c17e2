//! Skeleton asset I/O, sampling, blending and palette composition.

use std::io::Cursor;

use byteorder::{LittleEndian, WriteBytesExt};
use glam::{Mat4, Quat, Vec3};
use terracore::errors::AssetError;
use terracore::skel::{Animation, Animator, Bone, BoneTransform, Keyframe, Skeleton, SkinnedMesh};

fn rot_key(rotation: Quat) -> BoneTransform {
    BoneTransform {
        position: Vec3::ZERO,
        rotation,
        scale: Vec3::ONE,
    }
}

fn offset_key(position: Vec3) -> BoneTransform {
    BoneTransform {
        position,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    }
}

/// Root plus one child bone sitting 1 m above it. Idle wiggles the root
/// about Z over 2 s, Walk about X over 1 s.
fn test_skeleton() -> Skeleton {
    let child_offset = Vec3::new(0.0, 1.0, 0.0);
    let bones = vec![
        Bone {
            name: "root".into(),
            parent: -1,
            inverse_bind: Mat4::IDENTITY,
            local_bind: BoneTransform::IDENTITY,
        },
        Bone {
            name: "spine".into(),
            parent: 0,
            inverse_bind: Mat4::from_translation(-child_offset),
            local_bind: offset_key(child_offset),
        },
    ];
    let keyframes = |end_rot: Quat, duration: f32| {
        vec![
            Keyframe {
                time: 0.0,
                transforms: vec![rot_key(Quat::IDENTITY), offset_key(child_offset)],
            },
            Keyframe {
                time: duration,
                transforms: vec![rot_key(end_rot), offset_key(child_offset)],
            },
        ]
    };
    let animations = vec![
        Animation {
            name: "Idle".into(),
            duration: 2.0,
            looping: true,
            keyframes: keyframes(Quat::from_rotation_z(std::f32::consts::FRAC_PI_2), 2.0),
        },
        Animation {
            name: "Walk".into(),
            duration: 1.0,
            looping: true,
            keyframes: keyframes(Quat::from_rotation_x(std::f32::consts::FRAC_PI_2), 1.0),
        },
    ];
    Skeleton { bones, animations }
}

fn assert_same_rotation(a: Quat, b: Quat) {
    assert!(a.dot(b).abs() > 1.0 - 1e-5, "{a:?} != {b:?}");
}

// ---------------------------------------------------------------------------
// Sampling
// ---------------------------------------------------------------------------

#[test]
fn sampling_interpolates_between_the_bracketing_keyframes() {
    let skel = test_skeleton();
    let mut pose = vec![BoneTransform::IDENTITY; 2];
    skel.sample_into(0, 0.6, &mut pose);

    let expected = Quat::IDENTITY
        .slerp(Quat::from_rotation_z(std::f32::consts::FRAC_PI_2), 0.3);
    assert_same_rotation(pose[0].rotation, expected);
}

#[test]
fn sampling_past_the_last_keyframe_holds_it() {
    let skel = test_skeleton();
    let mut pose = vec![BoneTransform::IDENTITY; 2];
    skel.sample_into(1, 5.0, &mut pose);
    assert_same_rotation(
        pose[0].rotation,
        Quat::from_rotation_x(std::f32::consts::FRAC_PI_2),
    );
}

#[test]
fn sampled_quaternions_stay_unit_length() {
    let skel = test_skeleton();
    let mut pose = vec![BoneTransform::IDENTITY; 2];
    for anim in 0..skel.animations.len() {
        let duration = skel.animations[anim].duration;
        let mut t = 0.0;
        while t <= duration {
            skel.sample_into(anim, t, &mut pose);
            for bt in &pose {
                assert!((bt.rotation.length() - 1.0).abs() <= 1e-5);
            }
            t += 0.05;
        }
    }
}

// ---------------------------------------------------------------------------
// Animator: clock, blending, palette
// ---------------------------------------------------------------------------

#[test]
fn cross_fade_blends_both_animations_at_their_own_times() {
    let skel = test_skeleton();
    let mut animator = Animator::new(&skel);

    animator.play(0, 0.0); // Idle
    animator.advance(&skel, 0.5);
    animator.play(1, 0.2); // Walk, 0.2 s fade
    animator.advance(&skel, 0.1);

    // At this point Idle has advanced to 0.6, Walk to 0.1, and the fade is
    // halfway through.
    let mut idle_pose = vec![BoneTransform::IDENTITY; 2];
    let mut walk_pose = vec![BoneTransform::IDENTITY; 2];
    skel.sample_into(0, 0.6, &mut idle_pose);
    skel.sample_into(1, 0.1, &mut walk_pose);

    for b in 0..2 {
        let expected = idle_pose[b].rotation.slerp(walk_pose[b].rotation, 0.5);
        assert_same_rotation(animator.pose()[b].rotation, expected);
    }
}

#[test]
fn blend_expires_and_drops_the_previous_animation() {
    let skel = test_skeleton();
    let mut animator = Animator::new(&skel);
    animator.play(0, 0.0);
    animator.advance(&skel, 0.5);
    animator.play(1, 0.2);
    animator.advance(&skel, 0.3); // past the fade

    let mut walk_pose = vec![BoneTransform::IDENTITY; 2];
    skel.sample_into(1, 0.3, &mut walk_pose);
    assert_same_rotation(animator.pose()[0].rotation, walk_pose[0].rotation);
}

#[test]
fn looping_clock_wraps_and_nonlooping_clamps() {
    let mut skel = test_skeleton();
    skel.animations[1].looping = false;

    let mut animator = Animator::new(&skel);
    animator.play(0, 0.0);
    animator.advance(&skel, 4.25); // Idle loops (duration 2)
    assert!((animator.time() - 0.25).abs() < 1e-5);
    assert!(!animator.finished());

    animator.play(1, 0.0);
    animator.advance(&skel, 1.5); // Walk clamps (duration 1)
    assert_eq!(animator.time(), 1.0);
    assert!(animator.finished());
    animator.advance(&skel, 0.5);
    assert_eq!(animator.time(), 1.0);
    assert!(animator.finished());
}

#[test]
fn palette_rotates_child_bones_around_their_parent() {
    let skel = test_skeleton();
    let mut animator = Animator::new(&skel);
    animator.play(0, 0.0);
    // A hair short of the duration: Idle loops, so exactly 2.0 would wrap
    // back to the start pose.
    animator.advance(&skel, 1.9999);

    // Root is now (almost) rotated 90 degrees about Z, so the child sits
    // at (-1, 0, 0) and its skinning matrix carries bind-pose points
    // there.
    let child_world = animator.global(1).w_axis.truncate();
    assert!((child_world - Vec3::new(-1.0, 0.0, 0.0)).length() < 1e-3);

    let skinned = animator.final_matrices()[1].transform_point3(Vec3::new(0.0, 1.0, 0.0));
    assert!((skinned - Vec3::new(-1.0, 0.0, 0.0)).length() < 1e-3);
}

#[test]
fn play_by_name_resolves_known_names_only() {
    let skel = test_skeleton();
    let mut animator = Animator::new(&skel);
    assert!(animator.play_by_name(&skel, "Walk", 0.0));
    assert_eq!(animator.current(), Some(1));
    assert!(!animator.play_by_name(&skel, "Swim", 0.0));
    assert_eq!(animator.current(), Some(1));
}

// ---------------------------------------------------------------------------
// Binary loader
// ---------------------------------------------------------------------------

fn push_name(buf: &mut Vec<u8>, name: &str) {
    let mut raw = [0u8; 32];
    raw[..name.len()].copy_from_slice(name.as_bytes());
    buf.extend_from_slice(&raw);
}

fn push_transform(buf: &mut Vec<u8>, t: &BoneTransform) {
    for v in [t.position.x, t.position.y, t.position.z] {
        buf.write_f32::<LittleEndian>(v).unwrap();
    }
    for v in [t.rotation.x, t.rotation.y, t.rotation.z, t.rotation.w] {
        buf.write_f32::<LittleEndian>(v).unwrap();
    }
    for v in [t.scale.x, t.scale.y, t.scale.z] {
        buf.write_f32::<LittleEndian>(v).unwrap();
    }
}

/// One bone, one two-keyframe animation.
fn skel_bytes(time1: f32, quat: Quat) -> Vec<u8> {
    let mut b: Vec<u8> = Vec::new();
    b.extend_from_slice(b"SKEL");
    b.write_i32::<LittleEndian>(1).unwrap();

    push_name(&mut b, "root");
    b.write_i32::<LittleEndian>(-1).unwrap();
    for v in Mat4::IDENTITY.to_cols_array() {
        b.write_f32::<LittleEndian>(v).unwrap();
    }
    push_transform(&mut b, &offset_key(Vec3::new(1.0, 2.0, 3.0)));

    b.write_i32::<LittleEndian>(1).unwrap(); // animation count
    push_name(&mut b, "Idle");
    b.write_f32::<LittleEndian>(1.0).unwrap(); // duration
    b.write_u8(1).unwrap(); // looping
    b.write_i32::<LittleEndian>(2).unwrap(); // keyframes
    b.write_f32::<LittleEndian>(0.0).unwrap();
    push_transform(&mut b, &rot_key(Quat::IDENTITY));
    b.write_f32::<LittleEndian>(time1).unwrap();
    push_transform(&mut b, &rot_key(quat));
    b
}

#[test]
fn loader_round_trips_a_synthetic_skeleton() {
    let bytes = skel_bytes(0.5, Quat::from_rotation_y(1.0));
    let skel = Skeleton::read_from(&mut Cursor::new(bytes)).unwrap();

    assert_eq!(skel.bones.len(), 1);
    assert_eq!(skel.bones[0].name, "root");
    assert_eq!(skel.bones[0].parent, -1);
    assert_eq!(skel.bones[0].local_bind.position, Vec3::new(1.0, 2.0, 3.0));
    assert_eq!(skel.animations.len(), 1);
    assert_eq!(skel.animations[0].name, "Idle");
    assert!(skel.animations[0].looping);
    assert_eq!(skel.animations[0].keyframes.len(), 2);
    assert_same_rotation(
        skel.animations[0].keyframes[1].transforms[0].rotation,
        Quat::from_rotation_y(1.0),
    );
}

#[test]
fn loader_rejects_bad_magic() {
    let mut bytes = skel_bytes(0.5, Quat::IDENTITY);
    bytes[0] = b'X';
    assert!(matches!(
        Skeleton::read_from(&mut Cursor::new(bytes)),
        Err(AssetError::Malformed(_))
    ));
}

#[test]
fn loader_rejects_nonmonotonic_timestamps() {
    let bytes = skel_bytes(0.0, Quat::IDENTITY); // second key also at t = 0
    assert!(matches!(
        Skeleton::read_from(&mut Cursor::new(bytes)),
        Err(AssetError::Malformed(_))
    ));
}

#[test]
fn loader_rejects_denormal_quaternions() {
    let bytes = skel_bytes(0.5, Quat::from_xyzw(0.0, 0.0, 0.0, 2.0));
    assert!(matches!(
        Skeleton::read_from(&mut Cursor::new(bytes)),
        Err(AssetError::Malformed(_))
    ));
}

#[test]
fn loader_rejects_forward_parent_references() {
    let mut bytes = skel_bytes(0.5, Quat::IDENTITY);
    // Bone 0's parent field sits right after magic + count + name.
    let parent_off = 4 + 4 + 32;
    bytes[parent_off..parent_off + 4].copy_from_slice(&5i32.to_le_bytes());
    assert!(matches!(
        Skeleton::read_from(&mut Cursor::new(bytes)),
        Err(AssetError::Malformed(_))
    ));
}

#[test]
fn loader_reports_truncation_as_io() {
    let mut bytes = skel_bytes(0.5, Quat::IDENTITY);
    bytes.truncate(bytes.len() - 10);
    assert!(matches!(
        Skeleton::read_from(&mut Cursor::new(bytes)),
        Err(AssetError::Io(_))
    ));
}

// ---------------------------------------------------------------------------
// Skinned mesh loader
// ---------------------------------------------------------------------------

fn smsh_bytes(index_past_end: bool) -> Vec<u8> {
    let mut b: Vec<u8> = Vec::new();
    b.extend_from_slice(b"SMSH");
    b.write_i32::<LittleEndian>(3).unwrap();
    b.write_i32::<LittleEndian>(3).unwrap();
    for i in 0..3 {
        for v in [i as f32, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0] {
            b.write_f32::<LittleEndian>(v).unwrap(); // pos, normal, uv
        }
        for id in [0i32, -1, -1, -1] {
            b.write_i32::<LittleEndian>(id).unwrap();
        }
        for w in [1.0f32, 0.0, 0.0, 0.0] {
            b.write_f32::<LittleEndian>(w).unwrap();
        }
    }
    let last = if index_past_end { 9 } else { 2 };
    for idx in [0u16, 1, last] {
        b.write_u16::<LittleEndian>(idx).unwrap();
    }
    b
}

#[test]
fn skinned_mesh_round_trips() {
    let mesh = SkinnedMesh::read_from(&mut Cursor::new(smsh_bytes(false))).unwrap();
    assert_eq!(mesh.vertices.len(), 3);
    assert_eq!(mesh.indices, vec![0, 1, 2]);
    assert_eq!(mesh.vertices[2].position, [2.0, 0.0, 0.0]);
    assert_eq!(mesh.vertices[0].bone_weights, [1.0, 0.0, 0.0, 0.0]);
}

#[test]
fn skinned_mesh_rejects_out_of_range_indices() {
    assert!(matches!(
        SkinnedMesh::read_from(&mut Cursor::new(smsh_bytes(true))),
        Err(AssetError::Malformed(_))
    ));
}
