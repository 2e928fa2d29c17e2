//! Two-bone IK: reach, clamping and degenerate-input behavior.

use glam::{Mat4, Quat, Vec3};
use terracore::skel::{Animator, Bone, BoneTransform, Skeleton, TwoBoneIK};

fn offset_bone(name: &str, parent: i32, offset: Vec3, bind_global: Vec3) -> Bone {
    Bone {
        name: name.into(),
        parent,
        inverse_bind: Mat4::from_translation(-bind_global),
        local_bind: BoneTransform {
            position: offset,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        },
    }
}

/// Straight-down leg: hip at (0,1,0), knee at (0,0.5,0), foot at the
/// origin. Both segments are 0.5 m.
fn leg_skeleton() -> Skeleton {
    Skeleton {
        bones: vec![
            offset_bone("hip", -1, Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.0, 1.0, 0.0)),
            offset_bone("knee", 0, Vec3::new(0.0, -0.5, 0.0), Vec3::new(0.0, 0.5, 0.0)),
            offset_bone("foot", 1, Vec3::new(0.0, -0.5, 0.0), Vec3::ZERO),
        ],
        animations: vec![],
    }
}

fn joint_pos(animator: &Animator, bone: usize) -> Vec3 {
    animator.global(bone).w_axis.truncate()
}

fn assert_finite(v: Vec3) {
    assert!(v.is_finite(), "non-finite joint position {v:?}");
}

// ---------------------------------------------------------------------------
// Reachable targets
// ---------------------------------------------------------------------------

#[test]
fn full_reach_target_plants_the_foot_with_a_forward_knee() {
    let skel = leg_skeleton();
    let mut animator = Animator::new(&skel);
    let mut ik = TwoBoneIK::new(&skel, 0, 1, 2);

    ik.set_target(Vec3::ZERO);
    ik.apply(&skel, &mut animator, 1.0);

    let knee = joint_pos(&animator, 1);
    let foot = joint_pos(&animator, 2);
    assert!((knee.y - 0.5).abs() < 1e-3, "knee at {knee:?}");
    assert!(knee.z >= 0.0, "knee bent against the pole: {knee:?}");
    assert!(foot.distance(Vec3::ZERO) < 1e-4, "foot at {foot:?}");
}

#[test]
fn bent_leg_target_is_hit_within_tolerance() {
    let skel = leg_skeleton();
    let mut animator = Animator::new(&skel);
    let mut ik = TwoBoneIK::new(&skel, 0, 1, 2);

    let target = Vec3::new(0.2, 0.3, 0.1);
    ik.set_target(target);
    ik.apply(&skel, &mut animator, 1.0);

    let foot = joint_pos(&animator, 2);
    assert!(foot.distance(target) < 1e-3, "foot at {foot:?}");

    // Segment lengths must survive the solve.
    let hip = joint_pos(&animator, 0);
    let knee = joint_pos(&animator, 1);
    assert!((hip.distance(knee) - 0.5).abs() < 1e-4);
    assert!((knee.distance(foot) - 0.5).abs() < 1e-4);
}

#[test]
fn world_space_targets_convert_through_the_model_matrix() {
    let skel = leg_skeleton();
    let mut animator = Animator::new(&skel);
    let mut ik = TwoBoneIK::new(&skel, 0, 1, 2);

    let model = Mat4::from_translation(Vec3::new(10.0, 0.0, 5.0));
    ik.set_target_world(Vec3::new(10.0, 0.0, 5.0), &model);
    ik.apply(&skel, &mut animator, 1.0);

    let foot = joint_pos(&animator, 2);
    assert!(foot.distance(Vec3::ZERO) < 1e-4, "foot at {foot:?}");
}

#[test]
fn zero_weight_leaves_the_pose_untouched() {
    let skel = leg_skeleton();
    let mut animator = Animator::new(&skel);
    let before: Vec<Quat> = animator.pose().iter().map(|t| t.rotation).collect();

    let mut ik = TwoBoneIK::new(&skel, 0, 1, 2);
    ik.set_target(Vec3::new(0.3, 0.2, 0.0));
    ik.apply(&skel, &mut animator, 0.0);

    let after: Vec<Quat> = animator.pose().iter().map(|t| t.rotation).collect();
    assert_eq!(before, after);
}

// ---------------------------------------------------------------------------
// Clamping and degeneracies
// ---------------------------------------------------------------------------

#[test]
fn unreachable_target_straightens_the_leg() {
    let skel = leg_skeleton();
    let mut animator = Animator::new(&skel);
    let mut ik = TwoBoneIK::new(&skel, 0, 1, 2);

    ik.set_target(Vec3::new(0.0, -2.0, 0.0));
    ik.apply(&skel, &mut animator, 1.0);

    let hip = joint_pos(&animator, 0);
    let knee = joint_pos(&animator, 1);
    let foot = joint_pos(&animator, 2);
    assert_finite(foot);
    // Fully extended toward the target: the knee sits on the hip-foot
    // line at max reach.
    assert!((hip.distance(foot) - 1.0).abs() < 1e-3);
    assert!((hip.distance(knee) + knee.distance(foot) - hip.distance(foot)).abs() < 1e-3);
}

#[test]
fn pole_parallel_to_the_target_falls_back_without_nan() {
    let skel = leg_skeleton();
    let mut animator = Animator::new(&skel);
    let mut ik = TwoBoneIK::new(&skel, 0, 1, 2);

    // Pole straight down, target straight down: the primary basis is
    // degenerate and the +Y fallback is too; the solver lands on +X.
    ik.set_pole(Vec3::NEG_Y);
    ik.set_target(Vec3::new(0.0, 0.2, 0.0));
    ik.apply(&skel, &mut animator, 1.0);

    let knee = joint_pos(&animator, 1);
    let foot = joint_pos(&animator, 2);
    assert_finite(knee);
    assert_finite(foot);
    assert!(knee.x > 0.0, "expected the +X fallback, knee at {knee:?}");
    assert!(foot.distance(Vec3::new(0.0, 0.2, 0.0)) < 1e-3);
}

#[test]
fn target_on_the_hip_folds_without_nan() {
    let skel = leg_skeleton();
    let mut animator = Animator::new(&skel);
    let mut ik = TwoBoneIK::new(&skel, 0, 1, 2);

    ik.set_target(Vec3::new(0.0, 1.0, 0.0)); // exactly the hip position
    ik.apply(&skel, &mut animator, 1.0);

    let knee = joint_pos(&animator, 1);
    let foot = joint_pos(&animator, 2);
    assert_finite(knee);
    assert_finite(foot);
    // Fully folded: the foot comes back up to the hip.
    assert!(foot.distance(Vec3::new(0.0, 1.0, 0.0)) < 1e-3);
}

#[test]
fn default_pole_prefers_a_forward_knee() {
    let skel = leg_skeleton();
    let mut animator = Animator::new(&skel);
    let mut ik = TwoBoneIK::new(&skel, 0, 1, 2);

    ik.set_target(Vec3::new(0.0, 0.2, 0.0));
    ik.apply(&skel, &mut animator, 1.0);

    let knee = joint_pos(&animator, 1);
    assert!(knee.z > 0.1, "knee should bend toward +Z, got {knee:?}");
}
