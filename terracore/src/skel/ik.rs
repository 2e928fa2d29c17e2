use glam::{Mat4, Quat, Vec3};

use super::animator::Animator;
use super::skeleton::Skeleton;

/// Default knee half-plane: model-space forward. A fixed pole gives
/// stylized consistency; callers chasing continuity can feed back the
/// previous frame's knee direction instead.
pub const DEFAULT_POLE: Vec3 = Vec3::Z;

/// Reach clamping margin. Targets beyond `upper + lower - EPS` straighten
/// the leg; closer than `|upper - lower| + EPS` fold it.
const REACH_EPS: f32 = 1e-5;

const DEGENERATE_EPS: f32 = 1e-6;

/// Analytic two-bone IK for one leg chain (hip -> knee -> foot). Solves a
/// knee position geometrically, then rewrites the hip and knee local
/// rotations so the animated pose bends into it. Segment lengths are
/// cached from the bind pose once.
pub struct TwoBoneIK {
    hip: usize,
    knee: usize,
    foot: usize,
    len_upper: f32,
    len_lower: f32,
    pole: Vec3,
    target: Vec3,
}

impl TwoBoneIK {
    /// The chain must be directly parented hip -> knee -> foot.
    pub fn new(skeleton: &Skeleton, hip: usize, knee: usize, foot: usize) -> Self {
        debug_assert_eq!(skeleton.bones[knee].parent, hip as i32);
        debug_assert_eq!(skeleton.bones[foot].parent, knee as i32);

        let hip_pos = translation(skeleton.bind_global(hip));
        let knee_pos = translation(skeleton.bind_global(knee));
        let foot_pos = translation(skeleton.bind_global(foot));

        Self {
            hip,
            knee,
            foot,
            len_upper: hip_pos.distance(knee_pos),
            len_lower: knee_pos.distance(foot_pos),
            pole: DEFAULT_POLE,
            target: foot_pos,
        }
    }

    pub fn hip(&self) -> usize {
        self.hip
    }

    pub fn knee(&self) -> usize {
        self.knee
    }

    pub fn foot(&self) -> usize {
        self.foot
    }

    /// Foot target in model space.
    pub fn set_target(&mut self, model_point: Vec3) {
        self.target = model_point;
    }

    /// Foot target in world space; `model` is the avatar's model matrix.
    pub fn set_target_world(&mut self, world_point: Vec3, model: &Mat4) {
        self.target = model.inverse().transform_point3(world_point);
    }

    pub fn set_pole(&mut self, pole: Vec3) {
        self.pole = pole;
    }

    /// Overlay the solve onto the animator's current pose at the given
    /// blend weight, then recompose the palette. Must run after
    /// `Animator::advance` for the frame; solving against stale globals is
    /// the classic ordering bug this API shape exists to prevent.
    pub fn apply(&self, skeleton: &Skeleton, animator: &mut Animator, weight: f32) {
        if weight <= 0.0 {
            return;
        }
        let weight = weight.min(1.0);

        let hip_global = animator.global(self.hip);
        let knee_global_pre = animator.global(self.knee);
        let hip_pos = translation(hip_global);
        let knee_cur = translation(knee_global_pre);
        let foot_cur = translation(animator.global(self.foot));

        // Knee placement by the law of cosines, inside the reach band.
        let to_target = self.target - hip_pos;
        let dist_raw = to_target.length();
        let dist = dist_raw.clamp(
            (self.len_upper - self.len_lower).abs() + REACH_EPS,
            self.len_upper + self.len_lower - REACH_EPS,
        );
        let target_dir = if dist_raw > DEGENERATE_EPS {
            to_target / dist_raw
        } else {
            // Target sitting on the hip: aim the chain straight down.
            Vec3::NEG_Y
        };

        let cos_hip = ((self.len_upper * self.len_upper + dist * dist
            - self.len_lower * self.len_lower)
            / (2.0 * self.len_upper * dist))
            .clamp(-1.0, 1.0);
        let proj = self.len_upper * cos_hip;
        let perp = (self.len_upper * self.len_upper - proj * proj).max(0.0).sqrt();

        // Basis around the hip->target axis; the pole picks the knee's
        // half-plane. Parallel poles fall through +Y, then +X.
        let mut ortho = target_dir.cross(self.pole);
        if ortho.length_squared() < DEGENERATE_EPS {
            ortho = target_dir.cross(Vec3::Y);
        }
        if ortho.length_squared() < DEGENERATE_EPS {
            ortho = target_dir.cross(Vec3::X);
        }
        let ortho = ortho.normalize();
        let knee_dir = ortho.cross(target_dir).normalize();
        let knee_new = hip_pos + target_dir * proj + knee_dir * perp;

        // Hip: world-space delta aligning the thigh with the new knee,
        // written back as a local rotation against the hip's parent.
        let thigh_cur = (knee_cur - hip_pos).normalize_or_zero();
        let thigh_new = (knee_new - hip_pos).normalize_or_zero();
        if thigh_cur == Vec3::ZERO || thigh_new == Vec3::ZERO {
            return;
        }
        let hip_parent_rot = self.parent_world_rotation(skeleton, animator, self.hip);
        let hip_world_new = Quat::from_rotation_arc(thigh_cur, thigh_new) * rotation(hip_global);
        let hip_local_new = (hip_parent_rot.inverse() * hip_world_new).normalize();

        let pose = animator.pose_mut();
        pose[self.hip].rotation = pose[self.hip]
            .rotation
            .slerp(hip_local_new, weight)
            .normalize();

        // Recompose just hip and knee globals to read the knee's settled
        // position before aiming the shin.
        let hip_parent_global = match skeleton.bones[self.hip].parent {
            p if p >= 0 => animator.global(p as usize),
            _ => Mat4::IDENTITY,
        };
        let hip_global = hip_parent_global * animator.pose()[self.hip].to_mat4();
        let knee_global = hip_global * animator.pose()[self.knee].to_mat4();
        let knee_settled = translation(knee_global);

        // Knee: same treatment for the shin. The delta comes from the
        // pre-edit shin direction, so it multiplies the pre-edit knee
        // world rotation; only the local conversion uses the updated hip.
        let shin_cur = (foot_cur - knee_cur).normalize_or_zero();
        let shin_new = (self.target - knee_settled).normalize_or_zero();
        if shin_cur != Vec3::ZERO && shin_new != Vec3::ZERO {
            let knee_world_new =
                Quat::from_rotation_arc(shin_cur, shin_new) * rotation(knee_global_pre);
            let knee_local_new = (rotation(hip_global).inverse() * knee_world_new).normalize();
            let pose = animator.pose_mut();
            pose[self.knee].rotation = pose[self.knee]
                .rotation
                .slerp(knee_local_new, weight)
                .normalize();
        }

        // Re-bake the whole palette from the edited locals.
        animator.recompose(skeleton);
    }

    fn parent_world_rotation(
        &self,
        skeleton: &Skeleton,
        animator: &Animator,
        bone: usize,
    ) -> Quat {
        match skeleton.bones[bone].parent {
            p if p >= 0 => rotation(animator.global(p as usize)),
            _ => Quat::IDENTITY,
        }
    }
}

#[inline(always)]
fn translation(m: Mat4) -> Vec3 {
    m.w_axis.truncate()
}

#[inline(always)]
fn rotation(m: Mat4) -> Quat {
    m.to_scale_rotation_translation().1
}
