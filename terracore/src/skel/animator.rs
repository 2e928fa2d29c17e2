use glam::Mat4;

use super::skeleton::{BoneTransform, Skeleton};

#[derive(Clone, Copy)]
struct PreviousAnim {
    anim: usize,
    time: f32,
}

/// Per-avatar animation state: playback position, cross-fade bookkeeping
/// and the scratch pose/matrix buffers the renderer and the IK pass read.
/// The skeleton itself is shared and immutable; it is passed into every
/// call instead of being owned here.
pub struct Animator {
    current: Option<usize>,
    time: f32,
    speed: f32,
    finished: bool,
    previous: Option<PreviousAnim>,
    blend_elapsed: f32,
    blend_duration: f32,
    /// Blended bone-local pose for this frame. IK edits land here before
    /// the recomposition pass.
    pose: Vec<BoneTransform>,
    prev_pose: Vec<BoneTransform>,
    globals: Vec<Mat4>,
    finals: Vec<Mat4>,
}

impl Animator {
    pub fn new(skeleton: &Skeleton) -> Self {
        let bone_count = skeleton.bones.len();
        let mut animator = Self {
            current: None,
            time: 0.0,
            speed: 1.0,
            finished: false,
            previous: None,
            blend_elapsed: 0.0,
            blend_duration: 0.0,
            pose: skeleton.bones.iter().map(|b| b.local_bind).collect(),
            prev_pose: vec![BoneTransform::IDENTITY; bone_count],
            globals: vec![Mat4::IDENTITY; bone_count],
            finals: vec![Mat4::IDENTITY; bone_count],
        };
        // Until something plays, the palette is the bind pose.
        animator.recompose(skeleton);
        animator
    }

    /// Start playing `anim`, cross-fading from whatever was playing over
    /// `blend_duration` seconds. Playing the current animation again is a
    /// no-op.
    pub fn play(&mut self, anim: usize, blend_duration: f32) {
        if self.current == Some(anim) {
            return;
        }
        self.previous = match self.current {
            Some(prev) if blend_duration > 0.0 => Some(PreviousAnim {
                anim: prev,
                time: self.time,
            }),
            _ => None,
        };
        self.blend_elapsed = 0.0;
        self.blend_duration = blend_duration;
        self.current = Some(anim);
        self.time = 0.0;
        self.finished = false;
    }

    /// Name-based `play`; returns false (and changes nothing) for an
    /// unknown animation.
    pub fn play_by_name(&mut self, skeleton: &Skeleton, name: &str, blend_duration: f32) -> bool {
        match skeleton.animation_index(name) {
            Some(idx) => {
                self.play(idx, blend_duration);
                true
            }
            None => false,
        }
    }

    pub fn set_speed(&mut self, speed: f32) {
        self.speed = speed;
    }

    pub fn current(&self) -> Option<usize> {
        self.current
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    /// True once a non-looping animation has reached its end. Scheduling a
    /// successor is the caller's business; the animator never chains on
    /// its own.
    pub fn finished(&self) -> bool {
        self.finished
    }

    /// Advance playback, sample (and blend) the pose, and rebuild the
    /// matrix palette.
    pub fn advance(&mut self, skeleton: &Skeleton, dt: f32) {
        let Some(current) = self.current else {
            return;
        };

        self.time = advance_clock(
            self.time + dt * self.speed,
            &skeleton.animations[current],
            &mut self.finished,
        );
        skeleton.sample_into(current, self.time, &mut self.pose);

        if let Some(prev) = &mut self.previous {
            let mut prev_finished = false;
            prev.time = advance_clock(
                prev.time + dt * self.speed,
                &skeleton.animations[prev.anim],
                &mut prev_finished,
            );
            skeleton.sample_into(prev.anim, prev.time, &mut self.prev_pose);

            self.blend_elapsed += dt;
            let alpha = (self.blend_elapsed / self.blend_duration).min(1.0);
            for (slot, prev_t) in self.pose.iter_mut().zip(&self.prev_pose) {
                *slot = BoneTransform::lerp(prev_t, slot, alpha);
            }
            if alpha >= 1.0 {
                self.previous = None;
            }
        }

        self.recompose(skeleton);
    }

    /// Compose globals up the parent chain and multiply in the inverse
    /// binds. Bones are stored parents-first, so one forward pass is
    /// enough. Also the IK step that re-bakes its local-rotation edits.
    pub fn recompose(&mut self, skeleton: &Skeleton) {
        for (b, bone) in skeleton.bones.iter().enumerate() {
            let local = self.pose[b].to_mat4();
            self.globals[b] = if bone.parent >= 0 {
                self.globals[bone.parent as usize] * local
            } else {
                local
            };
            self.finals[b] = self.globals[b] * bone.inverse_bind;
        }
    }

    pub fn pose(&self) -> &[BoneTransform] {
        &self.pose
    }

    pub fn pose_mut(&mut self) -> &mut [BoneTransform] {
        &mut self.pose
    }

    /// Global (model-space) transform of one bone, as of the last
    /// recomposition.
    pub fn global(&self, bone: usize) -> Mat4 {
        self.globals[bone]
    }

    /// The matrix palette for skinning. Valid between ticks; reading it
    /// mid-composition is the one thing the ownership rules forbid.
    pub fn final_matrices(&self) -> &[Mat4] {
        &self.finals
    }
}

/// Wrap or clamp an advanced clock against an animation's duration.
fn advance_clock(t: f32, anim: &super::skeleton::Animation, finished: &mut bool) -> f32 {
    if anim.duration <= 0.0 {
        return 0.0;
    }
    if t < anim.duration {
        return t;
    }
    if anim.looping {
        t % anim.duration
    } else {
        *finished = true;
        anim.duration
    }
}
