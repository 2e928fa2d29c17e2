//! Conversions between Bevy's math types and the ones `terracore` speaks.
//! The two crates pin their own glam, so the boundary goes through plain
//! component copies.

use bevy::prelude::{Mat4, Vec3};

pub trait ToCoreMath {
    type Out;
    fn to_core(&self) -> Self::Out;
}

impl ToCoreMath for Vec3 {
    type Out = glam::Vec3;
    #[inline(always)]
    fn to_core(&self) -> glam::Vec3 {
        glam::Vec3::new(self.x, self.y, self.z)
    }
}

impl ToCoreMath for Mat4 {
    type Out = glam::Mat4;
    #[inline(always)]
    fn to_core(&self) -> glam::Mat4 {
        glam::Mat4::from_cols_array(&self.to_cols_array())
    }
}

pub trait ToBevyVec {
    fn to_bevy(&self) -> Vec3;
}

impl ToBevyVec for glam::Vec3 {
    #[inline(always)]
    fn to_bevy(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }
}
