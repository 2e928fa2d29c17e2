pub mod baker;
pub mod obj;

pub use baker::{bake, bake_to_png, BakeParams, BakedHeightmap};
pub use obj::TriangleSoup;
