pub mod frustum;
pub mod height_field;
pub mod level;
pub mod world;

pub use frustum::Frustum;
pub use height_field::HeightField;
pub use level::{LevelDescriptor, LoadedLevel};
pub use world::ChunkedWorld;
