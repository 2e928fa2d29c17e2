pub mod core_math;

#[macro_use]
pub mod tracked_plugin;
