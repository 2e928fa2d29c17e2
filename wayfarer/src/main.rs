use std::process::ExitCode;

mod core;
pub mod logger;
mod prelude;
mod settings;

#[macro_use]
pub mod util_lib;

fn main() -> ExitCode {
    println!("Starting Bevy app.");
    core::run_bevy_app()
}
