use std::path::{Path, PathBuf};

use crate::logger::{self, LogAbout, LogSev};
use crate::prelude::*;
use bevy::prelude::*;
use color_eyre::eyre::{self, WrapErr};
use serde::Deserialize;

const CONFIG_FILE_NAME: &str = "settings.toml";

#[derive(Clone, Debug, Deserialize, Resource)]
pub struct Settings {
    pub paths: SectPaths,
    pub input: SectInput,
    pub window: SectWindow,
    pub debug: SectDebug,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SectPaths {
    pub level: PathBuf,
    pub skeleton: PathBuf,
    pub skinned_mesh: PathBuf,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SectInput {
    pub move_speed: f32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SectWindow {
    pub width: f32,
    pub height: f32,
}

/// Seeds for the runtime diagnostic toggles; never written back.
#[derive(Clone, Debug, Deserialize)]
pub struct SectDebug {
    pub path_overlay: bool,
    pub path_grid_overlay: bool,
    pub foot_ik: bool,
}

impl Settings {
    /// Read `assets/settings.toml` relative to the working directory.
    pub fn read() -> eyre::Result<Self> {
        let path = Path::new(crate::core::constants::ASSET_FOLDER).join(CONFIG_FILE_NAME);
        let text = std::fs::read_to_string(&path)
            .wrap_err_with(|| format!("read settings at '{}'", path.display()))?;
        toml::from_str(&text).wrap_err("parse settings TOML")
    }
}

// ----

pub struct SettingsPlugin {
    pub registered_by: &'static str,
}
impl_tracked_plugin!(SettingsPlugin);
impl Plugin for SettingsPlugin {
    fn build(&self, app: &mut App) {
        log_plugin_build(self);
        app.add_systems(PreStartup, sys_read_settings)
            .add_systems(Startup, sys_size_windows);
    }
}

/// Settings gate everything else (asset paths above all), so a bad file
/// stops the app here with the full error chain.
fn sys_read_settings(mut commands: Commands) {
    let settings = match Settings::read() {
        Ok(settings) => settings,
        Err(report) => panic!("settings unavailable: {report:#}"),
    };
    logger::one(
        LogSev::Info,
        LogAbout::Startup,
        &format!(
            "Settings in: {}x{} window, level '{}'.",
            settings.window.width,
            settings.window.height,
            settings.paths.level.display()
        ),
    );
    commands.insert_resource(settings);
}

fn sys_size_windows(settings: Res<Settings>, mut windows: Query<&mut Window>) {
    for mut window in windows.iter_mut() {
        window
            .resolution
            .set(settings.window.width, settings.window.height);
    }
}
