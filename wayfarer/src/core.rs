pub mod app_states;
pub mod constants;
pub mod system_sets;

mod avatar;
mod camera;
mod level_loader;
mod nav;
mod overlays;
mod render;

use crate::prelude::*;
use crate::settings;
use bevy::{
    prelude::*,
    window::WindowResolution,
    winit::{UpdateMode, WinitSettings},
};
use bevy_framepace::FramepacePlugin;
use std::{process::ExitCode, time::Duration};
use system_sets::*;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

pub fn run_bevy_app() -> ExitCode {
    color_eyre::install().expect("Install color-eyre");

    // Install the custom log subscriber (must come BEFORE Bevy app launch!)
    //  to change the default Bevy log format. The tracing-log bridge also
    //  routes terracore's `log` records through the same sink.
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_ansi(true)
                .with_level(true)
                .with_target(true)
                .with_timer(fmt::time::ChronoLocal::new("%Y-%m-%d %H:%M:%S".into()))
                .compact(),
        )
        .with(EnvFilter::from_default_env())
        .init();

    log_appstate_change(AppState::Loading);

    let result = App::new()
        .insert_resource(WinitSettings {
            focused_mode: UpdateMode::reactive(Duration::from_secs_f64(1.0 / 244.0)),
            unfocused_mode: UpdateMode::reactive_low_power(Duration::from_secs_f64(1.0 / 60.0)),
        })
        .add_plugins(
            DefaultPlugins
                .build()
                .disable::<bevy::log::LogPlugin>()
                .set(ImagePlugin::default_linear())
                .set(WindowPlugin {
                    primary_window: Some(Window {
                        title: "Wayfarer".to_string(),
                        resizable: true,
                        resolution: WindowResolution::new(1280.0, 720.0),
                        ..Default::default()
                    }),
                    ..Default::default()
                }),
        )
        .add_plugins(FramepacePlugin) // caps at 60 FPS by default
        .init_state::<AppState>()
        .add_plugins((
            settings::SettingsPlugin { registered_by: "Core" },
            level_loader::LevelPlugin { registered_by: "Core" },
            render::TerrainRenderPlugin { registered_by: "Core" },
            camera::CameraPlugin { registered_by: "Core" },
            avatar::AvatarPlugin { registered_by: "Core" },
            nav::NavPlugin { registered_by: "Core" },
            overlays::OverlaysPlugin { registered_by: "Core" },
        ))
        .configure_sets(
            Startup,
            (StartupSysSet::LoadAssets, StartupSysSet::SetupScene).chain(),
        )
        .configure_sets(
            Update,
            (
                TickSysSet::Input,
                TickSysSet::Plan,
                TickSysSet::Move,
                TickSysSet::Animate,
                TickSysSet::Ik,
            )
                .chain()
                .run_if(in_state(AppState::InGame)),
        )
        .add_systems(Startup, sys_enter_game.after(StartupSysSet::SetupScene))
        .run();

    match result {
        AppExit::Success => ExitCode::SUCCESS,
        AppExit::Error(value) => ExitCode::from(value.get()),
    }
}

fn sys_enter_game(mut next_state: ResMut<NextState<AppState>>) {
    log_appstate_change(AppState::InGame);
    next_state.set(AppState::InGame);
}
