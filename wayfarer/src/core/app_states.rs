use crate::logger::{self, LogAbout, LogSev};
use bevy::state::state::States;

#[derive(States, Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum AppState {
    #[default]
    Loading,
    InGame,
}

/// Announce a state switch through the app logger.
#[track_caller]
pub fn log_appstate_change(to: AppState) {
    logger::one(
        LogSev::Debug,
        LogAbout::AppState,
        &format!("App state -> {to:?}."),
    );
}
