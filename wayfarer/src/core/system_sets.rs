use bevy::ecs::schedule::SystemSet;

#[derive(SystemSet, Debug, Clone, Hash, PartialEq, Eq)]
pub enum StartupSysSet {
    LoadAssets,
    SetupScene,
}

/// One gameplay tick, in the only order that is correct: input first,
/// then planning, then movement, then the animator, then IK on top of the
/// freshly composed pose.
#[derive(SystemSet, Debug, Clone, Hash, PartialEq, Eq)]
pub enum TickSysSet {
    Input,
    Plan,
    Move,
    Animate,
    Ik,
}
