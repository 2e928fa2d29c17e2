use std::path::PathBuf;
use thiserror::Error;

/// Failure loading an asset from disk. Loaders abort atomically: on error no
/// partial state is kept.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("asset missing: '{0}'")]
    Missing(PathBuf),

    #[error("malformed asset: {0}")]
    Malformed(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AssetError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }

    /// Classify an open() failure: NotFound becomes Missing, the rest stays Io.
    pub fn from_open(err: std::io::Error, path: &std::path::Path) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            Self::Missing(path.to_path_buf())
        } else {
            Self::Io(err)
        }
    }
}

/// Which end of a path query was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathEnd {
    Start,
    Goal,
}

impl std::fmt::Display for PathEnd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathEnd::Start => write!(f, "start"),
            PathEnd::Goal => write!(f, "goal"),
        }
    }
}

/// Structured planning failures. `Blocked` and `NoRoute` are ordinary
/// outcomes the caller may react to (re-pose the query, drop the request);
/// `CapacityExceeded` means the planner's fixed buffers are too small for
/// the configured window and is an operator-level calibration problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("{0} position is not walkable")]
    Blocked(PathEnd),

    #[error("no route to goal inside the planning window")]
    NoRoute,

    #[error("planner node pool exhausted")]
    CapacityExceeded,
}
