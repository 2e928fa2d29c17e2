use strum_macros::{Display, EnumString, VariantNames};

// Event severity.
#[derive(Display, EnumString, VariantNames, PartialEq)]
pub enum LogSev {
    Debug,
    DebugVerbose,
    Diagnostics,
    Error,
    Info,
    Warn,
}

impl LogSev {
    /// Short colored tag printed in the left gutter.
    fn gutter(&self) -> &'static str {
        match self {
            LogSev::Debug | LogSev::DebugVerbose => "<magenta>dbg </>",
            LogSev::Diagnostics => "<green>diag</>",
            LogSev::Error => "<red><bold>ERR </bold></>",
            LogSev::Info => "<blue>info</>",
            LogSev::Warn => "<yellow><bold>WARN</bold></>",
        }
    }
}

// Event context.
#[derive(Display, EnumString, VariantNames, PartialEq)]
pub enum LogAbout {
    AppState,
    Avatar,
    Camera,
    General,
    Input,
    Level,
    Nav,
    Overlays,
    Plugins,
    Renderer,
    Skeletal,
    Startup,
    SystemsGeneral,
}

/// Last two path components of the caller's file, plus the line. Full
/// paths bury the signal; `core/nav.rs:87` is enough to jump there.
fn short_location(loc: &std::panic::Location) -> String {
    let mut tail: Vec<&str> = loc.file().rsplit(['/', '\\']).take(2).collect();
    tail.reverse();
    format!("{}:{}", tail.join("/"), loc.line())
}

/// Emit one timestamped event: gutter tag, context, message, and a dim
/// caller suffix.
#[track_caller]
pub fn one(severity: LogSev, about: LogAbout, msg: &str) {
    let where_at = short_location(std::panic::Location::caller());
    let stamp = chrono::Local::now().format("%H:%M:%S");

    let body = match severity {
        LogSev::Error => format!("<red>{msg}</>"),
        LogSev::Warn => format!("<yellow>{msg}</>"),
        LogSev::Diagnostics => format!("<green>{msg}</>"),
        _ => msg.to_string(),
    };

    paris::log!(
        "<d>{stamp}</> {} <b>{about}</b> {body} <d>({where_at})</d>",
        severity.gutter()
    );
}
