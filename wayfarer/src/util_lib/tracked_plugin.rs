use crate::logger;
use bevy::app::Plugin;

pub trait TrackedPlugin: Plugin {
    fn registered_by(&self) -> &str;
}

pub fn log_plugin_build<T: TrackedPlugin>(plugin: &T) {
    let full_name = std::any::type_name::<T>();
    let bare_name = full_name.rsplit("::").next().unwrap();

    logger::one(
        logger::LogSev::Debug,
        logger::LogAbout::Plugins,
        &format!("Build: {bare_name} (registered by: {}).", plugin.registered_by()),
    );
}

#[macro_export]
macro_rules! impl_tracked_plugin {
    ($plugin:ty) => {
        impl TrackedPlugin for $plugin {
            fn registered_by(&self) -> &str {
                self.registered_by
            }
        }
    };
}
