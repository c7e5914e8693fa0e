mod settings;

pub use settings::LauncherSettings;
