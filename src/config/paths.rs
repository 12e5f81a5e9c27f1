//! Cross-platform application paths using the `dirs` crate.
//!
//! Layout:
//!
//! Config dir (settings):
//!   Windows: %APPDATA%\voice-to-story\
//!   macOS:   ~/Library/Application Support/voice-to-story/
//!   Linux:   ~/.config/voice-to-story/
//!
//! Data dir (Whisper models):
//!   Windows: %LOCALAPPDATA%\voice-to-story\models\
//!   macOS:   ~/Library/Application Support/voice-to-story/models/
//!   Linux:   ~/.local/share/voice-to-story/models/

use std::path::PathBuf;

/// Holds all resolved application directory/file paths.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Directory holding `settings.toml`.
    pub config_dir: PathBuf,
    /// Full path to `settings.toml`.
    pub settings_file: PathBuf,
    /// Directory for downloaded GGML model files.
    pub models_dir: PathBuf,
}

impl AppPaths {
    const APP_NAME: &'static str = "voice-to-story";

    /// Resolves all paths using the `dirs` crate.
    ///
    /// Falls back to the current directory if the platform cannot provide a
    /// standard path.
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        Self {
            settings_file: config_dir.join("settings.toml"),
            config_dir,
            models_dir: data_dir.join("models"),
        }
    }

    /// Resolve the on-disk GGML file for a model name.
    ///
    /// A name that already looks like a path (contains a separator or ends in
    /// `.bin`) is returned as-is; anything else is treated as a model id and
    /// mapped to `<models_dir>/ggml-<id>.bin`.
    pub fn model_file(&self, model: &str) -> PathBuf {
        let looks_like_path =
            model.contains(std::path::MAIN_SEPARATOR) || model.contains('/') || model.ends_with(".bin");
        if looks_like_path {
            PathBuf::from(model)
        } else {
            self.models_dir.join(format!("ggml-{model}.bin"))
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}
