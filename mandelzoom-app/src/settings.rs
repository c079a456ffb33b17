use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use mandelzoom_core::{FractalKind, ViewSettings};

// ---------------------------------------------------------------------------
// Julia seed mode
// ---------------------------------------------------------------------------

/// Where the Julia view takes its seed from when the Mandelbrot view moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JuliaSeedMode {
    /// The Mandelbrot view centre, marked by the crosshair.
    #[default]
    Crosshair,
    /// The point under the pointer.
    Pointer,
}

// ---------------------------------------------------------------------------
// Application settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default)]
    pub mandelbrot: ViewSettings,
    #[serde(default = "default_julia_view")]
    pub julia: ViewSettings,
    #[serde(default)]
    pub julia_enabled: bool,
    /// Side of the square Julia surface.
    #[serde(default = "default_julia_size")]
    pub julia_size: u32,
    #[serde(default)]
    pub julia_seed_mode: JuliaSeedMode,
}

fn default_width() -> u32 {
    800
}
fn default_height() -> u32 {
    600
}
fn default_julia_view() -> ViewSettings {
    ViewSettings::for_kind(FractalKind::Julia)
}
fn default_julia_size() -> u32 {
    300
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            mandelbrot: ViewSettings::default(),
            julia: default_julia_view(),
            julia_enabled: false,
            julia_size: default_julia_size(),
            julia_seed_mode: JuliaSeedMode::default(),
        }
    }
}

impl AppSettings {
    /// Load settings from `path`, falling back to defaults on any failure.
    pub fn load_from(path: &Path) -> Self {
        if path.exists() {
            match fs::read_to_string(path) {
                Ok(json) => match serde_json::from_str::<AppSettings>(&json) {
                    Ok(settings) => {
                        info!("Loaded settings from {}", path.display());
                        return settings;
                    }
                    Err(e) => error!("Failed to parse settings: {e}"),
                },
                Err(e) => error!("Failed to read settings file: {e}"),
            }
        } else {
            debug!("No settings file at {}", path.display());
        }
        Self::default()
    }

    /// Persist settings to `path`. Failures are logged, never returned.
    pub fn save_to(&self, path: &Path) {
        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                error!("Failed to create config directory: {e}");
                return;
            }
        }
        match serde_json::to_string_pretty(self) {
            Ok(json) => {
                if let Err(e) = fs::write(path, &json) {
                    error!("Failed to write settings: {e}");
                } else {
                    debug!("Saved settings to {}", path.display());
                }
            }
            Err(e) => error!("Failed to serialize settings: {e}"),
        }
    }
}

/// `settings.json` in the platform config directory, or the working
/// directory when none can be determined.
pub fn default_path() -> PathBuf {
    directories::ProjectDirs::from("", "", "Mandelzoom")
        .map(|d| d.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
        .join("settings.json")
}
