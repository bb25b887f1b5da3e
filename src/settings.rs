//! Preview preferences
//!
//! Stored as XML in the platform config directory. Only window and tool
//! preferences live here; the stage chain itself is never persisted.

use quick_xml::de::from_str;
use quick_xml::se::to_string;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::telemetry::LogConfig;

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("XML parse error: {0}")]
    XmlParse(#[from] quick_xml::DeError),
    #[error("XML write error: {0}")]
    XmlWrite(#[from] quick_xml::SeError),
    #[error("Could not find config directory")]
    NoConfigDir,
}

fn default_render_width() -> u32 {
    1920
}

fn default_render_height() -> u32 {
    1080
}

fn default_window_width() -> u32 {
    1600
}

fn default_window_height() -> u32 {
    900
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Preferences restored at startup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename = "ShaderStackPreferences")]
pub struct PreviewSettings {
    /// Width of the offscreen render targets
    #[serde(rename = "renderWidth", default = "default_render_width")]
    pub render_width: u32,
    #[serde(rename = "renderHeight", default = "default_render_height")]
    pub render_height: u32,

    #[serde(rename = "windowWidth", default = "default_window_width")]
    pub window_width: u32,
    #[serde(rename = "windowHeight", default = "default_window_height")]
    pub window_height: u32,

    /// Filter used when `SHADER_STACK_LOG` and `RUST_LOG` are unset
    #[serde(rename = "logLevel", default = "default_log_level")]
    pub log_level: String,
    #[serde(rename = "logToFile", default)]
    pub log_to_file: bool,

    /// Directory the image import dialog opens in
    #[serde(rename = "lastImageDir", default, skip_serializing_if = "Option::is_none")]
    pub last_image_dir: Option<String>,
}

impl Default for PreviewSettings {
    fn default() -> Self {
        Self {
            render_width: default_render_width(),
            render_height: default_render_height(),
            window_width: default_window_width(),
            window_height: default_window_height(),
            log_level: default_log_level(),
            log_to_file: false,
            last_image_dir: None,
        }
    }
}

impl PreviewSettings {
    fn prefs_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut p| {
            p.push("ShaderStack");
            p.push("preferences.xml");
            p
        })
    }

    /// Load preferences from the config directory, falling back to defaults.
    pub fn load() -> Self {
        let Some(path) = Self::prefs_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }

        match Self::load_from_file(&path) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("Ignoring unreadable preferences {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn load_from_file(path: &Path) -> Result<Self, SettingsError> {
        let contents = fs::read_to_string(path)?;
        Ok(Self::from_xml(&contents)?.sanitized())
    }

    /// Save preferences to the config directory.
    pub fn save(&self) -> Result<(), SettingsError> {
        let path = Self::prefs_path().ok_or(SettingsError::NoConfigDir)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        self.save_to_file(&path)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<(), SettingsError> {
        fs::write(path, self.to_xml()?)?;
        Ok(())
    }

    pub fn from_xml(xml: &str) -> Result<Self, SettingsError> {
        Ok(from_str(xml)?)
    }

    pub fn to_xml(&self) -> Result<String, SettingsError> {
        let xml = to_string(self)?;
        Ok(format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{}", xml))
    }

    /// Every size at least one pixel.
    fn sanitized(mut self) -> Self {
        self.render_width = self.render_width.max(1);
        self.render_height = self.render_height.max(1);
        self.window_width = self.window_width.max(1);
        self.window_height = self.window_height.max(1);
        self
    }

    pub fn render_size(&self) -> [u32; 2] {
        [self.render_width, self.render_height]
    }

    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            file_enabled: self.log_to_file,
            default_level: self.log_level.clone(),
            ..LogConfig::default()
        }
    }

    /// Remember the image import directory, saving on change.
    pub fn set_last_image_dir(&mut self, dir: &Path) {
        let dir = dir.to_string_lossy().to_string();
        if self.last_image_dir.as_deref() == Some(dir.as_str()) {
            return;
        }
        self.last_image_dir = Some(dir);
        if let Err(e) = self.save() {
            tracing::warn!("Failed to save preferences: {}", e);
        }
    }

    /// The last image directory if it still exists
    pub fn last_image_dir(&self) -> Option<PathBuf> {
        self.last_image_dir.as_ref().map(PathBuf::from).filter(|p| p.is_dir())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = PreviewSettings::default();
        assert_eq!(settings.render_size(), [1920, 1080]);
        assert_eq!(settings.log_level, "info");
        assert!(settings.last_image_dir.is_none());
    }

    #[test]
    fn test_xml_round_trip() {
        let settings = PreviewSettings {
            render_width: 640,
            render_height: 360,
            log_level: "debug".to_string(),
            log_to_file: true,
            last_image_dir: Some("/tmp/images".to_string()),
            ..PreviewSettings::default()
        };
        let xml = settings.to_xml().unwrap();
        assert!(xml.starts_with("<?xml"));
        assert_eq!(PreviewSettings::from_xml(&xml).unwrap(), settings);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let xml = r#"<ShaderStackPreferences><renderWidth>800</renderWidth></ShaderStackPreferences>"#;
        let settings = PreviewSettings::from_xml(xml).unwrap();
        assert_eq!(settings.render_size(), [800, 1080]);
        assert_eq!(settings.window_width, 1600);
    }

    #[test]
    fn test_zero_sizes_are_sanitized() {
        let settings = PreviewSettings {
            render_width: 0,
            window_height: 0,
            ..PreviewSettings::default()
        }
        .sanitized();
        assert_eq!(settings.render_width, 1);
        assert_eq!(settings.window_height, 1);
    }

    #[test]
    fn test_log_config_follows_settings() {
        let settings = PreviewSettings {
            log_level: "warn".to_string(),
            log_to_file: true,
            ..PreviewSettings::default()
        };
        let config = settings.log_config();
        assert_eq!(config.default_level, "warn");
        assert!(config.file_enabled);
        assert!(config.console_enabled);
    }
}
