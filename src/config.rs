//! Installer settings file handling.
//!
//! Settings are stored as JSON. Every field has a default so that partial
//! files load; `validate()` rejects values the transformer cannot work with.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::requirements::StaticEnvironment;

/// Settings of the archive transformer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformSettings {
    /// Folder receiving plugins that are not enabled
    pub optional_folder: String,
    /// Conventional tweak folders; new tweak files go into the first one
    pub tweak_folders: Vec<String>,
    /// Extensions of plugin files, without dots
    pub plugin_extensions: Vec<String>,
}

impl Default for TransformSettings {
    fn default() -> Self {
        Self {
            optional_folder: "optional".to_string(),
            tweak_folders: vec!["INI Tweaks".to_string(), "INI".to_string()],
            plugin_extensions: vec!["esp".to_string(), "esm".to_string(), "esl".to_string()],
        }
    }
}

impl TransformSettings {
    /// Folder new tweak files are created in.
    pub fn primary_tweak_folder(&self) -> &str {
        self.tweak_folders
            .first()
            .map(String::as_str)
            .unwrap_or("INI Tweaks")
    }

    pub fn is_tweak_folder(&self, name: &str) -> bool {
        self.tweak_folders
            .iter()
            .any(|folder| folder.eq_ignore_ascii_case(name))
    }
}

/// Installer configuration that can be saved/loaded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallerSettings {
    pub enabled: bool,
    /// Priority among the host's installers
    pub priority: i32,
    pub transform: TransformSettings,
    /// Extensions of images shown next to select options
    pub image_extensions: Vec<String>,
    /// Fixed environment used when no host is available
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<StaticEnvironment>,
}

impl Default for InstallerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            priority: 80,
            transform: TransformSettings::default(),
            image_extensions: ["png", "jpg", "jpeg", "gif", "bmp"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            environment: None,
        }
    }
}

impl InstallerSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Save settings to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json =
            serde_json::to_string_pretty(self).context("Failed to serialize settings to JSON")?;

        fs::write(&path, json)
            .with_context(|| format!("Failed to write settings to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Load settings from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read settings from {:?}", path.as_ref()))?;

        let settings: Self =
            serde_json::from_str(&content).context("Failed to parse settings JSON")?;

        Ok(settings)
    }

    /// Validate the settings
    pub fn validate(&self) -> Result<()> {
        let transform = &self.transform;

        if transform.optional_folder.trim().is_empty() {
            anyhow::bail!("Optional folder name must not be empty");
        }
        if transform.optional_folder.contains(['/', '\\']) {
            anyhow::bail!("Optional folder must be a single folder name");
        }

        if transform.tweak_folders.is_empty() {
            anyhow::bail!("At least one tweak folder must be configured");
        }
        if transform.tweak_folders.iter().any(|f| f.trim().is_empty()) {
            anyhow::bail!("Tweak folder names must not be empty");
        }

        if transform.plugin_extensions.is_empty() {
            anyhow::bail!("At least one plugin extension must be configured");
        }
        for ext in transform
            .plugin_extensions
            .iter()
            .chain(self.image_extensions.iter())
        {
            if ext.is_empty() || ext.starts_with('.') {
                anyhow::bail!("Invalid extension '{}': use the bare extension, e.g. 'esp'", ext);
            }
        }

        if let Some(env) = &self.environment {
            for version in env.game_version.iter().chain(env.script_extender_version.iter()) {
                crate::version::VersionInfo::parse(version)
                    .with_context(|| format!("Invalid environment version '{}'", version))?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = InstallerSettings::default();
        assert!(settings.validate().is_ok());
        assert!(settings.enabled);
        assert_eq!(settings.priority, 80);
        assert_eq!(settings.transform.primary_tweak_folder(), "INI Tweaks");
        assert!(settings.transform.is_tweak_folder("ini"));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings: InstallerSettings =
            serde_json::from_str(r#"{ "priority": 120 }"#).expect("parse");
        assert_eq!(settings.priority, 120);
        assert_eq!(settings.transform.optional_folder, "optional");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut settings = InstallerSettings::default();
        settings.transform.plugin_extensions = vec![".esp".into()];
        assert!(settings.validate().is_err());

        let mut settings = InstallerSettings::default();
        settings.transform.optional_folder = "a/b".into();
        assert!(settings.validate().is_err());

        let mut settings = InstallerSettings::default();
        settings.environment = Some(StaticEnvironment::new("Skyrim", "one.two"));
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("settings.json");
        let mut settings = InstallerSettings::default();
        settings.environment = Some(StaticEnvironment::new("Fallout 4", "1.10.163.0"));
        settings.save_to_file(&path).expect("save");
        let loaded = InstallerSettings::load_from_file(&path).expect("load");
        assert_eq!(loaded, settings);
    }
}
