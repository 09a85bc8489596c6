//! Run state accumulated by the wizard script.
//!
//! `RunState` is owned by the interpreter while the script runs. Once it is
//! captured in a completion context it is treated as read-only; the result
//! page records the user's adjustments separately as `UiOverrides`.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A single `section` / `key` / `value` directive for an INI-style file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IniSetting {
    pub section: String,
    pub key: String,
    pub value: String,
    /// Value the key had before the tweak, when the script knows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<String>,
}

impl IniSetting {
    pub fn new(section: impl Into<String>, key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            section: section.into(),
            key: key.into(),
            value: value.into(),
            previous: None,
        }
    }

    pub fn with_previous(mut self, previous: impl Into<String>) -> Self {
        self.previous = Some(previous.into());
        self
    }
}

/// Tweaks for one target file, in the order the script issued them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TweakFile {
    pub file: String,
    pub settings: Vec<IniSetting>,
}

/// Collection of INI tweaks grouped per target file.
///
/// File names are normalized to forward slashes and compared
/// case-insensitively; files keep their first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IniTweaks {
    files: Vec<TweakFile>,
}

impl IniTweaks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, file: &str, setting: IniSetting) {
        let file = normalize_path(file);
        match self
            .files
            .iter_mut()
            .find(|entry| entry.file.eq_ignore_ascii_case(&file))
        {
            Some(entry) => entry.settings.push(setting),
            None => self.files.push(TweakFile {
                file,
                settings: vec![setting],
            }),
        }
    }

    pub fn files(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(|entry| entry.file.as_str())
    }

    pub fn tweaks(&self, file: &str) -> &[IniSetting] {
        let file = normalize_path(file);
        self.files
            .iter()
            .find(|entry| entry.file.eq_ignore_ascii_case(&file))
            .map(|entry| entry.settings.as_slice())
            .unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = &TweakFile> {
        self.files.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }
}

/// Everything the script decided during one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunState {
    /// Selected sub-package names
    #[serde(default)]
    pub subpackages: BTreeSet<String>,
    /// Plugin name to enabled flag (explicit deselections are kept)
    #[serde(default)]
    pub plugins: BTreeMap<String, bool>,
    /// Original plugin name to new name
    #[serde(default)]
    pub renames: BTreeMap<String, String>,
    /// Free-text notes, in script order
    #[serde(default)]
    pub notes: Vec<String>,
    #[serde(default)]
    pub tweaks: IniTweaks,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select_subpackage(&mut self, name: impl Into<String>) {
        self.subpackages.insert(name.into());
    }

    pub fn deselect_subpackage(&mut self, name: &str) {
        self.subpackages.remove(name);
    }

    pub fn select_plugin(&mut self, name: impl Into<String>) {
        self.plugins.insert(name.into(), true);
    }

    pub fn deselect_plugin(&mut self, name: impl Into<String>) {
        self.plugins.insert(name.into(), false);
    }

    pub fn rename_plugin(&mut self, original: impl Into<String>, new_name: impl Into<String>) {
        self.renames.insert(original.into(), new_name.into());
    }

    pub fn add_note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }

    /// True if the plugin is explicitly enabled (case-insensitive).
    pub fn is_plugin_enabled(&self, name: &str) -> bool {
        flag_for(&self.plugins, name)
    }
}

/// Adjustments made on the completion page. Each `Some` replaces the
/// corresponding part of the `RunState` wholesale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subpackages: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugins: Option<BTreeMap<String, bool>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub renames: Option<BTreeMap<String, String>>,
}

/// A finished run: the script's state plus the user's final adjustments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedRun {
    pub state: RunState,
    #[serde(default)]
    pub overrides: UiOverrides,
}

impl CompletedRun {
    pub fn new(state: RunState, overrides: UiOverrides) -> Self {
        Self { state, overrides }
    }

    pub fn subpackages(&self) -> &BTreeSet<String> {
        self.overrides
            .subpackages
            .as_ref()
            .unwrap_or(&self.state.subpackages)
    }

    pub fn plugins(&self) -> &BTreeMap<String, bool> {
        self.overrides.plugins.as_ref().unwrap_or(&self.state.plugins)
    }

    pub fn renames(&self) -> &BTreeMap<String, String> {
        self.overrides.renames.as_ref().unwrap_or(&self.state.renames)
    }

    pub fn tweaks(&self) -> &IniTweaks {
        &self.state.tweaks
    }

    /// A plugin is enabled if its original name or its rename target is.
    pub fn is_plugin_enabled(&self, name: &str) -> bool {
        let plugins = self.plugins();
        if flag_for(plugins, name) {
            return true;
        }
        self.renames()
            .iter()
            .find(|(original, _)| original.eq_ignore_ascii_case(name))
            .is_some_and(|(_, renamed)| flag_for(plugins, renamed))
    }
}

fn flag_for(plugins: &BTreeMap<String, bool>, name: &str) -> bool {
    plugins
        .iter()
        .find(|(plugin, _)| plugin.eq_ignore_ascii_case(name))
        .is_some_and(|(_, enabled)| *enabled)
}

/// Convert Windows separators and strip leading/trailing slashes.
pub fn normalize_path(path: &str) -> String {
    path.replace('\\', "/").trim_matches('/').to_string()
}
