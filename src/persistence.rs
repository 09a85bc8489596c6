//! Selection persistence
//!
//! Remembers the options chosen on every select page so that a
//! re-installation starts from them.
//!
//! # Key scheme
//!
//! Selections are stored as flat, ordered string settings:
//!
//! ```text
//! select0-description = Choose a texture resolution
//! select0-option0     = 2K
//! select1-description = Optional patches
//! select1-option0     = Patch A
//! select1-option1     = Patch C
//! ```
//!
//! Pages are numbered in the order they were visited, options in the order
//! they were chosen; both counters start at 0.

use std::collections::{BTreeMap, HashMap};

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{Result, WizardError};

/// Chosen option names per select page, in page order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistedSelections {
    pages: Vec<(String, Vec<String>)>,
}

impl PersistedSelections {
    pub fn new(pages: Vec<(String, Vec<String>)>) -> Self {
        Self { pages }
    }

    pub fn pages(&self) -> &[(String, Vec<String>)] {
        &self.pages
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Flatten into `select{i}-...` settings.
    pub fn to_settings(&self) -> Vec<(String, String)> {
        let mut settings = Vec::new();
        for (i, (description, options)) in self.pages.iter().enumerate() {
            settings.push((format!("select{}-description", i), description.clone()));
            for (j, option) in options.iter().enumerate() {
                settings.push((format!("select{}-option{}", i, j), option.clone()));
            }
        }
        settings
    }

    /// Rebuild from settings in any order. Keys outside the scheme are
    /// ignored; a page without a description is dropped.
    pub fn from_settings<I, K, V>(settings: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut descriptions: BTreeMap<usize, String> = BTreeMap::new();
        let mut options: BTreeMap<usize, BTreeMap<usize, String>> = BTreeMap::new();

        for (key, value) in settings {
            match parse_key(key.as_ref()) {
                Some(SelectKey::Description(page)) => {
                    descriptions.insert(page, value.into());
                }
                Some(SelectKey::Option(page, index)) => {
                    options.entry(page).or_default().insert(index, value.into());
                }
                None => debug!("Ignoring setting {}", key.as_ref()),
            }
        }

        let pages = descriptions
            .into_iter()
            .map(|(page, description)| {
                let names = options
                    .remove(&page)
                    .map(|names| names.into_values().collect())
                    .unwrap_or_default();
                (description, names)
            })
            .collect();

        for page in options.keys() {
            warn!("Dropping options of select{} (no description)", page);
        }
        Self { pages }
    }

    /// JSON object holding the flat settings.
    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .to_settings()
            .into_iter()
            .map(|(key, value)| (key, Value::String(value)))
            .collect();
        Value::Object(map)
    }

    pub fn from_json(value: &Value) -> Result<Self> {
        let Value::Object(map) = value else {
            return Err(WizardError::config("stored selections must be a JSON object"));
        };
        let mut settings = Vec::with_capacity(map.len());
        for (key, value) in map {
            let Value::String(value) = value else {
                return Err(WizardError::config(format!(
                    "stored selection '{}' must be a string",
                    key
                )));
            };
            settings.push((key.as_str(), value.clone()));
        }
        Ok(Self::from_settings(settings))
    }

    /// Lookup table used to seed select pages.
    pub fn to_defaults(&self) -> SelectionDefaults {
        let mut defaults = SelectionDefaults::default();
        for (description, names) in &self.pages {
            defaults.insert(description.clone(), names.clone());
        }
        defaults
    }
}

/// Remembered option names by page description. A description seen twice
/// keeps its last entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionDefaults {
    by_description: HashMap<String, Vec<String>>,
}

impl SelectionDefaults {
    pub fn insert(&mut self, description: String, names: Vec<String>) {
        self.by_description.insert(description, names);
    }

    pub fn get(&self, description: &str) -> Option<&[String]> {
        self.by_description.get(description).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.by_description.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_description.is_empty()
    }
}

enum SelectKey {
    Description(usize),
    Option(usize, usize),
}

fn parse_key(key: &str) -> Option<SelectKey> {
    let rest = key.strip_prefix("select")?;
    let (page, field) = rest.split_once('-')?;
    let page = parse_index(page)?;
    if field == "description" {
        return Some(SelectKey::Description(page));
    }
    let index = parse_index(field.strip_prefix("option")?)?;
    Some(SelectKey::Option(page, index))
}

fn parse_index(digits: &str) -> Option<usize> {
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}
