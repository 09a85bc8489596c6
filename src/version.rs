//! Version strings as games and script extenders report them.
//!
//! Game versions routinely have four or more components (`1.5.97.0`) which
//! strict semver rejects. The first three components are held in a
//! `semver::Version` (so pre-release ordering follows semver), any further
//! components are compared numerically with implicit zero padding.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionParseError {
    #[error("empty version string")]
    Empty,

    #[error("invalid version component '{component}' in '{input}'")]
    Component { input: String, component: String },

    #[error("invalid pre-release tag '{tag}' in '{input}'")]
    PreRelease { input: String, tag: String },
}

/// A parsed, comparable version.
#[derive(Debug, Clone)]
pub struct VersionInfo {
    core: semver::Version,
    extra: Vec<u64>,
    raw: String,
}

impl VersionInfo {
    pub fn parse(input: &str) -> Result<Self, VersionParseError> {
        let trimmed = input.trim();
        let body = trimmed
            .strip_prefix('v')
            .or_else(|| trimmed.strip_prefix('V'))
            .unwrap_or(trimmed);
        if body.is_empty() {
            return Err(VersionParseError::Empty);
        }

        let (numbers, tag) = match body.split_once('-') {
            Some((numbers, tag)) => (numbers, Some(tag)),
            None => (body, None),
        };

        let mut components = Vec::new();
        for part in numbers.split('.') {
            let value = part
                .parse::<u64>()
                .map_err(|_| VersionParseError::Component {
                    input: input.to_string(),
                    component: part.to_string(),
                })?;
            components.push(value);
        }

        let mut core = semver::Version::new(
            components.first().copied().unwrap_or(0),
            components.get(1).copied().unwrap_or(0),
            components.get(2).copied().unwrap_or(0),
        );
        if let Some(tag) = tag {
            let invalid = || VersionParseError::PreRelease {
                input: input.to_string(),
                tag: tag.to_string(),
            };
            if tag.is_empty() {
                return Err(invalid());
            }
            core.pre = semver::Prerelease::new(tag).map_err(|_| invalid())?;
        }

        let mut extra: Vec<u64> = components.iter().skip(3).copied().collect();
        while extra.last() == Some(&0) {
            extra.pop();
        }

        Ok(Self {
            core,
            extra,
            raw: trimmed.to_string(),
        })
    }

    /// The version as it was written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl FromStr for VersionInfo {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for VersionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl PartialEq for VersionInfo {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for VersionInfo {}

impl PartialOrd for VersionInfo {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for VersionInfo {
    fn cmp(&self, other: &Self) -> Ordering {
        // A pre-release tag applies to the whole version, so trailing
        // components only break ties between otherwise equal cores.
        self.core
            .cmp(&other.core)
            .then_with(|| self.extra.cmp(&other.extra))
    }
}
