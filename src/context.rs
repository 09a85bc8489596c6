//! Decision contexts produced by the script interpreter.
//!
//! A run is a walk over these contexts: the interpreter suspends at every
//! point that needs user input (`Select`), an environment check
//! (`RequireVersions`) or that ends the script (`Termination`). The type
//! parameter `C` is the interpreter's own resume cursor; navigation code never
//! looks inside it.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::state::RunState;

/// Stable identity of a decision point.
///
/// Assigned by the interpreter from the context's position in the script, so
/// re-reaching the same statement yields the same id no matter which path led
/// there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContextId(pub u64);

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One entry of a select prompt. Options are identified by their position,
/// two options may carry the same name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub name: String,
    pub description: String,
    /// Image path inside the archive
    pub image: Option<String>,
}

impl SelectOption {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            image: None,
        }
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }
}

/// Cardinality of a select prompt, with the script's defaults as indices
/// into the option list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectMode {
    One { default: Option<usize> },
    Many { defaults: Vec<usize> },
}

/// What the user committed on a select page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Choice {
    One(usize),
    Many(Vec<usize>),
}

impl Choice {
    pub fn indices(&self) -> Vec<usize> {
        match self {
            Self::One(index) => vec![*index],
            Self::Many(indices) => indices.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TopLevelContext<C> {
    pub id: ContextId,
    pub script: PathBuf,
    pub state: RunState,
    pub cursor: C,
}

#[derive(Debug, Clone)]
pub struct SelectContext<C> {
    pub id: ContextId,
    pub description: String,
    pub options: Vec<SelectOption>,
    pub mode: SelectMode,
    pub cursor: C,
}

impl<C> SelectContext<C> {
    pub fn is_select_one(&self) -> bool {
        matches!(self.mode, SelectMode::One { .. })
    }

    /// Default option indices declared by the script.
    pub fn default_indices(&self) -> Vec<usize> {
        match &self.mode {
            SelectMode::One { default } => default.iter().copied().collect(),
            SelectMode::Many { defaults } => defaults.clone(),
        }
    }

    /// True if both contexts offer the same option names in the same order.
    pub fn same_shape<D>(&self, other: &SelectContext<D>) -> bool {
        self.is_select_one() == other.is_select_one()
            && self.options.len() == other.options.len()
            && self
                .options
                .iter()
                .zip(&other.options)
                .all(|(a, b)| a.name == b.name)
    }
}

/// Version requirements of a `RequireVersions` statement. Empty strings are
/// normalized to `None` by `RequireVersionsContext::new`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRequirements {
    #[serde(default)]
    pub game: Option<String>,
    #[serde(default)]
    pub script_extender: Option<String>,
    #[serde(default)]
    pub graphics_extender: Option<String>,
    #[serde(default)]
    pub wrye_bash: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RequireVersionsContext<C> {
    pub id: ContextId,
    pub requirements: VersionRequirements,
    pub cursor: C,
}

impl<C> RequireVersionsContext<C> {
    pub fn new(id: ContextId, requirements: VersionRequirements, cursor: C) -> Self {
        let clean = |value: Option<String>| value.filter(|v| !v.trim().is_empty());
        Self {
            id,
            requirements: VersionRequirements {
                game: clean(requirements.game),
                script_extender: clean(requirements.script_extender),
                graphics_extender: clean(requirements.graphics_extender),
                wrye_bash: clean(requirements.wrye_bash),
            },
            cursor,
        }
    }
}

/// End of the script.
#[derive(Debug, Clone, PartialEq)]
pub enum Termination {
    Cancelled { message: Option<String> },
    Completed(RunState),
}

#[derive(Debug, Clone)]
pub enum DecisionContext<C> {
    TopLevel(TopLevelContext<C>),
    Select(SelectContext<C>),
    RequireVersions(RequireVersionsContext<C>),
    Termination(Termination),
}

impl<C> DecisionContext<C> {
    /// Identity of non-terminal contexts.
    pub fn id(&self) -> Option<ContextId> {
        match self {
            Self::TopLevel(ctx) => Some(ctx.id),
            Self::Select(ctx) => Some(ctx.id),
            Self::RequireVersions(ctx) => Some(ctx.id),
            Self::Termination(_) => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Termination(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::TopLevel(_) => "top-level",
            Self::Select(_) => "select",
            Self::RequireVersions(_) => "require-versions",
            Self::Termination(Termination::Cancelled { .. }) => "cancelled",
            Self::Termination(Termination::Completed(_)) => "completed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn select(names: &[&str], mode: SelectMode) -> SelectContext<()> {
        SelectContext {
            id: ContextId(1),
            description: "Pick".into(),
            options: names.iter().map(|n| SelectOption::new(*n, "")).collect(),
            mode,
            cursor: (),
        }
    }

    #[test]
    fn test_same_shape_compares_names_and_mode() {
        let a = select(&["A", "B"], SelectMode::One { default: Some(0) });
        let b = select(&["A", "B"], SelectMode::One { default: Some(1) });
        let c = select(&["A", "C"], SelectMode::One { default: None });
        let d = select(&["A", "B"], SelectMode::Many { defaults: vec![] });
        assert!(a.same_shape(&b));
        assert!(!a.same_shape(&c));
        assert!(!a.same_shape(&d));
    }

    #[test]
    fn test_empty_requirements_are_unset() {
        let ctx = RequireVersionsContext::new(
            ContextId(3),
            VersionRequirements {
                game: Some("1.5".into()),
                script_extender: Some("  ".into()),
                graphics_extender: Some(String::new()),
                wrye_bash: None,
            },
            (),
        );
        assert_eq!(ctx.requirements.game.as_deref(), Some("1.5"));
        assert!(ctx.requirements.script_extender.is_none());
        assert!(ctx.requirements.graphics_extender.is_none());
    }

    #[test]
    fn test_terminal_has_no_identity() {
        let ctx: DecisionContext<()> =
            DecisionContext::Termination(Termination::Cancelled { message: None });
        assert!(ctx.is_terminal());
        assert!(ctx.id().is_none());
        assert_eq!(ctx.kind(), "cancelled");
    }
}
