//! Version requirement gates
//!
//! Evaluates a `RequireVersions` context against what is installed.
//!
//! # Design
//!
//! - **Pure logic**: `check_versions` reads an `Environment` snapshot and has
//!   no side effects
//! - **Per-facet results**: the requirement page shows each facet, navigation
//!   only needs `all_satisfied()`
//! - **Unverifiable facets**: a graphics extender requirement can never be
//!   confirmed and is reported unsatisfied; a Wrye Bash requirement is always
//!   reported satisfied

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, IntoEnumIterator};
use tracing::warn;

use crate::context::{RequireVersionsContext, VersionRequirements};
use crate::version::VersionInfo;

/// Read-only view of the host's game installation.
pub trait Environment {
    fn game_name(&self) -> &str;

    /// Installed game version, if the host could determine it.
    fn game_version(&self) -> Option<VersionInfo>;

    fn script_extender_installed(&self) -> bool;

    fn script_extender_version(&self) -> Option<VersionInfo>;
}

/// Fixed environment, from configuration or tests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticEnvironment {
    #[serde(default)]
    pub game_name: String,
    #[serde(default)]
    pub game_version: Option<String>,
    /// Installed script extender version; `None` means not installed
    #[serde(default)]
    pub script_extender_version: Option<String>,
}

impl StaticEnvironment {
    pub fn new(game_name: impl Into<String>, game_version: impl Into<String>) -> Self {
        Self {
            game_name: game_name.into(),
            game_version: Some(game_version.into()),
            script_extender_version: None,
        }
    }

    pub fn with_script_extender(mut self, version: impl Into<String>) -> Self {
        self.script_extender_version = Some(version.into());
        self
    }
}

impl Environment for StaticEnvironment {
    fn game_name(&self) -> &str {
        &self.game_name
    }

    fn game_version(&self) -> Option<VersionInfo> {
        self.game_version
            .as_deref()
            .and_then(|v| VersionInfo::parse(v).ok())
    }

    fn script_extender_installed(&self) -> bool {
        self.script_extender_version.is_some()
    }

    fn script_extender_version(&self) -> Option<VersionInfo> {
        self.script_extender_version
            .as_deref()
            .and_then(|v| VersionInfo::parse(v).ok())
    }
}

/// The four checked facets, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum Facet {
    #[strum(serialize = "Game")]
    Game,
    #[strum(serialize = "Script Extender")]
    ScriptExtender,
    #[strum(serialize = "Graphics Extender")]
    GraphicsExtender,
    #[strum(serialize = "Wrye Bash")]
    WryeBash,
}

impl Facet {
    pub fn all() -> impl Iterator<Item = Facet> {
        Self::iter()
    }

    /// Required version for this facet, if any.
    pub fn required<'a>(&self, requirements: &'a VersionRequirements) -> Option<&'a str> {
        match self {
            Self::Game => requirements.game.as_deref(),
            Self::ScriptExtender => requirements.script_extender.as_deref(),
            Self::GraphicsExtender => requirements.graphics_extender.as_deref(),
            Self::WryeBash => requirements.wrye_bash.as_deref(),
        }
    }

    /// Installed version for this facet, if the environment can tell.
    pub fn installed<E: Environment + ?Sized>(&self, environment: &E) -> Option<VersionInfo> {
        match self {
            Self::Game => environment.game_version(),
            Self::ScriptExtender if environment.script_extender_installed() => {
                environment.script_extender_version()
            }
            Self::ScriptExtender | Self::GraphicsExtender | Self::WryeBash => None,
        }
    }
}

/// Result of a requirement check, one flag per facet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequirementStatus {
    pub game: bool,
    pub script_extender: bool,
    pub graphics_extender: bool,
    pub wrye_bash: bool,
}

impl RequirementStatus {
    pub fn all_satisfied(&self) -> bool {
        self.game && self.script_extender && self.graphics_extender && self.wrye_bash
    }

    pub fn facet(&self, facet: Facet) -> bool {
        match facet {
            Facet::Game => self.game,
            Facet::ScriptExtender => self.script_extender,
            Facet::GraphicsExtender => self.graphics_extender,
            Facet::WryeBash => self.wrye_bash,
        }
    }

    pub fn as_tuple(&self) -> (bool, bool, bool, bool) {
        (
            self.game,
            self.script_extender,
            self.graphics_extender,
            self.wrye_bash,
        )
    }
}

/// Check a `RequireVersions` context against the environment.
pub fn check_versions<C, E: Environment + ?Sized>(
    context: &RequireVersionsContext<C>,
    environment: &E,
) -> RequirementStatus {
    check_requirements(&context.requirements, environment)
}

/// Same as `check_versions`, on bare requirements.
pub fn check_requirements<E: Environment + ?Sized>(
    requirements: &VersionRequirements,
    environment: &E,
) -> RequirementStatus {
    let game = match requirements.game.as_deref() {
        None => true,
        Some(required) => at_least(required, environment.game_version(), Facet::Game),
    };

    let script_extender = match requirements.script_extender.as_deref() {
        None => true,
        Some(_) if !environment.script_extender_installed() => false,
        Some(required) => at_least(
            required,
            environment.script_extender_version(),
            Facet::ScriptExtender,
        ),
    };

    RequirementStatus {
        game,
        script_extender,
        graphics_extender: requirements.graphics_extender.is_none(),
        wrye_bash: true,
    }
}

fn at_least(required: &str, installed: Option<VersionInfo>, facet: Facet) -> bool {
    let required = match VersionInfo::parse(required) {
        Ok(version) => version,
        Err(e) => {
            warn!("Unparseable {} requirement '{}': {}", facet, required, e);
            return false;
        }
    };
    match installed {
        Some(installed) => required <= installed,
        None => {
            warn!("{} version unknown, cannot satisfy {}", facet, required);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextId;

    fn gate(requirements: VersionRequirements) -> RequireVersionsContext<()> {
        RequireVersionsContext::new(ContextId(7), requirements, ())
    }

    fn env() -> StaticEnvironment {
        StaticEnvironment::new("Skyrim Special Edition", "1.5.97.0").with_script_extender("2.0.17")
    }

    #[test]
    fn test_no_requirements_is_satisfied() {
        let status = check_versions(&gate(VersionRequirements::default()), &env());
        assert!(status.all_satisfied());
    }

    #[test]
    fn test_game_version_is_compared_numerically() {
        let newer = gate(VersionRequirements {
            game: Some("1.5.100".into()),
            ..Default::default()
        });
        let older = gate(VersionRequirements {
            game: Some("1.5.9".into()),
            ..Default::default()
        });
        assert!(!check_versions(&newer, &env()).game);
        assert!(check_versions(&older, &env()).game);
    }

    #[test]
    fn test_game_requirement_above_installed_blocks() {
        let env = StaticEnvironment::new("Skyrim", "1.4.0");
        let status = check_versions(
            &gate(VersionRequirements {
                game: Some("1.5.0".into()),
                ..Default::default()
            }),
            &env,
        );
        assert!(!status.game);
        assert!(!status.all_satisfied());
    }

    #[test]
    fn test_script_extender_missing_fails() {
        let env = StaticEnvironment::new("Skyrim", "1.5.97");
        let requirements = VersionRequirements {
            script_extender: Some("2.0.0".into()),
            ..Default::default()
        };
        assert!(!check_versions(&gate(requirements.clone()), &env).script_extender);
        let installed = env.with_script_extender("2.0.1");
        assert!(check_versions(&gate(requirements), &installed).script_extender);
    }

    #[test]
    fn test_graphics_extender_never_verifiable() {
        let status = check_versions(
            &gate(VersionRequirements {
                graphics_extender: Some("1.0".into()),
                wrye_bash: Some("307".into()),
                ..Default::default()
            }),
            &env(),
        );
        assert!(!status.graphics_extender);
        assert!(status.wrye_bash);
        assert_eq!(status.as_tuple(), (true, true, false, true));
    }

    #[test]
    fn test_facet_order_and_names() {
        let names: Vec<String> = Facet::all().map(|f| f.to_string()).collect();
        assert_eq!(
            names,
            vec!["Game", "Script Extender", "Graphics Extender", "Wrye Bash"]
        );
    }

    #[test]
    fn test_unknown_game_version_fails() {
        let env = StaticEnvironment {
            game_name: "Oblivion".into(),
            game_version: None,
            script_extender_version: None,
        };
        let status = check_requirements(
            &VersionRequirements {
                game: Some("1.2".into()),
                ..Default::default()
            },
            &env,
        );
        assert!(!status.game);
    }
}
