//! BAIN Wizard Installer Library
//!
//! Drives BAIN `wizard.txt` installations: a backtrackable navigator over the
//! decision points of a running script, version requirement gates, and the
//! transformer that turns the final decisions into the tree to install.

pub mod archive;
pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod installer;
pub mod interpreter;
pub mod navigation;
pub mod persistence;
pub mod requirements;
pub mod session;
pub mod state;
pub mod transform;
pub mod tree;
pub mod version;

// Re-export main types for convenience
pub use archive::{DataChecker, GamebryoDataChecker, SubPackage, SubPackages};
pub use config::{InstallerSettings, TransformSettings};
pub use context::{
    Choice, ContextId, DecisionContext, RequireVersionsContext, SelectContext, SelectMode,
    SelectOption, Termination, TopLevelContext, VersionRequirements,
};
pub use error::{ScriptError, TransformError, WizardError};
pub use installer::{AcceptDefaults, InstallResult, Installer, WizardFrontend};
pub use interpreter::ScriptInterpreter;
pub use navigation::{NavPhase, NavTransitionError, Navigator, Page, PageBehavior, RunOutcome};
pub use persistence::{PersistedSelections, SelectionDefaults};
pub use requirements::{Environment, RequirementStatus, StaticEnvironment};
pub use session::InstallSession;
pub use state::{CompletedRun, IniSetting, IniTweaks, RunState, UiOverrides};
pub use transform::{ArchiveTransformer, MissingReference, TransformReport, Transformed, TreeOp};
pub use tree::{ContentSource, DirectorySource, FileContent, FileTree};
pub use version::VersionInfo;
