//! Installer module
//!
//! Runs one wizard installation from archive tree to install tree: locates
//! the wizard, lets a frontend drive the navigator and hands the completed
//! run to the archive transformer.

use std::fmt;
use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::archive::{
    discover_subpackages, find_wizard_base, DataChecker, GamebryoDataChecker, WIZARD_SCRIPT,
};
use crate::config::InstallerSettings;
use crate::error::{Result, WizardError};
use crate::interpreter::ScriptInterpreter;
use crate::navigation::{image_key, ImageMap, NavPhase, Navigator, Page, RunOutcome};
use crate::requirements::Environment;
use crate::session::InstallSession;
use crate::state::RunState;
use crate::transform::{ArchiveTransformer, Transformed};
use crate::tree::{ContentSource, FileContent, FileTree};

/// Result of an installation attempt.
#[derive(Debug, Clone)]
pub enum InstallResult {
    /// The tree to install
    Installed(Box<Transformed>),
    /// The archive is not a wizard archive, or the installer is disabled
    NotAttempted,
    Cancelled { message: Option<String> },
    ManualRequested,
}

impl fmt::Display for InstallResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Installed(_) => write!(f, "installed"),
            Self::NotAttempted => write!(f, "not attempted"),
            Self::Cancelled { message: Some(message) } => write!(f, "cancelled ({})", message),
            Self::Cancelled { message: None } => write!(f, "cancelled"),
            Self::ManualRequested => write!(f, "manual installation requested"),
        }
    }
}

/// Something that shows the wizard to a user (or to nobody).
///
/// `drive` returns once the navigator is finished: completed (the run is
/// accepted), cancelled, failed or with a manual installation requested.
pub trait WizardFrontend {
    fn drive<I, E>(
        &mut self,
        navigator: &mut Navigator<'_, I, E>,
        session: &mut InstallSession,
    ) -> Result<()>
    where
        I: ScriptInterpreter,
        E: Environment + ?Sized;
}

/// Silent frontend: keeps every default and passes every version gate.
#[derive(Debug, Clone)]
pub struct AcceptDefaults {
    max_pages: usize,
}

impl Default for AcceptDefaults {
    fn default() -> Self {
        Self { max_pages: 10_000 }
    }
}

impl AcceptDefaults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Give up on scripts that show more than `max_pages` pages.
    pub fn with_max_pages(max_pages: usize) -> Self {
        Self { max_pages }
    }
}

impl WizardFrontend for AcceptDefaults {
    fn drive<I, E>(
        &mut self,
        navigator: &mut Navigator<'_, I, E>,
        _session: &mut InstallSession,
    ) -> Result<()>
    where
        I: ScriptInterpreter,
        E: Environment + ?Sized,
    {
        let mut pages = 0;
        while navigator.phase() == NavPhase::Active {
            if pages >= self.max_pages {
                navigator.cancel();
                return Err(WizardError::navigation(format!(
                    "wizard did not finish after {} pages",
                    self.max_pages
                )));
            }
            if let Some(Page::Requires(page)) = navigator.current() {
                warn!(
                    "Installing despite unmet requirements: {:?}",
                    page.status().as_tuple()
                );
            }
            navigator
                .next()
                .map_err(|e| WizardError::navigation(e.to_string()))?;
            pages += 1;
        }
        debug!("Accepted defaults on {} pages", pages);
        Ok(())
    }
}

pub struct Installer {
    settings: InstallerSettings,
    checker: Box<dyn DataChecker>,
}

impl Installer {
    pub fn new(settings: InstallerSettings) -> Self {
        Self {
            settings,
            checker: Box::new(GamebryoDataChecker::default()),
        }
    }

    pub fn with_checker(mut self, checker: Box<dyn DataChecker>) -> Self {
        self.checker = checker;
        self
    }

    pub fn settings(&self) -> &InstallerSettings {
        &self.settings
    }

    pub fn is_archive_supported(&self, tree: &FileTree) -> bool {
        self.settings.enabled && find_wizard_base(tree).is_some()
    }

    /// Install `tree` by running its wizard.
    ///
    /// # Errors
    ///
    /// - `Script` if the wizard script fails; the user saw the error page
    /// - `Transform` if the completed run cannot be turned into a tree
    /// - `Archive` if `wizard.txt` cannot be read from `source`
    pub fn install<I, E, F>(
        &self,
        session: &mut InstallSession,
        tree: &FileTree,
        source: &dyn ContentSource,
        interpreter: &I,
        environment: &E,
        frontend: &mut F,
    ) -> Result<InstallResult>
    where
        I: ScriptInterpreter,
        E: Environment + ?Sized,
        F: WizardFrontend,
    {
        if !self.settings.enabled {
            debug!("Wizard installer disabled");
            return Ok(InstallResult::NotAttempted);
        }
        let Some(base) = find_wizard_base(tree) else {
            debug!("No {} in {}", WIZARD_SCRIPT, session.archive().display());
            return Ok(InstallResult::NotAttempted);
        };

        let script = self.script_path(base, source)?;
        let images = self.collect_images(base, source);
        let subpackages = discover_subpackages(base, self.checker.as_ref());
        info!(
            "Running {} ({} sub-packages, {} images)",
            script.display(),
            subpackages.len(),
            images.len()
        );

        let top = interpreter.top_level(&script, RunState::new())?;
        let mut navigator = Navigator::new(interpreter, environment, &subpackages)
            .with_images(images)
            .with_defaults(session.defaults().clone())
            .with_plugin_extensions(self.settings.transform.plugin_extensions.clone());
        navigator
            .start(top)
            .map_err(|e| WizardError::navigation(e.to_string()))?;

        frontend.drive(&mut navigator, session)?;
        session.record_selections(navigator.selected_options());

        let outcome = navigator
            .finish()
            .map_err(|e| WizardError::navigation(e.to_string()))?;
        match outcome {
            RunOutcome::Completed(run) => {
                let transformer = ArchiveTransformer::new(&self.settings.transform, source);
                let transformed = transformer.transform(base, &run)?;
                debug!("{}", transformed.report.summary());
                Ok(InstallResult::Installed(Box::new(transformed)))
            }
            RunOutcome::Cancelled { message } => Ok(InstallResult::Cancelled { message }),
            RunOutcome::ManualRequested => Ok(InstallResult::ManualRequested),
            RunOutcome::Failed(error) => Err(error.into()),
        }
    }

    fn script_path(&self, base: &FileTree, source: &dyn ContentSource) -> Result<PathBuf> {
        let entry = base
            .find_file(WIZARD_SCRIPT)
            .ok_or_else(|| WizardError::archive(format!("{} not found", WIZARD_SCRIPT)))?;
        match entry.content() {
            FileContent::Archive(path) => source.local_path(path).ok_or_else(|| {
                WizardError::archive(format!("cannot extract {} from the archive", path))
            }),
            FileContent::Data(_) => Err(WizardError::archive(format!(
                "{} is not part of the archive",
                WIZARD_SCRIPT
            ))),
        }
    }

    /// Images under the wizard base, keyed by their path relative to it.
    fn collect_images(&self, base: &FileTree, source: &dyn ContentSource) -> ImageMap {
        let mut images = ImageMap::new();
        for (path, file) in base.walk_files() {
            if !file.has_extension(&self.settings.image_extensions) {
                continue;
            }
            let FileContent::Archive(archive_path) = file.content() else {
                continue;
            };
            match source.local_path(archive_path) {
                Some(local) => {
                    images.insert(image_key(&path), local);
                }
                None => debug!("Image {} not available", archive_path),
            }
        }
        images
    }
}
