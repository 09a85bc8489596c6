//! Install session
//!
//! State that lives from the start of one installation to its end: the
//! archive being installed, the mod name, the selections remembered from an
//! earlier installation and the ones made during this one.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::installer::InstallResult;
use crate::persistence::{PersistedSelections, SelectionDefaults};

#[derive(Debug, Clone)]
pub struct InstallSession {
    archive: PathBuf,
    reinstall: bool,
    name: String,
    defaults: SelectionDefaults,
    selections: PersistedSelections,
}

impl InstallSession {
    /// Begin installing `archive`. `stored` holds the selections saved by the
    /// previous installation of the same mod, if any.
    pub fn start(
        archive: impl Into<PathBuf>,
        reinstall: bool,
        stored: Option<PersistedSelections>,
    ) -> Self {
        let archive = archive.into();
        let name = guess_name(&archive);
        let defaults = stored
            .as_ref()
            .map(PersistedSelections::to_defaults)
            .unwrap_or_default();
        info!(
            "Installation of {} started ({}{} remembered pages)",
            name,
            if reinstall { "reinstall, " } else { "" },
            defaults.len()
        );
        Self {
            archive,
            reinstall,
            name,
            defaults,
            selections: PersistedSelections::default(),
        }
    }

    pub fn archive(&self) -> &Path {
        &self.archive
    }

    pub fn is_reinstall(&self) -> bool {
        self.reinstall
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set the mod name chosen by the user. Blank names are ignored.
    pub fn set_name(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !name.trim().is_empty() {
            self.name = name.trim().to_string();
        }
    }

    pub fn defaults(&self) -> &SelectionDefaults {
        &self.defaults
    }

    /// Remember the selections of the run that just ended.
    pub fn record_selections(&mut self, pages: Vec<(String, Vec<String>)>) {
        debug!("Recording selections of {} pages", pages.len());
        self.selections = PersistedSelections::new(pages);
    }

    pub fn selections(&self) -> &PersistedSelections {
        &self.selections
    }

    /// Close the session. Returns the selections to store, only if the
    /// installation succeeded.
    pub fn end(self, result: &InstallResult) -> Option<PersistedSelections> {
        match result {
            InstallResult::Installed(_) => {
                info!("Installation of {} finished", self.name);
                Some(self.selections)
            }
            other => {
                info!("Installation of {} ended: {}", self.name, other);
                None
            }
        }
    }
}

fn guess_name(archive: &Path) -> String {
    archive
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| archive.display().to_string())
}
