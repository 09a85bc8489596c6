//! Error handling module for the wizard installer
//!
//! Provides centralized error handling with proper error types using thiserror.
//! Script failures, transform failures and invalid navigation requests each
//! have their own type so that callers can tell them apart; `WizardError`
//! wraps them for code that only needs to propagate.

use thiserror::Error;

/// Error raised by the script interpreter on malformed or inconsistent
/// script content.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ScriptError {
    message: String,
    line: Option<usize>,
}

impl ScriptError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            line: None,
        }
    }

    /// Attach the script line the error was raised at.
    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn line(&self) -> Option<usize> {
        self.line
    }
}

/// Fatal failure of the archive transformer.
///
/// When one of these is returned, no part of the output tree is visible to
/// the caller.
#[derive(Error, Debug)]
pub enum TransformError {
    /// A source file could not be read (tweak merge, content lookup)
    #[error("Failed to read '{path}' from the archive: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A file could not be written to the output tree
    #[error("Cannot create '{path}' in the output tree: {reason}")]
    Create { path: String, reason: String },

    /// Generated content is unusable (e.g. a tweak with an empty section)
    #[error("Invalid content for '{path}': {reason}")]
    Content { path: String, reason: String },
}

/// Main error type for the wizard installer
#[derive(Error, Debug)]
pub enum WizardError {
    /// IO errors (file operations, staging directories)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Script evaluation errors
    #[error("Script error: {0}")]
    Script(#[from] ScriptError),

    /// Archive transformation errors
    #[error("Installation failed: {0}")]
    Transform(#[from] TransformError),

    /// Navigation state machine errors
    #[error("Navigation error: {0}")]
    Navigation(String),

    /// Configuration errors (loading, parsing, validation)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Archive layout errors (no wizard.txt, missing base folder)
    #[error("Archive error: {0}")]
    Archive(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for wizard operations
pub type Result<T> = std::result::Result<T, WizardError>;

impl WizardError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an archive layout error
    pub fn archive(msg: impl Into<String>) -> Self {
        Self::Archive(msg.into())
    }

    /// Create a navigation error
    pub fn navigation(msg: impl Into<String>) -> Self {
        Self::Navigation(msg.into())
    }

    /// True if the script itself is at fault rather than the environment.
    pub fn is_script_defect(&self) -> bool {
        matches!(self, Self::Script(_))
    }
}
