//! Contract between the navigation controller and the wizard script
//! interpreter.
//!
//! The interpreter parses and evaluates `wizard.txt`; it is an external
//! collaborator. Navigation only needs the three transitions below.
//!
//! # Contract
//!
//! - `top_level()` wraps a script and an initial state into the single
//!   `TopLevel` context of a run.
//! - `exec_top_level()` / `exec_requirements()` resume evaluation after the
//!   entry point or a version gate and return the next suspension point.
//! - `select()` resumes after a select prompt with the user's choice.
//!
//! # Invariants
//!
//! - Transitions never return `TopLevel`.
//! - Contexts carry a snapshot of the run state: resuming an older context
//!   (after backtracking) must not observe choices made later.
//! - A chain of version gates is finite. Navigation auto-skips satisfied
//!   gates in a loop and relies on this to terminate.

use std::path::Path;

use crate::context::{Choice, DecisionContext, RequireVersionsContext, SelectContext, TopLevelContext};
use crate::error::ScriptError;
use crate::state::RunState;

pub trait ScriptInterpreter {
    /// Opaque resume position carried by every context.
    type Cursor: Clone + std::fmt::Debug;

    /// Create the entry context for `script`.
    fn top_level(
        &self,
        script: &Path,
        state: RunState,
    ) -> Result<TopLevelContext<Self::Cursor>, ScriptError>;

    /// Start evaluating the script.
    fn exec_top_level(
        &self,
        context: &TopLevelContext<Self::Cursor>,
    ) -> Result<DecisionContext<Self::Cursor>, ScriptError>;

    /// Continue past a version gate, whatever the environment says.
    fn exec_requirements(
        &self,
        context: &RequireVersionsContext<Self::Cursor>,
    ) -> Result<DecisionContext<Self::Cursor>, ScriptError>;

    /// Continue past a select prompt with the committed choice.
    fn select(
        &self,
        context: &SelectContext<Self::Cursor>,
        choice: &Choice,
    ) -> Result<DecisionContext<Self::Cursor>, ScriptError>;
}
