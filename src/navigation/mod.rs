//! Navigation Controller
//!
//! Walks the decision contexts of a wizard run one page at a time, forward
//! and back.
//!
//! # Design Principles
//!
//! - **Lazy evaluation**: the interpreter only runs when the user moves forward
//! - **Lossless backtracking**: going back pops a page without calling the
//!   interpreter; select pages stay in a cache keyed by `ContextId`, so coming
//!   back to the same decision point shows the selection the user left there
//! - **Auto-skip**: version gates that are fully satisfied are passed without
//!   a page
//! - **Fail fast**: invalid operations return a `NavTransitionError` and leave
//!   the navigator untouched
//!
//! # Phase Flow
//!
//! ```text
//! NotStarted
//!     ↓ start()
//! Active  ←→ next() / back()
//!     ↓
//! Completed | Cancelled      (absorbing: next/back fail)
//!
//! (a script error moves Active to Failed, only cancel() remains)
//! ```

pub mod pages;

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::archive::SubPackages;
use crate::context::{ContextId, DecisionContext, Termination, TopLevelContext};
use crate::error::ScriptError;
use crate::interpreter::ScriptInterpreter;
use crate::persistence::SelectionDefaults;
use crate::requirements::{check_versions, Environment};
use crate::state::CompletedRun;

pub use pages::{
    image_key, CancelPage, Commit, CompletePage, ErrorPage, FacetRow, ImageMap, NextAction,
    OptionView, Page, PageBehavior, PageView, PluginRow, RequiresPage, SelectPage,
};

/// Phase of a navigator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NavPhase {
    /// `start()` was not called yet
    NotStarted,
    /// A select or requirement page is showing
    Active,
    /// The script completed, the completion page is showing (terminal)
    Completed,
    /// The script or the user cancelled (terminal)
    Cancelled,
    /// The script raised an error
    Failed,
}

impl NavPhase {
    #[inline]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    pub const fn description(self) -> &'static str {
        match self {
            Self::NotStarted => "Not started",
            Self::Active => "In progress",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
            Self::Failed => "Failed",
        }
    }
}

impl fmt::Display for NavPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors of invalid navigator operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NavTransitionError {
    #[error("The wizard has not been started")]
    NotStarted,

    #[error("The wizard has already been started")]
    AlreadyStarted,

    /// Attempted to move from a terminal phase
    #[error("Cannot move from terminal phase {phase}")]
    FromTerminal { phase: NavPhase },

    #[error("The wizard script failed, the run can only be cancelled")]
    ScriptFailed,

    #[error("Already at the first page")]
    AtFirstPage,

    #[error("The current page is not a select-one page")]
    NotSelectOne,

    #[error("Option {index} does not exist (page has {count} options)")]
    InvalidOption { index: usize, count: usize },

    #[error("No option selected")]
    NothingSelected,

    #[error("The run is not finished (phase: {phase})")]
    NotFinished { phase: NavPhase },
}

/// How a run ended.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    Completed(CompletedRun),
    Cancelled { message: Option<String> },
    ManualRequested,
    Failed(ScriptError),
}

#[derive(Debug, Clone)]
enum Slot<C> {
    /// Select page living in the page cache
    Cached(ContextId),
    /// Page that is never cached
    Owned(Page<C>),
}

/// Stepwise, backtrackable driver of a wizard run.
pub struct Navigator<'a, I: ScriptInterpreter, E: Environment + ?Sized> {
    interpreter: &'a I,
    environment: &'a E,
    subpackages: &'a SubPackages,
    plugin_extensions: Vec<String>,
    images: ImageMap,
    defaults: SelectionDefaults,
    pages: HashMap<ContextId, Page<I::Cursor>>,
    stack: Vec<Slot<I::Cursor>>,
    phase: NavPhase,
    manual_requested: bool,
    failure: Option<ScriptError>,
    cancel_message: Option<String>,
}

impl<'a, I: ScriptInterpreter, E: Environment + ?Sized> Navigator<'a, I, E> {
    pub fn new(interpreter: &'a I, environment: &'a E, subpackages: &'a SubPackages) -> Self {
        Self {
            interpreter,
            environment,
            subpackages,
            plugin_extensions: vec!["esp".to_string(), "esm".to_string(), "esl".to_string()],
            images: ImageMap::new(),
            defaults: SelectionDefaults::default(),
            pages: HashMap::new(),
            stack: Vec::new(),
            phase: NavPhase::NotStarted,
            manual_requested: false,
            failure: None,
            cancel_message: None,
        }
    }

    pub fn with_images(mut self, images: ImageMap) -> Self {
        self.images = images;
        self
    }

    /// Selections remembered from an earlier installation.
    pub fn with_defaults(mut self, defaults: SelectionDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn with_plugin_extensions(mut self, extensions: Vec<String>) -> Self {
        self.plugin_extensions = extensions;
        self
    }

    #[inline]
    pub fn phase(&self) -> NavPhase {
        self.phase
    }

    /// Number of pages from the first one to the current one.
    #[inline]
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Number of cached select pages.
    #[inline]
    pub fn cached_pages(&self) -> usize {
        self.pages.len()
    }

    pub fn is_manual_requested(&self) -> bool {
        self.manual_requested
    }

    pub fn can_go_back(&self) -> bool {
        self.phase == NavPhase::Active && self.stack.len() > 1
    }

    /// Label of the forward button, `None` when it is disabled.
    pub fn next_action(&self) -> Option<NextAction> {
        match self.phase {
            NavPhase::Active | NavPhase::Completed => self.current()?.next_action(),
            _ => None,
        }
    }

    pub fn current(&self) -> Option<&Page<I::Cursor>> {
        match self.stack.last()? {
            Slot::Cached(id) => self.pages.get(id),
            Slot::Owned(page) => Some(page),
        }
    }

    pub fn current_mut(&mut self) -> Option<&mut Page<I::Cursor>> {
        match self.stack.last_mut()? {
            Slot::Cached(id) => self.pages.get_mut(id),
            Slot::Owned(page) => Some(page),
        }
    }

    /// Execute the entry context and show the first page.
    pub fn start(&mut self, top: TopLevelContext<I::Cursor>) -> Result<(), NavTransitionError> {
        if self.phase != NavPhase::NotStarted {
            return Err(NavTransitionError::AlreadyStarted);
        }
        info!("Starting wizard {}", top.script.display());
        self.phase = NavPhase::Active;

        let landed = self
            .interpreter
            .exec_top_level(&top)
            .and_then(|context| self.advance_until(context));
        self.land(landed);
        Ok(())
    }

    /// Commit the current page and move to the next one.
    pub fn next(&mut self) -> Result<(), NavTransitionError> {
        self.ensure_active()?;

        let page = self.current().ok_or(NavTransitionError::NotStarted)?;
        let landed = match (page, page.commit()) {
            (Page::Select(page), Commit::Select(choice)) => {
                debug!("Committing {:?} on {}", choice, page.context().id);
                self.interpreter.select(page.context(), &choice)
            }
            (Page::Requires(page), Commit::Proceed) => {
                debug!("Proceeding past unmet requirements {}", page.context().id);
                self.interpreter.exec_requirements(page.context())
            }
            (Page::Select(_), _) => return Err(NavTransitionError::NothingSelected),
            _ => return Err(NavTransitionError::FromTerminal { phase: self.phase }),
        }
        .and_then(|context| self.advance_until(context));

        self.land(landed);
        Ok(())
    }

    /// Select an option of a select-one page and move forward, like `next()`.
    pub fn activate_option(&mut self, index: usize) -> Result<(), NavTransitionError> {
        self.ensure_active()?;
        let Some(Page::Select(page)) = self.current_mut() else {
            return Err(NavTransitionError::NotSelectOne);
        };
        if !page.is_select_one() {
            return Err(NavTransitionError::NotSelectOne);
        }
        if !page.select(index) {
            return Err(NavTransitionError::InvalidOption {
                index,
                count: page.option_count(),
            });
        }
        self.next()
    }

    /// Show the previous page again.
    pub fn back(&mut self) -> Result<(), NavTransitionError> {
        self.ensure_active()?;
        if self.stack.len() <= 1 {
            return Err(NavTransitionError::AtFirstPage);
        }
        self.stack.pop();
        debug!("Back to page {}", self.stack.len());
        Ok(())
    }

    /// Abandon the run. Always possible; a failed run keeps its failure.
    pub fn cancel(&mut self) {
        match self.phase {
            NavPhase::Failed => {
                info!("Wizard closed after a script error");
            }
            NavPhase::Cancelled => {}
            _ => {
                info!("Wizard cancelled by the user");
                self.cancel_message = None;
                self.phase = NavPhase::Cancelled;
            }
        }
    }

    /// Abandon the wizard in favor of a manual installation.
    pub fn request_manual(&mut self) {
        info!("Manual installation requested");
        self.manual_requested = true;
        if self.phase != NavPhase::Failed {
            self.phase = NavPhase::Cancelled;
        }
    }

    /// Description and chosen option names of every select page from the
    /// first page to the current one.
    pub fn selected_options(&self) -> Vec<(String, Vec<String>)> {
        self.stack
            .iter()
            .filter_map(|slot| match slot {
                Slot::Cached(id) => self.pages.get(id),
                Slot::Owned(page) => Some(page),
            })
            .filter_map(Page::as_select)
            .map(|page| (page.description().to_string(), page.selected_names()))
            .collect()
    }

    /// End the run.
    pub fn finish(mut self) -> Result<RunOutcome, NavTransitionError> {
        if self.manual_requested {
            return Ok(RunOutcome::ManualRequested);
        }
        match self.phase {
            NavPhase::Completed => match self.stack.pop() {
                Some(Slot::Owned(Page::Complete(page))) => {
                    let overrides = page.overrides();
                    Ok(RunOutcome::Completed(CompletedRun::new(
                        page.into_state(),
                        overrides,
                    )))
                }
                _ => Err(NavTransitionError::NotFinished { phase: self.phase }),
            },
            NavPhase::Cancelled => Ok(RunOutcome::Cancelled {
                message: self.cancel_message.take(),
            }),
            NavPhase::Failed => match self.failure.take() {
                Some(error) => Ok(RunOutcome::Failed(error)),
                None => Err(NavTransitionError::NotFinished { phase: self.phase }),
            },
            NavPhase::NotStarted | NavPhase::Active => {
                Err(NavTransitionError::NotFinished { phase: self.phase })
            }
        }
    }

    fn ensure_active(&self) -> Result<(), NavTransitionError> {
        match self.phase {
            NavPhase::Active => Ok(()),
            NavPhase::NotStarted => Err(NavTransitionError::NotStarted),
            NavPhase::Failed => Err(NavTransitionError::ScriptFailed),
            phase => Err(NavTransitionError::FromTerminal { phase }),
        }
    }

    /// Pass every fully satisfied version gate.
    fn advance_until(
        &self,
        mut context: DecisionContext<I::Cursor>,
    ) -> Result<DecisionContext<I::Cursor>, ScriptError> {
        loop {
            match context {
                DecisionContext::RequireVersions(gate)
                    if check_versions(&gate, self.environment).all_satisfied() =>
                {
                    debug!("Requirements {} satisfied, skipping", gate.id);
                    context = self.interpreter.exec_requirements(&gate)?;
                }
                other => return Ok(other),
            }
        }
    }

    /// Materialize the page for `landed` and make it current.
    fn land(&mut self, landed: Result<DecisionContext<I::Cursor>, ScriptError>) {
        match landed {
            Err(error) => self.fail(error),
            Ok(DecisionContext::TopLevel(top)) => self.fail(ScriptError::new(format!(
                "interpreter resumed into the top-level context {}",
                top.id
            ))),
            Ok(DecisionContext::Select(select)) => {
                let id = select.id;
                match self.pages.get_mut(&id) {
                    Some(Page::Select(page)) => {
                        debug!("Reusing page {}", id);
                        page.update_context(select, &self.images);
                    }
                    _ => {
                        debug!("New page {}: {}", id, select.description);
                        let remembered = self.defaults.get(&select.description);
                        let page = SelectPage::new(select, remembered, &self.images);
                        self.pages.insert(id, Page::Select(page));
                    }
                }
                self.stack.push(Slot::Cached(id));
            }
            Ok(DecisionContext::RequireVersions(gate)) => {
                debug!("Requirements {} not satisfied", gate.id);
                let page = RequiresPage::new(gate, self.environment);
                self.stack.push(Slot::Owned(Page::Requires(page)));
            }
            Ok(DecisionContext::Termination(Termination::Completed(state))) => {
                info!("Wizard completed");
                let page = CompletePage::new(state, self.subpackages, &self.plugin_extensions);
                self.stack.push(Slot::Owned(Page::Complete(page)));
                self.phase = NavPhase::Completed;
            }
            Ok(DecisionContext::Termination(Termination::Cancelled { message })) => {
                info!("Wizard cancelled by the script");
                self.cancel_message = message.clone();
                self.stack.push(Slot::Owned(Page::Cancelled(CancelPage::new(message))));
                self.phase = NavPhase::Cancelled;
            }
        }
    }

    fn fail(&mut self, error: ScriptError) {
        warn!("Wizard script error: {}", error);
        self.stack
            .push(Slot::Owned(Page::Error(ErrorPage::new(error.clone()))));
        self.failure = Some(error);
        self.phase = NavPhase::Failed;
    }
}
