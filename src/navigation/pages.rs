//! Wizard pages
//!
//! One page per kind of decision context. A frontend renders `view()`, lets
//! the user edit the page through the typed accessors and asks the navigator
//! to move on; the navigator takes what to send back to the interpreter from
//! `commit()`.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::PathBuf;

use strum::Display;

use crate::archive::SubPackages;
use crate::context::{Choice, RequireVersionsContext, SelectContext};
use crate::error::ScriptError;
use crate::requirements::{check_versions, Environment, Facet, RequirementStatus};
use crate::state::{normalize_path, RunState, UiOverrides};
use crate::transform::ini::render_tweaks;

/// Archive image path (normalized, lowercase) to extracted file.
pub type ImageMap = HashMap<String, PathBuf>;

/// Key of `path` in an `ImageMap`.
pub fn image_key(path: &str) -> String {
    normalize_path(path).to_lowercase()
}

/// Label of the forward button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum NextAction {
    #[strum(serialize = "Next")]
    Next,
    #[strum(serialize = "Install anyway")]
    InstallAnyway,
    #[strum(serialize = "Install")]
    Install,
}

/// What committing a page hands over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Commit {
    /// Resume the interpreter with a choice
    Select(Choice),
    /// Resume the interpreter past a version gate
    Proceed,
    /// Accept the run
    Install,
    /// Nothing to commit
    Blocked,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionView {
    pub name: String,
    pub description: String,
    pub image: Option<PathBuf>,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacetRow {
    pub facet: Facet,
    pub required: Option<String>,
    pub installed: Option<String>,
    pub satisfied: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginRow {
    pub name: String,
    pub enabled: bool,
}

/// Render-ready content of a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageView {
    Select {
        description: String,
        multiple: bool,
        options: Vec<OptionView>,
    },
    Requirements {
        game: String,
        rows: Vec<FacetRow>,
    },
    Complete {
        subpackages: Vec<(String, bool)>,
        plugins: Vec<PluginRow>,
        tweaks: Vec<(String, String)>,
        notes: String,
    },
    Cancelled {
        message: Option<String>,
    },
    Error {
        message: String,
        hint: String,
    },
}

/// Behavior every page provides.
pub trait PageBehavior {
    fn view(&self) -> PageView;

    fn commit(&self) -> Commit;

    /// Index of the option that should get the focus, if any.
    fn focus_default(&self) -> Option<usize>;

    fn next_action(&self) -> Option<NextAction>;
}

// ============================================================================
// Select
// ============================================================================

#[derive(Debug, Clone)]
pub struct SelectPage<C> {
    context: SelectContext<C>,
    /// Selected option indices, ascending
    selected: Vec<usize>,
    images: Vec<Option<PathBuf>>,
}

impl<C> SelectPage<C> {
    /// Page for `context`. Names remembered from an earlier installation win
    /// over the script's defaults.
    pub fn new(context: SelectContext<C>, remembered: Option<&[String]>, images: &ImageMap) -> Self {
        let selected = seed(&context, remembered);
        let mut page = Self {
            context,
            selected,
            images: Vec::new(),
        };
        page.resolve_images(images);
        page
    }

    /// Attach a fresh context for the same decision point. The selection is
    /// kept when the options did not change.
    pub fn update_context(&mut self, context: SelectContext<C>, images: &ImageMap) {
        if !self.context.same_shape(&context) {
            self.selected = seed(&context, None);
        }
        self.context = context;
        self.resolve_images(images);
    }

    fn resolve_images(&mut self, images: &ImageMap) {
        self.images = self
            .context
            .options
            .iter()
            .map(|option| {
                option
                    .image
                    .as_deref()
                    .and_then(|path| images.get(&image_key(path)).cloned())
            })
            .collect();
    }

    pub fn context(&self) -> &SelectContext<C> {
        &self.context
    }

    pub fn description(&self) -> &str {
        &self.context.description
    }

    pub fn is_select_one(&self) -> bool {
        self.context.is_select_one()
    }

    pub fn option_count(&self) -> usize {
        self.context.options.len()
    }

    pub fn selected_indices(&self) -> &[usize] {
        &self.selected
    }

    pub fn selected_names(&self) -> Vec<String> {
        self.selected
            .iter()
            .map(|&index| self.context.options[index].name.clone())
            .collect()
    }

    pub fn is_selected(&self, index: usize) -> bool {
        self.selected.contains(&index)
    }

    pub fn image(&self, index: usize) -> Option<&PathBuf> {
        self.images.get(index).and_then(Option::as_ref)
    }

    /// Select an option. On a select-one page this replaces the selection.
    /// Returns `false` for an out-of-range index.
    pub fn select(&mut self, index: usize) -> bool {
        if index >= self.option_count() {
            return false;
        }
        if self.is_select_one() {
            self.selected = vec![index];
        } else if !self.selected.contains(&index) {
            self.selected.push(index);
            self.selected.sort_unstable();
        }
        true
    }

    /// Flip an option of a select-many page.
    pub fn toggle(&mut self, index: usize) -> bool {
        if index >= self.option_count() || self.is_select_one() {
            return false;
        }
        match self.selected.iter().position(|&i| i == index) {
            Some(position) => {
                self.selected.remove(position);
            }
            None => {
                self.selected.push(index);
                self.selected.sort_unstable();
            }
        }
        true
    }

    pub fn choice(&self) -> Option<Choice> {
        if self.is_select_one() {
            self.selected.first().map(|&index| Choice::One(index))
        } else {
            Some(Choice::Many(self.selected.clone()))
        }
    }
}

fn seed<C>(context: &SelectContext<C>, remembered: Option<&[String]>) -> Vec<usize> {
    let count = context.options.len();
    let mut selected: Vec<usize> = match remembered {
        Some(names) if !names.is_empty() => context
            .options
            .iter()
            .enumerate()
            .filter(|(_, option)| names.contains(&option.name))
            .map(|(index, _)| index)
            .collect(),
        _ => context.default_indices(),
    };
    selected.retain(|&index| index < count);
    selected.sort_unstable();
    selected.dedup();

    if context.is_select_one() {
        // A select-one prompt always has exactly one option selected.
        selected.truncate(1);
        if selected.is_empty() && count > 0 {
            selected.push(0);
        }
    }
    selected
}

impl<C> PageBehavior for SelectPage<C> {
    fn view(&self) -> PageView {
        PageView::Select {
            description: self.context.description.clone(),
            multiple: !self.is_select_one(),
            options: self
                .context
                .options
                .iter()
                .enumerate()
                .map(|(index, option)| OptionView {
                    name: option.name.clone(),
                    description: option.description.clone(),
                    image: self.image(index).cloned(),
                    selected: self.is_selected(index),
                })
                .collect(),
        }
    }

    fn commit(&self) -> Commit {
        match self.choice() {
            Some(choice) => Commit::Select(choice),
            None => Commit::Blocked,
        }
    }

    fn focus_default(&self) -> Option<usize> {
        match self.selected.first() {
            Some(&index) => Some(index),
            None if self.option_count() > 0 => Some(0),
            None => None,
        }
    }

    fn next_action(&self) -> Option<NextAction> {
        Some(NextAction::Next)
    }
}

// ============================================================================
// Requirements
// ============================================================================

#[derive(Debug, Clone)]
pub struct RequiresPage<C> {
    context: RequireVersionsContext<C>,
    game: String,
    status: RequirementStatus,
    installed: Vec<Option<String>>,
}

impl<C> RequiresPage<C> {
    pub fn new<E: Environment + ?Sized>(context: RequireVersionsContext<C>, environment: &E) -> Self {
        let status = check_versions(&context, environment);
        let installed = Facet::all()
            .map(|facet| facet.installed(environment).map(|v| v.to_string()))
            .collect();
        Self {
            context,
            game: environment.game_name().to_string(),
            status,
            installed,
        }
    }

    pub fn context(&self) -> &RequireVersionsContext<C> {
        &self.context
    }

    pub fn status(&self) -> RequirementStatus {
        self.status
    }

    pub fn rows(&self) -> Vec<FacetRow> {
        Facet::all()
            .zip(&self.installed)
            .map(|(facet, installed)| FacetRow {
                facet,
                required: facet.required(&self.context.requirements).map(str::to_string),
                installed: installed.clone(),
                satisfied: self.status.facet(facet),
            })
            .collect()
    }
}

impl<C> PageBehavior for RequiresPage<C> {
    fn view(&self) -> PageView {
        PageView::Requirements {
            game: self.game.clone(),
            rows: self.rows(),
        }
    }

    fn commit(&self) -> Commit {
        Commit::Proceed
    }

    fn focus_default(&self) -> Option<usize> {
        None
    }

    fn next_action(&self) -> Option<NextAction> {
        Some(NextAction::InstallAnyway)
    }
}

// ============================================================================
// Completion
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
struct PluginEntry {
    original: String,
    name: String,
    enabled: bool,
}

/// Summary of a completed run, with the last adjustments the user can make
/// before installing.
#[derive(Debug, Clone)]
pub struct CompletePage {
    state: RunState,
    subpackages: Vec<(String, bool)>,
    plugins: Vec<PluginEntry>,
    renames: BTreeMap<String, String>,
}

impl CompletePage {
    pub fn new(state: RunState, subpackages: &SubPackages, plugin_extensions: &[String]) -> Self {
        let rows = subpackages
            .iter()
            .map(|package| {
                let checked = state
                    .subpackages
                    .iter()
                    .any(|name| name.eq_ignore_ascii_case(package.name()));
                (package.name().to_string(), checked)
            })
            .collect();

        let mut originals: Vec<String> = Vec::new();
        for package in subpackages {
            for plugin in package.plugins(plugin_extensions) {
                if !originals.iter().any(|p| p.eq_ignore_ascii_case(plugin)) {
                    originals.push(plugin.to_string());
                }
            }
        }

        let mut plugins: Vec<PluginEntry> = originals
            .into_iter()
            .map(|original| {
                let name = state
                    .renames
                    .iter()
                    .find(|(from, _)| from.eq_ignore_ascii_case(&original))
                    .map(|(_, to)| to.clone())
                    .unwrap_or_else(|| original.clone());
                // Scripts usually enable a plugin before renaming it
                let enabled = state.is_plugin_enabled(&original) || state.is_plugin_enabled(&name);
                PluginEntry {
                    original,
                    name,
                    enabled,
                }
            })
            .collect();
        plugins.sort_by_key(|plugin| plugin.name.to_lowercase());

        let renames = state.renames.clone();
        Self {
            state,
            subpackages: rows,
            plugins,
            renames,
        }
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn subpackages(&self) -> &[(String, bool)] {
        &self.subpackages
    }

    pub fn plugins(&self) -> Vec<PluginRow> {
        self.plugins
            .iter()
            .map(|plugin| PluginRow {
                name: plugin.name.clone(),
                enabled: plugin.enabled,
            })
            .collect()
    }

    /// Check or uncheck a sub-package. Returns `false` if it is not listed.
    pub fn set_subpackage(&mut self, name: &str, checked: bool) -> bool {
        match self
            .subpackages
            .iter_mut()
            .find(|(package, _)| package.eq_ignore_ascii_case(name))
        {
            Some(row) => {
                row.1 = checked;
                true
            }
            None => false,
        }
    }

    /// Enable or disable a plugin by its displayed name.
    pub fn set_plugin(&mut self, name: &str, enabled: bool) -> bool {
        match self
            .plugins
            .iter_mut()
            .find(|plugin| plugin.name.eq_ignore_ascii_case(name))
        {
            Some(plugin) => {
                plugin.enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// Give the plugin displayed as `name` a new name.
    pub fn rename_plugin(&mut self, name: &str, new_name: &str) -> bool {
        let new_name = new_name.trim();
        if new_name.is_empty() || new_name.contains(['/', '\\']) {
            return false;
        }
        let Some(plugin) = self
            .plugins
            .iter_mut()
            .find(|plugin| plugin.name.eq_ignore_ascii_case(name))
        else {
            return false;
        };

        self.renames
            .retain(|from, _| !from.eq_ignore_ascii_case(&plugin.original));
        if new_name != plugin.original {
            self.renames
                .insert(plugin.original.clone(), new_name.to_string());
        }
        plugin.name = new_name.to_string();
        self.plugins.sort_by_key(|plugin| plugin.name.to_lowercase());
        true
    }

    /// Preview of every tweak file, in script order.
    pub fn tweak_previews(&self) -> Vec<(String, String)> {
        self.state
            .tweaks
            .iter()
            .map(|tweak| (tweak.file.clone(), render_tweaks(&tweak.settings)))
            .collect()
    }

    /// Script notes as a markdown bullet list.
    pub fn notes_markdown(&self) -> String {
        self.state
            .notes
            .iter()
            .map(|note| format!("- {}\n", note))
            .collect()
    }

    pub fn overrides(&self) -> UiOverrides {
        let subpackages: BTreeSet<String> = self
            .subpackages
            .iter()
            .filter(|(_, checked)| *checked)
            .map(|(name, _)| name.clone())
            .collect();
        let plugins: BTreeMap<String, bool> = self
            .plugins
            .iter()
            .map(|plugin| (plugin.name.clone(), plugin.enabled))
            .collect();
        UiOverrides {
            subpackages: Some(subpackages),
            plugins: Some(plugins),
            renames: Some(self.renames.clone()),
        }
    }

    pub fn into_state(self) -> RunState {
        self.state
    }
}

impl PageBehavior for CompletePage {
    fn view(&self) -> PageView {
        PageView::Complete {
            subpackages: self.subpackages.clone(),
            plugins: self.plugins(),
            tweaks: self.tweak_previews(),
            notes: self.notes_markdown(),
        }
    }

    fn commit(&self) -> Commit {
        Commit::Install
    }

    fn focus_default(&self) -> Option<usize> {
        None
    }

    fn next_action(&self) -> Option<NextAction> {
        Some(NextAction::Install)
    }
}

// ============================================================================
// Cancel / Error
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelPage {
    message: Option<String>,
}

impl CancelPage {
    pub fn new(message: Option<String>) -> Self {
        Self { message }
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

impl PageBehavior for CancelPage {
    fn view(&self) -> PageView {
        PageView::Cancelled {
            message: self.message.clone(),
        }
    }

    fn commit(&self) -> Commit {
        Commit::Blocked
    }

    fn focus_default(&self) -> Option<usize> {
        None
    }

    fn next_action(&self) -> Option<NextAction> {
        None
    }
}

pub const ERROR_HINT: &str =
    "The wizard.txt script is probably incorrect. Contact the mod author or install the mod manually.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorPage {
    error: ScriptError,
}

impl ErrorPage {
    pub fn new(error: ScriptError) -> Self {
        Self { error }
    }

    pub fn error(&self) -> &ScriptError {
        &self.error
    }
}

impl PageBehavior for ErrorPage {
    fn view(&self) -> PageView {
        let message = match self.error.line() {
            Some(line) => format!("{} (line {})", self.error, line),
            None => self.error.to_string(),
        };
        PageView::Error {
            message,
            hint: ERROR_HINT.to_string(),
        }
    }

    fn commit(&self) -> Commit {
        Commit::Blocked
    }

    fn focus_default(&self) -> Option<usize> {
        None
    }

    fn next_action(&self) -> Option<NextAction> {
        None
    }
}

// ============================================================================
// Page
// ============================================================================

#[derive(Debug, Clone)]
pub enum Page<C> {
    Select(SelectPage<C>),
    Requires(RequiresPage<C>),
    Complete(CompletePage),
    Cancelled(CancelPage),
    Error(ErrorPage),
}

impl<C> Page<C> {
    pub fn as_select(&self) -> Option<&SelectPage<C>> {
        match self {
            Self::Select(page) => Some(page),
            _ => None,
        }
    }

    pub fn as_select_mut(&mut self) -> Option<&mut SelectPage<C>> {
        match self {
            Self::Select(page) => Some(page),
            _ => None,
        }
    }

    pub fn as_complete(&self) -> Option<&CompletePage> {
        match self {
            Self::Complete(page) => Some(page),
            _ => None,
        }
    }

    pub fn as_complete_mut(&mut self) -> Option<&mut CompletePage> {
        match self {
            Self::Complete(page) => Some(page),
            _ => None,
        }
    }

    fn behavior(&self) -> &dyn PageBehavior {
        match self {
            Self::Select(page) => page,
            Self::Requires(page) => page,
            Self::Complete(page) => page,
            Self::Cancelled(page) => page,
            Self::Error(page) => page,
        }
    }
}

impl<C> PageBehavior for Page<C> {
    fn view(&self) -> PageView {
        self.behavior().view()
    }

    fn commit(&self) -> Commit {
        self.behavior().commit()
    }

    fn focus_default(&self) -> Option<usize> {
        self.behavior().focus_default()
    }

    fn next_action(&self) -> Option<NextAction> {
        self.behavior().next_action()
    }
}
