//! Shared test fixtures
//!
//! `GraphInterpreter` stands in for a real `wizard.txt` evaluator: the script
//! is a list of nodes, each select option or gate names the node to continue
//! at. Context ids are node positions, so reaching a node through different
//! paths yields the same id.

#![allow(dead_code)]

use std::cell::Cell;
use std::fs;
use std::path::{Path, PathBuf};

use bain_wizard::context::{
    Choice, ContextId, DecisionContext, RequireVersionsContext, SelectContext, SelectMode,
    SelectOption, Termination, TopLevelContext, VersionRequirements,
};
use bain_wizard::error::ScriptError;
use bain_wizard::interpreter::ScriptInterpreter;
use bain_wizard::state::{IniSetting, RunState};

/// A script statement that changes the run state.
#[derive(Debug, Clone)]
pub enum Effect {
    SubPackage(String),
    Plugin(String),
    DeselectPlugin(String),
    Rename(String, String),
    Note(String),
    Tweak(String, IniSetting),
}

impl Effect {
    fn apply(&self, state: &mut RunState) {
        match self {
            Self::SubPackage(name) => state.select_subpackage(name.clone()),
            Self::Plugin(name) => state.select_plugin(name.clone()),
            Self::DeselectPlugin(name) => state.deselect_plugin(name.clone()),
            Self::Rename(from, to) => state.rename_plugin(from.clone(), to.clone()),
            Self::Note(note) => state.add_note(note.clone()),
            Self::Tweak(file, setting) => state.tweaks.add(file, setting.clone()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScriptOption {
    pub name: String,
    pub effects: Vec<Effect>,
    /// Node to continue at (select-one pages only)
    pub goto: usize,
}

pub fn opt(name: &str, goto: usize) -> ScriptOption {
    ScriptOption {
        name: name.to_string(),
        effects: Vec::new(),
        goto,
    }
}

impl ScriptOption {
    pub fn with(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

#[derive(Debug, Clone)]
pub enum Node {
    SelectOne {
        description: String,
        options: Vec<ScriptOption>,
        default: Option<usize>,
    },
    SelectMany {
        description: String,
        options: Vec<ScriptOption>,
        defaults: Vec<usize>,
        next: usize,
    },
    Requires {
        requirements: VersionRequirements,
        next: usize,
    },
    Effects {
        effects: Vec<Effect>,
        next: usize,
    },
    Cancel(Option<String>),
    Complete,
    Error(String),
}

pub fn select_one(description: &str, options: Vec<ScriptOption>, default: Option<usize>) -> Node {
    Node::SelectOne {
        description: description.to_string(),
        options,
        default,
    }
}

pub fn select_many(
    description: &str,
    options: Vec<ScriptOption>,
    defaults: Vec<usize>,
    next: usize,
) -> Node {
    Node::SelectMany {
        description: description.to_string(),
        options,
        defaults,
        next,
    }
}

pub fn requires_game(version: &str, next: usize) -> Node {
    Node::Requires {
        requirements: VersionRequirements {
            game: Some(version.to_string()),
            ..Default::default()
        },
        next,
    }
}

/// Resume position: the node to evaluate and the state so far.
#[derive(Debug, Clone)]
pub struct GraphCursor {
    pub node: usize,
    pub state: RunState,
}

/// Declarative fake interpreter. Node 0 is where the script starts.
pub struct GraphInterpreter {
    nodes: Vec<Node>,
    calls: Cell<usize>,
}

const MAX_STEPS: usize = 1_000;

impl GraphInterpreter {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self {
            nodes,
            calls: Cell::new(0),
        }
    }

    /// Number of transitions evaluated so far.
    pub fn calls(&self) -> usize {
        self.calls.get()
    }

    pub fn top(&self) -> TopLevelContext<GraphCursor> {
        self.top_level(Path::new("wizard.txt"), RunState::new())
            .expect("top level context")
    }

    fn eval(&self, mut node: usize, mut state: RunState) -> Result<DecisionContext<GraphCursor>, ScriptError> {
        self.calls.set(self.calls.get() + 1);
        for _ in 0..MAX_STEPS {
            let current = self
                .nodes
                .get(node)
                .ok_or_else(|| ScriptError::new(format!("jump to missing node {}", node)))?;
            let id = ContextId(node as u64 + 1);
            let cursor = GraphCursor {
                node,
                state: state.clone(),
            };
            match current {
                Node::SelectOne {
                    description,
                    options,
                    default,
                } => {
                    return Ok(DecisionContext::Select(SelectContext {
                        id,
                        description: description.clone(),
                        options: options.iter().map(|o| SelectOption::new(&o.name, "")).collect(),
                        mode: SelectMode::One { default: *default },
                        cursor,
                    }));
                }
                Node::SelectMany {
                    description,
                    options,
                    defaults,
                    ..
                } => {
                    return Ok(DecisionContext::Select(SelectContext {
                        id,
                        description: description.clone(),
                        options: options.iter().map(|o| SelectOption::new(&o.name, "")).collect(),
                        mode: SelectMode::Many {
                            defaults: defaults.clone(),
                        },
                        cursor,
                    }));
                }
                Node::Requires { requirements, .. } => {
                    return Ok(DecisionContext::RequireVersions(RequireVersionsContext::new(
                        id,
                        requirements.clone(),
                        cursor,
                    )));
                }
                Node::Effects { effects, next } => {
                    for effect in effects {
                        effect.apply(&mut state);
                    }
                    node = *next;
                }
                Node::Cancel(message) => {
                    return Ok(DecisionContext::Termination(Termination::Cancelled {
                        message: message.clone(),
                    }));
                }
                Node::Complete => {
                    return Ok(DecisionContext::Termination(Termination::Completed(state)));
                }
                Node::Error(message) => return Err(ScriptError::new(message.clone()).at_line(node)),
            }
        }
        Err(ScriptError::new("script does not terminate"))
    }
}

impl ScriptInterpreter for GraphInterpreter {
    type Cursor = GraphCursor;

    fn top_level(&self, script: &Path, state: RunState) -> Result<TopLevelContext<GraphCursor>, ScriptError> {
        Ok(TopLevelContext {
            id: ContextId(0),
            script: script.to_path_buf(),
            state: state.clone(),
            cursor: GraphCursor { node: 0, state },
        })
    }

    fn exec_top_level(
        &self,
        context: &TopLevelContext<GraphCursor>,
    ) -> Result<DecisionContext<GraphCursor>, ScriptError> {
        self.eval(context.cursor.node, context.cursor.state.clone())
    }

    fn exec_requirements(
        &self,
        context: &RequireVersionsContext<GraphCursor>,
    ) -> Result<DecisionContext<GraphCursor>, ScriptError> {
        match self.nodes.get(context.cursor.node) {
            Some(Node::Requires { next, .. }) => self.eval(*next, context.cursor.state.clone()),
            _ => Err(ScriptError::new("cursor is not at a RequireVersions")),
        }
    }

    fn select(
        &self,
        context: &SelectContext<GraphCursor>,
        choice: &Choice,
    ) -> Result<DecisionContext<GraphCursor>, ScriptError> {
        let mut state = context.cursor.state.clone();
        match (self.nodes.get(context.cursor.node), choice) {
            (Some(Node::SelectOne { options, .. }), Choice::One(index)) => {
                let option = options
                    .get(*index)
                    .ok_or_else(|| ScriptError::new("option out of range"))?;
                for effect in &option.effects {
                    effect.apply(&mut state);
                }
                self.eval(option.goto, state)
            }
            (Some(Node::SelectMany { options, next, .. }), Choice::Many(indices)) => {
                for index in indices {
                    let option = options
                        .get(*index)
                        .ok_or_else(|| ScriptError::new("option out of range"))?;
                    for effect in &option.effects {
                        effect.apply(&mut state);
                    }
                }
                self.eval(*next, state)
            }
            _ => Err(ScriptError::new("choice does not match the select context")),
        }
    }
}

/// Write `files` (path, content) below `root`.
pub fn write_files(root: &Path, files: &[(&str, &str)]) -> PathBuf {
    for (path, content) in files {
        let full = root.join(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).expect("create parent");
        }
        fs::write(&full, content).expect("write file");
    }
    root.to_path_buf()
}
