//! Property-based tests for the wizard installer
//!
//! These tests verify:
//! - Version ordering agrees with numeric component ordering
//! - Satisfied version gates are skipped as if accepted
//! - Going back never runs the script
//! - Select pages keep their selection invariants
//! - Stored selections survive any key order

mod common;

use proptest::prelude::*;

use bain_wizard::archive::SubPackages;
use bain_wizard::context::{ContextId, SelectContext, SelectMode, SelectOption};
use bain_wizard::navigation::{
    ImageMap, NavPhase, Navigator, PageBehavior, PageView, RunOutcome, SelectPage,
};
use bain_wizard::persistence::PersistedSelections;
use bain_wizard::requirements::StaticEnvironment;
use bain_wizard::state::RunState;
use bain_wizard::tree::{FileContent, FileTree};
use bain_wizard::version::VersionInfo;

use common::{opt, requires_game, select_one, Effect, GraphInterpreter, Node};

// =============================================================================
// Versions
// =============================================================================

fn components() -> impl Strategy<Value = Vec<u64>> {
    prop::collection::vec(0u64..2_000, 1..6)
}

fn padded(components: &[u64]) -> Vec<u64> {
    let mut padded = components.to_vec();
    padded.resize(6, 0);
    padded
}

fn render(components: &[u64]) -> String {
    components
        .iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(".")
}

proptest! {
    /// Comparison follows the zero-padded numeric components
    #[test]
    fn version_order_matches_components(a in components(), b in components()) {
        let va = VersionInfo::parse(&render(&a)).expect("valid");
        let vb = VersionInfo::parse(&render(&b)).expect("valid");
        prop_assert_eq!(va.cmp(&vb), padded(&a).cmp(&padded(&b)));
    }

    /// Trailing zero components do not change a version
    #[test]
    fn version_trailing_zeros_are_equal(a in components(), zeros in 1usize..3) {
        let mut longer = a.clone();
        longer.extend(std::iter::repeat(0).take(zeros));
        let va = VersionInfo::parse(&render(&a)).expect("valid");
        let vb = VersionInfo::parse(&render(&longer)).expect("valid");
        prop_assert_eq!(va, vb);
    }

    /// Parsing arbitrary input never panics
    #[test]
    fn version_parse_doesnt_crash(s in ".*") {
        let _ = VersionInfo::parse(&s);
    }
}

// =============================================================================
// Navigation
// =============================================================================

/// Q -> `gates` times (game 1.0 gate -> note) -> done
fn gated_chain(gates: usize) -> GraphInterpreter {
    let mut nodes = vec![select_one("Q", vec![opt("Go", 1)], Some(0))];
    for i in 0..gates {
        nodes.push(requires_game("1.0", 2 * i + 2));
        nodes.push(Node::Effects {
            effects: vec![Effect::Note(format!("passed gate {}", i))],
            next: 2 * i + 3,
        });
    }
    nodes.push(Node::Complete);
    GraphInterpreter::new(nodes)
}

/// Final page and state of a run through `gated_chain(gates)`, accepting
/// every page shown.
fn run_gated(gates: usize, game_version: &str) -> (usize, PageView, RunState) {
    let interpreter = gated_chain(gates);
    let env = StaticEnvironment::new("Skyrim", game_version);
    let packages = SubPackages::default();
    let mut nav = Navigator::new(&interpreter, &env, &packages);
    nav.start(interpreter.top()).expect("start");
    let mut steps = 0;
    while nav.phase() == NavPhase::Active {
        nav.next().expect("next");
        steps += 1;
    }
    assert_eq!(nav.phase(), NavPhase::Completed);
    let view = nav.current().expect("completion page").view();
    match nav.finish().expect("finish") {
        RunOutcome::Completed(run) => (steps, view, run.state),
        other => panic!("expected a completed run, got {:?}", other),
    }
}

/// `pages` select-one pages in a row, then done
fn page_chain(pages: usize) -> GraphInterpreter {
    let mut nodes: Vec<Node> = (0..pages)
        .map(|i| {
            select_one(
                &format!("Page {}", i),
                vec![opt("First", i + 1), opt("Second", i + 1)],
                Some(0),
            )
        })
        .collect();
    nodes.push(Node::Complete);
    GraphInterpreter::new(nodes)
}

proptest! {
    /// Skipping satisfied gates ends where accepting each gate page does
    #[test]
    fn satisfied_gates_skip_like_accepted_pages(gates in 0usize..8) {
        let (skipped_steps, skipped_view, skipped_state) = run_gated(gates, "1.5.97");
        let (accepted_steps, accepted_view, accepted_state) = run_gated(gates, "0.9");

        prop_assert_eq!(skipped_steps, 1);
        prop_assert_eq!(accepted_steps, 1 + gates);
        prop_assert_eq!(skipped_view, accepted_view);
        prop_assert_eq!(skipped_state.notes.len(), gates);
        prop_assert_eq!(skipped_state, accepted_state);
    }

    /// Only forward moves reach the interpreter; the depth follows the moves
    #[test]
    fn back_never_runs_the_script(moves in prop::collection::vec(any::<bool>(), 0..30)) {
        let pages = 40;
        let interpreter = page_chain(pages);
        let env = StaticEnvironment::new("Skyrim", "1.5.97");
        let packages = SubPackages::default();
        let mut nav = Navigator::new(&interpreter, &env, &packages);
        nav.start(interpreter.top()).expect("start");

        let mut depth = 1;
        for forward in moves {
            let calls = interpreter.calls();
            if forward {
                nav.next().expect("next");
                depth += 1;
                prop_assert_eq!(interpreter.calls(), calls + 1);
            } else if depth > 1 {
                nav.back().expect("back");
                depth -= 1;
                prop_assert_eq!(interpreter.calls(), calls);
            } else {
                prop_assert!(nav.back().is_err());
            }
            prop_assert_eq!(nav.depth(), depth);
            prop_assert!(nav.cached_pages() >= depth);
        }
    }
}

// =============================================================================
// Select pages
// =============================================================================

fn select_page(count: usize, one: bool, default: Option<usize>) -> SelectPage<()> {
    let mode = if one {
        SelectMode::One { default }
    } else {
        SelectMode::Many {
            defaults: default.into_iter().collect(),
        }
    };
    let context = SelectContext {
        id: ContextId(1),
        description: "Options".into(),
        options: (0..count)
            .map(|i| SelectOption::new(format!("Option {}", i), ""))
            .collect(),
        mode,
        cursor: (),
    };
    SelectPage::new(context, None, &ImageMap::new())
}

proptest! {
    /// A select-one page always holds exactly one in-range option
    #[test]
    fn select_one_keeps_single_selection(
        count in 1usize..10,
        default in prop::option::of(0usize..20),
        clicks in prop::collection::vec(0usize..20, 0..20),
    ) {
        let mut page = select_page(count, true, default);
        prop_assert_eq!(page.selected_indices().len(), 1);
        for click in clicks {
            let accepted = page.select(click);
            prop_assert_eq!(accepted, click < count);
            prop_assert_eq!(page.selected_indices().len(), 1);
            prop_assert!(page.selected_indices()[0] < count);
        }
    }

    /// Toggling keeps the selection sorted, unique and in range
    #[test]
    fn select_many_toggle_keeps_sorted_unique(
        count in 0usize..10,
        toggles in prop::collection::vec(0usize..12, 0..30),
    ) {
        let mut page = select_page(count, false, None);
        for index in toggles {
            page.toggle(index);
            let selected = page.selected_indices();
            prop_assert!(selected.windows(2).all(|w| w[0] < w[1]));
            prop_assert!(selected.iter().all(|&i| i < count));
        }
    }
}

// =============================================================================
// Trees and stored selections
// =============================================================================

fn file_paths() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-c]{1,2}(/[a-c]{1,2}){0,2}\\.txt", 0..12)
}

proptest! {
    /// Merging a tree into itself changes nothing
    #[test]
    fn tree_merge_is_idempotent(paths in file_paths()) {
        let mut tree = FileTree::new("");
        for path in &paths {
            tree.add_file(path, FileContent::Data(path.as_bytes().to_vec()), true);
        }
        let before: Vec<String> = tree.walk_files().into_iter().map(|(p, _)| p).collect();

        let copy = tree.clone();
        tree.merge(&copy);
        let after: Vec<String> = tree.walk_files().into_iter().map(|(p, _)| p).collect();
        prop_assert_eq!(before, after);
    }

    /// Stored selections can be read back whatever order the keys come in
    #[test]
    fn selections_survive_key_order(
        pages in prop::collection::vec(
            ("[A-Za-z ]{1,12}", prop::collection::vec("[A-Za-z0-9 ]{1,8}", 0..14)),
            0..14,
        ),
        seed in any::<u64>(),
    ) {
        let stored = PersistedSelections::new(pages);
        let mut settings = stored.to_settings();
        // Deterministic shuffle
        let len = settings.len();
        if len > 1 {
            let mut state = seed;
            for i in (1..len).rev() {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                settings.swap(i, (state >> 33) as usize % (i + 1));
            }
        }
        prop_assert_eq!(PersistedSelections::from_settings(settings), stored);
    }
}
