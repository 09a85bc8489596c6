//! Archive layout analysis
//!
//! Finds the folder holding `wizard.txt`, the images the script can show and
//! the sub-packages the script can select.
//!
//! # Sub-package rules
//!
//! A top-level directory of the wizard base is a sub-package if any of:
//!
//! | Rule | Example |
//! |------|---------|
//! | The `DataChecker` accepts it as a data folder | `00 Core/` with `textures/` |
//! | It holds an `INI Tweaks` or `INI` folder | `20 Tweaks/INI Tweaks/` |
//! | Its name is `<number> <doc...>` | `02 Docs` |

use tracing::debug;

use crate::tree::{Entry, FileTree};

pub const WIZARD_SCRIPT: &str = "wizard.txt";

/// Folders that mark a sub-package as carrying INI tweaks.
const TWEAK_MARKERS: &[&str] = &["INI Tweaks", "INI"];

/// Decides whether a folder looks like the game's data folder.
pub trait DataChecker {
    fn looks_valid(&self, tree: &FileTree) -> bool;
}

/// Data layout of Gamebryo/Creation engine games: plugins, archives or any
/// of the well-known data folders at the top level.
#[derive(Debug, Clone)]
pub struct GamebryoDataChecker {
    folders: Vec<String>,
    extensions: Vec<String>,
}

impl Default for GamebryoDataChecker {
    fn default() -> Self {
        let folders = [
            "fonts", "interface", "menus", "meshes", "music", "scripts", "shaders", "sound",
            "strings", "textures", "trees", "video", "facegen", "materials", "skse", "obse",
            "nvse", "fose", "f4se", "distantlod", "asi", "calientetools", "netscriptframework",
            "seq", "grass", "lodsettings", "source",
        ];
        let extensions = ["esp", "esm", "esl", "bsa", "ba2", "modgroups"];
        Self {
            folders: folders.iter().map(|s| s.to_string()).collect(),
            extensions: extensions.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl DataChecker for GamebryoDataChecker {
    fn looks_valid(&self, tree: &FileTree) -> bool {
        tree.entries().iter().any(|entry| match entry {
            Entry::Directory(dir) => self
                .folders
                .iter()
                .any(|folder| folder.eq_ignore_ascii_case(dir.name())),
            Entry::File(file) => file.has_extension(&self.extensions),
        })
    }
}

/// A selectable top-level folder of the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubPackage {
    name: String,
    files: Vec<String>,
    root_files: Vec<String>,
}

impl SubPackage {
    pub fn from_tree(tree: &FileTree) -> Self {
        let files = tree.walk_files().into_iter().map(|(path, _)| path).collect();
        let root_files = tree
            .entries()
            .iter()
            .filter(|entry| entry.is_file())
            .map(|entry| entry.name().to_string())
            .collect();
        Self {
            name: tree.name().to_string(),
            files,
            root_files,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Every file path, relative to the sub-package folder.
    pub fn files(&self) -> &[String] {
        &self.files
    }

    /// Plugin files at the root of the sub-package.
    pub fn plugins<'a>(&'a self, extensions: &'a [String]) -> impl Iterator<Item = &'a str> + 'a {
        self.root_files
            .iter()
            .filter(|name| crate::tree::has_extension(name, extensions))
            .map(String::as_str)
    }
}

/// Ordered sub-packages of an archive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubPackages {
    packages: Vec<SubPackage>,
}

impl SubPackages {
    pub fn new(packages: Vec<SubPackage>) -> Self {
        Self { packages }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SubPackage> {
        self.packages.iter()
    }

    pub fn get(&self, name: &str) -> Option<&SubPackage> {
        self.packages
            .iter()
            .find(|package| package.name.eq_ignore_ascii_case(name))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.packages.iter().map(|package| package.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

impl<'a> IntoIterator for &'a SubPackages {
    type Item = &'a SubPackage;
    type IntoIter = std::slice::Iter<'a, SubPackage>;

    fn into_iter(self) -> Self::IntoIter {
        self.packages.iter()
    }
}

/// The folder holding `wizard.txt`: the tree itself, or the only directory
/// of a tree with a single entry, recursively.
pub fn find_wizard_base(tree: &FileTree) -> Option<&FileTree> {
    if tree.find_file(WIZARD_SCRIPT).is_some() {
        return Some(tree);
    }
    match tree.entries() {
        [Entry::Directory(only)] => find_wizard_base(only),
        _ => None,
    }
}

pub fn is_archive_supported(tree: &FileTree) -> bool {
    find_wizard_base(tree).is_some()
}

/// Archive paths of every image file in the tree.
pub fn image_entries(tree: &FileTree, extensions: &[String]) -> Vec<String> {
    tree.walk_files()
        .into_iter()
        .filter(|(_, file)| file.has_extension(extensions))
        .map(|(path, _)| path)
        .collect()
}

/// Collect the sub-packages among the top-level directories of `base`.
pub fn discover_subpackages(base: &FileTree, checker: &dyn DataChecker) -> SubPackages {
    let mut packages = Vec::new();
    for entry in base.entries() {
        let Entry::Directory(dir) = entry else {
            continue;
        };
        if checker.looks_valid(dir)
            || TWEAK_MARKERS.iter().any(|marker| dir.child(marker).is_some())
            || is_docs_folder(dir.name())
        {
            debug!("Sub-package found: {}", dir.name());
            packages.push(SubPackage::from_tree(dir));
        }
    }
    SubPackages::new(packages)
}

/// `02 Docs`, `99 documentation`, ...
fn is_docs_folder(name: &str) -> bool {
    let mut parts = name.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some(number), Some(word)) => {
            !number.is_empty()
                && number.chars().all(|c| c.is_ascii_digit())
                && word.to_ascii_lowercase().starts_with("doc")
        }
        _ => false,
    }
}
