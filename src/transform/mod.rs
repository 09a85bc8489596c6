//! Archive Transformer
//!
//! Turns the decisions of a finished wizard run into the tree that gets
//! installed.
//!
//! # Steps
//!
//! | Step | Operation |
//! |------|-----------|
//! | 1 | Merge the selected sub-packages into an empty tree, in archive order |
//! | 2 | Move root plugins that are not enabled into the optional folder |
//! | 3 | Rename root plugins |
//! | 4 | Write INI tweak files, merged into existing files when present |
//!
//! # Design
//!
//! - **Staging**: every step works on a fresh tree that is handed back only
//!   when all steps succeeded, the source tree is never touched
//! - **Warnings are not errors**: a selected sub-package or a rename source
//!   that does not exist is logged and reported, the transform carries on
//! - **I/O failures are fatal**: reading a file to merge or placing a file in
//!   the tree aborts the whole transform

pub mod ini;

use std::fmt;

use tracing::{debug, info, warn};

use crate::config::TransformSettings;
use crate::error::TransformError;
use crate::state::{normalize_path, CompletedRun, IniSetting};
use crate::tree::{read_content, ContentSource, Entry, FileContent, FileTree};

/// One operation applied to the output tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeOp {
    MergeSubPackage { name: String },
    MoveToOptional { plugin: String, folder: String },
    Rename { from: String, to: String },
    WriteTweaks { path: String, merged: bool },
}

impl fmt::Display for TreeOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MergeSubPackage { name } => write!(f, "Merge({})", name),
            Self::MoveToOptional { plugin, folder } => write!(f, "Move({} -> {}/)", plugin, folder),
            Self::Rename { from, to } => write!(f, "Rename({} -> {})", from, to),
            Self::WriteTweaks { path, merged } => {
                write!(f, "Tweaks({}, {})", path, if *merged { "merged" } else { "new" })
            }
        }
    }
}

/// Something a decision referred to that is not in the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissingReference {
    SubPackage(String),
    RenameSource(String),
}

impl fmt::Display for MissingReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SubPackage(name) => write!(f, "sub-package '{}' not found in the archive", name),
            Self::RenameSource(name) => write!(f, "plugin '{}' not found, cannot rename", name),
        }
    }
}

/// What a transform did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformReport {
    pub ops: Vec<TreeOp>,
    pub warnings: Vec<MissingReference>,
}

impl TransformReport {
    fn warn(&mut self, missing: MissingReference) {
        warn!("{}", missing);
        self.warnings.push(missing);
    }

    /// Returns a summary of the transform for logging/display.
    pub fn summary(&self) -> String {
        let mut lines = vec![format!("Operations ({}):", self.ops.len())];
        for (i, op) in self.ops.iter().enumerate() {
            lines.push(format!("  {}. {}", i + 1, op));
        }
        if !self.warnings.is_empty() {
            lines.push(format!("Warnings ({}):", self.warnings.len()));
            for warning in &self.warnings {
                lines.push(format!("  - {}", warning));
            }
        }
        lines.join("\n")
    }
}

#[derive(Debug, Clone)]
pub struct Transformed {
    pub tree: FileTree,
    pub report: TransformReport,
}

pub struct ArchiveTransformer<'a> {
    settings: &'a TransformSettings,
    source: &'a dyn ContentSource,
}

impl<'a> ArchiveTransformer<'a> {
    pub fn new(settings: &'a TransformSettings, source: &'a dyn ContentSource) -> Self {
        Self { settings, source }
    }

    /// Build the install tree for `run` from the wizard base folder `base`.
    pub fn transform(&self, base: &FileTree, run: &CompletedRun) -> Result<Transformed, TransformError> {
        let mut tree = base.create_orphan_tree();
        let mut report = TransformReport::default();

        self.merge_subpackages(base, run, &mut tree, &mut report);
        self.route_optional_plugins(run, &mut tree, &mut report)?;
        self.apply_renames(run, &mut tree, &mut report);
        self.merge_tweaks(run, &mut tree, &mut report)?;

        info!(
            "Transform complete: {} operations, {} warnings",
            report.ops.len(),
            report.warnings.len()
        );
        Ok(Transformed { tree, report })
    }

    fn merge_subpackages(
        &self,
        base: &FileTree,
        run: &CompletedRun,
        tree: &mut FileTree,
        report: &mut TransformReport,
    ) {
        let selected = run.subpackages();

        // Archive order decides which sub-package wins a file conflict.
        for entry in base.entries() {
            let Entry::Directory(package) = entry else {
                continue;
            };
            if selected.iter().any(|name| name.eq_ignore_ascii_case(package.name())) {
                debug!("Merging sub-package {}", package.name());
                tree.merge(package);
                report.ops.push(TreeOp::MergeSubPackage {
                    name: package.name().to_string(),
                });
            }
        }

        for name in selected {
            if base.find_dir(name).is_none() || name.contains(['/', '\\']) {
                report.warn(MissingReference::SubPackage(name.clone()));
            }
        }
    }

    fn route_optional_plugins(
        &self,
        run: &CompletedRun,
        tree: &mut FileTree,
        report: &mut TransformReport,
    ) -> Result<(), TransformError> {
        let extensions = &self.settings.plugin_extensions;
        let folder = &self.settings.optional_folder;

        let optionals: Vec<String> = tree
            .entries()
            .iter()
            .filter_map(|entry| match entry {
                Entry::File(file)
                    if file.has_extension(extensions) && !run.is_plugin_enabled(file.name()) =>
                {
                    Some(file.name().to_string())
                }
                _ => None,
            })
            .collect();

        // Nothing to move, no folder.
        if optionals.is_empty() {
            return Ok(());
        }
        if tree.find_file(folder).is_some() {
            return Err(TransformError::Create {
                path: folder.clone(),
                reason: "a file with the optional folder's name exists".to_string(),
            });
        }

        for plugin in optionals {
            let dest = format!("{}/{}", folder, plugin);
            if !tree.move_entry(&plugin, &dest) {
                return Err(TransformError::Create {
                    path: dest,
                    reason: "cannot move plugin".to_string(),
                });
            }
            debug!("Moved {} to {}", plugin, folder);
            report.ops.push(TreeOp::MoveToOptional {
                plugin,
                folder: folder.clone(),
            });
        }
        Ok(())
    }

    fn apply_renames(&self, run: &CompletedRun, tree: &mut FileTree, report: &mut TransformReport) {
        for (original, new_name) in run.renames() {
            // Renames only ever target plugins at the root.
            let at_root = matches!(tree.child(original), Some(Entry::File(_)));
            if !at_root {
                report.warn(MissingReference::RenameSource(original.clone()));
                continue;
            }
            if original == new_name {
                continue;
            }
            if tree.move_entry(original, new_name) {
                debug!("Renamed {} to {}", original, new_name);
                report.ops.push(TreeOp::Rename {
                    from: original.clone(),
                    to: new_name.clone(),
                });
            } else {
                report.warn(MissingReference::RenameSource(original.clone()));
            }
        }
    }

    fn merge_tweaks(
        &self,
        run: &CompletedRun,
        tree: &mut FileTree,
        report: &mut TransformReport,
    ) -> Result<(), TransformError> {
        for tweak in run.tweaks().iter() {
            validate_settings(&tweak.file, &tweak.settings)?;

            let path = self.tweak_target(tree, &tweak.file);
            let existing = match tree.find(&path) {
                Some(Entry::File(file)) => Some(file.content().clone()),
                Some(Entry::Directory(_)) => {
                    return Err(TransformError::Create {
                        path,
                        reason: "a folder with that name exists".to_string(),
                    });
                }
                None => None,
            };

            let merged = existing.is_some();
            let bytes = match existing {
                Some(content) => {
                    let original = read_content(&content, self.source).map_err(|source| {
                        TransformError::Read {
                            path: content_path(&content, &path),
                            source,
                        }
                    })?;
                    ini::merge_tweaks(&original, &tweak.settings)
                }
                None => ini::render_tweaks(&tweak.settings).into_bytes(),
            };

            if !tree.add_file(&path, FileContent::Data(bytes), true) {
                return Err(TransformError::Create {
                    path,
                    reason: "a file is in the way of its folder".to_string(),
                });
            }
            info!("Wrote INI tweaks to {} ({} settings)", path, tweak.settings.len());
            report.ops.push(TreeOp::WriteTweaks { path, merged });
        }
        Ok(())
    }

    /// Where the tweaks for `file` end up in the output tree.
    fn tweak_target(&self, tree: &FileTree, file: &str) -> String {
        let file = normalize_path(file);
        if tree.find_file(&file).is_some() {
            return file;
        }
        let first = file.split('/').next().unwrap_or_default();
        if file.contains('/') && self.settings.is_tweak_folder(first) {
            return file;
        }
        format!("{}/{}", self.settings.primary_tweak_folder(), file)
    }
}

fn validate_settings(file: &str, settings: &[IniSetting]) -> Result<(), TransformError> {
    if normalize_path(file).is_empty() {
        return Err(TransformError::Content {
            path: file.to_string(),
            reason: "empty target file name".to_string(),
        });
    }
    for setting in settings {
        if setting.section.trim().is_empty() || setting.key.trim().is_empty() {
            return Err(TransformError::Content {
                path: file.to_string(),
                reason: format!(
                    "tweak needs a section and a key (got [{}] {})",
                    setting.section, setting.key
                ),
            });
        }
    }
    Ok(())
}

fn content_path(content: &FileContent, fallback: &str) -> String {
    match content {
        FileContent::Archive(path) => path.clone(),
        FileContent::Data(_) => fallback.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{RunState, UiOverrides};
    use std::collections::HashMap;
    use std::io;
    use std::path::PathBuf;

    #[derive(Default)]
    struct MemorySource {
        files: HashMap<String, Vec<u8>>,
    }

    impl ContentSource for MemorySource {
        fn read(&self, path: &str) -> io::Result<Vec<u8>> {
            self.files
                .get(path)
                .cloned()
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.to_string()))
        }

        fn local_path(&self, _path: &str) -> Option<PathBuf> {
            None
        }
    }

    fn archive(paths: &[&str]) -> FileTree {
        let mut tree = FileTree::new("");
        for path in paths {
            tree.add_file(path, FileContent::Archive(path.to_string()), false);
        }
        tree
    }

    fn run(subpackages: &[&str], enabled: &[&str]) -> CompletedRun {
        let mut state = RunState::new();
        for name in subpackages {
            state.select_subpackage(*name);
        }
        for name in enabled {
            state.select_plugin(*name);
        }
        CompletedRun::new(state, UiOverrides::default())
    }

    #[test]
    fn test_missing_subpackage_is_warning() {
        let base = archive(&["Core/Main.esp"]);
        let settings = TransformSettings::default();
        let source = MemorySource::default();
        let result = ArchiveTransformer::new(&settings, &source)
            .transform(&base, &run(&["Core", "Ghost"], &["Main.esp"]))
            .expect("transform");
        assert!(result.tree.find_file("Main.esp").is_some());
        assert_eq!(
            result.report.warnings,
            vec![MissingReference::SubPackage("Ghost".into())]
        );
    }

    #[test]
    fn test_no_optional_folder_when_all_enabled() {
        let base = archive(&["Core/Main.esp", "Core/Extra.esm"]);
        let settings = TransformSettings::default();
        let source = MemorySource::default();
        let result = ArchiveTransformer::new(&settings, &source)
            .transform(&base, &run(&["Core"], &["Main.esp", "extra.ESM"]))
            .expect("transform");
        assert!(result.tree.find("optional").is_none());
    }

    #[test]
    fn test_tweak_merge_reads_original_from_source() {
        let base = archive(&["Core/INI Tweaks/Foo.ini"]);
        let mut source = MemorySource::default();
        source.files.insert(
            "Core/INI Tweaks/Foo.ini".into(),
            b"[A]\nx=1\n[B]\ny=2\n".to_vec(),
        );
        let mut completed = run(&["Core"], &[]);
        completed
            .state
            .tweaks
            .add("INI Tweaks\\Foo.ini", IniSetting::new("A", "x", "5"));

        let settings = TransformSettings::default();
        let result = ArchiveTransformer::new(&settings, &source)
            .transform(&base, &completed)
            .expect("transform");
        let file = result.tree.find_file("INI Tweaks/Foo.ini").expect("tweak file");
        assert_eq!(file.content(), &FileContent::Data(b"[A]\nx=5\n[B]\ny=2\n".to_vec()));
        assert_eq!(
            result.report.ops.last(),
            Some(&TreeOp::WriteTweaks {
                path: "INI Tweaks/Foo.ini".into(),
                merged: true
            })
        );
    }

    #[test]
    fn test_tweak_read_failure_is_fatal() {
        let base = archive(&["Core/INI Tweaks/Foo.ini"]);
        let source = MemorySource::default();
        let mut completed = run(&["Core"], &[]);
        completed
            .state
            .tweaks
            .add("INI Tweaks/Foo.ini", IniSetting::new("A", "x", "5"));

        let settings = TransformSettings::default();
        let err = ArchiveTransformer::new(&settings, &source)
            .transform(&base, &completed)
            .unwrap_err();
        assert!(matches!(err, TransformError::Read { .. }));
    }

    #[test]
    fn test_new_tweak_file_goes_to_tweak_folder() {
        let base = archive(&["Core/Main.esp"]);
        let source = MemorySource::default();
        let mut completed = run(&["Core"], &["Main.esp"]);
        completed
            .state
            .tweaks
            .add("Skyrim.ini", IniSetting::new("Display", "fGamma", "1.2"));
        completed
            .state
            .tweaks
            .add("INI/Custom.ini", IniSetting::new("General", "b", "1"));

        let settings = TransformSettings::default();
        let result = ArchiveTransformer::new(&settings, &source)
            .transform(&base, &completed)
            .expect("transform");
        assert!(result.tree.find_file("INI Tweaks/Skyrim.ini").is_some());
        assert!(result.tree.find_file("INI/Custom.ini").is_some());
        assert!(result.tree.find("Skyrim.ini").is_none());
    }

    #[test]
    fn test_tweak_without_section_is_content_error() {
        let base = archive(&["Core/Main.esp"]);
        let source = MemorySource::default();
        let mut completed = run(&["Core"], &["Main.esp"]);
        completed.state.tweaks.add("a.ini", IniSetting::new(" ", "k", "v"));

        let settings = TransformSettings::default();
        let err = ArchiveTransformer::new(&settings, &source)
            .transform(&base, &completed)
            .unwrap_err();
        assert!(matches!(err, TransformError::Content { .. }));
    }

    #[test]
    fn test_report_summary() {
        let report = TransformReport {
            ops: vec![TreeOp::MergeSubPackage { name: "Core".into() }],
            warnings: vec![MissingReference::RenameSource("A.esp".into())],
        };
        let summary = report.summary();
        assert!(summary.contains("1. Merge(Core)"));
        assert!(summary.contains("plugin 'A.esp' not found"));
    }
}
