//! In-memory file tree for archive contents.
//!
//! Mirrors the host's archive tree contract: a named, ordered, recursive
//! container of files and directories. Names compare case-insensitively, as
//! they do on the game's data folder. File entries do not hold bytes from the
//! archive; they point back at the archive path and are read through a
//! `ContentSource` only when needed.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::state::normalize_path;

/// Where a file's bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileContent {
    /// Path of the file inside the source archive
    Archive(String),
    /// Content generated during the transform
    Data(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    name: String,
    content: FileContent,
}

impl FileEntry {
    pub fn new(name: impl Into<String>, content: FileContent) -> Self {
        Self {
            name: name.into(),
            content,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content(&self) -> &FileContent {
        &self.content
    }

    /// Case-insensitive extension check, `extensions` without dots.
    pub fn has_extension(&self, extensions: &[String]) -> bool {
        has_extension(&self.name, extensions)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    File(FileEntry),
    Directory(FileTree),
}

impl Entry {
    pub fn name(&self) -> &str {
        match self {
            Self::File(file) => file.name(),
            Self::Directory(tree) => tree.name(),
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self, Self::File(_))
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, Self::Directory(_))
    }

    fn set_name(&mut self, name: String) {
        match self {
            Self::File(file) => file.name = name,
            Self::Directory(tree) => tree.name = name,
        }
    }
}

/// Directory node. The root of an archive has an empty name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileTree {
    name: String,
    entries: Vec<Entry>,
}

impl FileTree {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    /// Empty root tree of the same kind, not attached to anything.
    pub fn create_orphan_tree(&self) -> Self {
        Self::new("")
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Direct child by name.
    pub fn child(&self, name: &str) -> Option<&Entry> {
        self.entries
            .iter()
            .find(|entry| entry.name().eq_ignore_ascii_case(name))
    }

    fn child_index(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.name().eq_ignore_ascii_case(name))
    }

    /// Find an entry by `/` or `\` separated path.
    pub fn find(&self, path: &str) -> Option<&Entry> {
        let path = normalize_path(path);
        let mut parts = path.split('/').filter(|p| !p.is_empty()).peekable();
        let mut current = self;
        while let Some(part) = parts.next() {
            let entry = current.child(part)?;
            if parts.peek().is_none() {
                return Some(entry);
            }
            match entry {
                Entry::Directory(tree) => current = tree,
                Entry::File(_) => return None,
            }
        }
        None
    }

    pub fn find_dir(&self, path: &str) -> Option<&FileTree> {
        match self.find(path)? {
            Entry::Directory(tree) => Some(tree),
            Entry::File(_) => None,
        }
    }

    pub fn find_file(&self, path: &str) -> Option<&FileEntry> {
        match self.find(path)? {
            Entry::File(file) => Some(file),
            Entry::Directory(_) => None,
        }
    }

    pub fn exists(&self, path: &str) -> bool {
        self.find(path).is_some()
    }

    /// Directory at `path`, created along the way. Returns `None` if a file
    /// is in the way.
    pub fn add_directory(&mut self, path: &str) -> Option<&mut FileTree> {
        let path = normalize_path(path);
        let mut current = self;
        for part in path.split('/').filter(|p| !p.is_empty()) {
            let index = match current.child_index(part) {
                Some(index) => index,
                None => {
                    current.entries.push(Entry::Directory(FileTree::new(part)));
                    current.entries.len() - 1
                }
            };
            current = match &mut current.entries[index] {
                Entry::Directory(tree) => tree,
                Entry::File(_) => return None,
            };
        }
        Some(current)
    }

    /// Add a file at `path`. Returns `false` when nothing was added: the file
    /// exists and `replace_if_exists` is off, or a file blocks a parent
    /// directory, or a directory has the target name.
    pub fn add_file(&mut self, path: &str, content: FileContent, replace_if_exists: bool) -> bool {
        let path = normalize_path(path);
        let (parent, name) = match path.rsplit_once('/') {
            Some((parent, name)) => (parent, name),
            None => ("", path.as_str()),
        };
        if name.is_empty() {
            return false;
        }
        let Some(dir) = self.add_directory(parent) else {
            return false;
        };
        match dir.child_index(name) {
            Some(index) => match &mut dir.entries[index] {
                Entry::File(file) if replace_if_exists => {
                    file.content = content;
                    true
                }
                _ => false,
            },
            None => {
                dir.entries.push(Entry::File(FileEntry::new(name, content)));
                true
            }
        }
    }

    /// Insert an entry at this level. Files replace same-named entries,
    /// directories merge into an existing directory of the same name.
    pub fn insert(&mut self, entry: Entry) {
        match self.child_index(entry.name()) {
            None => self.entries.push(entry),
            Some(index) => match (&mut self.entries[index], entry) {
                (Entry::Directory(existing), Entry::Directory(incoming)) => {
                    existing.merge_owned(incoming);
                }
                (slot, incoming) => *slot = incoming,
            },
        }
    }

    /// Recursively merge the contents of `other` into this tree.
    pub fn merge(&mut self, other: &FileTree) {
        for entry in &other.entries {
            self.insert(entry.clone());
        }
    }

    fn merge_owned(&mut self, other: FileTree) {
        for entry in other.entries {
            self.insert(entry);
        }
    }

    /// Remove and return a direct child.
    pub fn take(&mut self, name: &str) -> Option<Entry> {
        let index = self.child_index(name)?;
        Some(self.entries.remove(index))
    }

    /// Move a direct child to `dest` (a path relative to this tree). The
    /// last path segment becomes the new name.
    pub fn move_entry(&mut self, name: &str, dest: &str) -> bool {
        let dest = normalize_path(dest);
        let (parent, new_name) = match dest.rsplit_once('/') {
            Some((parent, new_name)) => (parent.to_string(), new_name.to_string()),
            None => (String::new(), dest.clone()),
        };
        if new_name.is_empty() {
            return false;
        }
        let Some(index) = self.child_index(name) else {
            return false;
        };
        let mut entry = self.entries.remove(index);
        let old_name = entry.name().to_string();
        entry.set_name(new_name);
        match self.add_directory(&parent) {
            Some(dir) => {
                dir.insert(entry);
                true
            }
            None => {
                // a file blocks the destination, put the entry back
                entry.set_name(old_name);
                self.entries.insert(index, entry);
                false
            }
        }
    }

    /// All files below this tree with their `/` separated paths.
    pub fn walk_files(&self) -> Vec<(String, &FileEntry)> {
        let mut files = Vec::new();
        self.collect_files("", &mut files);
        files
    }

    fn collect_files<'a>(&'a self, prefix: &str, out: &mut Vec<(String, &'a FileEntry)>) {
        for entry in &self.entries {
            let path = if prefix.is_empty() {
                entry.name().to_string()
            } else {
                format!("{}/{}", prefix, entry.name())
            };
            match entry {
                Entry::File(file) => out.push((path, file)),
                Entry::Directory(tree) => tree.collect_files(&path, out),
            }
        }
    }

    /// Build a tree from an extracted archive on disk. Entries are sorted by
    /// name and point back at their archive-relative paths.
    pub fn from_directory(root: &Path) -> io::Result<FileTree> {
        let mut tree = FileTree::new("");
        read_dir_into(root, "", &mut tree)?;
        debug!("Loaded {} files from {}", tree.walk_files().len(), root.display());
        Ok(tree)
    }
}

fn read_dir_into(dir: &Path, prefix: &str, tree: &mut FileTree) -> io::Result<()> {
    let mut children: Vec<_> = fs::read_dir(dir)?.collect::<io::Result<_>>()?;
    children.sort_by_key(|child| child.file_name());
    for child in children {
        let name = child.file_name().to_string_lossy().into_owned();
        let path = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{}/{}", prefix, name)
        };
        if child.file_type()?.is_dir() {
            let mut sub = FileTree::new(name);
            read_dir_into(&child.path(), &path, &mut sub)?;
            tree.entries.push(Entry::Directory(sub));
        } else {
            tree.entries
                .push(Entry::File(FileEntry::new(name, FileContent::Archive(path))));
        }
    }
    Ok(())
}

pub fn has_extension(name: &str, extensions: &[String]) -> bool {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => {
            extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
        }
        _ => false,
    }
}

/// Access to file bytes of the source archive.
pub trait ContentSource {
    fn read(&self, archive_path: &str) -> io::Result<Vec<u8>>;

    /// Path of an already extracted file on the local disk.
    fn local_path(&self, archive_path: &str) -> Option<PathBuf>;
}

/// Archive extracted to a directory.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, archive_path: &str) -> PathBuf {
        let mut path = self.root.clone();
        for part in normalize_path(archive_path).split('/').filter(|p| !p.is_empty()) {
            path.push(part);
        }
        path
    }
}

impl ContentSource for DirectorySource {
    fn read(&self, archive_path: &str) -> io::Result<Vec<u8>> {
        fs::read(self.resolve(archive_path))
    }

    fn local_path(&self, archive_path: &str) -> Option<PathBuf> {
        let path = self.resolve(archive_path);
        path.is_file().then_some(path)
    }
}

/// Bytes of a file entry.
pub fn read_content(content: &FileContent, source: &dyn ContentSource) -> io::Result<Vec<u8>> {
    match content {
        FileContent::Archive(path) => source.read(path),
        FileContent::Data(bytes) => Ok(bytes.clone()),
    }
}

/// Write `tree` to `dest`, which must not exist yet. Everything is written to
/// a staging directory next to `dest` first and renamed into place, so a
/// failure leaves nothing behind at `dest`.
pub fn write_tree(tree: &FileTree, source: &dyn ContentSource, dest: &Path) -> io::Result<()> {
    if dest.exists() {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("{} already exists", dest.display()),
        ));
    }
    let parent = match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent)?;
    let staging = tempfile::Builder::new()
        .prefix(".bain-staging-")
        .tempdir_in(&parent)?;

    write_entries(tree, source, staging.path())?;

    let staged = staging.keep();
    if let Err(e) = fs::rename(&staged, dest) {
        let _ = fs::remove_dir_all(&staged);
        return Err(e);
    }
    Ok(())
}

fn write_entries(tree: &FileTree, source: &dyn ContentSource, dir: &Path) -> io::Result<()> {
    for entry in tree.entries() {
        let path = dir.join(entry.name());
        match entry {
            Entry::Directory(sub) => {
                fs::create_dir(&path)?;
                write_entries(sub, source, &path)?;
            }
            Entry::File(file) => fs::write(&path, read_content(file.content(), source)?)?,
        }
    }
    Ok(())
}
