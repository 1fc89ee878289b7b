//! In-memory file trees for the project and component roots.
//!
//! Trees are rebuilt from disk at startup and refreshed incrementally from
//! watch events. Keys are paths relative to the config directory, joined
//! with `/` (`app/index.html`, `components/card.html`).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use jwalk::WalkDir;

use crate::config::SyncConfig;
use crate::protocol::TreeKind;
use crate::utils::path::relative_key;

/// One file under a watched root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub full_path: PathBuf,
    pub len: u64,
    pub modified: Option<SystemTime>,
}

impl FileEntry {
    fn from_path(full_path: PathBuf) -> Option<Self> {
        let meta = std::fs::metadata(&full_path).ok()?;
        if !meta.is_file() {
            return None;
        }
        Some(Self {
            full_path,
            len: meta.len(),
            modified: meta.modified().ok(),
        })
    }
}

/// Map from tree key to file metadata for one watched root
#[derive(Debug, Clone)]
pub struct FileTree {
    root: PathBuf,
    entries: BTreeMap<String, FileEntry>,
}

impl FileTree {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            entries: BTreeMap::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn get(&self, key: &str) -> Option<&FileEntry> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn remove(&mut self, key: &str) -> Option<FileEntry> {
        self.entries.remove(key)
    }

    fn upsert(&mut self, key: String, entry: FileEntry) -> bool {
        self.entries.insert(key, entry).is_none()
    }
}

/// Owner of both file trees.
pub struct ChangeTracker {
    /// Directory tree keys are relative to
    key_base: PathBuf,
    ignore: Vec<String>,
    project: FileTree,
    components: FileTree,
}

impl ChangeTracker {
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            key_base: config.root.clone(),
            ignore: config.project.ignore.clone(),
            project: FileTree::new(config.project_dir()),
            components: FileTree::new(config.components_dir()),
        }
    }

    pub fn tree(&self, kind: TreeKind) -> &FileTree {
        match kind {
            TreeKind::Project => &self.project,
            TreeKind::Component => &self.components,
        }
    }

    pub fn tree_mut(&mut self, kind: TreeKind) -> &mut FileTree {
        match kind {
            TreeKind::Project => &mut self.project,
            TreeKind::Component => &mut self.components,
        }
    }

    /// Full key listing of a tree
    pub fn listing(&self, kind: TreeKind) -> Vec<String> {
        self.tree(kind).keys()
    }

    pub fn key_for(&self, path: &Path) -> Option<String> {
        relative_key(path, &self.key_base)
    }

    /// Re-list every file under the tree's root, updating each entry.
    ///
    /// Returns the keys that were not present before. Files that vanish
    /// mid-scan are skipped, so the result is a best-effort snapshot.
    pub fn rescan(&mut self, kind: TreeKind) -> Vec<String> {
        let files = scan_files(self.tree(kind).root(), &self.ignore);

        let mut added = Vec::new();
        for path in files {
            let Some(key) = self.key_for(&path) else {
                continue;
            };
            let Some(entry) = FileEntry::from_path(path) else {
                continue;
            };
            if self.tree_mut(kind).upsert(key.clone(), entry) {
                added.push(key);
            }
        }
        added
    }

    /// Refresh metadata of a single tracked file. Returns `false` when the
    /// file is not tracked or no longer readable.
    pub fn refresh(&mut self, kind: TreeKind, key: &str, path: &Path) -> bool {
        if !self.tree(kind).contains(key) {
            return false;
        }
        match FileEntry::from_path(path.to_path_buf()) {
            Some(entry) => {
                self.tree_mut(kind).upsert(key.to_string(), entry);
                true
            }
            None => false,
        }
    }
}

/// Collect all files below `dir`, never descending into ignored directory names.
fn scan_files(dir: &Path, ignore: &[String]) -> Vec<PathBuf> {
    let ignore = ignore.to_vec();

    WalkDir::new(dir)
        .skip_hidden(false)
        .sort(true)
        .process_read_dir(move |_depth, _path, _state, children| {
            children.retain(|child| {
                child.as_ref().map_or(true, |entry| {
                    !(entry.file_type().is_dir()
                        && ignore
                            .iter()
                            .any(|name| entry.file_name().to_string_lossy() == name.as_str()))
                })
            });
        })
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path())
        .collect()
}
