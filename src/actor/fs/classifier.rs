use std::path::{Component, Path, PathBuf};

use notify::EventKind;
use notify::event::ModifyKind;
use rustc_hash::FxHashSet;

use super::types::{ChangeKind, Origin, TrackedChange};
use crate::config::SyncConfig;
use crate::protocol::TreeKind;
use crate::utils::path::relative_key;

/// Maps raw notify events onto the tracked roots.
///
/// Events for paths outside every root, for directories, for paths under
/// an ignored directory, and for metadata-only changes produce nothing.
pub(super) struct EventClassifier {
    root: PathBuf,
    project: PathBuf,
    components: PathBuf,
    scripts: FxHashSet<PathBuf>,
    ignore: Vec<String>,
}

impl EventClassifier {
    pub(super) fn new(config: &SyncConfig) -> Self {
        Self {
            root: config.root.clone(),
            project: config.project_dir(),
            components: config.components_dir(),
            scripts: config
                .serve
                .scripts
                .values()
                .map(|file| config.script_path(file))
                .collect(),
            ignore: config.project.ignore.clone(),
        }
    }

    /// Event kind → change kind. `None` for events that never notify.
    fn change_kind(kind: &EventKind, path: &Path) -> Option<ChangeKind> {
        match kind {
            EventKind::Create(_) => Some(ChangeKind::Created),
            EventKind::Remove(_) => Some(ChangeKind::Removed),
            // mtime/atime/chmod noise
            EventKind::Modify(ModifyKind::Metadata(_)) => None,
            // Renames report both ends; existence tells which end this is
            EventKind::Modify(ModifyKind::Name(_)) => Some(if path.exists() {
                ChangeKind::Created
            } else {
                ChangeKind::Removed
            }),
            EventKind::Modify(_) => Some(ChangeKind::Modified),
            _ => None,
        }
    }

    pub(super) fn classify(&self, event: &notify::Event) -> Vec<TrackedChange> {
        crate::debug!("watch"; "raw notify: {:?} {:?}", event.kind, event.paths);

        let mut seen = FxHashSet::default();
        event
            .paths
            .iter()
            .filter(|path| seen.insert(path.as_path()))
            .filter_map(|path| {
                let kind = Self::change_kind(&event.kind, path)?;
                self.classify_path(path, kind)
            })
            .collect()
    }

    pub(super) fn classify_path(&self, path: &Path, kind: ChangeKind) -> Option<TrackedChange> {
        if kind != ChangeKind::Removed && path.is_dir() {
            return None;
        }

        let origin = self.origin_of(path)?;
        if let Origin::Tree(kind) = origin
            && self.is_ignored(path, kind)
        {
            return None;
        }
        let key = relative_key(path, &self.root)?;
        let reload_path = match origin {
            Origin::Script => path.file_name()?.to_string_lossy().into_owned(),
            // Relative to the project root: the location a client announces
            Origin::Tree(TreeKind::Project) => relative_key(path, &self.project)?,
            Origin::Tree(TreeKind::Component) => key.clone(),
        };

        Some(TrackedChange {
            origin,
            kind,
            path: path.to_path_buf(),
            key,
            reload_path,
        })
    }

    /// Whether any directory between the tree root and `path` is ignored.
    fn is_ignored(&self, path: &Path, kind: TreeKind) -> bool {
        let root = match kind {
            TreeKind::Project => &self.project,
            TreeKind::Component => &self.components,
        };
        let Ok(rel) = path.strip_prefix(root) else {
            return false;
        };
        rel.components().any(|c| match c {
            Component::Normal(name) => self.ignore.iter().any(|i| name == i.as_str()),
            _ => false,
        })
    }

    fn origin_of(&self, path: &Path) -> Option<Origin> {
        // Prefer the deeper root when one contains the other
        let mut roots = [
            (&self.project, TreeKind::Project),
            (&self.components, TreeKind::Component),
        ];
        roots.sort_by_key(|(root, _)| std::cmp::Reverse(root.components().count()));

        for (root, kind) in roots {
            if path.starts_with(root) && path != root.as_path() {
                return Some(Origin::Tree(kind));
            }
        }

        self.scripts.contains(path).then_some(Origin::Script)
    }
}
