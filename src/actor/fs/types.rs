use std::path::PathBuf;

use crate::protocol::TreeKind;

/// What happened to a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ChangeKind {
    Created,
    Modified,
    Removed,
}

impl ChangeKind {
    pub(super) fn label(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Modified => "modified",
            Self::Removed => "removed",
        }
    }
}

/// Which watch root a change belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Origin {
    /// Internal script next to the config file
    Script,
    /// File inside one of the two tracked trees
    Tree(TreeKind),
}

/// A raw event mapped onto a tracked root
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct TrackedChange {
    pub(super) origin: Origin,
    pub(super) kind: ChangeKind,
    pub(super) path: PathBuf,
    /// Tree key (`app/index.html`) or script file name
    pub(super) key: String,
    /// Path carried by the RELOAD push
    pub(super) reload_path: String,
}
