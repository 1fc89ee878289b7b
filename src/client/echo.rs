//! Echo suppression.
//!
//! A path is marked right before this client writes it. The first RELOAD
//! for a marked path consumes the mark and is dropped; a second RELOAD for
//! the same path reloads as usual.

use rustc_hash::FxHashSet;

#[derive(Debug, Default)]
pub struct SkipSet {
    paths: FxHashSet<String>,
}

impl SkipSet {
    pub fn mark(&mut self, path: impl Into<String>) {
        self.paths.insert(path.into());
    }

    /// Remove the mark. Returns `true` when `path` was marked.
    pub fn consume(&mut self, path: &str) -> bool {
        self.paths.remove(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.paths.contains(path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_is_consumed_once() {
        let mut skip = SkipSet::default();
        skip.mark("index.html");
        assert!(skip.consume("index.html"));
        assert!(!skip.consume("index.html"));
        assert!(skip.is_empty());
    }

    #[test]
    fn test_unmarked_path() {
        let mut skip = SkipSet::default();
        skip.mark("index.html");
        assert!(!skip.consume("about.html"));
        assert!(skip.contains("index.html"));
    }
}
