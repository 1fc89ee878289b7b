//! URL to filesystem path resolution.

use std::path::{Path, PathBuf};

use crate::core::ServerContext;
use crate::protocol::TreeKind;
use crate::utils::path::route::{is_safe_relative, normalize_url};

/// What a request URL maps to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    File(PathBuf),
    /// `/<components>/<name>` where `<name>` is not in the component tree
    MissingComponent(String),
    NotFound,
}

/// Route a request URL: internal scripts, then components, then static files.
pub fn route(url: &str, ctx: &ServerContext) -> Route {
    let config = &ctx.config;
    let clean = normalize_url(url);

    if let Some(file) = config.serve.scripts.get(&clean) {
        let path = config.script_path(file);
        return if path.is_file() {
            Route::File(path)
        } else {
            Route::NotFound
        };
    }

    let prefix = format!("{}/", components_route(&config.project.components));
    if let Some(name) = clean.strip_prefix(&prefix) {
        return component(name, ctx);
    }

    match resolve_path(url, &config.project_dir()) {
        Some(path) => Route::File(path),
        None => Route::NotFound,
    }
}

/// A component is served only when the component tree tracks it.
fn component(name: &str, ctx: &ServerContext) -> Route {
    if name.is_empty() || name.contains('/') || !is_safe_relative(name) {
        return Route::MissingComponent(name.to_string());
    }

    let full = ctx.config.components_dir().join(name);
    let tracked = ctx
        .config
        .tree_key(&full)
        .and_then(|key| {
            ctx.tracker
                .read()
                .tree(TreeKind::Component)
                .get(&key)
                .map(|entry| entry.full_path.clone())
        });

    match tracked {
        Some(path) => Route::File(path),
        None => Route::MissingComponent(name.to_string()),
    }
}

/// URL prefix of the component route: the configured directory, `/`-joined.
fn components_route(dir: &Path) -> String {
    dir.components()
        .filter_map(|c| match c {
            std::path::Component::Normal(s) => Some(s.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Resolve URL to filesystem path, handling index.html for directories
pub fn resolve_path(url: &str, serve_root: &Path) -> Option<PathBuf> {
    let clean = normalize_url(url);

    // Reject paths with suspicious patterns early
    if !is_safe_relative(&clean) {
        return None;
    }

    let local = serve_root.join(&clean);

    // Canonicalize to resolve symlinks and verify path is under serve_root
    let canonical = local.canonicalize().ok()?;
    let root_canonical = serve_root.canonicalize().ok()?;

    if !canonical.starts_with(&root_canonical) {
        return None;
    }

    if canonical.is_file() {
        return Some(canonical);
    }

    if canonical.is_dir() {
        let index = canonical.join("index.html");
        if index.is_file() {
            return Some(index);
        }
    }

    None
}
