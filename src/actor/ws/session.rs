//! Per-connection editing context and request handlers.
//!
//! Handlers are plain functions of `(ClientContext, Envelope, ServerContext)`
//! so they can run on the actor loop and in tests without sockets.

use std::path::PathBuf;

use thiserror::Error;

use crate::actor::fs::FileEntry;
use crate::core::ServerContext;
use crate::protocol::{
    Envelope, MessageKind, MessagePayload, PUSH_ID, PathPayload, ProtocolError, TreeKind,
    TreeListing, TreeRequest, WritePayload,
};
use crate::utils::path::route::{is_safe_relative, normalize_url};

/// Reply to a successful WRITE
pub const SAVED_MESSAGE: &str = "File saved!";

#[derive(Debug, Error)]
pub enum BindingError {
    #[error("path escapes the project root: {0}")]
    Unsafe(String),

    #[error("unknown project file: {0}")]
    UnknownPath(String),
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    /// WRITE before a successful INIT. The message is what the client sees.
    #[error("File not found!")]
    NotBound,

    #[error("Failed to save {}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Editing state of one connection
#[derive(Debug, Default)]
pub struct ClientContext {
    current_path: Option<FileEntry>,
}

impl ClientContext {
    pub fn current_path(&self) -> Option<&FileEntry> {
        self.current_path.as_ref()
    }

    /// Bind the announced location. Returns `Ok(false)` when a path is
    /// already bound, in which case nothing changes.
    pub fn bind(&mut self, announced: &str, ctx: &ServerContext) -> Result<bool, BindingError> {
        if self.current_path.is_some() {
            return Ok(false);
        }

        let mut relative = normalize_url(announced);
        if relative.is_empty() {
            relative = ctx.config.project.index.clone();
        }
        if !is_safe_relative(&relative) {
            return Err(BindingError::Unsafe(relative));
        }

        let full = ctx.config.project_dir().join(&relative);
        let entry = ctx
            .config
            .tree_key(&full)
            .and_then(|key| ctx.tracker.read().tree(TreeKind::Project).get(&key).cloned())
            .ok_or(BindingError::UnknownPath(relative))?;

        self.current_path = Some(entry);
        Ok(true)
    }

    /// Persist `content` verbatim to the bound file.
    pub fn write(&self, content: &str) -> Result<&FileEntry, PersistenceError> {
        let entry = self.current_path.as_ref().ok_or(PersistenceError::NotBound)?;
        std::fs::write(&entry.full_path, content).map_err(|source| PersistenceError::Io {
            path: entry.full_path.clone(),
            source,
        })?;
        Ok(entry)
    }

    /// Handle one request. Returns the reply to send back, if any.
    pub fn handle(&mut self, envelope: &Envelope, ctx: &ServerContext) -> Option<Envelope> {
        let id = reply_id(envelope);

        match envelope.kind {
            MessageKind::Init => {
                let announced = match envelope.payload::<PathPayload>() {
                    Ok(payload) => payload.path,
                    Err(e) => {
                        crate::log!("ws"; "{}", e);
                        return None;
                    }
                };
                match self.bind(&announced, ctx) {
                    Ok(true) => {
                        crate::debug!("ws"; "bound {}", self.describe());
                    }
                    Ok(false) => {
                        crate::debug!("ws"; "init ignored, already bound to {}", self.describe());
                    }
                    Err(e) => crate::log!("ws"; "init failed: {}", e),
                }
                None
            }

            MessageKind::Write => {
                let content = match envelope.payload::<WritePayload>() {
                    Ok(payload) => payload.content,
                    Err(e) => return Some(Envelope::fail(id, e.to_string())),
                };
                Some(match self.write(&content) {
                    Ok(entry) => {
                        crate::log!("ws"; "saved {}", entry.full_path.display());
                        Envelope::ack(
                            id,
                            &MessagePayload {
                                message: SAVED_MESSAGE.to_string(),
                            },
                        )
                    }
                    Err(e) => {
                        crate::log!("ws"; "write failed: {}", e);
                        Envelope::fail(id, e.to_string())
                    }
                })
            }

            MessageKind::Tree => {
                let request = match envelope.payload::<TreeRequest>() {
                    Ok(request) => request,
                    Err(e) => return Some(Envelope::fail(id, e.to_string())),
                };
                Some(match TreeKind::from_code(request.kind) {
                    Some(kind) => {
                        let tree = ctx.tracker.read().listing(kind);
                        Envelope::ack(id, &TreeListing { tree })
                    }
                    None => Envelope::fail(id, format!("Unknown tree type: {}", request.kind)),
                })
            }

            MessageKind::Ack | MessageKind::Fail | MessageKind::Reload => {
                crate::debug!("ws"; "ignoring {} from client", envelope.kind.label());
                None
            }
        }
    }

    fn describe(&self) -> String {
        self.current_path
            .as_ref()
            .map(|entry| entry.full_path.display().to_string())
            .unwrap_or_default()
    }
}

/// Responses echo the request id; an id-less request gets the push id.
fn reply_id(envelope: &Envelope) -> &str {
    if envelope.id.is_empty() {
        PUSH_ID
    } else {
        &envelope.id
    }
}

/// Log a message that never reached a handler.
pub(super) fn log_dropped(client: super::ClientId, error: &ProtocolError) {
    crate::log!("ws"; "client {}: dropped message: {}", client, error);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SyncConfig;
    use serde_json::json;
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn make_server() -> (TempDir, ServerContext) {
        let temp = TempDir::new().unwrap();
        let mut config = SyncConfig::default();
        config.set_root(temp.path());
        fs::create_dir_all(config.project_dir().join("pages")).unwrap();
        fs::create_dir_all(config.components_dir()).unwrap();
        fs::write(config.project_dir().join("index.html"), "<html></html>").unwrap();
        fs::write(config.project_dir().join("about.html"), "").unwrap();
        fs::write(config.project_dir().join("pages/contact.html"), "").unwrap();
        fs::write(config.components_dir().join("card.html"), "").unwrap();

        let ctx = ServerContext::new(Arc::new(config));
        ctx.scan_all();
        (temp, ctx)
    }

    fn request(text: &str) -> Envelope {
        Envelope::from_json(text).unwrap()
    }

    #[test]
    fn test_write_without_init_fails() {
        let (_temp, ctx) = make_server();
        let mut client = ClientContext::default();

        let reply = client
            .handle(&request(r#"{"id":"7","type":4,"data":{"content":"x"}}"#), &ctx)
            .unwrap();
        assert_eq!(reply.id, "7");
        assert_eq!(reply.kind, MessageKind::Fail);
        assert_eq!(reply.data, json!({ "message": "File not found!" }));
    }

    #[test]
    fn test_write_persists_content_verbatim() {
        let (_temp, ctx) = make_server();
        let mut client = ClientContext::default();
        assert!(client.handle(&Envelope::init("about.html"), &ctx).is_none());

        let content = "<!DOCTYPE html>\n<html>\n <body/>\n</html>\n";
        let write = Envelope::new(
            "42",
            MessageKind::Write,
            json!({ "content": content }),
        );
        let reply = client.handle(&write, &ctx).unwrap();
        assert_eq!(reply.kind, MessageKind::Ack);
        assert_eq!(reply.id, "42");
        assert_eq!(reply.data, json!({ "message": "File saved!" }));

        let saved = fs::read_to_string(ctx.config.project_dir().join("about.html")).unwrap();
        assert_eq!(saved, content);
    }

    #[test]
    fn test_init_empty_path_binds_index() {
        let (_temp, ctx) = make_server();
        let mut client = ClientContext::default();
        assert!(client.bind("", &ctx).unwrap());
        let bound = client.current_path().unwrap();
        assert!(bound.full_path.ends_with("index.html"));
    }

    #[test]
    fn test_init_binds_only_once() {
        let (_temp, ctx) = make_server();
        let mut client = ClientContext::default();
        assert!(client.bind("/pages/contact.html", &ctx).unwrap());
        assert!(!client.bind("about.html", &ctx).unwrap());
        assert!(client
            .current_path()
            .unwrap()
            .full_path
            .ends_with("contact.html"));
    }

    #[test]
    fn test_init_unknown_path_stays_unbound() {
        let (_temp, ctx) = make_server();
        let mut client = ClientContext::default();
        assert!(matches!(
            client.bind("missing.html", &ctx),
            Err(BindingError::UnknownPath(_))
        ));
        assert!(matches!(
            client.bind("../secret.txt", &ctx),
            Err(BindingError::Unsafe(_))
        ));
        assert!(client.current_path().is_none());
        assert!(matches!(client.write("x"), Err(PersistenceError::NotBound)));
    }

    #[test]
    fn test_tree_project_listing() {
        let (_temp, ctx) = make_server();
        let mut client = ClientContext::default();

        let reply = client
            .handle(&request(r#"{"id":"1","type":5,"data":{"type":1}}"#), &ctx)
            .unwrap();
        assert_eq!(reply.kind, MessageKind::Ack);
        assert_eq!(
            reply.data,
            json!({ "tree": ["app/about.html", "app/index.html", "app/pages/contact.html"] })
        );
    }

    #[test]
    fn test_tree_component_listing() {
        let (_temp, ctx) = make_server();
        let mut client = ClientContext::default();

        let reply = client
            .handle(&request(r#"{"id":"1","type":5,"data":{"type":0}}"#), &ctx)
            .unwrap();
        assert_eq!(reply.data, json!({ "tree": ["components/card.html"] }));
    }

    #[test]
    fn test_tree_unknown_kind_fails() {
        let (_temp, ctx) = make_server();
        let mut client = ClientContext::default();

        let reply = client
            .handle(&request(r#"{"id":"1","type":5,"data":{"type":7}}"#), &ctx)
            .unwrap();
        assert_eq!(reply.kind, MessageKind::Fail);
        assert_eq!(reply.data, json!({ "message": "Unknown tree type: 7" }));
    }

    #[test]
    fn test_reply_without_id_uses_push_id() {
        let (_temp, ctx) = make_server();
        let mut client = ClientContext::default();

        let reply = client
            .handle(&request(r#"{"type":5,"data":{"type":1}}"#), &ctx)
            .unwrap();
        assert_eq!(reply.id, PUSH_ID);
    }

    #[test]
    fn test_client_pushes_are_ignored() {
        let (_temp, ctx) = make_server();
        let mut client = ClientContext::default();
        assert!(client.handle(&Envelope::reload("index.html"), &ctx).is_none());
    }
}
