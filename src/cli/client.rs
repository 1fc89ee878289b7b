//! Client commands: `tree`, `push`, `attach`.
//!
//! Each one drives an [`EditorClient`] against a running server.

use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use owo_colors::OwoColorize;

use crate::client::{ClientEvent, EditorClient, LifecycleEvent};
use crate::config::SyncConfig;
use crate::protocol::TreeKind;
use crate::serializer::format_markup;
use crate::{core::is_shutdown, log};

/// How long `push` keeps reading after the ACK, so the RELOAD caused by
/// its own write is consumed by the skip set.
const ECHO_GRACE: Duration = Duration::from_millis(300);

/// Print the key listing of one tree.
pub fn tree(config: &SyncConfig, components: bool) -> Result<()> {
    let kind = if components {
        TreeKind::Component
    } else {
        TreeKind::Project
    };

    let mut client = EditorClient::new(config, "");
    client
        .connect()
        .with_context(|| format!("Failed to connect to {}", config.client.url))?;

    let listing = client.tree(kind);
    client.close();

    for key in listing.with_context(|| format!("{} tree request failed", kind.label()))? {
        println!("{}", key);
    }
    Ok(())
}

/// Format `file` canonically and save it as the document at `page`.
pub fn push(config: &SyncConfig, page: &str, file: &Path) -> Result<()> {
    let source = fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let content = format_markup(&source)
        .with_context(|| format!("Failed to parse {}", file.display()))?;

    let mut client = EditorClient::new(config, page);
    client
        .connect()
        .with_context(|| format!("Failed to connect to {}", config.client.url))?;

    let saved = client.save(&content);
    if saved.is_ok() {
        drain_echo(&mut client);
    }
    client.close();

    let message = saved.with_context(|| format!("Failed to save {}", client.location()))?;
    log!("client"; "{}: {}", client.location(), message);
    Ok(())
}

fn drain_echo(client: &mut EditorClient) {
    let deadline = Instant::now() + ECHO_GRACE;
    while Instant::now() < deadline {
        match client.poll() {
            ClientEvent::Reload(path) => log!("client"; "reload: {}", path),
            ClientEvent::Ended => return,
            _ => {}
        }
    }
}

/// Stay bound to `page` and report every reload until the connection ends.
pub fn attach(config: &SyncConfig, page: Option<&str>) -> Result<()> {
    let mut client = EditorClient::new(config, page.unwrap_or_default());
    client.on(LifecycleEvent::End, || log!("client"; "session ended"));

    if let Err(e) = client.connect() {
        // The connection is retried once by `poll`
        log!("client"; "connect failed: {}", e);
    }

    while !is_shutdown() {
        match client.poll() {
            ClientEvent::Idle => {}
            ClientEvent::Reload(path) => {
                println!("{} {}", "reload".green().bold(), path);
            }
            ClientEvent::Reconnecting { at } => {
                let wait = at.saturating_duration_since(Instant::now());
                log!("client"; "reconnecting in {}ms", wait.as_millis());
            }
            ClientEvent::Reconnected => log!("client"; "reconnected"),
            ClientEvent::Ended => break,
        }
    }

    client.close();
    Ok(())
}
