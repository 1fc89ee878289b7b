//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// Tether: live document sync for a browser-based visual editor
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: tether.toml)
    #[arg(short = 'C', long, default_value = "tether.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Enable verbose output for debugging
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start the sync server (static files + editor connections)
    #[command(visible_alias = "s")]
    Serve {
        /// Network interface to bind (e.g., 127.0.0.1, 0.0.0.0)
        #[arg(short, long)]
        interface: Option<std::net::IpAddr>,

        /// HTTP port number
        #[arg(short, long)]
        port: Option<u16>,

        /// Editor connection port number
        #[arg(long = "ws-port")]
        ws_port: Option<u16>,

        /// Track file changes and push reloads
        #[arg(short, long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
        watch: Option<bool>,
    },

    /// List the tracked files of a running server
    #[command(visible_alias = "t")]
    Tree {
        /// List the component tree instead of the project tree
        #[arg(short, long)]
        components: bool,

        #[command(flatten)]
        client: ClientArgs,
    },

    /// Format a markup file and save it as a document
    #[command(visible_alias = "p")]
    Push {
        /// Document location, relative to the project root
        page: String,

        /// Markup file to send
        #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
        file: PathBuf,

        #[command(flatten)]
        client: ClientArgs,
    },

    /// Stay connected to a document and report reloads
    #[command(visible_alias = "a")]
    Attach {
        /// Document location (default: the index document)
        page: Option<String>,

        #[command(flatten)]
        client: ClientArgs,
    },

    /// Print the canonical form of a markup file
    #[command(visible_alias = "f")]
    Format {
        /// Markup file to format
        #[arg(value_hint = clap::ValueHint::FilePath)]
        file: PathBuf,
    },
}

/// Shared connection arguments for client commands
#[derive(clap::Args, Debug, Clone)]
pub struct ClientArgs {
    /// Server endpoint (e.g., ws://127.0.0.1:8090)
    #[arg(short, long, value_hint = clap::ValueHint::Url)]
    pub url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serve_overrides() {
        let cli = Cli::parse_from(["tether", "serve", "--port", "3000", "--ws-port", "3001", "-w", "false"]);
        let Commands::Serve {
            port,
            ws_port,
            watch,
            interface,
        } = cli.command
        else {
            panic!("expected serve");
        };
        assert_eq!(port, Some(3000));
        assert_eq!(ws_port, Some(3001));
        assert_eq!(watch, Some(false));
        assert!(interface.is_none());
    }

    #[test]
    fn test_parse_push_with_alias() {
        let cli = Cli::parse_from([
            "tether",
            "-v",
            "p",
            "pages/about.html",
            "--file",
            "about.html",
            "--url",
            "ws://localhost:9000",
        ]);
        assert!(cli.verbose);
        let Commands::Push { page, file, client } = cli.command else {
            panic!("expected push");
        };
        assert_eq!(page, "pages/about.html");
        assert_eq!(file, PathBuf::from("about.html"));
        assert_eq!(client.url.as_deref(), Some("ws://localhost:9000"));
    }

    #[test]
    fn test_default_config_name() {
        let cli = Cli::parse_from(["tether", "tree", "--components"]);
        assert_eq!(cli.config, PathBuf::from("tether.toml"));
        assert!(matches!(cli.command, Commands::Tree { components: true, .. }));
    }
}
