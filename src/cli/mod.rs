//! CLI module for Toolgate.

pub mod commands;
mod output;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Toolgate - MCP tool gateway
///
/// Exposes Jira, Confluence, GitLab and AI model providers as MCP tools over
/// stdio or HTTP, and lets you call the same tools from the command line.
#[derive(Parser, Debug)]
#[command(name = "toolgate")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "TOOLGATE_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check configuration and integration credentials
    Doctor,

    /// Start MCP server on stdio for AI assistant integration
    Mcp,

    /// Start HTTP server (JSON-RPC on /mcp plus file downloads)
    Serve {
        /// Host to bind to (defaults to server.host)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (defaults to server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// List available tools
    List {
        /// Only show tools whose name or description contains this text
        filter: Option<String>,
    },

    /// Call a tool directly
    ///
    /// Arguments may be given as key=value pairs, as positional values in
    /// parameter order, or as a JSON object with --data.
    Call {
        /// Tool name, e.g. jira_get_ticket
        tool: String,

        /// key=value pairs or positional values
        args: Vec<String>,

        /// Arguments as a JSON object
        #[arg(short, long)]
        data: Option<String>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration (secrets masked)
    Show,

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_collects_trailing_args() {
        let cli = Cli::parse_from([
            "toolgate",
            "call",
            "jira_search_by_jql",
            "jql=project = DEMO",
            "--data",
            "{\"maxResults\": 5}",
        ]);
        match cli.command {
            Commands::Call { tool, args, data } => {
                assert_eq!(tool, "jira_search_by_jql");
                assert_eq!(args, vec!["jql=project = DEMO"]);
                assert_eq!(data.as_deref(), Some("{\"maxResults\": 5}"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::parse_from(["toolgate", "-vv", "list", "jira", "--config", "/tmp/c.toml"]);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.config.as_deref(), Some("/tmp/c.toml"));
        assert!(matches!(cli.command, Commands::List { filter: Some(ref f) } if f == "jira"));
    }
}
