//! Command-line interface for Agora.

use clap::{Parser, Subcommand};

/// Agora - discussion threads with an AI participant
#[derive(Parser, Debug)]
#[command(name = "agora")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Run the web server
    #[command(alias = "daemon", alias = "-d")]
    Serve,

    /// Apply database migrations and exit
    Migrate,

    /// Create default config file
    #[command(alias = "--init")]
    Init,

    /// Generate (or replay) an AI reply for a thread
    Respond {
        /// Thread ID
        thread_id: i32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_respond_with_thread_id() {
        let cli = Cli::try_parse_from(["agora", "respond", "42"]).unwrap();
        assert_eq!(cli.command, Some(Commands::Respond { thread_id: 42 }));
    }

    #[test]
    fn daemon_is_an_alias_for_serve() {
        let cli = Cli::try_parse_from(["agora", "daemon"]).unwrap();
        assert_eq!(cli.command, Some(Commands::Serve));
    }

    #[test]
    fn no_subcommand_is_allowed() {
        let cli = Cli::try_parse_from(["agora"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn respond_requires_numeric_id() {
        assert!(Cli::try_parse_from(["agora", "respond", "abc"]).is_err());
    }
}
