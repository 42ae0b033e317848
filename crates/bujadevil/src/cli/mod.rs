//! Command-line interface for bujadevil.
//!
//! This module provides the CLI structure for the `bujadevil` binary. The
//! binary either serves the HTTP API or operates on the store directly, with
//! a remembered login standing in for the browser session.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    ArticlesCommand, CategoryArg, ConfigCommand, CreateArticleCommand, OutputFormat,
    RegisterCommand, SearchCommand, SearchKindArg, ServeCommand, SortArg, StatusArg,
};

/// bujadevil - a small tech blog engine
///
/// Articles, comments, likes, bookmarks and search over a single local
/// store, with a JSON API for the front end.
#[derive(Debug, Parser)]
#[command(name = "bujadevil")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve the JSON API
    Serve(ServeCommand),

    /// List, read and manage articles
    #[command(subcommand)]
    Articles(ArticlesCommand),

    /// Search articles, comments and users
    Search(SearchCommand),

    /// Show blog statistics
    Stats {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Create an account and log in
    Register(RegisterCommand),

    /// Log in with a username or email
    Login {
        /// Username or email
        identifier: String,

        /// Password
        #[arg(short, long)]
        password: String,
    },

    /// End the remembered session
    Logout,

    /// Show the logged-in user
    Whoami,

    /// Like or unlike an article
    Like {
        /// Article id
        article_id: String,
    },

    /// Bookmark or unbookmark an article
    Bookmark {
        /// Article id
        article_id: String,
    },

    /// Comment on an article
    Comment {
        /// Article id
        article_id: String,

        /// Comment text
        content: String,

        /// Reply to this comment
        #[arg(long)]
        parent: Option<String>,
    },

    /// Export the whole blog as JSON
    Export {
        /// Write to this file instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Replace the whole blog with a JSON export
    Import {
        /// Exported JSON file
        file: PathBuf,
    },

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}
