//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::blog::{ArticleSort, StatusFilter};
use crate::model::Category;
use crate::search::SearchKind;

/// Server command arguments.
#[derive(Debug, Args)]
pub struct ServeCommand {
    /// Address to listen on (overrides `server.host`)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on (overrides `server.port`)
    #[arg(short, long)]
    pub port: Option<u16>,
}

/// Article management commands.
#[derive(Debug, Subcommand)]
pub enum ArticlesCommand {
    /// List articles
    List {
        /// Only show this category
        #[arg(long, value_enum)]
        category: Option<CategoryArg>,

        /// Which publication states to include
        #[arg(short, long, value_enum, default_value = "published")]
        status: StatusArg,

        /// Ordering
        #[arg(long, value_enum, default_value = "newest")]
        sort: SortArg,

        /// Page number, starting at 1
        #[arg(long)]
        page: Option<usize>,

        /// Articles per page
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Show one article by slug or id (counts as a view)
    Show {
        /// Article slug or id
        article: String,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Write a new article as the logged-in admin
    Create(CreateArticleCommand),

    /// Delete an article and everything attached to it
    Delete {
        /// Article id
        id: String,
    },
}

/// Arguments for `articles create`.
#[derive(Debug, Args)]
pub struct CreateArticleCommand {
    /// Headline
    #[arg(short, long)]
    pub title: String,

    /// Category
    #[arg(long, value_enum)]
    pub category: CategoryArg,

    /// Markdown file holding the body ("-" reads stdin)
    #[arg(short, long, value_name = "FILE")]
    pub file: PathBuf,

    /// Short summary (defaults to the start of the body)
    #[arg(short, long)]
    pub excerpt: Option<String>,

    /// Cover image URL
    #[arg(short, long)]
    pub image: Option<String>,

    /// Save as draft instead of publishing
    #[arg(long)]
    pub draft: bool,
}

/// Search command arguments.
#[derive(Debug, Args)]
pub struct SearchCommand {
    /// The search query
    pub query: String,

    /// Which records to search
    #[arg(short = 't', long = "type", value_enum, default_value = "all")]
    pub kind: SearchKindArg,

    /// Only search articles in this category
    #[arg(long, value_enum)]
    pub category: Option<CategoryArg>,

    /// Page number, starting at 1
    #[arg(long, default_value = "1")]
    pub page: usize,

    /// Maximum number of results per page
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Print autocomplete suggestions instead of results
    #[arg(long)]
    pub suggest: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

/// Account creation arguments.
#[derive(Debug, Args)]
pub struct RegisterCommand {
    /// Login name
    pub username: String,

    /// Contact email
    #[arg(short, long)]
    pub email: String,

    /// Password
    #[arg(short, long)]
    pub password: String,

    /// Display name
    #[arg(short, long)]
    pub name: String,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Category argument for filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CategoryArg {
    /// Tech news
    News,
    /// Game reviews
    Gaming,
    /// Application showcases
    Apps,
    /// Guides
    Tutorials,
}

impl From<CategoryArg> for Category {
    fn from(arg: CategoryArg) -> Self {
        match arg {
            CategoryArg::News => Self::News,
            CategoryArg::Gaming => Self::Gaming,
            CategoryArg::Apps => Self::Apps,
            CategoryArg::Tutorials => Self::Tutorials,
        }
    }
}

/// Publication state argument for listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatusArg {
    /// Published articles only
    Published,
    /// Drafts only
    Draft,
    /// Everything
    All,
}

impl From<StatusArg> for StatusFilter {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Published => Self::Published,
            StatusArg::Draft => Self::Draft,
            StatusArg::All => Self::All,
        }
    }
}

/// Ordering argument for listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortArg {
    /// Most recent first
    Newest,
    /// Views plus weighted likes
    Popular,
    /// Popularity boosted for recent articles
    Trending,
}

impl From<SortArg> for ArticleSort {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Newest => Self::Newest,
            SortArg::Popular => Self::Popular,
            SortArg::Trending => Self::Trending,
        }
    }
}

/// Record type argument for search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SearchKindArg {
    /// Articles, comments and users
    All,
    /// Articles only
    Articles,
    /// Comments only
    Comments,
    /// Users only
    Users,
}

impl From<SearchKindArg> for SearchKind {
    fn from(arg: SearchKindArg) -> Self {
        match arg {
            SearchKindArg::All => Self::All,
            SearchKindArg::Articles => Self::Articles,
            SearchKindArg::Comments => Self::Comments,
            SearchKindArg::Users => Self::Users,
        }
    }
}

/// Output format for commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Formatted table
    #[default]
    Table,
    /// JSON output
    Json,
}
