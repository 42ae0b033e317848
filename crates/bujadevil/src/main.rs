//! `bujadevil` - CLI for the bujadevil blog engine
//!
//! This binary serves the JSON API and gives command-line access to the same
//! store: reading and writing articles, searching, and acting as a logged-in
//! user through a remembered session.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::debug;

use bujadevil::api::{self, AppState};
use bujadevil::blog::{ArticleQuery, NewArticle, NewComment, NewUser};
use bujadevil::cli::{
    ArticlesCommand, Cli, Command, ConfigCommand, CreateArticleCommand, OutputFormat,
    RegisterCommand, SearchCommand, ServeCommand,
};
use bujadevil::model::{Article, ArticleStatus};
use bujadevil::search::{self, resolve_limit, HitRecord, SearchParams};
use bujadevil::{init_logging, BlogDb, Config, PublicUser, Storage};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // `config` subcommands load the file themselves.
    let config_path = cli.config.clone();
    let load_config = || Config::load_from(config_path.clone());
    let open = || -> Result<BlogDb> { open_db(load_config()?) };

    match cli.command {
        Command::Serve(cmd) => handle_serve(load_config()?, &cmd),
        Command::Articles(cmd) => handle_articles(&open()?, cmd),
        Command::Search(cmd) => handle_search(&open()?, &cmd),
        Command::Stats { json } => handle_stats(&open()?, json),
        Command::Register(cmd) => handle_register(&open()?, cmd),
        Command::Login {
            identifier,
            password,
        } => {
            let db = open()?;
            let auth = db.login_user(&identifier, &password)?;
            db.remember_session(&auth.session.token)?;
            println!("Logged in as {} ({})", auth.user.name, auth.user.username);
            Ok(())
        }
        Command::Logout => handle_logout(&open()?),
        Command::Whoami => {
            let user = current_user(&open()?)?;
            println!("{} ({}) <{}> [{}]", user.name, user.username, user.email, user.role);
            Ok(())
        }
        Command::Like { article_id } => {
            let db = open()?;
            let user = current_user(&db)?;
            let toggle = db.toggle_like(&article_id, &user.id)?;
            let verb = if toggle.liked { "Liked" } else { "Unliked" };
            println!("{verb} ({} likes)", toggle.likes);
            Ok(())
        }
        Command::Bookmark { article_id } => {
            let db = open()?;
            let user = current_user(&db)?;
            if db.toggle_bookmark(&article_id, &user.id)? {
                println!("Bookmarked");
            } else {
                println!("Bookmark removed");
            }
            Ok(())
        }
        Command::Comment {
            article_id,
            content,
            parent,
        } => {
            let db = open()?;
            let user = current_user(&db)?;
            let comment = db.create_comment(
                NewComment {
                    article_id,
                    content,
                    parent_id: parent,
                },
                &user.id,
            )?;
            if comment.is_approved {
                println!("Comment posted ({})", comment.id);
            } else {
                println!("Comment {} is awaiting moderation", comment.id);
            }
            Ok(())
        }
        Command::Export { output } => handle_export(&open()?, output.as_deref()),
        Command::Import { file } => {
            let db = open()?;
            let json = fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            db.import_json(&json)?;
            println!("Imported {}", file.display());
            Ok(())
        }
        Command::Config(cmd) => handle_config(config_path.clone(), cmd),
    }
}

fn open_db(config: Config) -> Result<BlogDb> {
    let path = config.database_path();
    debug!("Using database {}", path.display());
    let storage = Storage::open(&path)?;
    Ok(BlogDb::open(storage, config)?)
}

/// The user behind the remembered session.
fn current_user(db: &BlogDb) -> Result<PublicUser> {
    let token = db.remembered_session()?;
    match token.as_deref() {
        Some(token) => match db.current_user(token)? {
            Some(user) => Ok(user),
            None => {
                db.forget_session()?;
                bail!("session expired, run `bujadevil login` again")
            }
        },
        None => bail!("not logged in, run `bujadevil login` first"),
    }
}

fn handle_serve(mut config: Config, cmd: &ServeCommand) -> Result<()> {
    if let Some(host) = &cmd.host {
        config.server.host.clone_from(host);
    }
    if let Some(port) = cmd.port {
        config.server.port = port;
    }
    config.validate()?;
    let addr = config.bind_addr()?;

    let state = AppState::new(open_db(config)?);
    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    runtime.block_on(api::serve(state, addr))?;
    Ok(())
}

fn handle_articles(db: &BlogDb, cmd: ArticlesCommand) -> Result<()> {
    match cmd {
        ArticlesCommand::List {
            category,
            status,
            sort,
            page,
            limit,
            format,
        } => {
            let articles = db.get_articles(&ArticleQuery {
                category: category.map(Into::into),
                status: status.into(),
                search: None,
                sort: sort.into(),
                page,
                limit,
            })?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&articles)?),
                OutputFormat::Table => print_articles(&articles),
            }
        }
        ArticlesCommand::Show { article, json } => {
            let article = match db.get_article_by_slug(&article) {
                Err(e) if e.is_not_found() => db.get_article(&article)?,
                other => other?,
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&article)?);
            } else {
                println!("{}", article.title);
                println!(
                    "{} | {} | {} min read | {} views | {} likes",
                    article.category,
                    article.author.name,
                    article.reading_time,
                    article.views,
                    article.likes
                );
                println!();
                println!("{}", article.content);
            }
        }
        ArticlesCommand::Create(cmd) => handle_create_article(db, cmd)?,
        ArticlesCommand::Delete { id } => {
            let user = current_user(db)?;
            db.delete_article(&id, &user.id)?;
            println!("Deleted article {id}");
        }
    }
    Ok(())
}

fn handle_create_article(db: &BlogDb, cmd: CreateArticleCommand) -> Result<()> {
    let user = current_user(db)?;
    if !db.is_admin(&user.id)? {
        bail!("only admins can write articles");
    }

    let content = if cmd.file == Path::new("-") {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read article from stdin")?;
        buf
    } else {
        fs::read_to_string(&cmd.file)
            .with_context(|| format!("failed to read {}", cmd.file.display()))?
    };

    let article = db.create_article(
        NewArticle {
            title: cmd.title,
            excerpt: cmd.excerpt.unwrap_or_default(),
            content,
            category: cmd.category.into(),
            image: cmd.image,
            status: if cmd.draft {
                ArticleStatus::Draft
            } else {
                ArticleStatus::Published
            },
        },
        &user.id,
    )?;
    println!("Created article {} (/blog/{})", article.id, article.slug);
    Ok(())
}

fn print_articles(articles: &[Article]) {
    if articles.is_empty() {
        println!("No articles.");
        return;
    }
    println!(
        "{:<38} {:<10} {:<10} {:>6} {:>6}  TITLE",
        "ID", "STATUS", "CATEGORY", "VIEWS", "LIKES"
    );
    for a in articles {
        println!(
            "{:<38} {:<10} {:<10} {:>6} {:>6}  {}",
            a.id,
            a.status.to_string(),
            a.category.as_str(),
            a.views,
            a.likes,
            a.title
        );
    }
}

fn handle_search(db: &BlogDb, cmd: &SearchCommand) -> Result<()> {
    let data = db.load_data()?;

    if cmd.suggest {
        let suggestions = search::suggestions(&data, &cmd.query);
        match cmd.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&suggestions)?),
            OutputFormat::Table => {
                for s in &suggestions {
                    println!("{:<10} {}", format!("{:?}", s.kind).to_lowercase(), s.text);
                }
            }
        }
        return Ok(());
    }

    let params = SearchParams {
        query: cmd.query.clone(),
        kind: cmd.kind.into(),
        category: cmd.category.map(Into::into),
        page: cmd.page,
        limit: resolve_limit(cmd.limit, &db.config().search),
    };
    let results = search::search(&data, &params);

    match cmd.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&results)?),
        OutputFormat::Table => {
            if results.results.is_empty() {
                println!("No results for \"{}\".", cmd.query);
                return Ok(());
            }
            for hit in &results.results {
                let label = match &hit.record {
                    HitRecord::Article(a) => format!("article  {} (/blog/{})", a.title, a.slug),
                    HitRecord::Comment(c) => format!("comment  {} on {}", c.id, c.article_id),
                    HitRecord::User(u) => format!("user     {} ({})", u.name, u.username),
                };
                println!("{:>7.1}  {label}", hit.score);
            }
            println!();
            println!(
                "Page {}/{} - {} results ({} articles, {} comments, {} users)",
                results.pagination.current,
                results.pagination.total,
                results.stats.total,
                results.stats.articles,
                results.stats.comments,
                results.stats.users
            );
            if !results.related.is_empty() {
                println!("Related: {}", results.related.join(", "));
            }
        }
    }
    Ok(())
}

fn handle_stats(db: &BlogDb, json: bool) -> Result<()> {
    let stats = db.get_stats()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!("{}", db.settings()?.site_title);
        println!("---------------");
        println!("Articles:      {}", stats.total_articles);
        println!("Users:         {}", stats.total_users);
        println!("Comments:      {}", stats.total_comments);
        println!("Likes:         {}", stats.total_likes);
        let storage = db.storage().stats()?;
        println!("Database:      {}", db.storage().path().display());
        println!(
            "Stored:        {} items, {} bytes",
            storage.total_items, storage.total_bytes
        );
        if !stats.popular_articles.is_empty() {
            println!();
            println!("Popular:");
            for a in &stats.popular_articles {
                println!("  {} ({} views, {} likes)", a.title, a.views, a.likes);
            }
        }
    }
    Ok(())
}

fn handle_register(db: &BlogDb, cmd: RegisterCommand) -> Result<()> {
    let auth = db.register_user(NewUser {
        username: cmd.username,
        email: cmd.email,
        password: cmd.password,
        name: cmd.name,
        avatar: None,
    })?;
    db.remember_session(&auth.session.token)?;
    println!("Welcome, {}! You are now logged in.", auth.user.name);
    Ok(())
}

fn handle_logout(db: &BlogDb) -> Result<()> {
    match db.remembered_session()? {
        Some(token) => {
            db.logout_user(&token)?;
            db.forget_session()?;
            println!("Logged out.");
        }
        None => println!("Not logged in."),
    }
    Ok(())
}

fn handle_export(db: &BlogDb, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(&db.export_data()?)?;
    match output {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
            println!("Exported to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn handle_config(config_path: Option<PathBuf>, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            let config = Config::load_from(config_path)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!();
                println!("[Server]");
                println!("  Address:            {}:{}", config.server.host, config.server.port);
                println!("  CORS:               {}", config.server.cors_enabled);
                println!();
                println!("[Site]");
                println!("  Name:               {}", config.site.name);
                println!("  Admin:              {}", config.site.admin.username);
                println!("  Default language:   {}", config.site.default_language);
                println!(
                    "  Languages:          {}",
                    config.site.supported_languages.join(", ")
                );
                println!();
                println!("[Auth]");
                println!("  Session (days):     {}", config.auth.session_ttl_days);
                println!("  Admin token (h):    {}", config.auth.admin_token_ttl_hours);
                println!();
                println!("[Comments]");
                println!("  Auto-approve:       {}", config.comments.auto_approve);
                println!("  Page size:          {}", config.comments.default_limit);
                println!();
                println!("[Search]");
                println!("  Page size:          {}", config.search.default_limit);
                println!("  Max page size:      {}", config.search.max_limit);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file
                .or(config_path)
                .unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => bail!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
