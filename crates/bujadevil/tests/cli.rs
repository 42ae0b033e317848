use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

struct Workspace {
    dir: TempDir,
    config: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = dir.path().join("config.toml");
        let db = dir.path().join("blog.db");
        std::fs::write(
            &config,
            format!("[storage]\ndatabase_path = '{}'\n", db.display()),
        )
        .expect("write config");
        Self { dir, config }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_bujadevil"))
            .arg("-q")
            .arg("-c")
            .arg(&self.config)
            .args(args)
            .env_remove("RUST_LOG")
            .output()
            .expect("run bujadevil")
    }

    fn run_ok(&self, args: &[&str]) -> String {
        let output = self.run(args);
        assert!(
            output.status.success(),
            "{args:?} failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8(output.stdout).expect("utf8 stdout")
    }

    fn json(&self, args: &[&str]) -> serde_json::Value {
        serde_json::from_str(&self.run_ok(args)).expect("json output")
    }
}

fn write_file(path: &Path, contents: &str) {
    std::fs::write(path, contents).expect("write file");
}

#[test]
fn fresh_store_lists_welcome_article() {
    let ws = Workspace::new();

    let articles = ws.json(&["articles", "list", "--format", "json"]);
    let articles = articles.as_array().expect("article array");
    assert_eq!(articles.len(), 1);
    assert_eq!(articles[0]["slug"], "bienvenue-sur-bujadevil");

    let shown = ws.json(&["articles", "show", "bienvenue-sur-bujadevil", "--json"]);
    assert_eq!(shown["views"], 1);
}

#[test]
fn session_commands_round_trip() {
    let ws = Workspace::new();

    assert!(!ws.run(&["whoami"]).status.success());

    ws.run_ok(&[
        "register", "alice", "-e", "alice@example.com", "-p", "secret", "-n", "Alice",
    ]);
    assert!(ws.run_ok(&["whoami"]).contains("alice"));

    ws.run_ok(&["logout"]);
    assert!(!ws.run(&["whoami"]).status.success());

    ws.run_ok(&["login", "alice@example.com", "-p", "secret"]);
    assert!(ws.run_ok(&["whoami"]).contains("Alice"));

    assert!(!ws.run(&["login", "alice", "-p", "wrong"]).status.success());
}

#[test]
fn readers_like_and_comment() {
    let ws = Workspace::new();
    ws.run_ok(&[
        "register", "bob", "-e", "bob@example.com", "-p", "secret", "-n", "Bob",
    ]);
    let articles = ws.json(&["articles", "list", "--format", "json"]);
    let id = articles[0]["id"].as_str().expect("article id").to_string();

    assert!(ws.run_ok(&["like", &id]).contains("1 likes"));
    assert!(ws.run_ok(&["like", &id]).contains("0 likes"));
    assert!(ws.run_ok(&["bookmark", &id]).contains("Bookmarked"));
    assert!(ws.run_ok(&["comment", &id, "Merci !"]).contains("Comment posted"));

    let stats = ws.json(&["stats", "--json"]);
    assert_eq!(stats["totalComments"], 1);
    assert_eq!(stats["totalLikes"], 0);
}

#[test]
fn only_admins_create_articles() {
    let ws = Workspace::new();
    let body = ws.path("post.md");
    write_file(&body, "# Rust\n\nOwnership and borrowing.");
    let body = body.to_str().expect("utf8 path");

    ws.run_ok(&[
        "register", "carol", "-e", "carol@example.com", "-p", "secret", "-n", "Carol",
    ]);
    let create = ["articles", "create", "-t", "Rust", "--category", "tutorials", "-f", body];
    assert!(!ws.run(&create).status.success());

    ws.run_ok(&["login", "root", "-p", "root"]);
    ws.run_ok(&create);

    let results = ws.json(&["search", "ownership", "-t", "articles", "--format", "json"]);
    assert_eq!(results["stats"]["articles"], 1);
    assert_eq!(results["results"][0]["slug"], "rust");
}

#[test]
fn export_then_import_restores_the_blog() {
    let ws = Workspace::new();
    let backup = ws.path("backup.json");
    let backup_arg = backup.to_str().expect("utf8 path");

    ws.run_ok(&["export", "-o", backup_arg]);
    ws.run_ok(&[
        "register", "dave", "-e", "dave@example.com", "-p", "secret", "-n", "Dave",
    ]);
    assert_eq!(ws.json(&["stats", "--json"])["totalUsers"], 2);

    ws.run_ok(&["import", backup_arg]);
    assert_eq!(ws.json(&["stats", "--json"])["totalUsers"], 1);

    let broken = ws.path("broken.json");
    write_file(&broken, "{ not json");
    assert!(!ws.run(&["import", broken.to_str().unwrap()]).status.success());
}

#[test]
fn config_validate_reports_bad_files() {
    let ws = Workspace::new();
    assert!(ws.run_ok(&["config", "validate"]).contains("valid"));

    let bad = ws.path("bad.toml");
    write_file(&bad, "[server]\nport = 0\n");
    let output = ws.run(&["config", "validate", "-f", bad.to_str().unwrap()]);
    assert!(!output.status.success());
}
