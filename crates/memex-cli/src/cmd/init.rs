use crate::output::{OutputMode, pretty_kv, render};
use anyhow::Result;
use clap::Args;
use memex_core::config::{self, MEMEX_DIR};
use memex_core::{ErrorCode, MemexError, SqliteStore};
use serde::Serialize;
use std::io;
use std::path::Path;

use super::{fail, fail_code};

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Rewrite config.toml with defaults even if `.memex/` already exists.
    /// Existing documents are kept.
    #[arg(long)]
    pub force: bool,
}

const GITIGNORE: &str = "memex.log\n*.sqlite3-wal\n*.sqlite3-shm\n";

#[derive(Debug, Serialize)]
struct InitReport {
    root: String,
    config: String,
    store: String,
    documents: u64,
    reinitialized: bool,
}

/// Execute `mx init`. Creates the journal skeleton:
///
/// ```text
/// .memex/
///   config.toml         (default project config)
///   documents.sqlite3   (migrated document database)
///   .gitignore          (memex.log, SQLite side files)
/// ```
///
/// # Errors
///
/// Returns an error if `.memex/` already exists and `--force` is not set,
/// or if any filesystem or database operation fails.
pub fn run_init(args: &InitArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let memex_dir = project_root.join(MEMEX_DIR);
    let existed = memex_dir.exists();

    if existed && !args.force {
        return Err(fail_code(
            output,
            ErrorCode::AlreadyInitialized,
            format!("{MEMEX_DIR}/ already exists in {}", project_root.display()),
        ));
    }

    let io_failure = |context: String, source: io::Error| {
        fail(output, &MemexError::Io { context, source })
    };

    std::fs::create_dir_all(&memex_dir)
        .map_err(|err| io_failure(format!("Failed to create {}", memex_dir.display()), err))?;

    let config_path = config::project_config_path(project_root);
    std::fs::write(&config_path, config::default_project_config_toml()?).map_err(|err| {
        io_failure(format!("Failed to write config: {}", config_path.display()), err)
    })?;

    let gitignore_path = memex_dir.join(".gitignore");
    std::fs::write(&gitignore_path, GITIGNORE).map_err(|err| {
        io_failure(format!("Failed to write .gitignore: {}", gitignore_path.display()), err)
    })?;

    let project = config::load_project_config(project_root)?;
    let store_path = project.store_path(project_root);
    let store =
        SqliteStore::open(&store_path).map_err(|err| fail(output, &MemexError::Store(err)))?;
    let documents = store.count().map_err(|err| fail(output, &err))?;

    tracing::info!(root = %project_root.display(), documents, "initialized journal");

    let report = InitReport {
        root: project_root.display().to_string(),
        config: config_path.display().to_string(),
        store: store_path.display().to_string(),
        documents,
        reinitialized: existed,
    };

    render(output, &report, |report, w| {
        if report.reinitialized {
            writeln!(w, "✓ Reinitialized {MEMEX_DIR}/ journal.")?;
        } else {
            writeln!(w, "✓ Initialized {MEMEX_DIR}/ journal.")?;
        }
        writeln!(w)?;
        pretty_kv(w, "Config", &report.config)?;
        pretty_kv(w, "Store", &report.store)?;
        pretty_kv(w, "Documents", report.documents.to_string())?;
        writeln!(w)?;
        writeln!(w, "Next steps:")?;
        writeln!(w, "  mx new --title \"First note\" --body \"...\"")?;
        writeln!(w, "  export OPENAI_API_KEY=...   # enables `mx ask` and `mx image`")?;
        writeln!(w, "  mx                          # open the browser")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_creates_config_and_store() {
        let dir = tempfile::tempdir().expect("temp dir");
        run_init(&InitArgs { force: false }, OutputMode::Json, dir.path()).expect("init");

        let memex = dir.path().join(MEMEX_DIR);
        assert!(memex.join("config.toml").is_file());
        assert!(memex.join("documents.sqlite3").is_file());
        assert!(memex.join(".gitignore").is_file());
    }

    #[test]
    fn init_twice_requires_force() {
        let dir = tempfile::tempdir().expect("temp dir");
        run_init(&InitArgs { force: false }, OutputMode::Json, dir.path()).expect("init");
        assert!(run_init(&InitArgs { force: false }, OutputMode::Json, dir.path()).is_err());
        run_init(&InitArgs { force: true }, OutputMode::Json, dir.path()).expect("force");
    }

    #[test]
    fn force_keeps_documents() {
        use memex_core::DocumentStore;

        let dir = tempfile::tempdir().expect("temp dir");
        run_init(&InitArgs { force: false }, OutputMode::Json, dir.path()).expect("init");
        let path = dir.path().join(MEMEX_DIR).join("documents.sqlite3");
        {
            let mut store = SqliteStore::open(&path).expect("open");
            store.create("Keep", "me").expect("create");
        }
        run_init(&InitArgs { force: true }, OutputMode::Json, dir.path()).expect("force");
        let store = SqliteStore::open(&path).expect("reopen");
        assert_eq!(store.count().expect("count"), 1);
    }
}
