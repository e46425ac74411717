#![forbid(unsafe_code)]

mod cmd;
mod output;
mod tui;

use clap::{CommandFactory, Parser, Subcommand};
use memex_core::config::{MEMEX_DIR, UserConfig, load_user_config};
use output::OutputMode;
use std::env;
use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{info, warn};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "memex: a hypertext journal grown by AI",
    long_about = None
)]
struct Cli {
    /// Enable verbose (debug) logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Output format. Overrides --json, FORMAT and the user config.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Journal root directory (defaults to the current directory).
    #[arg(long, global = true, value_name = "DIR")]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl Cli {
    fn output_mode(&self, user: &UserConfig) -> OutputMode {
        output::resolve_output_mode(self.format, self.json, user.output.as_deref())
    }

    const fn is_browse(&self) -> bool {
        matches!(self.command, None | Some(Commands::Browse))
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Lifecycle",
        about = "Initialize a journal",
        long_about = "Create .memex/ with a default config.toml and an empty document database.",
        after_help = "EXAMPLES:\n    # Initialize a journal in the current directory\n    mx init\n\n    # Reset config.toml to defaults, keeping documents\n    mx init --force"
    )]
    Init(cmd::init::InitArgs),

    #[command(
        next_help_heading = "Read",
        about = "List documents",
        long_about = "List the document index (ID, title, description) in ascending ID order.",
        after_help = "EXAMPLES:\n    # List every document\n    mx list\n\n    # Emit machine-readable output\n    mx list --json"
    )]
    List(cmd::list::ListArgs),

    #[command(
        next_help_heading = "Read",
        about = "Show one document",
        long_about = "Show a document's title, body and outgoing links.",
        after_help = "EXAMPLES:\n    # Show document 3\n    mx show 3\n\n    # Emit machine-readable output\n    mx show 3 --json"
    )]
    Show(cmd::show::ShowArgs),

    #[command(
        next_help_heading = "Write",
        about = "Create a document",
        long_about = "Create a document from inline text or a UTF-8 file.",
        after_help = "EXAMPLES:\n    # Create from inline text\n    mx new --title \"Ideas\" --body \"cats are great\"\n\n    # Create from a file\n    mx new --title \"Draft\" --file draft.txt"
    )]
    New(cmd::new::NewArgs),

    #[command(
        next_help_heading = "Write",
        about = "Link text in a document to another document",
        long_about = "Turn the first plain-text occurrence of --text in a document into a link.",
        after_help = "EXAMPLES:\n    # Link the word \"cats\" in document 1 to document 2\n    mx link 1 --text cats --target 2"
    )]
    Link(cmd::link::LinkArgs),

    #[command(
        next_help_heading = "Grow",
        about = "Ask the AI to expand on a snippet",
        long_about = "Send a snippet of a document to the AI service, store the reply as a new document and link the snippet to it.",
        after_help = "EXAMPLES:\n    # Expand on \"cats\" in document 1\n    mx ask 1 --text cats\n\n    # Use a custom prompt prefix\n    mx ask 1 --text cats --prefix \"Summarize: \""
    )]
    Ask(cmd::ask::AskArgs),

    #[command(
        next_help_heading = "Grow",
        about = "Generate an image from a prompt",
        long_about = "Generate an image from a prompt and save it as a PNG file.",
        after_help = "EXAMPLES:\n    # Generate an image for document 1\n    mx image 1 --text \"a sleeping cat\" --output cat.png\n\n    # Generate without a document\n    mx image --text \"a lighthouse\""
    )]
    Image(cmd::image::ImageArgs),

    #[command(
        next_help_heading = "Transfer",
        about = "Import a text file as a document",
        long_about = "Import a text file; the title is the file name and non-printable characters are stripped.",
        after_help = "EXAMPLES:\n    # Import notes\n    mx import notes.txt"
    )]
    Import(cmd::import::ImportArgs),

    #[command(
        next_help_heading = "Transfer",
        about = "Export a document body",
        long_about = "Write a document body to a file, or to stdout when no --output is given.",
        after_help = "EXAMPLES:\n    # Export to a file\n    mx export 3 --output cats.txt\n\n    # Print to stdout\n    mx export 3"
    )]
    Export(cmd::export::ExportArgs),

    #[command(
        next_help_heading = "Browse",
        about = "Browse the journal interactively",
        long_about = "Open the terminal browser. This is the default when no subcommand is given."
    )]
    Browse,

    #[command(
        next_help_heading = "Misc",
        about = "Generate shell completion scripts",
        after_help = "EXAMPLES:\n    # Bash\n    mx completions bash > ~/.local/share/bash-completion/completions/mx"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

fn default_filter(verbose: bool) -> EnvFilter {
    EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
        "memex=debug,mx=debug,info"
    } else {
        "memex=info,mx=info,warn"
    })
}

/// Log to stderr, or to `.memex/memex.log` while the browser owns the
/// terminal. Without a journal directory browser logs are discarded.
fn init_tracing(project_root: &Path, verbose: bool, browse: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_env("MEMEX_LOG").unwrap_or_else(|_| default_filter(verbose));

    let writer = if browse {
        let memex_dir = project_root.join(MEMEX_DIR);
        if memex_dir.is_dir() {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(memex_dir.join("memex.log"))?;
            BoxMakeWriter::new(Mutex::new(file))
        } else {
            BoxMakeWriter::new(io::sink)
        }
    } else {
        BoxMakeWriter::new(io::stderr)
    };

    let format = env::var("MEMEX_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(writer))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_ansi(!browse).with_writer(writer))
                .init();
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let project_root = match cli.root.clone() {
        Some(root) => root,
        None => env::current_dir()?,
    };
    init_tracing(&project_root, cli.verbose, cli.is_browse())?;

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let user = load_user_config().unwrap_or_else(|err| {
        warn!(error = %format!("{err:#}"), "ignoring unreadable user config");
        UserConfig::default()
    });
    let output = cli.output_mode(&user);

    match cli.command {
        Some(Commands::Init(ref args)) => cmd::init::run_init(args, output, &project_root),
        Some(Commands::List(ref args)) => cmd::list::run_list(args, output, &project_root),
        Some(Commands::Show(ref args)) => cmd::show::run_show(args, output, &project_root),
        Some(Commands::New(ref args)) => cmd::new::run_new(args, output, &project_root),
        Some(Commands::Link(ref args)) => cmd::link::run_link(args, output, &project_root),
        Some(Commands::Ask(ref args)) => cmd::ask::run_ask(args, output, &project_root),
        Some(Commands::Image(ref args)) => cmd::image::run_image(args, output, &project_root),
        Some(Commands::Import(ref args)) => cmd::import::run_import(args, output, &project_root),
        Some(Commands::Export(ref args)) => cmd::export::run_export(args, output, &project_root),
        Some(Commands::Completions(ref args)) => {
            let mut command = Cli::command();
            cmd::completions::run_completions(args.shell, &mut command)
        }
        Some(Commands::Browse) | None => tui::run_browser(output, &project_root),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_means_browse() {
        let cli = Cli::parse_from(["mx"]);
        assert!(cli.command.is_none());
        assert!(cli.is_browse());
    }

    #[test]
    fn browse_subcommand_parses() {
        let cli = Cli::parse_from(["mx", "browse"]);
        assert!(cli.is_browse());
    }

    #[test]
    fn json_flag_sets_output_mode() {
        let cli = Cli::parse_from(["mx", "--json", "list"]);
        assert!(cli.json);
        assert!(cli.output_mode(&UserConfig::default()).is_json());
    }

    #[test]
    fn json_flag_after_subcommand() {
        let cli = Cli::parse_from(["mx", "list", "--json"]);
        assert!(cli.output_mode(&UserConfig::default()).is_json());
    }

    #[test]
    fn format_flag_beats_json_flag() {
        let cli = Cli::parse_from(["mx", "list", "--json", "--format", "text"]);
        assert_eq!(cli.output_mode(&UserConfig::default()), OutputMode::Text);
    }

    #[test]
    fn root_flag_is_global() {
        let cli = Cli::parse_from(["mx", "show", "4", "--root", "/tmp/journal"]);
        assert_eq!(cli.root, Some(PathBuf::from("/tmp/journal")));
        assert!(!cli.is_browse());
    }

    #[test]
    fn show_requires_numeric_id() {
        assert!(Cli::try_parse_from(["mx", "show", "abc"]).is_err());
        assert!(Cli::try_parse_from(["mx", "show", "-3"]).is_err());
    }

    #[test]
    fn new_requires_body_or_file() {
        assert!(Cli::try_parse_from(["mx", "new", "--title", "t"]).is_err());
        assert!(
            Cli::try_parse_from(["mx", "new", "--title", "t", "--body", "b", "--file", "f"])
                .is_err()
        );
    }

    #[test]
    fn completions_subcommand_parses() {
        let cli = Cli::parse_from(["mx", "completions", "bash"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Completions(cmd::completions::CompletionsArgs {
                shell: clap_complete::Shell::Bash,
            }))
        ));
    }

    #[test]
    fn all_subcommands_listed() {
        let subcommands = [
            vec!["mx", "init"],
            vec!["mx", "list"],
            vec!["mx", "show", "1"],
            vec!["mx", "new", "--title", "x", "--body", "y"],
            vec!["mx", "new", "--title", "x", "--file", "notes.txt"],
            vec!["mx", "link", "1", "--text", "cats", "--target", "2"],
            vec!["mx", "ask", "1", "--text", "cats"],
            vec!["mx", "ask", "1", "--text", "cats", "--prefix", "Summarize: "],
            vec!["mx", "image", "--text", "a cat"],
            vec!["mx", "image", "1", "--text", "a cat", "--output", "cat.png"],
            vec!["mx", "import", "notes.txt"],
            vec!["mx", "export", "1"],
            vec!["mx", "export", "1", "--output", "out.txt"],
            vec!["mx", "browse"],
            vec!["mx", "completions", "zsh"],
        ];
        for args in &subcommands {
            let result = Cli::try_parse_from(args.iter());
            assert!(
                result.is_ok(),
                "Failed to parse: {:?}: {:?}",
                args,
                result.err()
            );
        }
    }
}
