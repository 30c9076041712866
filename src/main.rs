//! # RAG Console CLI (`ragc`)
//!
//! Operator console for a RAG backend: inspect a project, ingest documents,
//! list and search its embeddings, and chat with its LLM.
//!
//! ## Usage
//!
//! ```bash
//! ragc --config ./config/ragc.toml --project docs <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ragc info` | Show the backend's embedding/LLM/loader catalog |
//! | `ragc show` | Show project metadata and privacy classification |
//! | `ragc chat` | Multi-turn chat (stdin, or `-m` messages) |
//! | `ragc ingest` | Ingest a file, URL, or text |
//! | `ragc list` | List embedded sources (small corpora only) |
//! | `ragc search "<query>"` | Search fragments by text or source |
//! | `ragc view <source>` | Show every fragment of one source |
//! | `ragc delete <source>` | Delete one source's fragments |
//! | `ragc reset` | Delete all of the project's embeddings |
//! | `ragc delete-project` | Delete the project |
//! | `ragc stats` | Top projects by token usage |
//! | `ragc completions <shell>` | Print shell completions |
//!
//! ## Examples
//!
//! ```bash
//! # Ingest a PDF, then a web page, then a note with keywords
//! ragc ingest --file ./handbook.pdf
//! ragc ingest --url https://example.com/faq
//! ragc ingest --text "Deploys happen on Tuesdays." --source deploy-note --keyword deploy
//!
//! # Ask two threaded questions
//! ragc chat -m "When do deploys happen?" -m "Who approves them?"
//! ```

use clap::{CommandFactory, Parser, Subcommand};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use rag_console::chat::{self, ChatSession};
use rag_console::client::{HttpClient, RagApi};
use rag_console::config;
use rag_console::console::{self, IngestionConsole, SearchKind};
use rag_console::error::ErrorRecord;
use rag_console::info::{self, ProjectInfoCache};
use rag_console::ingest;
use rag_console::stats;

/// RAG Console: operate a retrieval-augmented-generation backend from the
/// command line.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file with the backend URL and credentials.
#[derive(Parser)]
#[command(
    name = "ragc",
    about = "RAG Console: chat with, ingest into, and search a RAG backend",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/ragc.toml")]
    config: PathBuf,

    /// Project to operate on. Defaults to `[console].project` from the config.
    #[arg(long, short = 'p', global = true)]
    project: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the backend catalog (embeddings, LLMs, loaders).
    Info,

    /// Show project metadata and whether it is local or public AI.
    Show,

    /// Chat with the project's LLM.
    ///
    /// Each question is threaded onto the previous answer. Without `-m`,
    /// questions are read from stdin, one per line.
    Chat {
        /// Question to ask (repeatable, asked in order).
        #[arg(long = "message", short = 'm')]
        messages: Vec<String>,

        /// Number of fragments to retrieve. Defaults to the project's `k`.
        #[arg(long)]
        k: Option<u32>,

        /// Similarity threshold in [0, 1]. Defaults to the project's `score`.
        #[arg(long)]
        score: Option<f64>,
    },

    /// Ingest a document.
    ///
    /// When several inputs are given, only one is ingested: the file if
    /// present, otherwise the URL, otherwise the text.
    Ingest {
        /// File to upload.
        #[arg(long)]
        file: Option<PathBuf>,

        /// URL for the backend to fetch.
        #[arg(long)]
        url: Option<String>,

        /// Raw text to ingest.
        #[arg(long)]
        text: Option<String>,

        /// Source name for `--text`.
        #[arg(long)]
        source: Option<String>,

        /// Keyword for `--text` (repeatable). Omit to let the backend extract keywords.
        #[arg(long = "keyword")]
        keywords: Vec<String>,
    },

    /// List embedded sources.
    ///
    /// Projects with 20000 or more documents are search-only.
    List,

    /// Search embedded fragments.
    Search {
        query: String,

        /// `text` (similarity) or `source` (exact source lookup).
        #[arg(long, default_value = "text")]
        kind: String,

        /// Number of hits for text search. Defaults to the project's `k`.
        #[arg(long)]
        k: Option<u32>,

        /// Similarity threshold for text search. Defaults to the project's `score`.
        #[arg(long)]
        score: Option<f64>,
    },

    /// Show every fragment of one source.
    View { source: String },

    /// Delete one source's fragments.
    Delete {
        source: String,

        /// Do not ask for confirmation.
        #[arg(long)]
        yes: bool,
    },

    /// Delete all of the project's embeddings.
    Reset {
        /// Do not ask for confirmation.
        #[arg(long)]
        yes: bool,
    },

    /// Delete the project.
    DeleteProject {
        /// Do not ask for confirmation.
        #[arg(long)]
        yes: bool,
    },

    /// Show the projects using the most tokens.
    Stats {
        /// Number of projects to show.
        #[arg(long, default_value_t = 10)]
        limit: u32,
    },

    /// Print a shell completion script to stdout.
    Completions { shell: clap_complete::Shell },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    if let Commands::Completions { shell } = cli.command {
        clap_complete::generate(shell, &mut Cli::command(), "ragc", &mut std::io::stdout());
        return Ok(());
    }

    let cfg = config::load_config(&cli.config)?;
    let api: Arc<dyn RagApi> = Arc::new(HttpClient::from_config(&cfg)?);
    let info_cache = Arc::new(ProjectInfoCache::new());

    // Commands that are not tied to a project
    match &cli.command {
        Commands::Info => {
            info::run_info(api.as_ref()).await?;
            return Ok(());
        }
        Commands::Stats { limit } => {
            stats::run_stats(api.as_ref(), *limit).await?;
            return Ok(());
        }
        _ => {}
    }

    let project = cfg.project_name(cli.project.as_deref())?;

    let errors = match cli.command {
        Commands::Chat {
            messages,
            k,
            score,
        } => {
            let session = ChatSession::new(api, info_cache, &project);
            chat::run_chat(&session, messages, k, score).await?;
            session.errors()
        }
        command => {
            let console = IngestionConsole::new(api, info_cache, &project);
            run_console_command(&console, &project, command).await?;
            console.errors()
        }
    };

    if !errors.is_empty() {
        report_errors(&errors);
        std::process::exit(1);
    }

    Ok(())
}

async fn run_console_command(
    console: &IngestionConsole,
    project: &str,
    command: Commands,
) -> anyhow::Result<()> {
    match command {
        Commands::Show => console::run_show(console).await?,
        Commands::Ingest {
            file,
            url,
            text,
            source,
            keywords,
        } => ingest::run_ingest(console, file, url, text, source, keywords).await?,
        Commands::List => console::run_list(console).await?,
        Commands::Search {
            query,
            kind,
            k,
            score,
        } => {
            let kind: SearchKind = kind.parse()?;
            console::run_search(console, kind, &query, k, score).await?
        }
        Commands::View { source } => console::run_view(console, &source).await?,
        Commands::Delete { source, yes } => {
            if confirm(&format!("Delete {}?", source), yes)? {
                console::run_delete(console, &source).await?;
            }
        }
        Commands::Reset { yes } => {
            if confirm(&format!("Reset {} embeddings?", project), yes)? {
                console::run_reset(console).await?;
            }
        }
        Commands::DeleteProject { yes } => {
            if confirm(&format!("Delete {}?", project), yes)? {
                console::run_delete_project(console).await?;
            }
        }
        // Handled before a project is resolved
        Commands::Info
        | Commands::Stats { .. }
        | Commands::Chat { .. }
        | Commands::Completions { .. } => unreachable!(),
    }
    Ok(())
}

/// Ask a yes/no question on stderr; anything but `y`/`yes` declines.
fn confirm(prompt: &str, assume_yes: bool) -> anyhow::Result<bool> {
    if assume_yes {
        return Ok(true);
    }
    eprint!("{} [y/N] ", prompt);
    std::io::stderr().flush()?;

    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    let accepted = matches!(answer.trim().to_lowercase().as_str(), "y" | "yes");
    if !accepted {
        eprintln!("Aborted.");
    }
    Ok(accepted)
}

fn report_errors(errors: &[ErrorRecord]) {
    eprintln!("Errors:");
    for e in errors {
        eprintln!(
            "  [{}] {}: {}",
            e.at.format("%H:%M:%S"),
            e.operation,
            e.message
        );
    }
}
