use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use review_index::{Config, ReviewIndexClient, parse_diff};
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_COMMIT_HASH"),
    ", built ",
    env!("BUILD_TIMESTAMP"),
    ")"
);

/// Keep a repository's code index in sync and gather context for pull request reviews
#[derive(Debug, Parser)]
#[command(name = "review-index", version = VERSION)]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long = "config", global = true)]
    config: Option<PathBuf>,

    /// Vector database backend: lancedb or memory
    #[arg(long = "db-backend", global = true)]
    db_backend: Option<String>,

    /// LanceDB data directory
    #[arg(long = "lancedb-path", global = true)]
    lancedb_path: Option<PathBuf>,

    /// Maximum number of files processed concurrently
    #[arg(long = "max-parallel", global = true)]
    max_parallel: Option<usize>,

    /// Emit logs as JSON lines on stderr
    #[arg(long = "json-logs", global = true)]
    json_logs: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Clone or pull a repository and rebuild its index from scratch
    Index {
        repo_url: String,
    },

    /// Apply the changes between two commits to a repository's index
    Sync {
        repo_url: String,
        old_commit: String,
        new_commit: String,
    },

    /// Parse a unified diff and print the per-file line mappings
    ParseDiff {
        /// Diff file, or `-` for stdin
        diff: String,
    },

    /// Retrieve review context for every file of a pull request diff
    Context {
        repo_url: String,
        /// Diff file, or `-` for stdin
        diff: String,
    },

    /// Find the chunks closest to a query, excluding one file
    Retrieve {
        repo_url: String,
        file_path: String,
        query: String,

        /// Number of chunks to return (defaults to retrieval.limit)
        #[arg(long = "limit", short = 'n')]
        limit: Option<usize>,
    },
}

impl Cli {
    fn load_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file_with_env(path)?,
            None => Config::new()?,
        };

        if let Some(backend) = &self.db_backend {
            config.vector_db.backend = backend.clone();
        }
        if let Some(path) = &self.lancedb_path {
            config.vector_db.lancedb_path = path.clone();
        }
        if let Some(n) = self.max_parallel {
            config.indexing.max_parallel_files = n;
        }
        if self.json_logs {
            config.logging.json = true;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.load_config()?;
    review_index::logging::init(&config.logging);

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted, cancelling");
                cancel.cancel();
            }
        });
    }

    match cli.cmd {
        Command::ParseDiff { diff } => {
            let text = read_input(&diff)?;
            print_json(&parse_diff(&text))
        }
        Command::Index { repo_url } => {
            let client = ReviewIndexClient::new(config).await?;
            print_json(&client.index_repository(&repo_url, &cancel).await?)
        }
        Command::Sync {
            repo_url,
            old_commit,
            new_commit,
        } => {
            let client = ReviewIndexClient::new(config).await?;
            let report = client
                .index_push(&repo_url, &old_commit, &new_commit, &cancel)
                .await?;
            print_json(&report)
        }
        Command::Context { repo_url, diff } => {
            let text = read_input(&diff)?;
            let client = ReviewIndexClient::new(config).await?;
            print_json(&client.review_context(&repo_url, &text).await?)
        }
        Command::Retrieve {
            repo_url,
            file_path,
            query,
            limit,
        } => {
            let limit = limit.unwrap_or(config.retrieval.limit);
            let client = ReviewIndexClient::new(config).await?;
            print_json(&client.retrieve(&repo_url, &file_path, &query, limit).await?)
        }
    }
}

fn read_input(source: &str) -> Result<String> {
    if source == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("failed to read diff from stdin")?;
        return Ok(text);
    }

    std::fs::read_to_string(Path::new(source))
        .with_context(|| format!("failed to read diff from {}", source))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("failed to serialise result")?;
    println!("{}", json);
    Ok(())
}
