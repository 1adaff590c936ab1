use std::collections::HashSet;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use futures::StreamExt;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use tweetline_common::{Config, Post, Profile};
use tweetline_ingest::{
    assemble_threads, link_replies, DecodingFetcher, Entry, EntryStream, Paginator,
    PaginatorConfig, SessionState, TimelineDecoder,
};

mod capture;

use capture::CaptureDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Kind {
    Posts,
    Profiles,
}

#[derive(Parser)]
#[command(
    name = "tweetline-replay",
    about = "Replay captured timeline pages through the normalizer and paginator"
)]
struct Cli {
    /// Directory of captured `*.json` response bodies
    #[arg(long)]
    pages: Option<PathBuf>,

    /// Query string handed to the fetcher
    #[arg(long, default_value = "")]
    query: String,

    /// Maximum number of entities to emit
    #[arg(long, default_value_t = 100)]
    max: usize,

    #[arg(long, value_enum, default_value_t = Kind::Posts)]
    kind: Kind,

    /// Link replies and assemble self-threads before printing (posts only)
    #[arg(long)]
    threads: bool,

    /// Print the JSON schema of the selected kind and exit
    #[arg(long)]
    schema: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("tweetline_ingest=info".parse()?)
                .add_directive("tweetline_replay=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if cli.schema {
        let schema = match cli.kind {
            Kind::Posts => schemars::schema_for!(Post),
            Kind::Profiles => schemars::schema_for!(Profile),
        };
        println!("{}", serde_json::to_string_pretty(&schema)?);
        return Ok(());
    }

    let Some(pages) = cli.pages.as_deref() else {
        bail!("--pages is required unless --schema is given");
    };

    let config = Config::from_env().context("Invalid TWEETLINE_* configuration")?;
    config.log_summary();

    let decoder = match cli.kind {
        Kind::Posts => TimelineDecoder::tweets(),
        Kind::Profiles => TimelineDecoder::users(),
    };
    let captures = CaptureDir::load(pages, &decoder)?;
    if captures.is_empty() {
        bail!("No *.json captures in {}", pages.display());
    }

    let fetcher = DecodingFetcher::new(captures, decoder);
    let paginator = Paginator::new(Arc::new(fetcher), PaginatorConfig::from(&config));

    let state = match cli.kind {
        Kind::Posts if cli.threads => {
            let (posts, state) = collect(paginator.posts(&cli.query, cli.max)).await;
            let posts = assemble_threads(link_replies(posts));
            let attached: HashSet<&str> = posts
                .iter()
                .flat_map(|p| p.thread.iter().map(|t| t.id.as_str()))
                .collect();
            for post in posts.iter().filter(|p| !attached.contains(p.id.as_str())) {
                print_line(post)?;
            }
            state
        }
        Kind::Posts => print_all(paginator.posts(&cli.query, cli.max)).await?,
        Kind::Profiles => print_all(paginator.profiles(&cli.query, cli.max)).await?,
    };

    info!(state = ?state, "Replay finished");
    Ok(())
}

/// Print each success as it arrives.
async fn print_all<E: serde::Serialize>(mut stream: EntryStream<E>) -> Result<SessionState> {
    let mut printed = 0usize;
    while let Some(entry) = stream.next().await {
        if let Some(entity) = keep(entry) {
            print_line(&entity)?;
            printed += 1;
        }
    }
    info!(printed, "Entries printed");
    Ok(stream.finish().await)
}

async fn collect<E>(mut stream: EntryStream<E>) -> (Vec<E>, SessionState) {
    let mut entities = Vec::new();
    while let Some(entry) = stream.next().await {
        entities.extend(keep(entry));
    }
    (entities, stream.finish().await)
}

fn keep<E>(entry: Entry<E>) -> Option<E> {
    match entry {
        Ok(entity) => Some(entity),
        Err(err) if err.is_session_level() => {
            warn!(error = %err, "Session ended with an error");
            None
        }
        Err(err) => {
            warn!(error = %err, "Record skipped");
            None
        }
    }
}

fn print_line<T: serde::Serialize>(value: &T) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer(&mut stdout, value)?;
    writeln!(stdout)?;
    Ok(())
}
