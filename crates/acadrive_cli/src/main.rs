use std::path::{Path, PathBuf};
use std::sync::Arc;

use acadrive_api::{base_url_for_host, AcadriveApi, HttpAcadriveApi, InMemoryAcadriveApi};
use acadrive_app::{AppState, SearchController, SubmitOutcome, UiEvent, UploadController};
use acadrive_contract::{SearchFilters, UploadRequest};
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use futures::StreamExt;
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::wrappers::BroadcastStream;
use tracing::info;

mod render;

#[derive(Debug, Parser)]
#[command(author, version, about = "Acadrive academic file-sharing client")]
struct Cli {
    #[arg(long, default_value = "config/client.toml")]
    config: PathBuf,
    /// Run against seeded in-memory fixtures instead of a backend.
    #[arg(long)]
    offline: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Upload a file under a subject, with progress.
    Upload {
        #[arg(long)]
        subject: String,
        file: PathBuf,
    },
    /// List the most recently uploaded files.
    Recent {
        #[arg(long, value_enum, default_value = "text")]
        output: Output,
    },
    /// Search files by name or subject.
    Search {
        query: String,
        #[arg(long)]
        subject: Option<String>,
        #[arg(long = "file-type")]
        file_type: Option<String>,
        #[arg(long, value_enum, default_value = "text")]
        output: Output,
    },
    /// Show collection statistics.
    Stats,
    /// Probe backend connectivity.
    Health,
    /// Line-driven session: type to search, /help for commands.
    Interactive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Output {
    Text,
    Html,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RuntimeConfig {
    #[serde(default)]
    api: ApiSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ApiSection {
    /// Explicit override; wins over host-based selection.
    base_url: Option<String>,
    /// Host this client considers itself served from; loopback selects the
    /// local development backend.
    host: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;
    let api = build_api(cli.offline, &config);

    match cli.command {
        Command::Upload { subject, file } => upload(api, subject, file).await,
        Command::Recent { output } => {
            let files = api.recent_files().await?;
            print_files(&files, output);
            Ok(())
        }
        Command::Search {
            query,
            subject,
            file_type,
            output,
        } => {
            let filters = SearchFilters { subject, file_type };
            let files = api.search(&query, &filters).await?;
            print_files(&files, output);
            Ok(())
        }
        Command::Stats => {
            let stats = api.stats().await?;
            println!("{}", render::stats_text(&stats));
            Ok(())
        }
        Command::Health => {
            api.health().await?;
            println!("backend is healthy");
            Ok(())
        }
        Command::Interactive => interactive(api).await,
    }
}

fn load_config(path: &Path) -> Result<RuntimeConfig> {
    if !path.exists() {
        // the client runs fine without a config file
        return Ok(RuntimeConfig::default());
    }
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    toml::from_str(&source).with_context(|| format!("invalid config TOML at {}", path.display()))
}

fn build_api(offline: bool, config: &RuntimeConfig) -> Arc<dyn AcadriveApi> {
    if offline {
        info!("offline mode: using in-memory fixtures");
        return Arc::new(InMemoryAcadriveApi::with_fixtures());
    }
    let base_url = config.api.base_url.clone().unwrap_or_else(|| {
        base_url_for_host(config.api.host.as_deref().unwrap_or("127.0.0.1")).to_string()
    });
    info!(base_url = %base_url, "using HTTP backend");
    Arc::new(HttpAcadriveApi::new(base_url))
}

fn print_files(files: &[acadrive_contract::FileRecord], output: Output) {
    match output {
        Output::Text => println!("{}", render::files_text(files)),
        Output::Html => println!("{}", render::files_html(files)),
    }
}

async fn upload(api: Arc<dyn AcadriveApi>, subject: String, file: PathBuf) -> Result<()> {
    let bytes = tokio::fs::read(&file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;
    let file_name = file
        .file_name()
        .and_then(|name| name.to_str())
        .context("file path has no printable name")?
        .to_string();
    let request = UploadRequest::new(subject, file_name, mime_for(&file), bytes);

    let state = AppState::new(api);
    let controller = UploadController::new(state.clone());
    let mut events = state.subscribe();

    let mut task = tokio::spawn(async move { controller.submit(request).await });
    let mut failed = false;
    let outcome = loop {
        tokio::select! {
            outcome = &mut task => break outcome?,
            event = events.recv() => {
                if let Ok(event) = event {
                    failed |= matches!(event, UiEvent::UploadFailed { .. });
                    if let Some(line) = render::event_line(&event) {
                        println!("{line}");
                    }
                }
            }
        }
    };
    while let Ok(event) = events.try_recv() {
        failed |= matches!(event, UiEvent::UploadFailed { .. });
        if let Some(line) = render::event_line(&event) {
            println!("{line}");
        }
    }

    match outcome {
        SubmitOutcome::Completed if !failed => Ok(()),
        SubmitOutcome::Completed => bail!("upload failed"),
        SubmitOutcome::InvalidInput => bail!("upload rejected before transfer"),
        SubmitOutcome::Busy => bail!("another upload is already in flight"),
    }
}

async fn interactive(api: Arc<dyn AcadriveApi>) -> Result<()> {
    let state = AppState::new(api);
    let mut search = SearchController::new(state.clone());
    let uploader = UploadController::new(state.clone());

    let mut stream = BroadcastStream::new(state.subscribe());
    tokio::spawn(async move {
        while let Some(item) = stream.next().await {
            if let Ok(event) = item {
                if let Some(line) = render::event_line(&event) {
                    println!("{line}");
                }
            }
        }
    });

    state.refresh().await;
    println!("{}", render::files_text(&state.recent_files.read().await));
    print_help();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim().to_string();
        match line.as_str() {
            "" => {}
            "/quit" | "/q" => break,
            "/help" => print_help(),
            "/clear" => search.clear().await,
            "/refresh" => search.refresh_recent().await,
            "/recent" => println!("{}", render::files_text(&state.recent_files.read().await)),
            "/results" => println!("{}", render::files_text(&state.search_results.read().await)),
            other if other.starts_with("/subject") => {
                let value = other.trim_start_matches("/subject").trim();
                search
                    .set_subject_filter((!value.is_empty()).then(|| value.to_string()))
                    .await;
            }
            other if other.starts_with("/type") => {
                let value = other.trim_start_matches("/type").trim();
                search
                    .set_type_filter((!value.is_empty()).then(|| value.to_string()))
                    .await;
            }
            other if other.starts_with("/upload") => {
                let mut parts = other.trim_start_matches("/upload").trim().splitn(2, ' ');
                match (parts.next(), parts.next()) {
                    (Some(subject), Some(path)) if !subject.is_empty() => {
                        interactive_upload(&uploader, subject, Path::new(path.trim())).await;
                    }
                    _ => println!("usage: /upload <subject> <path>"),
                }
            }
            other if other.starts_with('/') => println!("unknown command, /help for a list"),
            query => search.set_query(query).await,
        }
    }
    Ok(())
}

async fn interactive_upload(uploader: &UploadController, subject: &str, path: &Path) {
    let Ok(bytes) = tokio::fs::read(path).await else {
        println!("could not read {}", path.display());
        return;
    };
    let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
        println!("file path has no printable name");
        return;
    };
    let request = UploadRequest::new(subject, file_name, mime_for(path), bytes);
    uploader.submit(request).await;
}

fn print_help() {
    println!(
        "type at least 2 characters to search · /subject <s> · /type <t> · /upload <subject> <path> · /refresh · /recent · /results · /clear · /quit"
    );
}

fn mime_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());
    match extension.as_deref() {
        Some("pdf") => "application/pdf",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("txt") | Some("md") => "text/plain",
        Some("doc") => "application/msword",
        Some("docx") => {
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        }
        Some("ppt") => "application/vnd.ms-powerpoint",
        Some("pptx") => {
            "application/vnd.openxmlformats-officedocument.presentationml.presentation"
        }
        _ => "application/octet-stream",
    }
}
