mod config;
mod window;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use tidytabs_core::impls::{HttpTransport, InMemoryTabPlatform, JsonFileTaskStore};
use tidytabs_core::{
    GroupingClient, OrganizeRequest, StartError, TaskMonitor, TaskOrchestrator, TaskState,
};
use tokio_util::sync::CancellationToken;

use crate::config::CliConfig;
use crate::window::WindowFile;

const USAGE: &str = "usage: tidytabs <organize <window.json> | status | wait | cancel | reset>";
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Organize(PathBuf),
    Status,
    Wait,
    Cancel,
    Reset,
}

impl Command {
    fn parse(mut args: impl Iterator<Item = String>) -> Result<Self> {
        let command = match args.next().as_deref() {
            Some("organize") => {
                let path = args
                    .next()
                    .ok_or_else(|| anyhow!("organize needs a window file\n{USAGE}"))?;
                Command::Organize(PathBuf::from(path))
            }
            Some("status") => Command::Status,
            Some("wait") => Command::Wait,
            Some("cancel") => Command::Cancel,
            Some("reset") => Command::Reset,
            Some(other) => bail!("unknown command {other:?}\n{USAGE}"),
            None => bail!("{USAGE}"),
        };
        if let Some(extra) = args.next() {
            bail!("unexpected argument {extra:?}\n{USAGE}");
        }
        Ok(command)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let command = Command::parse(std::env::args().skip(1))?;
    let config = CliConfig::load_default()?;
    let store = Arc::new(
        JsonFileTaskStore::open(&config.state_path)
            .await
            .with_context(|| format!("failed to open task state {}", config.state_path.display()))?,
    );
    let monitor = TaskMonitor::new(store.clone());

    match command {
        Command::Organize(path) => organize(config, store, &path).await,
        Command::Status => {
            print_state(&monitor.snapshot().await?)?;
            Ok(())
        }
        Command::Wait => {
            print_state(&monitor.wait_for_terminal(WAIT_POLL_INTERVAL).await?)?;
            Ok(())
        }
        Command::Cancel => {
            if monitor.request_cancel().await? {
                println!("cancellation requested");
            } else {
                println!("no organize task is running");
            }
            Ok(())
        }
        Command::Reset => {
            if monitor.dismiss().await? {
                println!("task state reset");
            } else {
                println!("nothing to reset");
            }
            Ok(())
        }
    }
}

async fn organize(config: CliConfig, store: Arc<JsonFileTaskStore>, window: &Path) -> Result<()> {
    let platform = Arc::new(WindowFile::load(window)?.into_platform());
    let transport = Arc::new(HttpTransport::new()?);
    let orchestrator = TaskOrchestrator::new(
        store,
        platform.clone(),
        GroupingClient::new(transport),
    );

    orchestrator
        .recover_stale(Duration::from_secs(config.stale_after_secs))
        .await?;

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupted, cancelling");
                cancel.cancel();
            }
        }
    });

    let request = OrganizeRequest::new(config.ai, config.organize);
    let state = match orchestrator.run(request, cancel).await {
        Ok(state) => state,
        Err(StartError::AlreadyRunning) => {
            bail!("another organize task is running (see `tidytabs status`)")
        }
        Err(err) => return Err(err.into()),
    };

    print_state(&state)?;
    match state {
        TaskState::Completed { .. } => {
            print_groups(&platform);
            Ok(())
        }
        TaskState::Error { message, .. } => bail!("organize failed: {message}"),
        _ => Ok(()),
    }
}

fn print_state(state: &TaskState) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(state)?);
    Ok(())
}

fn print_groups(platform: &InMemoryTabPlatform) {
    let tabs = platform.tabs();
    for group in platform.groups() {
        let marker = if group.collapsed { "+" } else { "-" };
        println!("{marker} {} [{}]", group.title, group.color.as_str());
        for id in &group.tabs {
            if let Some(tab) = tabs.iter().find(|t| t.id == *id) {
                println!("    {} {}", tab.id, tab.title);
            }
        }
    }
}
