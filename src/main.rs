use anyhow::{Context, Result};
use crowdtask::api::auth::CsrfToken;
use crowdtask::api::memory::MemoryApi;
use crowdtask::api::rest::ApiClient;
use crowdtask::api::TaskApi;
use crowdtask::config::Config;
use crowdtask::pipeline::{self, Presenter};
use crowdtask::tui::{self, state::AppState, TuiCommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG: &str = "config.toml";

/// Value following `flag` on the command line, if any.
fn arg_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let simulate = args.iter().any(|arg| arg == "--simulate");
    let config_path = arg_value(&args, "--config").unwrap_or_else(|| DEFAULT_CONFIG.to_string());

    // The terminal belongs to the TUI, so logs go to a file.
    let log_file = std::fs::File::create("crowdtask.log")?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("crowdtask=info")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .init();

    let mut config = Config::load(Path::new(&config_path))?;
    if let Some(project) = arg_value(&args, "--project") {
        config.presenter.project = project;
    }

    // Load saved values from .env (real env vars take precedence)
    Config::load_env_file();

    println!();
    println!("  crowdtask v{}", env!("CARGO_PKG_VERSION"));
    println!("  ===============");
    println!();

    let api: Arc<dyn TaskApi> = if simulate {
        let fixture: PathBuf = config
            .simulation
            .as_ref()
            .map(|s| s.fixture.clone())
            .context("--simulate needs a [simulation] section with a fixture path")?;
        println!("  ** SIMULATION MODE ** (fixture: {})", fixture.display());
        Arc::new(MemoryApi::from_fixture(&fixture)?)
    } else {
        let csrf = Config::csrf_token().map(|t| CsrfToken::new(&config.server.csrf_header, t));
        match &csrf {
            Some(token) => println!("  Anti-forgery token loaded ({} header)", token.header_name()),
            None => {
                println!("  No CROWDTASK_CSRF_TOKEN set; writes will be sent without a token");
                tracing::warn!("no anti-forgery token configured");
            }
        }
        println!("  Server: {}", config.server.api_base);
        Arc::new(ApiClient::new(&config.server, csrf)?)
    };

    println!("  Project: {}", config.presenter.project);
    println!();

    tracing::info!(
        project = %config.presenter.project,
        simulate,
        use_batches = config.presenter.use_batches,
        "starting presenter"
    );

    let (state_tx, state_rx) = watch::channel(AppState::new(
        &config.presenter.project,
        config.presenter.answers.clone(),
        simulate,
    ));
    let (cmd_tx, cmd_rx) = mpsc::channel::<TuiCommand>(16);

    let presenter = Presenter::new(api, config.presenter.clone());
    tokio::spawn(async move {
        if let Err(e) = pipeline::run_presenter(presenter, state_tx, cmd_rx).await {
            tracing::error!("presenter fatal: {:#}", e);
        }
    });

    // Blocks until quit
    tui::run_tui(state_rx, cmd_tx).await?;

    tracing::debug!("shutting down");
    Ok(())
}
