use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use logdeck::archive::Archive;
use logdeck::auth::TokenStore;
use logdeck::cli::{Cli, Command};
use logdeck::collectors;
use logdeck::config::Configuration;
use logdeck::fanout::Engine;
use logdeck::reaper;
use logdeck::router::{build_router, AppState};
use logdeck::sinks::{ArchiveSink, PublisherSink};

fn load_configuration(cli: &Cli) -> Result<Configuration> {
    let base = match &cli.config_file {
        Some(path) => Configuration::load_file(path)
            .with_context(|| format!("loading config file {}", path.display()))?,
        None => Configuration::default(),
    };
    Ok(cli.config.apply(base))
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("logdeck={level},tower_http=info")));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn open_auth(config: &Configuration) -> Result<Arc<TokenStore>> {
    Ok(Arc::new(match config.auth_path() {
        Some(path) => {
            TokenStore::open(&PathBuf::from(path)).context("opening auth database")?
        }
        None => TokenStore::disabled(),
    }))
}

async fn run_service(config: Configuration) -> Result<()> {
    let archive = Archive::open(std::path::Path::new(config.archive_path()))
        .context("opening archive")?;
    let auth = open_auth(&config)?;
    let engine = Engine::default();

    engine.add_drain("archive", ArchiveSink::new(archive.clone()));

    if !config.publisher_address.is_empty() {
        engine.add_drain(
            "publisher",
            PublisherSink::new(config.publisher_address.clone(), "log".to_string()),
        );
    }

    let shutdown = CancellationToken::new();

    let rules = config.retention_rules().context("parsing retention policy")?;
    let reaper_archive = archive.clone();
    let reaper_done = shutdown.clone();
    let cleanup_frequency = std::time::Duration::from_secs(config.cleanup_frequency_secs.max(1));
    tokio::spawn(async move {
        reaper::run(reaper_archive, rules, cleanup_frequency, reaper_done).await;
    });

    let default_type: Arc<str> = Arc::from(config.default_type.as_str());

    let udp_addr = config.listen_udp.clone();
    let udp_engine = engine.clone();
    let udp_default_type = Arc::clone(&default_type);
    tokio::spawn(async move {
        if let Err(err) = collectors::run_udp(&udp_addr, udp_default_type, udp_engine).await {
            tracing::error!(error = %err, "udp collector exited");
        }
    });

    let tcp_addr = config.listen_tcp.clone();
    let tcp_engine = engine.clone();
    let tcp_default_type = Arc::clone(&default_type);
    tokio::spawn(async move {
        if let Err(err) = collectors::run_tcp(&tcp_addr, tcp_default_type, tcp_engine).await {
            tracing::error!(error = %err, "tcp collector exited");
        }
    });

    let state = AppState {
        engine,
        archive,
        auth,
        config: Arc::new(config.clone()),
    };
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.listen_http)
        .await
        .with_context(|| format!("binding HTTP listener on {}", config.listen_http))?;
    info!(address = %config.listen_http, "http api listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            shutdown.cancel();
        })
        .await
        .context("http server error")?;

    Ok(())
}

fn run_export(config: &Configuration, file: Option<PathBuf>) -> Result<()> {
    let auth = open_auth(config)?;
    let data = auth.export().context("exporting tokens")?;
    match file {
        Some(path) => std::fs::write(&path, &data)
            .with_context(|| format!("writing export to {}", path.display()))?,
        None => std::io::stdout().write_all(&data)?,
    }
    Ok(())
}

fn run_import(config: &Configuration, file: Option<PathBuf>) -> Result<()> {
    let auth = open_auth(config)?;
    let data = match file {
        Some(path) => {
            std::fs::read(&path).with_context(|| format!("reading import file {}", path.display()))?
        }
        None => {
            let mut buf = Vec::new();
            std::io::Read::read_to_end(&mut std::io::stdin(), &mut buf)?;
            buf
        }
    };
    let count = auth.import(&data).context("importing tokens")?;
    info!(count, "imported tokens");
    Ok(())
}

fn run_add_token(config: &Configuration, token: String) -> Result<()> {
    let auth = open_auth(config)?;
    auth.add(&token).context("adding token")?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_configuration(&cli)?;
    init_tracing(&config.default_log_level);

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run_service(config).await?,
        Command::AddToken { token } => run_add_token(&config, token)?,
        Command::Export { file } => run_export(&config, file)?,
        Command::Import { file } => run_import(&config, file)?,
    }

    Ok(())
}
