mod args;
mod console;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ticketgrab_core::{
    load_config, load_default_config, validate_config, AuthFlow, Config, Credentials,
    FixedGuardCodeProvider, FlowContext, FlowOutcome, FsGuardStore, GuardCodeProvider, Session,
    TcpTransport, TicketWriter,
};

use args::Args;
use console::ConsoleGuardCodeProvider;

/// Configuration file picked up from the working directory when present.
const DEFAULT_CONFIG_FILE: &str = "ticketgrab.toml";

fn main() {
    // Usage errors and --help both exit non-zero, before any network activity.
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            std::process::exit(1);
        }
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to start runtime: {}", e);
            std::process::exit(1);
        }
    };

    let result = runtime.block_on(run(args));
    // A console prompt abandoned on interrupt must not hold up exit.
    runtime.shutdown_background();

    match result {
        Ok(outcome) => {
            info!(
                "Saved tickets for app {}: {} and {}",
                outcome.app_id,
                outcome.ownership_path.display(),
                outcome.encrypted_path.display()
            );
        }
        Err(e) => {
            error!("Fatal error: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn load(config_path: Option<&Path>) -> Result<Config> {
    let config = match config_path {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            load_config(path).with_context(|| format!("Failed to load config from {:?}", path))?
        }
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
            info!("Loading configuration from {}", DEFAULT_CONFIG_FILE);
            load_config(Path::new(DEFAULT_CONFIG_FILE))
                .with_context(|| format!("Failed to load config from {}", DEFAULT_CONFIG_FILE))?
        }
        None => load_default_config().context("Failed to load default config")?,
    };
    validate_config(&config).context("Configuration validation failed")?;
    Ok(config)
}

async fn run(args: Args) -> Result<FlowOutcome> {
    let config = load(args.config.as_deref())?;

    let cwd: PathBuf = std::env::current_dir().context("Failed to read working directory")?;
    let paths = config.paths.resolved_against(&cwd);
    info!("Guard data directory: {:?}", paths.guard_data_dir);
    info!("Ticket directory: {:?}", paths.ticket_dir);

    let codes: Arc<dyn GuardCodeProvider> = match args.guard_code {
        Some(code) => Arc::new(FixedGuardCodeProvider::new(code)),
        None => Arc::new(ConsoleGuardCodeProvider::new()),
    };
    info!("Using guard code provider: {}", codes.method_name());

    let transport = Arc::new(TcpTransport::new(config.connection.clone()));
    let session = Session::new(transport, config.session.poll_wait());
    let context = FlowContext {
        settings: config.session.clone(),
        guard_store: Arc::new(FsGuardStore::new(paths.guard_data_dir)),
        tickets: TicketWriter::new(paths.ticket_dir, config.tickets.clone()),
        codes,
    };

    let mut flow = AuthFlow::new(
        session.clone(),
        context,
        Credentials::new(args.username, args.password),
        args.app_id,
    )
    .context("Failed to set up login")?;

    info!(
        "Logging in to {} for app {}",
        config.connection.server, args.app_id
    );

    let run = flow.run();
    tokio::pin!(run);
    let result = tokio::select! {
        result = &mut run => result,
        _ = signal::ctrl_c() => {
            warn!("Interrupted, closing session");
            session.close().await;
            run.await
        }
    };

    result.context("Login flow failed")
}
