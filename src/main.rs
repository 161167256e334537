use anyhow::{Context as _, Result};
use clap::Parser;
use ddns_srv::cli::{Cli, Command};
use ddns_srv::provider::registry::ProviderRegistry;
use ddns_srv::{Config, Context, Dispatcher, Shared};
use is_terminal::IsTerminal;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_init(cli.debug);

    if !cli.command.needs_providers() {
        println!("{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let config = config_init(&cli.config)?;
    let providers = ProviderRegistry::with_builtin()
        .build(&config.providers)
        .await?;
    if providers.is_empty() {
        tracing::warn!("no providers configured, every hostname will be reported as nohost");
    }
    let dispatcher = Dispatcher::new(providers, config.server.concurrency);

    if cli.command == Command::Run {
        tracing::info!("API listening on {}", &config.server.listen);
        ddns_srv::api::new(config, dispatcher, shutdown_signal())?.await?;
        tracing::info!("goodbye");
        return Ok(());
    }

    let (ctx, cancel) = Context::new();
    let interrupt = tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupted, cancelling provider calls");
            cancel.cancel();
        }
    });
    let report = cli.command.report(&dispatcher, &ctx).await?;
    interrupt.abort();

    if let Some(report) = report {
        std::io::stdout().write_all(report.out.as_bytes())?;
        let mut stderr = std::io::stderr();
        for err in &report.errors {
            writeln!(stderr, "{err}")?;
        }
    }
    Ok(())
}

fn tracing_init(debug: bool) {
    let default = if debug {
        "ddns_srv=debug,tower_http=debug"
    } else {
        "ddns_srv=info,tower_http=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(std::io::stderr().is_terminal()),
        )
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .init();
}

fn config_init(path: &Path) -> Result<Shared> {
    let config = Config::try_from_file(path)
        .with_context(|| format!("loading config from {}", path.display()))?;
    tracing::debug!("loaded config from {}", path.display());
    Ok(Arc::new(config))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!("unable to listen for ctrl-c: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!("unable to listen for SIGTERM: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("quitting from signal");
}
