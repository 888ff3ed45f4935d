use anyhow::Context;
use cdn_redirect::{
    server::{
        config::{Command, Config, Settings},
        router::{create_router, AppState},
    },
    RedirectUrlBuilder,
};
use clap::Parser;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Config::parse();

    // Initialize logging (stderr keeps `sign` output clean)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let settings = Settings::load(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    let redirect = settings
        .cdn
        .validate()
        .context("invalid cdn configuration")?;

    match &cli.command {
        Some(Command::Sign { path }) => {
            let url = RedirectUrlBuilder::new(redirect).build_url(path)?;
            println!("{}", url);
        }
        Some(Command::Serve) | None => {
            let mut state = AppState::new(redirect);

            if let Some(origin) = &cli.origin {
                let parsed = url::Url::parse(origin).context("invalid --origin")?;
                anyhow::ensure!(
                    matches!(parsed.scheme(), "http" | "https"),
                    "--origin must be an http(s) URL"
                );
                state = state.with_origin(origin);
            }

            // Initialize metrics if enabled
            if cli.metrics {
                let handle = metrics_exporter_prometheus::PrometheusBuilder::new()
                    .install_recorder()
                    .context("failed to install Prometheus recorder")?;
                state = state.with_metrics(handle);
            }

            // Create router
            let app = create_router(Arc::new(state));

            // Start server
            let listener = tokio::net::TcpListener::bind(&cli.listen).await?;
            info!("cdn-redirect listening on {}", cli.listen);

            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}
