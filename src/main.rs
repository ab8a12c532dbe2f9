use clap::Parser;
use kimi_proxy::config::config_search_paths;
use kimi_proxy::logging::{JournalEntry, LogLevel, Stage};
use kimi_proxy::providers::UpstreamPreset;
use kimi_proxy::{build_router, AppState, HttpUpstream, ProxyConfig, SharedLogger};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "kimi-proxy",
    about = "Anthropic Messages API proxy in front of an OpenAI-compatible Kimi K2 endpoint",
    version
)]
struct Cli {
    /// Path to config file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Upstream preset name (overrides config)
    #[arg(long)]
    upstream: Option<String>,

    /// Destination model id (overrides config and preset)
    #[arg(long)]
    model: Option<String>,

    /// Hard cap on max_tokens sent upstream (overrides config)
    #[arg(long)]
    max_tokens_cap: Option<u64>,

    /// Request journal path (JSONL)
    #[arg(long, default_value = "kimi-proxy.log")]
    log_file: PathBuf,

    /// Print config search paths and exit
    #[arg(long)]
    show_config_paths: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kimi_proxy=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if cli.show_config_paths {
        println!("Config search paths:");
        for (i, path) in config_search_paths().iter().enumerate() {
            println!("  {}. {}", i + 1, path.display());
        }
        println!("Upstream presets:");
        for preset in UpstreamPreset::all() {
            println!(
                "  {:<11} {} ({}, ${})",
                preset.name, preset.base_url, preset.model, preset.default_api_key_env
            );
        }
        return Ok(());
    }

    let mut config = ProxyConfig::find_and_load(cli.config.as_deref())?;

    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(upstream) = cli.upstream {
        config.upstream.name = upstream;
    }
    if let Some(model) = cli.model {
        config.upstream.model = Some(model);
    }
    if let Some(cap) = cli.max_tokens_cap {
        config.upstream.max_tokens_cap = cap;
    }

    let logger = SharedLogger::new(&cli.log_file)?;
    let translator = config.translator();

    // Fail fast on an unusable base URL; the credential is checked per request.
    let upstream = HttpUpstream::new(config.clone())?;
    if config.resolve_api_key().is_err() {
        tracing::warn!(
            env_var = %config.api_key_env(),
            "Upstream credential not set; requests will be rejected until it is"
        );
    }

    info!("kimi-proxy v{}", env!("CARGO_PKG_VERSION"));
    info!("  Upstream:  {} ({})", config.upstream.name, upstream.url());
    info!("  Model:     {}", translator.upstream_model);
    info!("  Token cap: {}", translator.max_tokens_cap);
    info!("  Port:      {}", config.port);
    info!("  Journal:   {}", cli.log_file.display());

    logger.record(JournalEntry::new(
        LogLevel::Info,
        Stage::Startup,
        format!(
            "Starting kimi-proxy upstream={} model={} port={}",
            upstream.url(),
            translator.upstream_model,
            config.port
        ),
    ));

    let state = Arc::new(AppState {
        translator,
        upstream: Arc::new(upstream),
        logger,
    });

    let app = build_router(state);
    let bind_addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    info!("Listening on http://{}", bind_addr);
    info!("  ANTHROPIC_BASE_URL=http://localhost:{} claude", config.port);

    axum::serve(listener, app).await?;

    Ok(())
}
