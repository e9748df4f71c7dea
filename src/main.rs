use anyhow::Context;
use deepdive::{
    AppState, ConfigManager, DeepdiveConfig, ResearchCoordinator,
    cli::{Cli, Commands, init, output::Output, run},
    utils::toml_config::{LogFormat, ServerConfig},
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine; variables may come from the real environment
    dotenvy::dotenv().ok();

    let cli = Cli::parse_args();
    let output = if cli.no_color {
        Output::no_color()
    } else {
        Output::new()
    };

    match cli.command {
        Some(Commands::Init {
            path,
            force,
            host,
            port,
        }) => {
            let config = init::InitConfig {
                path,
                force,
                host,
                port,
            };
            match init::run(config, &output) {
                init::InitResult::Success | init::InitResult::AlreadyExists => Ok(()),
                init::InitResult::Error(e) => anyhow::bail!(e),
            }
        }
        Some(Commands::Config { validate }) => show_config(&cli.config, validate, &output),
        Some(Commands::Run {
            query,
            output: report_path,
            workers,
        }) => run_query(&cli.config, &query, report_path, workers, cli.verbose, output).await,
        Some(Commands::Serve) | None => serve(&cli.config, cli.verbose).await,
    }
}

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
fn init_tracing(server: &ServerConfig, verbose: bool, default_level: Option<&str>) {
    let level = if verbose {
        "debug"
    } else {
        default_level.unwrap_or(server.log_level.as_str())
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},tower_http=info", level)));

    let registry = tracing_subscriber::registry().with(filter);
    match server.log_format {
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(fmt::layer()).init(),
    }
}

fn load_config(path: &Path) -> anyhow::Result<DeepdiveConfig> {
    let mut config = DeepdiveConfig::load_or_default(path)
        .with_context(|| format!("Failed to load {}", path.display()))?;
    config.apply_env_overrides()?;
    Ok(config)
}

async fn serve(config_path: &Path, verbose: bool) -> anyhow::Result<()> {
    let config_manager = Arc::new(
        ConfigManager::new(config_path)
            .with_context(|| format!("Failed to load {}", config_path.display()))?,
    );
    let config = config_manager.config();
    init_tracing(&config.server, verbose, None);

    // Both provider keys are required before anything is served
    let credentials = config
        .credentials()
        .context("Provider credentials are missing")?;

    let coordinator = Arc::new(ResearchCoordinator::from_config(&config, &credentials)?);
    tracing::info!(
        model = %config.llm.model,
        workers = config.report.max_workers,
        "Research pipeline ready"
    );

    let state = AppState::new(Arc::clone(&config_manager), coordinator);
    #[cfg(unix)]
    tokio::spawn(reload_on_hangup(state.clone()));
    let app = deepdive::api::routes::app(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("deepdive listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Rebuild the pipeline from the config file on every SIGHUP
#[cfg(unix)]
async fn reload_on_hangup(state: AppState) {
    use tokio::signal::unix::{SignalKind, signal};

    let mut hangup = match signal(SignalKind::hangup()) {
        Ok(hangup) => hangup,
        Err(e) => {
            tracing::warn!("Config reload on SIGHUP unavailable: {}", e);
            return;
        }
    };

    while hangup.recv().await.is_some() {
        if let Err(e) = state.reload() {
            tracing::error!("Config reload failed, keeping current pipeline: {}", e);
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}

async fn run_query(
    config_path: &Path,
    query: &str,
    report_path: Option<PathBuf>,
    workers: Option<usize>,
    verbose: bool,
    output: Output,
) -> anyhow::Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(workers) = workers {
        config.report.max_workers = workers.max(1);
    }
    init_tracing(&config.server, verbose, Some("warn"));

    let credentials = config
        .credentials()
        .context("Provider credentials are missing")?;
    let coordinator = ResearchCoordinator::from_config(&config, &credentials)?;

    output.banner();
    output.header(&format!("Researching: {}", query));
    output.newline();

    let outcome =
        match run::execute(&coordinator, query, config.report.event_log_capacity, output).await {
            Ok(outcome) => outcome,
            Err(e) => {
                output.error(&format!("Research failed: {}", e));
                return Err(e.into());
            }
        };

    output.subheader("Sections");
    for section in &outcome.report.sections {
        output.section(section);
    }
    output.report_status(outcome.report.status);

    let path = run::output_path(report_path, &outcome.document.file_name());
    run::write_report(&path, &outcome.document.markdown)?;
    output.complete(&format!("Report written to {}", path.display()));

    Ok(())
}

fn show_config(config_path: &Path, validate: bool, output: &Output) -> anyhow::Result<()> {
    let config = load_config(config_path)?;

    output.header("Configuration");
    output.kv(
        "file",
        &if config_path.exists() {
            config_path.display().to_string()
        } else {
            format!("{} (not found, using defaults)", config_path.display())
        },
    );

    output.subheader("Server");
    output.kv("address", &format!("{}:{}", config.server.host, config.server.port));
    output.kv("log level", &config.server.log_level);
    output.kv("retained runs", &config.server.max_retained_runs.to_string());

    output.subheader("LLM");
    output.kv("provider", &format!("{:?}", config.llm.provider));
    output.kv("model", &config.llm.model);
    output.kv("api base", config.llm.api_base());
    output.kv("key variable", config.llm.api_key_env());
    output.kv(
        "timeout",
        &match config.llm.timeout() {
            Some(timeout) => format!("{}s", timeout.as_secs()),
            None => "none".to_string(),
        },
    );

    output.subheader("Search");
    output.kv("base url", &config.search.base_url);
    output.kv("max results", &config.search.max_results.to_string());
    output.kv("key variable", &config.search.api_key_env);

    output.subheader("Report");
    output.kv("workers", &config.report.max_workers.to_string());
    output.kv(
        "section timeout",
        &match config.report.section_timeout() {
            Some(timeout) => format!("{}s", timeout.as_secs()),
            None => "none".to_string(),
        },
    );
    output.kv("event log capacity", &config.report.event_log_capacity.to_string());

    if validate {
        output.newline();
        match config.credentials() {
            Ok(_) => output.success("Configuration is valid and provider keys are set"),
            Err(e) => {
                output.error(&e.to_string());
                anyhow::bail!(e);
            }
        }
    }

    Ok(())
}
