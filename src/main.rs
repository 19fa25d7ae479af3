use anyhow::Context;
use ares_research::{
    AppState, ResearchGraph,
    api::routes::create_router,
    cli::{
        Cli, Commands,
        ask::{self, AskOutcome},
        init::{self, InitConfig, InitResult},
        output::Output,
    },
    utils::toml_config::{AppConfig, LogFormat},
};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();
    let output = if cli.no_color {
        Output::no_color()
    } else {
        Output::new()
    };

    if let Err(e) = run(cli, &output).await {
        output.error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli, output: &Output) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    match cli.command {
        None | Some(Commands::Serve) => {
            let config = load_config(&cli.config)?;
            init_tracing(&config, cli.verbose);
            serve(config).await
        }
        Some(Commands::Ask { query, raw }) => {
            let config = load_config(&cli.config)?;
            init_tracing(&config, cli.verbose);
            let graph = Arc::new(ResearchGraph::from_config(&config).await?);

            match ask::run(graph, &query, raw, output).await? {
                AskOutcome::Completed => Ok(()),
                AskOutcome::Failed(message) => anyhow::bail!(message),
            }
        }
        Some(Commands::Config { validate }) => show_config(&cli.config, validate, output),
        Some(Commands::Init {
            path,
            force,
            host,
            port,
        }) => {
            let result = init::run(
                InitConfig {
                    path,
                    force,
                    host,
                    port,
                },
                output,
            );
            match result {
                InitResult::Success | InitResult::AlreadyExists => Ok(()),
                InitResult::Error(e) => anyhow::bail!(e),
            }
        }
    }
}

fn load_config(path: &Path) -> anyhow::Result<AppConfig> {
    AppConfig::load(path).with_context(|| {
        format!(
            "Failed to load {} (run `ares-research init` to create one)",
            path.display()
        )
    })
}

/// `RUST_LOG` wins over `server.log_level`; `--verbose` bumps the crate to debug
fn init_tracing(config: &AppConfig, verbose: bool) {
    let default_directive = if verbose {
        format!("{},ares_research=debug", config.server.log_level)
    } else {
        config.server.log_level.clone()
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    let registry = tracing_subscriber::registry().with(filter);
    match config.server.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn serve(config: AppConfig) -> anyhow::Result<()> {
    let graph = ResearchGraph::from_config(&config)
        .await
        .context("Failed to build research graph")?;

    let addr = config.bind_address();
    let state = AppState {
        config: Arc::new(config),
        graph: Arc::new(graph),
    };
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("ares-research listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

fn show_config(path: &Path, validate: bool, output: &Output) -> anyhow::Result<()> {
    output.info(&format!("Configuration file: {}", path.display()));

    let config = AppConfig::read(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    output.header("Server");
    output.kv("address", &config.bind_address());
    output.kv("log_level", &config.server.log_level);

    output.header("Providers");
    let mut providers: Vec<_> = config.providers.keys().collect();
    providers.sort();
    for name in providers {
        output.list_item(name);
    }

    output.header("Research");
    for (role, model) in config.research.model_roles() {
        output.kv(role, model);
    }
    output.kv(
        "max_parallel_questions",
        &config.research.max_parallel_questions.to_string(),
    );
    output.kv(
        "retrieval",
        &if config.research.retrieval.enabled {
            format!(
                "enabled ({})",
                config.research.retrieval.documents_dir.display()
            )
        } else {
            "disabled".to_string()
        },
    );
    output.kv(
        "web_search",
        if config.research.web_search.enabled {
            "enabled"
        } else {
            "disabled"
        },
    );

    if validate {
        config.validate()?;
        output.success("Configuration is valid");
    }

    Ok(())
}
