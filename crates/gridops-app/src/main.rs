mod bootstrap;
mod cli;
mod repl;

use std::process::ExitCode;

use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env before anything reads the environment
    let dotenv = dotenvy::dotenv();

    let args = cli::parse();

    // Config comes before logging so its level can seed the filter
    let config = gridops_config::load_config(args.config.as_deref());

    let default_directive = config
        .as_ref()
        .map(|c| c.logging.level.directive())
        .unwrap_or_else(|_| "gridops=info".to_string());
    let log_directive = args.log_level.clone().unwrap_or(default_directive);
    let directive: Result<Directive, _> = log_directive
        .parse()
        .or_else(|_| "gridops=info".parse());
    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = directive {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!("GridOps v{} starting...", env!("CARGO_PKG_VERSION"));
    if let Ok(path) = &dotenv {
        tracing::debug!("loaded environment from {}", path.display());
    }

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("failed to load config: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut runtime = match bootstrap::start(&args, &config).await {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!("startup failed: {e}");
            return ExitCode::FAILURE;
        }
    };

    let outcome = repl::run(&mut runtime.session).await;
    runtime.bridge.disconnect().await;

    match outcome {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("operator loop failed: {e}");
            ExitCode::FAILURE
        }
    }
}
