use clap::Parser;
use sms_dispatch::adapters::http::{create_router, AppState};
use sms_dispatch::core::ConfigProvider;
use sms_dispatch::utils::error::ErrorSeverity;
use sms_dispatch::utils::monitor::ProcessMonitor;
use sms_dispatch::utils::{logger, validation::Validate};
use sms_dispatch::{CliConfig, CommandGateway, DispatchEngine, DispatchError};
use std::sync::Arc;

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    if let Err(e) = run(cli).await {
        tracing::error!(
            "❌ sms-dispatch failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

        let exit_code = match e.severity() {
            ErrorSeverity::Low | ErrorSeverity::High => 1,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::Critical => 3,
        };
        std::process::exit(exit_code);
    }
}

async fn run(cli: CliConfig) -> Result<(), DispatchError> {
    let config = cli.load()?;

    // 初始化日誌
    logger::init_logger(config.logging.verbose, config.logging.json);
    tracing::info!("Starting sms-dispatch");
    tracing::debug!("Resolved config: {:?}", config);

    config.validate()?;

    let gateway = Arc::new(CommandGateway::new(
        config.send_command(),
        config.send_args().to_vec(),
    ));
    let engine = DispatchEngine::from_config(&config, gateway);

    tracing::info!(
        pool_size = engine.pool().size(),
        queue_depth = config.queue_depth(),
        batch_workers = config.default_batch_workers(),
        timeout = ?engine.send_timeout(),
        command = %config.send_command(),
        "Dispatch engine ready"
    );
    if config.logging.monitor {
        tracing::info!("🔍 Process monitoring enabled");
    }

    let state = AppState::new(engine.clone(), config.default_batch_workers())
        .with_monitor(ProcessMonitor::new(config.logging.monitor));
    let app = create_router(state);

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!("🚀 Listening on {}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(engine))
        .await?;

    tracing::info!("sms-dispatch stopped");
    Ok(())
}

async fn shutdown_signal(engine: DispatchEngine) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    tracing::info!("Shutdown signal received");
    engine.shutdown();
}
