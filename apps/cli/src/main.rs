use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use dotenv::dotenv;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::{App, Commands};
use shared_config::AppConfig;
use shared_models::error::AppError;
use shared_utils::ViewScope;

#[derive(Parser)]
#[command(name = "hospital")]
#[command(about = "Book and manage hospital appointments")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Loading Env Vars
    dotenv().ok();

    // Logs go to stderr so command output stays clean.
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env();

    let app = match App::new(config) {
        Ok(app) => app,
        Err(e) => {
            error!("Startup failed: {:#}", e);
            report(&e);
            return ExitCode::FAILURE;
        }
    };

    // One view per command. Ctrl-C tears it down and discards late results.
    let scope = Arc::new(ViewScope::new(cli.command.view_name()));
    let closer = Arc::clone(&scope);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, closing view {}", closer.name());
            closer.close();
        }
    });

    match app.run(cli.command, &scope).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report(&e);
            ExitCode::FAILURE
        }
    }
}

fn report(err: &anyhow::Error) {
    match err.downcast_ref::<AppError>() {
        Some(app_err) if app_err.requires_login() => {
            eprintln!("{}", app_err.user_message());
            eprintln!("Run `hospital login <email-or-mobile>` to sign in.");
        }
        Some(app_err) => eprintln!("{}", app_err.user_message()),
        None => eprintln!("Error: {:#}", err),
    }
}
