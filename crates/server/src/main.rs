//! Runs the chat relay against an OpenAI-compatible completion service.

#[macro_use]
extern crate tracing;

use std::future::pending;
use std::io;
use std::process::ExitCode;

use clap::Parser;
use fitchat_core::Relay;
use fitchat_openai_model::OpenAIProvider;
use fitchat_server::{AppState, ServerArgs, http};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = ServerArgs::parse();

    let config = args.openai_config();
    info!("using completion service: {config:?}");
    let mut relay = Relay::new(OpenAIProvider::new(config));
    match args.load_system_prompt() {
        Ok(Some(prompt)) => relay = relay.with_system_prompt(prompt),
        Ok(None) => {}
        Err(err) => {
            error!("failed to read the system prompt file: {err}");
            return ExitCode::FAILURE;
        }
    }

    let app = http::router(AppState::new(relay));

    let listener = match tokio::net::TcpListener::bind(&args.http_addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!("failed to bind {}: {err}", args.http_addr);
            return ExitCode::FAILURE;
        }
    };
    info!("listening on {}", args.http_addr);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown(tokio::signal::ctrl_c()))
        .await;
    if let Err(err) = served {
        error!("http server crashed: {err}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

/// Resolves when the signal fires. If the signal can't be listened for,
/// the server keeps running until it's killed.
async fn wait_for_shutdown<F>(signal: F)
where
    F: Future<Output = io::Result<()>>,
{
    match signal.await {
        Ok(()) => info!("shutting down"),
        Err(err) => {
            error!("failed to listen for the shutdown signal: {err}");
            pending::<()>().await;
        }
    }
}
