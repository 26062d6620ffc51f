//! Threadbot gateway entry point
//!
//! Run with:
//! ```bash
//! cargo run -p threadbot-gateway
//! ```
//!
//! Configuration is loaded from environment variables. Events are logged until Ctrl-C.

use threadbot_common::{try_init_tracing_with_config, AppConfig, AppError, TracingConfig};
use threadbot_gateway::{ClientConfig, DomainEvent, GatewayClient};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            let _ = try_init_tracing_with_config(TracingConfig::default());
            let error = AppError::from(e);
            error!(error = %error, code = error.error_code(), "Failed to load configuration");
            std::process::exit(error.exit_code());
        }
    };

    if let Err(e) = try_init_tracing_with_config(TracingConfig::for_environment(config.app.env)) {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    if let Err(e) = run(&config).await {
        error!(error = %e, code = e.error_code(), "Gateway client failed");
        std::process::exit(e.exit_code());
    }
}

async fn run(config: &AppConfig) -> Result<(), AppError> {
    info!(
        env = ?config.app.env,
        api_base = %config.discord.api_base,
        intents = config.discord.intents,
        "Starting Threadbot gateway client..."
    );

    let mut handle = GatewayClient::new(ClientConfig::from(config)).start();

    loop {
        tokio::select! {
            event = handle.next_event() => match event {
                Some(event) => log_event(&event),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    handle.disconnect().await?;
    info!("Gateway client shut down");
    Ok(())
}

fn log_event(event: &DomainEvent) {
    match event {
        DomainEvent::MessageCreate { sequence, message } => info!(
            seq = ?sequence,
            channel_id = %message.channel_id,
            author = message.author.display_name(),
            bot = message.is_from_bot(),
            "Message received"
        ),
        DomainEvent::InteractionCreate {
            sequence,
            interaction,
        } => info!(
            seq = ?sequence,
            kind = ?interaction.interaction_kind(),
            command = interaction.command_name().unwrap_or("-"),
            "Interaction received"
        ),
        DomainEvent::Dispatch(dispatch) => tracing::debug!(
            seq = ?dispatch.sequence,
            event = %dispatch.event_type,
            "Dispatch received"
        ),
    }
}
