mod responder;
mod webhook;

use clap::{Parser, Subcommand};
use mbote_channels::WhatsAppChannel;
use mbote_core::{
    config,
    message::OutboundRequest,
    traits::{DeliveryChannel, Provider, RecordStore},
};
use mbote_memory::Store;
use mbote_providers::OpenAiProvider;
use std::sync::Arc;
use tracing::warn;

#[derive(Parser)]
#[command(
    name = "mbote",
    version,
    about = "Mbote — WhatsApp education assistant service"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file.
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the webhook service.
    Start,
    /// Check configuration, provider, and store health.
    Status,
    /// Send a message to one or more numbers through the delivery channel.
    Send {
        /// Recipient phone number (repeatable).
        #[arg(long = "to", required = true)]
        to: Vec<String>,
        /// The message to send.
        #[arg(trailing_var_arg = true, required = true)]
        message: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match cli.command {
        Commands::Start => {
            let cfg = config::load(&cli.config)?;

            let store = Store::new(&cfg.memory).await?;
            store.seed_config(&cfg.whatsapp).await?;
            let store: Arc<dyn RecordStore> = Arc::new(store);

            let provider = OpenAiProvider::from_config(&cfg.provider)?;
            if !provider.is_available().await {
                // The responder degrades to the fallback reply, so a dark
                // LLM is a warning rather than a startup failure.
                warn!("LLM provider is not reachable; replies will use the fallback text");
            }
            let responder = Arc::new(responder::Responder::new(
                Arc::new(provider),
                cfg.bot.fallback_reply.clone(),
            ));

            let channel: Arc<dyn DeliveryChannel> = Arc::new(WhatsAppChannel::new(
                &cfg.whatsapp,
                &cfg.bot.default_country_prefix,
                store.clone(),
            )?);

            println!("{} — starting webhook service...", cfg.bot.name);
            let state = webhook::AppState {
                store,
                responder,
                channel,
                default_country_prefix: cfg.bot.default_country_prefix.clone(),
                verify_token: cfg.server.verify_token.clone(),
            };
            webhook::serve(&cfg.server, state).await?;
        }
        Commands::Status => {
            let cfg = config::load(&cli.config)?;
            println!("Mbote — Status Check\n");
            println!("Config: {}", cli.config);
            println!("Model: {} ({})", cfg.provider.model, cfg.provider.base_url);
            println!();

            let provider = OpenAiProvider::from_config(&cfg.provider)?;
            println!(
                "  openai: {}",
                if provider.is_available().await {
                    "available"
                } else {
                    "not reachable"
                }
            );

            match Store::new(&cfg.memory).await {
                Ok(store) => {
                    println!("  store: ok ({})", cfg.memory.db_path);
                    store.seed_config(&cfg.whatsapp).await?;
                    match store.resolve_config(None).await {
                        Ok(config) => println!(
                            "  whatsapp: active credentials (phone number id {})",
                            config.phone_number_id
                        ),
                        Err(mbote_core::error::MboteError::NoActiveConfig) => {
                            println!("  whatsapp: no active credentials")
                        }
                        Err(e) => println!("  whatsapp: error ({e})"),
                    }
                }
                Err(e) => println!("  store: error ({e})"),
            }
        }
        Commands::Send { to, message } => {
            let text = message.join(" ");
            let cfg = config::load(&cli.config)?;

            let store = Store::new(&cfg.memory).await?;
            store.seed_config(&cfg.whatsapp).await?;
            let config = store.resolve_config(None).await?;
            let store: Arc<dyn RecordStore> = Arc::new(store);

            let channel = WhatsAppChannel::new(
                &cfg.whatsapp,
                &cfg.bot.default_country_prefix,
                store,
            )?;

            let batch: Vec<OutboundRequest> = to
                .iter()
                .map(|recipient| OutboundRequest {
                    to: recipient.clone(),
                    message: text.clone(),
                    variables: None,
                    media: None,
                })
                .collect();

            let results = channel.send_many(&batch, &config).await;
            let mut failures = 0;
            for result in &results {
                if result.success {
                    println!(
                        "  {} sent ({})",
                        result.to,
                        result.provider_message_id.as_deref().unwrap_or("-")
                    );
                } else {
                    failures += 1;
                    println!(
                        "  {} failed: {}",
                        result.to,
                        result.error.as_deref().unwrap_or("unknown error")
                    );
                }
            }
            if failures > 0 {
                anyhow::bail!("{failures}/{} messages failed", results.len());
            }
        }
    }

    Ok(())
}
