//! RocketShoes CLI - Inspect and edit the persisted cart.
//!
//! # Usage
//!
//! ```bash
//! # Show the cart
//! rs-cart show
//!
//! # Show the cart as JSON
//! rs-cart show --json
//!
//! # Add one unit of product 3
//! rs-cart add 3
//!
//! # Set product 3 to exactly 2 units
//! rs-cart update 3 2
//!
//! # Remove product 3
//! rs-cart remove 3
//! ```
//!
//! # Commands
//!
//! - `show` - Print the current cart
//! - `add` - Add one unit of a product (stock-checked after the first unit)
//! - `remove` - Remove a product's line
//! - `update` - Set a product's quantity (stock-checked; zero or less is ignored)
//!
//! Configuration is read from the environment (see `rocketshoes_cart::config`).

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use clap::{Parser, Subcommand};
use rocketshoes_cart::notifier::TracingNotifier;
use rocketshoes_cart::{CartConfig, CartEngine, CartError};
use rocketshoes_core::ProductId;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "rs-cart")]
#[command(author, version, about = "RocketShoes cart tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the current cart
    Show {
        /// Print the stored JSON representation
        #[arg(long)]
        json: bool,
    },
    /// Add one unit of a product
    Add {
        /// Catalog product ID
        product_id: ProductId,
    },
    /// Remove a product from the cart
    Remove {
        /// Catalog product ID
        product_id: ProductId,
    },
    /// Set a product's quantity
    Update {
        /// Catalog product ID
        product_id: ProductId,

        /// New quantity (zero or less is ignored)
        #[arg(allow_negative_numbers = true)]
        amount: i64,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &CartConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load configuration from environment (needed for Sentry init)
    let config = CartConfig::from_env().expect("Failed to load configuration");

    // Initialize Sentry (must be done before tracing subscriber)
    let sentry_guard = init_sentry(&config);

    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "rocketshoes_cart=info,rocketshoes_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    if sentry_guard.is_some() {
        tracing::info!("Sentry initialized");
    }

    let engine = CartEngine::from_config(&config, Arc::new(TracingNotifier))
        .expect("Failed to initialize cart engine");

    let exit_code = match run(cli, &engine).await {
        Ok(()) => 0,
        Err(e) => {
            // Cart errors were already logged and surfaced by the engine
            if e.downcast_ref::<CartError>().is_none() {
                tracing::error!("Command failed: {e}");
            }
            1
        }
    };

    // Flush pending Sentry events before exiting
    drop(sentry_guard);
    std::process::exit(exit_code);
}

async fn run(cli: Cli, engine: &CartEngine) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Show { json } => commands::cart::show(engine, json)?,
        Commands::Add { product_id } => commands::cart::add(engine, product_id).await?,
        Commands::Remove { product_id } => commands::cart::remove(engine, product_id).await?,
        Commands::Update { product_id, amount } => {
            commands::cart::update(engine, product_id, amount).await?;
        }
    }
    Ok(())
}
