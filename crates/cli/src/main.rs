//! Sci-Fi theme CLI - drive the theme runtime against a live shop.
//!
//! # Usage
//!
//! ```bash
//! # Show the cart
//! scifi-cli cart show
//!
//! # Add two units of a variant
//! scifi-cli cart add 39897499729985 --quantity 2
//!
//! # Move the wishlist into the cart
//! scifi-cli wishlist add-all
//!
//! # Suggestions for a term
//! scifi-cli search nebula
//!
//! # Resolve a variant from option values
//! scifi-cli variant plasma-jacket --option Red --option L
//! ```
//!
//! # Environment Variables
//!
//! - `SHOP_URL` - Base URL of the shop (required)
//! - `THEME_STORAGE_DIR` - Where the wishlist, search history and preferences live
//! - `SENTRY_DSN` - Error reporting (optional)

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use scifi_theme_storefront::{ThemeApp, ThemeConfig};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "scifi-cli")]
#[command(author, version, about = "Sci-Fi theme command-line front end")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect and change the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Manage the wishlist
    Wishlist {
        #[command(subcommand)]
        action: WishlistAction,
    },
    /// Show search suggestions for a term
    Search {
        /// Search term (at least two characters)
        term: String,
    },
    /// Resolve a product variant from option values
    Variant {
        /// Product handle
        handle: String,

        /// Option values in the product's option order
        #[arg(short, long = "option")]
        options: Vec<String>,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show the cart contents
    Show,
    /// Add a variant
    Add {
        /// Variant ID
        variant: i64,

        /// Quantity to add
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Set a line's quantity (0 or less removes it)
    Update {
        /// Line key
        key: String,

        /// New quantity
        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Remove a line
    Remove {
        /// Line key
        key: String,
    },
    /// Remove every line
    Clear,
    /// Apply a discount code
    Discount {
        /// Discount code
        code: String,
    },
}

#[derive(Subcommand)]
enum WishlistAction {
    /// List wishlisted products
    List,
    /// Add a product by handle
    Add {
        /// Product handle
        handle: String,
    },
    /// Remove a product by ID
    Remove {
        /// Product ID
        id: i64,
    },
    /// Add every purchasable product to the cart
    AddAll,
    /// Print a share link
    Share,
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ThemeConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
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
    // Configuration is needed for Sentry, which must start before tracing
    let config = ThemeConfig::from_env();
    let _sentry_guard = config.as_ref().ok().and_then(init_sentry);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "scifi_theme_storefront=info,scifi_theme_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let cli = Cli::parse();

    let result = match config {
        Ok(config) => run(cli, config).await,
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: ThemeConfig) -> Result<(), commands::CommandError> {
    let app = ThemeApp::from_config(config)?;

    match cli.command {
        Commands::Cart { action } => {
            app.init().await;
            match action {
                CartAction::Show => commands::cart::show(&app),
                CartAction::Add { variant, quantity } => {
                    commands::cart::add(&app, variant, quantity).await?;
                }
                CartAction::Update { key, quantity } => {
                    commands::cart::update(&app, &key, quantity).await?;
                }
                CartAction::Remove { key } => commands::cart::remove(&app, &key).await?,
                CartAction::Clear => commands::cart::clear(&app).await?,
                CartAction::Discount { code } => commands::cart::discount(&app, &code).await?,
            }
        }
        Commands::Wishlist { action } => match action {
            WishlistAction::List => commands::wishlist::list(&app),
            WishlistAction::Add { handle } => commands::wishlist::add(&app, &handle).await?,
            WishlistAction::Remove { id } => commands::wishlist::remove(&app, id).await?,
            WishlistAction::AddAll => {
                app.init().await;
                commands::wishlist::add_all(&app).await?;
            }
            WishlistAction::Share => commands::wishlist::share(&app).await?,
        },
        Commands::Search { term } => commands::search::suggest(&app, &term).await,
        Commands::Variant { handle, options } => {
            commands::variant::resolve(&app, &handle, &options).await?;
        }
    }
    Ok(())
}
