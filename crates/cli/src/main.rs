//! Marketstall CLI - drive a storefront from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Load products from a JSON array of drafts
//! marketstall seed catalog.json
//!
//! # Browse
//! marketstall products --category electronics
//! marketstall product show <id>
//!
//! # Shop as a guest, then as a signed-in user
//! marketstall cart add <id>
//! marketstall login -e shopper@example.com -p 'S3cret!pass'
//! marketstall checkout
//! marketstall orders
//! ```
//!
//! Configuration comes from the environment (see `StorefrontConfig`). The
//! guest cart and the signed-in session live in `MARKETSTALL_DATA_DIR`, so
//! they carry over between invocations.

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use marketstall_core::{Category, OrderId, ProductId};
use marketstall_storefront::AppState;
use marketstall_storefront::config::StorefrontConfig;

mod commands;

use commands::CliError;

#[derive(Parser)]
#[command(name = "marketstall")]
#[command(author, version, about = "Marketstall storefront tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create catalog products from a JSON file
    Seed {
        /// JSON array of products (title, image, price, description, category)
        file: PathBuf,
    },
    /// List products, optionally in one category
    Products {
        #[arg(short, long)]
        category: Option<Category>,
    },
    /// Show or remove one product
    Product {
        #[command(subcommand)]
        action: ProductAction,
    },
    /// Inspect or change the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Place an order for everything in the cart
    Checkout,
    /// Create an account and sign in
    Register {
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
    },
    /// Sign in to an existing account
    Login {
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
    },
    /// Sign out
    Logout,
    /// Show who is signed in
    Whoami,
    /// Show or edit the signed-in user's profile
    Profile {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        address: Option<String>,
    },
    /// List orders for a user id (defaults to the signed-in user or guest)
    Orders {
        #[arg(short, long)]
        user: Option<String>,
    },
    /// Show or remove one order
    Order {
        #[command(subcommand)]
        action: OrderAction,
    },
    /// List user profiles
    Users,
}

#[derive(Subcommand)]
enum ProductAction {
    /// Show product details
    Show { id: ProductId },
    /// Delete a product from the catalog
    Delete { id: ProductId },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show cart lines and totals
    Show,
    /// Add one unit of a product
    Add { id: ProductId },
    /// Remove one unit of a product
    Remove { id: ProductId },
}

#[derive(Subcommand)]
enum OrderAction {
    /// Show an order with its lines and buyer
    Show { id: OrderId },
    /// Delete an order
    Delete { id: OrderId },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry.dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry
                .environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::debug!("Sentry initialized");
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

    let config = match StorefrontConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(1);
        }
    };

    let _sentry_guard = init_sentry(&config);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "marketstall_storefront=info,marketstall_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    if let Err(e) = run(cli, config).await {
        e.report();
        eprintln!("{}", e.user_message());
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: StorefrontConfig) -> Result<(), CliError> {
    let app = AppState::from_config(config)?;
    app.start().await?;

    match cli.command {
        Commands::Seed { file } => commands::seed::catalog(&app, &file).await?,
        Commands::Products { category } => commands::catalog::list(&app, category).await?,
        Commands::Product { action } => match action {
            ProductAction::Show { id } => commands::catalog::show(&app, id).await?,
            ProductAction::Delete { id } => commands::catalog::delete(&app, &id).await?,
        },
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(&app).await?,
            CartAction::Add { id } => commands::cart::add(&app, &id).await?,
            CartAction::Remove { id } => commands::cart::remove(&app, &id).await?,
        },
        Commands::Checkout => commands::cart::checkout(&app).await?,
        Commands::Register { email, password } => {
            commands::account::register(&app, &email, &password).await?;
        }
        Commands::Login { email, password } => {
            commands::account::login(&app, &email, &password).await?;
        }
        Commands::Logout => commands::account::logout(&app).await?,
        Commands::Whoami => commands::account::whoami(&app),
        Commands::Profile {
            name,
            phone,
            address,
        } => {
            let edit = commands::account::ProfileEdit {
                name,
                phone,
                address,
            };
            commands::account::profile(&app, edit).await?;
        }
        Commands::Orders { user } => commands::orders::list(&app, user).await?,
        Commands::Order { action } => match action {
            OrderAction::Show { id } => commands::orders::show(&app, id).await?,
            OrderAction::Delete { id } => commands::orders::delete(&app, &id).await?,
        },
        Commands::Users => commands::orders::users(&app).await?,
    }
    Ok(())
}
