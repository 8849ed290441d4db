//! Autoparts CLI - storefront and back office from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Sign in (the session is persisted between runs)
//! parts-cli login -e driver@example.com
//!
//! # Browse and buy
//! parts-cli products --search brake
//! parts-cli cart add 42 -q 2
//! parts-cli checkout
//!
//! # Back office (admin accounts only)
//! parts-cli admin stats
//! parts-cli admin create --name "Brake Pad" --price 19.99 --stock 40 --image pad.jpg
//! ```
//!
//! # Environment Variables
//!
//! - `AUTOPARTS_API_URL` - REST API base URL (default: <http://localhost:8080>)
//! - `AUTOPARTS_SESSION_FILE` - Where the session is persisted
//! - `AUTOPARTS_PASSWORD` - Password for `login`/`register` when `-p` is omitted
//! - `SENTRY_DSN` - Enables error reporting when set

#![cfg_attr(not(test), forbid(unsafe_code))]

use autoparts_storefront::StorefrontContext;
use autoparts_storefront::config::ClientConfig;
use autoparts_storefront::gateway::SessionEvent;
use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "parts-cli")]
#[command(author, version, about = "Autoparts storefront CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and persist the session
    Login {
        #[arg(short, long)]
        email: String,

        #[arg(short, long, env = "AUTOPARTS_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account
    Register {
        #[arg(short, long)]
        email: String,

        #[arg(short, long, env = "AUTOPARTS_PASSWORD", hide_env_values = true)]
        password: String,

        #[arg(long)]
        first_name: Option<String>,

        #[arg(long)]
        last_name: Option<String>,

        #[arg(long)]
        phone: Option<String>,
    },
    /// Sign out and forget the persisted session
    Logout,
    /// Show the signed-in account
    Whoami,
    /// List products
    Products {
        /// Match name or category (case-insensitive)
        #[arg(short, long)]
        search: Option<String>,

        /// Exact category (case-insensitive)
        #[arg(short, long)]
        category: Option<String>,
    },
    /// List product categories
    Categories,
    /// Show one product
    Product { id: i64 },
    /// Show or change the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Place an order for the cart
    Checkout {
        #[arg(long)]
        shipping_address: Option<String>,

        #[arg(long)]
        payment_method: Option<String>,

        #[arg(long)]
        notes: Option<String>,
    },
    /// Show order history
    Orders,
    /// Back-office commands
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show cart contents and totals
    Show,
    /// Add a product to the cart
    Add {
        product_id: i64,

        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Dashboard statistics
    Stats,
    /// All orders
    Orders,
    /// Create a product
    Create {
        #[command(flatten)]
        fields: commands::admin::ProductFields,
    },
    /// Update a product; omitted fields keep their current value
    Update {
        id: i64,

        #[command(flatten)]
        fields: commands::admin::ProductFields,
    },
    /// Delete a product
    Delete { id: i64 },
    /// Upload a product image
    UploadImage { id: i64, path: std::path::PathBuf },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry() -> Option<sentry::ClientInitGuard> {
    let dsn = std::env::var("SENTRY_DSN").ok().filter(|d| !d.is_empty())?;

    let guard = sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
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
    // Load .env before reading SENTRY_DSN
    let _ = dotenvy::dotenv();

    let _sentry_guard = init_sentry();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "autoparts_cli=info,autoparts_storefront=info,autoparts_admin=info".into()
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = ClientConfig::from_env()?;
    let ctx = StorefrontContext::new(config)?;
    let mut events = ctx.gateway().subscribe();

    let result = dispatch(&ctx, cli.command).await;

    if let Ok(SessionEvent::LoginRequired { login_path }) = events.try_recv() {
        commands::account::print_login_hint(login_path);
    }
    result
}

async fn dispatch(ctx: &StorefrontContext, command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Login { email, password } => {
            commands::account::login(ctx, &email, password).await?;
        }
        Commands::Register {
            email,
            password,
            first_name,
            last_name,
            phone,
        } => {
            commands::account::register(ctx, email, password, first_name, last_name, phone).await?;
        }
        Commands::Logout => commands::account::logout(ctx),
        Commands::Whoami => commands::account::whoami(ctx),
        Commands::Products { search, category } => {
            commands::shop::products(ctx, search, category).await?;
        }
        Commands::Categories => commands::shop::categories(ctx).await?,
        Commands::Product { id } => commands::shop::product(ctx, id).await?,
        Commands::Cart { action } => match action {
            CartAction::Show => commands::shop::show_cart(ctx).await,
            CartAction::Add {
                product_id,
                quantity,
            } => commands::shop::add_to_cart(ctx, product_id, quantity).await?,
        },
        Commands::Checkout {
            shipping_address,
            payment_method,
            notes,
        } => {
            commands::shop::checkout(ctx, shipping_address, payment_method, notes).await?;
        }
        Commands::Orders => commands::shop::orders(ctx).await?,
        Commands::Admin { action } => {
            let admin = autoparts_admin::AdminClient::new(ctx.clone());
            match action {
                AdminAction::Stats => commands::admin::stats(&admin).await?,
                AdminAction::Orders => commands::admin::orders(&admin).await?,
                AdminAction::Create { fields } => commands::admin::create(&admin, fields).await?,
                AdminAction::Update { id, fields } => {
                    commands::admin::update(&admin, id, fields).await?;
                }
                AdminAction::Delete { id } => commands::admin::delete(&admin, id).await?,
                AdminAction::UploadImage { id, path } => {
                    commands::admin::upload_image(&admin, id, &path).await?;
                }
            }
        }
    }
    Ok(())
}
