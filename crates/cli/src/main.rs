//! Boutique CLI - Browse the catalog and manage the persisted cart.
//!
//! # Usage
//!
//! ```bash
//! # List categories with their subcategories
//! boutique catalog categories
//!
//! # List products, optionally filtered
//! boutique catalog products --category 1
//! boutique catalog products --subcategory 10
//!
//! # Legacy product classification lookup
//! boutique product 42
//!
//! # Cart
//! boutique cart add 42
//! boutique cart remove 42
//! boutique cart location-cost 4.50
//! boutique cart show
//! ```
//!
//! Configuration comes from the environment (see `boutique_storefront::config`).
//! Logs go to stderr; command output goes to stdout.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::process::ExitCode;

use boutique_core::{CategoryId, ProductId, SubcategoryId};
use boutique_storefront::Storefront;
use boutique_storefront::config::BoutiqueConfig;
use boutique_storefront::error::{self, AppError};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Debug, Parser)]
#[command(name = "boutique")]
#[command(author, version, about = "Boutique storefront CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Browse the product catalog
    Catalog {
        #[command(subcommand)]
        action: CatalogAction,
    },
    /// Show a product's category and subcategory (legacy lookup)
    Product {
        /// Product id
        id: ProductId,
    },
    /// Manage the persisted cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
}

#[derive(Debug, Subcommand)]
enum CatalogAction {
    /// List categories and their subcategories
    Categories,
    /// List products
    Products {
        /// Only products in this category (directly or via a subcategory)
        #[arg(short, long)]
        category: Option<CategoryId>,

        /// Only products in this subcategory (wins over --category)
        #[arg(short, long)]
        subcategory: Option<SubcategoryId>,
    },
}

#[derive(Debug, Subcommand)]
enum CartAction {
    /// Show cart contents and totals
    Show,
    /// Add one unit of a product
    Add { id: ProductId },
    /// Remove one unit of a product
    Remove { id: ProductId },
    /// Remove a product's line entirely
    ClearItem { id: ProductId },
    /// Empty the cart and reset the location cost
    Clear,
    /// Set the delivery/location cost
    LocationCost {
        #[arg(allow_negative_numbers = true)]
        amount: Decimal,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &BoutiqueConfig) -> Option<sentry::ClientInitGuard> {
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

/// Install the tracing subscriber. Defaults to info for our crates if
/// `RUST_LOG` is not set.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "boutique_storefront=info,boutique_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match BoutiqueConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            init_tracing();
            AppError::from(e).report();
            return ExitCode::FAILURE;
        }
    };

    // Sentry must be initialized before the tracing subscriber
    let sentry_guard = init_sentry(&config);
    init_tracing();
    if sentry_guard.is_some() {
        tracing::info!("Sentry initialized");
    }

    match run(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            e.report();
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, config: BoutiqueConfig) -> error::Result<()> {
    let mut storefront = Storefront::new(config)?;
    tracing::debug!(
        endpoint = %storefront.config().content.endpoint(),
        data_dir = %storefront.config().data_dir.display(),
        "Storefront ready"
    );

    let output = match cli.command {
        Commands::Catalog { action } => match action {
            CatalogAction::Categories => commands::catalog::categories(&storefront).await?,
            CatalogAction::Products {
                category,
                subcategory,
            } => commands::catalog::products(&storefront, category, subcategory).await?,
        },
        Commands::Product { id } => commands::product::details(&storefront, id).await,
        Commands::Cart { action } => {
            match action {
                CartAction::Show => {}
                CartAction::Add { id } => commands::cart::add(&mut storefront, id).await?,
                CartAction::Remove { id } => storefront.cart_mut().remove_item(id),
                CartAction::ClearItem { id } => storefront.cart_mut().clear_item(id),
                CartAction::Clear => storefront.cart_mut().clear_cart(),
                CartAction::LocationCost { amount } => {
                    storefront.cart_mut().set_location_cost(amount);
                }
            }
            commands::cart::render(storefront.cart().cart())
        }
    };

    commands::emit(&output);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cart_commands() {
        let cli = Cli::try_parse_from(["boutique", "cart", "add", "42"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Cart {
                action: CartAction::Add { id }
            } if id == ProductId::new(42)
        ));

        let cli = Cli::try_parse_from(["boutique", "cart", "location-cost", "-2.5"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Cart {
                action: CartAction::LocationCost { amount }
            } if amount == Decimal::new(-25, 1)
        ));

        let cli = Cli::try_parse_from(["boutique", "cart", "clear-item", "7"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Cart {
                action: CartAction::ClearItem { .. }
            }
        ));
    }

    #[test]
    fn test_parse_catalog_filters() {
        let cli =
            Cli::try_parse_from(["boutique", "catalog", "products", "--category", "3", "-s", "9"])
                .unwrap();
        match cli.command {
            Commands::Catalog {
                action:
                    CatalogAction::Products {
                        category,
                        subcategory,
                    },
            } => {
                assert_eq!(category, Some(CategoryId::new(3)));
                assert_eq!(subcategory, Some(SubcategoryId::new(9)));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_rejects_bad_ids() {
        assert!(Cli::try_parse_from(["boutique", "product", "abc"]).is_err());
        assert!(Cli::try_parse_from(["boutique", "cart", "location-cost", "lots"]).is_err());
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
