//! MSgrocery CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! msgrocery-cli migrate
//!
//! # Seed the built-in sample catalog
//! msgrocery-cli seed
//!
//! # Seed a catalog from a JSON file under a specific seller
//! msgrocery-cli seed --file catalog.json --seller user_2abc
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `seed` - Insert a sample product catalog

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "msgrocery-cli")]
#[command(author, version, about = "MSgrocery CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run storefront database migrations
    Migrate,
    /// Seed the product catalog
    Seed {
        /// JSON catalog file (defaults to a built-in sample)
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Identity of the seller the products are listed under
        #[arg(short, long, default_value = "user_seed_seller")]
        seller: String,

        /// Email of the seller account
        #[arg(short, long, default_value = "seller@msgrocery.test")]
        email: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::storefront().await?,
        Commands::Seed {
            file,
            seller,
            email,
        } => commands::seed::catalog(file.as_deref(), &seller, &email).await?,
    }
    Ok(())
}
