//! Vitrina CLI - Store inspection and seeding tools.
//!
//! # Usage
//!
//! ```bash
//! # Show the saved store configuration
//! vitrina config show
//!
//! # List products, newest first
//! vitrina products list
//!
//! # Seed configuration and products from a YAML file
//! VITRINA_ADMIN_PASSWORD=... vitrina seed --file catalog.yaml
//!
//! # Check a seed file against an empty in-memory store
//! vitrina seed --file catalog.yaml --memory
//! ```
//!
//! # Commands
//!
//! - `config show` - Print the store configuration
//! - `products list` - Print the product catalog
//! - `seed` - Create or update the store from a catalog file

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "vitrina")]
#[command(author, version, about = "Vitrina store tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone, Copy)]
struct Target {
    /// Run against an empty in-memory backend instead of the hosted one
    #[arg(long)]
    memory: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect the store configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Inspect products
    Products {
        #[command(subcommand)]
        action: ProductsAction,
    },
    /// Seed the store configuration and products from a YAML file
    Seed {
        /// Path to the catalog file
        #[arg(short, long)]
        file: PathBuf,

        #[command(flatten)]
        target: Target,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the saved configuration (or the fallback)
    Show {
        #[command(flatten)]
        target: Target,
    },
}

#[derive(Subcommand)]
enum ProductsAction {
    /// List products, newest first
    List {
        #[command(flatten)]
        target: Target,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Config { action } => match action {
            ConfigAction::Show { target } => commands::config::show(target.memory).await?,
        },
        Commands::Products { action } => match action {
            ProductsAction::List { target } => commands::products::list(target.memory).await?,
        },
        Commands::Seed { file, target } => commands::seed::catalog(&file, target.memory).await?,
    }
    Ok(())
}
