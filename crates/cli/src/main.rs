//! Fitroom CLI - Operator tools for the try-on relay and the storefront data store.
//!
//! # Usage
//!
//! ```bash
//! # Run a try-on through the relay
//! fitroom generate -p https://cdn.example/me.jpg -g https://cdn.example/shirt.jpg
//!
//! # List clothing items
//! fitroom products --category clothing --limit 20
//!
//! # Search by name
//! fitroom products --search linen
//!
//! # Show a user's cart with totals
//! FITROOM_ACCESS_TOKEN=... fitroom cart --user 6f1c...
//!
//! # Show a user's past try-ons
//! FITROOM_ACCESS_TOKEN=... fitroom history --user 6f1c...
//!
//! # Style suggestions
//! fitroom stylist --skin-tone wheatish --occasion office
//! ```
//!
//! # Commands
//!
//! - `generate` - Run one try-on and print the stored result URL
//! - `products` - List or search catalog items
//! - `cart` - Show a cart summary (subtotal, shipping, total)
//! - `history` - List a user's try-ons, newest first
//! - `stylist` - Print colors, an outfit idea and a tip

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use fitroom_storefront::datastore::DEFAULT_PAGE_SIZE;

mod commands;

#[derive(Parser)]
#[command(name = "fitroom")]
#[command(author, version, about = "Fitroom CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a virtual try-on through the relay
    Generate {
        /// Public URL of the person photo
        #[arg(short, long)]
        person: String,

        /// Public URL of the garment photo
        #[arg(short, long)]
        garment: String,

        /// Relay base URL (defaults to `RELAY_URL` or <http://localhost:3000>)
        #[arg(short, long)]
        relay: Option<String>,
    },
    /// List catalog items
    Products {
        /// Only items of this category
        #[arg(short, long)]
        category: Option<String>,

        /// Case-insensitive name search (ignores paging and category)
        #[arg(short, long)]
        search: Option<String>,

        /// Page size (1-100)
        #[arg(short, long, default_value_t = DEFAULT_PAGE_SIZE)]
        limit: u32,

        /// Items to skip
        #[arg(short, long, default_value_t = 0)]
        offset: u32,
    },
    /// Show a user's cart
    Cart {
        /// User id whose cart to show
        #[arg(short, long)]
        user: String,
    },
    /// Show a user's try-on history
    History {
        /// User id whose history to show
        #[arg(short, long)]
        user: String,
    },
    /// Suggest colors and an outfit
    Stylist {
        /// Skin tone, e.g. fair, wheatish, deep
        #[arg(short, long, default_value = "medium")]
        skin_tone: String,

        /// Occasion, e.g. casual, office, party, wedding
        #[arg(short, long, default_value = "casual")]
        occasion: String,
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
        Commands::Generate {
            person,
            garment,
            relay,
        } => commands::generate::run(&person, &garment, relay.as_deref()).await?,
        Commands::Products {
            category,
            search,
            limit,
            offset,
        } => commands::products::list(category, search.as_deref(), limit, offset).await?,
        Commands::Cart { user } => commands::cart::show(&user).await?,
        Commands::History { user } => commands::history::show(&user).await?,
        Commands::Stylist {
            skin_tone,
            occasion,
        } => commands::stylist::suggest(&skin_tone, &occasion),
    }
    Ok(())
}
