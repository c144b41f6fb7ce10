//! Review Desk CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! rd-cli migrate
//!
//! # Create a user
//! rd-cli user create --profile-name "Karl"
//!
//! # Issue a bearer token for a user
//! rd-cli token issue --profile-name "Karl" --ttl-secs 3600
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `user create` - Create users
//! - `token issue` - Issue bearer tokens

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "rd-cli")]
#[command(author, version, about = "Review Desk CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage users
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Manage bearer tokens
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a new user
    Create {
        /// Profile name the user authenticates as
        #[arg(short, long)]
        profile_name: String,
    },
}

#[derive(Subcommand)]
enum TokenAction {
    /// Issue a bearer token
    Issue {
        /// Profile name the token is issued for
        #[arg(short, long)]
        profile_name: String,

        /// Token lifetime in seconds (default: `REVIEWS_TOKEN_TTL_SECS`)
        #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..))]
        ttl_secs: Option<u64>,
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
        Commands::Migrate => commands::migrate::run().await?,
        Commands::User { action } => match action {
            UserAction::Create { profile_name } => {
                let id = commands::user::create(&profile_name).await?;
                #[allow(clippy::print_stdout)]
                {
                    println!("Created user {profile_name} with id {id}");
                }
            }
        },
        Commands::Token { action } => match action {
            TokenAction::Issue {
                profile_name,
                ttl_secs,
            } => {
                let token = commands::token::issue(&profile_name, ttl_secs)?;
                #[allow(clippy::print_stdout)]
                {
                    println!("{token}");
                }
            }
        },
    }
    Ok(())
}
