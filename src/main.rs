//! `bookmark` CLI - Find the cheapest copy of a book

mod cmd;

use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use bookmark::{Condition, Filters, Isbn, Medium};

#[derive(Parser)]
#[command(name = "bookmark")]
#[command(about = "Find the cheapest copy of a book across retailers")]
#[command(version)]
struct Cli {
    /// More log output on stderr (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Config file (default: ~/.config/bookmark/config.toml)
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for search results.
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON for scripting
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Find the cheapest offer for an ISBN
    Find {
        /// ISBN-10 or ISBN-13 (hyphens allowed)
        isbn: Isbn,

        /// Only accept offers in this condition (new, used)
        #[arg(long)]
        condition: Option<Condition>,

        /// Only accept offers in this medium (physical, ebook, interactive)
        #[arg(long)]
        medium: Option<Medium>,

        /// Show every retailer's outcome, not just the cheapest
        #[arg(short, long)]
        all: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value_t)]
        format: OutputFormat,
    },

    /// Look up a title and price each matching edition
    Search {
        /// Title or free-text query
        title: String,

        /// Maximum catalogue matches to price
        #[arg(short = 'n', long, default_value = "5", value_parser = clap::value_parser!(u16).range(1..=40))]
        max_results: u16,

        /// Output format
        #[arg(short, long, value_enum, default_value_t)]
        format: OutputFormat,
    },

    /// List registered retailers
    Retailers,

    /// Run retailers against their self-test ISBNs
    Selftest {
        /// Only test this retailer
        retailer: Option<String>,
    },
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("bookmark=info,warn"),
        _ => EnvFilter::new("bookmark=debug,warn"),
    };
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let ctx = cmd::Context::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Find {
            isbn,
            condition,
            medium,
            all,
            format,
        } => {
            let filters = Filters::new(condition, medium);
            if all {
                cmd::cmd_survey(&ctx, &isbn, &filters, format).await?;
            } else {
                cmd::cmd_find(&ctx, &isbn, &filters, format).await?;
            }
        }
        Commands::Search {
            title,
            max_results,
            format,
        } => {
            cmd::cmd_search(&ctx, &title, usize::from(max_results), format).await?;
        }
        Commands::Retailers => {
            cmd::cmd_retailers(&ctx);
        }
        Commands::Selftest { retailer } => {
            if !cmd::cmd_selftest(&ctx, retailer.as_deref()).await? {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
