//! Schema Build CLI
//!
//! Loads the dictionary and coverage named by the configuration and writes
//! one relational descriptor or one collection's document schema.

use anyhow::Context;
use clap::Parser;
use dictschema::{BuildConfig, Providers, SchemaBuilder, TargetProfile};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dictschema-build")]
#[command(about = "Compile a dictionary into relational or document schemas")]
struct Cli {
    /// Configuration file (defaults to dictschema.toml lookup)
    #[arg(short, long)]
    config: Option<String>,

    /// Target profile: any, sql, json or bson
    #[arg(short, long, default_value = "sql")]
    profile: String,

    /// Collection name (document profiles only)
    #[arg(short = 'C', long)]
    collection: Option<String>,

    /// Output file (stdout if omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write compact JSON
    #[arg(long)]
    compact: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = BuildConfig::load_from(cli.config.as_deref()).context("loading configuration")?;
    let target: TargetProfile = cli.profile.parse()?;

    let session = Providers::global()
        .session(&config)
        .context("loading dictionary and coverage")?;
    let builder = SchemaBuilder::from_session(&session, &config)?;
    let schema = builder.build(target, cli.collection.as_deref())?;

    let text = if cli.compact {
        serde_json::to_string(&schema)?
    } else {
        serde_json::to_string_pretty(&schema)?
    };

    match &cli.output {
        Some(path) => {
            std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))?;
            info!(path = %path.display(), profile = %target, "Wrote schema");
        }
        None => println!("{}", text),
    }
    Ok(())
}
