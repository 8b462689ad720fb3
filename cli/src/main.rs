//! `designer` - command-line front end for the system design service.
//!
//! Each invocation builds one generation session and one history store,
//! drives them through the gateway, and renders the result to stdout.

mod render;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use shared::{
    build_revision, Config, DesignBackend, DesignDocument, Gateway, GenerationSession, HistoryStore, ValidationError,
};
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "designer", version, about = "Generate and browse AI-assisted system designs")]
struct Cli {
    /// Base URL of the design service (overrides DESIGNER_API_BASE_URL)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Request timeout in seconds (overrides DESIGNER_REQUEST_TIMEOUT_SECS)
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    /// Print raw JSON instead of formatted text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate a new design
    Generate {
        /// Free-text description of the system
        #[arg(long, required_unless_present = "requirements_file")]
        requirements: Option<String>,

        /// Read requirements from a file
        #[arg(long, conflicts_with = "requirements")]
        requirements_file: Option<PathBuf>,

        /// Assumptions as a JSON object, e.g. '{"users": "10k", "region": "US"}'
        #[arg(long, default_value = "")]
        assumptions: String,

        /// Comma-separated constraints
        #[arg(long, default_value = "")]
        constraints: String,
    },
    /// Produce a new version of an existing design
    Revise {
        id: String,

        /// Changes to apply to the design
        #[arg(long)]
        edits: String,
    },
    /// List stored designs, newest first
    History,
    /// Show one design
    Show { id: String },
    /// Show the version chain leading to a design
    Lineage { id: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Command failed: {:#}", e);
            match e.downcast_ref::<shared::Error>() {
                Some(shared::Error::Validation(v)) => report_validation(v),
                _ => eprintln!("Error: {:#}", e),
            }
            ExitCode::FAILURE
        }
    }
}

fn report_validation(err: &ValidationError) {
    eprintln!("Invalid {}: {}", err.field(), err);
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::from_env()?;
    if let Some(url) = &cli.base_url {
        config = config.with_base_url(url)?;
    }
    if let Some(secs) = cli.timeout_secs {
        config = config.with_timeout_secs(secs)?;
    }
    Ok(config)
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    let gateway = Gateway::new(config)?;

    match &cli.command {
        Command::Generate {
            requirements,
            requirements_file,
            assumptions,
            constraints,
        } => {
            let requirements = match requirements_file {
                Some(path) => std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read {}", path.display()))?,
                None => requirements.clone().unwrap_or_default(),
            };

            let mut session = GenerationSession::new();
            let document = session
                .submit_form(&gateway, &requirements, assumptions, constraints)
                .await?;
            print_document(cli.json, &document)
        }
        Command::Revise { id, edits } => {
            let revision = build_revision(id, edits).map_err(shared::Error::from)?;

            let mut session = GenerationSession::new();
            let document = session
                .submit(&gateway, revision.into())
                .await
                .map_err(shared::Error::from)?;
            print_document(cli.json, &document)
        }
        Command::History => {
            let mut store = HistoryStore::new();
            let designs = store.refresh(&gateway).await.map_err(shared::Error::from)?;
            if cli.json {
                let documents: Vec<&DesignDocument> = designs.iter().map(|d| &**d).collect();
                print_json(&documents)
            } else {
                print!("{}", render::history(designs));
                Ok(())
            }
        }
        Command::Show { id } => {
            let document = gateway.fetch_design(id).await.map_err(shared::Error::from)?;
            let mut session = GenerationSession::new();
            session.select_document(document);
            match session.current() {
                Some(current) => print_document(cli.json, current),
                None => Ok(()),
            }
        }
        Command::Lineage { id } => {
            let mut store = HistoryStore::new();
            store.refresh(&gateway).await.map_err(shared::Error::from)?;
            let chain = store.lineage(id).map_err(shared::Error::from)?;
            if cli.json {
                let documents: Vec<&DesignDocument> = chain.iter().map(|d| &***d).collect();
                print_json(&documents)
            } else {
                print!("{}", render::lineage(&chain));
                Ok(())
            }
        }
    }
}

fn print_document(json: bool, document: &DesignDocument) -> Result<()> {
    if json {
        print_json(document)
    } else {
        print!("{}", render::document(document));
        Ok(())
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
