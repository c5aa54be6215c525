//! Arguecase CLI — case-based retrieval for argument graphs.
//!
//! Usage:
//!   arguecase retrieve --request request.json [--taxonomy schemes.yml]

use arguecase::{HashingProvider, RetrievalApi, RetrieveRequest, Taxonomy};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(
    name = "arguecase",
    version,
    about = "Two-stage case-based retrieval engine for argument graphs"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Provider {
    /// Deterministic offline token-hash embeddings
    Hashing,
    /// Bundled fastembed model (requires the `embeddings` build feature)
    Fastembed,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a retrieval request and print the JSON response
    Retrieve {
        /// Path to the JSON retrieval request
        #[arg(long)]
        request: PathBuf,
        /// Path to the scheme taxonomy YAML file
        #[arg(long)]
        taxonomy: Option<PathBuf>,
        /// Embedding provider
        #[arg(long, value_enum, default_value = "hashing")]
        provider: Provider,
        /// Run the structural stage sequentially
        #[arg(long)]
        sequential: bool,
        /// Pretty-print the response
        #[arg(long)]
        pretty: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Retrieve {
            request,
            taxonomy,
            provider,
            sequential,
            pretty,
        } => {
            if let Err(message) = run_retrieve(request, taxonomy, provider, sequential, pretty) {
                eprintln!("error: {}", message);
                std::process::exit(1);
            }
        }
    }
}

fn run_retrieve(
    request_path: PathBuf,
    taxonomy_path: Option<PathBuf>,
    provider: Provider,
    sequential: bool,
    pretty: bool,
) -> Result<(), String> {
    let contents = std::fs::read_to_string(&request_path)
        .map_err(|e| format!("cannot read {}: {}", request_path.display(), e))?;
    let request: RetrieveRequest =
        serde_json::from_str(&contents).map_err(|e| format!("invalid request: {}", e))?;

    let taxonomy = match taxonomy_path {
        Some(path) => Taxonomy::from_path(&path)
            .map_err(|e| format!("cannot load {}: {}", path.display(), e))?,
        None => Taxonomy::empty(),
    };

    let provider = build_provider(provider)?;
    let mut api =
        RetrievalApi::new(provider, Arc::new(taxonomy)).map_err(|e| e.to_string())?;
    if sequential {
        api = api.sequential();
    }

    let response = api.retrieve(&request).map_err(|e| e.to_string())?;
    let output = if pretty {
        serde_json::to_string_pretty(&response)
    } else {
        serde_json::to_string(&response)
    }
    .map_err(|e| e.to_string())?;
    println!("{}", output);
    Ok(())
}

fn build_provider(
    provider: Provider,
) -> Result<Arc<dyn arguecase::EmbeddingProvider>, String> {
    match provider {
        Provider::Hashing => Ok(Arc::new(HashingProvider::new())),
        #[cfg(feature = "embeddings")]
        Provider::Fastembed => Ok(Arc::new(
            arguecase::FastEmbedProvider::default_model().map_err(|e| e.to_string())?,
        )),
        #[cfg(not(feature = "embeddings"))]
        Provider::Fastembed => {
            Err("this binary was built without the `embeddings` feature".to_string())
        }
    }
}
