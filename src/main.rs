use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use audioseek::{MetadataRecord, Segment, Store, StoreConfig};

mod cli;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = cli::Args::parse();

    let mut config = StoreConfig::load_with(&args.data_dir)?;
    if let Some(dimension) = args.dimension {
        config.dimension = dimension;
        config.validate()?;
    }

    match args.command {
        cli::Command::Add {
            vector,
            vector_file,
            text,
            source_path,
            segments_file,
        } => {
            let embedding = read_vector(vector, vector_file)?;

            let segments: Vec<Segment> = match segments_file {
                Some(path) => {
                    let raw = std::fs::read_to_string(&path)
                        .with_context(|| format!("reading {}", path.display()))?;
                    serde_json::from_str(&raw)
                        .with_context(|| format!("parsing segments from {}", path.display()))?
                }
                None => Vec::new(),
            };

            let store = Store::open(&config)?;
            let id = store.add(
                embedding,
                MetadataRecord {
                    text,
                    source_path,
                    segments,
                },
            )?;

            println!("{}", serde_json::json!({ "id": id }));
            Ok(())
        }

        cli::Command::Search {
            vector,
            vector_file,
            k,
        } => {
            let query = read_vector(vector, vector_file)?;
            let k = k.unwrap_or(config.default_k);

            let store = Store::open(&config)?;
            let hits = store.search(&query, k)?;

            println!("{}", serde_json::to_string_pretty(&hits)?);
            Ok(())
        }

        cli::Command::Stats {} => {
            let store = Store::open(&config)?;
            let stats = store.stats()?;

            println!("{}", serde_json::to_string_pretty(&stats)?);
            Ok(())
        }
    }
}

/// Read an embedding from an inline JSON array or a file, exactly one of
/// the two.
fn read_vector(inline: Option<String>, file: Option<PathBuf>) -> anyhow::Result<Vec<f32>> {
    let raw = match (inline, file) {
        (Some(_), Some(_)) => bail!("pass either --vector or --vector-file, not both"),
        (Some(inline), None) => inline,
        (None, Some(path)) => std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?,
        (None, None) => bail!("an embedding is required: pass --vector or --vector-file"),
    };

    let vector: Vec<f32> = serde_json::from_str(&raw).context("parsing embedding JSON array")?;
    Ok(vector)
}
