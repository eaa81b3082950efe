use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Directory holding vectors.bin, metadata.json and config.yaml
    #[clap(long, default_value = "data")]
    pub data_dir: PathBuf,

    /// Override the configured embedding dimension
    #[clap(long)]
    pub dimension: Option<usize>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Add an embedding with its metadata
    Add {
        /// Embedding as a JSON array, e.g. '[0.1, 0.2, 0.3]'
        #[clap(long)]
        vector: Option<String>,

        /// Read the embedding JSON array from a file instead
        #[clap(long)]
        vector_file: Option<PathBuf>,

        /// Descriptive text for the stored vector
        #[clap(short, long, default_value = "")]
        text: String,

        /// Path of the source file the vector was derived from
        #[clap(short, long, default_value = "")]
        source_path: String,

        /// JSON file with time-aligned segments
        /// ([{"start_seconds": .., "end_seconds": .., "text": ".."}])
        #[clap(long)]
        segments_file: Option<PathBuf>,
    },

    /// Search for the nearest stored vectors
    Search {
        /// Query embedding as a JSON array
        #[clap(long)]
        vector: Option<String>,

        /// Read the query embedding JSON array from a file instead
        #[clap(long)]
        vector_file: Option<PathBuf>,

        /// Number of results to return (defaults to the configured value)
        #[clap(short, long)]
        k: Option<usize>,
    },

    /// Print store statistics
    Stats {},
}
