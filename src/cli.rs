use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "sublex",
    about = "Sublex - subtitle vocabulary indexing and unknown-word detection"
)]
pub struct Cli {
    /// Path to the JSON store file
    #[arg(long, default_value = "sublex_store.json")]
    pub store: PathBuf,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Ingest an SRT subtitle file and index it under a video id
    Ingest {
        /// Video identity the segments belong to
        #[arg(long)]
        video: String,

        /// Subtitle file (.srt)
        file: PathBuf,
    },

    /// Print the ranked unknown words for an indexed video
    Report {
        #[arg(long)]
        video: String,

        /// Maximum number of words to print
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Manage the known-word set
    Known {
        #[command(subcommand)]
        action: KnownAction,
    },

    /// Store the annotation service API key
    SetApiKey {
        api_key: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum KnownAction {
    /// Mark words as known
    Add { words: Vec<String> },

    /// Unmark words
    Remove { words: Vec<String> },

    /// Import words from a whitespace/newline-separated file
    Import { file: PathBuf },

    /// Print the known-word list
    Export,
}
