use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "scatterlens",
    about = "Semantic map, sentiment and word frequencies for survey responses",
    version
)]
pub struct Cli {
    /// Enable verbose output
    #[arg(global = true, long, short)]
    pub verbose: bool,

    /// Config file (defaults to $SCATTERLENS_CONFIG or the user config dir)
    #[arg(global = true, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the analysis pipeline over tab-separated responses
    Analyze {
        /// Input file (id<TAB>text<TAB>stakeholder per line), "-" for stdin; built-in sample when omitted
        input: Option<PathBuf>,

        /// Also classify sentiment once the map is ready
        #[arg(long)]
        sentiment: bool,

        /// Write rows.json, frequency.json, plot.json and summary.json here
        #[arg(long)]
        out: Option<PathBuf>,

        /// Only show rows from these stakeholders (repeatable)
        #[arg(long = "stakeholder")]
        stakeholders: Vec<String>,

        /// Sentiment filter for the row table
        #[arg(long, default_value = "all", value_parser = ["all", "positive", "negative"])]
        filter_sentiment: String,

        /// Case-insensitive text search for the row table
        #[arg(long)]
        search: Option<String>,

        /// Select rows by key (`<id>-<sentence>`, repeatable); only selected rows are listed and exported
        #[arg(long = "select", allow_hyphen_values = true)]
        select: Vec<String>,

        /// Select rows whose map coordinates fall inside `x0,y0,x1,y1`
        #[arg(long, allow_hyphen_values = true)]
        select_rect: Option<String>,

        /// Frequency list order
        #[arg(long, default_value = "count", value_parser = ["count", "alpha"])]
        sort: String,

        /// Hide roots seen fewer times than this (default from config)
        #[arg(long)]
        min_count: Option<usize>,

        /// Embedding provider override
        #[arg(long, value_parser = ["openai", "gemini", "ollama", "hashing"])]
        provider: Option<String>,

        /// Maximum rows printed in the table
        #[arg(long, default_value = "25")]
        limit: usize,
    },

    /// Print the built-in sample survey
    Sample,

    /// Show the effective configuration
    Config,
}
