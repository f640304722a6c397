mod commands;

use clap::Parser;
use colored::Colorize;

use scatterlens::cli::{Cli, Commands};
use scatterlens::config::Config;
use scatterlens::error::Result;

use commands::analyze::{cmd_analyze, AnalyzeOptions};
use commands::info::{cmd_config, cmd_sample};

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    // Sample needs no config
    if matches!(cli.command, Commands::Sample) {
        return cmd_sample();
    }

    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Analyze {
            input,
            sentiment,
            out,
            stakeholders,
            filter_sentiment,
            search,
            select,
            select_rect,
            sort,
            min_count,
            provider,
            limit,
        } => cmd_analyze(
            config,
            AnalyzeOptions {
                input,
                sentiment,
                out,
                stakeholders,
                filter_sentiment,
                search,
                select,
                select_rect,
                sort,
                min_count,
                provider,
                limit,
            },
        ),
        Commands::Config => cmd_config(&config, cli.config.as_deref()),
        Commands::Sample => cmd_sample(),
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}
