use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, warn};

use scatterlens::config::{Config, EmbedProviderKind};
use scatterlens::error::{AnalysisError, Result};
use scatterlens::export::write_bundle;
use scatterlens::filter::{parse_rect, visible_rows, FilterSpec, Selection, SentimentFilter};
use scatterlens::lexicon::SortOrder;
use scatterlens::model::{Row, RowKey};
use scatterlens::pipeline::{Orchestrator, OrchestratorHandle, PipelineStatus, Services, Snapshot};

pub struct AnalyzeOptions {
    pub input: Option<PathBuf>,
    pub sentiment: bool,
    pub out: Option<PathBuf>,
    pub stakeholders: Vec<String>,
    pub filter_sentiment: String,
    pub search: Option<String>,
    pub select: Vec<String>,
    pub select_rect: Option<String>,
    pub sort: String,
    pub min_count: Option<usize>,
    pub provider: Option<String>,
    pub limit: usize,
}

fn read_input(input: Option<&PathBuf>) -> Result<String> {
    match input {
        None => Ok(String::new()),
        Some(p) if p.as_os_str() == "-" => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
        Some(p) => {
            if !p.exists() {
                return Err(AnalysisError::Config(format!("input file not found: {}", p.display())));
            }
            Ok(std::fs::read_to_string(p)?)
        }
    }
}

fn spinner() -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .map_err(|e| AnalysisError::Config(format!("progress template: {}", e)))?,
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

/// Follow published snapshots until `generation` settles, reporting each status.
async fn follow(handle: &OrchestratorHandle, generation: u64, pb: &ProgressBar) -> Result<Snapshot> {
    let mut rx = handle.subscribe();
    loop {
        let snapshot = Snapshot::clone(&rx.borrow_and_update());
        if snapshot.generation == generation {
            pb.set_message(format!("{} ({} rows)", snapshot.status, snapshot.rows.len()));
            if snapshot.status.is_settled() && !snapshot.sentiment_running {
                return Ok(snapshot);
            }
        }
        rx.changed().await.map_err(|_| AnalysisError::ChannelClosed)?;
    }
}

/// Rows picked by `--select-rect` and `--select`; empty when neither is given.
fn build_selection(rows: &[Row], keys: &[String], rect: Option<&str>) -> Result<Selection> {
    let mut selection = Selection::new();
    if let Some(rect) = rect {
        let (a, b) = parse_rect(rect).map_err(AnalysisError::Config)?;
        selection.select_in_rect(rows, a, b);
    }
    let keys = keys
        .iter()
        .map(|k| k.parse::<RowKey>().map_err(AnalysisError::Config))
        .collect::<Result<Vec<_>>>()?;
    selection.extend(keys);
    Ok(selection)
}

fn truncate_text(text: &str, max_chars: usize) -> String {
    let cleaned = text.replace('\n', " ").trim().to_string();
    if cleaned.chars().count() <= max_chars {
        cleaned
    } else {
        let head: String = cleaned.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

fn print_summary(snapshot: &Snapshot) {
    println!(
        "{} {} rows from {} responses ({} merged)",
        "Done!".green().bold(),
        snapshot.rows.len(),
        snapshot.parse_report.accepted,
        snapshot.merges
    );
    println!("  Stakeholders: {}", snapshot.stakeholders.join(", ").cyan());
    for skipped in &snapshot.parse_report.skipped {
        println!(
            "  {} line {}: {}",
            "Skipped".yellow(),
            skipped.line,
            skipped.reason
        );
    }
    if let Some(err) = &snapshot.sentiment_error {
        println!("  {} {}", "Sentiment unavailable:".yellow().bold(), err);
    }
}

fn print_row(row: &Row) {
    let coords = row
        .coords
        .map(|c| format!("({:>7.2}, {:>7.2})", c.x, c.y))
        .unwrap_or_else(|| "(   -   ,    -   )".to_string());
    let sentiment = match &row.sentiment {
        Some(s) if s.normalized_label() == "positive" => {
            format!("+{:.2}", s.score).green().to_string()
        }
        Some(s) => format!("-{:.2}", s.score).red().to_string(),
        None => "  -  ".dimmed().to_string(),
    };
    println!(
        "  {:<8} {} {} [{}] {}",
        row.key().to_string().cyan(),
        coords,
        sentiment,
        row.stakeholder,
        truncate_text(&row.text, 80)
    );
}

pub fn cmd_analyze(mut config: Config, opts: AnalyzeOptions) -> Result<()> {
    if let Some(p) = &opts.provider {
        config.embedding.provider = EmbedProviderKind::from_str_loose(p)
            .ok_or_else(|| AnalysisError::Config(format!("Unknown provider: {}", p)))?;
    }

    let sentiment_filter: SentimentFilter = opts
        .filter_sentiment
        .parse()
        .map_err(AnalysisError::Config)?;
    let order: SortOrder = opts.sort.parse().map_err(AnalysisError::Config)?;
    let min_count = opts.min_count.unwrap_or(config.frequency.min_display_count);
    let want_sentiment = opts.sentiment || sentiment_filter != SentimentFilter::All;
    if let Some(rect) = &opts.select_rect {
        parse_rect(rect).map_err(AnalysisError::Config)?;
    }

    let filter = FilterSpec {
        stakeholders: opts.stakeholders.clone(),
        sentiment: sentiment_filter,
        search: opts.search.clone().unwrap_or_default(),
    };

    let raw = read_input(opts.input.as_ref())?;
    if raw.trim().is_empty() {
        println!("{} No input given, analysing the built-in sample", "Note:".yellow());
    }

    let services = Services::from_config(&config)?;
    let sentiment_batch = config.sentiment.batch_size;

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| AnalysisError::Config(format!("tokio runtime: {}", e)))?;

    rt.block_on(async {
        println!(
            "{} Analysing with {} embeddings...",
            "Analysis".green().bold(),
            config.embedding.provider
        );

        let handle = Orchestrator::spawn(services, config);
        let pb = spinner()?;

        let generation = handle.submit(raw).await?;
        let mut snapshot = follow(&handle, generation, &pb).await?;

        if snapshot.status == PipelineStatus::Error {
            pb.finish_and_clear();
            let message = snapshot.error.clone().unwrap_or_else(|| "unknown failure".into());
            println!("{} {}", "Pipeline failed:".red().bold(), message);
            handle.shutdown().await?;
            return Err(AnalysisError::service("pipeline", message));
        }

        if want_sentiment {
            debug!("Requesting sentiment - rows={}, batch_size={}", snapshot.rows.len(), sentiment_batch);
            match handle.request_sentiment().await {
                Ok(_) => snapshot = follow(&handle, generation, &pb).await?,
                Err(e) => warn!("Sentiment not started: {}", e),
            }
        }
        pb.finish_and_clear();

        print_summary(&snapshot);

        let selection = build_selection(&snapshot.rows, &opts.select, opts.select_rect.as_deref())?;
        if (!opts.select.is_empty() || opts.select_rect.is_some()) && selection.is_empty() {
            println!("{} Selection matched no rows, listing all", "Note:".yellow());
        }
        let shown = visible_rows(&snapshot.rows, &filter, &selection);
        println!(
            "\n{} {} of {} rows",
            "Rows".green().bold(),
            shown.len(),
            snapshot.rows.len()
        );
        for row in shown.iter().take(opts.limit) {
            print_row(row);
        }
        if shown.len() > opts.limit {
            println!("  {}", format!("... {} more", shown.len() - opts.limit).dimmed());
        }

        let words = snapshot.frequency.display(min_count, order);
        println!(
            "\n{} {} roots shown (count >= {}, {} distinct)",
            "Frequency".green().bold(),
            words.len(),
            min_count,
            snapshot.frequency.len()
        );
        for (root, count) in &words {
            println!("  {:>5}  {}", count, root);
        }

        if let Some(dir) = &opts.out {
            let files = write_bundle(dir, &snapshot, &filter, &selection, min_count)?;
            println!("\n{} Wrote {} files to {}", "Export".green().bold(), files.len(), dir.display());
        }

        handle.shutdown().await?;
        Ok(())
    })
}
