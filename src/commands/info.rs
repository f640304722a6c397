use std::path::Path;

use colored::Colorize;

use scatterlens::config::Config;
use scatterlens::error::Result;
use scatterlens::sample::SAMPLE_RESPONSES;

pub fn cmd_sample() -> Result<()> {
    print!("{}", SAMPLE_RESPONSES);
    Ok(())
}

pub fn cmd_config(config: &Config, explicit: Option<&Path>) -> Result<()> {
    let source = match explicit
        .map(Path::to_path_buf)
        .or_else(|| std::env::var("SCATTERLENS_CONFIG").ok().map(Into::into))
    {
        Some(p) => p.display().to_string(),
        None => match Config::default_path() {
            Some(p) if p.exists() => p.display().to_string(),
            _ => "built-in defaults".to_string(),
        },
    };
    eprintln!("{} {}", "Config from".green().bold(), source);
    println!("{}", serde_json::to_string_pretty(config)?);
    if let Some(var) = config.embedding.provider.env_var_name() {
        if std::env::var(var).is_err() {
            eprintln!("{} {} is not set", "Warning:".yellow(), var);
        }
    }
    Ok(())
}
