//! Command-line front-end: vet URLs against a validator configuration.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use serde::Serialize;
use tracing::{error, info};
use url_warden::{Validator, ValidatorConfig, Verdict};

#[derive(Debug, Parser)]
#[command(name = "url-warden", version, about = "Check URLs for SSRF safety")]
struct Cli {
    /// TOML configuration file (defaults apply when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Emit one JSON object per URL
    #[arg(long)]
    json: bool,

    /// Also run the DNS rebinding check for URLs that pass
    #[arg(long)]
    resolve: bool,

    /// URLs to check
    #[arg(required = true)]
    urls: Vec<String>,
}

#[derive(Debug, Serialize)]
struct Report<'a> {
    url: &'a str,
    #[serde(flatten)]
    verdict: Verdict,
    #[serde(skip_serializing_if = "Option::is_none")]
    resolves_to_loopback: Option<bool>,
}

impl Report<'_> {
    fn is_safe(&self) -> bool {
        self.verdict.is_valid() && self.resolves_to_loopback != Some(true)
    }
}

fn load_validator(path: Option<&PathBuf>) -> Result<Validator, url_warden::Error> {
    match path {
        Some(path) => {
            info!(path = %path.display(), "loading configuration");
            ValidatorConfig::load(path)?.build()
        }
        None => Ok(Validator::default()),
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("url_warden=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    let validator = load_validator(cli.config.as_ref())
        .inspect_err(|e| error!("failed to load configuration: {e}"))?;

    let mut all_safe = true;
    for url in &cli.urls {
        let verdict = validator.validate(url);
        let resolves_to_loopback = if cli.resolve && verdict.is_valid() {
            Some(validator.resolves_to_loopback(url).await)
        } else {
            None
        };

        let report = Report {
            url,
            verdict,
            resolves_to_loopback,
        };
        all_safe &= report.is_safe();

        if cli.json {
            println!("{}", serde_json::to_string(&report)?);
        } else {
            match report.resolves_to_loopback {
                Some(true) => println!("{url}: {verdict}; resolves to localhost"),
                _ => println!("{url}: {verdict}"),
            }
        }
    }

    Ok(if all_safe {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
