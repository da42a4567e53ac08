use anyhow::{Result, Context};
use aws_config::BehaviorVersion;
use aws_lambda_events::event::s3::S3Event;
use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::fmt::format::FmtSpan;

use curagg_aws::{first_record, relocate, S3Copier};
use curagg_core::{plan_relocation, AccountId, ConfigError, Destination, Relocation, RelocationConfig};
use curagg_policy::PolicyDocument;

#[derive(Parser, Debug)]
#[command(author, version, about="curagg: cost and usage report aggregation helpers")]
struct Cli {
    /// Config file (YAML)
    #[arg(short, long, default_value="curagg.yaml", global = true)]
    file: PathBuf,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)] enum Cmd {
    /// Print the aggregation bucket policy for the configured accounts
    Policy {
        /// Extra account ids, appended after the configured ones
        #[arg(long="account")] accounts: Vec<String>,
        /// Write the document here instead of stdout
        #[arg(short, long)] out: Option<PathBuf>,
    },
    /// Run the relocation handler locally against an event file
    Relocate {
        #[arg(long)] event: PathBuf,
        /// Print the planned copy without calling S3
        #[arg(long, default_value_t=false)] dry_run: bool,
    },
}

#[derive(Deserialize, Debug)]
struct Settings {
    #[serde(default)] accounts: Vec<AccountId>,
    target: Target,
}

#[derive(Deserialize, Debug)]
struct Target {
    bucket: String,
    default_path: String,
    #[serde(default)] partition_marker: Option<String>,
}

impl Settings {
    fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read(path).with_context(|| format!("read config {}", path.display()))?;
        serde_yaml::from_slice(&raw).with_context(|| format!("parse config {}", path.display()))
    }

    fn relocation_config(&self) -> Result<RelocationConfig, ConfigError> {
        let mut cfg = RelocationConfig::new(Destination::new(&self.target.bucket, &self.target.default_path));
        if let Some(m) = &self.target.partition_marker { cfg = cfg.with_partition_marker(m); }
        cfg.validate()?;
        Ok(cfg)
    }
}

fn render_policy(settings: &Settings, extra: &[String]) -> Result<String> {
    let cfg = settings.relocation_config()?;
    let accounts: Vec<AccountId> = settings.accounts.iter().cloned()
        .chain(extra.iter().map(AccountId::new))
        .collect();
    for a in accounts.iter().filter(|a| !a.is_well_formed()) {
        tracing::warn!(account = %a, "account id is not 12 digits; emitting it unchanged");
    }
    PolicyDocument::for_accounts(&accounts, &cfg.destination).to_pretty_json()
}

fn write_policy(doc: &str, out: Option<&Path>) -> Result<()> {
    match out {
        Some(p) => std::fs::write(p, doc).with_context(|| format!("write policy {}", p.display())),
        None => { println!("{}", doc); Ok(()) }
    }
}

fn load_event(path: &Path) -> Result<S3Event> {
    let raw = std::fs::read(path).with_context(|| format!("read event {}", path.display()))?;
    serde_json::from_slice(&raw).with_context(|| format!("parse event {}", path.display()))
}

fn plan_event(event: &S3Event, cfg: &RelocationConfig) -> Result<Relocation> {
    let source = first_record(event)?;
    Ok(plan_relocation(&source.bucket, &source.key, cfg)?)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().json().with_span_events(FmtSpan::CLOSE).with_writer(std::io::stderr).init();
    let cli = Cli::parse();
    let settings = Settings::load(&cli.file)?;

    match cli.cmd {
      Cmd::Policy { accounts, out } => {
          let doc = render_policy(&settings, &accounts)?;
          write_policy(&doc, out.as_deref())?;
      },
      Cmd::Relocate { event, dry_run } => {
          let cfg = settings.relocation_config()?;
          let event = load_event(&event)?;
          let relocation = if dry_run {
              plan_event(&event, &cfg)?
          } else {
              let shared_config = aws_config::load_defaults(BehaviorVersion::latest()).await;
              let copier = S3Copier::new(aws_sdk_s3::Client::new(&shared_config));
              relocate(&event, &cfg, &copier).await?
          };
          println!("{}", serde_json::to_string_pretty(&relocation)?);
      },
    }
    Ok(())
}
