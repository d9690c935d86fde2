use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use fishsoop_bucket::{ObjectLocation, S3BucketStore};
use fishsoop_core::daily_summary::run_daily_summary;
use fishsoop_core::dispatch::{handle_event, process_file};
use fishsoop_core::event::StorageEvent;
use fishsoop_core::ledger::{Ledger, LEDGER_COLUMNS};
use fishsoop_core::mailer::{DisabledTransport, MailTransport, SmtpMailTransport};
use fishsoop_core::status_page::{update_for_deck_unit_upload, update_for_sensor_upload};
use fishsoop_core::{FishsoopConfig, JobContext};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "FishSOOP notification and status jobs", long_about = None)]
struct Cli {
    /// TOML configuration file; defaults apply when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract, plot and email one quality-controlled file
    Notify(NotifyArgs),
    /// Update the status page after a sensor upload
    StatusPage(EventArgs),
    /// Update the status page after a deck unit status upload
    DeckUnit(EventArgs),
    /// Email the processing summary for one day
    DailySummary(DailySummaryArgs),
    /// Inspect or initialise the sent-notification ledger
    Ledger {
        #[command(subcommand)]
        command: LedgerCommand,
    },
}

#[derive(Args, Debug)]
struct EventArgs {
    /// Storage event JSON file, or `-` for stdin
    #[arg(long, default_value = "-")]
    event: String,
}

#[derive(Args, Debug)]
struct NotifyArgs {
    #[command(flatten)]
    source: NotifySource,
    /// Compose emails without sending them or touching the bucket
    #[arg(long)]
    dry_run: bool,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct NotifySource {
    /// Storage event JSON file, or `-` for stdin
    #[arg(long)]
    event: Option<String>,
    /// Object to process directly, as `s3://bucket/key`
    #[arg(long)]
    object: Option<ObjectLocation>,
}

#[derive(Args, Debug)]
struct DailySummaryArgs {
    /// Report date (YYYY-MM-DD); defaults to yesterday (UTC)
    #[arg(long)]
    date: Option<NaiveDate>,
    /// Compose the summary without sending it or touching the bucket
    #[arg(long)]
    dry_run: bool,
}

#[derive(Subcommand, Debug)]
enum LedgerCommand {
    /// Write an empty ledger; fails if one already exists
    Init,
    /// Print the ledger rows
    Show {
        /// Only the most recent rows
        #[arg(long)]
        last: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let cli = Cli::parse();
    let config = FishsoopConfig::load(cli.config.as_deref())
        .context("failed to load configuration")?;

    match cli.command {
        Command::Notify(args) => {
            let ctx = build_context(config, Mail::Send, args.dry_run).await?;
            let now = Utc::now();
            let report = match (args.source.event, args.source.object) {
                (Some(event), _) => handle_event(&ctx, &read_event(&event)?, now).await?,
                (None, Some(object)) => process_file(&ctx, &object, now).await?,
                (None, None) => anyhow::bail!("either --event or --object is required"),
            };
            print_json(&report)
        }
        Command::StatusPage(args) => {
            let ctx = build_context(config, Mail::Disabled, false).await?;
            let today = Utc::now().date_naive();
            let outcome = update_for_sensor_upload(&ctx, &read_event(&args.event)?, today).await?;
            print_json(&outcome)
        }
        Command::DeckUnit(args) => {
            let ctx = build_context(config, Mail::Disabled, false).await?;
            let today = Utc::now().date_naive();
            let outcome =
                update_for_deck_unit_upload(&ctx, &read_event(&args.event)?, today).await?;
            print_json(&outcome)
        }
        Command::DailySummary(args) => {
            let ctx = build_context(config, Mail::Send, args.dry_run).await?;
            let date = args
                .date
                .unwrap_or_else(|| Utc::now().date_naive() - Duration::days(1));
            let report = run_daily_summary(&ctx, date).await?;
            print_json(&report)
        }
        Command::Ledger { command } => {
            let ctx = build_context(config, Mail::Disabled, false).await?;
            run_ledger_command(&ctx, command).await
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mail {
    Send,
    Disabled,
}

async fn build_context(config: FishsoopConfig, mail: Mail, dry_run: bool) -> Result<JobContext> {
    let store = S3BucketStore::new(config.storage.clone())
        .await
        .context("failed to build S3 client")?;
    let transport: Arc<dyn MailTransport> = if mail == Mail::Send && !dry_run {
        Arc::new(SmtpMailTransport::new(&config.smtp).context("failed to build SMTP transport")?)
    } else {
        Arc::new(DisabledTransport)
    };
    let ctx = JobContext::new(config, Arc::new(store), transport);
    Ok(if dry_run { ctx.with_dry_run() } else { ctx })
}

async fn run_ledger_command(ctx: &JobContext, command: LedgerCommand) -> Result<()> {
    let location = &ctx.config.notify.ledger;
    let ledger = Ledger::new(ctx.store.as_ref(), location);
    match command {
        LedgerCommand::Init => {
            ledger.create().await?;
            info!(%location, "ledger created");
            Ok(())
        }
        LedgerCommand::Show { last } => {
            let entries = ledger.entries().await?;
            let skip = last.map_or(0, |n| entries.len().saturating_sub(n));

            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(LEDGER_COLUMNS);
            for entry in entries.iter().skip(skip) {
                table.add_row(vec![
                    entry.datetime.as_str(),
                    entry.recipients.as_str(),
                    entry.attachments.as_str(),
                    entry.plots.as_str(),
                    entry.bcc.as_str(),
                    entry.from.as_str(),
                    entry.reply_to.as_str(),
                ]);
            }
            println!("{table}");
            println!("{} of {} rows from {location}", entries.len() - skip, entries.len());
            Ok(())
        }
    }
}

fn read_event(source: &str) -> Result<StorageEvent> {
    let raw = if source == "-" {
        let mut raw = String::new();
        std::io::stdin()
            .read_to_string(&mut raw)
            .context("failed to read event from stdin")?;
        raw
    } else {
        std::fs::read_to_string(Path::new(source))
            .with_context(|| format!("failed to read event file {source}"))?
    };
    Ok(StorageEvent::from_json(&raw)?)
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
