use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use extractors::CountryDetector;
use shared_types::VisaRecord;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use visa_agents::sources::MessageSource;
use visa_agents::{AppConfig, ExtractionPipeline, OllamaClient, TelegramExportSource};

#[derive(Parser, Debug)]
#[command(
    name = "visa-extractor",
    about = "Extract RTD visa requirements from a Telegram chat export"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch recent messages, filter by country and extract visa records
    Run(RunArgs),

    /// List the chats contained in an export
    ListChats {
        /// Path to the export's result.json
        #[arg(long, value_name = "PATH")]
        export: PathBuf,
    },

    /// Print the countries mentioned in a piece of text
    Detect {
        text: String,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Config file (defaults to the per-user rtd-visa/config.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Override source.export_path
    #[arg(long, value_name = "PATH")]
    export: Option<PathBuf>,

    /// Override source.chat_id
    #[arg(long)]
    chat_id: Option<String>,

    /// Override source.window_days
    #[arg(long)]
    window_days: Option<u32>,

    /// Override model.name
    #[arg(long)]
    model: Option<String>,

    /// Print records as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Run(args) => run(args).await,
        Command::ListChats { export } => list_chats(export).await,
        Command::Detect { text } => detect(&text),
    }
}

fn init_tracing() {
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .try_init();
}

async fn run(args: RunArgs) -> Result<()> {
    let (mut config, config_path) =
        AppConfig::load(args.config.as_deref()).context("Failed to load rtd-visa config")?;
    tracing::info!(path = %config_path.display(), "Loaded config");

    if let Some(export) = args.export {
        config.source.export_path = Some(export);
    }
    if let Some(chat_id) = args.chat_id {
        config.source.chat_id = Some(chat_id);
    }
    if let Some(window_days) = args.window_days {
        config.source.window_days = window_days;
    }
    if let Some(model) = args.model {
        config.model.name = model;
    }

    let export_path = config.source.export_path.clone().ok_or_else(|| {
        anyhow::anyhow!(
            "No chat export configured; pass --export or set source.export_path in {:?}",
            config_path
        )
    })?;

    let detector = CountryDetector::new().context("Failed to build country detector")?;
    let parser = config.response_parser()?;

    let client = OllamaClient::connect(
        &config.model.endpoint,
        &config.model.name,
        Duration::from_secs(config.model.timeout_secs),
    )
    .await
    .with_context(|| format!("Failed to initialize model {:?}", config.model.name))?
    .with_structured_output(config.model.structured_output);

    let source = TelegramExportSource::open(&export_path, config.source.chat_id.clone())
        .with_context(|| format!("Failed to open chat export at {:?}", export_path))?;
    let messages = source
        .fetch_recent_messages(config.source.window_days)
        .await;
    if messages.is_empty() {
        println!("No messages were fetched");
        return Ok(());
    }

    let pipeline = ExtractionPipeline::new(Arc::new(client), parser, config.pipeline_options());
    let extraction = pipeline.extract(&detector, messages).await;

    println!("Filtered messages:");
    for (message, countries) in &extraction.filtered {
        println!("  [{}] {}", countries.join(", "), message.preview(100));
    }
    println!("Total filtered messages: {}", extraction.filtered.len());
    println!();

    print!("{}", format_records(&extraction.report.records, args.json)?);

    let report = &extraction.report;
    println!();
    println!(
        "Processed {} messages: {} records, {} duplicates, {} model failures, {} parse failures",
        report.processed(),
        report.accepted(),
        report.duplicates(),
        report.model_failures(),
        report.parse_failures()
    );

    Ok(())
}

fn format_records(records: &[VisaRecord], json: bool) -> Result<String> {
    if json {
        return Ok(format!("{}\n", serde_json::to_string_pretty(records)?));
    }
    if records.is_empty() {
        return Ok("No visa information was extracted.\n".to_string());
    }

    let mut out = String::from("Visa records:\n");
    for record in records {
        out.push_str(&format!("- {}: {}\n", record.country, record.visa_requirement));
        out.push_str(&format!("    duration: {}\n", record.duration));
        if record.has_notes() {
            out.push_str(&format!("    notes: {}\n", record.notes));
        }
    }
    Ok(out)
}

async fn list_chats(export: PathBuf) -> Result<()> {
    let source = TelegramExportSource::open(&export, None)
        .with_context(|| format!("Failed to open chat export at {:?}", export))?;
    let chats = source.list_chats().await?;

    for chat in &chats {
        let id = chat
            .id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:>16}  {:<20}  {:>6} messages  {}",
            id, chat.chat_type, chat.message_count, chat.name
        );
    }
    println!("{} chats", chats.len());

    Ok(())
}

fn detect(text: &str) -> Result<()> {
    let detector = CountryDetector::new().context("Failed to build country detector")?;
    let countries = detector.detect(text);

    if countries.is_empty() {
        println!("No countries detected");
    } else {
        for country in countries {
            println!("{country}");
        }
    }

    Ok(())
}
