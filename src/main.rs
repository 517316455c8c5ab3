use anyhow::Context;
use batch_notifier::config::Config;
use batch_notifier::constants::{PROD_LIST_PATH, TEST_LIST_PATH};
use batch_notifier::infra::notify_client::TwilioNotifyClient;
use batch_notifier::observability::{init_logging, metrics};
use batch_notifier::pipeline::{check_list, AddressValidator, CsvLedger, CsvSource, Pipeline};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::{error, info, Instrument};

#[derive(Parser)]
#[command(name = "batch_notifier")]
#[command(about = "Send one message to every number in a CSV list, in rate-limited batches")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send the configured message to every valid number in the list
    Send {
        /// Which list to read: test -> list_test.csv, prod -> list.csv
        #[arg(long, value_enum)]
        mode: Mode,
        /// Notify service SID to send through
        service_sid: String,
        /// Read this file instead of the mode's default list
        #[arg(long)]
        input: Option<PathBuf>,
        /// Config file (defaults to ./config.toml if present)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Validate a list without sending anything or touching the ledgers
    Check {
        #[arg(long, value_enum)]
        mode: Mode,
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Mode {
    Test,
    Prod,
}

impl Mode {
    fn default_list(self) -> PathBuf {
        match self {
            Mode::Test => PathBuf::from(TEST_LIST_PATH),
            Mode::Prod => PathBuf::from(PROD_LIST_PATH),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    dotenv::dotenv().ok();
    let _log_guard = init_logging();

    if let Err(e) = metrics::init() {
        tracing::warn!("Metrics disabled: {}", e);
    }

    match cli.command {
        Commands::Send { mode, service_sid, input, config } => {
            let config = Config::load(config.as_deref()).context("loading configuration")?;
            let input = input.unwrap_or_else(|| mode.default_list());
            let run_id = uuid::Uuid::new_v4();
            let span = tracing::info_span!("send", run_id = %run_id, mode = ?mode);

            async move {
                // Ledgers are truncated before the header is checked
                let ledger = CsvLedger::create(&config.output.failed_path, &config.output.success_path)
                    .await
                    .context("creating ledger files")?;
                let source = CsvSource::open(&input, &config.input.address_column, config.input.delimiter)
                    .await
                    .with_context(|| format!("opening {}", input.display()))?;
                let api = TwilioNotifyClient::new(&config.notify, &service_sid);

                let pipeline = Pipeline::from_config(&config, source, Box::new(api), Box::new(ledger))?;
                let summary = match pipeline.run().await {
                    Ok(s) => s,
                    Err(e) => {
                        error!("Run aborted: {}", e);
                        return Err(e.into());
                    }
                };

                println!("\n📊 Run summary:");
                println!("   Rows read: {}", summary.rows_read);
                println!("   Delivered: {}", summary.delivered);
                println!("   Failed: {}", summary.failed);
                println!("   Invalid: {}", summary.invalid);
                println!(
                    "   Batches: {} ({} failed)",
                    summary.batches_dispatched, summary.batches_failed
                );
                println!("   Ledgers: {} / {}", config.output.success_path.display(), config.output.failed_path.display());

                metrics::push_summary(&summary, &run_id.to_string()).await;
                info!("Run complete");
                Ok::<(), anyhow::Error>(())
            }
            .instrument(span)
            .await?;
        }
        Commands::Check { mode, input, config } => {
            // Checking needs no credentials, only the input settings
            let input_config = Config::load_input(config.as_deref()).context("loading configuration")?;
            let input = input.unwrap_or_else(|| mode.default_list());
            let source = CsvSource::open(&input, &input_config.address_column, input_config.delimiter)
                .await
                .with_context(|| format!("opening {}", input.display()))?;
            let validator = AddressValidator::from_config(&input_config)?;

            let report = check_list(source, &validator).await?;
            println!("🔎 {}: {} rows, {} valid, {} invalid", input.display(), report.rows, report.valid, report.invalid);
            if !report.sample_invalid_lines.is_empty() {
                println!("   First invalid lines: {:?}", report.sample_invalid_lines);
            }
        }
    }
    Ok(())
}
