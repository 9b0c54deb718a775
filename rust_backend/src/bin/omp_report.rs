use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use omp_rust::backup::{
    local_time_of_day, Band, BackupQuery, BackupStore, Instrument, QueryKind, QueueTools,
};
use omp_rust::config::OmpConfig;
use omp_rust::db::{LocalSeed, RepositoryFactory};
use omp_rust::models::Telescope;
use omp_rust::services::{query_queue_status, NightReport, QueueFilters};
use omp_rust::time::{determine_semester, parse_ut_date, semester_boundary, today_ut};

#[derive(Parser)]
#[command(name = "omp-report", version, about = "Observatory time accounting and night reports")]
struct Args {
    /// Configuration file (defaults to omp.toml in the usual locations)
    #[arg(long, global = true, env = "OMP_CONFIG")]
    config: Option<PathBuf>,

    /// JSON document used to seed the in-memory store
    #[arg(long, global = true)]
    seed: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Night (or multi-night) observing report
    Night {
        #[arg(long)]
        tel: Telescope,
        /// UT date (YYYY-MM-DD or YYYYMMDD), default today
        #[arg(long)]
        date: Option<String>,
        /// Number of UT days to cover
        #[arg(long, default_value_t = 1)]
        delta: u32,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Hour-by-hour view of what the queue could observe
    Qstatus {
        #[arg(long)]
        tel: Telescope,
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        country: Option<String>,
        #[arg(long)]
        semester: Option<String>,
        #[arg(long)]
        instrument: Option<String>,
        /// Sweep every UT hour rather than the observing window
        #[arg(long)]
        full_day: bool,
    },
    /// Semester containing a UT date, with its boundaries
    Semester {
        #[arg(long)]
        tel: Telescope,
        #[arg(long)]
        date: Option<String>,
    },
    /// Search previously fetched backup MSBs
    Backup {
        #[arg(long)]
        directory: PathBuf,
        /// Date directory (YYYY-MM-DD), default the most recent
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        band: Band,
        #[arg(long)]
        instrument: Instrument,
        #[arg(long)]
        query: QueryKind,
        /// Time of day (HH-MM-SS) to search at, default the local clock
        #[arg(long)]
        time: Option<String>,
        /// Put the named MSB file from the results on the observing queue
        #[arg(long, value_name = "FILE")]
        send: Option<String>,
        #[arg(long, default_value = "jcmttranslator")]
        translator: PathBuf,
        #[arg(long, default_value = "ditscmd")]
        ditscmd: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Html,
    Json,
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let env_filter = EnvFilter::builder()
        .with_default_directive(default.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn load_config(path: Option<&PathBuf>) -> Result<OmpConfig> {
    match path {
        Some(path) => OmpConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display())),
        None => Ok(OmpConfig::from_default_location()
            .context("Failed to load default configuration")?
            .unwrap_or_default()),
    }
}

fn ut_date(date: Option<&str>) -> Result<NaiveDate> {
    match date {
        Some(d) => Ok(parse_ut_date(d)?),
        None => Ok(today_ut()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = load_config(args.config.as_ref())?;

    // Backup search and semester lookups need no store.
    match &args.command {
        Command::Semester { tel, date } => {
            let date = ut_date(date.as_deref())?;
            let semester = determine_semester(date, *tel);
            let (first, last) = semester_boundary(semester, *tel)?;
            println!("{} {}: {} to {}", tel, semester, first, last);
            return Ok(());
        }
        Command::Backup {
            directory,
            date,
            band,
            instrument,
            query,
            time,
            send,
            translator,
            ditscmd,
        } => {
            let store = BackupStore::new(directory);
            let date = match date {
                Some(d) => d.clone(),
                None => store
                    .dates()?
                    .pop()
                    .context("No backup dates available")?,
            };
            let query = BackupQuery {
                date,
                band: *band,
                instrument: *instrument,
                query: *query,
            };
            let now = time.clone().unwrap_or_else(local_time_of_day);
            let result = store.search(&query, &now)?;
            println!("Directory: {}", result.directory.display());
            println!("Time: {}", result.time);
            if result.msbs.is_empty() {
                println!("No results");
            }
            for msb in &result.msbs {
                println!("{}", msb);
            }

            if let Some(file_name) = send {
                let msb = result
                    .msbs
                    .iter()
                    .find(|m| m.file_name == *file_name)
                    .with_context(|| format!("{} is not among the results", file_name))?;
                let tools = QueueTools {
                    translator: translator.clone(),
                    ditscmd: ditscmd.clone(),
                };
                tools.check()?;
                let manifest = tools
                    .send_to_queue(msb)
                    .context("Error sending to queue")?;
                println!("Sent {} to queue: {}", file_name, manifest);
            }
            return Ok(());
        }
        _ => {}
    }

    let seed = args
        .seed
        .as_ref()
        .map(|path| {
            LocalSeed::from_json_file(path)
                .with_context(|| format!("Failed to load seed data from {}", path.display()))
        })
        .transpose()?;
    let repo = RepositoryFactory::create(&config.repository, &config.postgres, seed)
        .await
        .context("Failed to create repository")?;

    match args.command {
        Command::Night {
            tel,
            date,
            delta,
            format,
        } => {
            let date = ut_date(date.as_deref())?;
            let report = NightReport::new(repo.as_ref(), tel, date, delta, config.telescope(tel));
            let data = report.assemble().await?;
            let rendered = match format {
                OutputFormat::Text => data.as_text(),
                OutputFormat::Html => data.as_html(),
                OutputFormat::Json => serde_json::to_string_pretty(&data)?,
            };
            println!("{}", rendered);
        }
        Command::Qstatus {
            tel,
            date,
            country,
            semester,
            instrument,
            full_day,
        } => {
            let date = ut_date(date.as_deref())?;
            let filters = QueueFilters {
                country,
                semester,
                instrument,
                full_day,
            };
            let status =
                query_queue_status(repo.as_ref(), tel, date, &filters, config.telescope(tel)).await?;
            print!("{}", status.as_text());
        }
        Command::Semester { .. } | Command::Backup { .. } => {}
    }

    Ok(())
}
