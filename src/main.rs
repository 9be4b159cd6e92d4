//! Overhead-flight spotter CLI
//!
//! Polls the live aircraft-state feed for a bounding box, enriches each
//! qualifying callsign through the quota-gated schedule client, and prints
//! a console report.

use clap::{Parser, Subcommand};
use skywatch::{
    airports::{self, AirportDirectory},
    pipeline::Pipeline,
    quota::QuotaStore,
    report,
    schedule::{ScheduleClient, ScheduleConfig},
    states::{BoundingBox, FeedConfig, StateFeed},
};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "skywatch")]
#[command(about = "Spot overhead flights and enrich them with schedule data", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the state feed once and report enriched flights
    Watch {
        /// Schedule API key
        #[arg(long, env = "AEROAPI_KEY")]
        api_key: String,

        /// Processed-airports CSV path
        #[arg(long, default_value = "processed_airports.csv")]
        airports: PathBuf,

        /// Monthly call-counter file
        #[arg(long, default_value = "monthly_calls.json")]
        quota_file: PathBuf,

        /// Per-run call budget (reported, not enforced)
        #[arg(long, default_value = "5")]
        max_calls_per_run: u32,

        /// Cache freshness window in minutes
        #[arg(long, default_value = "15")]
        cache_minutes: i64,

        /// Hard ceiling on schedule-API calls per calendar month
        #[arg(long, default_value = "1000")]
        monthly_limit: u32,

        /// South bound of bounding box
        #[arg(long, default_value = "41.8386")]
        south: f64,

        /// West bound of bounding box
        #[arg(long, default_value = "-88.0848")]
        west: f64,

        /// North bound of bounding box
        #[arg(long, default_value = "42.1186")]
        north: f64,

        /// East bound of bounding box
        #[arg(long, default_value = "-87.7248")]
        east: f64,

        /// State-feed base URL
        #[arg(long, default_value = "https://opensky-network.org/api")]
        feed_url: String,

        /// Schedule-API base URL
        #[arg(long, default_value = "https://aeroapi.flightaware.com/aeroapi")]
        schedule_url: String,
    },

    /// Regenerate the processed-airports CSV from the public datasets
    BuildAirports {
        /// Output path for the processed CSV
        #[arg(long, default_value = "processed_airports.csv")]
        out: PathBuf,
    },

    /// Show the current month's schedule-API usage
    Quota {
        /// Monthly call-counter file
        #[arg(long, default_value = "monthly_calls.json")]
        quota_file: PathBuf,

        /// Monthly limit to report remaining budget against
        #[arg(long, default_value = "1000")]
        monthly_limit: u32,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Watch {
            api_key,
            airports,
            quota_file,
            max_calls_per_run,
            cache_minutes,
            monthly_limit,
            south,
            west,
            north,
            east,
            feed_url,
            schedule_url,
        } => {
            run_watch(WatchArgs {
                api_key,
                airports,
                quota_file,
                max_calls_per_run,
                cache_minutes,
                monthly_limit,
                bbox: BoundingBox::new(south, west, north, east),
                feed_url,
                schedule_url,
            })
            .await?;
        }

        Commands::BuildAirports { out } => {
            build_airports(&out).await?;
        }

        Commands::Quota {
            quota_file,
            monthly_limit,
        } => {
            show_quota(&quota_file, monthly_limit)?;
        }
    }

    Ok(())
}

struct WatchArgs {
    api_key: String,
    airports: PathBuf,
    quota_file: PathBuf,
    max_calls_per_run: u32,
    cache_minutes: i64,
    monthly_limit: u32,
    bbox: BoundingBox,
    feed_url: String,
    schedule_url: String,
}

async fn run_watch(args: WatchArgs) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(
        "watching bounding box S={}, W={}, N={}, E={}",
        args.bbox.south,
        args.bbox.west,
        args.bbox.north,
        args.bbox.east
    );

    let airports = AirportDirectory::load(&args.airports)?;
    tracing::info!("airport directory: {} entries", airports.len());

    let quota = QuotaStore::load(&args.quota_file)?;
    tracing::info!("{} schedule-API calls recorded this month", quota.calls());

    let schedule_config = ScheduleConfig {
        base_url: args.schedule_url,
        max_calls_per_run: args.max_calls_per_run,
        cache_duration: chrono::Duration::minutes(args.cache_minutes),
        monthly_limit: args.monthly_limit,
        ..ScheduleConfig::default()
    };
    let schedule = ScheduleClient::new(&args.api_key, quota, schedule_config)?;

    let feed = StateFeed::new(FeedConfig {
        base_url: args.feed_url,
        ..FeedConfig::default()
    })?;

    let mut pipeline = Pipeline::new(feed, schedule, airports, args.bbox);
    let flights = pipeline.run().await?;

    report::print_report(
        &flights,
        pipeline.schedule().calls_this_run(),
        pipeline.schedule().monthly_calls(),
    );

    Ok(())
}

async fn build_airports(out: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(60))
        .build()?;

    let count = airports::build(&client, out).await?;
    println!("Processed airport data saved to {} ({} airports)", out.display(), count);

    Ok(())
}

fn show_quota(quota_file: &PathBuf, monthly_limit: u32) -> Result<(), Box<dyn std::error::Error>> {
    let store = QuotaStore::load(quota_file)?;

    println!("Schedule-API Usage");
    println!("==================");
    println!("Calls this month: {}", store.calls());
    println!("Monthly limit: {}", monthly_limit);
    println!("Remaining: {}", store.remaining(monthly_limit));
    println!("Last reset/update: {}", store.last_reset().format("%Y-%m-%d %H:%M:%S UTC"));

    Ok(())
}
