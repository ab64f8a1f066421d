use std::process;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use tdsystem::scraper::WebScraper;
use tdsystem::utils::{RecordStats, params_from_url, record_params_from_url};

#[derive(Parser)]
#[command(name = "tdsystem")]
#[command(about = "A tdsystem.co.jp swim meet results scraper", long_about = None)]
struct Cli {
    #[arg(
        short = 'l',
        long = "log-level",
        value_enum,
        default_value = "info",
        global = true,
        help = "Set the logging level"
    )]
    log_level: LogLevel,

    #[arg(
        long,
        default_value = tdsystem::BASE_URL,
        global = true,
        help = "Root URL of the results site"
    )]
    base_url: String,

    #[arg(
        long,
        value_name = "SECONDS",
        default_value_t = 5,
        global = true,
        help = "Minimum number of seconds between two requests"
    )]
    interval: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// List the years the site has results for
    Years {
        #[arg(short = 'o', long = "output", value_enum, default_value = "text", help = "Output format")]
        format: OutputFormat,
    },
    /// List the meets held in a given month
    Meets {
        #[arg(long, help = "Year of the meets, e.g. 2018")]
        year: i32,

        #[arg(
            long,
            help = "Month of the meets (1-12)",
            value_parser = clap::value_parser!(u32).range(1..=12)
        )]
        month: u32,

        #[arg(short = 'o', long = "output", value_enum, default_value = "text", help = "Output format")]
        format: OutputFormat,
    },
    /// List the races of a meet
    Races {
        #[arg(help = "URL of the meet's race list page (ProList.php?...)")]
        url: String,

        #[arg(short = 'o', long = "output", value_enum, default_value = "text", help = "Output format")]
        format: OutputFormat,
    },
    /// Fetch the results of a race across all age classes
    Records {
        #[arg(help = "URL of a results page (Record.php?...)")]
        url: String,

        #[arg(short = 'o', long = "output", value_enum, default_value = "text", help = "Output format")]
        format: OutputFormat,
    },
    /// Fetch every result of every meet, for all years, one year or one month
    Crawl {
        #[arg(long, help = "Year to crawl; every listed year when omitted")]
        year: Option<i32>,

        #[arg(
            long,
            help = "Only crawl this month (1-12)",
            requires = "year",
            value_parser = clap::value_parser!(u32).range(1..=12)
        )]
        month: Option<u32>,

        #[arg(short = 'o', long = "output", value_enum, default_value = "text", help = "Output format")]
        format: OutputFormat,
    },
}

fn serialize_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            log::error!("Error serializing to JSON: {}", e);
            process::exit(1);
        }
    }
}

fn print_list<T: std::fmt::Display>(items: &[T]) {
    if items.is_empty() {
        println!("No entries to display.");
    } else {
        for (i, item) in items.iter().enumerate() {
            println!("{:>3}. {}", i + 1, item);
        }
    }
}

fn print_records(records: &[tdsystem::types::Record], format: OutputFormat) {
    match format {
        OutputFormat::Json => serialize_json(&records),
        OutputFormat::Text => {
            if records.is_empty() {
                println!("No records to display.");
            } else {
                for record in records {
                    println!("{}", record);
                }
                print!("{}", RecordStats::from_records(records));
            }
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level.clone().into())
        .init();

    let mut scraper = WebScraper::new()
        .and_then(|s| s.with_base_url(&cli.base_url))
        .map(|s| s.with_interval(Duration::from_secs(cli.interval)))
        .unwrap_or_else(|e| {
            log::error!("Error creating scraper: {}", e);
            process::exit(1);
        });

    match cli.command {
        Commands::Years { format } => {
            let years = scraper.fetch_years().await.unwrap_or_else(|e| {
                log::error!("Error fetching years: {}", e);
                process::exit(1);
            });

            match format {
                OutputFormat::Json => serialize_json(&years),
                OutputFormat::Text => print_list(&years),
            }
        }

        Commands::Meets {
            year,
            month,
            format,
        } => {
            let meets = scraper.fetch_meets(year, month).await.unwrap_or_else(|e| {
                log::error!("Error fetching meets: {}", e);
                process::exit(1);
            });

            match format {
                OutputFormat::Json => serialize_json(&meets),
                OutputFormat::Text => print_list(&meets),
            }
        }

        Commands::Races { url, format } => {
            let params = params_from_url(&url, scraper.base_url()).unwrap_or_else(|e| {
                log::error!("Invalid race list URL '{}': {}", url, e);
                process::exit(1);
            });

            let races = scraper.fetch_races(&params).await.unwrap_or_else(|e| {
                log::error!("Error fetching races: {}", e);
                process::exit(1);
            });

            match format {
                OutputFormat::Json => serialize_json(&races),
                OutputFormat::Text => print_list(&races),
            }
        }

        Commands::Records { url, format } => {
            let params = record_params_from_url(&url, scraper.base_url()).unwrap_or_else(|e| {
                log::error!("Invalid results URL '{}': {}", url, e);
                process::exit(1);
            });
            log::debug!("Record page parameters: {}", params);

            let records = scraper.fetch_records(&params).await.unwrap_or_else(|e| {
                log::error!("Error fetching records: {}", e);
                process::exit(1);
            });

            print_records(&records, format);
        }

        Commands::Crawl {
            year,
            month,
            format,
        } => {
            let result = match (year, month) {
                (Some(year), Some(month)) => scraper.crawl_month(year, month).await,
                (Some(year), None) => scraper.crawl_year(year).await,
                (None, _) => scraper.crawl_all().await,
            };
            let records = result.unwrap_or_else(|e| {
                log::error!("Error crawling: {}", e);
                process::exit(1);
            });

            print_records(&records, format);
        }
    }
}
