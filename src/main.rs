use std::env;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use dogwise::{
    Config, Finder, SearchOutcome, ZippopotamGeocoder, default_roster, extract_zip, is_valid_zip,
    load_roster, source_for,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "dogwise=warn".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <zip|text-file> [schedule] [top-n]", args[0]);
        eprintln!("  zip|text-file: a 5-digit ZIP, or a file whose text contains one");
        eprintln!("  schedule: CSV URL or path (default: $DOGWISE_SCHEDULE_URL)");
        eprintln!("  top-n: number of trainers to show (default: $DOGWISE_TOP_N or 5)");
        std::process::exit(1);
    }

    let mut config = Config::from_env();
    if let Some(schedule) = args.get(2) {
        config.schedule = Some(schedule.clone());
    }
    if let Some(top) = args.get(3) {
        config.top_n = match top.parse::<usize>() {
            Ok(n) if n > 0 => n,
            _ => {
                eprintln!("Invalid top-n '{}', using {}", top, config.top_n);
                config.top_n
            }
        };
    }

    let Some(zip) = zip_from_arg(&args[1])? else {
        eprintln!("No ZIP found in '{}'", args[1]);
        std::process::exit(1);
    };

    let roster = match &config.roster {
        Some(path) => load_roster(path)?,
        None => default_roster(),
    };
    let geocoder = ZippopotamGeocoder::new(config.geocoder_url.clone())
        .context("Failed to build geocoder client")?;
    let finder = Finder::new(roster, Arc::new(geocoder));

    if let Some(location) = &config.schedule {
        let source = source_for(location).context("Failed to build schedule source")?;
        // A missing schedule only means every trainer shows as Full.
        if let Err(e) = finder.refresh_schedule(source.as_ref()).await {
            eprintln!("Warning: schedule unavailable ({}), continuing without it", e);
        }
    }

    match finder.rank(&zip, config.top_n).await {
        SearchOutcome::Skipped => {
            eprintln!("'{}' is not a 5-digit ZIP", zip);
            std::process::exit(1);
        }
        SearchOutcome::ZipNotFound { zip } => {
            println!("{}: ZIP not found", zip);
        }
        SearchOutcome::Found {
            zip,
            origin,
            results,
        } => {
            println!("{} ({}, {})", zip, origin.city, origin.state);
            for ranked in &results {
                let c = &ranked.candidate;
                println!("\n{}", c.name);
                println!("  {}, {} - {} mi", c.city, c.state, ranked.distance_miles);
                println!("  Next available: {}", ranked.next_available);
                println!("  Directions: {}", ranked.directions_url);
            }
        }
    }

    Ok(())
}

/// A literal ZIP, or the first ZIP in the named file, or the first ZIP in the
/// argument text itself.
fn zip_from_arg(arg: &str) -> Result<Option<String>> {
    let arg = arg.trim();
    if is_valid_zip(arg) {
        return Ok(Some(arg.to_string()));
    }

    let path = Path::new(arg);
    if path.is_file() {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        return Ok(extract_zip(&text));
    }

    Ok(extract_zip(arg))
}
