#![forbid(unsafe_code)]

//! Command-line front end for the R-tree engine.
//!
//! Grounded on the teacher's `nexuslite.rs` binary: a `clap` derive CLI with
//! one subcommand per engine operation, opening the store fresh on each
//! invocation (no long-lived daemon/REPL, unlike the teacher's shell mode --
//! this spec has no equivalent interactive surface).

use clap::{Parser, Subcommand};
use geo_rtreed::{Engine, Point, RtreeConfig, SpatialData};
use rand::Rng;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "geoidx", about = "Disk-backed geographic R-tree index")]
struct Cli {
    /// Directory the index lives in.
    #[arg(long, default_value = "./geoidx-db")]
    db: PathBuf,

    /// Minimum entries per node before a delete triggers condensing.
    #[arg(long, default_value_t = 2)]
    min_entries: usize,

    /// Maximum entries per node before an insert triggers a split.
    #[arg(long, default_value_t = 25)]
    max_entries: usize,

    /// Largest payload, in bytes, any inserted record may carry.
    #[arg(long, default_value_t = 256)]
    max_payload_bytes: usize,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Insert one point with an attached payload string.
    Insert { lat: f64, lon: f64, payload: String },
    /// Delete the record carrying the given payload string.
    Delete { lat: f64, lon: f64, payload: String },
    /// Find the k nearest records to a point.
    Nearest { lat: f64, lon: f64, k: usize },
    /// Find every record within `radius_km` of a point.
    Radius { lat: f64, lon: f64, radius_km: f64 },
    /// Print the number of records and the current tree height.
    Stats,
    /// Seed `count` random points in a bounding box and report timing,
    /// in the spirit of the original benchmark harness this crate is
    /// descended from.
    Demo {
        #[arg(long, default_value_t = 1_000)]
        count: usize,
        #[arg(long, default_value_t = -7.818711242232534)]
        min_lat: f64,
        #[arg(long, default_value_t = -7.767187043571421)]
        max_lat: f64,
        #[arg(long, default_value_t = 110.32382482774563)]
        min_lon: f64,
        #[arg(long, default_value_t = 110.42872530361015)]
        max_lon: f64,
    },
}

fn main() -> ExitCode {
    geo_rtreed::utils::logger::configure_from_env();
    let cli = Cli::parse();
    let config = RtreeConfig::new(cli.db.clone(), cli.min_entries, cli.max_entries, cli.max_payload_bytes);

    match run(&config, cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(config: &RtreeConfig, command: Command) -> geo_rtreed::Result<()> {
    let mut engine = Engine::open(config)?;

    match command {
        Command::Insert { lat, lon, payload } => {
            engine.insert(SpatialData::new(Point::new(lat, lon), payload.into_bytes()))?;
            println!("inserted");
        }
        Command::Delete { lat, lon, payload } => {
            let obj = SpatialData::new(Point::new(lat, lon), payload.into_bytes());
            let found = engine.delete(&obj)?;
            println!("{}", if found { "deleted" } else { "not found" });
        }
        Command::Nearest { lat, lon, k } => {
            let results = engine.nearest_neighbors(k, Point::new(lat, lon))?;
            for r in &results {
                println!("({:.6}, {:.6}) {}", r.location.lat, r.location.lon, String::from_utf8_lossy(&r.data));
            }
        }
        Command::Radius { lat, lon, radius_km } => {
            let results = engine.search_within_radius(Point::new(lat, lon), radius_km)?;
            println!("found {} results", results.len());
            for r in &results {
                println!("({:.6}, {:.6}) {}", r.location.lat, r.location.lon, String::from_utf8_lossy(&r.data));
            }
        }
        Command::Stats => {
            println!("size: {}", engine.len());
            println!("height: {}", engine.height());
        }
        Command::Demo { count, min_lat, max_lat, min_lon, max_lon } => {
            let mut rng = rand::rng();
            let start = std::time::Instant::now();
            for i in 0..count {
                let lat = rng.random_range(min_lat..max_lat);
                let lon = rng.random_range(min_lon..max_lon);
                engine.insert(SpatialData::new(Point::new(lat, lon), b"demo".to_vec()))?;
                if (i + 1) % 1000 == 0 {
                    println!("{:?} for {} records", start.elapsed(), i + 1);
                }
            }
            println!("inserted {count} records in {:?}", start.elapsed());
        }
    }

    engine.close()?;
    Ok(())
}
