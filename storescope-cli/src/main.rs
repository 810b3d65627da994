//! storescope diagnostic tool
//!
//! Inspects packed scope identifiers and exercises the coordination gate.
//!
//! Usage:
//!   storescope encode stores 3
//!   storescope decode 67108867
//!   storescope lowest stores:2 websites:1
//!   storescope parents stores:1 websites:2
//!   storescope stress --keys 128 --workers 16

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::time::Duration;
use storescope_cli::{Description, MAX_STRESS_KEYS, StressOptions, parse_type_id, stress};
use storescope_scope::{Scope, TypeId, lowest, target_and_parents};
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "storescope")]
#[command(about = "Inspect scope identifiers and stress the coordination gate")]
struct Args {
    /// Enable verbose debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Pack a scope name and numeric ID
    Encode {
        scope: Scope,
        #[arg(allow_negative_numbers = true)]
        id: i64,
        /// Return the zero sentinel instead of failing on invalid input
        #[arg(long)]
        lossy: bool,
    },
    /// Unpack a raw decimal identifier
    Decode { value: TypeId },
    /// Reduce identifiers (scope:id, scope name, or raw value) to one scope
    Lowest {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Show the lookup target and its fallback chain
    Parents { ids: Vec<String> },
    /// Hammer the gate from many threads
    Stress {
        /// Distinct keys
        #[arg(
            long,
            default_value = "64",
            value_parser = clap::value_parser!(u64).range(1..=MAX_STRESS_KEYS as u64)
        )]
        keys: u64,
        /// Worker threads
        #[arg(long, default_value = "8")]
        workers: usize,
        /// Simulated work per winning call (ms)
        #[arg(long, default_value = "2")]
        work_ms: u64,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    match args.command {
        Command::Encode { scope, id, lossy } => {
            let type_id = if lossy {
                TypeId::pack(scope, id)
            } else {
                TypeId::checked_pack(scope, id)
                    .with_context(|| format!("cannot pack {scope}:{id}"))?
            };
            print_description(type_id, args.json)?;
        }
        Command::Decode { value } => {
            if let Err(err) = value.validate() {
                warn!(%err, "identifier does not validate");
            }
            print_description(value, args.json)?;
        }
        Command::Lowest { ids } => {
            let ids = parse_all(&ids)?;
            let found = lowest(&ids).context("identifiers share no single scope")?;
            print_description(found, args.json)?;
        }
        Command::Parents { ids } => {
            let ids = parse_all(&ids)?;
            let (target, parents) = target_and_parents(&ids);
            if args.json {
                let chain: Vec<Description> = std::iter::once(target)
                    .chain(parents)
                    .map(Description::of)
                    .collect();
                println!("{}", serde_json::to_string_pretty(&chain)?);
            } else {
                println!("target  {}", Description::of(target));
                for parent in parents {
                    println!("parent  {}", Description::of(parent));
                }
            }
        }
        Command::Stress {
            keys,
            workers,
            work_ms,
        } => {
            info!(keys, workers, work_ms, "starting gate stress run");
            let report = stress(&StressOptions {
                keys: usize::try_from(keys)?,
                workers,
                work: Duration::from_millis(work_ms),
            })?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("keys      {}", report.keys);
                println!("workers   {}", report.workers);
                println!("winners   {}", report.winners);
                println!("waited    {}", report.waited);
                println!("skipped   {}", report.skipped);
                println!("elapsed   {} ms", report.elapsed_ms);
            }
            if workers > 0 && !report.is_consistent() {
                bail!("gate admitted {} winners for {} keys", report.winners, report.keys);
            }
        }
    }
    Ok(())
}

fn parse_all(inputs: &[String]) -> Result<Vec<TypeId>> {
    inputs
        .iter()
        .map(|input| parse_type_id(input).with_context(|| format!("bad identifier {input:?}")))
        .collect()
}

fn print_description(type_id: TypeId, json: bool) -> Result<()> {
    let description = Description::of(type_id);
    if json {
        println!("{}", serde_json::to_string_pretty(&description)?);
    } else {
        println!("{description}");
    }
    Ok(())
}
