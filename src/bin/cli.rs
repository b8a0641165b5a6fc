//! lsmkv CLI
//!
//! Command-line interface operating directly on a local segments directory.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use lsmkv::{Config, Engine, Value};
use tracing_subscriber::{fmt, EnvFilter};

/// lsmkv CLI
#[derive(Parser, Debug)]
#[command(name = "lsmkv-cli")]
#[command(about = "CLI for the lsmkv storage engine")]
#[command(version)]
struct Args {
    /// Segments directory
    #[arg(short, long, default_value = "./lsmkv_data")]
    dir: String,

    /// Flush threshold in bytes
    #[arg(short = 't', long, default_value = "1000000")]
    flush_threshold: usize,

    /// Sparse index sparsity factor
    #[arg(short, long, default_value = "100")]
    sparsity_factor: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a value by key
    Get {
        /// The key, hex-encoded
        key: String,
    },

    /// Set a key-value pair
    Set {
        /// The key, hex-encoded
        key: String,

        /// The payload, hex-encoded
        payload: String,

        #[arg(long, default_value = "application/octet-stream")]
        content_type: String,

        #[arg(long, default_value = "binary")]
        encoding: String,
    },

    /// Flush the memtable to a new segment
    Flush,

    /// Merge segment NEWER into the adjacent older segment OLDER
    Merge { older: String, newer: String },

    /// Rebuild the sparse index and the membership filter
    Reindex,

    /// Print engine statistics
    Stats,
}

fn main() -> ExitCode {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,lsmkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = Config::builder()
        .segments_dir(&args.dir)
        .flush_threshold(args.flush_threshold)
        .sparsity_factor(args.sparsity_factor)
        .build();

    let engine = match Engine::open(config) {
        Ok(e) => e,
        Err(e) => {
            tracing::error!("Failed to open engine: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(&engine, args.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(engine: &Engine, command: Commands) -> lsmkv::Result<()> {
    match command {
        Commands::Get { key } => {
            let key = parse_hex(&key)?;
            match engine.get(&key)? {
                Some(value) => println!("{}", value.to_json()?),
                None => println!("(nil)"),
            }
        }
        Commands::Set {
            key,
            payload,
            content_type,
            encoding,
        } => {
            let key = parse_hex(&key)?;
            let value = Value::new(content_type, encoding, parse_hex(&payload)?);
            engine.try_set(&key, value)?;
            println!("OK");
        }
        Commands::Flush => match engine.flush()? {
            Some(meta) => println!("flushed {} ({} records)", meta.name, meta.record_count),
            None => println!("memtable empty"),
        },
        Commands::Merge { older, newer } => {
            let meta = engine.merge(&older, &newer)?;
            println!("merged into {} ({} records)", meta.name, meta.record_count);
        }
        Commands::Reindex => {
            engine.repopulate_index()?;
            engine.repopulate_filter()?;
            println!("index entries: {}", engine.sparse_index_len());
        }
        Commands::Stats => {
            println!("lsmkv v{}", lsmkv::VERSION);
            println!("segments_dir:     {}", engine.segments_dir().display());
            println!("next segment:     {}", engine.current_segment_name());
            println!("memtable keys:    {}", engine.memtable_len());
            println!("memtable bytes:   {}", engine.memtable_bytes());
            println!("flush threshold:  {}", engine.threshold());
            println!("sparsity:         {}", engine.sparsity());
            println!("index entries:    {}", engine.sparse_index_len());
            for meta in engine.segments() {
                println!(
                    "  {:<16} {:>8} records {:>10} bytes  [{} .. {}]",
                    meta.name,
                    meta.record_count,
                    meta.size_bytes,
                    hex::encode(&meta.first_key),
                    hex::encode(&meta.last_key)
                );
            }
        }
    }
    Ok(())
}

fn parse_hex(s: &str) -> lsmkv::Result<Vec<u8>> {
    hex::decode(s).map_err(|e| lsmkv::LsmError::Config(format!("invalid hex {:?}: {}", s, e)))
}
