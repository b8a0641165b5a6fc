//! # lsmkv
//!
//! A single-node, log-structured key-value storage engine with:
//! - Write-Ahead Logging (WAL) for durability of unflushed writes
//! - A red-black tree memtable, flushed to sorted segment files
//! - A sparse index and a counting bloom filter over flushed data
//! - Pairwise segment merging
//! - Single-writer/multi-reader concurrency model
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Engine                               │
//! │            (Single Writer / Multi Reader)                    │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │     WAL     │          │  MemTable   │
//!   │  (Append)   │          │ (RB-Tree)   │
//!   └─────────────┘          └──────┬──────┘
//!                                   │ flush
//!                                   ▼
//!                           ┌───────────────┐     ┌──────────────┐
//!                           │ SegmentStore  │────▶│   Snapshot   │
//!                           │ segments      │     │ (bincode +   │
//!                           │ sparse index  │     │  crc32)      │
//!                           │ bloom filter  │     └──────────────┘
//!                           └───────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use lsmkv::{Config, Engine, Value};
//!
//! let engine = Engine::open(Config::builder().segments_dir("./data").build())?;
//! engine.set(b"k", Value::new("text/plain", "utf-8", b"hello".to_vec()));
//! assert!(engine.get(b"k")?.is_some());
//! # Ok::<(), lsmkv::LsmError>(())
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;
pub mod value;

pub mod wal;
pub mod memtable;
pub mod filter;
pub mod storage;
pub mod snapshot;
pub mod engine;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{LsmError, Result};
pub use config::Config;
pub use engine::Engine;
pub use value::Value;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of lsmkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
