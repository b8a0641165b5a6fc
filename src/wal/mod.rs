//! Write-Ahead Log (WAL) Module
//!
//! Provides durability guarantees through append-only logging.
//!
//! ## Responsibilities
//! - Append every accepted write before it reaches the memtable
//! - fsync each append: a write is durable once `append` returns
//! - Truncate exactly when the memtable it mirrors has been flushed
//! - Crash recovery and replay
//!
//! ## File Format
//! Same line encoding as segments, in arrival order (not sorted):
//! ```text
//! ┌──────────────────────────────────────────┐
//! │ <key hex>,<value json>\n                 │
//! │ <key hex>,<value json>\n                 │
//! │ ...                                      │
//! └──────────────────────────────────────────┘
//! ```

mod entry;
mod writer;
mod reader;
mod recovery;

pub use entry::WalEntry;
pub use writer::WalWriter;
pub use reader::{WalLine, WalReader};
pub use recovery::{RecoveryResult, WalRecovery};
