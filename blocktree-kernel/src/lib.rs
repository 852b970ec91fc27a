//! Blocktree Kernel - persistence and navigation for the block editor.
//!
//! This crate contains:
//! - The async key-value store seam and its in-memory and SQLite back-ends
//! - The key shapes persisted data is stored under
//! - The navigation/path store (tree lists, breadcrumb paths, block cache)

pub mod keys;
pub mod navigation;
pub mod persistence;

mod error;

pub use error::{NavError, StoreError};
pub use navigation::{NavOutcome, Navigator, TITLE_DISPLAY_LEN};
pub use persistence::{KvStore, MemoryStore, SqliteStore};
