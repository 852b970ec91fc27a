//! Blocktree API - Shared types and intent events for the block editor core.

mod block;
mod event;
mod mode;

pub use block::*;
pub use event::*;
pub use mode::*;
