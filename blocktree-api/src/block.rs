//! Block representation and breadcrumb path entries.

use serde::{Deserialize, Serialize};

use crate::BlockId;

/// An HSL color triple used to tint breadcrumb entries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hsl(pub f32, pub f32, pub f32);

/// Cached snapshot of a block, as served by the API layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    pub title: String,
    pub parent_id: Option<BlockId>,
    #[serde(default)]
    pub children: Vec<BlockId>,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl Block {
    pub fn new(id: impl Into<BlockId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            parent_id: None,
            children: Vec::new(),
            data: serde_json::Value::Null,
        }
    }

    pub fn with_parent(mut self, parent: impl Into<BlockId>) -> Self {
        self.parent_id = Some(parent.into());
        self
    }
}

/// One hop of a link chain: the link block and the block it points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathLink {
    pub link_id: BlockId,
    pub link_source: BlockId,
}

/// One breadcrumb in a tree's path. The last entry is the current screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathEntry {
    pub block_id: BlockId,
    /// Title truncated for display.
    pub screen_name: String,
    pub color: Option<Hsl>,
    #[serde(default)]
    pub links: Vec<PathLink>,
}
