//! Intent events emitted by the editor core to its collaborators (renderer, API layer).

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Hsl, PathEntry, PathLink};

/// Separator between a wrapper prefix and the real id in composite DOM ids.
pub const ID_SEPARATOR: char = '*';

/// Strip an optional `"prefix*"` from a composite id, keeping the last segment.
pub fn real_id(composite: &str) -> &str {
    match composite.rsplit_once(ID_SEPARATOR) {
        Some((_, id)) => id,
        None => composite,
    }
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id!(
    /// Unique identifier for a block in the content tree.
    BlockId
);
string_id!(
    /// Identifier of one content tree owned by a user.
    TreeId
);
string_id!(
    /// Identifier of the user whose trees and paths are persisted.
    UserId
);

impl BlockId {
    /// Build a block id from a possibly prefixed DOM id (`"wrapper*b1"` -> `b1`).
    pub fn from_dom_id(dom_id: &str) -> Self {
        Self(real_id(dom_id).to_string())
    }
}

/// Popups the core can ask the UI layer to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PopupKind {
    NewBlock,
    EditTitle,
    EditText,
    HotkeyEditor,
}

/// A UI button as the renderer should draw it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonView {
    pub command_id: String,
    pub container: String,
    pub label: String,
    pub icon: Vec<String>,
    /// Display form of the effective hotkey, if the command has one.
    pub hotkey: Option<String>,
}

/// Fire-and-forget intents consumed by the renderer and the API layer.
///
/// The core never inspects delivery success.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EditorEvent {
    /// Render the given block as the current screen.
    OpenBlock {
        id: BlockId,
        parent_hsl: Option<Hsl>,
        is_iframe: bool,
        links: Vec<PathLink>,
    },

    CreateBlock {
        parent_id: BlockId,
        title: String,
    },

    /// Move a block under a new parent, optionally before a sibling.
    MoveBlock {
        block_id: BlockId,
        old_parent_id: BlockId,
        new_parent_id: BlockId,
        before: Option<BlockId>,
    },

    /// Bulk move of a multi-selection in one request.
    MoveBlocks {
        moves: Vec<MoveRequest>,
    },

    /// Paste a cut block as a link under a new parent.
    CreateLink {
        block_id: BlockId,
        new_parent_id: BlockId,
        before: Option<BlockId>,
    },

    ConnectBlocks {
        source_id: BlockId,
        target_id: BlockId,
    },

    DeleteTreeBlock {
        block_id: BlockId,
    },

    DeleteTreeBlocks {
        block_ids: Vec<BlockId>,
    },

    CopyBlocks {
        block_ids: Vec<BlockId>,
    },

    TitleUpdate {
        block_id: BlockId,
        title: String,
    },

    TextUpdate {
        block_id: BlockId,
        text: String,
    },

    OpenPopup {
        kind: PopupKind,
        block_id: Option<BlockId>,
    },

    /// The breadcrumb path changed; `focus` is the block to re-focus, if any.
    PathChanged {
        tree_id: TreeId,
        path: Vec<PathEntry>,
        focus: Option<BlockId>,
    },

    TreeSwitched {
        tree_id: TreeId,
    },

    /// Hotkeys were re-bound; buttons must be redrawn.
    ButtonsChanged {
        buttons: Vec<ButtonView>,
    },

    DiagramToggled {
        block_id: Option<BlockId>,
        enabled: bool,
    },

    ChatToggled {
        block_id: Option<BlockId>,
        enabled: bool,
    },

    /// Non-fatal user feedback (rejected navigation, invalid hotkeys).
    Notice {
        message: String,
    },
}

/// One element of a bulk move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRequest {
    pub block_id: BlockId,
    pub old_parent_id: BlockId,
    pub new_parent_id: BlockId,
    pub before: Option<BlockId>,
}
