//! Mode/selection model: pure state transitions, no surface access.
//!
//! Mode-specific payloads live inside [`Interaction`], so a cut payload only
//! exists in `CutBlock` and a connect source only in `ConnectToBlock`.

use blocktree_api::{BlockId, Mode, ModeSet};

use crate::selection::CutPayload;
use crate::surface::NodeId;

/// Result of [`toggle_mode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeToggle {
    pub mode: Mode,
    pub changed: bool,
}

/// Pressing the active mode again cancels back to `Normal`.
pub fn toggle_mode(current: Mode, target: Mode) -> ModeToggle {
    let mode = if current == target { Mode::Normal } else { target };
    ModeToggle {
        mode,
        changed: true,
    }
}

pub fn is_mode_allowed(mode: Mode, allowed: &ModeSet) -> bool {
    allowed.contains(mode)
}

/// The current mode together with its transient payload.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Interaction {
    #[default]
    Normal,
    TextEdit,
    Diagram,
    Chat,
    ConnectToBlock {
        source_id: BlockId,
        /// Highlighted source element.
        source_node: Option<NodeId>,
    },
    CutBlock {
        /// One payload per cut block; never empty.
        cut: Vec<CutPayload>,
        /// Highlighted source elements.
        source_nodes: Vec<NodeId>,
    },
}

impl Interaction {
    pub fn mode(&self) -> Mode {
        match self {
            Interaction::Normal => Mode::Normal,
            Interaction::TextEdit => Mode::TextEdit,
            Interaction::Diagram => Mode::Diagram,
            Interaction::Chat => Mode::Chat,
            Interaction::ConnectToBlock { .. } => Mode::ConnectToBlock,
            Interaction::CutBlock { .. } => Mode::CutBlock,
        }
    }

    /// The interaction for a mode that carries no payload.
    pub fn plain(mode: Mode) -> Option<Self> {
        match mode {
            Mode::Normal => Some(Interaction::Normal),
            Mode::TextEdit => Some(Interaction::TextEdit),
            Mode::Diagram => Some(Interaction::Diagram),
            Mode::Chat => Some(Interaction::Chat),
            Mode::ConnectToBlock | Mode::CutBlock => None,
        }
    }

    /// Elements highlighted as the source of the in-flight operation.
    pub fn source_nodes(&self) -> Vec<NodeId> {
        match self {
            Interaction::ConnectToBlock {
                source_node: Some(node),
                ..
            } => vec![*node],
            Interaction::CutBlock { source_nodes, .. } => source_nodes.clone(),
            _ => Vec::new(),
        }
    }
}

/// What is active and what is in flight.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SelectionState {
    pub interaction: Interaction,
    pub block_id: Option<BlockId>,
    pub active_block: Option<NodeId>,
    pub active_link: Option<NodeId>,
}

impl SelectionState {
    pub fn mode(&self) -> Mode {
        self.interaction.mode()
    }

    pub fn cut(&self) -> Option<&[CutPayload]> {
        match &self.interaction {
            Interaction::CutBlock { cut, .. } => Some(cut),
            _ => None,
        }
    }

    pub fn connect_source(&self) -> Option<&BlockId> {
        match &self.interaction {
            Interaction::ConnectToBlock { source_id, .. } => Some(source_id),
            _ => None,
        }
    }
}

/// Reset everything active and in flight, back to `Normal`.
pub fn clear_selection(_state: SelectionState) -> SelectionState {
    SelectionState {
        interaction: Interaction::Normal,
        block_id: None,
        active_block: None,
        active_link: None,
    }
}
