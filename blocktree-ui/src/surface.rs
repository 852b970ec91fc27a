//! The rendered node tree the context targets.
//!
//! The renderer owns the nodes; the context only holds [`NodeId`]s into them.
//! Nodes carry an explicit kind instead of marker attributes, and parent
//! pointers replace ancestor searches over a document.

use std::collections::HashMap;

use blocktree_api::{BlockId, Hsl};

use crate::constants::{INDICATOR_PREFIX, ROOT_CONTAINER_ID};

/// Index of a node in a [`Surface`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// The root container; holds the top-level blocks of the current screen.
    Container,
    Block,
    /// Wrapper around the rendering of a linked block.
    Link { target: BlockId },
    /// Cut-mode drop marker placed just before `before`.
    Indicator { before: NodeId },
}

/// Visual state classes toggled by the context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Marker {
    Active,
    Selected,
}

/// Plain-data view of a node, as the id-extraction helpers need it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementInfo {
    pub dom_id: String,
    /// Present on link wrappers: the block the link points at.
    pub link_target: Option<BlockId>,
    pub parent_dom_id: Option<String>,
}

impl ElementInfo {
    pub fn new(dom_id: impl Into<String>) -> Self {
        Self {
            dom_id: dom_id.into(),
            link_target: None,
            parent_dom_id: None,
        }
    }

    pub fn with_parent(mut self, parent_dom_id: impl Into<String>) -> Self {
        self.parent_dom_id = Some(parent_dom_id.into());
        self
    }

    pub fn with_link_target(mut self, target: impl Into<BlockId>) -> Self {
        self.link_target = Some(target.into());
        self
    }
}

/// The renderer seam.
pub trait Surface {
    fn root(&self) -> NodeId;

    fn kind(&self, node: NodeId) -> Option<&NodeKind>;

    fn dom_id(&self, node: NodeId) -> Option<&str>;

    fn parent(&self, node: NodeId) -> Option<NodeId>;

    fn children(&self, node: NodeId) -> &[NodeId];

    fn find_by_dom_id(&self, dom_id: &str) -> Option<NodeId>;

    fn set_marker(&mut self, node: NodeId, marker: Marker, on: bool);

    fn has_marker(&self, node: NodeId, marker: Marker) -> bool;

    /// Insert a before-indicator as the previous sibling of `node`.
    fn insert_indicator_before(&mut self, node: NodeId) -> Option<NodeId>;

    /// Detach and drop a node with its subtree.
    fn remove(&mut self, node: NodeId);

    /// Display color of a block, if the renderer computed one.
    fn hsl(&self, _node: NodeId) -> Option<Hsl> {
        None
    }

    fn element(&self, node: NodeId) -> Option<ElementInfo> {
        let dom_id = self.dom_id(node)?.to_string();
        let link_target = match self.kind(node)? {
            NodeKind::Link { target } => Some(target.clone()),
            _ => None,
        };
        let parent_dom_id = self
            .parent(node)
            .and_then(|p| self.dom_id(p))
            .map(str::to_string);
        Some(ElementInfo {
            dom_id,
            link_target,
            parent_dom_id,
        })
    }

    fn is_block(&self, node: NodeId) -> bool {
        matches!(self.kind(node), Some(NodeKind::Block))
    }

    /// Nearest ancestor-or-self that is a block.
    fn closest_block(&self, node: NodeId) -> Option<NodeId> {
        let mut current = node;
        loop {
            if self.is_block(current) {
                return Some(current);
            }
            current = self.parent(current)?;
        }
    }

    /// The link wrapper directly around a block, if any.
    fn link_of(&self, block: NodeId) -> Option<NodeId> {
        let parent = self.parent(block)?;
        matches!(self.kind(parent), Some(NodeKind::Link { .. })).then_some(parent)
    }

    /// The block a node stands for when targeted by keyboard navigation.
    fn focusable(&self, node: NodeId) -> Option<NodeId> {
        match self.kind(node)? {
            NodeKind::Block => Some(node),
            NodeKind::Link { .. } => self
                .children(node)
                .iter()
                .copied()
                .find(|&c| self.is_block(c)),
            _ => None,
        }
    }

    /// The implicit root block: first child of the root container.
    fn first_root_child(&self) -> Option<NodeId> {
        self.children(self.root())
            .iter()
            .copied()
            .find_map(|c| self.focusable(c))
    }

    /// The first block whose DOM id carries the given real id.
    fn find_block(&self, id: &BlockId) -> Option<NodeId>;

    fn sibling(&self, node: NodeId, offset: isize) -> Option<NodeId> {
        let parent = self.parent(node)?;
        let siblings: Vec<NodeId> = self
            .children(parent)
            .iter()
            .copied()
            .filter(|&s| s == node || self.focusable(s).is_some())
            .collect();
        let index = siblings.iter().position(|&s| s == node)?;
        let target = index.checked_add_signed(offset)?;
        siblings.get(target).copied()
    }
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    dom_id: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    active: bool,
    selected: bool,
    hsl: Option<Hsl>,
}

/// Arena-backed [`Surface`] used by headless drivers and tests.
///
/// Slots freed by [`Surface::remove`] are reused, so a handle to a removed
/// node must not be kept.
#[derive(Debug, Clone)]
pub struct NodeArena {
    nodes: Vec<Option<NodeData>>,
    free: Vec<usize>,
    by_dom_id: HashMap<String, NodeId>,
}

impl NodeArena {
    pub fn new() -> Self {
        let mut arena = Self {
            nodes: Vec::new(),
            free: Vec::new(),
            by_dom_id: HashMap::new(),
        };
        arena.push(NodeKind::Container, ROOT_CONTAINER_ID.to_string(), None);
        arena
    }

    fn push(&mut self, kind: NodeKind, dom_id: String, parent: Option<NodeId>) -> NodeId {
        let data = NodeData {
            kind,
            dom_id: dom_id.clone(),
            parent,
            children: Vec::new(),
            active: false,
            selected: false,
            hsl: None,
        };
        let id = match self.free.pop() {
            Some(slot) => {
                self.nodes[slot] = Some(data);
                NodeId(slot)
            }
            None => {
                self.nodes.push(Some(data));
                NodeId(self.nodes.len() - 1)
            }
        };
        self.by_dom_id.insert(dom_id, id);
        id
    }

    fn node(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        self.nodes.get_mut(id.0).and_then(Option::as_mut)
    }

    fn append(&mut self, parent: NodeId, kind: NodeKind, dom_id: String) -> NodeId {
        let id = self.push(kind, dom_id, Some(parent));
        if let Some(p) = self.node_mut(parent) {
            p.children.push(id);
        }
        id
    }

    /// Append a block element with a `"prefix*id"` DOM id.
    pub fn add_block(&mut self, parent: NodeId, dom_id: impl Into<String>) -> NodeId {
        self.append(parent, NodeKind::Block, dom_id.into())
    }

    /// Append a link wrapper pointing at `target`.
    pub fn add_link(
        &mut self,
        parent: NodeId,
        dom_id: impl Into<String>,
        target: impl Into<BlockId>,
    ) -> NodeId {
        self.append(
            parent,
            NodeKind::Link {
                target: target.into(),
            },
            dom_id.into(),
        )
    }

    pub fn set_hsl(&mut self, node: NodeId, hsl: Hsl) {
        if let Some(n) = self.node_mut(node) {
            n.hsl = Some(hsl);
        }
    }

    /// Number of live nodes, including the root container.
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live indicator nodes.
    pub fn indicators(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(i, n)| match n {
                Some(NodeData {
                    kind: NodeKind::Indicator { .. },
                    ..
                }) => Some(NodeId(i)),
                _ => None,
            })
            .collect()
    }
}

impl Default for NodeArena {
    fn default() -> Self {
        Self::new()
    }
}

impl Surface for NodeArena {
    fn root(&self) -> NodeId {
        NodeId(0)
    }

    fn kind(&self, node: NodeId) -> Option<&NodeKind> {
        self.node(node).map(|n| &n.kind)
    }

    fn dom_id(&self, node: NodeId) -> Option<&str> {
        self.node(node).map(|n| n.dom_id.as_str())
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node).and_then(|n| n.parent)
    }

    fn children(&self, node: NodeId) -> &[NodeId] {
        self.node(node).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    fn find_by_dom_id(&self, dom_id: &str) -> Option<NodeId> {
        self.by_dom_id
            .get(dom_id)
            .copied()
            .filter(|&id| self.node(id).is_some())
    }

    fn find_block(&self, id: &BlockId) -> Option<NodeId> {
        self.nodes.iter().enumerate().find_map(|(i, n)| match n {
            Some(n) if n.kind == NodeKind::Block && BlockId::from_dom_id(&n.dom_id) == *id => {
                Some(NodeId(i))
            }
            _ => None,
        })
    }

    fn set_marker(&mut self, node: NodeId, marker: Marker, on: bool) {
        if let Some(n) = self.node_mut(node) {
            match marker {
                Marker::Active => n.active = on,
                Marker::Selected => n.selected = on,
            }
        }
    }

    fn has_marker(&self, node: NodeId, marker: Marker) -> bool {
        self.node(node).is_some_and(|n| match marker {
            Marker::Active => n.active,
            Marker::Selected => n.selected,
        })
    }

    fn insert_indicator_before(&mut self, node: NodeId) -> Option<NodeId> {
        let parent = self.parent(node)?;
        let real = BlockId::from_dom_id(self.dom_id(node)?);
        let id = self.push(
            NodeKind::Indicator { before: node },
            format!("{INDICATOR_PREFIX}*{real}"),
            Some(parent),
        );
        let siblings = &mut self.node_mut(parent)?.children;
        let index = siblings.iter().position(|&s| s == node)?;
        siblings.insert(index, id);
        Some(id)
    }

    fn remove(&mut self, node: NodeId) {
        if node == self.root() {
            return;
        }
        if let Some(parent) = self.parent(node) {
            if let Some(p) = self.node_mut(parent) {
                p.children.retain(|&c| c != node);
            }
        }
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            if let Some(data) = self.nodes.get_mut(id.0).and_then(Option::take) {
                if self.by_dom_id.get(&data.dom_id) == Some(&id) {
                    self.by_dom_id.remove(&data.dom_id);
                }
                stack.extend(data.children);
                self.free.push(id.0);
            }
        }
    }

    fn hsl(&self, node: NodeId) -> Option<Hsl> {
        self.node(node).and_then(|n| n.hsl)
    }
}
