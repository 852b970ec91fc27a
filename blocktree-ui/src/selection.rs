//! Selection actions behind cut, copy and connect.
//!
//! Pure functions over ids: no surface access, no I/O. Each returns a
//! `Result` describing whether the step may happen; callers check it before
//! touching the context.

use blocktree_api::{real_id, BlockId, MoveRequest};
use thiserror::Error;

use crate::constants::ROOT_CONTAINER_ID;
use crate::surface::ElementInfo;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("No block id")]
    MissingBlockId,

    #[error("No parent id")]
    MissingParentId,

    #[error("Cannot cut the root block")]
    RootNotCuttable,

    #[error("No cut in progress")]
    NoCutInProgress,

    #[error("No target block")]
    MissingTarget,

    #[error("No source block")]
    MissingSource,

    #[error("Cannot connect a block to itself")]
    SelfConnection,

    #[error("Cannot move a block into itself")]
    SelfMove,
}

/// An in-flight cut: the source and, once hovered, the destination guess.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CutPayload {
    pub block_id: BlockId,
    pub old_parent_id: BlockId,
    pub new_parent_id: Option<BlockId>,
    pub before: Option<BlockId>,
}

/// A validated source/target pair for a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub source_id: BlockId,
    pub target_id: BlockId,
}

fn present(id: Option<&str>) -> Option<&str> {
    id.filter(|id| !id.is_empty())
}

/// Strip a `"wrapper*id"` composite down to the bare id.
pub fn copy_block_id(id: Option<&str>) -> Result<BlockId, SelectionError> {
    let id = present(id).ok_or(SelectionError::MissingBlockId)?;
    Ok(BlockId::from_dom_id(id))
}

pub fn start_cut_block(
    block_id: Option<&str>,
    parent_id: Option<&str>,
) -> Result<CutPayload, SelectionError> {
    let block_id = present(block_id).ok_or(SelectionError::MissingBlockId)?;
    let parent_id = present(parent_id).ok_or(SelectionError::MissingParentId)?;
    if parent_id == ROOT_CONTAINER_ID {
        return Err(SelectionError::RootNotCuttable);
    }
    Ok(CutPayload {
        block_id: BlockId::from_dom_id(block_id),
        old_parent_id: BlockId::from_dom_id(parent_id),
        new_parent_id: None,
        before: None,
    })
}

/// Merge the destination into the cut; the result is the move request.
pub fn complete_cut_block(
    cut: Option<&CutPayload>,
    new_parent_id: Option<&str>,
    before: Option<&str>,
) -> Result<MoveRequest, SelectionError> {
    let cut = cut.ok_or(SelectionError::NoCutInProgress)?;
    let new_parent_id = present(new_parent_id).ok_or(SelectionError::MissingParentId)?;
    let new_parent_id = BlockId::from_dom_id(new_parent_id);
    if new_parent_id == cut.block_id {
        return Err(SelectionError::SelfMove);
    }
    Ok(MoveRequest {
        block_id: cut.block_id.clone(),
        old_parent_id: cut.old_parent_id.clone(),
        new_parent_id,
        before: present(before).map(BlockId::from_dom_id),
    })
}

pub fn start_connect_blocks(source_id: Option<&str>) -> Result<BlockId, SelectionError> {
    let source_id = present(source_id).ok_or(SelectionError::MissingSource)?;
    Ok(BlockId::from_dom_id(source_id))
}

pub fn complete_connect_blocks(
    source_id: Option<&str>,
    target_id: Option<&str>,
) -> Result<Connection, SelectionError> {
    let source_id = present(source_id).ok_or(SelectionError::MissingSource)?;
    let target_id = present(target_id).ok_or(SelectionError::MissingTarget)?;
    if real_id(source_id) == real_id(target_id) {
        return Err(SelectionError::SelfConnection);
    }
    Ok(Connection {
        source_id: BlockId::from_dom_id(source_id),
        target_id: BlockId::from_dom_id(target_id),
    })
}

/// The block an element stands for: a link's target, else its own id.
pub fn extract_block_id(
    element: Option<&ElementInfo>,
    link: Option<&ElementInfo>,
) -> Option<BlockId> {
    if let Some(target) = link.and_then(|l| l.link_target.clone()) {
        return Some(target);
    }
    element.map(|e| BlockId::from_dom_id(&e.dom_id))
}

/// The parent block of an element; `None` directly under the root container.
pub fn extract_parent_id(element: &ElementInfo) -> Option<BlockId> {
    let parent = element.parent_dom_id.as_deref()?;
    if parent == ROOT_CONTAINER_ID {
        return None;
    }
    Some(BlockId::from_dom_id(parent))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_strips_wrapper() {
        assert_eq!(copy_block_id(Some("wrapper*b1")), Ok(BlockId::new("b1")));
        assert_eq!(copy_block_id(Some("b1")), Ok(BlockId::new("b1")));
        assert_eq!(copy_block_id(None), Err(SelectionError::MissingBlockId));
        assert_eq!(copy_block_id(Some("")), Err(SelectionError::MissingBlockId));
    }

    #[test]
    fn start_cut_rejects_missing_ids_and_root() {
        assert_eq!(
            start_cut_block(None, Some("p1")),
            Err(SelectionError::MissingBlockId)
        );
        assert_eq!(
            start_cut_block(Some("b1"), None),
            Err(SelectionError::MissingParentId)
        );
        assert_eq!(
            start_cut_block(Some("b1"), Some(ROOT_CONTAINER_ID)),
            Err(SelectionError::RootNotCuttable)
        );
    }

    #[test]
    fn cut_lifecycle_normalizes_ids() {
        let cut = start_cut_block(Some("wrapper*b1"), Some("wrapper*p1")).unwrap();
        assert_eq!(cut.block_id, BlockId::new("b1"));
        assert_eq!(cut.old_parent_id, BlockId::new("p1"));

        let request = complete_cut_block(Some(&cut), Some("wrapper*p2"), None).unwrap();
        assert_eq!(request.new_parent_id, BlockId::new("p2"));
        assert_eq!(request.block_id, BlockId::new("b1"));
        assert_eq!(request.old_parent_id, BlockId::new("p1"));
        assert_eq!(request.before, None);
    }

    #[test]
    fn complete_cut_carries_before() {
        let cut = start_cut_block(Some("b1"), Some("p1")).unwrap();
        let request = complete_cut_block(Some(&cut), Some("p2"), Some("w*b7")).unwrap();
        assert_eq!(request.before, Some(BlockId::new("b7")));
    }

    #[test]
    fn complete_cut_requires_cut_and_parent() {
        assert_eq!(
            complete_cut_block(None, Some("p2"), None),
            Err(SelectionError::NoCutInProgress)
        );
        let cut = start_cut_block(Some("b1"), Some("p1")).unwrap();
        assert_eq!(
            complete_cut_block(Some(&cut), None, None),
            Err(SelectionError::MissingParentId)
        );
        assert_eq!(
            complete_cut_block(Some(&cut), Some("w*b1"), None),
            Err(SelectionError::SelfMove)
        );
    }

    #[test]
    fn connect_rejects_self_connection() {
        for id in ["b1", "x", "w*b1"] {
            assert_eq!(
                complete_connect_blocks(Some(id), Some(id)),
                Err(SelectionError::SelfConnection)
            );
        }
        assert_eq!(
            complete_connect_blocks(Some("a*b1"), Some("b*b1")),
            Err(SelectionError::SelfConnection)
        );
    }

    #[test]
    fn connect_pair() {
        assert_eq!(start_connect_blocks(Some("w*b1")), Ok(BlockId::new("b1")));
        assert_eq!(start_connect_blocks(None), Err(SelectionError::MissingSource));

        let pair = complete_connect_blocks(Some("b1"), Some("w*b2")).unwrap();
        assert_eq!(pair.source_id, BlockId::new("b1"));
        assert_eq!(pair.target_id, BlockId::new("b2"));
        assert_eq!(
            complete_connect_blocks(Some("b1"), None),
            Err(SelectionError::MissingTarget)
        );
    }

    #[test]
    fn extract_block_id_prefers_link_target() {
        let element = ElementInfo::new("lw*b9");
        let link = ElementInfo::new("link*l1").with_link_target("b2");
        assert_eq!(
            extract_block_id(Some(&element), Some(&link)),
            Some(BlockId::new("b2"))
        );
        assert_eq!(
            extract_block_id(Some(&element), None),
            Some(BlockId::new("b9"))
        );
        assert_eq!(extract_block_id(None, None), None);
    }

    #[test]
    fn extract_block_id_without_separator_is_identity() {
        for id in ["b1", "0", "some-long-id"] {
            assert_eq!(
                extract_block_id(Some(&ElementInfo::new(id)), None),
                Some(BlockId::new(id))
            );
        }
        assert_eq!(
            extract_block_id(Some(&ElementInfo::new("pfx*real")), None),
            Some(BlockId::new("real"))
        );
    }

    #[test]
    fn extract_parent_id_maps_root_to_none() {
        let top = ElementInfo::new("w*b1").with_parent(ROOT_CONTAINER_ID);
        assert_eq!(extract_parent_id(&top), None);

        let nested = ElementInfo::new("w*b2").with_parent("w*b1");
        assert_eq!(extract_parent_id(&nested), Some(BlockId::new("b1")));

        assert_eq!(extract_parent_id(&ElementInfo::new("orphan")), None);
    }
}
