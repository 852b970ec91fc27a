//! Navigation and path store: per-user tree lists and per-(tree, user)
//! breadcrumb paths over a [`KvStore`].
//!
//! Every read-modify-write sequence holds a per-key lock for its whole
//! duration, so two rapid navigation commands against the same path are
//! applied one after the other instead of losing an update.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use blocktree_api::{Block, BlockId, HotkeyMap, Hsl, PathEntry, PathLink, TreeId, UserId};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::persistence::{get_json, set_json, KvStore};
use crate::{keys, NavError};

/// Maximum number of title characters kept in a breadcrumb.
pub const TITLE_DISPLAY_LEN: usize = 20;

/// Result of [`Navigator::navigate_into`].
#[derive(Debug, Clone, PartialEq)]
pub enum NavOutcome {
    /// A new entry was pushed and is now the current screen.
    Pushed(PathEntry),
    /// The target was already the current screen, so the path was popped.
    /// `active_id` is the popped block, to be re-focused.
    Back { active_id: BlockId },
}

/// Truncate a block title for display in the breadcrumb bar.
pub fn screen_name(title: &str) -> String {
    if title.chars().count() <= TITLE_DISPLAY_LEN {
        return title.to_string();
    }
    let mut name: String = title.chars().take(TITLE_DISPLAY_LEN).collect();
    name.push_str("...");
    name
}

/// Build the breadcrumb entry for a block.
pub fn path_entry(block: &Block, color: Option<Hsl>, links: Vec<PathLink>) -> PathEntry {
    PathEntry {
        block_id: block.id.clone(),
        screen_name: screen_name(&block.title),
        color,
        links,
    }
}

type KeyLocks = Mutex<HashMap<String, Arc<AsyncMutex<()>>>>;

pub struct Navigator<S> {
    store: S,
    locks: KeyLocks,
}

/// Held lock on one store key. The key's entry is dropped from the lock map
/// once nobody holds or waits on it.
struct KeyGuard<'a> {
    locks: &'a KeyLocks,
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        // Release first so our clone of the Arc is gone before counting.
        self.guard.take();
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        if locks
            .get(&self.key)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.key);
        }
    }
}

impl<S: KvStore> Navigator<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Acquire the single-writer lock for a store key.
    async fn lock(&self, key: &str) -> KeyGuard<'_> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            locks
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        KeyGuard {
            locks: &self.locks,
            key: key.to_string(),
            guard: Some(lock.lock_owned().await),
        }
    }

    // =========================================================================
    // User and tree selection
    // =========================================================================

    /// The signed-in user, or the anonymous sentinel.
    pub async fn current_user(&self) -> Result<UserId, NavError> {
        let user: Option<UserId> = get_json(&self.store, keys::CURRENT_USER).await?;
        Ok(user.unwrap_or_else(|| UserId::new(keys::ANONYMOUS_USER)))
    }

    pub async fn set_current_user(&self, user: &UserId) -> Result<(), NavError> {
        set_json(&self.store, keys::CURRENT_USER, user).await?;
        Ok(())
    }

    pub async fn current_tree(&self) -> Result<Option<TreeId>, NavError> {
        Ok(get_json(&self.store, keys::CURRENT_TREE).await?)
    }

    pub async fn set_current_tree(&self, tree: &TreeId) -> Result<(), NavError> {
        set_json(&self.store, keys::CURRENT_TREE, tree).await?;
        Ok(())
    }

    async fn resolve_user(&self, user: Option<&UserId>) -> Result<UserId, NavError> {
        match user {
            Some(user) => Ok(user.clone()),
            None => self.current_user().await,
        }
    }

    async fn resolve_tree(&self, tree: Option<&TreeId>) -> Result<TreeId, NavError> {
        match tree {
            Some(tree) => Ok(tree.clone()),
            None => self.current_tree().await?.ok_or(NavError::NoCurrentTree),
        }
    }

    // =========================================================================
    // Tree list
    // =========================================================================

    pub async fn tree_ids(&self, user: Option<&UserId>) -> Result<Vec<TreeId>, NavError> {
        let user = self.resolve_user(user).await?;
        let ids: Option<Vec<TreeId>> = get_json(&self.store, &keys::tree_ids(&user)).await?;
        Ok(ids.unwrap_or_default())
    }

    pub async fn save_tree_ids(
        &self,
        ids: &[TreeId],
        user: Option<&UserId>,
    ) -> Result<(), NavError> {
        let user = self.resolve_user(user).await?;
        set_json(&self.store, &keys::tree_ids(&user), ids).await?;
        Ok(())
    }

    /// Append a tree id unless already present.
    pub async fn add_tree_id(&self, tree: &TreeId) -> Result<Vec<TreeId>, NavError> {
        let user = self.current_user().await?;
        let key = keys::tree_ids(&user);
        let _guard = self.lock(&key).await;

        let mut ids: Vec<TreeId> = get_json(&self.store, &key).await?.unwrap_or_default();
        if !ids.contains(tree) {
            ids.push(tree.clone());
            set_json(&self.store, &key, &ids).await?;
        }
        Ok(ids)
    }

    /// Remove a tree id and its path.
    ///
    /// The last remaining tree cannot be removed. Removing the current tree
    /// switches the current tree to the new first id.
    pub async fn remove_tree_id(&self, tree: &TreeId) -> Result<Vec<TreeId>, NavError> {
        let user = self.current_user().await?;
        let key = keys::tree_ids(&user);
        let _guard = self.lock(&key).await;

        let mut ids: Vec<TreeId> = get_json(&self.store, &key).await?.unwrap_or_default();
        if !ids.contains(tree) {
            return Err(NavError::TreeNotFound(tree.clone()));
        }
        if ids.len() == 1 {
            return Err(NavError::CannotRemoveLastTree);
        }

        ids.retain(|id| id != tree);
        set_json(&self.store, &key, &ids).await?;

        if self.current_tree().await?.as_ref() == Some(tree) {
            if let Some(first) = ids.first() {
                self.set_current_tree(first).await?;
                tracing::debug!(removed = %tree, current = %first, "switched current tree");
            }
        }

        self.store.remove(&keys::path(tree, &user)).await?;
        Ok(ids)
    }

    pub async fn switch_tree(&self, tree: &TreeId) -> Result<TreeId, NavError> {
        let ids = self.tree_ids(None).await?;
        if !ids.contains(tree) {
            return Err(NavError::TreeNotFound(tree.clone()));
        }
        self.set_current_tree(tree).await?;
        Ok(tree.clone())
    }

    /// Switch by 1-based position; `0` selects the last tree.
    pub async fn switch_tree_by_index(&self, index: usize) -> Result<TreeId, NavError> {
        let ids = self.tree_ids(None).await?;
        let position = if index == 0 {
            ids.len().checked_sub(1)
        } else {
            Some(index - 1).filter(|&p| p < ids.len())
        };

        let tree = position
            .and_then(|p| ids.get(p))
            .cloned()
            .ok_or(NavError::TreeIndexOutOfRange {
                index,
                len: ids.len(),
            })?;

        self.set_current_tree(&tree).await?;
        Ok(tree)
    }

    // =========================================================================
    // Paths
    // =========================================================================

    /// The path of a tree; defaults to the current tree and user.
    ///
    /// A missing path, or no current tree at all, reads as empty.
    pub async fn path(
        &self,
        tree: Option<&TreeId>,
        user: Option<&UserId>,
    ) -> Result<Vec<PathEntry>, NavError> {
        let tree = match self.resolve_tree(tree).await {
            Ok(tree) => tree,
            Err(NavError::NoCurrentTree) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        let user = self.resolve_user(user).await?;
        Ok(get_json(&self.store, &keys::path(&tree, &user))
            .await?
            .unwrap_or_default())
    }

    pub async fn save_path(
        &self,
        path: &[PathEntry],
        tree: Option<&TreeId>,
        user: Option<&UserId>,
    ) -> Result<(), NavError> {
        let tree = self.resolve_tree(tree).await?;
        let user = self.resolve_user(user).await?;
        set_json(&self.store, &keys::path(&tree, &user), path).await?;
        Ok(())
    }

    pub async fn remove_path(
        &self,
        tree: Option<&TreeId>,
        user: Option<&UserId>,
    ) -> Result<(), NavError> {
        let tree = self.resolve_tree(tree).await?;
        let user = self.resolve_user(user).await?;
        self.store.remove(&keys::path(&tree, &user)).await?;
        Ok(())
    }

    /// Create the root entry of a tree's path if the path is empty.
    pub async fn init_tree_path(
        &self,
        tree: &TreeId,
        root: &Block,
    ) -> Result<Vec<PathEntry>, NavError> {
        let user = self.current_user().await?;
        let key = keys::path(tree, &user);
        let _guard = self.lock(&key).await;

        let existing: Vec<PathEntry> = get_json(&self.store, &key).await?.unwrap_or_default();
        if !existing.is_empty() {
            return Ok(existing);
        }

        let path = vec![path_entry(root, None, Vec::new())];
        set_json(&self.store, &key, &path).await?;
        Ok(path)
    }

    /// Open a block as the new current screen.
    ///
    /// Re-opening the current screen goes up one level instead.
    pub async fn navigate_into(
        &self,
        block_id: &BlockId,
        parent_hsl: Option<Hsl>,
        links: Vec<PathLink>,
    ) -> Result<NavOutcome, NavError> {
        let user = self.current_user().await?;
        let tree = self.resolve_tree(None).await?;
        let key = keys::path(&tree, &user);
        let _guard = self.lock(&key).await;

        let mut path: Vec<PathEntry> = get_json(&self.store, &key).await?.unwrap_or_default();
        if path.last().is_some_and(|entry| &entry.block_id == block_id) {
            let active_id = self.pop_locked(&key, path).await?;
            return Ok(NavOutcome::Back { active_id });
        }

        let block = self
            .cached_block(block_id, Some(&user))
            .await?
            .ok_or_else(|| NavError::BlockNotFound(block_id.clone()))?;

        let entry = path_entry(&block, parent_hsl, links);
        path.push(entry.clone());
        set_json(&self.store, &key, &path).await?;
        tracing::debug!(block = %block_id, depth = path.len(), "navigated into block");
        Ok(NavOutcome::Pushed(entry))
    }

    /// Pop the current screen; returns the popped block id.
    pub async fn navigate_back(&self) -> Result<BlockId, NavError> {
        let user = self.current_user().await?;
        let tree = self.resolve_tree(None).await?;
        let key = keys::path(&tree, &user);
        let _guard = self.lock(&key).await;

        let path: Vec<PathEntry> = get_json(&self.store, &key).await?.unwrap_or_default();
        self.pop_locked(&key, path).await
    }

    async fn pop_locked(&self, key: &str, mut path: Vec<PathEntry>) -> Result<BlockId, NavError> {
        if path.len() <= 1 {
            return Err(NavError::AlreadyAtRoot);
        }
        let popped = path.pop().ok_or(NavError::AlreadyAtRoot)?;
        set_json(&self.store, key, &path).await?;
        tracing::debug!(block = %popped.block_id, depth = path.len(), "navigated back");
        Ok(popped.block_id)
    }

    /// Truncate the path so `level` is the current screen.
    pub async fn navigate_to_level(&self, level: usize) -> Result<Vec<PathEntry>, NavError> {
        let user = self.current_user().await?;
        let tree = self.resolve_tree(None).await?;
        let key = keys::path(&tree, &user);
        let _guard = self.lock(&key).await;

        let mut path: Vec<PathEntry> = get_json(&self.store, &key).await?.unwrap_or_default();
        if level >= path.len() {
            return Err(NavError::InvalidLevel {
                level,
                len: path.len(),
            });
        }
        path.truncate(level + 1);
        set_json(&self.store, &key, &path).await?;
        Ok(path)
    }

    // =========================================================================
    // Block cache and user preferences
    // =========================================================================

    pub async fn cache_block(&self, block: &Block, user: Option<&UserId>) -> Result<(), NavError> {
        let user = self.resolve_user(user).await?;
        set_json(&self.store, &keys::block(&block.id, &user), block).await?;
        Ok(())
    }

    pub async fn cached_block(
        &self,
        block_id: &BlockId,
        user: Option<&UserId>,
    ) -> Result<Option<Block>, NavError> {
        let user = self.resolve_user(user).await?;
        Ok(get_json(&self.store, &keys::block(block_id, &user)).await?)
    }

    /// The user's hotkey overrides; empty when none were saved.
    pub async fn hotkey_map(&self, user: Option<&UserId>) -> Result<HotkeyMap, NavError> {
        let user = self.resolve_user(user).await?;
        Ok(get_json(&self.store, &keys::hotkeys(&user))
            .await?
            .unwrap_or_default())
    }

    pub async fn save_hotkey_map(
        &self,
        map: &HotkeyMap,
        user: Option<&UserId>,
    ) -> Result<(), NavError> {
        let user = self.resolve_user(user).await?;
        set_json(&self.store, &keys::hotkeys(&user), map).await?;
        Ok(())
    }
}
