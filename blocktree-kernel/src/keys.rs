//! Key shapes used in the persistent store.
//!
//! Persisted data written by earlier sessions is only readable if these
//! shapes stay stable.

use blocktree_api::{BlockId, TreeId, UserId};

pub const CURRENT_USER: &str = "currentUser";
pub const CURRENT_TREE: &str = "currentTree";

/// User id used when no user has signed in.
pub const ANONYMOUS_USER: &str = "anonymous";

pub fn tree_ids(user: &UserId) -> String {
    format!("treeIds_{user}")
}

pub fn path(tree: &TreeId, user: &UserId) -> String {
    format!("path_{tree}_{user}")
}

pub fn block(block: &BlockId, user: &UserId) -> String {
    format!("block_{block}_{user}")
}

pub fn hotkeys(user: &UserId) -> String {
    format!("hotkeys_{user}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_shapes() {
        let user = UserId::new("u1");
        assert_eq!(tree_ids(&user), "treeIds_u1");
        assert_eq!(path(&TreeId::new("t1"), &user), "path_t1_u1");
        assert_eq!(block(&BlockId::new("b1"), &user), "block_b1_u1");
        assert_eq!(hotkeys(&user), "hotkeys_u1");
    }
}
