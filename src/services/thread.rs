//! Comment threading: depth resolution and flat-list-to-tree assembly.

use std::collections::{HashMap, HashSet};

use crate::{
    error::AppError,
    models::comment::{Comment, CommentNode},
    store::Store,
};

/// Deepest level a comment may sit at (root = 0).
pub const MAX_DEPTH: u32 = 2;

/// What `build_tree_with` does with a comment whose parent is not in the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrphanPolicy {
    /// Leave the comment, and everything under it, out of the tree.
    #[default]
    Drop,
    /// Show the comment as an extra root.
    Promote,
}

/// Number of parent hops from `comment_id` up to its root.
///
/// Stops at a comment without a parent or at a missing row, so an unknown id
/// has depth 0. Revisiting an id also stops the walk.
pub async fn comment_depth(store: &dyn Store, comment_id: i64) -> Result<u32, AppError> {
    let mut depth = 0;
    let mut current = comment_id;
    let mut visited = HashSet::new();

    while visited.insert(current) {
        match store.find_comment(current).await? {
            Some(Comment {
                parent_id: Some(parent_id),
                ..
            }) => {
                depth += 1;
                current = parent_id;
            }
            _ => return Ok(depth),
        }
    }

    tracing::warn!("Comment {} has a cyclic parent chain", comment_id);
    Ok(depth)
}

/// Nests `comments` under their parents, dropping orphans.
pub fn build_tree(comments: Vec<Comment>) -> Vec<CommentNode> {
    build_tree_with(comments, OrphanPolicy::Drop)
}

/// Nests `comments` under their parents.
///
/// Roots and siblings keep their input order. Only comments reachable from a
/// root end up in the result.
pub fn build_tree_with(comments: Vec<Comment>, orphans: OrphanPolicy) -> Vec<CommentNode> {
    let ids: HashSet<i64> = comments.iter().map(|c| c.id).collect();
    let mut children: HashMap<i64, Vec<Comment>> = HashMap::new();
    let mut roots = Vec::new();

    for comment in comments {
        match comment.parent_id {
            None => roots.push(comment),
            Some(parent_id) if ids.contains(&parent_id) => {
                children.entry(parent_id).or_default().push(comment)
            }
            Some(parent_id) => match orphans {
                OrphanPolicy::Promote => roots.push(comment),
                OrphanPolicy::Drop => {
                    tracing::debug!(
                        "Dropping comment {} whose parent {} is not loaded",
                        comment.id,
                        parent_id
                    );
                }
            },
        }
    }

    roots
        .into_iter()
        .map(|root| attach(root, &mut children))
        .collect()
}

// Each child list is taken out of the map once, so bad data cannot recurse forever.
fn attach(comment: Comment, children: &mut HashMap<i64, Vec<Comment>>) -> CommentNode {
    let sub_comments = children
        .remove(&comment.id)
        .unwrap_or_default()
        .into_iter()
        .map(|child| attach(child, children))
        .collect();

    CommentNode {
        comment,
        sub_comments,
    }
}
