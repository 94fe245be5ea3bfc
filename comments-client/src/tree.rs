use std::{
    cmp::Reverse,
    collections::{HashMap, HashSet},
    sync::Arc,
};

use crate::{
    api::{Comment, CommentId},
    Snapshot,
};

/// Parent to children grouping of one store snapshot.
///
/// Each sibling group is ordered newest first. Comments whose parent is not in
/// the snapshot are still grouped under that parent id, they just are not
/// reachable from the roots.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommentTree {
    by_parent: HashMap<Option<CommentId>, Vec<Arc<Comment>>>,
    ids: HashSet<CommentId>,
}

impl CommentTree {
    pub fn build(comments: &[Arc<Comment>]) -> CommentTree {
        let mut by_parent = HashMap::<_, Vec<Arc<Comment>>>::new();
        let mut ids = HashSet::with_capacity(comments.len());
        for c in comments {
            ids.insert(c.id);
            by_parent.entry(c.parent_id).or_default().push(c.clone());
        }
        for siblings in by_parent.values_mut() {
            // stable, so that equal timestamps keep store order
            siblings.sort_by_key(|c| Reverse(c.created_at));
        }
        CommentTree { by_parent, ids }
    }

    pub fn root_comments(&self) -> &[Arc<Comment>] {
        self.children_of(None)
    }

    /// Direct replies to `parent`, empty if it has none or is unknown
    pub fn replies(&self, parent: &CommentId) -> &[Arc<Comment>] {
        self.children_of(Some(*parent))
    }

    pub fn children_of(&self, parent: Option<CommentId>) -> &[Arc<Comment>] {
        self.by_parent
            .get(&parent)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn contains(&self, id: &CommentId) -> bool {
        self.ids.contains(id)
    }

    /// Depth-first traversal from the roots, with the depth of each comment
    /// (0 for roots). Each comment is visited at most once.
    pub fn walk(&self) -> Vec<(usize, Arc<Comment>)> {
        let mut res = Vec::with_capacity(self.ids.len());
        let mut visited = HashSet::with_capacity(self.ids.len());
        let mut stack = self
            .root_comments()
            .iter()
            .rev()
            .map(|c| (0, c))
            .collect::<Vec<_>>();
        while let Some((depth, c)) = stack.pop() {
            if !visited.insert(c.id) {
                continue;
            }
            res.push((depth, c.clone()));
            stack.extend(self.replies(&c.id).iter().rev().map(|r| (depth + 1, r)));
        }
        res
    }

    /// Comments whose parent is not part of this tree, newest first
    pub fn orphans(&self) -> Vec<Arc<Comment>> {
        let mut res = self
            .by_parent
            .iter()
            .filter(|(p, _)| matches!(p, Some(p) if !self.contains(p)))
            .flat_map(|(_, cs)| cs.iter().cloned())
            .collect::<Vec<_>>();
        res.sort_by_key(|c| (Reverse(c.created_at), c.id));
        res
    }
}

/// Derives `CommentTree`s from store snapshots, recomputing only when handed
/// a snapshot it has not indexed last.
#[derive(Debug, Default)]
pub struct TreeIndexer {
    last: Option<(Snapshot, Arc<CommentTree>)>,
}

impl TreeIndexer {
    pub fn new() -> TreeIndexer {
        TreeIndexer { last: None }
    }

    pub fn index(&mut self, snapshot: &Snapshot) -> Arc<CommentTree> {
        if let Some((indexed, tree)) = &self.last {
            if Arc::ptr_eq(indexed, snapshot) {
                return tree.clone();
            }
        }
        let tree = Arc::new(CommentTree::build(snapshot));
        tracing::trace!(num_comments = snapshot.len(), "rebuilt comment tree");
        self.last = Some((snapshot.clone(), tree.clone()));
        tree
    }
}
