use std::{collections::HashSet, sync::Arc};

use crate::api::{Comment, CommentId, PostId};

/// Immutable view of a store's contents at one point in time
pub type Snapshot = Arc<Vec<Arc<Comment>>>;

/// Partial update of a comment. Authorship, creation time and parent are
/// fixed at creation and thus cannot be patched.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CommentPatch {
    pub message: Option<String>,
    pub like_count: Option<u64>,
    pub liked_by_me: Option<bool>,
}

impl CommentPatch {
    pub fn message(message: String) -> CommentPatch {
        CommentPatch {
            message: Some(message),
            ..CommentPatch::default()
        }
    }
}

/// Local copy of all the comments of the post currently being viewed.
///
/// The store is flat and unsorted: newly created comments are prepended, and
/// all grouping and ordering happens when a `TreeIndexer` reads a snapshot.
/// Every mutation replaces the snapshot, so snapshots taken before a mutation
/// are never affected by it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommentStore {
    post: Option<PostId>,
    comments: Snapshot,
}

impl CommentStore {
    pub fn new() -> CommentStore {
        CommentStore {
            post: None,
            comments: Arc::new(Vec::new()),
        }
    }

    /// The post this store was last seeded for, if any
    pub fn post(&self) -> Option<PostId> {
        self.post
    }

    pub fn snapshot(&self) -> Snapshot {
        self.comments.clone()
    }

    pub fn len(&self) -> usize {
        self.comments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.comments.is_empty()
    }

    pub fn get(&self, id: &CommentId) -> Option<&Arc<Comment>> {
        self.comments.iter().find(|c| c.id == *id)
    }

    /// Replaces the whole contents of the store with the comments of `post`.
    ///
    /// `None` means the post has not been fetched yet, and leaves the store
    /// untouched. Duplicate ids keep only their first occurrence.
    pub fn initialize(&mut self, post: PostId, comments: Option<Vec<Comment>>) {
        let comments = match comments {
            None => return,
            Some(comments) => comments,
        };
        let mut seen = HashSet::with_capacity(comments.len());
        let mut res = Vec::with_capacity(comments.len());
        for c in comments {
            if seen.insert(c.id) {
                res.push(Arc::new(c));
            } else {
                tracing::warn!(comment = ?c.id, ?post, "dropping duplicate comment id while seeding");
            }
        }
        tracing::debug!(?post, num_comments = res.len(), "seeded comment store");
        self.post = Some(post);
        self.comments = Arc::new(res);
    }

    /// Prepends `comment`, or replaces the comment already carrying its id
    pub fn insert(&mut self, comment: Comment) {
        let comments = Arc::make_mut(&mut self.comments);
        if let Some(existing) = comments.iter_mut().find(|c| c.id == comment.id) {
            tracing::warn!(comment = ?comment.id, "inserted comment already in store, replacing it");
            *existing = Arc::new(comment);
            return;
        }
        tracing::debug!(comment = ?comment.id, parent = ?comment.parent_id, "inserting comment");
        comments.insert(0, Arc::new(comment));
    }

    /// Returns false, without changing anything, if `id` is not in the store
    pub fn patch(&mut self, id: &CommentId, patch: CommentPatch) -> bool {
        self.modify(id, |c| {
            if let Some(message) = patch.message {
                c.message = message;
            }
            if let Some(like_count) = patch.like_count {
                c.like_count = like_count;
            }
            if let Some(liked_by_me) = patch.liked_by_me {
                c.liked_by_me = liked_by_me;
            }
            if c.liked_by_me && c.like_count == 0 {
                c.like_count = 1;
            }
        })
    }

    /// Returns false, without changing anything, if `id` is not in the store.
    ///
    /// Replies to the removed comment stay in the store, dangling.
    pub fn remove(&mut self, id: &CommentId) -> bool {
        let pos = match self.comments.iter().position(|c| c.id == *id) {
            None => {
                tracing::debug!(comment = ?id, "removing comment not in store, ignoring");
                return false;
            }
            Some(pos) => pos,
        };
        Arc::make_mut(&mut self.comments).remove(pos);
        tracing::debug!(comment = ?id, "removed comment");
        true
    }

    /// Records the viewer's like (`add_like`) or unlike of comment `id`.
    ///
    /// The count only moves if the viewer's like status actually changes, so
    /// that an answer that disagrees with local state cannot make it drift.
    pub fn adjust_like(&mut self, id: &CommentId, add_like: bool) -> bool {
        self.modify(id, |c| {
            if c.liked_by_me == add_like {
                tracing::warn!(
                    comment = ?c.id,
                    add_like,
                    "like toggle does not change local like status, keeping count"
                );
                return;
            }
            c.liked_by_me = add_like;
            c.like_count = match add_like {
                true => c.like_count.saturating_add(1),
                false => c.like_count.saturating_sub(1),
            };
        })
    }

    fn modify(&mut self, id: &CommentId, f: impl FnOnce(&mut Comment)) -> bool {
        let pos = match self.comments.iter().position(|c| c.id == *id) {
            None => {
                tracing::debug!(comment = ?id, "modifying comment not in store, ignoring");
                return false;
            }
            Some(pos) => pos,
        };
        let comments = Arc::make_mut(&mut self.comments);
        f(Arc::make_mut(&mut comments[pos]));
        true
    }
}

impl Default for CommentStore {
    fn default() -> CommentStore {
        CommentStore::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{cid, comment, post_id};

    fn seeded() -> CommentStore {
        let mut s = CommentStore::new();
        s.initialize(
            post_id(1),
            Some(vec![
                comment(1, None, 2),
                comment(2, Some(1), 1),
                comment(3, None, 3),
            ]),
        );
        s
    }

    #[test]
    fn initialize_with_nothing_is_a_noop() {
        let mut s = seeded();
        let before = s.clone();
        s.initialize(post_id(2), None);
        assert_eq!(s, before);
        assert_eq!(s.post(), Some(post_id(1)));
    }

    #[test]
    fn initialize_replaces_contents() {
        let mut s = seeded();
        s.initialize(post_id(2), Some(vec![comment(9, None, 1)]));
        assert_eq!(s.post(), Some(post_id(2)));
        assert_eq!(s.len(), 1);
        assert!(s.get(&cid(1)).is_none());
    }

    #[test]
    fn initialize_drops_duplicate_ids() {
        let mut s = CommentStore::new();
        let mut dup = comment(1, None, 5);
        dup.message = String::from("dup");
        s.initialize(post_id(1), Some(vec![comment(1, None, 1), dup]));
        assert_eq!(s.len(), 1);
        assert_eq!(s.get(&cid(1)).unwrap().message, "comment 1");
    }

    #[test]
    fn insert_prepends() {
        let mut s = seeded();
        s.insert(comment(4, Some(3), 10));
        assert_eq!(s.len(), 4);
        assert_eq!(s.snapshot()[0].id, cid(4));
    }

    #[test]
    fn insert_existing_id_replaces() {
        let mut s = seeded();
        let mut c = comment(2, Some(1), 1);
        c.message = String::from("server version");
        s.insert(c);
        assert_eq!(s.len(), 3);
        assert_eq!(s.get(&cid(2)).unwrap().message, "server version");
    }

    #[test]
    fn snapshots_are_not_affected_by_later_mutations() {
        let mut s = seeded();
        let before = s.snapshot();
        s.patch(&cid(1), CommentPatch::message(String::from("edited")));
        s.remove(&cid(3));
        assert_eq!(before.len(), 3);
        assert_eq!(before.iter().find(|c| c.id == cid(1)).unwrap().message, "comment 1");
        assert!(!Arc::ptr_eq(&before, &s.snapshot()));
    }

    #[test]
    fn patch_changes_only_named_fields() {
        let mut s = seeded();
        assert!(s.patch(&cid(2), CommentPatch::message(String::from("x"))));
        let c = s.get(&cid(2)).unwrap();
        assert_eq!(c.message, "x");
        assert_eq!(c.parent_id, Some(cid(1)));
        assert_eq!(c.like_count, 0);
    }

    #[test]
    fn patch_after_remove_is_a_noop() {
        let mut s = seeded();
        assert!(s.remove(&cid(2)));
        let before = s.clone();
        assert!(!s.patch(&cid(2), CommentPatch::message(String::from("x"))));
        assert_eq!(s, before);
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn remove_absent_is_a_noop() {
        let mut s = seeded();
        assert!(!s.remove(&cid(42)));
        assert_eq!(s.len(), 3);
    }

    #[test]
    fn like_round_trip() {
        let mut s = CommentStore::new();
        let mut c = comment(1, None, 1);
        c.like_count = 3;
        s.initialize(post_id(1), Some(vec![c]));

        assert!(s.adjust_like(&cid(1), true));
        let c = s.get(&cid(1)).unwrap();
        assert!(c.liked_by_me);
        assert_eq!(c.like_count, 4);

        assert!(s.adjust_like(&cid(1), false));
        let c = s.get(&cid(1)).unwrap();
        assert!(!c.liked_by_me);
        assert_eq!(c.like_count, 3);
    }

    #[test]
    fn like_that_changes_nothing_keeps_count() {
        let mut s = seeded();
        s.adjust_like(&cid(1), false);
        assert_eq!(s.get(&cid(1)).unwrap().like_count, 0);
        s.adjust_like(&cid(1), true);
        s.adjust_like(&cid(1), true);
        assert_eq!(s.get(&cid(1)).unwrap().like_count, 1);
    }

    #[test]
    fn like_invariant_holds_under_any_sequence() {
        bolero::check!()
            .with_type::<(u8, Vec<(bool, bool)>)>()
            .cloned()
            .for_each(|(initial, toggles)| {
                let mut s = CommentStore::new();
                let mut c = comment(1, None, 1);
                c.like_count = u64::from(initial);
                s.initialize(post_id(1), Some(vec![c]));
                for (add_like, do_patch) in toggles {
                    if do_patch {
                        s.patch(
                            &cid(1),
                            CommentPatch {
                                liked_by_me: Some(add_like),
                                ..CommentPatch::default()
                            },
                        );
                    } else {
                        s.adjust_like(&cid(1), add_like);
                    }
                    let c = s.get(&cid(1)).unwrap();
                    assert!(!c.liked_by_me || c.like_count >= 1);
                }
            });
    }
}
