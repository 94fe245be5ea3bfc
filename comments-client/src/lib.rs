mod engine;
pub use engine::CommentEngine;

mod loader;
pub use loader::PostLoader;

mod op;
pub use op::{AsyncLoad, AsyncOp, OpState, Phase};

mod session;
pub use session::{CommentOps, PostSession};

mod store;
pub use store::{CommentPatch, CommentStore, Snapshot};

mod tree;
pub use tree::{CommentTree, TreeIndexer};

#[cfg(test)]
mod test_util;

pub mod api {
    pub use comments_api::*;
}
