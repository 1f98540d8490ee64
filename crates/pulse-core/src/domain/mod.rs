//! Domain entities - the objects the feed renders.

mod comment;
mod ids;
mod post;

pub use comment::Comment;
pub use ids::{CommentId, RecordId};
pub use post::{LikeState, Post};
