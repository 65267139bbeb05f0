pub mod models;

pub use models::{
    AuthorSummary, CascadeReport, Comment, CommentView, Location, NewComment, NewPost, Post,
    PostView, User,
};
