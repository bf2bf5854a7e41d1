mod article;
pub use article::{Article, ArticleId, ArticleUpdate};

mod auth;
pub use auth::{AuthToken, Claims, Credentials, LoginResponse};

mod comment;
pub use comment::{Author, Comment, CommentId, Reply, ReplyId, TextBody};

mod error;
pub use error::Error;

mod user;
pub use user::{Role, UserId};

mod vote;
pub use vote::Vote;

pub type Time = chrono::DateTime<chrono::Utc>;

/// Strings sent to the server must not carry null bytes
pub fn validate_string(s: &str) -> Result<(), Error> {
    match s.contains('\0') {
        true => Err(Error::NullByteInString(String::from(s))),
        false => Ok(()),
    }
}

/// Comment and reply bodies must have some non-whitespace content
pub fn validate_text(s: &str) -> Result<(), Error> {
    if s.trim().is_empty() {
        return Err(Error::EmptyText);
    }
    validate_string(s)
}
