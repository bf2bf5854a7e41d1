use std::fmt;

use crate::{ArticleId, Role, Time, UserId};

#[derive(
    Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
#[serde(transparent)]
pub struct CommentId(pub String);

impl fmt::Display for CommentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(
    Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
#[serde(transparent)]
pub struct ReplyId(pub String);

impl fmt::Display for ReplyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Author {
    #[serde(rename = "_id")]
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub role: Role,
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(rename = "_id")]
    pub id: CommentId,
    #[serde(rename = "article")]
    pub article_id: ArticleId,
    pub author: Author,
    #[serde(rename = "text")]
    pub body: String,
    pub created_at: Time,

    #[serde(default)]
    pub likes: Vec<UserId>,
    #[serde(default)]
    pub dislikes: Vec<UserId>,

    /// Replies in the order the server returned them
    #[serde(default)]
    pub replies: Vec<Reply>,
}

/// A reply to a comment. Replies cannot themselves be replied to.
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    #[serde(rename = "_id")]
    pub id: ReplyId,
    #[serde(rename = "comment")]
    pub comment_id: CommentId,
    pub author: Author,
    #[serde(rename = "text")]
    pub body: String,
    pub created_at: Time,
}

impl Comment {
    pub fn reply(&self, id: &ReplyId) -> Option<&Reply> {
        self.replies.iter().find(|r| r.id == *id)
    }

    pub fn reply_mut(&mut self, id: &ReplyId) -> Option<&mut Reply> {
        self.replies.iter_mut().find(|r| r.id == *id)
    }
}

/// Request body for every endpoint that takes free text
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct TextBody {
    pub text: String,
}
