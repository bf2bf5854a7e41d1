use async_trait::async_trait;

use crate::{
    api::{Article, ArticleId, ArticleUpdate, AuthToken, Comment, CommentId, ReplyId, Vote},
    Error,
};

/// Remote source of truth for articles and their comment threads.
///
/// Every mutation returns the canonical entity as the server now sees it;
/// reply operations return the whole parent comment. Mutations always take
/// the bearer credential, reads are public.
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn fetch_thread(&self, article: &ArticleId) -> Result<Vec<Comment>, Error>;

    async fn post_comment(
        &self,
        token: &AuthToken,
        article: &ArticleId,
        text: &str,
    ) -> Result<Comment, Error>;

    async fn edit_comment(
        &self,
        token: &AuthToken,
        comment: &CommentId,
        text: &str,
    ) -> Result<Comment, Error>;

    async fn delete_comment(&self, token: &AuthToken, comment: &CommentId) -> Result<(), Error>;

    async fn vote_comment(
        &self,
        token: &AuthToken,
        comment: &CommentId,
        vote: Vote,
    ) -> Result<Comment, Error>;

    async fn post_reply(
        &self,
        token: &AuthToken,
        comment: &CommentId,
        text: &str,
    ) -> Result<Comment, Error>;

    async fn edit_reply(
        &self,
        token: &AuthToken,
        comment: &CommentId,
        reply: &ReplyId,
        text: &str,
    ) -> Result<Comment, Error>;

    async fn delete_reply(
        &self,
        token: &AuthToken,
        comment: &CommentId,
        reply: &ReplyId,
    ) -> Result<Comment, Error>;

    /// `Ok(None)` if there is no such article
    async fn fetch_article(&self, article: &ArticleId) -> Result<Option<Article>, Error>;

    async fn vote_article(
        &self,
        token: &AuthToken,
        article: &ArticleId,
        vote: Vote,
    ) -> Result<Article, Error>;

    async fn update_article(
        &self,
        token: &AuthToken,
        article: &ArticleId,
        update: &ArticleUpdate,
    ) -> Result<Article, Error>;

    async fn delete_article(&self, token: &AuthToken, article: &ArticleId) -> Result<(), Error>;
}

/// Yes/no question asked to the user before anything gets deleted
pub trait Confirm {
    fn confirm(&self, question: &str) -> bool;
}

impl<F: Fn(&str) -> bool> Confirm for F {
    fn confirm(&self, question: &str) -> bool {
        self(question)
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Deletion<T = ()> {
    /// The server accepted the deletion
    Done(T),

    /// The user said no, nothing was sent
    Declined,
}

impl<T> Deletion<T> {
    pub fn is_done(&self) -> bool {
        matches!(self, Deletion::Done(_))
    }
}
