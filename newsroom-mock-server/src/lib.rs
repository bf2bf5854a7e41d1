use std::{
    collections::{HashMap, VecDeque},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::Utc;
use newsroom_client::{
    api::{
        self, Article, ArticleId, ArticleUpdate, AuthToken, Author, Claims, Comment, CommentId,
        Error, Reply, ReplyId, Role, UserId, Vote,
    },
    Gateway,
};
use parking_lot::Mutex;
use uuid::Uuid;

/// In-memory stand-in for the news API.
///
/// It re-checks everything a real server would: who is calling, whether they
/// wrote what they are changing, and whether the text is acceptable.
pub struct MockServer {
    sessions: HashMap<AuthToken, Claims>,
    articles: Vec<Article>,
    /// All comments of all articles, in creation order
    comments: Vec<Comment>,
}

fn new_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Votes accumulate: each is a set insert, and nothing stops someone from
/// being in both sets.
fn record_vote(likes: &mut Vec<UserId>, dislikes: &mut Vec<UserId>, user: &UserId, vote: Vote) {
    let set = match vote {
        Vote::Like => likes,
        Vote::Dislike => dislikes,
    };
    if !set.contains(user) {
        set.push(user.clone());
    }
}

fn author_of(claims: &Claims) -> Author {
    Author {
        id: claims.id.clone(),
        username: claims.username.clone(),
        role: claims.role,
    }
}

impl MockServer {
    pub fn new() -> MockServer {
        MockServer {
            sessions: HashMap::new(),
            articles: Vec::new(),
            comments: Vec::new(),
        }
    }

    /// Create a user and log them in
    pub fn register(&mut self, username: &str, role: Role) -> AuthToken {
        let claims = Claims {
            id: UserId(new_id()),
            username: String::from(username),
            email: format!("{username}@example.org"),
            role,
            exp: None,
        };
        let tok = AuthToken::unsigned(&claims);
        self.sessions.insert(tok.clone(), claims);
        tok
    }

    pub fn logout(&mut self, tok: &AuthToken) -> Result<(), Error> {
        self.sessions
            .remove(tok)
            .map(|_| ())
            .ok_or(Error::NotAuthenticated)
    }

    fn resolve(&self, tok: &AuthToken) -> Result<&Claims, Error> {
        self.sessions.get(tok).ok_or(Error::NotAuthenticated)
    }

    /// Article authoring, which the client does not cover
    pub fn publish_article(
        &mut self,
        tok: &AuthToken,
        data: ArticleUpdate,
    ) -> Result<Article, Error> {
        let author = self.resolve(tok)?.id.clone();
        data.validate()?;
        let mut article = Article {
            id: ArticleId(new_id()),
            title: String::new(),
            body: String::new(),
            image_url: None,
            state: String::new(),
            city: String::new(),
            category: String::new(),
            author,
            published_at: Utc::now(),
            likes: Vec::new(),
            dislikes: Vec::new(),
        };
        data.apply_to(&mut article);
        self.articles.push(article.clone());
        Ok(article)
    }

    fn article_mut(&mut self, id: &ArticleId) -> Result<&mut Article, Error> {
        self.articles
            .iter_mut()
            .find(|a| a.id == *id)
            .ok_or(Error::NotFound)
    }

    fn comment_mut(&mut self, id: &CommentId) -> Result<&mut Comment, Error> {
        self.comments
            .iter_mut()
            .find(|c| c.id == *id)
            .ok_or(Error::NotFound)
    }

    /// Articles may be changed by their author or by an admin
    fn check_article_owner(claims: &Claims, article: &Article) -> Result<(), Error> {
        match claims.id == article.author || claims.role == Role::Admin {
            true => Ok(()),
            false => Err(Error::PermissionDenied),
        }
    }

    pub fn fetch_thread(&self, article: &ArticleId) -> Result<Vec<Comment>, Error> {
        if !self.articles.iter().any(|a| a.id == *article) {
            return Err(Error::NotFound);
        }
        Ok(self
            .comments
            .iter()
            .filter(|c| c.article_id == *article)
            .cloned()
            .collect())
    }

    pub fn post_comment(
        &mut self,
        tok: &AuthToken,
        article: &ArticleId,
        text: &str,
    ) -> Result<Comment, Error> {
        let author = author_of(self.resolve(tok)?);
        api::validate_text(text)?;
        self.article_mut(article)?;
        let comment = Comment {
            id: CommentId(new_id()),
            article_id: article.clone(),
            author,
            body: String::from(text),
            created_at: Utc::now(),
            likes: Vec::new(),
            dislikes: Vec::new(),
            replies: Vec::new(),
        };
        self.comments.push(comment.clone());
        Ok(comment)
    }

    pub fn edit_comment(
        &mut self,
        tok: &AuthToken,
        id: &CommentId,
        text: &str,
    ) -> Result<Comment, Error> {
        let user = self.resolve(tok)?.id.clone();
        api::validate_text(text)?;
        let comment = self.comment_mut(id)?;
        if comment.author.id != user {
            return Err(Error::PermissionDenied);
        }
        comment.body = String::from(text);
        Ok(comment.clone())
    }

    pub fn delete_comment(&mut self, tok: &AuthToken, id: &CommentId) -> Result<(), Error> {
        let user = self.resolve(tok)?.id.clone();
        if self.comment_mut(id)?.author.id != user {
            return Err(Error::PermissionDenied);
        }
        self.comments.retain(|c| c.id != *id);
        Ok(())
    }

    pub fn vote_comment(
        &mut self,
        tok: &AuthToken,
        id: &CommentId,
        vote: Vote,
    ) -> Result<Comment, Error> {
        let user = self.resolve(tok)?.id.clone();
        let comment = self.comment_mut(id)?;
        record_vote(&mut comment.likes, &mut comment.dislikes, &user, vote);
        Ok(comment.clone())
    }

    pub fn post_reply(
        &mut self,
        tok: &AuthToken,
        id: &CommentId,
        text: &str,
    ) -> Result<Comment, Error> {
        let author = author_of(self.resolve(tok)?);
        api::validate_text(text)?;
        let comment = self.comment_mut(id)?;
        comment.replies.push(Reply {
            id: ReplyId(new_id()),
            comment_id: id.clone(),
            author,
            body: String::from(text),
            created_at: Utc::now(),
        });
        Ok(comment.clone())
    }

    pub fn edit_reply(
        &mut self,
        tok: &AuthToken,
        id: &CommentId,
        reply: &ReplyId,
        text: &str,
    ) -> Result<Comment, Error> {
        let user = self.resolve(tok)?.id.clone();
        api::validate_text(text)?;
        let comment = self.comment_mut(id)?;
        let r = comment.reply_mut(reply).ok_or(Error::NotFound)?;
        if r.author.id != user {
            return Err(Error::PermissionDenied);
        }
        r.body = String::from(text);
        Ok(comment.clone())
    }

    pub fn delete_reply(
        &mut self,
        tok: &AuthToken,
        id: &CommentId,
        reply: &ReplyId,
    ) -> Result<Comment, Error> {
        let user = self.resolve(tok)?.id.clone();
        let comment = self.comment_mut(id)?;
        if comment.reply(reply).ok_or(Error::NotFound)?.author.id != user {
            return Err(Error::PermissionDenied);
        }
        comment.replies.retain(|r| r.id != *reply);
        Ok(comment.clone())
    }

    pub fn fetch_article(&self, id: &ArticleId) -> Option<Article> {
        self.articles.iter().find(|a| a.id == *id).cloned()
    }

    pub fn vote_article(
        &mut self,
        tok: &AuthToken,
        id: &ArticleId,
        vote: Vote,
    ) -> Result<Article, Error> {
        let user = self.resolve(tok)?.id.clone();
        let article = self.article_mut(id)?;
        record_vote(&mut article.likes, &mut article.dislikes, &user, vote);
        Ok(article.clone())
    }

    pub fn update_article(
        &mut self,
        tok: &AuthToken,
        id: &ArticleId,
        update: &ArticleUpdate,
    ) -> Result<Article, Error> {
        let claims = self.resolve(tok)?.clone();
        update.validate()?;
        let article = self.article_mut(id)?;
        MockServer::check_article_owner(&claims, article)?;
        update.apply_to(article);
        Ok(article.clone())
    }

    pub fn delete_article(&mut self, tok: &AuthToken, id: &ArticleId) -> Result<(), Error> {
        let claims = self.resolve(tok)?.clone();
        MockServer::check_article_owner(&claims, self.article_mut(id)?)?;
        self.articles.retain(|a| a.id != *id);
        self.comments.retain(|c| c.article_id != *id);
        Ok(())
    }
}

impl Default for MockServer {
    fn default() -> MockServer {
        MockServer::new()
    }
}

/// `Gateway` backed by a shared `MockServer`.
///
/// Counts calls, and can hold individual responses back to have them land
/// out of order. The server state changes when the call is made, not when
/// its response lands.
#[derive(Clone)]
pub struct MockGateway {
    server: Arc<Mutex<MockServer>>,
    calls: Arc<AtomicUsize>,
    delays: Arc<Mutex<VecDeque<Duration>>>,
}

impl MockGateway {
    pub fn new(server: MockServer) -> MockGateway {
        MockGateway {
            server: Arc::new(Mutex::new(server)),
            calls: Arc::new(AtomicUsize::new(0)),
            delays: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    pub fn with_server<R>(&self, f: impl FnOnce(&mut MockServer) -> R) -> R {
        f(&mut self.server.lock())
    }

    /// Number of gateway calls made so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Hold back the response of the next not-yet-delayed call by `d`
    pub fn delay_next(&self, d: Duration) {
        self.delays.lock().push_back(d);
    }

    async fn respond<T, F>(&self, f: F) -> Result<T, newsroom_client::Error>
    where
        F: FnOnce(&mut MockServer) -> Result<T, Error> + Send,
        T: Send,
    {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.delays.lock().pop_front();
        let res = self.with_server(f);
        if let Some(d) = delay {
            tokio::time::sleep(d).await;
        }
        if let Err(err) = &res {
            tracing::debug!(%err, "mock server refused call");
        }
        res.map_err(newsroom_client::Error::from)
    }
}

#[async_trait]
impl Gateway for MockGateway {
    async fn fetch_thread(
        &self,
        article: &ArticleId,
    ) -> Result<Vec<Comment>, newsroom_client::Error> {
        self.respond(|s| s.fetch_thread(article)).await
    }

    async fn post_comment(
        &self,
        token: &AuthToken,
        article: &ArticleId,
        text: &str,
    ) -> Result<Comment, newsroom_client::Error> {
        self.respond(|s| s.post_comment(token, article, text)).await
    }

    async fn edit_comment(
        &self,
        token: &AuthToken,
        comment: &CommentId,
        text: &str,
    ) -> Result<Comment, newsroom_client::Error> {
        self.respond(|s| s.edit_comment(token, comment, text)).await
    }

    async fn delete_comment(
        &self,
        token: &AuthToken,
        comment: &CommentId,
    ) -> Result<(), newsroom_client::Error> {
        self.respond(|s| s.delete_comment(token, comment)).await
    }

    async fn vote_comment(
        &self,
        token: &AuthToken,
        comment: &CommentId,
        vote: Vote,
    ) -> Result<Comment, newsroom_client::Error> {
        self.respond(|s| s.vote_comment(token, comment, vote)).await
    }

    async fn post_reply(
        &self,
        token: &AuthToken,
        comment: &CommentId,
        text: &str,
    ) -> Result<Comment, newsroom_client::Error> {
        self.respond(|s| s.post_reply(token, comment, text)).await
    }

    async fn edit_reply(
        &self,
        token: &AuthToken,
        comment: &CommentId,
        reply: &ReplyId,
        text: &str,
    ) -> Result<Comment, newsroom_client::Error> {
        self.respond(|s| s.edit_reply(token, comment, reply, text))
            .await
    }

    async fn delete_reply(
        &self,
        token: &AuthToken,
        comment: &CommentId,
        reply: &ReplyId,
    ) -> Result<Comment, newsroom_client::Error> {
        self.respond(|s| s.delete_reply(token, comment, reply)).await
    }

    async fn fetch_article(
        &self,
        article: &ArticleId,
    ) -> Result<Option<Article>, newsroom_client::Error> {
        self.respond(|s| Ok(s.fetch_article(article))).await
    }

    async fn vote_article(
        &self,
        token: &AuthToken,
        article: &ArticleId,
        vote: Vote,
    ) -> Result<Article, newsroom_client::Error> {
        self.respond(|s| s.vote_article(token, article, vote)).await
    }

    async fn update_article(
        &self,
        token: &AuthToken,
        article: &ArticleId,
        update: &ArticleUpdate,
    ) -> Result<Article, newsroom_client::Error> {
        self.respond(|s| s.update_article(token, article, update))
            .await
    }

    async fn delete_article(
        &self,
        token: &AuthToken,
        article: &ArticleId,
    ) -> Result<(), newsroom_client::Error> {
        self.respond(|s| s.delete_article(token, article)).await
    }
}
