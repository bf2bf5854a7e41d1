use anyhow::Context;
use async_trait::async_trait;
use reqwest::RequestBuilder;

use crate::{
    api::{
        self, Article, ArticleId, ArticleUpdate, AuthToken, Comment, CommentId, Credentials,
        LoginResponse, ReplyId, TextBody, Vote,
    },
    Error, Gateway,
};

/// Gateway talking JSON over HTTP to the news API
#[derive(Clone, Debug)]
pub struct HttpGateway {
    client: reqwest::Client,
    host: String,
}

impl HttpGateway {
    /// `host` is the API base URL, eg. `https://news.example.org/api`
    pub fn new(host: impl Into<String>) -> HttpGateway {
        HttpGateway::with_client(reqwest::Client::new(), host)
    }

    pub fn with_client(client: reqwest::Client, host: impl Into<String>) -> HttpGateway {
        let host = host.into();
        HttpGateway {
            client,
            host: host.trim_end_matches('/').to_string(),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.host, path)
    }

    pub async fn login(&self, credentials: &Credentials) -> Result<AuthToken, Error> {
        credentials.validate()?;
        let resp: LoginResponse = send(
            self.client.post(self.url("auth/login")).json(credentials),
            "logging in",
        )
        .await?;
        Ok(resp.token)
    }
}

async fn checked(req: RequestBuilder, what: &str) -> Result<reqwest::Response, Error> {
    let resp = req
        .send()
        .await
        .with_context(|| format!("sending request for {what}"))?;
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp
        .bytes()
        .await
        .with_context(|| format!("reading error response for {what}"))?;
    let err = api::Error::from_response(status, &body);
    tracing::debug!(%status, %err, "server refused {what}");
    Err(Error::from(err))
}

async fn send<R>(req: RequestBuilder, what: &str) -> Result<R, Error>
where
    R: for<'de> serde::Deserialize<'de>,
{
    Ok(checked(req, what)
        .await?
        .json()
        .await
        .with_context(|| format!("parsing response for {what}"))?)
}

async fn send_empty(req: RequestBuilder, what: &str) -> Result<(), Error> {
    checked(req, what).await.map(|_| ())
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn fetch_thread(&self, article: &ArticleId) -> Result<Vec<Comment>, Error> {
        send(
            self.client
                .get(self.url(&format!("articles/{article}/comments"))),
            "fetching comments",
        )
        .await
    }

    async fn post_comment(
        &self,
        token: &AuthToken,
        article: &ArticleId,
        text: &str,
    ) -> Result<Comment, Error> {
        send(
            self.client
                .post(self.url(&format!("articles/{article}/comments")))
                .bearer_auth(&token.0)
                .json(&TextBody {
                    text: String::from(text),
                }),
            "posting comment",
        )
        .await
    }

    async fn edit_comment(
        &self,
        token: &AuthToken,
        comment: &CommentId,
        text: &str,
    ) -> Result<Comment, Error> {
        send(
            self.client
                .put(self.url(&format!("comments/{comment}")))
                .bearer_auth(&token.0)
                .json(&TextBody {
                    text: String::from(text),
                }),
            "editing comment",
        )
        .await
    }

    async fn delete_comment(&self, token: &AuthToken, comment: &CommentId) -> Result<(), Error> {
        send_empty(
            self.client
                .delete(self.url(&format!("comments/{comment}")))
                .bearer_auth(&token.0),
            "deleting comment",
        )
        .await
    }

    async fn vote_comment(
        &self,
        token: &AuthToken,
        comment: &CommentId,
        vote: Vote,
    ) -> Result<Comment, Error> {
        send(
            self.client
                .post(self.url(&format!("comments/{comment}/{}", vote.path())))
                .bearer_auth(&token.0),
            "voting on comment",
        )
        .await
    }

    async fn post_reply(
        &self,
        token: &AuthToken,
        comment: &CommentId,
        text: &str,
    ) -> Result<Comment, Error> {
        send(
            self.client
                .post(self.url(&format!("comments/{comment}/replies")))
                .bearer_auth(&token.0)
                .json(&TextBody {
                    text: String::from(text),
                }),
            "posting reply",
        )
        .await
    }

    async fn edit_reply(
        &self,
        token: &AuthToken,
        comment: &CommentId,
        reply: &ReplyId,
        text: &str,
    ) -> Result<Comment, Error> {
        send(
            self.client
                .put(self.url(&format!("comments/{comment}/replies/{reply}")))
                .bearer_auth(&token.0)
                .json(&TextBody {
                    text: String::from(text),
                }),
            "editing reply",
        )
        .await
    }

    async fn delete_reply(
        &self,
        token: &AuthToken,
        comment: &CommentId,
        reply: &ReplyId,
    ) -> Result<Comment, Error> {
        send(
            self.client
                .delete(self.url(&format!("comments/{comment}/replies/{reply}")))
                .bearer_auth(&token.0),
            "deleting reply",
        )
        .await
    }

    async fn fetch_article(&self, article: &ArticleId) -> Result<Option<Article>, Error> {
        let res = send(
            self.client.get(self.url(&format!("articles/{article}"))),
            "fetching article",
        )
        .await;
        match res {
            Err(e) if e.api() == Some(&api::Error::NotFound) => Ok(None),
            // some deployments answer `null` rather than a 404
            res => res,
        }
    }

    async fn vote_article(
        &self,
        token: &AuthToken,
        article: &ArticleId,
        vote: Vote,
    ) -> Result<Article, Error> {
        send(
            self.client
                .post(self.url(&format!("articles/{article}/{}", vote.path())))
                .bearer_auth(&token.0),
            "voting on article",
        )
        .await
    }

    async fn update_article(
        &self,
        token: &AuthToken,
        article: &ArticleId,
        update: &ArticleUpdate,
    ) -> Result<Article, Error> {
        send(
            self.client
                .put(self.url(&format!("articles/{article}")))
                .bearer_auth(&token.0)
                .json(update),
            "updating article",
        )
        .await
    }

    async fn delete_article(&self, token: &AuthToken, article: &ArticleId) -> Result<(), Error> {
        send_empty(
            self.client
                .delete(self.url(&format!("articles/{article}")))
                .bearer_auth(&token.0),
            "deleting article",
        )
        .await
    }
}
