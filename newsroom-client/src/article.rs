use parking_lot::Mutex;

use crate::{
    api::{Article, ArticleId, ArticleUpdate, Vote},
    Confirm, Deletion, Error, Gateway, Identity,
};

/// What the article detail view currently shows.
///
/// `Loading -> Viewing <-> Editing`, `Loading -> NotFound`, and
/// `Viewing -> Deleted` once a confirmed deletion went through.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ArticleView {
    Loading,
    NotFound,
    Viewing(Article),
    Editing {
        article: Article,
        form: ArticleUpdate,
    },
    Deleted,
}

impl ArticleView {
    pub fn article(&self) -> Option<&Article> {
        match self {
            ArticleView::Viewing(article) | ArticleView::Editing { article, .. } => Some(article),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct Panel {
    id: Option<ArticleId>,
    view: ArticleView,
}

/// Like/dislike, in-place edit and delete of a single article, with the same
/// replace-on-response discipline as the comment thread.
pub struct ArticlePanel<G> {
    gateway: G,
    state: Mutex<Panel>,
}

impl<G: Gateway> ArticlePanel<G> {
    pub fn new(gateway: G) -> ArticlePanel<G> {
        ArticlePanel {
            gateway,
            state: Mutex::new(Panel {
                id: None,
                view: ArticleView::Loading,
            }),
        }
    }

    pub fn view(&self) -> ArticleView {
        self.state.lock().view.clone()
    }

    pub fn article_id(&self) -> Option<ArticleId> {
        self.state.lock().id.clone()
    }

    /// Whether the caller should navigate away from the detail view
    pub fn should_navigate_away(&self) -> bool {
        self.state.lock().view == ArticleView::Deleted
    }

    pub async fn load(&self, id: &ArticleId) -> Result<ArticleView, Error> {
        {
            let mut st = self.state.lock();
            st.id = Some(id.clone());
            st.view = ArticleView::Loading;
        }
        tracing::debug!(article = %id, "loading article");
        let res = self.gateway.fetch_article(id).await;

        let mut st = self.state.lock();
        if st.id.as_ref() != Some(id) {
            tracing::warn!(article = %id, "discarding article no longer displayed");
            return res.map(|a| a.map(ArticleView::Viewing).unwrap_or(ArticleView::NotFound));
        }
        match res {
            Ok(Some(article)) => st.view = ArticleView::Viewing(article),
            Ok(None) => st.view = ArticleView::NotFound,
            Err(err) => {
                tracing::warn!(%err, article = %id, "loading article failed");
                st.view = ArticleView::NotFound;
                return Err(err);
            }
        }
        Ok(st.view.clone())
    }

    pub async fn like(&self, actor: &Identity) -> Result<Article, Error> {
        self.vote(Vote::Like, actor).await
    }

    pub async fn dislike(&self, actor: &Identity) -> Result<Article, Error> {
        self.vote(Vote::Dislike, actor).await
    }

    async fn vote(&self, vote: Vote, actor: &Identity) -> Result<Article, Error> {
        let token = actor.bearer()?;
        let id = self.viewed_id()?;
        tracing::debug!(article = %id, ?vote, "voting on article");
        let updated = self
            .gateway
            .vote_article(token, &id, vote)
            .await
            .map_err(|err| {
                tracing::warn!(%err, article = %id, "voting on article failed");
                err
            })?;
        self.replace(updated.clone());
        Ok(updated)
    }

    /// Switch to the edit form, seeded with the current field values
    pub fn begin_edit(&self) -> Result<(), Error> {
        let mut st = self.state.lock();
        match &st.view {
            ArticleView::Viewing(article) => {
                let article = article.clone();
                st.view = ArticleView::Editing {
                    form: ArticleUpdate::from(&article),
                    article,
                };
                Ok(())
            }
            _ => Err(Error::Unavailable("only a displayed article can be edited")),
        }
    }

    /// Change the pending edit form
    pub fn edit_form<R>(&self, f: impl FnOnce(&mut ArticleUpdate) -> R) -> Result<R, Error> {
        match &mut self.state.lock().view {
            ArticleView::Editing { form, .. } => Ok(f(form)),
            _ => Err(Error::Unavailable("the article is not being edited")),
        }
    }

    pub fn cancel_edit(&self) {
        let mut st = self.state.lock();
        st.view = match std::mem::replace(&mut st.view, ArticleView::Loading) {
            ArticleView::Editing { article, .. } => ArticleView::Viewing(article),
            other => other,
        };
    }

    /// Send the edit form. On success the server's article replaces ours and
    /// the view goes back to reading; on failure the form stays open.
    pub async fn submit_edit(&self, actor: &Identity) -> Result<Article, Error> {
        let (id, form) = {
            let st = self.state.lock();
            match (&st.id, &st.view) {
                (Some(id), ArticleView::Editing { form, .. }) => (id.clone(), form.clone()),
                _ => return Err(Error::Unavailable("the article is not being edited")),
            }
        };
        form.validate()?;
        let token = actor.bearer()?;
        tracing::debug!(article = %id, "updating article");
        let updated = self
            .gateway
            .update_article(token, &id, &form)
            .await
            .map_err(|err| {
                tracing::warn!(%err, article = %id, "updating article failed");
                err
            })?;

        let mut st = self.state.lock();
        if st.id.as_ref() != Some(&updated.id) {
            tracing::warn!(
                article = %updated.id,
                "discarding update of an article no longer displayed"
            );
            return Ok(updated);
        }
        match st.view {
            ArticleView::Viewing(_) | ArticleView::Editing { .. } => {
                st.view = ArticleView::Viewing(updated.clone())
            }
            // `Deleted` is terminal
            _ => tracing::warn!(
                article = %updated.id,
                "discarding update of an article not displayed"
            ),
        }
        Ok(updated)
    }

    /// Delete the displayed article after the user confirmed it. Once done,
    /// the view is `Deleted` and the caller should navigate away.
    pub async fn delete(&self, actor: &Identity, confirm: &dyn Confirm) -> Result<Deletion, Error> {
        let token = actor.bearer()?;
        let id = self.viewed_id()?;
        if !confirm.confirm("Are you sure you want to delete this article?") {
            tracing::debug!(article = %id, "article deletion declined");
            return Ok(Deletion::Declined);
        }
        tracing::debug!(article = %id, "deleting article");
        self.gateway
            .delete_article(token, &id)
            .await
            .map_err(|err| {
                tracing::warn!(%err, article = %id, "deleting article failed");
                err
            })?;

        let mut st = self.state.lock();
        if st.id.as_ref() == Some(&id) {
            st.view = ArticleView::Deleted;
        }
        Ok(Deletion::Done(()))
    }

    fn viewed_id(&self) -> Result<ArticleId, Error> {
        let st = self.state.lock();
        match (&st.id, &st.view) {
            (Some(id), ArticleView::Viewing(_)) => Ok(id.clone()),
            _ => Err(Error::Unavailable("no article is being viewed")),
        }
    }

    /// Swap in the server's article, keeping an open edit form as it is
    fn replace(&self, updated: Article) {
        let mut st = self.state.lock();
        if st.id.as_ref() != Some(&updated.id) {
            tracing::warn!(
                article = %updated.id,
                "discarding response for an article no longer displayed"
            );
            return;
        }
        match &mut st.view {
            ArticleView::Viewing(article) | ArticleView::Editing { article, .. } => {
                *article = updated
            }
            _ => tracing::warn!(
                article = %updated.id,
                "discarding response for an article not displayed"
            ),
        }
    }
}
