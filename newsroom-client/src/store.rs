use std::sync::Arc;

use anyhow::anyhow;
use parking_lot::Mutex;

use crate::{
    api::{self, ArticleId, Comment, CommentId, ReplyId, Vote},
    Confirm, Controls, Deletion, EntityKey, Error, Gateway, Identity, Overlay, UiState,
};

#[derive(Debug, Default)]
struct Thread {
    /// Article whose thread is currently displayed
    article: Option<ArticleId>,

    /// Comments in the order the server returned them
    comments: Arc<Vec<Comment>>,

    loading: bool,
    overlay: Overlay,
}

impl Thread {
    fn is_current(&self, article: &ArticleId) -> bool {
        self.article.as_ref() == Some(article)
    }

    fn prune_overlay(&mut self) {
        let comments = &self.comments;
        self.overlay.prune(|k| match k {
            EntityKey::Comment(id) => comments.iter().any(|c| c.id == *id),
            EntityKey::Reply(id) => comments
                .iter()
                .any(|c| c.replies.iter().any(|r| r.id == *id)),
        });
    }
}

/// The comment thread of one article.
///
/// Every mutation goes to the server first; local state only ever changes by
/// swapping in what the server answered. Calls may overlap: the lock is never
/// held while waiting on the gateway, and whichever response lands last wins.
pub struct CommentStore<G> {
    gateway: G,
    state: Mutex<Thread>,
}

fn logged<T>(what: &str, res: Result<T, Error>) -> Result<T, Error> {
    if let Err(err) = &res {
        tracing::warn!(%err, "{what} failed");
    }
    res
}

impl<G: Gateway> CommentStore<G> {
    pub fn new(gateway: G) -> CommentStore<G> {
        CommentStore {
            gateway,
            state: Mutex::new(Thread::default()),
        }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn article(&self) -> Option<ArticleId> {
        self.state.lock().article.clone()
    }

    pub fn comments(&self) -> Arc<Vec<Comment>> {
        self.state.lock().comments.clone()
    }

    pub fn comment(&self, id: &CommentId) -> Option<Comment> {
        self.state
            .lock()
            .comments
            .iter()
            .find(|c| c.id == *id)
            .cloned()
    }

    pub fn is_loading(&self) -> bool {
        self.state.lock().loading
    }

    pub fn with_overlay<R>(&self, f: impl FnOnce(&mut Overlay) -> R) -> R {
        f(&mut self.state.lock().overlay)
    }

    pub fn ui_state(&self, key: &EntityKey) -> UiState {
        self.state.lock().overlay.state(key)
    }

    /// Controls to show for an entity of the current thread, `None` if it is
    /// not in the thread
    pub fn controls(&self, key: &EntityKey, actor: &Identity) -> Option<Controls> {
        let st = self.state.lock();
        let ui = st.overlay.state(key);
        match key {
            EntityKey::Comment(id) => st
                .comments
                .iter()
                .find(|c| c.id == *id)
                .map(|c| Controls::for_comment(c, actor, &ui)),
            EntityKey::Reply(id) => st
                .comments
                .iter()
                .find_map(|c| c.replies.iter().find(|r| r.id == *id))
                .map(|r| Controls::for_reply(r, actor, &ui)),
        }
    }

    /// Fetch the whole thread of `article` and make it the displayed one.
    ///
    /// On failure the thread is left empty and loading stops; there is no
    /// retry.
    pub async fn load_thread(&self, article: &ArticleId) -> Result<Arc<Vec<Comment>>, Error> {
        {
            let mut st = self.state.lock();
            if !st.is_current(article) {
                st.article = Some(article.clone());
                st.comments = Arc::new(Vec::new());
                st.overlay = Overlay::default();
            }
            st.loading = true;
        }
        tracing::debug!(%article, "loading comment thread");
        let res = logged(
            "loading comment thread",
            self.gateway.fetch_thread(article).await,
        );

        let mut st = self.state.lock();
        if !st.is_current(article) {
            tracing::warn!(%article, "discarding thread of an article no longer displayed");
            return res.map(Arc::new);
        }
        st.loading = false;
        match res {
            Ok(comments) => {
                tracing::debug!(%article, num_comments = comments.len(), "loaded comment thread");
                st.comments = Arc::new(comments);
                st.prune_overlay();
                Ok(st.comments.clone())
            }
            Err(err) => {
                st.comments = Arc::new(Vec::new());
                st.prune_overlay();
                Err(err)
            }
        }
    }

    /// Post a new top-level comment; it lands at the end of the thread
    pub async fn post_comment(
        &self,
        article: &ArticleId,
        text: &str,
        actor: &Identity,
    ) -> Result<Comment, Error> {
        api::validate_text(text)?;
        let token = actor.bearer()?;
        tracing::debug!(%article, "posting comment");
        let created = logged(
            "posting comment",
            self.gateway.post_comment(token, article, text).await,
        )?;

        let mut st = self.state.lock();
        if !st.is_current(&created.article_id) {
            tracing::warn!(
                comment = %created.id,
                "discarding new comment of an article no longer displayed"
            );
            return Ok(created);
        }
        let comments = Arc::make_mut(&mut st.comments);
        match comments.iter_mut().find(|c| c.id == created.id) {
            Some(c) => *c = created.clone(),
            None => comments.push(created.clone()),
        }
        Ok(created)
    }

    pub async fn edit_comment(
        &self,
        comment: &CommentId,
        text: &str,
        actor: &Identity,
    ) -> Result<Comment, Error> {
        api::validate_text(text)?;
        let token = actor.bearer()?;
        tracing::debug!(%comment, "editing comment");
        let updated = logged(
            "editing comment",
            self.gateway.edit_comment(token, comment, text).await,
        )?;
        if self.replace(comment, updated.clone())? {
            self.with_overlay(|o| o.cancel_edit(&EntityKey::Comment(comment.clone())));
        }
        Ok(updated)
    }

    /// Delete a comment after the user confirmed it
    pub async fn delete_comment(
        &self,
        comment: &CommentId,
        actor: &Identity,
        confirm: &dyn Confirm,
    ) -> Result<Deletion, Error> {
        let token = actor.bearer()?;
        if !confirm.confirm("Are you sure you want to delete this comment?") {
            tracing::debug!(%comment, "comment deletion declined");
            return Ok(Deletion::Declined);
        }
        tracing::debug!(%comment, "deleting comment");
        logged(
            "deleting comment",
            self.gateway.delete_comment(token, comment).await,
        )?;

        let mut st = self.state.lock();
        let st = &mut *st;
        if st.comments.iter().any(|c| c.id == *comment) {
            Arc::make_mut(&mut st.comments).retain(|c| c.id != *comment);
            st.prune_overlay();
        } else {
            tracing::warn!(%comment, "deleted comment was not in the displayed thread");
        }
        Ok(Deletion::Done(()))
    }

    /// Like or dislike a comment. Counts come from the server's answer only.
    pub async fn vote_comment(
        &self,
        comment: &CommentId,
        vote: Vote,
        actor: &Identity,
    ) -> Result<Comment, Error> {
        let token = actor.bearer()?;
        tracing::debug!(%comment, ?vote, "voting on comment");
        let updated = logged(
            "voting on comment",
            self.gateway.vote_comment(token, comment, vote).await,
        )?;
        self.replace(comment, updated.clone())?;
        Ok(updated)
    }

    /// Returns the parent comment with its refreshed replies
    pub async fn post_reply(
        &self,
        comment: &CommentId,
        text: &str,
        actor: &Identity,
    ) -> Result<Comment, Error> {
        api::validate_text(text)?;
        let token = actor.bearer()?;
        tracing::debug!(%comment, "posting reply");
        let updated = logged(
            "posting reply",
            self.gateway.post_reply(token, comment, text).await,
        )?;
        if self.replace(comment, updated.clone())? {
            let key = EntityKey::Comment(comment.clone());
            self.with_overlay(|o| {
                o.close_reply(&key);
                o.set_replies_visible(&key, true);
            });
        }
        Ok(updated)
    }

    pub async fn edit_reply(
        &self,
        comment: &CommentId,
        reply: &ReplyId,
        text: &str,
        actor: &Identity,
    ) -> Result<Comment, Error> {
        api::validate_text(text)?;
        let token = actor.bearer()?;
        tracing::debug!(%comment, %reply, "editing reply");
        let updated = logged(
            "editing reply",
            self.gateway.edit_reply(token, comment, reply, text).await,
        )?;
        if self.replace(comment, updated.clone())? {
            self.with_overlay(|o| o.cancel_edit(&EntityKey::Reply(reply.clone())));
        }
        Ok(updated)
    }

    pub async fn delete_reply(
        &self,
        comment: &CommentId,
        reply: &ReplyId,
        actor: &Identity,
        confirm: &dyn Confirm,
    ) -> Result<Deletion<Comment>, Error> {
        let token = actor.bearer()?;
        if !confirm.confirm("Are you sure you want to delete this reply?") {
            tracing::debug!(%comment, %reply, "reply deletion declined");
            return Ok(Deletion::Declined);
        }
        tracing::debug!(%comment, %reply, "deleting reply");
        let updated = logged(
            "deleting reply",
            self.gateway.delete_reply(token, comment, reply).await,
        )?;
        if self.replace(comment, updated.clone())? {
            self.with_overlay(|o| o.remove(&EntityKey::Reply(reply.clone())));
        }
        Ok(Deletion::Done(updated))
    }

    /// Swap the server's version of `expected` into the thread.
    ///
    /// Returns whether it was applied: responses for a thread that is no
    /// longer displayed, or for a comment that went away meanwhile, are
    /// dropped.
    fn replace(&self, expected: &CommentId, updated: Comment) -> Result<bool, Error> {
        if updated.id != *expected {
            return Err(Error::Fetch(anyhow!(
                "server answered with comment {} instead of {}",
                updated.id,
                expected
            )));
        }
        let mut st = self.state.lock();
        if !st.is_current(&updated.article_id) {
            tracing::warn!(
                comment = %updated.id,
                "discarding response for an article no longer displayed"
            );
            return Ok(false);
        }
        match Arc::make_mut(&mut st.comments)
            .iter_mut()
            .find(|c| c.id == updated.id)
        {
            Some(c) => {
                *c = updated;
                Ok(true)
            }
            None => {
                tracing::warn!(
                    comment = %updated.id,
                    "discarding response for a comment no longer displayed"
                );
                Ok(false)
            }
        }
    }
}
