use std::collections::HashMap;

use crate::api::{Comment, CommentId, Reply, ReplyId};

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum EntityKey {
    Comment(CommentId),
    Reply(ReplyId),
}

impl From<&Comment> for EntityKey {
    fn from(c: &Comment) -> EntityKey {
        EntityKey::Comment(c.id.clone())
    }
}

impl From<&Reply> for EntityKey {
    fn from(r: &Reply) -> EntityKey {
        EntityKey::Reply(r.id.clone())
    }
}

/// Presentation state of a single comment or reply. Never sent anywhere.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct UiState {
    pub is_editing: bool,
    pub draft: String,
    pub is_reply_open: bool,
    pub reply_draft: String,
    pub replies_visible: bool,
}

/// Per-entity UI state, kept apart from the comment list so that replacing
/// comments with the server's version leaves open forms alone.
#[derive(Clone, Debug, Default)]
pub struct Overlay {
    entries: HashMap<EntityKey, UiState>,
}

impl Overlay {
    pub fn get(&self, key: &EntityKey) -> Option<&UiState> {
        self.entries.get(key)
    }

    /// State for `key`, defaulted if it was never touched
    pub fn state(&self, key: &EntityKey) -> UiState {
        self.entries.get(key).cloned().unwrap_or_default()
    }

    fn entry(&mut self, key: &EntityKey) -> &mut UiState {
        self.entries.entry(key.clone()).or_default()
    }

    /// Editing hides the reply form
    pub fn set_editing(&mut self, key: &EntityKey, editing: bool) {
        tracing::trace!(?key, editing, "set editing");
        let e = self.entry(key);
        e.is_editing = editing;
        if editing {
            e.is_reply_open = false;
        }
    }

    pub fn set_draft(&mut self, key: &EntityKey, text: impl Into<String>) {
        self.entry(key).draft = text.into();
    }

    /// Ignored for replies, and while the entity is being edited
    pub fn set_reply_open(&mut self, key: &EntityKey, open: bool) {
        if open && matches!(key, EntityKey::Reply(_)) {
            tracing::trace!(?key, "replies cannot be replied to");
            return;
        }
        let e = self.entry(key);
        if open && e.is_editing {
            tracing::trace!(?key, "not opening reply form while editing");
            return;
        }
        e.is_reply_open = open;
    }

    pub fn set_reply_draft(&mut self, key: &EntityKey, text: impl Into<String>) {
        self.entry(key).reply_draft = text.into();
    }

    pub fn set_replies_visible(&mut self, key: &EntityKey, visible: bool) {
        self.entry(key).replies_visible = visible;
    }

    /// Enter edit mode with the draft seeded from the current body
    pub fn begin_edit(&mut self, key: &EntityKey, body: &str) {
        self.set_editing(key, true);
        self.set_draft(key, body);
    }

    pub fn cancel_edit(&mut self, key: &EntityKey) {
        if let Some(e) = self.entries.get_mut(key) {
            e.is_editing = false;
            e.draft.clear();
        }
    }

    pub(crate) fn close_reply(&mut self, key: &EntityKey) {
        if let Some(e) = self.entries.get_mut(key) {
            e.is_reply_open = false;
            e.reply_draft.clear();
        }
    }

    pub fn remove(&mut self, key: &EntityKey) {
        self.entries.remove(key);
    }

    /// Drop the state of every entity for which `is_live` returns false
    pub fn prune(&mut self, mut is_live: impl FnMut(&EntityKey) -> bool) {
        self.entries.retain(|k, _| is_live(k));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
