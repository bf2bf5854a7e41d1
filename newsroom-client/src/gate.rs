use crate::{
    api::{Comment, Reply},
    Identity, UiState,
};

/// Edit and delete are for the author only, compared by username.
///
/// This only drives what the view shows. The server re-checks every
/// mutation on its own.
pub fn can_modify(author_username: &str, actor_username: Option<&str>) -> bool {
    actor_username == Some(author_username)
}

pub fn can_vote(actor: &Identity) -> bool {
    actor.is_logged_in()
}

pub fn can_reply(actor: &Identity) -> bool {
    actor.is_logged_in()
}

/// Which controls to offer to whom for one comment or reply
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Controls {
    pub vote: bool,
    pub reply: bool,
    pub edit: bool,
    pub delete: bool,
    /// Save and cancel buttons of the edit form
    pub save_edit: bool,
}

impl Controls {
    pub fn for_comment(comment: &Comment, actor: &Identity, ui: &UiState) -> Controls {
        let owner = can_modify(&comment.author.username, actor.username());
        if ui.is_editing {
            return Controls {
                save_edit: owner,
                ..Controls::default()
            };
        }
        Controls {
            vote: can_vote(actor),
            reply: can_reply(actor),
            edit: owner,
            delete: owner,
            save_edit: false,
        }
    }

    pub fn for_reply(reply: &Reply, actor: &Identity, ui: &UiState) -> Controls {
        let owner = can_modify(&reply.author.username, actor.username());
        if ui.is_editing {
            return Controls {
                save_edit: owner,
                ..Controls::default()
            };
        }
        Controls {
            edit: owner,
            delete: owner,
            ..Controls::default()
        }
    }
}
