use std::time::Duration;

use newsroom_client::{
    api::{ArticleId, ArticleUpdate, AuthToken, Comment, Role, UserId, Vote},
    CommentStore, Deletion, EntityKey, Error, Identity,
};
use newsroom_mock_server::{MockGateway, MockServer};

struct World {
    gw: MockGateway,
    article: ArticleId,
    alice: Identity,
    bob: Identity,
}

fn article_data(title: &str) -> ArticleUpdate {
    ArticleUpdate {
        title: String::from(title),
        body: String::from("Residents queued for hours."),
        image_url: None,
        state: String::from("Goa"),
        city: String::from("Panaji"),
        category: String::from("Local"),
    }
}

fn identity(tok: AuthToken) -> Identity {
    Identity::from_token(tok).expect("decoding mock token")
}

fn world() -> World {
    let mut server = MockServer::new();
    let alice = server.register("alice", Role::Reader);
    let bob = server.register("bob", Role::Reader);
    let article = server
        .publish_article(&alice, article_data("Water supply restored"))
        .expect("publishing article")
        .id;
    World {
        gw: MockGateway::new(server),
        article,
        alice: identity(alice),
        bob: identity(bob),
    }
}

fn yes(_: &str) -> bool {
    true
}

fn no(_: &str) -> bool {
    false
}

fn bodies(comments: &[Comment]) -> Vec<String> {
    comments.iter().map(|c| c.body.clone()).collect()
}

fn user_id(who: &Identity) -> UserId {
    who.user_id().expect("logged in").clone()
}

#[tokio::test]
async fn alice_posts_a_comment() {
    let w = world();
    let store = CommentStore::new(w.gw.clone());
    store.load_thread(&w.article).await.unwrap();
    assert!(store.comments().is_empty());

    let c = store
        .post_comment(&w.article, "Great read!", &w.alice)
        .await
        .unwrap();
    let comments = store.comments();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].author.username, "alice");
    assert_eq!(comments[0].body, "Great read!");
    assert!(comments[0].likes.is_empty());
    assert!(comments[0].dislikes.is_empty());
    assert!(comments[0].replies.is_empty());

    // what we hold is exactly what the server has
    let reloaded = store.load_thread(&w.article).await.unwrap();
    assert_eq!(*reloaded, vec![c]);
}

#[tokio::test]
async fn comments_keep_server_order() {
    let w = world();
    let store = CommentStore::new(w.gw.clone());
    store.load_thread(&w.article).await.unwrap();
    for (who, text) in [(&w.alice, "one"), (&w.bob, "two"), (&w.alice, "three")] {
        store.post_comment(&w.article, text, who).await.unwrap();
    }
    assert_eq!(bodies(&store.comments()), ["one", "two", "three"]);
    store.load_thread(&w.article).await.unwrap();
    assert_eq!(bodies(&store.comments()), ["one", "two", "three"]);
}

#[tokio::test]
async fn bob_replies_to_alice() {
    let w = world();
    let store = CommentStore::new(w.gw.clone());
    store.load_thread(&w.article).await.unwrap();
    let c = store
        .post_comment(&w.article, "Great read!", &w.alice)
        .await
        .unwrap();
    let key = EntityKey::Comment(c.id.clone());
    store.with_overlay(|o| {
        o.set_reply_open(&key, true);
        o.set_reply_draft(&key, "I agree");
    });

    let parent = store.post_reply(&c.id, "I agree", &w.bob).await.unwrap();
    assert_eq!(parent.id, c.id);
    assert_eq!(parent.body, "Great read!");
    assert_eq!(parent.likes, c.likes);
    assert_eq!(parent.dislikes, c.dislikes);
    assert_eq!(parent.replies.len(), 1);
    assert_eq!(parent.replies[0].author.username, "bob");
    assert_eq!(parent.replies[0].body, "I agree");
    assert_eq!(store.comment(&c.id), Some(parent));

    let ui = store.ui_state(&key);
    assert!(!ui.is_reply_open);
    assert!(ui.reply_draft.is_empty());
    assert!(ui.replies_visible);
}

#[tokio::test]
async fn alice_edits_her_comment() {
    let w = world();
    let store = CommentStore::new(w.gw.clone());
    store.load_thread(&w.article).await.unwrap();
    let c = store
        .post_comment(&w.article, "Great read!", &w.alice)
        .await
        .unwrap();
    let sibling = store
        .post_comment(&w.article, "Meh.", &w.bob)
        .await
        .unwrap();
    store.post_reply(&c.id, "I agree", &w.bob).await.unwrap();
    let before = store
        .vote_comment(&c.id, Vote::Like, &w.bob)
        .await
        .unwrap();

    let key = EntityKey::Comment(c.id.clone());
    store.with_overlay(|o| o.begin_edit(&key, &before.body));
    assert!(store.ui_state(&key).is_editing);

    let after = store
        .edit_comment(&c.id, "Great read, thanks!", &w.alice)
        .await
        .unwrap();
    assert_eq!(after.id, c.id);
    assert_eq!(after.body, "Great read, thanks!");
    assert_eq!(after.replies, before.replies);
    assert_eq!(after.likes, before.likes);
    assert_eq!(after.dislikes, before.dislikes);
    assert!(!store.ui_state(&key).is_editing);

    let comments = store.comments();
    assert_eq!(comments.len(), 2);
    assert_eq!(comments[0], after);
    assert_eq!(comments[1], sibling);
}

#[tokio::test]
async fn anonymous_visitor_cannot_vote() {
    let w = world();
    let store = CommentStore::new(w.gw.clone());
    store.load_thread(&w.article).await.unwrap();
    let c = store
        .post_comment(&w.article, "Great read!", &w.alice)
        .await
        .unwrap();
    let anon = Identity::anonymous();

    let controls = store
        .controls(&EntityKey::Comment(c.id.clone()), &anon)
        .unwrap();
    assert!(!controls.vote);
    assert!(!controls.reply);
    assert!(!controls.edit);

    let calls = w.gw.calls();
    let res = store.vote_comment(&c.id, Vote::Like, &anon).await;
    assert!(matches!(res, Err(Error::Auth(_))));
    let res = store.post_comment(&w.article, "hi", &anon).await;
    assert!(matches!(res, Err(Error::Auth(_))));
    let res = store.delete_comment(&c.id, &anon, &yes).await;
    assert!(matches!(res, Err(Error::Auth(_))));
    assert_eq!(w.gw.calls(), calls);
    assert_eq!(store.comment(&c.id), Some(c));
}

#[tokio::test]
async fn blank_text_is_rejected_locally() {
    let w = world();
    let store = CommentStore::new(w.gw.clone());
    store.load_thread(&w.article).await.unwrap();
    let c = store
        .post_comment(&w.article, "Great read!", &w.alice)
        .await
        .unwrap();
    let calls = w.gw.calls();

    for text in ["", "   ", "\n\t "] {
        let res = store.post_comment(&w.article, text, &w.alice).await;
        assert!(matches!(res, Err(Error::Validation(_))), "{text:?}");
        let res = store.edit_comment(&c.id, text, &w.alice).await;
        assert!(matches!(res, Err(Error::Validation(_))), "{text:?}");
        let res = store.post_reply(&c.id, text, &w.bob).await;
        assert!(matches!(res, Err(Error::Validation(_))), "{text:?}");
    }
    assert_eq!(w.gw.calls(), calls);
    assert_eq!(*store.comments(), vec![c]);
}

#[tokio::test]
async fn declined_deletion_sends_nothing() {
    let w = world();
    let store = CommentStore::new(w.gw.clone());
    store.load_thread(&w.article).await.unwrap();
    let c = store
        .post_comment(&w.article, "Great read!", &w.alice)
        .await
        .unwrap();
    let parent = store.post_reply(&c.id, "I agree", &w.bob).await.unwrap();
    let reply = parent.replies[0].id.clone();
    let calls = w.gw.calls();

    let res = store.delete_comment(&c.id, &w.alice, &no).await.unwrap();
    assert_eq!(res, Deletion::Declined);
    let res = store
        .delete_reply(&c.id, &reply, &w.bob, &no)
        .await
        .unwrap();
    assert_eq!(res, Deletion::Declined);
    assert_eq!(w.gw.calls(), calls);
    assert_eq!(*store.comments(), vec![parent]);
}

#[tokio::test]
async fn deletion_removes_exactly_one() {
    let w = world();
    let store = CommentStore::new(w.gw.clone());
    store.load_thread(&w.article).await.unwrap();
    let first = store
        .post_comment(&w.article, "first", &w.alice)
        .await
        .unwrap();
    let second = store
        .post_comment(&w.article, "second", &w.bob)
        .await
        .unwrap();
    let key = EntityKey::Comment(first.id.clone());
    store.with_overlay(|o| o.set_draft(&key, "half-written"));

    let res = store.delete_comment(&first.id, &w.alice, &yes).await.unwrap();
    assert!(res.is_done());
    assert_eq!(*store.comments(), vec![second]);
    assert!(store.with_overlay(|o| o.get(&key).is_none()));
}

#[tokio::test]
async fn server_refuses_foreign_deletion() {
    let w = world();
    let store = CommentStore::new(w.gw.clone());
    store.load_thread(&w.article).await.unwrap();
    let c = store
        .post_comment(&w.article, "mine", &w.alice)
        .await
        .unwrap();

    // the gate hides the button, but a forged call still reaches the server
    let controls = store
        .controls(&EntityKey::Comment(c.id.clone()), &w.bob)
        .unwrap();
    assert!(!controls.delete);
    let res = store.delete_comment(&c.id, &w.bob, &yes).await;
    assert!(matches!(res, Err(Error::Auth(_))));
    let res = store.edit_comment(&c.id, "not yours", &w.bob).await;
    assert!(matches!(res, Err(Error::Auth(_))));
    assert_eq!(*store.comments(), vec![c]);
}

#[tokio::test]
async fn replies_are_edited_and_deleted_through_parent() {
    let w = world();
    let store = CommentStore::new(w.gw.clone());
    store.load_thread(&w.article).await.unwrap();
    let c = store
        .post_comment(&w.article, "Great read!", &w.alice)
        .await
        .unwrap();
    store.post_reply(&c.id, "I agree", &w.bob).await.unwrap();
    let parent = store
        .post_reply(&c.id, "Thanks!", &w.alice)
        .await
        .unwrap();
    let bobs = parent.replies[0].id.clone();
    let key = EntityKey::Reply(bobs.clone());
    store.with_overlay(|o| o.begin_edit(&key, "I agree"));

    let parent = store
        .edit_reply(&c.id, &bobs, "I fully agree", &w.bob)
        .await
        .unwrap();
    assert_eq!(parent.replies[0].body, "I fully agree");
    assert_eq!(parent.replies[1].body, "Thanks!");
    assert!(!store.ui_state(&key).is_editing);

    let res = store
        .delete_reply(&c.id, &bobs, &w.alice, &yes)
        .await;
    assert!(matches!(res, Err(Error::Auth(_))));

    let res = store
        .delete_reply(&c.id, &bobs, &w.bob, &yes)
        .await
        .unwrap();
    let parent = match res {
        Deletion::Done(parent) => parent,
        Deletion::Declined => panic!("deletion was confirmed"),
    };
    assert_eq!(parent.replies.len(), 1);
    assert_eq!(parent.replies[0].body, "Thanks!");
    assert_eq!(store.comment(&c.id), Some(parent));
}

#[tokio::test]
async fn votes_come_from_the_server() {
    let w = world();
    let store = CommentStore::new(w.gw.clone());
    store.load_thread(&w.article).await.unwrap();
    let c = store
        .post_comment(&w.article, "Great read!", &w.alice)
        .await
        .unwrap();

    store
        .vote_comment(&c.id, Vote::Like, &w.bob)
        .await
        .unwrap();
    // repeated likes do not pile up, but a like and a dislike coexist
    store
        .vote_comment(&c.id, Vote::Like, &w.bob)
        .await
        .unwrap();
    let c = store
        .vote_comment(&c.id, Vote::Dislike, &w.bob)
        .await
        .unwrap();
    assert_eq!(c.likes, vec![user_id(&w.bob)]);
    assert_eq!(c.dislikes, vec![user_id(&w.bob)]);
    assert_eq!(store.comment(&c.id), Some(c));
}

#[tokio::test]
async fn vote_on_vanished_comment_changes_nothing() {
    let w = world();
    let store = CommentStore::new(w.gw.clone());
    store.load_thread(&w.article).await.unwrap();
    let gone = store
        .post_comment(&w.article, "First!", &w.alice)
        .await
        .unwrap();
    store
        .post_comment(&w.article, "Second!", &w.bob)
        .await
        .unwrap();

    // alice deletes it from another tab
    let token = w.alice.token().expect("logged in").clone();
    w.gw
        .with_server(|s| s.delete_comment(&token, &gone.id))
        .unwrap();

    let before = store.comments();
    let err = store
        .vote_comment(&gone.id, Vote::Like, &w.bob)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Fetch(_)));
    assert_eq!(err.api(), Some(&newsroom_client::api::Error::NotFound));
    assert_eq!(store.comments(), before);
    assert_eq!(bodies(&store.comments()), ["First!", "Second!"]);
}

#[tokio::test]
async fn last_response_wins() {
    let w = world();
    let store = CommentStore::new(w.gw.clone());
    store.load_thread(&w.article).await.unwrap();
    let c = store
        .post_comment(&w.article, "Great read!", &w.alice)
        .await
        .unwrap();

    // alice's like reaches the server first, but its answer comes back last
    w.gw.delay_next(Duration::from_millis(50));
    let (first, second) = tokio::join!(
        store.vote_comment(&c.id, Vote::Like, &w.alice),
        store.vote_comment(&c.id, Vote::Like, &w.bob),
    );
    let first = first.unwrap();
    let second = second.unwrap();
    assert_eq!(first.likes.len(), 1);
    assert_eq!(second.likes.len(), 2);
    assert_eq!(store.comment(&c.id), Some(first));

    let fresh = store.load_thread(&w.article).await.unwrap();
    assert_eq!(fresh[0], second);
}

#[tokio::test]
async fn stale_thread_is_discarded() {
    let w = world();
    let other = w
        .gw
        .with_server(|s| {
            let tok = s.register("carol", Role::Reader);
            let a = s.publish_article(&tok, article_data("Bridge reopens"))?;
            s.post_comment(&tok, &a.id, "Finally")?;
            Ok::<_, newsroom_client::api::Error>(a.id)
        })
        .unwrap();
    let store = CommentStore::new(w.gw.clone());
    store.load_thread(&w.article).await.unwrap();
    store
        .post_comment(&w.article, "Great read!", &w.alice)
        .await
        .unwrap();

    w.gw.delay_next(Duration::from_millis(50));
    let (old, new) = tokio::join!(store.load_thread(&w.article), store.load_thread(&other));
    assert_eq!(old.unwrap().len(), 1);
    assert_eq!(new.unwrap().len(), 1);
    assert_eq!(store.article(), Some(other.clone()));
    assert_eq!(store.comments()[0].body, "Finally");
    assert!(!store.is_loading());
}

#[tokio::test]
async fn responses_for_another_thread_are_dropped() {
    let w = world();
    let other = w
        .gw
        .with_server(|s| {
            let tok = s.register("carol", Role::Reader);
            s.publish_article(&tok, article_data("Bridge reopens"))
        })
        .unwrap()
        .id;
    let store = CommentStore::new(w.gw.clone());
    store.load_thread(&other).await.unwrap();

    let c = store
        .post_comment(&w.article, "Great read!", &w.alice)
        .await
        .unwrap();
    assert_eq!(c.article_id, w.article);
    assert!(store.comments().is_empty());

    w.gw.delay_next(Duration::from_millis(50));
    let (vote, load) = tokio::join!(
        store.vote_comment(&c.id, Vote::Like, &w.bob),
        store.load_thread(&other),
    );
    assert_eq!(vote.unwrap().likes.len(), 1);
    assert!(load.unwrap().is_empty());
    assert!(store.comments().is_empty());
}

#[tokio::test]
async fn failed_load_leaves_empty_thread() {
    let w = world();
    let store = CommentStore::new(w.gw.clone());
    store.load_thread(&w.article).await.unwrap();
    store
        .post_comment(&w.article, "Great read!", &w.alice)
        .await
        .unwrap();

    let missing = ArticleId(String::from("no-such-article"));
    let res = store.load_thread(&missing).await;
    assert!(matches!(res, Err(Error::Fetch(_))));
    assert!(store.comments().is_empty());
    assert!(!store.is_loading());
    assert_eq!(store.article(), Some(missing));
}

#[tokio::test]
async fn untouched_entities_keep_their_ui_state() {
    let w = world();
    let store = CommentStore::new(w.gw.clone());
    store.load_thread(&w.article).await.unwrap();
    let first = store
        .post_comment(&w.article, "first", &w.alice)
        .await
        .unwrap();
    let second = store
        .post_comment(&w.article, "second", &w.bob)
        .await
        .unwrap();
    let key = EntityKey::Comment(second.id.clone());
    store.with_overlay(|o| {
        o.set_reply_open(&key, true);
        o.set_reply_draft(&key, "Well, actually");
    });

    store
        .vote_comment(&first.id, Vote::Dislike, &w.bob)
        .await
        .unwrap();
    store.load_thread(&w.article).await.unwrap();
    let ui = store.ui_state(&key);
    assert!(ui.is_reply_open);
    assert_eq!(ui.reply_draft, "Well, actually");
}
