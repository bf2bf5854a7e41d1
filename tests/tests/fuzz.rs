use std::panic::AssertUnwindSafe;

use newsroom_client::{
    api::{ArticleUpdate, Role, Vote},
    gate, CommentStore, Error, Identity,
};
use newsroom_mock_server::{MockGateway, MockServer};

macro_rules! do_tokio_test {
    ( $name:ident, $typ:ty, $fn:expr ) => {
        #[test]
        fn $name() {
            let runtime = AssertUnwindSafe(
                tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .expect("failed initializing tokio runtime"),
            );
            bolero::check!()
                .with_type::<$typ>()
                .cloned()
                .for_each(move |v| {
                    let () = runtime.block_on($fn(v));
                })
        }
    };
}

struct World {
    store: CommentStore<MockGateway>,
    gw: MockGateway,
    users: Vec<Identity>,
}

async fn world() -> World {
    let mut server = MockServer::new();
    let users = ["alice", "bob", "carol"]
        .into_iter()
        .map(|name| server.register(name, Role::Reader))
        .collect::<Vec<_>>();
    let article = server
        .publish_article(
            &users[0],
            ArticleUpdate {
                title: String::from("Title"),
                body: String::from("Body"),
                image_url: None,
                state: String::from("State"),
                city: String::from("City"),
                category: String::from("Category"),
            },
        )
        .expect("publishing article")
        .id;
    let gw = MockGateway::new(server);
    let store = CommentStore::new(gw.clone());
    store
        .load_thread(&article)
        .await
        .expect("loading empty thread");
    World {
        store,
        gw,
        users: users
            .into_iter()
            .map(|t| Identity::from_token(t).expect("decoding mock token"))
            .collect(),
    }
}

#[test]
fn can_modify_is_username_equality() {
    bolero::check!()
        .with_type::<(String, String)>()
        .cloned()
        .for_each(|(author, actor)| {
            assert_eq!(gate::can_modify(&author, Some(&actor)), author == actor);
            assert!(!gate::can_modify(&author, None));
        })
}

do_tokio_test!(posted_text_is_in_thread, String, |text: String| async move {
    let w = world().await;
    let article = w.store.article().expect("thread is loaded");
    let calls = w.gw.calls();
    match w.store.post_comment(&article, &text, &w.users[1]).await {
        Ok(c) => {
            let comments = w.store.load_thread(&article).await.unwrap();
            assert_eq!(comments.len(), 1);
            assert_eq!(comments[0], c);
            assert_eq!(comments[0].body, text);
            assert_eq!(comments[0].author.username, "bob");
        }
        Err(Error::Validation(_)) => {
            assert_eq!(w.gw.calls(), calls);
            assert!(w.store.comments().is_empty());
        }
        Err(e) => panic!("unexpected error posting {text:?}: {e}"),
    }
});

do_tokio_test!(
    blank_text_never_reaches_server,
    Vec<u8>,
    |blanks: Vec<u8>| async move {
        let text = blanks
            .iter()
            .map(|b| [' ', '\t', '\n', '\r'][*b as usize % 4])
            .collect::<String>();
        let w = world().await;
        let article = w.store.article().expect("thread is loaded");
        let calls = w.gw.calls();
        let res = w.store.post_comment(&article, &text, &w.users[0]).await;
        assert!(matches!(res, Err(Error::Validation(_))));
        assert_eq!(w.gw.calls(), calls);
        assert!(w.store.comments().is_empty());
    }
);

#[derive(Clone, Debug, bolero::generator::TypeGenerator)]
struct FuzzVote {
    user: u8,
    vote: Vote,
}

do_tokio_test!(
    votes_mirror_server,
    Vec<FuzzVote>,
    |votes: Vec<FuzzVote>| async move {
        let w = world().await;
        let article = w.store.article().expect("thread is loaded");
        let c = w
            .store
            .post_comment(&article, "vote on me", &w.users[0])
            .await
            .unwrap();
        for v in votes {
            let who = &w.users[v.user as usize % w.users.len()];
            let local = w.store.vote_comment(&c.id, v.vote, who).await.unwrap();
            assert_eq!(w.store.comment(&c.id), Some(local));
        }
        let server = w.gw.with_server(|s| s.fetch_thread(&article)).unwrap();
        assert_eq!(*w.store.comments(), server);
        for set in [&server[0].likes, &server[0].dislikes] {
            let mut dedup = set.clone();
            dedup.sort_by(|a, b| a.0.cmp(&b.0));
            dedup.dedup();
            assert_eq!(dedup.len(), set.len());
        }
    }
);
