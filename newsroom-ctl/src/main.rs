use std::{io::Write, path::PathBuf};

use anyhow::Context;
use newsroom_client::{
    api::{ArticleId, ArticleUpdate, CommentId, Credentials, ReplyId, Vote},
    ArticlePanel, ArticleView, CommentStore, CredentialStore, Deletion, EnvCredential,
    FileCredential, HttpGateway, Identity, MemoryCredential,
};

const TOKEN_VAR: &str = "NEWSROOM_TOKEN";

#[derive(structopt::StructOpt)]
struct Opt {
    /// Base URL of the news API
    #[structopt(short, long, env = "NEWSROOM_HOST")]
    host: String,

    /// File the login token is kept in. NEWSROOM_TOKEN takes precedence.
    #[structopt(long, parse(from_os_str))]
    token_file: Option<PathBuf>,

    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(structopt::StructOpt)]
enum Command {
    /// Log in and remember the token
    Login {
        email: String,

        #[structopt(long, env = "NEWSROOM_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Forget the remembered token
    Logout,

    /// Show who the remembered token belongs to
    Whoami,

    /// Show the comment thread of an article
    Thread { article: String },

    /// Post a comment on an article
    Comment { article: String, text: String },

    EditComment {
        article: String,
        comment: String,
        text: String,
    },

    DeleteComment {
        article: String,
        comment: String,

        /// Do not ask for confirmation
        #[structopt(short, long)]
        yes: bool,
    },

    Like { article: String, comment: String },

    Dislike { article: String, comment: String },

    /// Reply to a comment
    Reply {
        article: String,
        comment: String,
        text: String,
    },

    EditReply {
        article: String,
        comment: String,
        reply: String,
        text: String,
    },

    DeleteReply {
        article: String,
        comment: String,
        reply: String,

        #[structopt(short, long)]
        yes: bool,
    },

    /// Show an article
    Article { article: String },

    LikeArticle { article: String },

    DislikeArticle { article: String },

    /// Change fields of an article, the others keep their value
    EditArticle {
        article: String,

        #[structopt(flatten)]
        fields: ArticleFields,
    },

    DeleteArticle {
        article: String,

        #[structopt(short, long)]
        yes: bool,
    },
}

#[derive(Debug, Default, structopt::StructOpt)]
struct ArticleFields {
    #[structopt(long)]
    title: Option<String>,

    #[structopt(long)]
    content: Option<String>,

    #[structopt(long)]
    state: Option<String>,

    #[structopt(long)]
    city: Option<String>,

    #[structopt(long)]
    category: Option<String>,

    /// Pass an empty string to remove the image
    #[structopt(long)]
    image_url: Option<String>,
}

impl ArticleFields {
    fn apply(self, form: &mut ArticleUpdate) {
        let fields = [
            (self.title, &mut form.title),
            (self.content, &mut form.body),
            (self.state, &mut form.state),
            (self.city, &mut form.city),
            (self.category, &mut form.category),
        ];
        for (value, field) in fields {
            if let Some(value) = value {
                *field = value;
            }
        }
        if let Some(url) = self.image_url {
            form.image_url = Some(url).filter(|u| !u.is_empty());
        }
    }
}

fn credential_store(opt: &Opt) -> Box<dyn CredentialStore> {
    if std::env::var_os(TOKEN_VAR).is_some() {
        return Box::new(EnvCredential::new(TOKEN_VAR));
    }
    match &opt.token_file {
        Some(path) => Box::new(FileCredential::new(path)),
        None => Box::new(MemoryCredential::default()),
    }
}

fn ask(yes: bool) -> impl Fn(&str) -> bool {
    move |question: &str| {
        if yes {
            return true;
        }
        print!("{question} [y/N] ");
        if std::io::stdout().flush().is_err() {
            return false;
        }
        let mut answer = String::new();
        match std::io::stdin().read_line(&mut answer) {
            Ok(_) => matches!(answer.trim(), "y" | "Y" | "yes"),
            Err(_) => false,
        }
    }
}

async fn print_thread(
    store: &CommentStore<HttpGateway>,
    article: &ArticleId,
) -> anyhow::Result<()> {
    let comments = store
        .load_thread(article)
        .await
        .with_context(|| format!("fetching the comments of article {article}"))?;
    if comments.is_empty() {
        println!("No comments yet.");
    }
    for c in comments.iter() {
        println!(
            "[{}] {} (+{} -{}): {}",
            c.id,
            c.author.username,
            c.likes.len(),
            c.dislikes.len(),
            c.body
        );
        for r in c.replies.iter() {
            println!("    [{}] {}: {}", r.id, r.author.username, r.body);
        }
    }
    Ok(())
}

fn print_deletion<T>(what: &str, res: Deletion<T>) {
    match res {
        Deletion::Done(_) => println!("{what} deleted"),
        Deletion::Declined => println!("{what} kept"),
    }
}

async fn vote_comment(
    gateway: HttpGateway,
    article: String,
    comment: String,
    vote: Vote,
    me: &Identity,
) -> anyhow::Result<()> {
    let store = CommentStore::new(gateway);
    store.load_thread(&ArticleId(article)).await?;
    let c = store.vote_comment(&CommentId(comment), vote, me).await?;
    println!("+{} -{}", c.likes.len(), c.dislikes.len());
    Ok(())
}

async fn vote_article(
    gateway: HttpGateway,
    article: String,
    vote: Vote,
    me: &Identity,
) -> anyhow::Result<()> {
    let panel = ArticlePanel::new(gateway);
    panel.load(&ArticleId(article)).await?;
    let a = match vote {
        Vote::Like => panel.like(me).await?,
        Vote::Dislike => panel.dislike(me).await?,
    };
    println!("+{} -{}", a.likes.len(), a.dislikes.len());
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if std::env::var_os("RUST_LOG").is_some() {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .init();
    }

    let opt = <Opt as structopt::StructOpt>::from_args();
    let creds = credential_store(&opt);
    let me = Identity::from_store(&*creds);
    let gateway = HttpGateway::new(opt.host.clone());
    tracing::debug!(host = %gateway.host(), logged_in = me.is_logged_in(), "starting");

    match opt.cmd {
        Command::Login { email, password } => {
            let token = gateway
                .login(&Credentials { email, password })
                .await
                .context("logging in")?;
            let me = Identity::from_token(token.clone()).context("decoding login token")?;
            match opt.token_file {
                Some(_) => creds.save(&token).context("saving login token")?,
                None => println!("{}", token.0),
            }
            println!("Logged in as {}", me.username().unwrap_or_default());
        }
        Command::Logout => {
            creds.clear().context("clearing login token")?;
            println!("Logged out");
        }
        Command::Whoami => match me.claims() {
            Some(claims) => println!("{}", serde_json::to_string_pretty(claims)?),
            None => println!("Not logged in"),
        },
        Command::Thread { article } => {
            print_thread(&CommentStore::new(gateway), &ArticleId(article)).await?;
        }
        Command::Comment { article, text } => {
            let store = CommentStore::new(gateway);
            let article = ArticleId(article);
            store.load_thread(&article).await?;
            let c = store.post_comment(&article, &text, &me).await?;
            println!("Posted comment {}", c.id);
        }
        Command::EditComment {
            article,
            comment,
            text,
        } => {
            let store = CommentStore::new(gateway);
            store.load_thread(&ArticleId(article)).await?;
            store
                .edit_comment(&CommentId(comment), &text, &me)
                .await?;
            println!("Comment updated");
        }
        Command::DeleteComment {
            article,
            comment,
            yes,
        } => {
            let store = CommentStore::new(gateway);
            store.load_thread(&ArticleId(article)).await?;
            let res = store
                .delete_comment(&CommentId(comment), &me, &ask(yes))
                .await?;
            print_deletion("Comment", res);
        }
        Command::Like { article, comment } => {
            vote_comment(gateway, article, comment, Vote::Like, &me).await?;
        }
        Command::Dislike { article, comment } => {
            vote_comment(gateway, article, comment, Vote::Dislike, &me).await?;
        }
        Command::Reply {
            article,
            comment,
            text,
        } => {
            let store = CommentStore::new(gateway);
            store.load_thread(&ArticleId(article)).await?;
            let c = store.post_reply(&CommentId(comment), &text, &me).await?;
            println!("Comment {} now has {} replies", c.id, c.replies.len());
        }
        Command::EditReply {
            article,
            comment,
            reply,
            text,
        } => {
            let store = CommentStore::new(gateway);
            store.load_thread(&ArticleId(article)).await?;
            store
                .edit_reply(&CommentId(comment), &ReplyId(reply), &text, &me)
                .await?;
            println!("Reply updated");
        }
        Command::DeleteReply {
            article,
            comment,
            reply,
            yes,
        } => {
            let store = CommentStore::new(gateway);
            store.load_thread(&ArticleId(article)).await?;
            let res = store
                .delete_reply(&CommentId(comment), &ReplyId(reply), &me, &ask(yes))
                .await?;
            print_deletion("Reply", res);
        }
        Command::Article { article } => {
            let panel = ArticlePanel::new(gateway);
            match panel.load(&ArticleId(article)).await? {
                ArticleView::Viewing(a) => println!("{}", serde_json::to_string_pretty(&a)?),
                _ => println!("Article not found"),
            }
        }
        Command::LikeArticle { article } => {
            vote_article(gateway, article, Vote::Like, &me).await?;
        }
        Command::DislikeArticle { article } => {
            vote_article(gateway, article, Vote::Dislike, &me).await?;
        }
        Command::EditArticle { article, fields } => {
            let panel = ArticlePanel::new(gateway);
            let id = ArticleId(article);
            if panel.load(&id).await? == ArticleView::NotFound {
                anyhow::bail!("article {id} not found");
            }
            panel.begin_edit()?;
            panel.edit_form(|f| fields.apply(f))?;
            let a = panel
                .submit_edit(&me)
                .await
                .with_context(|| format!("updating article {id}"))?;
            println!("{}", serde_json::to_string_pretty(&a)?);
        }
        Command::DeleteArticle { article, yes } => {
            let panel = ArticlePanel::new(gateway);
            panel.load(&ArticleId(article)).await?;
            let res = panel.delete(&me, &ask(yes)).await?;
            print_deletion("Article", res);
        }
    }

    Ok(())
}
