use std::sync::Arc;

use anyhow::Context;
use comments_api::{AuthToken, CommentId, PostId, Uuid};
use comments_client::PostSession;

mod api;
use api::HttpService;

#[derive(structopt::StructOpt)]
struct Opt {
    #[structopt(short, long)]
    host: String,

    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(structopt::StructOpt)]
enum Command {
    /// List all posts
    ListPosts,

    /// Show a post and its comments
    Show { post: Uuid },

    /// Comment on a post, or reply to a comment with --parent
    Comment {
        post: Uuid,

        message: String,

        #[structopt(long)]
        parent: Option<Uuid>,
    },

    /// Edit one of your comments
    Edit {
        post: Uuid,
        comment: Uuid,
        message: String,
    },

    /// Delete one of your comments, and all replies to it
    Delete { post: Uuid, comment: Uuid },

    /// Like a comment, or remove your like if you already did
    ToggleLike { post: Uuid, comment: Uuid },
}

fn viewer_token() -> anyhow::Result<AuthToken> {
    let tok =
        std::env::var("COMMENTS_TOKEN").context("retrieving COMMENTS_TOKEN environment variable")?;
    let tok = Uuid::try_parse(&tok).context("parsing COMMENTS_TOKEN as an auth token")?;
    Ok(AuthToken(tok))
}

async fn open(
    service: Arc<HttpService>,
    viewer: AuthToken,
    post: Uuid,
) -> anyhow::Result<PostSession<HttpService>> {
    let session = PostSession::new(service, viewer, PostId(post));
    if let Some(err) = session.load().await.error {
        return Err(anyhow::Error::new(err).context(format!("loading post {post}")));
    }
    Ok(session)
}

fn print_post(session: &PostSession<HttpService>) {
    if let Some(post) = session.post().value {
        println!("# {}", post.title);
        println!();
        println!("{}", post.body);
        println!();
    }
    let tree = session.tree();
    for (depth, c) in tree.walk() {
        println!(
            "{:indent$}[{}] {} at {}, {} like{}{}",
            "",
            c.id.0,
            c.user.name,
            c.created_at.format("%Y-%m-%d %H:%M"),
            c.like_count,
            if c.like_count == 1 { "" } else { "s" },
            if c.liked_by_me { " (including you)" } else { "" },
            indent = depth * 4,
        );
        for line in c.message.lines() {
            println!("{:indent$}{}", "", line, indent = depth * 4 + 2);
        }
    }
    let orphans = tree.orphans();
    if !orphans.is_empty() {
        println!();
        println!("{} replies to comments that no longer exist", orphans.len());
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let opt = <Opt as structopt::StructOpt>::from_args();
    let viewer = viewer_token()?;
    let service = Arc::new(HttpService::new(opt.host));

    match opt.cmd {
        Command::ListPosts => {
            let posts = comments_api::CommentService::list_posts(&*service, &viewer)
                .await
                .context("listing posts")?;
            for p in posts {
                println!("{}  {}", p.id.0, p.title);
            }
        }
        Command::Show { post } => {
            let session = open(service, viewer, post).await?;
            print_post(&session);
        }
        Command::Comment {
            post,
            message,
            parent,
        } => {
            let session = open(service, viewer, post).await?;
            let c = match parent {
                None => session.create_comment(message).await,
                Some(parent) => session.reply(CommentId(parent), message).await,
            }
            .context("submitting comment")?;
            println!("{}", c.id.0);
        }
        Command::Edit {
            post,
            comment,
            message,
        } => {
            let session = open(service, viewer, post).await?;
            session
                .update_comment(CommentId(comment), message)
                .await
                .with_context(|| format!("editing comment {comment}"))?;
        }
        Command::Delete { post, comment } => {
            let session = open(service, viewer, post).await?;
            session
                .delete_comment(CommentId(comment))
                .await
                .with_context(|| format!("deleting comment {comment}"))?;
        }
        Command::ToggleLike { post, comment } => {
            let session = open(service, viewer, post).await?;
            let id = CommentId(comment);
            let liked = session
                .toggle_comment_like(id)
                .await
                .with_context(|| format!("toggling like on comment {comment}"))?;
            let count = session
                .engine()
                .store()
                .lock()
                .get(&id)
                .map(|c| c.like_count)
                .unwrap_or(0);
            match liked {
                true => println!("liked, now {count} like(s)"),
                false => println!("unliked, now {count} like(s)"),
            }
        }
    }

    Ok(())
}
