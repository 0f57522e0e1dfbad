use std::path::PathBuf;

use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use futures::{stream, StreamExt, TryStreamExt};
use tracing::info;

use crate::{
    client::EmbedClient,
    error::RelatedPostsError,
    post::{load_posts, MarkdownPost},
    similarity::assign_similar_posts,
};

#[derive(Parser)]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Recompute the `similar_posts` frontmatter of every post from its embedding
    #[command(visible_alias = "ur")]
    UpdateRelated(UpdateRelatedArgs),
}

#[derive(Args, Debug, Clone)]
pub struct UpdateRelatedArgs {
    /// The fully qualified embedding api url
    #[arg(long, env = "EMBED_API_URL", default_value = "http://localhost:5555")]
    pub embed_api_url: String,

    /// Bearer token for the embedding api, if it requires one
    #[arg(long, env = "EMBED_API_TOKEN", default_value = "", hide_env_values = true)]
    pub embed_api_token: String,

    /// The directory holding the posts
    #[arg(long, env = "POST_DIR", default_value = "./content/posts")]
    pub post_dir: PathBuf,

    /// Maximum embedding requests in flight
    #[arg(
        long,
        env = "EMBED_CONCURRENCY",
        default_value_t = 5,
        value_parser = clap::value_parser!(u16).range(1..)
    )]
    pub concurrency: u16,

    /// How many related posts to keep per post
    #[arg(long, env = "RELATED_POSTS_TOP", default_value_t = 3)]
    pub top: usize,
}

impl Cli {
    pub async fn run() -> Result<(), RelatedPostsError> {
        let cli = Cli::parse();

        match cli.command {
            Commands::UpdateRelated(args) => update_related(&args).await,
        }
    }
}

pub async fn update_related(args: &UpdateRelatedArgs) -> Result<(), RelatedPostsError> {
    let mut posts = load_posts(&args.post_dir)?;
    info!(count = posts.len(), dir = %args.post_dir.display(), "loaded posts");

    let client = EmbedClient::new(&args.embed_api_url, &args.embed_api_token)?;
    load_embeddings(&client, &mut posts, usize::from(args.concurrency)).await?;

    assign_similar_posts(&mut posts, args.top, Utc::now())?;

    for post in &posts {
        post.save()?;
    }
    info!(count = posts.len(), "updated related posts");

    Ok(())
}

/// Fetch every post's embedding, `concurrency` at a time. The first failure
/// drops the requests still in flight and is returned.
pub async fn load_embeddings(
    client: &EmbedClient,
    posts: &mut [MarkdownPost],
    concurrency: usize,
) -> Result<(), RelatedPostsError> {
    let requests = posts.iter().enumerate().map(|(index, post)| {
        let text = post.plain_text();
        let path = post.path.clone();
        async move {
            client
                .get_embedding(&text)
                .await
                .map(|embedding| (index, embedding))
                .map_err(|e| RelatedPostsError::Embedding {
                    path,
                    source: Box::new(e),
                })
        }
    });

    let embeddings: Vec<(usize, Vec<f64>)> = stream::iter(requests)
        .buffer_unordered(concurrency.max(1))
        .try_collect()
        .await?;

    for (index, embedding) in embeddings {
        posts[index].embedding = embedding;
    }

    Ok(())
}
