use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use crate::{
    error::{RelatedPostsError, SimilarityError},
    post::MarkdownPost,
};

pub fn cosine_similarity(a: &[f64], b: &[f64]) -> Result<f64, SimilarityError> {
    if a.len() != b.len() {
        return Err(SimilarityError::LengthMismatch {
            left: a.len(),
            right: b.len(),
        });
    }

    let (dot, mag_a, mag_b) = a
        .iter()
        .zip(b)
        .fold((0.0, 0.0, 0.0), |(dot, mag_a, mag_b), (x, y)| {
            (dot + x * y, mag_a + x * x, mag_b + y * y)
        });

    if mag_a == 0.0 || mag_b == 0.0 {
        return Err(SimilarityError::ZeroMagnitude);
    }

    Ok(dot / (mag_a.sqrt() * mag_b.sqrt()))
}

/// Replace every post's `similar_posts` with its `top` closest published
/// neighbours. Drafts and posts dated after `now` are never suggested, but
/// still get suggestions of their own.
pub fn assign_similar_posts(
    posts: &mut [MarkdownPost],
    top: usize,
    now: DateTime<Utc>,
) -> Result<(), RelatedPostsError> {
    let mut rankings: Vec<Vec<String>> = Vec::with_capacity(posts.len());

    for post in posts.iter() {
        let mut scored = Vec::new();
        for other in posts.iter() {
            if other.path == post.path || !other.is_published(now) {
                continue;
            }

            let similarity = cosine_similarity(&post.embedding, &other.embedding).map_err(
                |source| RelatedPostsError::Similarity {
                    left: post.path.clone(),
                    right: other.path.clone(),
                    source,
                },
            )?;
            scored.push((other.link(), similarity));
        }

        scored.sort_by(|(path_a, a), (path_b, b)| {
            b.partial_cmp(a)
                .unwrap_or(Ordering::Equal)
                .then_with(|| path_a.cmp(path_b))
        });
        scored.truncate(top);
        rankings.push(scored.into_iter().map(|(path, _)| path).collect());
    }

    for (post, similar) in posts.iter_mut().zip(rankings) {
        post.frontmatter.similar_posts = similar;
    }

    Ok(())
}
