use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum SimilarityError {
    #[error("vectors must be of the same length, got {left} and {right}")]
    LengthMismatch { left: usize, right: usize },
    #[error("magnitude of one or both vectors is zero")]
    ZeroMagnitude,
}

#[derive(Error, Debug)]
pub enum RelatedPostsError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to walk post directory: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("invalid frontmatter in {path}: {reason}")]
    Frontmatter { path: PathBuf, reason: String },
    #[error("error parsing YAML in {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("failed to serialize frontmatter: {0}")]
    Serialize(#[source] serde_yaml::Error),
    #[error("embedding request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("embedding api returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("failed to get embedding for {path}: {source}")]
    Embedding {
        path: PathBuf,
        #[source]
        source: Box<RelatedPostsError>,
    },
    #[error("failed to compute similarity for {left} and {right}: {source}")]
    Similarity {
        left: PathBuf,
        right: PathBuf,
        #[source]
        source: SimilarityError,
    },
}
