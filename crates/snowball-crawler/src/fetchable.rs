use thiserror::Error;

use crate::config::ListingMode;
use crate::record::{Author, Comment, Post};

/// Source of subreddit content.
pub trait Fetchable {
    fn fetch_listing(
        &self,
        subreddit: &str,
        mode: ListingMode,
        limit: usize,
    ) -> Result<Vec<Post>, FetchError>;

    /// Fetch a single post by its fullname (`t3_...`).
    fn fetch_by_id(&self, fullname: &str) -> Result<Post, FetchError>;

    fn fetch_author(&self, name: &str) -> Result<Author, FetchError>;

    /// Flattened comment tree of a post.
    fn fetch_comments(&self, post_id: &str) -> Result<Vec<Comment>, FetchError>;
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("timed out: {0}")]
    Timeout(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FetchError {
    /// Whether the resource is deleted, private, suspended or out of time,
    /// in which case callers skip it instead of failing.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_) | Self::Forbidden(_) | Self::Timeout(_)
        )
    }
}

impl<T: Fetchable + ?Sized> Fetchable for &T {
    fn fetch_listing(
        &self,
        subreddit: &str,
        mode: ListingMode,
        limit: usize,
    ) -> Result<Vec<Post>, FetchError> {
        (**self).fetch_listing(subreddit, mode, limit)
    }

    fn fetch_by_id(&self, fullname: &str) -> Result<Post, FetchError> {
        (**self).fetch_by_id(fullname)
    }

    fn fetch_author(&self, name: &str) -> Result<Author, FetchError> {
        (**self).fetch_author(name)
    }

    fn fetch_comments(&self, post_id: &str) -> Result<Vec<Comment>, FetchError> {
        (**self).fetch_comments(post_id)
    }
}
