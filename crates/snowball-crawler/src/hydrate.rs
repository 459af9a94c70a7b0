use crate::authors::AuthorCache;
use crate::config::OnError;
use crate::fetchable::{FetchError, Fetchable};
use crate::record::{Author, Post};

/// Fills in authors, comments and crosspost origins of listing posts.
///
/// A sub-resource that cannot be fetched is left empty and the post is kept.
/// Errors other than unavailability follow `on_error`.
pub struct Hydrator<'a, F: ?Sized> {
    fetcher: &'a F,
    authors: &'a mut AuthorCache,
    include_comments: bool,
    on_error: OnError,
}

impl<'a, F> Hydrator<'a, F>
where
    F: Fetchable + ?Sized,
{
    pub fn new(
        fetcher: &'a F,
        authors: &'a mut AuthorCache,
        include_comments: bool,
        on_error: OnError,
    ) -> Self {
        Self {
            fetcher,
            authors,
            include_comments,
            on_error,
        }
    }

    pub fn hydrate(&mut self, posts: Vec<Post>) -> anyhow::Result<Vec<Post>> {
        posts.into_iter().map(|post| self.hydrate_post(post)).collect()
    }

    fn hydrate_post(&mut self, mut post: Post) -> anyhow::Result<Post> {
        post.author = self.author(post.author_name.as_deref())?;

        if self.include_comments {
            let comments = self.fetcher.fetch_comments(&post.id);
            if let Some(mut comments) = self.skip_unavailable(comments, &post.id)? {
                for comment in comments.iter_mut() {
                    comment.author = self.author(comment.author_name.as_deref())?;
                }
                post.comments = comments;
            }
        }

        if let Some(parent) = post.crosspost_parent.clone() {
            let origin = self.fetcher.fetch_by_id(&parent);
            match self.skip_unavailable(origin, &parent)? {
                Some(mut origin) => {
                    origin.author = self.author(origin.author_name.as_deref())?;
                    post.crosspost_origin = Some(Box::new(origin));
                }
                None => {
                    log::warn!("Skipping crosspost origin {parent} of post {}", post.id);
                }
            }
        }

        Ok(post)
    }

    fn author(&mut self, name: Option<&str>) -> anyhow::Result<Option<Author>> {
        let Some(name) = name else {
            return Ok(None);
        };
        let profile = self.authors.resolve(self.fetcher, name);
        Ok(self.skip_unavailable(profile, name)?.flatten())
    }

    fn skip_unavailable<T>(
        &self,
        res: Result<T, FetchError>,
        what: &str,
    ) -> anyhow::Result<Option<T>> {
        match res {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_unavailable() => {
                log::info!("Skipping unavailable {what}: {e}");
                Ok(None)
            }
            Err(e) => match self.on_error {
                OnError::SkipAndLog => {
                    log::warn!("Skipping {what} got: {e}");
                    Ok(None)
                }
                OnError::Fail => Err(anyhow::anyhow!("Couldn't fetch {what} got: {e}")),
            },
        }
    }
}
