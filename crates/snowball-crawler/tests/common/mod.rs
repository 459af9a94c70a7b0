#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;

use snowball_crawler::record::{Author, Comment, Post};
use snowball_crawler::{FetchError, Fetchable, ListingMode};

/// In-memory fetcher answering from canned data and recording every call.
#[derive(Default)]
pub struct ScriptedFetcher {
    pub listings: HashMap<(String, ListingMode), Vec<Post>>,
    pub failing_listings: HashMap<(String, ListingMode), fn(String) -> FetchError>,
    pub posts: HashMap<String, Post>,
    pub forbidden_posts: Vec<String>,
    pub authors: HashMap<String, Author>,
    pub comments: HashMap<String, Vec<Comment>>,
    pub failing_comments: HashMap<String, fn(String) -> FetchError>,
    pub calls: RefCell<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn listing(mut self, subreddit: &str, mode: ListingMode, posts: Vec<Post>) -> Self {
        self.listings.insert((subreddit.to_string(), mode), posts);
        self
    }

    pub fn failing_listing(
        mut self,
        subreddit: &str,
        mode: ListingMode,
        err: fn(String) -> FetchError,
    ) -> Self {
        self.failing_listings
            .insert((subreddit.to_string(), mode), err);
        self
    }

    pub fn origin(mut self, post: Post) -> Self {
        self.posts.insert(post.fullname.clone(), post);
        self
    }

    pub fn forbidden(mut self, fullname: &str) -> Self {
        self.forbidden_posts.push(fullname.to_string());
        self
    }

    pub fn author(mut self, name: &str) -> Self {
        self.authors.insert(
            name.to_string(),
            Author {
                name: name.to_string(),
                link_karma: Some(1),
                ..Default::default()
            },
        );
        self
    }

    pub fn comments_for(mut self, post_id: &str, comments: Vec<Comment>) -> Self {
        self.comments.insert(post_id.to_string(), comments);
        self
    }

    pub fn failing_comments(mut self, post_id: &str, err: fn(String) -> FetchError) -> Self {
        self.failing_comments.insert(post_id.to_string(), err);
        self
    }

    pub fn calls_matching(&self, prefix: &str) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }
}

impl Fetchable for ScriptedFetcher {
    fn fetch_listing(
        &self,
        subreddit: &str,
        mode: ListingMode,
        limit: usize,
    ) -> Result<Vec<Post>, FetchError> {
        self.calls
            .borrow_mut()
            .push(format!("listing:{subreddit}:{mode}"));
        let key = (subreddit.to_string(), mode);
        if let Some(err) = self.failing_listings.get(&key) {
            return Err(err(format!("r/{subreddit}/{mode}")));
        }
        Ok(self
            .listings
            .get(&key)
            .map(|posts| posts.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    fn fetch_by_id(&self, fullname: &str) -> Result<Post, FetchError> {
        self.calls.borrow_mut().push(format!("by_id:{fullname}"));
        if self.forbidden_posts.iter().any(|f| f == fullname) {
            return Err(FetchError::Forbidden(fullname.to_string()));
        }
        self.posts
            .get(fullname)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(fullname.to_string()))
    }

    fn fetch_author(&self, name: &str) -> Result<Author, FetchError> {
        self.calls.borrow_mut().push(format!("author:{name}"));
        self.authors
            .get(name)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(name.to_string()))
    }

    fn fetch_comments(&self, post_id: &str) -> Result<Vec<Comment>, FetchError> {
        self.calls.borrow_mut().push(format!("comments:{post_id}"));
        if let Some(err) = self.failing_comments.get(post_id) {
            return Err(err(post_id.to_string()));
        }
        Ok(self.comments.get(post_id).cloned().unwrap_or_default())
    }
}

pub fn post(subreddit: &str, id: &str) -> Post {
    Post {
        id: id.to_string(),
        fullname: format!("t3_{id}"),
        subreddit: subreddit.to_string(),
        subreddit_name_prefixed: Some(format!("r/{subreddit}")),
        author_name: Some(format!("{id}_author")),
        ..Default::default()
    }
}

/// A post in `subreddit` crossposted from `origin_id`.
pub fn crosspost(subreddit: &str, id: &str, origin_id: &str) -> Post {
    Post {
        crosspost_parent: Some(format!("t3_{origin_id}")),
        ..post(subreddit, id)
    }
}
