use std::collections::HashSet;
use std::time::Duration;

use anyhow::anyhow;
use reqwest::blocking::Client;
use reqwest::redirect::Policy;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use snowball_crawler::record::{Author, Comment, Post};
use snowball_crawler::{FetchError, Fetchable, ListingMode};

use crate::model;

/// Reddit serves at most this many posts per listing page.
const PAGE_SIZE: usize = 100;

/// Comment ids accepted by one `/api/morechildren` call.
const MORE_CHILDREN_BATCH: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedditConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for RedditConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_user_agent() -> String {
    String::from("snowball-crawler/0.1")
}

fn default_base_url() -> String {
    String::from("https://www.reddit.com")
}

fn default_request_timeout_secs() -> u64 {
    30
}

pub struct RedditFetcher {
    client: Client,
    base_url: String,
}

impl RedditFetcher {
    pub fn new(config: &RedditConfig) -> anyhow::Result<Self> {
        // Unknown and banned subreddits redirect to a search page
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .redirect(Policy::none())
            .gzip(true)
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value, FetchError> {
        let url = format!("{}{path}", self.base_url);
        log::debug!("GET {url} {query:?}");

        let resp = self
            .client
            .get(&url)
            .query(query)
            .send()
            .map_err(|e| classify(e, &url))?;

        match resp.status() {
            s if s.is_success() => resp.json().map_err(|e| classify(e, &url)),
            StatusCode::NOT_FOUND => Err(FetchError::NotFound(url)),
            StatusCode::FORBIDDEN => Err(FetchError::Forbidden(url)),
            s if s.is_redirection() => Err(FetchError::NotFound(url)),
            s => Err(anyhow!("{url} answered {s}").into()),
        }
    }
}

fn classify(e: reqwest::Error, url: &str) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout(url.to_string())
    } else {
        anyhow::Error::from(e).context(url.to_string()).into()
    }
}

/// Resolve the `more` stubs of `page` through `fetch_more`, a batch of ids
/// at a time. Expanded comments are appended after the tree with their
/// `parent_id` intact. A failed batch leaves the tree partial.
fn expand_more<M>(post_id: &str, page: model::CommentPage, mut fetch_more: M) -> Vec<Comment>
where
    M: FnMut(&[String]) -> Result<model::CommentPage, FetchError>,
{
    let model::CommentPage {
        mut comments,
        mut more,
        mut continued,
    } = page;
    let mut seen: HashSet<String> = comments.iter().map(|c| c.id.clone()).collect();
    let mut requested = HashSet::new();

    while !more.is_empty() {
        let rest = more.split_off(more.len().min(MORE_CHILDREN_BATCH));
        let batch: Vec<String> = std::mem::replace(&mut more, rest)
            .into_iter()
            .filter(|id| !seen.contains(id) && requested.insert(id.clone()))
            .collect();
        if batch.is_empty() {
            continue;
        }
        match fetch_more(&batch) {
            Ok(page) => {
                continued += page.continued;
                more.extend(page.more);
                for comment in page.comments {
                    if seen.insert(comment.id.clone()) {
                        comments.push(comment);
                    }
                }
            }
            Err(e) => {
                log::warn!(
                    "Comments of post {post_id} are partial, {} ids not expanded: {e}",
                    batch.len() + more.len()
                );
                break;
            }
        }
    }

    if continued > 0 {
        log::info!("Comments of post {post_id} leave {continued} deep threads out");
    }
    comments
}

fn listing_path(subreddit: &str, mode: ListingMode) -> String {
    format!("/r/{subreddit}/{mode}.json")
}

impl Fetchable for RedditFetcher {
    fn fetch_listing(
        &self,
        subreddit: &str,
        mode: ListingMode,
        limit: usize,
    ) -> Result<Vec<Post>, FetchError> {
        let path = listing_path(subreddit, mode);
        let mut posts = vec![];
        let mut after: Option<String> = None;

        while posts.len() < limit {
            let mut query = vec![
                ("limit", (limit - posts.len()).min(PAGE_SIZE).to_string()),
                ("raw_json", "1".to_string()),
            ];
            if matches!(mode, ListingMode::Controversial | ListingMode::Top) {
                query.push(("t", "all".to_string()));
            }
            if let Some(after) = &after {
                query.push(("after", after.clone()));
            }

            let (page, next) = model::posts(self.get_json(&path, &query)?)?;
            if page.is_empty() {
                break;
            }
            posts.extend(page);
            match next {
                Some(next) => after = Some(next),
                None => break,
            }
        }

        posts.truncate(limit);
        log::debug!("Fetched {} posts from r/{subreddit}/{mode}", posts.len());
        Ok(posts)
    }

    fn fetch_by_id(&self, fullname: &str) -> Result<Post, FetchError> {
        let value = self.get_json(
            &format!("/by_id/{fullname}.json"),
            &[("raw_json", "1".to_string())],
        )?;
        let (posts, _) = model::posts(value)?;
        posts
            .into_iter()
            .next()
            .ok_or_else(|| FetchError::NotFound(fullname.to_string()))
    }

    fn fetch_author(&self, name: &str) -> Result<Author, FetchError> {
        let value = self.get_json(&format!("/user/{name}/about.json"), &[])?;
        model::account(value)
    }

    fn fetch_comments(&self, post_id: &str) -> Result<Vec<Comment>, FetchError> {
        let value = self.get_json(
            &format!("/comments/{post_id}.json"),
            &[("raw_json", "1".to_string())],
        )?;
        let page = model::comments(value)?;
        Ok(expand_more(post_id, page, |ids| {
            let value = self.get_json(
                "/api/morechildren.json",
                &[
                    ("api_type", "json".to_string()),
                    ("link_id", format!("t3_{post_id}")),
                    ("children", ids.join(",")),
                    ("limit_children", "false".to_string()),
                    ("raw_json", "1".to_string()),
                ],
            )?;
            Ok(model::more_children(value)?)
        }))
    }
}
