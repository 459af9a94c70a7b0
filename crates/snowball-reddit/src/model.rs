//! Mapping of Reddit "thing" JSON onto the archived record schema.

use serde::Deserialize;
use serde_json::Value;
use snowball_crawler::record::{Author, Comment, Post};
use snowball_crawler::FetchError;

const DELETED: &str = "[deleted]";

#[derive(Debug, Deserialize)]
pub(crate) struct Thing {
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ListingData {
    #[serde(default)]
    pub children: Vec<Thing>,
    #[serde(default)]
    pub after: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawLink {
    id: String,
    name: String,
    subreddit: String,
    subreddit_name_prefixed: Option<String>,
    title: Option<String>,
    selftext: Option<String>,
    url: Option<String>,
    permalink: Option<String>,
    author: Option<String>,
    score: Option<i64>,
    num_comments: Option<i64>,
    created_utc: Option<f64>,
    over_18: Option<bool>,
    crosspost_parent: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawComment {
    id: String,
    parent_id: Option<String>,
    author: Option<String>,
    body: Option<String>,
    score: Option<i64>,
    created_utc: Option<f64>,
    #[serde(default)]
    replies: Value,
}

#[derive(Debug, Deserialize)]
struct RawMore {
    #[serde(default)]
    children: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct MoreChildrenData {
    #[serde(default)]
    things: Vec<Thing>,
}

#[derive(Debug, Deserialize)]
struct MoreChildrenJson {
    #[serde(default)]
    errors: Vec<Value>,
    #[serde(default)]
    data: MoreChildrenData,
}

#[derive(Debug, Deserialize)]
struct MoreChildrenResponse {
    json: MoreChildrenJson,
}

/// Comments parsed from one response, with what is left to expand.
#[derive(Debug, Default)]
pub(crate) struct CommentPage {
    pub comments: Vec<Comment>,
    /// Comment ids hidden behind `more` stubs.
    pub more: Vec<String>,
    /// "Continue this thread" stubs, whose replies only show on the
    /// permalink of the parent comment.
    pub continued: usize,
}

#[derive(Debug, Deserialize)]
struct RawAccount {
    name: String,
    id: Option<String>,
    created_utc: Option<f64>,
    link_karma: Option<i64>,
    comment_karma: Option<i64>,
    is_employee: Option<bool>,
    is_mod: Option<bool>,
    verified: Option<bool>,
    #[serde(default)]
    is_suspended: bool,
}

fn author_name(author: Option<String>) -> Option<String> {
    author.filter(|name| !name.is_empty() && name != DELETED)
}

impl From<RawLink> for Post {
    fn from(raw: RawLink) -> Self {
        Self {
            id: raw.id,
            fullname: raw.name,
            subreddit: raw.subreddit,
            subreddit_name_prefixed: raw.subreddit_name_prefixed,
            title: raw.title,
            selftext: raw.selftext,
            url: raw.url,
            permalink: raw.permalink,
            author_name: author_name(raw.author),
            author: None,
            score: raw.score,
            num_comments: raw.num_comments,
            created_utc: raw.created_utc,
            over_18: raw.over_18,
            crosspost_parent: raw.crosspost_parent,
            crosspost_origin: None,
            comments: vec![],
        }
    }
}

pub(crate) fn listing(value: Value) -> anyhow::Result<ListingData> {
    let thing: Thing = serde_json::from_value(value)?;
    if thing.kind != "Listing" {
        anyhow::bail!("Expected a Listing got: {}", thing.kind);
    }
    Ok(serde_json::from_value(thing.data)?)
}

/// Posts of a listing page along with the cursor of the next page.
pub(crate) fn posts(value: Value) -> anyhow::Result<(Vec<Post>, Option<String>)> {
    let ListingData { children, after } = listing(value)?;
    let mut posts = Vec::with_capacity(children.len());
    for child in children {
        if child.kind != "t3" {
            log::debug!("Skipping {} in post listing", child.kind);
            continue;
        }
        let raw: RawLink = serde_json::from_value(child.data)?;
        posts.push(raw.into());
    }
    Ok((posts, after))
}

/// Comment tree of a `/comments/{id}` response, flattened depth first.
pub(crate) fn comments(value: Value) -> anyhow::Result<CommentPage> {
    let Value::Array(mut parts) = value else {
        anyhow::bail!("Expected [post, comments] listings");
    };
    if parts.len() != 2 {
        anyhow::bail!("Expected 2 listings got {}", parts.len());
    }
    let mut page = CommentPage::default();
    flatten(listing(parts.remove(1))?.children, &mut page)?;
    Ok(page)
}

/// Things of an `/api/morechildren` response. They come as a flat list
/// linked through `parent_id`.
pub(crate) fn more_children(value: Value) -> anyhow::Result<CommentPage> {
    let MoreChildrenResponse { json } = serde_json::from_value(value)?;
    if !json.errors.is_empty() {
        anyhow::bail!("morechildren answered errors: {:?}", json.errors);
    }
    let mut page = CommentPage::default();
    flatten(json.data.things, &mut page)?;
    Ok(page)
}

fn flatten(children: Vec<Thing>, page: &mut CommentPage) -> anyhow::Result<()> {
    for child in children {
        match child.kind.as_str() {
            "t1" => {}
            "more" => {
                let more: RawMore = serde_json::from_value(child.data)?;
                if more.children.is_empty() {
                    page.continued += 1;
                } else {
                    page.more.extend(more.children);
                }
                continue;
            }
            other => {
                log::debug!("Skipping {other} in comment tree");
                continue;
            }
        }
        let raw: RawComment = serde_json::from_value(child.data)?;
        page.comments.push(Comment {
            id: raw.id,
            parent_id: raw.parent_id,
            author_name: author_name(raw.author),
            author: None,
            body: raw.body,
            score: raw.score,
            created_utc: raw.created_utc,
        });
        // Leaf comments carry `"replies": ""`
        if raw.replies.is_object() {
            flatten(listing(raw.replies)?.children, page)?;
        }
    }
    Ok(())
}

pub(crate) fn account(value: Value) -> Result<Author, FetchError> {
    let thing: Thing = serde_json::from_value(value).map_err(anyhow::Error::from)?;
    if thing.kind != "t2" {
        return Err(anyhow::anyhow!("Expected an account got: {}", thing.kind).into());
    }
    let raw: RawAccount = serde_json::from_value(thing.data).map_err(anyhow::Error::from)?;
    if raw.is_suspended {
        return Err(FetchError::Forbidden(format!("u/{} is suspended", raw.name)));
    }
    Ok(Author {
        name: raw.name,
        id: raw.id,
        created_utc: raw.created_utc,
        link_karma: raw.link_karma,
        comment_karma: raw.comment_karma,
        is_employee: raw.is_employee,
        is_mod: raw.is_mod,
        verified: raw.verified,
    })
}
