//! Archived record schema.
//!
//! Every entity carries named optional fields only. Fields the upstream
//! source exposes beyond these are dropped when records are built.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::ListingMode;

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    /// Type-prefixed identifier, e.g. `t3_abc123`.
    pub fullname: String,
    pub subreddit: String,
    #[serde(default)]
    pub subreddit_name_prefixed: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub selftext: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub permalink: Option<String>,
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default)]
    pub author: Option<Author>,
    #[serde(default)]
    pub score: Option<i64>,
    #[serde(default)]
    pub num_comments: Option<i64>,
    #[serde(default)]
    pub created_utc: Option<f64>,
    #[serde(default)]
    pub over_18: Option<bool>,
    /// Fullname of the post this one was crossposted from.
    #[serde(default)]
    pub crosspost_parent: Option<String>,
    #[serde(default)]
    pub crosspost_origin: Option<Box<Post>>,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

impl Post {
    /// Subreddit name of the resolved crosspost origin, as reported upstream.
    pub fn origin_subreddit(&self) -> Option<&str> {
        self.crosspost_origin.as_ref().map(|origin| {
            origin
                .subreddit_name_prefixed
                .as_deref()
                .unwrap_or(&origin.subreddit)
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default)]
    pub author: Option<Author>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub score: Option<i64>,
    #[serde(default)]
    pub created_utc: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub created_utc: Option<f64>,
    #[serde(default)]
    pub link_karma: Option<i64>,
    #[serde(default)]
    pub comment_karma: Option<i64>,
    #[serde(default)]
    pub is_employee: Option<bool>,
    #[serde(default)]
    pub is_mod: Option<bool>,
    #[serde(default)]
    pub verified: Option<bool>,
}

/// Body of one archive file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub schema_version: u32,
    pub subreddit: String,
    pub mode: ListingMode,
    pub fetched_at: DateTime<Utc>,
    pub records: Vec<Post>,
}

impl Snapshot {
    pub fn new(subreddit: &str, mode: ListingMode, records: Vec<Post>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            subreddit: subreddit.to_string(),
            mode,
            fetched_at: Utc::now(),
            records,
        }
    }
}
