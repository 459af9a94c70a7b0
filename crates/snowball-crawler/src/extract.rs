use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::config::ListingMode;
use crate::record::Post;

/// A crosspost edge: `target`'s post `label` was crossposted from `source`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Tie {
    pub target: String,
    pub label: String,
    pub source: String,
    pub kind: String,
}

/// Canonical subreddit identifier: trimmed, without `r/` or `/r/`,
/// lowercased. User profiles (`u/Name`) map to their profile subreddit
/// `u_name`. Anything left that is not `[a-z0-9_]+` is rejected, so the
/// identifier is always safe as a path component.
pub fn normalize_subreddit(name: &str) -> Option<String> {
    let name = name.trim();
    let name = name.strip_prefix('/').unwrap_or(name);
    let name = name.strip_suffix('/').unwrap_or(name);
    let name = match name.get(..2) {
        Some(prefix) if prefix.eq_ignore_ascii_case("r/") => name[2..].to_lowercase(),
        Some(prefix) if prefix.eq_ignore_ascii_case("u/") => {
            format!("u_{}", name[2..].to_lowercase())
        }
        _ => name.to_lowercase(),
    };
    let valid = name
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_');
    if name.is_empty() || name == "u_" || !valid {
        None
    } else {
        Some(name)
    }
}

pub fn extract_ties(records: &[Post], subreddit: &str, mode: ListingMode) -> BTreeSet<Tie> {
    records
        .iter()
        .filter_map(|post| {
            let origin = post.origin_subreddit().and_then(normalize_subreddit)?;
            Some(Tie {
                target: subreddit.to_string(),
                label: post.id.clone(),
                source: origin,
                kind: mode.to_string(),
            })
        })
        .collect()
}

pub fn discovered_sources<'a, I>(ties: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a Tie>,
{
    ties.into_iter().map(|tie| tie.source.clone()).collect()
}
