use std::collections::HashMap;

use crate::fetchable::{FetchError, Fetchable};
use crate::record::Author;

/// Author profiles resolved during one crawl run.
///
/// Lookups that came back unavailable are remembered too, so a deleted or
/// suspended account is asked for at most once per run.
#[derive(Debug, Default)]
pub struct AuthorCache {
    profiles: HashMap<String, Option<Author>>,
    lookups: usize,
}

impl AuthorCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve<F>(&mut self, fetcher: &F, name: &str) -> Result<Option<Author>, FetchError>
    where
        F: Fetchable + ?Sized,
    {
        if let Some(profile) = self.profiles.get(name) {
            return Ok(profile.clone());
        }

        self.lookups += 1;
        let profile = match fetcher.fetch_author(name) {
            Ok(author) => Some(author),
            Err(e) if e.is_unavailable() => {
                log::debug!("Author {name} unavailable: {e}");
                None
            }
            Err(e) => return Err(e),
        };
        self.profiles.insert(name.to_string(), profile.clone());
        Ok(profile)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Number of lookups that went to the fetcher.
    pub fn lookups(&self) -> usize {
        self.lookups
    }
}
