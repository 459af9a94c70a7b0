mod archive;
mod authors;
mod config;
mod crawler;
mod extract;
mod fetchable;
mod frontier;
mod hydrate;
pub mod record;

pub use archive::Archive;
pub use authors::AuthorCache;
pub use config::{CrawlerConfig, ListingMode, OnError};
pub use crawler::{CrawlState, CrawlSummary, Crawler, TargetReport};
pub use extract::{discovered_sources, extract_ties, normalize_subreddit, Tie};
pub use fetchable::{FetchError, Fetchable};
pub use frontier::{Frontier, FrontierEntry, FrontierStats, Outcome, Status, DEFAULT_LEASE};
pub use hydrate::Hydrator;

pub use anyhow;
