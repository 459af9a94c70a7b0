mod client;
mod model;

pub use client::{RedditConfig, RedditFetcher};

pub use anyhow;
