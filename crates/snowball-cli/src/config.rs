use std::fs::File;
use std::path::Path;

use serde::{Deserialize, Serialize};
use snowball_crawler::CrawlerConfig;
use snowball_reddit::RedditConfig;

/// Content of the yaml configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnowballConfig {
    #[serde(default)]
    pub crawler: CrawlerConfig,

    #[serde(default)]
    pub reddit: RedditConfig,

    /// Subreddits enqueued at step 0 before crawling.
    #[serde(default)]
    pub seeds: Vec<String>,
}

impl SnowballConfig {
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => {
                let file = File::open(path).map_err(|e| {
                    anyhow::anyhow!("Couldn't open config {} got: {e}", path.display())
                })?;
                Ok(serde_yaml::from_reader(file)?)
            }
            None => Ok(Self::default()),
        }
    }
}
