use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlerConfig {
    #[serde(default = "default_listing_modes")]
    pub listing_modes: Vec<ListingMode>,

    #[serde(default = "default_limit")]
    pub limit: usize,

    #[serde(default = "default_cache_root")]
    pub cache_root: PathBuf,

    #[serde(default = "default_database")]
    pub database: PathBuf,

    #[serde(default = "default_include_comments")]
    pub include_comments: bool,

    #[serde(default)]
    pub max_targets: Option<usize>,

    #[serde(default = "default_on_fetch_error")]
    pub on_fetch_error: OnError,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            listing_modes: default_listing_modes(),
            limit: default_limit(),
            cache_root: default_cache_root(),
            database: default_database(),
            include_comments: default_include_comments(),
            max_targets: None,
            on_fetch_error: default_on_fetch_error(),
        }
    }
}

fn default_listing_modes() -> Vec<ListingMode> {
    vec![ListingMode::Hot, ListingMode::Controversial]
}

fn default_limit() -> usize {
    1_000
}

fn default_cache_root() -> PathBuf {
    PathBuf::from("cache")
}

fn default_database() -> PathBuf {
    PathBuf::from("snowball.sqlite")
}

fn default_include_comments() -> bool {
    true
}

fn default_on_fetch_error() -> OnError {
    OnError::SkipAndLog
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum OnError {
    Fail,
    SkipAndLog,
}

/// A ranked view of a subreddit's posts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum ListingMode {
    Hot,
    Controversial,
    New,
    Top,
    Rising,
}

impl ListingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hot => "hot",
            Self::Controversial => "controversial",
            Self::New => "new",
            Self::Top => "top",
            Self::Rising => "rising",
        }
    }
}

impl fmt::Display for ListingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ListingMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hot" => Ok(Self::Hot),
            "controversial" => Ok(Self::Controversial),
            "new" => Ok(Self::New),
            "top" => Ok(Self::Top),
            "rising" => Ok(Self::Rising),
            other => Err(anyhow::anyhow!("Unknown listing mode: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_leave_new_disabled() {
        let conf = CrawlerConfig::default();
        assert_eq!(
            vec![ListingMode::Hot, ListingMode::Controversial],
            conf.listing_modes
        );
        assert_eq!(1_000, conf.limit);
        assert_eq!(OnError::SkipAndLog, conf.on_fetch_error);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let conf: CrawlerConfig =
            serde_json::from_str(r#"{"listingModes": ["new"], "maxTargets": 5}"#).unwrap();
        assert_eq!(vec![ListingMode::New], conf.listing_modes);
        assert_eq!(Some(5), conf.max_targets);
        assert!(conf.include_comments);
        assert_eq!(PathBuf::from("cache"), conf.cache_root);
    }

    #[test]
    fn listing_mode_parses_case_insensitively() {
        assert_eq!(ListingMode::Controversial, "Controversial".parse().unwrap());
        assert!("best".parse::<ListingMode>().is_err());
    }
}
