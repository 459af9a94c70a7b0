use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Result};

use crate::archive::Archive;
use crate::authors::AuthorCache;
use crate::config::{CrawlerConfig, ListingMode, OnError};
use crate::extract::{discovered_sources, extract_ties, Tie};
use crate::fetchable::Fetchable;
use crate::frontier::{Frontier, FrontierEntry, Outcome};
use crate::hydrate::Hydrator;
use crate::record::Post;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlState {
    Running,
    /// No pending entry left.
    Drained,
    /// Stopped by `max_targets` or the stop flag, pending entries remain.
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlSummary {
    pub state: CrawlState,
    pub processed: usize,
    pub failed: usize,
    pub enqueued: usize,
    pub ties: usize,
}

/// Result of processing one frontier entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetReport {
    pub target_id: String,
    pub outcome: Outcome,
    pub successful_modes: Vec<ListingMode>,
    pub enqueued: usize,
    pub ties: usize,
}

pub struct Crawler<F> {
    config: CrawlerConfig,
    fetcher: F,
    frontier: Frontier,
    archive: Archive,
    authors: AuthorCache,
    stop: Arc<AtomicBool>,
}

impl<F> Crawler<F>
where
    F: Fetchable,
{
    pub fn new(config: CrawlerConfig, fetcher: F, frontier: Frontier) -> Self {
        let archive = Archive::new(config.cache_root.clone());
        Self {
            config,
            fetcher,
            frontier,
            archive,
            authors: AuthorCache::new(),
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Share `stop` as the stop flag, see [`Crawler::stop_handle`].
    pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = stop;
        self
    }

    /// Flag checked between targets, raising it ends the run once the
    /// current target is committed.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    pub fn frontier(&self) -> &Frontier {
        &self.frontier
    }

    pub fn frontier_mut(&mut self) -> &mut Frontier {
        &mut self.frontier
    }

    pub fn authors(&self) -> &AuthorCache {
        &self.authors
    }

    pub fn into_frontier(self) -> Frontier {
        self.frontier
    }

    pub fn run(&mut self) -> Result<CrawlSummary> {
        let mut summary = CrawlSummary {
            state: CrawlState::Running,
            processed: 0,
            failed: 0,
            enqueued: 0,
            ties: 0,
        };
        log::info!(
            "{} subreddits to process",
            self.frontier.count_pending()?
        );

        while summary.state == CrawlState::Running {
            if self.stop.load(Ordering::SeqCst) {
                log::warn!("Stop requested, leaving remaining subreddits pending");
                summary.state = CrawlState::Stopped;
                break;
            }
            if let Some(max) = self.config.max_targets {
                if summary.processed + summary.failed >= max {
                    log::info!("Reached max targets ({max})");
                    summary.state = CrawlState::Stopped;
                    break;
                }
            }

            match self.step()? {
                Some(report) => {
                    match report.outcome {
                        Outcome::Processed => summary.processed += 1,
                        Outcome::Failed => summary.failed += 1,
                    }
                    summary.enqueued += report.enqueued;
                    summary.ties += report.ties;
                }
                None => summary.state = CrawlState::Drained,
            }
        }

        log::info!(
            "Crawl {:?}: {} processed, {} failed, {} enqueued, {} ties",
            summary.state,
            summary.processed,
            summary.failed,
            summary.enqueued,
            summary.ties
        );
        Ok(summary)
    }

    /// Process the next pending entry, `None` once the frontier is drained.
    pub fn step(&mut self) -> Result<Option<TargetReport>> {
        match self.frontier.dequeue_next()? {
            Some(entry) => self.process(entry).map(Some),
            None => Ok(None),
        }
    }

    fn process(&mut self, entry: FrontierEntry) -> Result<TargetReport> {
        let FrontierEntry {
            target_id,
            discovery_step,
            ..
        } = entry;
        log::info!("Processing subreddit={target_id} step={discovery_step}");

        let mut successful_modes = vec![];
        let mut ties = BTreeSet::new();
        let modes = self.config.listing_modes.clone();
        for mode in modes {
            let Some(records) = self.fetch_mode(&target_id, mode)? else {
                continue;
            };
            ties.extend(extract_ties(&records, &target_id, mode));
            self.archive.write_snapshot(&target_id, mode, &records)?;
            successful_modes.push(mode);
        }

        let (outcome, ties) = if successful_modes.is_empty() {
            log::warn!("Marking subreddit={target_id} unsuccessful");
            (Outcome::Failed, vec![])
        } else {
            (Outcome::Processed, ties.into_iter().collect::<Vec<Tie>>())
        };

        let sources = discovered_sources(&ties);
        let enqueued = self.frontier.complete(
            &target_id,
            outcome,
            sources.iter().map(String::as_str),
            discovery_step + 1,
            &ties,
        )?;
        log::info!(
            "subreddit={target_id}: {} added to queue, {} ties uploaded",
            enqueued,
            ties.len()
        );

        Ok(TargetReport {
            target_id,
            outcome,
            successful_modes,
            enqueued,
            ties: ties.len(),
        })
    }

    /// Hydrated records of one listing mode, `None` when it yields nothing.
    fn fetch_mode(&mut self, target_id: &str, mode: ListingMode) -> Result<Option<Vec<Post>>> {
        let listing = match self
            .fetcher
            .fetch_listing(target_id, mode, self.config.limit)
        {
            Ok(listing) => listing,
            Err(e) if e.is_unavailable() => {
                log::warn!("Listing {mode} of subreddit={target_id} unavailable: {e}");
                return Ok(None);
            }
            Err(e) => match self.config.on_fetch_error {
                OnError::SkipAndLog => {
                    log::error!("Skipping listing {mode} of subreddit={target_id} got: {e}");
                    return Ok(None);
                }
                OnError::Fail => {
                    return Err(anyhow!(
                        "Couldn't fetch listing {mode} of subreddit={target_id} got: {e}"
                    ))
                }
            },
        };

        if listing.is_empty() {
            log::info!("Listing {mode} of subreddit={target_id} is empty");
            return Ok(None);
        }

        let records = Hydrator::new(
            &self.fetcher,
            &mut self.authors,
            self.config.include_comments,
            self.config.on_fetch_error,
        )
        .hydrate(listing)?;
        Ok(Some(records))
    }
}
