use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::{CommandFactory, Parser};
use clap_complete::{generate, Shell};
use snowball_crawler::{CrawlSummary, Crawler, Frontier, ListingMode, OnError};
use snowball_reddit::RedditFetcher;
use tokio::runtime;

mod config;

use config::SnowballConfig;

/// Snowball crawler following Reddit crossposts
#[derive(Debug, Parser)]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub cmd: SubCommand,
}

#[derive(Debug, clap::Subcommand)]
pub enum SubCommand {
    Crawl(CrawlArgs),
    Seed(SeedArgs),
    Status(StatusArgs),
    #[command(hide = true)]
    Completion,
}

/// Options shared by every command touching the frontier
#[derive(Debug, clap::Args)]
pub struct StoreArgs {
    /// Optional yaml configuration file
    #[arg(env = "SNOWBALL_CONFIG", long)]
    pub config: Option<PathBuf>,
    /// Override the frontier database path
    #[arg(long)]
    pub database: Option<PathBuf>,
}

impl TryFrom<&StoreArgs> for SnowballConfig {
    type Error = anyhow::Error;

    fn try_from(args: &StoreArgs) -> Result<Self, Self::Error> {
        let mut conf = SnowballConfig::load(args.config.as_deref())?;
        if let Some(database) = &args.database {
            conf.crawler.database = database.clone();
        }
        Ok(conf)
    }
}

/// Crawl pending subreddits until the frontier is drained
#[derive(Debug, clap::Args)]
pub struct CrawlArgs {
    #[command(flatten)]
    pub store: StoreArgs,
    /// Override the directory receiving listing snapshots
    #[arg(long)]
    pub cache_root: Option<PathBuf>,
    /// Override the number of posts fetched per listing
    #[arg(long)]
    pub limit: Option<usize>,
    /// Override the listing modes fetched for every subreddit
    #[arg(value_enum, long = "mode")]
    pub modes: Vec<ListingMode>,
    /// Stop after this many subreddits
    #[arg(long)]
    pub max_targets: Option<usize>,
    /// Override the fetch error handling strategy
    #[arg(value_enum, long)]
    pub on_fetch_error: Option<OnError>,
    /// Don't fetch comments of archived posts
    #[arg(long)]
    pub no_comments: bool,
    /// Override the user agent sent to Reddit
    #[arg(long)]
    pub user_agent: Option<String>,
    /// When quiet no logs are outputted
    #[arg(long, short)]
    pub quiet: bool,
}

impl TryFrom<&CrawlArgs> for SnowballConfig {
    type Error = anyhow::Error;

    fn try_from(args: &CrawlArgs) -> Result<Self, Self::Error> {
        let mut conf = SnowballConfig::try_from(&args.store)?;
        if let Some(cache_root) = &args.cache_root {
            conf.crawler.cache_root = cache_root.clone();
        }
        if let Some(limit) = args.limit {
            conf.crawler.limit = limit;
        }
        if !args.modes.is_empty() {
            conf.crawler.listing_modes = args.modes.clone();
        }
        if let Some(max_targets) = args.max_targets {
            conf.crawler.max_targets = Some(max_targets);
        }
        if let Some(on_fetch_error) = args.on_fetch_error {
            conf.crawler.on_fetch_error = on_fetch_error;
        }
        if args.no_comments {
            conf.crawler.include_comments = false;
        }
        if let Some(user_agent) = &args.user_agent {
            conf.reddit.user_agent = user_agent.to_string();
        }
        if conf.crawler.listing_modes.is_empty() {
            anyhow::bail!("At least one listing mode is required");
        }
        Ok(conf)
    }
}

pub fn crawl(args: CrawlArgs) -> anyhow::Result<()> {
    let conf = SnowballConfig::try_from(&args)?;
    let rt = runtime::Builder::new_multi_thread().enable_all().build()?;
    let summary = rt.block_on(run_crawl(conf))?;
    println!(
        "{:?}: {} processed, {} failed, {} enqueued, {} ties",
        summary.state, summary.processed, summary.failed, summary.enqueued, summary.ties
    );
    Ok(())
}

async fn run_crawl(conf: SnowballConfig) -> anyhow::Result<CrawlSummary> {
    let stop = Arc::new(AtomicBool::new(false));

    let stop_c = stop.clone();
    let mut crawl = tokio::task::spawn_blocking(move || {
        let SnowballConfig {
            crawler: crawler_conf,
            reddit: reddit_conf,
            seeds,
        } = conf;
        let mut frontier = Frontier::open(&crawler_conf.database)?;
        let released = frontier.release_claims()?;
        if released > 0 {
            log::warn!("Released {released} claims left by an interrupted crawl");
        }
        let seeded = frontier.seed(&seeds, 0)?;
        if seeded > 0 {
            log::info!("{seeded} seeds added to queue");
        }
        let fetcher = RedditFetcher::new(&reddit_conf)?;
        Crawler::new(crawler_conf, fetcher, frontier)
            .with_stop_flag(stop_c)
            .run()
    });

    loop {
        tokio::select! {
            res = &mut crawl => return res?,
            _ = tokio::signal::ctrl_c() => {
                log::warn!("Interrupted, finishing current subreddit");
                stop.store(true, Ordering::SeqCst);
            }
        }
    }
}

/// Add subreddits to the frontier
#[derive(Debug, clap::Args)]
pub struct SeedArgs {
    #[command(flatten)]
    pub store: StoreArgs,
    /// Discovery step given to the new entries
    #[arg(long, default_value_t = 0)]
    pub step: i64,
    /// Subreddit names, with or without the `r/` prefix
    pub subreddits: Vec<String>,
}

pub fn seed(args: SeedArgs) -> anyhow::Result<()> {
    let conf = SnowballConfig::try_from(&args.store)?;
    let mut frontier = Frontier::open(&conf.crawler.database)?;
    let inserted = frontier.seed(conf.seeds.iter().chain(args.subreddits.iter()), args.step)?;
    println!("{inserted} subreddits added to queue");
    Ok(())
}

/// Print frontier counters
#[derive(Debug, clap::Args)]
pub struct StatusArgs {
    #[command(flatten)]
    pub store: StoreArgs,
}

pub fn status(args: StatusArgs) -> anyhow::Result<()> {
    let conf = SnowballConfig::try_from(&args.store)?;
    let stats = Frontier::open(&conf.crawler.database)?.stats()?;
    println!("pending\t{}", stats.pending);
    println!("processed\t{}", stats.processed);
    println!("failed\t{}", stats.failed);
    println!("ties\t{}", stats.ties);
    Ok(())
}

fn init_logger(filter: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    match args.cmd {
        SubCommand::Crawl(args) => {
            if !args.quiet {
                init_logger("snowball_crawler=info,snowball_reddit=warn");
            }
            crawl(args)
        }
        SubCommand::Seed(args) => {
            init_logger("snowball_crawler=warn");
            seed(args)
        }
        SubCommand::Status(args) => status(args),
        SubCommand::Completion => {
            generate(Shell::Bash, &mut Args::command(), "snowball", &mut io::stdout());
            Ok(())
        }
    }
}
