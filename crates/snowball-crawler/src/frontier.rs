//! Durable crawl frontier backed by SQLite.
//!
//! The `frontier` table holds one row per subreddit ever discovered with its
//! discovery step and status (`0` pending, `1` processed, `-1` failed). The
//! `ties` table holds the crosspost edges. Rows are never deleted.
//!
//! Dequeuing claims the row for the calling handle until the claim lease
//! runs out, so several handles on one database never get the same pending
//! entry at the same time.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use crate::extract::{normalize_subreddit, Tie};

const SCHEMA_SQL: &str = "
    CREATE TABLE IF NOT EXISTS frontier (
        subreddit TEXT PRIMARY KEY,
        step INTEGER NOT NULL,
        processed INTEGER NOT NULL DEFAULT 0 CHECK(processed IN (-1, 0, 1)),
        claimed_by TEXT,
        claimed_at INTEGER
    );
    CREATE INDEX IF NOT EXISTS idx_frontier_pending
        ON frontier (processed, step);

    CREATE TABLE IF NOT EXISTS ties (
        target TEXT NOT NULL,
        label TEXT NOT NULL,
        source TEXT NOT NULL,
        kind TEXT NOT NULL,
        UNIQUE (target, label, source, kind)
    );
";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Pending,
    Processed,
    Failed,
}

impl Status {
    pub fn code(self) -> i64 {
        match self {
            Self::Pending => 0,
            Self::Processed => 1,
            Self::Failed => -1,
        }
    }

    pub fn from_code(code: i64) -> Result<Self> {
        match code {
            0 => Ok(Self::Pending),
            1 => Ok(Self::Processed),
            -1 => Ok(Self::Failed),
            other => anyhow::bail!("Invalid frontier status code: {other}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    pub target_id: String,
    pub discovery_step: i64,
    pub status: Status,
}

/// Terminal outcome of one target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Processed,
    Failed,
}

impl From<Outcome> for Status {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Processed => Self::Processed,
            Outcome::Failed => Self::Failed,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrontierStats {
    pub pending: u64,
    pub processed: u64,
    pub failed: u64,
    pub ties: u64,
}

pub const DEFAULT_LEASE: Duration = Duration::from_secs(60 * 60);

static HANDLES: AtomicU64 = AtomicU64::new(0);

pub struct Frontier {
    conn: Connection,
    owner: String,
    lease: Duration,
}

impl Frontier {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Couldn't open frontier database {}", path.display()))?;
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;")
            .context("Couldn't set frontier pragmas")?;
        conn.busy_timeout(Duration::from_secs(5))?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA_SQL)
            .context("Couldn't create frontier schema")?;
        add_claim_columns(&conn)?;
        let owner = format!(
            "{}-{}-{}",
            std::process::id(),
            Utc::now().timestamp_nanos_opt().unwrap_or_default(),
            HANDLES.fetch_add(1, Ordering::SeqCst)
        );
        Ok(Self {
            conn,
            owner,
            lease: DEFAULT_LEASE,
        })
    }

    /// How long a claim taken by [`Frontier::dequeue_next`] keeps other
    /// handles away from the entry.
    pub fn with_lease(mut self, lease: Duration) -> Self {
        self.lease = lease;
        self
    }

    /// Drop every claim on pending entries. For a single crawler resuming
    /// after a crash, when no other handle is working on the database.
    pub fn release_claims(&mut self) -> Result<usize> {
        let released = self
            .conn
            .execute(
                "UPDATE frontier SET claimed_by = NULL, claimed_at = NULL
                 WHERE processed = 0 AND claimed_by IS NOT NULL",
                [],
            )
            .context("Couldn't release frontier claims")?;
        Ok(released)
    }

    /// Insert `target_id` as pending unless it is already known, whatever
    /// its status.
    pub fn enqueue_if_absent(&mut self, target_id: &str, discovery_step: i64) -> Result<bool> {
        let inserted = self
            .conn
            .execute(
                "INSERT OR IGNORE INTO frontier (subreddit, step, processed) VALUES (?1, ?2, 0)",
                params![target_id, discovery_step],
            )
            .with_context(|| format!("Couldn't enqueue {target_id}"))?;
        Ok(inserted == 1)
    }

    /// Batch form of [`Frontier::enqueue_if_absent`], committed as one
    /// transaction. Known targets are skipped row by row. When the same
    /// target appears twice in `entries` the smallest step wins.
    pub fn enqueue_all<'a, I>(&mut self, entries: I) -> Result<usize>
    where
        I: IntoIterator<Item = (&'a str, i64)>,
    {
        let tx = self.conn.transaction()?;
        let inserted = insert_pending(&tx, dedup_candidates(entries))?;
        tx.commit().context("Couldn't commit enqueue batch")?;
        Ok(inserted)
    }

    /// Enqueue seed subreddits given in any common spelling (`r/Foo`, `foo`).
    pub fn seed<I, S>(&mut self, names: I, step: i64) -> Result<usize>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut targets = vec![];
        for name in names {
            match normalize_subreddit(name.as_ref()) {
                Some(target) => targets.push(target),
                None => log::warn!("Ignoring invalid seed {:?}", name.as_ref()),
            }
        }
        self.enqueue_all(targets.iter().map(|t| (t.as_str(), step)))
    }

    /// Claim the pending entry with the largest discovery step, earliest
    /// inserted first among equal steps. Entries claimed by another handle
    /// are skipped until their lease expires, entries claimed by this handle
    /// are handed out again.
    pub fn dequeue_next(&mut self) -> Result<Option<FrontierEntry>> {
        let now = Utc::now().timestamp();
        let expired = now - self.lease.as_secs() as i64;
        let entry = self
            .conn
            .query_row(
                "UPDATE frontier SET claimed_by = ?1, claimed_at = ?2
                 WHERE rowid = (
                     SELECT rowid FROM frontier
                     WHERE processed = 0
                       AND (claimed_by IS NULL OR claimed_by = ?1 OR claimed_at <= ?3)
                     ORDER BY step DESC, rowid ASC LIMIT 1
                 )
                 RETURNING subreddit, step",
                params![self.owner, now, expired],
                |row| {
                    Ok(FrontierEntry {
                        target_id: row.get(0)?,
                        discovery_step: row.get(1)?,
                        status: Status::Pending,
                    })
                },
            )
            .optional()
            .context("Couldn't claim next frontier entry")?;
        Ok(entry)
    }

    pub fn mark_processed(&mut self, target_id: &str) -> Result<bool> {
        self.mark(target_id, Status::Processed)
    }

    pub fn mark_failed(&mut self, target_id: &str) -> Result<bool> {
        self.mark(target_id, Status::Failed)
    }

    /// Returns whether `target_id` exists. Entries already terminal keep
    /// their status.
    fn mark(&mut self, target_id: &str, status: Status) -> Result<bool> {
        let tx = self.conn.transaction()?;
        let exists = mark_terminal(&tx, target_id, status)?;
        tx.commit()?;
        Ok(exists)
    }

    /// Record the outcome of `target_id` in a single transaction: enqueue
    /// the discovered subreddits at `next_step`, store the ties and set the
    /// terminal status. Returns the number of newly enqueued targets.
    pub fn complete<'a, I>(
        &mut self,
        target_id: &str,
        outcome: Outcome,
        discovered: I,
        next_step: i64,
        ties: &[Tie],
    ) -> Result<usize>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let tx = self.conn.transaction()?;
        let enqueued = insert_pending(
            &tx,
            dedup_candidates(discovered.into_iter().map(|t| (t, next_step))),
        )?;
        insert_ties(&tx, ties)?;
        if !mark_terminal(&tx, target_id, outcome.into())? {
            log::warn!("Completed subreddit={target_id} is not in the frontier");
        }
        tx.commit()
            .with_context(|| format!("Couldn't commit outcome for {target_id}"))?;
        Ok(enqueued)
    }

    /// Store ties, skipping the ones already present. Returns how many were new.
    pub fn insert_ties(&mut self, ties: &[Tie]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        let inserted = insert_ties(&tx, ties)?;
        tx.commit()?;
        Ok(inserted)
    }

    pub fn get(&self, target_id: &str) -> Result<Option<FrontierEntry>> {
        let row = self
            .conn
            .query_row(
                "SELECT subreddit, step, processed FROM frontier WHERE subreddit = ?1",
                params![target_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, i64>(2)?,
                    ))
                },
            )
            .optional()?;

        row.map(|(target_id, discovery_step, code)| {
            Ok(FrontierEntry {
                target_id,
                discovery_step,
                status: Status::from_code(code)?,
            })
        })
        .transpose()
    }

    pub fn count_pending(&self) -> Result<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM frontier WHERE processed = 0",
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    pub fn count_ties(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM ties", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    pub fn ties(&self) -> Result<Vec<Tie>> {
        let mut stmt = self.conn.prepare(
            "SELECT target, label, source, kind FROM ties ORDER BY rowid",
        )?;
        let ties = stmt
            .query_map([], |row| {
                Ok(Tie {
                    target: row.get(0)?,
                    label: row.get(1)?,
                    source: row.get(2)?,
                    kind: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(ties)
    }

    pub fn stats(&self) -> Result<FrontierStats> {
        let mut stats = FrontierStats {
            ties: self.count_ties()?,
            ..Default::default()
        };
        let mut stmt = self
            .conn
            .prepare("SELECT processed, COUNT(*) FROM frontier GROUP BY processed")?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let count: i64 = row.get(1)?;
            match Status::from_code(row.get(0)?)? {
                Status::Pending => stats.pending = count as u64,
                Status::Processed => stats.processed = count as u64,
                Status::Failed => stats.failed = count as u64,
            }
        }
        Ok(stats)
    }
}

fn add_claim_columns(conn: &Connection) -> Result<()> {
    let present: i64 = conn.query_row(
        "SELECT COUNT(*) FROM pragma_table_info('frontier') WHERE name = 'claimed_by'",
        [],
        |row| row.get(0),
    )?;
    if present == 0 {
        conn.execute_batch(
            "ALTER TABLE frontier ADD COLUMN claimed_by TEXT;
             ALTER TABLE frontier ADD COLUMN claimed_at INTEGER;",
        )
        .context("Couldn't add claim columns to frontier")?;
    }
    Ok(())
}

fn dedup_candidates<'a, I>(entries: I) -> BTreeMap<&'a str, i64>
where
    I: IntoIterator<Item = (&'a str, i64)>,
{
    let mut candidates = BTreeMap::new();
    for (target, step) in entries {
        candidates
            .entry(target)
            .and_modify(|s: &mut i64| *s = (*s).min(step))
            .or_insert(step);
    }
    candidates
}

fn insert_pending(conn: &Connection, candidates: BTreeMap<&str, i64>) -> Result<usize> {
    let mut stmt = conn.prepare_cached(
        "INSERT OR IGNORE INTO frontier (subreddit, step, processed) VALUES (?1, ?2, 0)",
    )?;
    let mut inserted = 0;
    for (target, step) in candidates {
        inserted += stmt
            .execute(params![target, step])
            .with_context(|| format!("Couldn't enqueue {target}"))?;
    }
    Ok(inserted)
}

fn insert_ties(conn: &Connection, ties: &[Tie]) -> Result<usize> {
    let mut stmt = conn.prepare_cached(
        "INSERT OR IGNORE INTO ties (target, label, source, kind) VALUES (?1, ?2, ?3, ?4)",
    )?;
    let mut inserted = 0;
    for tie in ties {
        inserted += stmt
            .execute(params![tie.target, tie.label, tie.source, tie.kind])
            .with_context(|| format!("Couldn't insert tie {tie:?}"))?;
    }
    Ok(inserted)
}

fn mark_terminal(conn: &Connection, target_id: &str, status: Status) -> Result<bool> {
    conn.execute(
        "UPDATE frontier SET processed = ?2 WHERE subreddit = ?1 AND processed = 0",
        params![target_id, status.code()],
    )
    .with_context(|| format!("Couldn't mark {target_id} as {status:?}"))?;
    let exists = conn
        .query_row(
            "SELECT 1 FROM frontier WHERE subreddit = ?1",
            params![target_id],
            |_| Ok(()),
        )
        .optional()?
        .is_some();
    Ok(exists)
}
