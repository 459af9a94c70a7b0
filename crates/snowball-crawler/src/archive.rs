use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::config::ListingMode;
use crate::record::{Post, Snapshot};

/// Writes one snapshot file per (subreddit, listing mode) under `root`.
#[derive(Debug, Clone)]
pub struct Archive {
    root: PathBuf,
}

impl Archive {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn snapshot_path(&self, subreddit: &str, mode: ListingMode) -> PathBuf {
        self.root.join(subreddit).join(format!("{mode}.json"))
    }

    /// Replace the snapshot of `subreddit` for `mode`. The file is written
    /// next to its destination and renamed over it, so readers only ever
    /// see a complete snapshot.
    pub fn write_snapshot(
        &self,
        subreddit: &str,
        mode: ListingMode,
        records: &[Post],
    ) -> Result<PathBuf> {
        let path = self.snapshot_path(subreddit, mode);
        let dir = self.root.join(subreddit);
        fs_err::create_dir_all(&dir)?;

        let snapshot = Snapshot::new(subreddit, mode, records.to_vec());
        let tmp_path = dir.join(format!(".{mode}.json.tmp"));
        {
            let file = fs_err::File::create(&tmp_path)?;
            let mut wtr = BufWriter::new(file);
            serde_json::to_writer(&mut wtr, &snapshot)
                .with_context(|| format!("Couldn't serialize snapshot {}", path.display()))?;
            wtr.flush()?;
            wtr.get_ref().sync_all()?;
        }
        fs_err::rename(&tmp_path, &path)?;

        log::info!("Dumped {} records to {}", records.len(), path.display());
        Ok(path)
    }

    pub fn read_snapshot(&self, subreddit: &str, mode: ListingMode) -> Result<Snapshot> {
        let path = self.snapshot_path(subreddit, mode);
        let file = fs_err::File::open(&path)?;
        serde_json::from_reader(std::io::BufReader::new(file))
            .with_context(|| format!("Couldn't parse snapshot {}", path.display()))
    }
}
