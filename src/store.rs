//! Durable single-record store for loop state.
//!
//! The record lives at `<workspace>/.wiggum/loop.json`. Every mutation
//! rewrites the whole record; writes go through a temp file and rename
//! under an advisory lock, so readers never see a torn file. The lock does
//! not serialize logical read-modify-write sequences across processes; the
//! design assumes one controller per workspace.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::warn;

use crate::error::{LoopError, Result};
use crate::state::LoopState;

/// Hidden directory under the workspace root.
pub const STATE_DIR: &str = ".wiggum";

/// State file name within the state directory.
const STATE_FILE: &str = "loop.json";

const TMP_SUFFIX: &str = ".tmp";
const LOCK_SUFFIX: &str = ".lock";

/// File-backed store holding at most one [`LoopState`] record.
#[derive(Debug, Clone)]
pub struct StateStore {
    dir: PathBuf,
}

impl StateStore {
    /// Creates a store rooted at the given workspace directory.
    #[must_use]
    pub fn new(workspace: impl AsRef<Path>) -> Self {
        Self {
            dir: workspace.as_ref().join(STATE_DIR),
        }
    }

    /// Returns the path to the state file.
    #[must_use]
    pub fn state_file_path(&self) -> PathBuf {
        self.dir.join(STATE_FILE)
    }

    fn tmp_file_path(&self) -> PathBuf {
        self.dir.join(format!("{STATE_FILE}{TMP_SUFFIX}"))
    }

    fn lock_file_path(&self) -> PathBuf {
        self.dir.join(format!("{STATE_FILE}{LOCK_SUFFIX}"))
    }

    /// Persists the full record, overwriting any prior record.
    pub fn save(&self, state: &LoopState) -> Result<()> {
        fs::create_dir_all(&self.dir)?;

        let lock_file = File::create(self.lock_file_path())?;
        FileExt::lock_exclusive(&lock_file)
            .map_err(|e| LoopError::Other(anyhow::anyhow!("Failed to acquire state lock: {e}")))?;

        let tmp_path = self.tmp_file_path();
        let json = serde_json::to_string_pretty(state)?;

        let mut tmp_file = File::create(&tmp_path)?;
        tmp_file.write_all(json.as_bytes())?;
        tmp_file.sync_all()?;

        fs::rename(&tmp_path, self.state_file_path())?;

        Ok(())
    }

    /// Loads the record if a well-formed one exists.
    ///
    /// A record that exists but fails to parse is treated identically to
    /// "no state": it is logged, deleted, and `Ok(None)` is returned.
    pub fn load(&self) -> Result<Option<LoopState>> {
        let state_path = self.state_file_path();

        if !state_path.exists() {
            return Ok(None);
        }

        let lock_path = self.lock_file_path();
        if lock_path.exists() {
            let lock_file = File::open(&lock_path)?;
            FileExt::lock_shared(&lock_file).map_err(|e| {
                LoopError::Other(anyhow::anyhow!("Failed to acquire state lock: {e}"))
            })?;
        }

        let mut file = match File::open(&state_path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        match serde_json::from_str(&contents) {
            Ok(state) => Ok(Some(state)),
            Err(e) => {
                warn!(
                    "Corrupted loop state at {}: {}. Treating as no active loop.",
                    state_path.display(),
                    e
                );
                let _ = fs::remove_file(&state_path);
                Ok(None)
            }
        }
    }

    /// Removes the record; tolerant of an already-missing record.
    pub fn clear(&self) -> Result<()> {
        let state_path = self.state_file_path();
        if state_path.exists() {
            fs::remove_file(&state_path)?;
        }
        Ok(())
    }

    /// Checks whether a record file exists on disk.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.state_file_path().exists()
    }
}
