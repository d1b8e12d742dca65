use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use ferret_model::Episode;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Artifact I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Artifact serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("No free artifact name for {stem} after {attempts} attempts")]
    NameExhausted { stem: String, attempts: u32 },
}

const MAX_SUFFIX: u32 = 10_000;

/// Writes anomalous episodes as JSON artifacts into one directory.
///
/// Files are never overwritten: each write uses `create_new`, appending a
/// `-<n>` suffix when the timestamped name is taken.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `episode-seed<seed>-<yyyymmddThhmmss.ffffff>Z`, from the episode start.
    pub fn file_stem(episode: &Episode) -> String {
        format!(
            "episode-seed{}-{}Z",
            episode.seed,
            episode.started_at.format("%Y%m%dT%H%M%S%.6f")
        )
    }

    pub fn persist(&self, episode: &Episode) -> Result<PathBuf, StoreError> {
        std::fs::create_dir_all(&self.dir)?;
        let json = episode.to_json()?;
        let stem = Self::file_stem(episode);

        for attempt in 0..MAX_SUFFIX {
            let file_name = if attempt == 0 {
                format!("{stem}.json")
            } else {
                format!("{stem}-{attempt}.json")
            };
            let path = self.dir.join(file_name);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    file.write_all(json.as_bytes())?;
                    file.sync_all()?;
                    info!(path = %path.display(), seed = episode.seed, "persisted anomalous episode");
                    return Ok(path);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Err(StoreError::NameExhausted {
            stem,
            attempts: MAX_SUFFIX,
        })
    }
}
