use std::path::{Path, PathBuf};

use crate::error::Result;

/// Local-time prefix of every session identifier
const TIMESTAMP_FORMAT: &str = "%Y_%m_%d_%H.%M.%S";

/// Extension of published videos
pub const VIDEO_EXTENSION: &str = "mp4";

/// Creates per-request working directories under the result root
#[derive(Debug, Clone)]
pub struct SessionDirs {
    root: PathBuf,
}

impl SessionDirs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create a fresh session directory
    ///
    /// The root is created too if missing; both creations are idempotent.
    pub async fn create(&self) -> Result<Session> {
        let id = new_session_id();
        let dir = self.root.join(&id);

        tokio::fs::create_dir_all(&dir).await?;

        tracing::debug!(session = %id, dir = %dir.display(), "session directory created");

        Ok(Session {
            id,
            dir,
            root: self.root.clone(),
        })
    }
}

/// One request's working area
#[derive(Debug, Clone)]
pub struct Session {
    id: String,
    dir: PathBuf,
    root: PathBuf,
}

impl Session {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Directory holding the downloads and intermediate artifacts
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Where the rendered video is published, a sibling of [`Session::dir`]
    pub fn video_path(&self) -> PathBuf {
        self.root.join(format!("{}.{VIDEO_EXTENSION}", self.id))
    }
}

/// Timestamp down to the second plus a random suffix
///
/// The suffix keeps two requests that start within the same second apart.
fn new_session_id() -> String {
    let timestamp = jiff::Zoned::now().strftime(TIMESTAMP_FORMAT).to_string();
    let suffix = uuid::Uuid::new_v4().simple().to_string();

    format!("{timestamp}_{}", &suffix[..8])
}
