use std::path::{Component, Path, PathBuf};

use url::Url;

use crate::{
    error::{GenerateError, Result},
    session::{Session, VIDEO_EXTENSION},
};

/// Moves rendered videos to their public location and resolves them by name
#[derive(Debug, Clone)]
pub struct Publisher {
    root: PathBuf,
    public_base_url: Url,
}

/// An opened video ready to be streamed
#[derive(Debug)]
pub struct VideoFile {
    pub file: tokio::fs::File,
    pub len: u64,
    pub content_type: &'static str,
}

impl Publisher {
    pub fn new(root: impl Into<PathBuf>, public_base_url: Url) -> Self {
        Self {
            root: root.into(),
            public_base_url,
        }
    }

    /// Move `rendered` to `<root>/<session>.mp4` and return its retrieval URL
    ///
    /// Overwrites any file already at the destination.
    pub async fn publish(&self, session: &Session, rendered: &Path) -> Result<String> {
        let dest = session.video_path();

        if let Err(e) = tokio::fs::rename(rendered, &dest).await {
            // rename fails across filesystems; fall back to copy and remove
            tracing::debug!(error = %e, "rename failed, copying rendered video");
            tokio::fs::copy(rendered, &dest).await?;
            tokio::fs::remove_file(rendered).await?;
        }

        let filename = dest
            .file_name()
            .and_then(std::ffi::OsStr::to_str)
            .ok_or_else(|| GenerateError::Toolkit(format!("unusable video path {}", dest.display())))?;

        let url = self.video_url(filename);
        tracing::info!(session = %session.id(), %url, "video published");

        Ok(url)
    }

    /// Open a published video by bare file name
    ///
    /// Names that could escape the result root, and anything that is not a
    /// regular file, resolve to [`GenerateError::NotFound`].
    pub async fn open(&self, filename: &str) -> Result<VideoFile> {
        if !is_plain_name(filename) {
            tracing::debug!(%filename, "rejected video name");
            return Err(GenerateError::NotFound);
        }

        let path = self.root.join(filename);

        let metadata = match tokio::fs::metadata(&path).await {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => return Err(GenerateError::NotFound),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(GenerateError::NotFound),
            Err(e) => return Err(e.into()),
        };

        let file = tokio::fs::File::open(&path).await?;

        Ok(VideoFile {
            file,
            len: metadata.len(),
            content_type: content_type_for(&path),
        })
    }

    fn video_url(&self, filename: &str) -> String {
        let base = self.public_base_url.as_str().trim_end_matches('/');
        format!("{base}/videos/{filename}")
    }
}

/// A single normal path component, so joining it to the root stays inside it
fn is_plain_name(filename: &str) -> bool {
    // components() drops trailing separators and inner `.`
    if filename.contains(['/', '\\', '\0']) {
        return false;
    }

    let mut components = Path::new(filename).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(std::ffi::OsStr::to_str) {
        Some(ext) if ext.eq_ignore_ascii_case(VIDEO_EXTENSION) => "video/mp4",
        _ => "application/octet-stream",
    }
}
