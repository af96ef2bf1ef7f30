//! Uploaded post images, stored under the media root.

use std::path::{Path, PathBuf};

use uuid::Uuid;

/// URL prefix the media root is served under.
pub const MEDIA_URL: &str = "/media";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Gif,
    Png,
    Jpeg,
    Webp,
}

impl ImageKind {
    /// Recognizes an image by its leading magic bytes.
    pub fn sniff(bytes: &[u8]) -> Option<ImageKind> {
        if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            Some(ImageKind::Gif)
        } else if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
            Some(ImageKind::Png)
        } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(ImageKind::Jpeg)
        } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            Some(ImageKind::Webp)
        } else {
            None
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ImageKind::Gif => "gif",
            ImageKind::Png => "png",
            ImageKind::Jpeg => "jpg",
            ImageKind::Webp => "webp",
        }
    }
}

/// A file field from a submitted form.
#[derive(Debug, Clone, Default)]
pub struct Upload {
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        MediaStore { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes the image and returns its path relative to the media root.
    pub async fn save_post_image(&self, bytes: &[u8], kind: ImageKind) -> std::io::Result<String> {
        let relative = format!("posts/{}.{}", Uuid::now_v7().simple(), kind.extension());
        let path = self.root.join(&relative);
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        tokio::fs::write(&path, bytes).await?;

        tracing::debug!(path = %path.display(), size = bytes.len(), "stored post image");
        Ok(relative)
    }

    /// Best effort: a missing file is not an error.
    pub async fn remove(&self, relative: &str) {
        let path = self.root.join(relative);
        if let Err(err) = tokio::fs::remove_file(&path).await {
            if err.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %path.display(), %err, "could not remove media file");
            }
        }
    }
}

pub fn media_url(relative: &str) -> String {
    format!("{MEDIA_URL}/{relative}")
}
