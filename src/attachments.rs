//! Image attachments, inlined as `data:` URLs.

use crate::error::Result;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Largest attachment we inline (5MB).
const MAX_IMAGE_SIZE: u64 = 5 * 1024 * 1024;

pub fn to_data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, BASE64.encode(bytes))
}

/// Image MIME type of `path`, or None for anything that is not an image.
pub fn image_mime(path: &Path) -> Option<String> {
    let mime = mime_guess::from_path(path).first()?;
    (mime.type_() == mime_guess::mime::IMAGE).then(|| mime.essence_str().to_string())
}

/// Read attachments in order. Files that are not images, or too large, are
/// skipped with a warning; unreadable files are an error.
pub async fn load_images(paths: &[PathBuf]) -> Result<Vec<String>> {
    let mut urls = Vec::with_capacity(paths.len());
    for path in paths {
        let Some(mime) = image_mime(path) else {
            tracing::warn!(path = %path.display(), "attachment is not an image, skipped");
            continue;
        };

        let size = fs::metadata(path).await?.len();
        if size > MAX_IMAGE_SIZE {
            tracing::warn!(path = %path.display(), size, "image too large, skipped");
            continue;
        }

        let bytes = fs::read(path).await?;
        urls.push(to_data_url(&mime, &bytes));
    }
    Ok(urls)
}
