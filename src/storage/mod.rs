//! Blob store for uploaded media.
//!
//! Files live under `<root>/<namespace>/` (profile, news, activities,
//! applications, mentorship) and are addressed by a generated filename:
//! millisecond timestamp plus the sanitized original name. The store knows
//! nothing about the rows that reference the files.

use std::path::PathBuf;
use tracing::warn;

/// Upload ceiling shared by every endpoint that accepts files.
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

const ALLOWED_IMAGE_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/webp", "image/gif"];

#[derive(Clone)]
pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Write bytes under the namespace and return the generated filename.
    pub async fn save(
        &self,
        namespace: &str,
        original_name: &str,
        bytes: &[u8],
    ) -> std::io::Result<String> {
        let dir = self.root.join(namespace);
        tokio::fs::create_dir_all(&dir).await?;

        let filename = format!(
            "{}-{}",
            chrono::Utc::now().timestamp_millis(),
            sanitize_filename(original_name)
        );
        tokio::fs::write(dir.join(&filename), bytes).await?;
        Ok(filename)
    }

    /// Best-effort removal of an orphaned blob. A missing file is not an
    /// error; the referencing row is already gone.
    pub async fn remove(&self, namespace: &str, filename: &str) {
        if filename.contains('/') || filename.contains("..") {
            warn!(namespace, filename, "Refusing suspicious blob filename");
            return;
        }
        let path = self.root.join(namespace).join(filename);
        if let Err(e) = tokio::fs::remove_file(&path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %path.display(), error = %e, "Failed to remove blob");
            }
        }
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }
}

/// Keep only characters that are safe in a filename on every platform.
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '-'
            }
        })
        .collect();
    // ".." must never survive into a stored name.
    let cleaned = cleaned.replace("..", "-");
    let trimmed = cleaned.trim_matches('.');
    if trimmed.is_empty() {
        "file".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Whether an uploaded part is an acceptable image, judged by the declared
/// content type with the filename extension as fallback.
pub fn is_allowed_image(content_type: Option<&str>, filename: &str) -> bool {
    let mime = match content_type {
        Some(ct) if !ct.is_empty() => ct.to_string(),
        _ => mime_guess::from_path(filename)
            .first_or_octet_stream()
            .essence_str()
            .to_string(),
    };
    ALLOWED_IMAGE_TYPES.contains(&mime.as_str())
}

/// Classify an uploaded part for the activity_media table.
pub fn media_type_for(content_type: Option<&str>, filename: &str) -> &'static str {
    let mime = match content_type {
        Some(ct) if !ct.is_empty() => ct.to_string(),
        _ => mime_guess::from_path(filename)
            .first_or_octet_stream()
            .essence_str()
            .to_string(),
    };
    if mime.starts_with("video") {
        "video"
    } else if mime.starts_with("audio") {
        "audio"
    } else {
        "image"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("photo.png"), "photo.png");
        assert_eq!(sanitize_filename("my photo (1).png"), "my-photo--1-.png");
        assert_eq!(sanitize_filename("../../etc/passwd"), "----etc-passwd");
        assert!(!sanitize_filename("a/b/c.png").contains('/'));
        assert!(!sanitize_filename("../../x").contains(".."));
        assert_eq!(sanitize_filename("."), "file");
        assert_eq!(sanitize_filename(""), "file");
        assert_eq!(sanitize_filename("naïve café.jpg"), "na-ve-caf-.jpg");
    }

    #[test]
    fn test_is_allowed_image() {
        assert!(is_allowed_image(Some("image/png"), "x.bin"));
        assert!(is_allowed_image(Some("image/webp"), "x"));
        assert!(is_allowed_image(None, "photo.jpg"));
        assert!(!is_allowed_image(Some("image/svg+xml"), "x.svg"));
        assert!(!is_allowed_image(Some("application/pdf"), "x.pdf"));
        assert!(!is_allowed_image(None, "clip.mp4"));
    }

    #[test]
    fn test_media_type_for() {
        assert_eq!(media_type_for(Some("video/mp4"), "a"), "video");
        assert_eq!(media_type_for(Some("audio/mpeg"), "a"), "audio");
        assert_eq!(media_type_for(Some("image/png"), "a"), "image");
        assert_eq!(media_type_for(None, "talk.mp3"), "audio");
        assert_eq!(media_type_for(None, "clip.webm"), "video");
    }

    #[tokio::test]
    async fn test_save_and_remove_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::new(dir.path());

        let name = store.save("profile", "me.png", b"png-bytes").await.unwrap();
        assert!(name.ends_with("-me.png"));

        let on_disk = dir.path().join("profile").join(&name);
        assert_eq!(tokio::fs::read(&on_disk).await.unwrap(), b"png-bytes");

        store.remove("profile", &name).await;
        assert!(!on_disk.exists());

        // Removing again (or a traversal attempt) must not error or escape.
        store.remove("profile", &name).await;
        store.remove("profile", "../escape.png").await;
    }
}
