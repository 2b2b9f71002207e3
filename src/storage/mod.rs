//! Object storage for report images, backed by a local directory.
//!
//! Objects are written under `report_images/<unix-millis>_<file name>` and
//! served back by the HTTP layer under the configured public URL.

use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::errors::AppError;

const IMAGE_PREFIX: &str = "report_images";

/// A stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub key: String,
    pub url: String,
}

pub struct ObjectStore {
    root: PathBuf,
    public_url: String,
    max_bytes: usize,
}

impl ObjectStore {
    /// Open the store, creating its directory if needed.
    pub fn open(root: &Path, public_url: &str, max_bytes: usize) -> Result<Self, AppError> {
        std::fs::create_dir_all(root.join(IMAGE_PREFIX))
            .map_err(|e| AppError::Storage(format!("Failed to create upload directory: {}", e)))?;

        Ok(Self {
            root: root.to_path_buf(),
            public_url: public_url.trim_end_matches('/').to_string(),
            max_bytes,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Store an uploaded image and return its retrievable URL.
    pub async fn put_image(
        &self,
        file_name: &str,
        content_type: &str,
        data: &[u8],
    ) -> Result<StoredObject, AppError> {
        if !content_type.starts_with("image/") {
            return Err(AppError::Validation(format!(
                "Unsupported file type {}, only images are accepted",
                content_type
            )));
        }
        if data.is_empty() {
            return Err(AppError::Validation("The uploaded file is empty".to_string()));
        }
        if data.len() > self.max_bytes {
            return Err(AppError::Validation(format!(
                "The image exceeds the {} byte limit",
                self.max_bytes
            )));
        }

        let key = format!(
            "{}/{}_{}",
            IMAGE_PREFIX,
            Utc::now().timestamp_millis(),
            sanitize_file_name(file_name, content_type)
        );

        tokio::fs::write(self.root.join(&key), data).await?;

        tracing::info!(key = %key, bytes = data.len(), "Image stored");

        Ok(StoredObject {
            url: format!("{}/{}", self.public_url, key),
            key,
        })
    }

    /// Delete a stored object. Missing objects are not an error.
    pub async fn remove(&self, key: &str) -> Result<(), AppError> {
        if !key.starts_with(IMAGE_PREFIX) || key.contains("..") {
            return Err(AppError::Validation(format!("Invalid object key {}", key)));
        }

        match tokio::fs::remove_file(self.root.join(key)).await {
            Ok(()) => {
                tracing::info!(key = %key, "Image removed");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Keep the name safe to use as a single path component.
fn sanitize_file_name(name: &str, content_type: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');

    if cleaned.is_empty() {
        format!("image.{}", extension_for(content_type))
    } else {
        cleaned.to_string()
    }
}

fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/png" => "png",
        "image/webp" => "webp",
        "image/gif" => "gif",
        _ => "bin",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("rampa rota.png", "image/png"), "rampa_rota.png");
        assert_eq!(sanitize_file_name("../../etc/passwd", "image/png"), "passwd");
        assert_eq!(sanitize_file_name("C:\\fotos\\acera.jpg", "image/jpeg"), "acera.jpg");
        assert_eq!(sanitize_file_name("", "image/jpeg"), "image.jpg");
        assert_eq!(sanitize_file_name("..", "image/webp"), "image.webp");
    }

    #[tokio::test]
    async fn test_put_image() {
        let temp_dir = TempDir::new().unwrap();
        let store = ObjectStore::open(temp_dir.path(), "/uploads/", 1024).unwrap();

        let object = store
            .put_image("bache.png", "image/png", b"\x89PNG fake")
            .await
            .unwrap();

        assert!(object.key.starts_with("report_images/"));
        assert!(object.key.ends_with("_bache.png"));
        assert_eq!(object.url, format!("/uploads/{}", object.key));

        let stored = std::fs::read(temp_dir.path().join(&object.key)).unwrap();
        assert_eq!(stored, b"\x89PNG fake");
    }

    #[tokio::test]
    async fn test_put_image_rejects() {
        let temp_dir = TempDir::new().unwrap();
        let store = ObjectStore::open(temp_dir.path(), "/uploads", 4).unwrap();

        let not_image = store.put_image("a.txt", "text/plain", b"hi").await;
        assert!(matches!(not_image, Err(AppError::Validation(_))));

        let too_big = store.put_image("a.png", "image/png", b"12345").await;
        assert!(matches!(too_big, Err(AppError::Validation(_))));

        let empty = store.put_image("a.png", "image/png", b"").await;
        assert!(matches!(empty, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_remove() {
        let temp_dir = TempDir::new().unwrap();
        let store = ObjectStore::open(temp_dir.path(), "/uploads", 1024).unwrap();

        let object = store
            .put_image("bache.png", "image/png", b"\x89PNG fake")
            .await
            .unwrap();
        store.remove(&object.key).await.unwrap();
        assert!(!temp_dir.path().join(&object.key).exists());

        // already gone
        store.remove(&object.key).await.unwrap();

        let outside = store.remove("report_images/../secret").await;
        assert!(matches!(outside, Err(AppError::Validation(_))));
    }
}
