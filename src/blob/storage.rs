use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("object not found")]
    NotFound,
    #[error("invalid object key: {0}")]
    InvalidKey(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl BlobError {
    fn from_io(e: std::io::Error) -> Self {
        if e.kind() == ErrorKind::NotFound {
            Self::NotFound
        } else {
            Self::Io(e)
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectInfo {
    pub name: String,
    pub size: i64,
    pub last_modified: DateTime<Utc>,
}

/// Filesystem-backed object bucket. Objects are addressed by slash-separated
/// keys relative to the bucket root; writes go through a temp file and a
/// rename so readers never observe a partial object.
pub struct BlobStorage {
    bucket_path: PathBuf,
}

/// Bucket policy marker granting anonymous read, in the shape object-storage
/// services use. The HTTP layer serves bucket contents unauthenticated.
const PUBLIC_READ_POLICY: &str = r#"{"Version":"2012-10-17","Statement":[{"Effect":"Allow","Principal":{"AWS":["*"]},"Action":["s3:GetObject"],"Resource":["*"]}]}"#;

impl BlobStorage {
    pub fn new(data_dir: &Path, bucket: &str) -> Self {
        Self {
            bucket_path: data_dir.join(bucket),
        }
    }

    #[must_use]
    pub fn bucket_path(&self) -> &Path {
        &self.bucket_path
    }

    /// Creates the bucket and records its public-read policy. Idempotent.
    pub async fn ensure_bucket(&self) -> Result<(), BlobError> {
        fs::create_dir_all(&self.bucket_path).await?;
        let policy_path = self.bucket_path.join(".policy");
        if !policy_path.exists() {
            fs::write(&policy_path, PUBLIC_READ_POLICY).await?;
        }
        Ok(())
    }

    fn object_path(&self, object: &str) -> Result<PathBuf, BlobError> {
        validate_object_key(object)?;
        Ok(self.bucket_path.join(object))
    }

    fn temp_path(&self) -> PathBuf {
        self.bucket_path.join(".tmp").join(Uuid::new_v4().to_string())
    }

    pub async fn exists(&self, object: &str) -> Result<bool, BlobError> {
        let path = self.object_path(object)?;
        Ok(path.exists())
    }

    pub async fn put(&self, object: &str, data: &[u8]) -> Result<(), BlobError> {
        let final_path = self.object_path(object)?;

        let temp_path = self.temp_path();
        if let Some(parent) = temp_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut temp_file = File::create(&temp_path).await?;
        temp_file.write_all(data).await?;
        temp_file.sync_all().await?;

        if let Some(parent) = final_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        fs::rename(&temp_path, &final_path).await?;

        Ok(())
    }

    pub async fn get(&self, object: &str) -> Result<Vec<u8>, BlobError> {
        let path = self.object_path(object)?;
        fs::read(&path).await.map_err(BlobError::from_io)
    }

    pub async fn delete(&self, object: &str) -> Result<bool, BlobError> {
        let path = self.object_path(object)?;

        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(BlobError::Io(e)),
        }
    }

    /// Lists every object in the bucket. Dot-prefixed entries (the policy
    /// marker, the temp area) are not objects and are skipped.
    pub async fn list(&self) -> Result<Vec<ObjectInfo>, BlobError> {
        let mut objects = Vec::new();
        let mut pending = vec![(self.bucket_path.clone(), String::new())];

        while let Some((dir, prefix)) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(BlobError::Io(e)),
            };

            while let Some(entry) = entries.next_entry().await? {
                let name = entry.file_name().to_string_lossy().into_owned();
                if name.starts_with('.') {
                    continue;
                }

                let key = if prefix.is_empty() {
                    name
                } else {
                    format!("{prefix}/{name}")
                };

                let metadata = entry.metadata().await?;
                if metadata.is_dir() {
                    pending.push((entry.path(), key));
                } else {
                    let modified = metadata
                        .modified()
                        .map(DateTime::<Utc>::from)
                        .unwrap_or_else(|_| Utc::now());
                    objects.push(ObjectInfo {
                        name: key,
                        size: metadata.len() as i64,
                        last_modified: modified,
                    });
                }
            }
        }

        objects.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(objects)
    }
}

fn validate_object_key(key: &str) -> Result<(), BlobError> {
    if key.is_empty() || key.starts_with('/') || key.ends_with('/') {
        return Err(BlobError::InvalidKey(key.to_string()));
    }

    for segment in key.split('/') {
        if segment.is_empty() || segment == ".." || segment.starts_with('.') {
            return Err(BlobError::InvalidKey(key.to_string()));
        }
        if segment.len() > 255 {
            return Err(BlobError::InvalidKey(key.to_string()));
        }
        const INVALID_CHARS: &[char] = &['\0', '\n', '\r', '\\'];
        if segment.chars().any(|c| INVALID_CHARS.contains(&c)) {
            return Err(BlobError::InvalidKey(key.to_string()));
        }
    }

    Ok(())
}

#[must_use]
pub fn is_valid_object_key(key: &str) -> bool {
    validate_object_key(key).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_storage() -> (TempDir, BlobStorage) {
        let temp_dir = TempDir::new().unwrap();
        let storage = BlobStorage::new(temp_dir.path(), "test-bucket");
        (temp_dir, storage)
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let (_dir, storage) = test_storage();
        storage.ensure_bucket().await.unwrap();

        storage
            .put("abc/assets/sprite.png", b"fake png")
            .await
            .unwrap();

        assert!(storage.exists("abc/assets/sprite.png").await.unwrap());
        let content = storage.get("abc/assets/sprite.png").await.unwrap();
        assert_eq!(content, b"fake png");
    }

    #[tokio::test]
    async fn test_get_missing_object() {
        let (_dir, storage) = test_storage();
        storage.ensure_bucket().await.unwrap();

        assert!(matches!(
            storage.get("nope/index.html").await,
            Err(BlobError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_delete() {
        let (_dir, storage) = test_storage();
        storage.ensure_bucket().await.unwrap();

        storage.put("abc/index.html", b"<html>").await.unwrap();
        assert!(storage.delete("abc/index.html").await.unwrap());
        assert!(!storage.exists("abc/index.html").await.unwrap());
        assert!(!storage.delete("abc/index.html").await.unwrap());
    }

    #[tokio::test]
    async fn test_list_skips_policy_and_temp() {
        let (_dir, storage) = test_storage();
        storage.ensure_bucket().await.unwrap();

        storage.put("abc/index.html", b"<html>").await.unwrap();
        storage.put("abc/assets/a.js", b"js").await.unwrap();

        let objects = storage.list().await.unwrap();
        let names: Vec<&str> = objects.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["abc/assets/a.js", "abc/index.html"]);
    }

    #[tokio::test]
    async fn test_invalid_keys_rejected() {
        let (_dir, storage) = test_storage();
        storage.ensure_bucket().await.unwrap();

        for key in ["", "/abs/path", "a/../escape", "a//b", ".policy", "a/.hidden"] {
            assert!(
                matches!(storage.put(key, b"x").await, Err(BlobError::InvalidKey(_))),
                "key {key:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_is_valid_object_key() {
        assert!(is_valid_object_key("abc/index.html"));
        assert!(is_valid_object_key("550e8400/assets/image.png"));
        assert!(!is_valid_object_key("../etc/passwd"));
        assert!(!is_valid_object_key("abc/"));
    }
}
