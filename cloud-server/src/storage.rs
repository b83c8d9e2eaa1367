//! Artifact store
//!
//! Append-only directory of received alert images. Each image gets a JSON
//! sidecar with the alert metadata and the image digest. Files are opened
//! with create-new semantics; an existing file is never overwritten.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

use firesentinel_core::logic::dispatch::AlertPayload;
use firesentinel_core::logic::features::ReadingValues;

const MAX_NAME_ATTEMPTS: usize = 4;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("cannot create artifact directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no free artifact name after {0} attempts")]
    NameExhausted(usize),

    #[error("cannot encode sidecar: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Sidecar contents (no image bytes)
#[derive(Debug, Serialize)]
pub struct ArtifactMeta<'a> {
    pub image: &'a str,
    pub sha256: &'a str,
    pub bytes: usize,
    pub received_at: DateTime<Utc>,
    pub alert_timestamp: f64,
    pub abnormal_count: u32,
    pub last_reading: &'a ReadingValues,
    pub fire_detected: bool,
    pub fire_confidence: f64,
}

/// Where one alert image ended up
#[derive(Debug, Clone)]
pub struct StoredArtifact {
    pub file_name: String,
    pub image_path: PathBuf,
    pub meta_path: PathBuf,
    pub sha256: String,
}

#[derive(Debug)]
pub struct ArtifactStore {
    dir: PathBuf,
    seq: AtomicU64,
}

impl ArtifactStore {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir).map_err(|source| StorageError::CreateDir {
            path: dir.clone(),
            source,
        })?;
        Ok(Self {
            dir,
            seq: AtomicU64::new(0),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Directory still exists and is not read-only
    pub async fn is_writable(&self) -> bool {
        match tokio::fs::metadata(&self.dir).await {
            Ok(meta) => meta.is_dir() && !meta.permissions().readonly(),
            Err(_) => false,
        }
    }

    /// `alert_{YYYYmmdd_HHMMSS}_{seq:06}_{rand8}.jpg`
    fn next_name(&self, now: DateTime<Utc>) -> String {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
        format!(
            "alert_{}_{:06}_{:08x}.jpg",
            now.format("%Y%m%d_%H%M%S"),
            seq,
            rand::random::<u32>()
        )
    }

    async fn write_new(path: &Path, bytes: &[u8]) -> Result<bool, StorageError> {
        let mut file = match OpenOptions::new().write(true).create_new(true).open(path).await {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(false),
            Err(source) => {
                return Err(StorageError::Write {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let write = async {
            file.write_all(bytes).await?;
            file.sync_all().await
        };
        write.await.map_err(|source| StorageError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(true)
    }

    /// Image first, then its sidecar. A failed sidecar write removes the image
    /// again so a resent alert does not leave a duplicate behind.
    async fn write_pair(
        image_path: &Path,
        image: &[u8],
        meta_path: &Path,
        meta: &[u8],
    ) -> Result<bool, StorageError> {
        if !Self::write_new(image_path, image).await? {
            return Ok(false);
        }

        match Self::write_new(meta_path, meta).await {
            Ok(true) => Ok(true),
            Ok(false) => {
                tracing::warn!("Sidecar already exists: {}", meta_path.display());
                Ok(true)
            }
            Err(e) => {
                if let Err(rm) = tokio::fs::remove_file(image_path).await {
                    tracing::warn!("Cannot remove orphan image {}: {}", image_path.display(), rm);
                }
                Err(e)
            }
        }
    }

    /// Persist the image and its sidecar
    pub async fn save(&self, payload: &AlertPayload, image: &[u8]) -> Result<StoredArtifact, StorageError> {
        let received_at = Utc::now();
        let sha256 = hex::encode(Sha256::digest(image));

        for _ in 0..MAX_NAME_ATTEMPTS {
            let file_name = self.next_name(received_at);
            let image_path = self.dir.join(&file_name);
            let meta_path = image_path.with_extension("json");

            let meta = ArtifactMeta {
                image: &file_name,
                sha256: &sha256,
                bytes: image.len(),
                received_at,
                alert_timestamp: payload.timestamp,
                abnormal_count: payload.abnormal_count,
                last_reading: &payload.last_reading,
                fire_detected: payload.fire_detected,
                fire_confidence: payload.fire_confidence,
            };
            let meta_bytes = serde_json::to_vec_pretty(&meta)?;
            if !Self::write_pair(&image_path, image, &meta_path, &meta_bytes).await? {
                tracing::warn!("Artifact name collision: {}", file_name);
                continue;
            }

            return Ok(StoredArtifact {
                file_name,
                image_path,
                meta_path,
                sha256,
            });
        }

        Err(StorageError::NameExhausted(MAX_NAME_ATTEMPTS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use firesentinel_core::logic::features::ReadingValues;

    fn payload() -> AlertPayload {
        AlertPayload {
            timestamp: 1_700_000_000.5,
            abnormal_count: 10,
            last_reading: ReadingValues {
                temperature: 48.0,
                humidity: 12.0,
                pressure: 998.0,
                gas_oxidising: 3.0,
                gas_reducing: 2.0,
                gas_nh3: 1.0,
            },
            fire_detected: true,
            fire_confidence: 0.9,
            image: None,
        }
    }

    #[tokio::test]
    async fn test_save_writes_image_and_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::open(dir.path().join("alerts")).unwrap();

        let stored = store.save(&payload(), b"jpeg-bytes").await.unwrap();
        assert!(stored.file_name.starts_with("alert_"));
        assert!(stored.file_name.ends_with(".jpg"));
        assert_eq!(std::fs::read(&stored.image_path).unwrap(), b"jpeg-bytes");

        let meta: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&stored.meta_path).unwrap()).unwrap();
        assert_eq!(meta["image"], stored.file_name.as_str());
        assert_eq!(meta["sha256"], stored.sha256.as_str());
        assert_eq!(meta["abnormal_count"], 10);
        assert_eq!(meta["last_reading"]["temperature"], 48.0);
        assert!(meta.get("image_bytes").is_none());
    }

    #[tokio::test]
    async fn test_same_second_saves_never_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::open(dir.path()).unwrap();

        let a = store.save(&payload(), b"first").await.unwrap();
        let b = store.save(&payload(), b"second").await.unwrap();

        assert_ne!(a.file_name, b.file_name);
        assert_eq!(std::fs::read(&a.image_path).unwrap(), b"first");
        assert_eq!(std::fs::read(&b.image_path).unwrap(), b"second");
    }

    #[tokio::test]
    async fn test_failed_sidecar_removes_image() {
        let dir = tempfile::tempdir().unwrap();
        let image_path = dir.path().join("alert_x.jpg");
        let meta_path = dir.path().join("gone").join("alert_x.json");

        let result = ArtifactStore::write_pair(&image_path, b"jpeg", &meta_path, b"{}").await;

        assert!(matches!(result, Err(StorageError::Write { .. })));
        assert!(!image_path.exists());
    }

    #[tokio::test]
    async fn test_writable_tracks_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::open(dir.path().join("alerts")).unwrap();
        assert!(store.is_writable().await);

        std::fs::remove_dir(store.dir()).unwrap();
        assert!(!store.is_writable().await);
    }

    #[test]
    fn test_name_format() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::open(dir.path()).unwrap();
        let now = chrono::TimeZone::with_ymd_and_hms(&Utc, 2024, 7, 1, 13, 5, 9).unwrap();

        let name = store.next_name(now);
        assert!(name.starts_with("alert_20240701_130509_000001_"), "{}", name);
        assert_eq!(name.len(), "alert_20240701_130509_000001_0000abcd.jpg".len());
    }
}
