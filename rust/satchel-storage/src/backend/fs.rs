use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use base58::{FromBase58, ToBase58};
use tokio::sync::Mutex;

use super::DocumentBackend;
use crate::SatchelStorageError;

/// A [DocumentBackend] that keeps every value in its own file inside a root
/// directory, named after the base58-encoded key.
///
/// The edition of a value is the BLAKE3 hash of its bytes. Writes go to a
/// hidden temporary file that is then renamed into place, and a mutex shared
/// by all clones serialises the compare-and-swap window. Other processes
/// writing to the same directory are not coordinated with.
#[derive(Debug, Clone)]
pub struct FileSystemBackend {
    root_dir: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl FileSystemBackend {
    /// Creates a new [`FileSystemBackend`] that stores files in `root_dir`,
    /// creating the directory if needed.
    pub async fn new<Pathlike>(root_dir: Pathlike) -> Result<Self, SatchelStorageError>
    where
        Pathlike: AsRef<Path>,
    {
        let root_dir = root_dir.as_ref().to_owned();
        tokio::fs::create_dir_all(&root_dir)
            .await
            .map_err(backend_error)?;
        Ok(Self {
            root_dir,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    /// The directory holding the values
    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Where `key` lives, or `None` if its encoded name (with the staging
    /// prefix and suffix) would not fit in a file name. Such a key can
    /// never have been written.
    fn make_path(&self, key: &str) -> Option<PathBuf> {
        let name = key.as_bytes().to_base58();
        if name.len() + STAGING_OVERHEAD > MAX_FILE_NAME {
            return None;
        }
        Some(self.root_dir.join(name))
    }

    async fn read(&self, path: &Path) -> Result<Option<Vec<u8>>, SatchelStorageError> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(error) if is_absent(&error) => Ok(None),
            Err(error) => Err(backend_error(error)),
        }
    }
}

/// Longest file name most filesystems accept, in bytes.
const MAX_FILE_NAME: usize = 255;

/// `.` and `.tmp` around the staging copy of a value.
const STAGING_OVERHEAD: usize = 5;

fn is_absent(error: &std::io::Error) -> bool {
    matches!(
        error.kind(),
        ErrorKind::NotFound | ErrorKind::InvalidFilename
    )
}

fn edition_of(bytes: &[u8]) -> [u8; 32] {
    *blake3::hash(bytes).as_bytes()
}

fn backend_error(error: std::io::Error) -> SatchelStorageError {
    SatchelStorageError::StorageBackend(format!("{error}"))
}

#[async_trait]
impl DocumentBackend for FileSystemBackend {
    type Edition = [u8; 32];

    async fn resolve(
        &self,
        key: &str,
    ) -> Result<Option<(Vec<u8>, [u8; 32])>, SatchelStorageError> {
        let Some(path) = self.make_path(key) else {
            return Ok(None);
        };
        Ok(self.read(&path).await?.map(|bytes| {
            let edition = edition_of(&bytes);
            (bytes, edition)
        }))
    }

    async fn replace(
        &self,
        key: &str,
        edition: Option<&[u8; 32]>,
        content: Option<Vec<u8>>,
    ) -> Result<Option<[u8; 32]>, SatchelStorageError> {
        let Some(path) = self.make_path(key) else {
            return match (edition, content) {
                (Some(_), _) => Err(SatchelStorageError::Conflict(key.to_owned())),
                (None, Some(_)) => Err(SatchelStorageError::StorageBackend(format!(
                    "key of {} bytes is too long to store",
                    key.len()
                ))),
                (None, None) => Ok(None),
            };
        };
        let _guard = self.write_lock.lock().await;

        let current = self.read(&path).await?.map(|bytes| edition_of(&bytes));
        if current.as_ref() != edition {
            return Err(SatchelStorageError::Conflict(key.to_owned()));
        }

        match content {
            Some(bytes) => {
                let name = key.as_bytes().to_base58();
                let staging = self.root_dir.join(format!(".{name}.tmp"));
                tokio::fs::write(&staging, &bytes)
                    .await
                    .map_err(backend_error)?;
                tokio::fs::rename(&staging, &path)
                    .await
                    .map_err(backend_error)?;
                Ok(Some(edition_of(&bytes)))
            }
            None => {
                match tokio::fs::remove_file(&path).await {
                    Ok(()) => {}
                    Err(error) if is_absent(&error) => {}
                    Err(error) => return Err(backend_error(error)),
                }
                Ok(None)
            }
        }
    }

    async fn keys(&self, prefix: &str) -> Result<Vec<String>, SatchelStorageError> {
        let mut entries = tokio::fs::read_dir(&self.root_dir)
            .await
            .map_err(backend_error)?;
        let mut keys = Vec::new();

        while let Some(entry) = entries.next_entry().await.map_err(backend_error)? {
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            let Ok(bytes) = name.from_base58() else {
                tracing::warn!(file = name, "Skipping file with a non-base58 name");
                continue;
            };
            let Ok(key) = String::from_utf8(bytes) else {
                continue;
            };
            if key.starts_with(prefix) {
                keys.push(key);
            }
        }

        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::make_fs_backend;
    use anyhow::Result;

    #[tokio::test]
    async fn it_persists_values_across_instances() -> Result<()> {
        let (backend, root) = make_fs_backend().await?;
        backend.replace("shares/a", None, Some(b"hello".to_vec())).await?;

        let reopened = FileSystemBackend::new(root.path()).await?;
        let resolved = reopened.resolve("shares/a").await?;

        assert_eq!(resolved.map(|(bytes, _)| bytes), Some(b"hello".to_vec()));
        Ok(())
    }

    #[tokio::test]
    async fn it_uses_the_content_hash_as_edition() -> Result<()> {
        let (backend, _root) = make_fs_backend().await?;

        let edition = backend.replace("a", None, Some(vec![7, 7])).await?;

        assert_eq!(edition, Some(*blake3::hash(&[7, 7]).as_bytes()));
        Ok(())
    }

    #[tokio::test]
    async fn it_rejects_a_stale_edition() -> Result<()> {
        let (backend, _root) = make_fs_backend().await?;

        let first = backend.replace("a", None, Some(vec![1])).await?;
        backend.replace("a", first.as_ref(), Some(vec![2])).await?;
        let stale = backend.replace("a", first.as_ref(), Some(vec![3])).await;

        assert!(matches!(stale, Err(SatchelStorageError::Conflict(_))));
        Ok(())
    }

    #[tokio::test]
    async fn it_deletes_a_value() -> Result<()> {
        let (backend, _root) = make_fs_backend().await?;

        let edition = backend.replace("a", None, Some(vec![1])).await?;
        backend.replace("a", edition.as_ref(), None).await?;

        assert_eq!(backend.resolve("a").await?, None);
        assert!(backend.keys("").await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn it_lists_keys_by_prefix() -> Result<()> {
        let (backend, _root) = make_fs_backend().await?;

        for key in ["files/u/2", "shares/x", "files/u/1"] {
            backend.replace(key, None, Some(vec![0])).await?;
        }

        assert_eq!(backend.keys("files/").await?, vec!["files/u/1", "files/u/2"]);
        Ok(())
    }

    #[tokio::test]
    async fn it_treats_keys_too_long_for_a_file_name_as_absent() -> Result<()> {
        let (backend, _root) = make_fs_backend().await?;
        let key = format!("shares/{}", "x".repeat(200));

        assert_eq!(backend.resolve(&key).await?, None);
        assert_eq!(backend.replace(&key, None, None).await?, None);
        assert!(matches!(
            backend.replace(&key, Some(&[0; 32]), None).await,
            Err(SatchelStorageError::Conflict(_))
        ));
        assert!(matches!(
            backend.replace(&key, None, Some(vec![1])).await,
            Err(SatchelStorageError::StorageBackend(_))
        ));
        assert!(backend.keys("shares/").await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn it_stores_keys_up_to_the_file_name_limit() -> Result<()> {
        let (backend, _root) = make_fs_backend().await?;
        // 180 bytes encode to at most 246 base58 characters
        let key = "k".repeat(180);

        backend.replace(&key, None, Some(vec![1])).await?;

        assert_eq!(backend.resolve(&key).await?.map(|(bytes, _)| bytes), Some(vec![1]));
        Ok(())
    }
}
