use anyhow::Result;

use crate::FileSystemBackend;

/// Creates a [`FileSystemBackend`] rooted in a fresh temporary directory, for
/// use in tests. The directory is removed when the returned guard drops.
pub async fn make_fs_backend() -> Result<(FileSystemBackend, tempfile::TempDir)> {
    let root = tempfile::tempdir()?;
    let backend = FileSystemBackend::new(root.path()).await?;
    Ok((backend, root))
}
