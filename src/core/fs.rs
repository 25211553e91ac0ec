// ─── Filesystem Gateway ───
// The storage primitive everything else builds on. Every failure is
// wrapped with the path the operation was touching; writes are staged
// to a temp name and renamed so a failed write never leaves a
// truncated file behind.

use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::core::error::{HostError, HostResult};

pub async fn exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

/// Names of regular files directly under `path`, sorted.
pub async fn list_files(path: &Path) -> HostResult<Vec<String>> {
    list_entries(path, false).await
}

/// Names of directories directly under `path`, sorted.
pub async fn list_directories(path: &Path) -> HostResult<Vec<String>> {
    list_entries(path, true).await
}

async fn list_entries(path: &Path, directories: bool) -> HostResult<Vec<String>> {
    let mut entries = tokio::fs::read_dir(path)
        .await
        .map_err(|e| HostError::io(path, e))?;

    let mut names = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| HostError::io(path, e))?
    {
        let file_type = entry
            .file_type()
            .await
            .map_err(|e| HostError::io(entry.path(), e))?;
        if file_type.is_dir() == directories {
            names.push(entry.file_name().to_string_lossy().to_string());
        }
    }

    names.sort();
    Ok(names)
}

pub async fn read(path: &Path) -> HostResult<Vec<u8>> {
    tokio::fs::read(path).await.map_err(|e| HostError::io(path, e))
}

pub async fn read_to_string(path: &Path) -> HostResult<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| HostError::io(path, e))
}

/// Write `contents` to `path` atomically.
///
/// The bytes land in a staging file next to the destination and are
/// renamed into place, so the destination is either untouched or fully
/// written. Parent directories are created only when `create_parents`
/// is set.
pub async fn write(path: &Path, contents: &[u8], create_parents: bool) -> HostResult<()> {
    if create_parents {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| HostError::io(parent, e))?;
        }
    }

    let staging = staging_path(path);
    tokio::fs::write(&staging, contents)
        .await
        .map_err(|e| HostError::io(&staging, e))?;

    if let Err(source) = tokio::fs::rename(&staging, path).await {
        let _ = tokio::fs::remove_file(&staging).await;
        return Err(HostError::io(path, source));
    }

    Ok(())
}

pub async fn create_dir(path: &Path, recursive: bool) -> HostResult<()> {
    let result = if recursive {
        tokio::fs::create_dir_all(path).await
    } else {
        tokio::fs::create_dir(path).await
    };
    result.map_err(|e| HostError::io(path, e))
}

pub async fn remove_file(path: &Path) -> HostResult<()> {
    tokio::fs::remove_file(path)
        .await
        .map_err(|e| HostError::io(path, e))
}

pub async fn copy(src: &Path, dst: &Path) -> HostResult<()> {
    tokio::fs::copy(src, dst)
        .await
        .map(|_| ())
        .map_err(|e| HostError::io(src, e))
}

pub async fn file_size(path: &Path) -> HostResult<u64> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|e| HostError::io(path, e))?;
    Ok(metadata.len())
}

fn staging_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.{}.tmp", name, Uuid::new_v4()))
}
