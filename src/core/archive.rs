// ─── Archive extraction boundary ───
// Runtime distributions arrive as .zip (Windows) or .tar.gz (unix).
// Both carry a single top-level directory which is stripped so the
// extracted tree starts at bin/, jdk/, etc.

use std::path::{Component, Path, PathBuf};

use crate::core::error::{HostError, HostResult};

/// Extract `archive_path` into `dest_dir`, dispatching on the archive
/// extension. Fails for formats this backend does not handle.
pub fn extract_archive(archive_path: &Path, dest_dir: &Path) -> HostResult<()> {
    let name = archive_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    if name.ends_with(".zip") {
        extract_zip(archive_path, dest_dir)
    } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
        extract_tar_gz(archive_path, dest_dir)
    } else {
        Err(HostError::Other(format!(
            "unsupported archive format: {}",
            name
        )))
    }
}

fn extract_zip(zip_path: &Path, dest_dir: &Path) -> HostResult<()> {
    let zip_file = std::fs::File::open(zip_path).map_err(|e| HostError::io(zip_path, e))?;
    let mut archive = zip::ZipArchive::new(zip_file)?;

    std::fs::create_dir_all(dest_dir).map_err(|e| HostError::io(dest_dir, e))?;

    for index in 0..archive.len() {
        let mut zipped = archive.by_index(index)?;

        let enclosed_name = zipped
            .enclosed_name()
            .ok_or_else(|| HostError::Other("invalid zip entry path".into()))?;
        let Some(rel_path) = strip_top_dir(&enclosed_name) else {
            continue;
        };

        let out_path = dest_dir.join(rel_path);
        if zipped.name().ends_with('/') {
            std::fs::create_dir_all(&out_path).map_err(|e| HostError::io(&out_path, e))?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| HostError::io(parent, e))?;
        }

        let mut out = std::fs::File::create(&out_path).map_err(|e| HostError::io(&out_path, e))?;
        std::io::copy(&mut zipped, &mut out).map_err(|e| HostError::io(&out_path, e))?;
    }

    Ok(())
}

fn extract_tar_gz(tar_path: &Path, dest_dir: &Path) -> HostResult<()> {
    let file = std::fs::File::open(tar_path).map_err(|e| HostError::io(tar_path, e))?;
    let decoder = flate2::read::GzDecoder::new(file);
    let mut archive = tar::Archive::new(decoder);

    std::fs::create_dir_all(dest_dir).map_err(|e| HostError::io(dest_dir, e))?;

    for entry in archive.entries().map_err(|e| HostError::io(tar_path, e))? {
        let mut entry = entry.map_err(|e| HostError::io(tar_path, e))?;
        let entry_path = entry
            .path()
            .map_err(|e| HostError::io(tar_path, e))?
            .into_owned();

        // Reject absolute or parent-escaping entries before stripping.
        if entry_path.components().any(|c| {
            matches!(
                c,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        }) {
            return Err(HostError::Other(format!(
                "unsafe tar entry path: {:?}",
                entry_path
            )));
        }

        let Some(rel_path) = strip_top_dir(&entry_path) else {
            continue;
        };

        let out_path = dest_dir.join(rel_path);
        if entry.header().entry_type().is_dir() {
            std::fs::create_dir_all(&out_path).map_err(|e| HostError::io(&out_path, e))?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| HostError::io(parent, e))?;
        }

        // unpack preserves the entry's unix mode (executables stay executable)
        entry
            .unpack(&out_path)
            .map_err(|e| HostError::io(&out_path, e))?;
    }

    Ok(())
}

/// Drop the archive's single top-level directory from an entry path.
/// Returns `None` when nothing remains (the top-level dir entry itself).
fn strip_top_dir(entry_path: &Path) -> Option<PathBuf> {
    let mut normals = entry_path.components().filter_map(|c| match c {
        Component::Normal(part) => Some(part),
        _ => None,
    });
    let _ = normals.next();

    let rel_path: PathBuf = normals.collect();
    if rel_path.as_os_str().is_empty() {
        None
    } else {
        Some(rel_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn strips_the_top_level_directory() {
        assert_eq!(
            strip_top_dir(Path::new("jdk-21.0.1+12/bin/java")),
            Some(PathBuf::from("bin/java"))
        );
        assert_eq!(strip_top_dir(Path::new("jdk-21.0.1+12/")), None);
        // Leading ./ is common in GNU tars and must not count as the
        // top-level directory.
        assert_eq!(
            strip_top_dir(Path::new("./jdk-21.0.1+12/bin/java")),
            Some(PathBuf::from("bin/java"))
        );
    }

    #[test]
    fn rejects_unknown_formats() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("runtime.rar");
        std::fs::write(&archive, b"not an archive").unwrap();

        assert!(extract_archive(&archive, dir.path()).is_err());
    }

    #[test]
    fn zip_roundtrip_lands_entries_below_the_top_dir() {
        let dir = tempfile::tempdir().unwrap();
        let archive_path = dir.path().join("runtime.zip");

        let file = std::fs::File::create(&archive_path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default();
        writer.add_directory("jdk-21/bin/", options).unwrap();
        writer.start_file("jdk-21/bin/java", options).unwrap();
        writer.write_all(b"#!/bin/true").unwrap();
        writer.finish().unwrap();

        let dest = dir.path().join("out");
        extract_archive(&archive_path, &dest).unwrap();

        assert!(dest.join("bin/java").is_file());
    }

    #[test]
    fn tar_gz_roundtrip_lands_entries_below_the_top_dir() {
        let dir = tempfile::tempdir().unwrap();
        let archive_path = dir.path().join("runtime.tar.gz");

        let file = std::fs::File::create(&archive_path).unwrap();
        let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
        let mut builder = tar::Builder::new(encoder);
        let payload = b"#!/bin/true";
        let mut header = tar::Header::new_gnu();
        header.set_size(payload.len() as u64);
        header.set_mode(0o755);
        header.set_cksum();
        builder
            .append_data(&mut header, "jdk-21/bin/java", payload.as_slice())
            .unwrap();
        builder.into_inner().unwrap().finish().unwrap();

        let dest = dir.path().join("out");
        extract_archive(&archive_path, &dest).unwrap();

        assert!(dest.join("bin/java").is_file());
    }
}
