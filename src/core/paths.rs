use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::core::error::{HostError, HostResult};

const APP_DIR_NAME: &str = "MineHost";

/// Directories the backend owns on the host machine.
#[derive(Debug, Clone)]
pub struct AppPaths {
    app_data_dir: PathBuf,
    temp_dir: PathBuf,
}

impl AppPaths {
    pub fn app_data_dir(&self) -> &Path {
        &self.app_data_dir
    }

    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    /// Root of the managed Java runtime installations.
    pub fn java_dir(&self) -> PathBuf {
        self.app_data_dir.join("java")
    }
}

static APP_PATHS: OnceLock<AppPaths> = OnceLock::new();

pub fn app_paths() -> HostResult<&'static AppPaths> {
    if let Some(paths) = APP_PATHS.get() {
        return Ok(paths);
    }

    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME);
    let temp_dir = std::env::temp_dir().join(APP_DIR_NAME);

    let paths = AppPaths {
        app_data_dir: canonical_or_create_dir(&data_dir)?,
        temp_dir: canonical_or_create_dir(&temp_dir)?,
    };

    let _ = APP_PATHS.set(paths);
    Ok(APP_PATHS.get().expect("app paths set"))
}

fn canonical_or_create_dir(path: &Path) -> HostResult<PathBuf> {
    std::fs::create_dir_all(path).map_err(|source| HostError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf()))
}
