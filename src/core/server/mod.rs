pub mod command;
pub mod config;
pub mod supervisor;

use std::path::Path;

pub use command::{build_start_command, ServerCommand};
pub use config::{Difficulty, GameMode, LoaderKind, ServerConfig};
pub use supervisor::{ReadinessPolicy, ServerEvent, ServerStatus, ServerSupervisor};

use crate::core::error::HostResult;
use crate::core::fs;

/// A directory qualifies as a server directory when it holds at least
/// one jar artifact.
pub async fn validate_server_directory(dir: &Path) -> bool {
    match fs::list_files(dir).await {
        Ok(files) => files.iter().any(|file| file.ends_with(".jar")),
        Err(_) => false,
    }
}

/// Jar files in `dir` that look like server launch artifacts.
pub async fn detect_server_jars(dir: &Path) -> HostResult<Vec<String>> {
    let files = fs::list_files(dir).await?;
    Ok(files
        .into_iter()
        .filter(|file| {
            file.ends_with(".jar")
                && (file.contains("server") || file.contains("forge") || file.contains("fabric"))
        })
        .collect())
}
