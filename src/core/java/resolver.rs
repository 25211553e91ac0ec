// ─── Runtime Resolver ───
// Maps runtime identifiers to executable paths. Detection is
// best-effort across platform conventions and never fails the caller;
// installation is the fallback and is atomic in its success signal:
// either an executable is registered or nothing is.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use futures_util::StreamExt as _;
use tokio::io::AsyncWriteExt as _;
use tracing::{info, warn};

use crate::core::archive::extract_archive;
use crate::core::error::{HostError, HostResult};
use crate::core::http::build_http_client;
use crate::core::java::probe::probe_runtime;
use crate::core::java::RuntimeId;
use crate::core::paths::app_paths;

/// A resolved runtime: where its executable lives and what answered
/// the version probe.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RuntimeInstallation {
    pub id: RuntimeId,
    pub path: PathBuf,
    pub vendor: String,
    pub arch: String,
}

/// The seam the supervisor resolves runtimes through.
#[async_trait]
pub trait RuntimeProvider: Send + Sync {
    /// Return the executable path for `id`, installing it first when
    /// it is not yet available.
    async fn ensure(&self, id: RuntimeId) -> HostResult<PathBuf>;

    fn is_available(&self, id: RuntimeId) -> bool;

    /// Executable path for an already resolved runtime.
    fn path(&self, id: RuntimeId) -> HostResult<PathBuf>;
}

/// Registry of installed runtimes plus the managed installation
/// directory under the application data path.
pub struct RuntimeResolver {
    registry: Mutex<HashMap<RuntimeId, RuntimeInstallation>>,
    client: reqwest::Client,
    managed_dir: PathBuf,
    installs: AtomicU32,
}

impl RuntimeResolver {
    pub fn new(managed_dir: PathBuf) -> HostResult<Self> {
        Ok(Self {
            registry: Mutex::new(HashMap::new()),
            client: build_http_client()?,
            managed_dir,
            installs: AtomicU32::new(0),
        })
    }

    /// Resolver rooted at the application's managed Java directory.
    pub fn from_app_paths() -> HostResult<Self> {
        Self::new(app_paths()?.java_dir())
    }

    /// Probe well-known system locations and the managed directory,
    /// registering every candidate that answers the version probe.
    /// Individual candidate failures are logged and swallowed.
    pub async fn detect_installed(&self) {
        for candidate in well_known_paths() {
            self.probe_and_register(&candidate).await;
        }

        let managed = self.managed_dir.clone();
        let entries = match tokio::fs::read_dir(&managed).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("No managed runtime directory at {:?}: {}", managed, e);
                return;
            }
        };

        let mut entries = entries;
        while let Ok(Some(entry)) = entries.next_entry().await {
            let root = entry.path();
            if !root.is_dir() {
                continue;
            }
            if let Some(executable) = locate_executable(&root) {
                self.probe_and_register(&executable).await;
            }
        }
    }

    async fn probe_and_register(&self, candidate: &Path) {
        if !candidate.exists() {
            return;
        }

        let path = candidate.to_path_buf();
        let probed = tokio::task::spawn_blocking(move || probe_runtime(&path))
            .await
            .ok()
            .flatten();

        match probed {
            Some(probed) => {
                info!(
                    "Detected Java {} ({}) at {:?}",
                    probed.id, probed.vendor, candidate
                );
                self.register(RuntimeInstallation {
                    id: probed.id,
                    path: candidate.to_path_buf(),
                    vendor: probed.vendor,
                    arch: platform_arch().to_string(),
                });
            }
            None => warn!("Java candidate at {:?} did not answer the probe", candidate),
        }
    }

    pub fn register(&self, installation: RuntimeInstallation) {
        let mut registry = self.registry.lock().unwrap_or_else(|e| e.into_inner());
        registry.insert(installation.id, installation);
    }

    pub fn installed_ids(&self) -> Vec<RuntimeId> {
        let registry = self.registry.lock().unwrap_or_else(|e| e.into_inner());
        let mut ids: Vec<_> = registry.keys().copied().collect();
        ids.sort_by_key(|id| id.major());
        ids
    }

    pub fn installations(&self) -> Vec<RuntimeInstallation> {
        let registry = self.registry.lock().unwrap_or_else(|e| e.into_inner());
        let mut all: Vec<_> = registry.values().cloned().collect();
        all.sort_by_key(|inst| inst.id.major());
        all
    }

    async fn install(&self, id: RuntimeId) -> HostResult<PathBuf> {
        self.installs.fetch_add(1, Ordering::Relaxed);

        let install_dir = self.managed_dir.join(format!("java{}", id.major()));
        tokio::fs::create_dir_all(&install_dir)
            .await
            .map_err(|e| HostError::io(&install_dir, e))?;

        let url = download_url(id);
        let archive_path = install_dir.join(archive_name());

        info!("Installing Java {} from {}", id, url);
        if let Err(e) = self.download_archive(&url, &archive_path).await {
            let _ = tokio::fs::remove_file(&archive_path).await;
            return Err(HostError::InstallationFailed {
                id,
                reason: e.to_string(),
            });
        }

        let extract_src = archive_path.clone();
        let extract_dst = install_dir.clone();
        let extracted = tokio::task::spawn_blocking(move || {
            extract_archive(&extract_src, &extract_dst)
        })
        .await
        .map_err(|e| HostError::Other(format!("extraction task failed: {e}")))?;

        if let Err(e) = extracted {
            let _ = tokio::fs::remove_file(&archive_path).await;
            return Err(HostError::InstallationFailed {
                id,
                reason: e.to_string(),
            });
        }

        let _ = tokio::fs::remove_file(&archive_path).await;

        let Some(executable) = locate_executable(&install_dir) else {
            return Err(HostError::InstallationFailed {
                id,
                reason: format!("no executable found under {:?}", install_dir),
            });
        };

        make_executable(&executable)?;

        let installation = RuntimeInstallation {
            id,
            path: executable.clone(),
            vendor: "Temurin".to_string(),
            arch: platform_arch().to_string(),
        };
        info!("Installed Java {} at {:?}", id, executable);
        self.register(installation);

        Ok(executable)
    }

    async fn download_archive(&self, url: &str, dest: &Path) -> HostResult<()> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(HostError::DownloadFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| HostError::io(dest, e))?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk)
                .await
                .map_err(|e| HostError::io(dest, e))?;
        }
        file.flush().await.map_err(|e| HostError::io(dest, e))?;
        Ok(())
    }

    #[cfg(test)]
    fn install_count(&self) -> u32 {
        self.installs.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl RuntimeProvider for RuntimeResolver {
    async fn ensure(&self, id: RuntimeId) -> HostResult<PathBuf> {
        if let Ok(path) = self.path(id) {
            return Ok(path);
        }
        self.install(id).await
    }

    fn is_available(&self, id: RuntimeId) -> bool {
        let registry = self.registry.lock().unwrap_or_else(|e| e.into_inner());
        registry.contains_key(&id)
    }

    fn path(&self, id: RuntimeId) -> HostResult<PathBuf> {
        let registry = self.registry.lock().unwrap_or_else(|e| e.into_inner());
        registry
            .get(&id)
            .map(|inst| inst.path.clone())
            .ok_or(HostError::RuntimeNotInstalled(id))
    }
}

/// Relative locations a distribution may keep its executable in,
/// checked in order after extraction.
const EXECUTABLE_CANDIDATES: [&str; 4] = [
    "bin/java.exe",
    "bin/java",
    "jdk/bin/java.exe",
    "jdk/bin/java",
];

fn locate_executable(install_dir: &Path) -> Option<PathBuf> {
    EXECUTABLE_CANDIDATES
        .iter()
        .map(|relative| install_dir.join(relative))
        .find(|candidate| candidate.is_file())
}

#[cfg(unix)]
fn make_executable(path: &Path) -> HostResult<()> {
    use std::os::unix::fs::PermissionsExt as _;

    let mut perms = std::fs::metadata(path)
        .map_err(|e| HostError::io(path, e))?
        .permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(path, perms).map_err(|e| HostError::io(path, e))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> HostResult<()> {
    Ok(())
}

/// Fixed per-identifier Temurin release downloads for the current
/// platform and architecture.
fn download_url(id: RuntimeId) -> String {
    let major = id.major();
    let os = platform_os();
    let arch = platform_arch();
    let ext = if cfg!(windows) { "zip" } else { "tar.gz" };

    let (tag, file_version) = match id {
        RuntimeId::Java8 => ("jdk8u392-b08", "8u392b08".to_string()),
        RuntimeId::Java16 => ("jdk-16.0.2%2B7", "16.0.2_7".to_string()),
        RuntimeId::Java17 => ("jdk-17.0.9%2B9", "17.0.9_9".to_string()),
        RuntimeId::Java21 => ("jdk-21.0.1%2B12", "21.0.1_12".to_string()),
    };

    format!(
        "https://github.com/adoptium/temurin{major}-binaries/releases/download/{tag}/OpenJDK{major}U-jdk_{arch}_{os}_hotspot_{file_version}.{ext}"
    )
}

fn archive_name() -> &'static str {
    if cfg!(windows) {
        "runtime.zip"
    } else {
        "runtime.tar.gz"
    }
}

fn platform_os() -> &'static str {
    match std::env::consts::OS {
        "windows" => "windows",
        "macos" => "mac",
        _ => "linux",
    }
}

fn platform_arch() -> &'static str {
    match std::env::consts::ARCH {
        "aarch64" => "aarch64",
        _ => "x64",
    }
}

/// Well-known system installation paths, by platform convention.
#[cfg(windows)]
fn well_known_paths() -> Vec<PathBuf> {
    [
        r"C:\Program Files\Java\jdk-21\bin\java.exe",
        r"C:\Program Files\Java\jdk-17\bin\java.exe",
        r"C:\Program Files\Java\jdk-16\bin\java.exe",
        r"C:\Program Files\Java\jdk1.8.0_321\bin\java.exe",
        r"C:\Program Files (x86)\Java\jre1.8.0_321\bin\java.exe",
        r"C:\Program Files\Eclipse Adoptium\jdk-21.0.1.12-hotspot\bin\java.exe",
        r"C:\Program Files\Eclipse Adoptium\jdk-17.0.9.9-hotspot\bin\java.exe",
    ]
    .iter()
    .map(PathBuf::from)
    .collect()
}

#[cfg(not(windows))]
fn well_known_paths() -> Vec<PathBuf> {
    [
        "/usr/lib/jvm/java-21-openjdk/bin/java",
        "/usr/lib/jvm/java-17-openjdk/bin/java",
        "/usr/lib/jvm/java-16-openjdk/bin/java",
        "/usr/lib/jvm/java-8-openjdk/bin/java",
        "/System/Library/Java/JavaVirtualMachines/1.8.0.jdk/Contents/Home/bin/java",
        "/Library/Java/JavaVirtualMachines/adoptopenjdk-21.jdk/Contents/Home/bin/java",
    ]
    .iter()
    .map(PathBuf::from)
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn installation(id: RuntimeId, path: &str) -> RuntimeInstallation {
        RuntimeInstallation {
            id,
            path: PathBuf::from(path),
            vendor: "Temurin".to_string(),
            arch: platform_arch().to_string(),
        }
    }

    #[test]
    fn registry_tracks_installations() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = RuntimeResolver::new(dir.path().to_path_buf()).unwrap();

        assert!(!resolver.is_available(RuntimeId::Java21));
        assert!(matches!(
            resolver.path(RuntimeId::Java21),
            Err(HostError::RuntimeNotInstalled(RuntimeId::Java21))
        ));

        resolver.register(installation(RuntimeId::Java21, "/opt/java21/bin/java"));
        resolver.register(installation(RuntimeId::Java8, "/opt/java8/bin/java"));

        assert!(resolver.is_available(RuntimeId::Java21));
        assert_eq!(
            resolver.path(RuntimeId::Java21).unwrap(),
            PathBuf::from("/opt/java21/bin/java")
        );
        assert_eq!(
            resolver.installed_ids(),
            vec![RuntimeId::Java8, RuntimeId::Java21]
        );
    }

    #[tokio::test]
    async fn ensure_is_idempotent_for_resolved_runtimes() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = RuntimeResolver::new(dir.path().to_path_buf()).unwrap();
        resolver.register(installation(RuntimeId::Java17, "/opt/java17/bin/java"));

        let first = resolver.ensure(RuntimeId::Java17).await.unwrap();
        let second = resolver.ensure(RuntimeId::Java17).await.unwrap();

        assert_eq!(first, second);
        // No installation work for a runtime that is already resolved.
        assert_eq!(resolver.install_count(), 0);
    }

    #[test]
    fn locate_executable_walks_the_candidate_list() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(locate_executable(dir.path()), None);

        std::fs::create_dir_all(dir.path().join("jdk/bin")).unwrap();
        std::fs::write(dir.path().join("jdk/bin/java"), b"").unwrap();
        assert_eq!(
            locate_executable(dir.path()),
            Some(dir.path().join("jdk/bin/java"))
        );

        // A top-level bin/ wins over the nested jdk layout.
        std::fs::create_dir_all(dir.path().join("bin")).unwrap();
        std::fs::write(dir.path().join("bin/java"), b"").unwrap();
        assert_eq!(
            locate_executable(dir.path()),
            Some(dir.path().join("bin/java"))
        );
    }

    #[test]
    fn download_urls_are_fixed_per_identifier() {
        let url = download_url(RuntimeId::Java21);
        assert!(url.starts_with("https://github.com/adoptium/temurin21-binaries/"));
        assert!(url.contains("jdk-21.0.1%2B12"));
        let url8 = download_url(RuntimeId::Java8);
        assert!(url8.contains("temurin8-binaries"));
        assert!(url8.contains("8u392b08"));
    }

    #[cfg(unix)]
    #[test]
    fn locate_executable_prefers_windows_name_when_present() {
        // The candidate order is fixed; bin/java.exe is checked first
        // so extraction results are deterministic across platforms.
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("bin")).unwrap();
        std::fs::write(dir.path().join("bin/java.exe"), b"").unwrap();
        std::fs::write(dir.path().join("bin/java"), b"").unwrap();
        assert_eq!(
            locate_executable(dir.path()),
            Some(dir.path().join("bin/java.exe"))
        );
    }
}
