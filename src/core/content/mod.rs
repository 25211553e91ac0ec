// ─── Content Installer ───
// Downloads add-on archives into the server's working directory and
// lists what is already there. A linear pipeline per item: resolve
// locator → ensure destination → fetch → atomic write. Catalog search
// is a read-only boundary mapping.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha1::{Digest as _, Sha1};
use tracing::{debug, info};

use crate::core::error::{HostError, HostResult};
use crate::core::fs;
use crate::core::http::build_http_client;

const MODRINTH_SEARCH_URL: &str = "https://api.modrinth.com/v2/search";
const CONTENT_EXTENSION: &str = ".jar";

/// Which add-on directory an item belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Mod,
    Plugin,
}

impl ContentKind {
    pub fn dir_name(self) -> &'static str {
        match self {
            ContentKind::Mod => "mods",
            ContentKind::Plugin => "plugins",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogSource {
    Modrinth,
    CurseForge,
    Local,
}

/// A catalog entry or installed file. Transient — nothing here mutates
/// the catalog side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: String,
    pub name: String,
    pub description: String,
    pub version: String,
    pub author: String,
    pub source: CatalogSource,
    pub size: u64,
    pub download_url: Option<String>,
    pub sha1: Option<String>,
}

pub struct ContentInstaller {
    client: reqwest::Client,
}

impl ContentInstaller {
    pub fn new() -> HostResult<Self> {
        Ok(Self {
            client: build_http_client()?,
        })
    }

    /// Download `item` into `<server_dir>/<mods|plugins>/<name>-<version>.jar`.
    ///
    /// Fails with `NoDownloadAvailable` before touching the filesystem
    /// when the item carries no locator; a failed transfer leaves no
    /// partial file behind.
    pub async fn install(
        &self,
        item: &ContentItem,
        kind: ContentKind,
        server_dir: &Path,
    ) -> HostResult<PathBuf> {
        let Some(url) = item.download_url.as_deref() else {
            return Err(HostError::NoDownloadAvailable(item.name.clone()));
        };

        let dest_dir = server_dir.join(kind.dir_name());
        fs::create_dir(&dest_dir, true).await?;
        let dest = dest_dir.join(format!("{}-{}{}", item.name, item.version, CONTENT_EXTENSION));

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(HostError::DownloadFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await?;
        if let Some(expected) = item.sha1.as_deref() {
            let mut hasher = Sha1::new();
            hasher.update(&bytes);
            let actual = hex::encode(hasher.finalize());
            if !actual.eq_ignore_ascii_case(expected) {
                return Err(HostError::Sha1Mismatch {
                    path: dest,
                    expected: expected.to_string(),
                    actual,
                });
            }
        }

        fs::write(&dest, &bytes, false).await?;
        info!("Installed {} {} -> {:?}", kind.dir_name(), item.name, dest);
        Ok(dest)
    }

    /// Items already present in the destination directory, with
    /// best-effort metadata derived from the filenames.
    pub async fn installed(
        &self,
        kind: ContentKind,
        server_dir: &Path,
    ) -> HostResult<Vec<ContentItem>> {
        let dir = server_dir.join(kind.dir_name());
        if !fs::exists(&dir).await {
            return Ok(Vec::new());
        }

        let mut items = Vec::new();
        for file in fs::list_files(&dir).await? {
            if !file.ends_with(CONTENT_EXTENSION) {
                continue;
            }
            let size = fs::file_size(&dir.join(&file)).await?;
            items.push(ContentItem {
                id: file.clone(),
                name: file.trim_end_matches(CONTENT_EXTENSION).to_string(),
                description: format!("Installed {}", kind.dir_name().trim_end_matches('s')),
                version: "unknown".to_string(),
                author: "unknown".to_string(),
                source: CatalogSource::Local,
                size,
                download_url: None,
                sha1: None,
            });
        }
        Ok(items)
    }

    /// Remove an installed file by name. Idempotent: removing an
    /// absent file is fine.
    pub async fn uninstall(
        &self,
        file_name: &str,
        kind: ContentKind,
        server_dir: &Path,
    ) -> HostResult<()> {
        let path = server_dir.join(kind.dir_name()).join(file_name);
        if fs::exists(&path).await {
            fs::remove_file(&path).await?;
            info!("Uninstalled {:?}", path);
        }
        Ok(())
    }

    /// Search the Modrinth catalog. Pure request/response mapping.
    pub async fn search_modrinth(
        &self,
        query: &str,
        game_version: Option<&str>,
    ) -> HostResult<Vec<ContentItem>> {
        let mut params = vec![
            ("query".to_string(), query.to_string()),
            ("limit".to_string(), "20".to_string()),
        ];
        if let Some(version) = game_version {
            params.push(("versions".to_string(), format!("[\"{}\"]", version)));
        }

        let response = self
            .client
            .get(MODRINTH_SEARCH_URL)
            .query(&params)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(HostError::DownloadFailed {
                url: MODRINTH_SEARCH_URL.to_string(),
                status: status.as_u16(),
            });
        }

        let results: ModrinthSearchResponse = response.json().await?;
        debug!("Modrinth search '{}': {} hits", query, results.hits.len());
        Ok(results.hits.into_iter().map(ModrinthHit::into_item).collect())
    }
}

#[derive(Debug, Deserialize)]
struct ModrinthSearchResponse {
    #[serde(default)]
    hits: Vec<ModrinthHit>,
}

#[derive(Debug, Deserialize)]
struct ModrinthHit {
    project_id: String,
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    latest_version: String,
    #[serde(default)]
    author: String,
    #[serde(default)]
    versions: Vec<String>,
}

impl ModrinthHit {
    fn into_item(self) -> ContentItem {
        ContentItem {
            id: self.project_id,
            name: self.title,
            description: self.description,
            version: self.latest_version,
            author: self.author,
            source: CatalogSource::Modrinth,
            size: 0,
            download_url: self.versions.into_iter().next(),
            sha1: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str, url: Option<&str>) -> ContentItem {
        ContentItem {
            id: name.to_string(),
            name: name.to_string(),
            description: String::new(),
            version: "1.0.0".to_string(),
            author: "someone".to_string(),
            source: CatalogSource::Modrinth,
            size: 0,
            download_url: url.map(str::to_string),
            sha1: None,
        }
    }

    #[tokio::test]
    async fn install_without_a_locator_fails_before_any_side_effect() {
        let dir = tempfile::tempdir().unwrap();
        let installer = ContentInstaller::new().unwrap();

        let result = installer
            .install(&item("worldedit", None), ContentKind::Plugin, dir.path())
            .await;

        assert!(matches!(result, Err(HostError::NoDownloadAvailable(_))));
        assert!(!dir.path().join("plugins").exists());
    }

    #[tokio::test]
    async fn installed_reports_jars_with_filename_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let mods = dir.path().join("mods");
        std::fs::create_dir_all(&mods).unwrap();
        std::fs::write(mods.join("sodium-0.5.8.jar"), b"123456").unwrap();
        std::fs::write(mods.join("notes.txt"), b"ignored").unwrap();

        let installer = ContentInstaller::new().unwrap();
        let items = installer.installed(ContentKind::Mod, dir.path()).await.unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "sodium-0.5.8");
        assert_eq!(items[0].version, "unknown");
        assert_eq!(items[0].size, 6);
        assert_eq!(items[0].source, CatalogSource::Local);
    }

    #[tokio::test]
    async fn installed_is_empty_when_the_directory_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let installer = ContentInstaller::new().unwrap();
        let items = installer
            .installed(ContentKind::Plugin, dir.path())
            .await
            .unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn uninstall_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let plugins = dir.path().join("plugins");
        std::fs::create_dir_all(&plugins).unwrap();
        std::fs::write(plugins.join("worldedit-7.2.15.jar"), b"").unwrap();

        let installer = ContentInstaller::new().unwrap();
        installer
            .uninstall("worldedit-7.2.15.jar", ContentKind::Plugin, dir.path())
            .await
            .unwrap();
        assert!(!plugins.join("worldedit-7.2.15.jar").exists());

        // Removing it again is not an error.
        installer
            .uninstall("worldedit-7.2.15.jar", ContentKind::Plugin, dir.path())
            .await
            .unwrap();
    }

    #[test]
    fn kinds_map_to_their_directories() {
        assert_eq!(ContentKind::Mod.dir_name(), "mods");
        assert_eq!(ContentKind::Plugin.dir_name(), "plugins");
    }

    #[test]
    fn modrinth_hits_map_to_content_items() {
        let payload = r#"{
            "hits": [{
                "project_id": "AANobbMI",
                "title": "Sodium",
                "description": "A modern rendering engine",
                "latest_version": "0.5.8",
                "author": "jellysquid3",
                "versions": ["https://cdn.modrinth.com/sodium-0.5.8.jar"]
            }]
        }"#;
        let parsed: ModrinthSearchResponse = serde_json::from_str(payload).unwrap();
        let items: Vec<_> = parsed.hits.into_iter().map(ModrinthHit::into_item).collect();

        assert_eq!(items[0].name, "Sodium");
        assert_eq!(items[0].source, CatalogSource::Modrinth);
        assert_eq!(
            items[0].download_url.as_deref(),
            Some("https://cdn.modrinth.com/sodium-0.5.8.jar")
        );
    }
}
