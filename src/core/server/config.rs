use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::content::ContentKind;
use crate::core::error::{HostError, HostResult};
use crate::core::java::RuntimeId;

/// Server platforms a directory can host — strongly typed, no magic
/// strings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LoaderKind {
    Vanilla,
    Forge,
    NeoForge,
    Fabric,
    Quilt,
    Bukkit,
    Spigot,
    Paper,
    Waterfall,
    BungeeCord,
    Mohist,
    Arclight,
    Bedrock,
}

impl LoaderKind {
    /// Which add-on directory servers of this kind read, when any.
    pub fn content_kind(self) -> Option<ContentKind> {
        match self {
            LoaderKind::Forge
            | LoaderKind::NeoForge
            | LoaderKind::Fabric
            | LoaderKind::Quilt
            | LoaderKind::Mohist
            | LoaderKind::Arclight => Some(ContentKind::Mod),
            LoaderKind::Bukkit
            | LoaderKind::Spigot
            | LoaderKind::Paper
            | LoaderKind::Waterfall
            | LoaderKind::BungeeCord => Some(ContentKind::Plugin),
            LoaderKind::Vanilla | LoaderKind::Bedrock => None,
        }
    }
}

impl std::fmt::Display for LoaderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LoaderKind::Vanilla => "vanilla",
            LoaderKind::Forge => "forge",
            LoaderKind::NeoForge => "neoforge",
            LoaderKind::Fabric => "fabric",
            LoaderKind::Quilt => "quilt",
            LoaderKind::Bukkit => "bukkit",
            LoaderKind::Spigot => "spigot",
            LoaderKind::Paper => "paper",
            LoaderKind::Waterfall => "waterfall",
            LoaderKind::BungeeCord => "bungeecord",
            LoaderKind::Mohist => "mohist",
            LoaderKind::Arclight => "arclight",
            LoaderKind::Bedrock => "bedrock",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Peaceful,
    Easy,
    Normal,
    Hard,
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Difficulty::Peaceful => "peaceful",
            Difficulty::Easy => "easy",
            Difficulty::Normal => "normal",
            Difficulty::Hard => "hard",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    Survival,
    Creative,
    Adventure,
    Spectator,
}

impl std::fmt::Display for GameMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            GameMode::Survival => "survival",
            GameMode::Creative => "creative",
            GameMode::Adventure => "adventure",
            GameMode::Spectator => "spectator",
        };
        write!(f, "{}", name)
    }
}

/// Everything needed to run one server instance. Immutable once the
/// supervisor accepts it; validated before any side effect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub server_dir: PathBuf,
    pub server_jar: String,
    pub loader: LoaderKind,
    pub game_version: String,
    pub runtime: RuntimeId,
    pub memory_gb: u32,
    pub cpu_cores: u32,
    pub port: u16,
    pub max_players: u32,
    pub difficulty: Difficulty,
    pub gamemode: GameMode,
    pub online_mode: bool,
    pub whitelist: bool,
    pub motd: String,
}

impl ServerConfig {
    pub fn validate(&self) -> HostResult<()> {
        if self.server_dir.as_os_str().is_empty() {
            return Err(HostError::InvalidConfiguration(
                "server directory is required".into(),
            ));
        }
        if self.server_jar.trim().is_empty() {
            return Err(HostError::InvalidConfiguration(
                "server jar name is required".into(),
            ));
        }
        if self.memory_gb == 0 {
            return Err(HostError::InvalidConfiguration(
                "memory allocation must be at least 1 GB".into(),
            ));
        }
        if self.cpu_cores == 0 {
            return Err(HostError::InvalidConfiguration(
                "at least one CPU core is required".into(),
            ));
        }
        if self.port == 0 {
            return Err(HostError::InvalidConfiguration(
                "a concrete server port is required".into(),
            ));
        }
        Ok(())
    }

    /// Default `server.properties` contents for this configuration,
    /// one `key=value` per line.
    pub fn default_properties(&self) -> String {
        format!(
            "server-port={}\n\
             gamemode={}\n\
             difficulty={}\n\
             spawn-protection=16\n\
             max-players={}\n\
             online-mode={}\n\
             white-list={}\n\
             motd={}\n",
            self.port,
            self.gamemode,
            self.difficulty,
            self.max_players,
            self.online_mode,
            self.whitelist,
            self.motd
        )
    }
}
