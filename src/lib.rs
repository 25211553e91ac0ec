pub mod core;

use tracing_subscriber::EnvFilter;

pub use crate::core::content::{CatalogSource, ContentInstaller, ContentItem, ContentKind};
pub use crate::core::error::{HostError, HostResult};
pub use crate::core::java::{RuntimeId, RuntimeInstallation, RuntimeProvider, RuntimeResolver};
pub use crate::core::process::{ProcessEvent, ProcessGateway, ProcessSpawner, ProcessStatus};
pub use crate::core::server::{
    Difficulty, GameMode, LoaderKind, ReadinessPolicy, ServerConfig, ServerEvent, ServerStatus,
    ServerSupervisor,
};

/// Initialize structured logging for an embedding application.
///
/// Call once at startup; the filter can be overridden through `RUST_LOG`.
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,minehost=debug")),
        )
        .init();

    tracing::info!("MineHost core starting...");
}
