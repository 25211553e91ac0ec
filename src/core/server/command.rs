// ─── Launch command construction ───
// The exact argument order is part of the external contract: runtime
// executable, heap bounds, GC selection, GC parallelism, encoding,
// -jar, artifact, nogui.

use std::path::{Path, PathBuf};

use super::config::ServerConfig;

/// The minimum heap never reserves more than this, regardless of the
/// configured allocation.
const MIN_HEAP_CAP_GB: u32 = 2;

/// A fully built launch invocation: the program plus its arguments,
/// ready for the process gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl ServerCommand {
    /// Single-string form with the executable and jar name quoted,
    /// space-joined in argument order.
    pub fn to_command_line(&self) -> String {
        let mut parts = vec![format!("\"{}\"", self.program.display())];
        let mut quote_next = false;
        for arg in &self.args {
            if quote_next {
                parts.push(format!("\"{}\"", arg));
            } else {
                parts.push(arg.clone());
            }
            quote_next = arg == "-jar";
        }
        parts.join(" ")
    }
}

/// Build the launch command for `config` using the resolved runtime
/// executable.
pub fn build_start_command(java_bin: &Path, config: &ServerConfig) -> ServerCommand {
    let min_heap = config.memory_gb.min(MIN_HEAP_CAP_GB);

    ServerCommand {
        program: java_bin.to_path_buf(),
        args: vec![
            format!("-Xmx{}G", config.memory_gb),
            format!("-Xms{}G", min_heap),
            "-XX:+UseG1GC".to_string(),
            format!("-XX:ParallelGCThreads={}", config.cpu_cores),
            "-Dfile.encoding=UTF-8".to_string(),
            "-jar".to_string(),
            config.server_jar.clone(),
            "nogui".to_string(),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::java::RuntimeId;
    use crate::core::server::config::{Difficulty, GameMode, LoaderKind};

    fn config(memory_gb: u32, cpu_cores: u32) -> ServerConfig {
        ServerConfig {
            server_dir: PathBuf::from("/srv"),
            server_jar: "server.jar".to_string(),
            loader: LoaderKind::Vanilla,
            game_version: "1.21.4".to_string(),
            runtime: RuntimeId::Java21,
            memory_gb,
            cpu_cores,
            port: 25565,
            max_players: 20,
            difficulty: Difficulty::Normal,
            gamemode: GameMode::Survival,
            online_mode: true,
            whitelist: false,
            motd: "A Minecraft Server".to_string(),
        }
    }

    #[test]
    fn command_line_matches_the_contract_exactly() {
        let command = build_start_command(Path::new("/opt/java21/bin/java"), &config(4, 4));
        assert_eq!(
            command.to_command_line(),
            "\"/opt/java21/bin/java\" -Xmx4G -Xms2G -XX:+UseG1GC \
             -XX:ParallelGCThreads=4 -Dfile.encoding=UTF-8 -jar \"server.jar\" nogui"
        );
    }

    #[test]
    fn min_heap_never_exceeds_the_allocation() {
        let command = build_start_command(Path::new("/usr/bin/java"), &config(1, 2));
        assert!(command.args.contains(&"-Xmx1G".to_string()));
        assert!(command.args.contains(&"-Xms1G".to_string()));
    }

    #[test]
    fn min_heap_is_capped_for_large_allocations() {
        let command = build_start_command(Path::new("/usr/bin/java"), &config(16, 8));
        assert!(command.args.contains(&"-Xmx16G".to_string()));
        assert!(command.args.contains(&"-Xms2G".to_string()));
        assert!(command.args.contains(&"-XX:ParallelGCThreads=8".to_string()));
    }
}
