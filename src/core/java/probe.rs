// ─── Runtime version probe ───
// A candidate executable is trusted only after it answers `-version`
// with a parseable version string. Java prints the banner to stderr,
// so both streams are combined before parsing.

use std::path::Path;
use std::process::Command;

use tracing::debug;

use super::RuntimeId;

#[derive(Debug, Clone)]
pub struct ProbedRuntime {
    pub id: RuntimeId,
    pub vendor: String,
}

/// Execute `path -version` and parse the result. `None` means "not
/// detected" — a failing or unrecognized candidate is never an error.
pub fn probe_runtime(path: &Path) -> Option<ProbedRuntime> {
    let output = Command::new(path).arg("-version").output().ok()?;

    let combined = format!(
        "{}\n{}",
        String::from_utf8_lossy(&output.stderr),
        String::from_utf8_lossy(&output.stdout)
    );
    debug!(
        "Probing {:?}: {}",
        path,
        combined.lines().next().unwrap_or("")
    );

    let id = parse_version_output(&combined)?;
    Some(ProbedRuntime {
        id,
        vendor: parse_vendor(&combined),
    })
}

/// Parse a `version "<major>.<minor>..."` token into a known
/// identifier. Legacy runtimes report `1.8`; modern ones lead with the
/// major version.
pub fn parse_version_output(output: &str) -> Option<RuntimeId> {
    let start = output.find("version \"")? + "version \"".len();
    let rest = &output[start..];

    let mut parts = rest
        .split(|c: char| c == '"' || c == '.' || c == '_' || c == '-' || c == '+')
        .take(2);
    let major: u32 = parts.next()?.parse().ok()?;
    let minor: u32 = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);

    if major == 1 {
        if minor == 8 {
            return Some(RuntimeId::Java8);
        }
        return None;
    }

    RuntimeId::from_major(major)
}

fn parse_vendor(output: &str) -> String {
    for line in output.lines() {
        if line.contains("Temurin") {
            return "Temurin".to_string();
        }
        if line.contains("Adoptium") {
            return "Adoptium".to_string();
        }
        if line.contains("OpenJDK") {
            return "OpenJDK".to_string();
        }
    }
    "unknown".to_string()
}
