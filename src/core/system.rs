// ─── Host resource snapshot ───
// Read-only view of what the machine has to offer, used by the
// presentation layer to bound memory/core sliders.

use serde::Serialize;
use sysinfo::{Disks, System};

#[derive(Debug, Clone, Serialize)]
pub struct SystemResources {
    pub cpu_usage_percent: f32,
    pub cpu_cores: usize,
    pub memory_total_bytes: u64,
    pub memory_used_bytes: u64,
    pub memory_available_bytes: u64,
    pub disk_total_bytes: u64,
    pub disk_available_bytes: u64,
}

pub fn snapshot() -> SystemResources {
    let mut system = System::new_all();
    system.refresh_all();

    let disks = Disks::new_with_refreshed_list();
    let (disk_total_bytes, disk_available_bytes) = disks
        .list()
        .iter()
        .fold((0, 0), |(total, available), disk| {
            (
                total + disk.total_space(),
                available + disk.available_space(),
            )
        });

    SystemResources {
        cpu_usage_percent: system.global_cpu_usage(),
        cpu_cores: system.cpus().len(),
        memory_total_bytes: system.total_memory(),
        memory_used_bytes: system.used_memory(),
        memory_available_bytes: system.available_memory(),
        disk_total_bytes,
        disk_available_bytes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reports_real_hardware() {
        let resources = snapshot();
        assert!(resources.cpu_cores > 0);
        assert!(resources.memory_total_bytes > 0);
        assert!(resources.memory_used_bytes <= resources.memory_total_bytes);
    }
}
