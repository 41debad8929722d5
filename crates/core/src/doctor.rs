use std::env;

use serde::{Deserialize, Serialize};
use sysinfo::Disks;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiskSummary {
    pub name: String,
    pub mount_point: String,
    pub total_space_bytes: u64,
    pub free_space_bytes: u64,
    pub file_system: Option<String>,
    pub is_removable: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorInfo {
    pub os: String,
    pub arch: String,
    pub current_dir: Option<String>,
    pub disks: Vec<DiskSummary>,
    pub notes: Vec<String>,
}

/// Environment triage for before a run is pointed at a drive: detected
/// disks (useful mirror-sink targets) plus operational notes.
pub fn collect_doctor_info() -> DoctorInfo {
    let current_dir = env::current_dir()
        .ok()
        .map(|path| path.to_string_lossy().to_string());

    let disks = enumerate_disks();
    let mut notes = vec![
        "organize moves files inside the target directory; point it at a folder you own."
            .to_string(),
        "remote sinks are best-effort; the local backup copy is the authoritative fallback."
            .to_string(),
    ];
    if disks.is_empty() {
        notes.push("no disks detected by sysinfo; mirror sink targets must be set manually.".to_string());
    }

    DoctorInfo {
        os: env::consts::OS.to_string(),
        arch: env::consts::ARCH.to_string(),
        current_dir,
        disks,
        notes,
    }
}

fn enumerate_disks() -> Vec<DiskSummary> {
    let disks = Disks::new_with_refreshed_list();
    disks
        .list()
        .iter()
        .map(|disk| DiskSummary {
            name: disk.name().to_string_lossy().to_string(),
            mount_point: disk.mount_point().to_string_lossy().to_string(),
            total_space_bytes: disk.total_space(),
            free_space_bytes: disk.available_space(),
            file_system: Some(disk.file_system().to_string_lossy().to_string()),
            is_removable: disk.is_removable(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::collect_doctor_info;

    #[test]
    fn doctor_reports_the_host_environment() {
        let info = collect_doctor_info();
        assert!(!info.os.is_empty());
        assert!(!info.arch.is_empty());
        assert!(!info.notes.is_empty());
    }
}
