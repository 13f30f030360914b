//! Path helpers for settings and snapshot storage

use std::path::PathBuf;

/// Get the path to the settings file
pub fn settings_file_path() -> PathBuf {
    use directories::ProjectDirs;

    if let Some(proj_dirs) = ProjectDirs::from("com", "nbflow", "nbflow") {
        proj_dirs.config_dir().join("settings.yaml")
    } else {
        PathBuf::from(".nbflow-settings.yaml")
    }
}

/// Get the path to the snapshot database
pub fn default_db_path() -> PathBuf {
    use directories::ProjectDirs;

    if let Some(proj_dirs) = ProjectDirs::from("com", "nbflow", "nbflow") {
        proj_dirs.data_dir().join("snapshots.db")
    } else {
        PathBuf::from(".nbflow-snapshots.db")
    }
}
