use std::{env, path::PathBuf};

use directories::ProjectDirs;
use tracing::warn;

use crate::Error;

fn project_dirs(app_name: &str) -> Option<ProjectDirs> {
    ProjectDirs::from("", "", app_name)
}

/// Directory that holds `config.toml`
pub fn config_dir_path(app_name: &str) -> Result<PathBuf, Error> {
    match project_dirs(app_name) {
        Some(dir) => Ok(dir.config_dir().to_path_buf()),
        None => {
            warn!("Failed to get the path to the project's config directory, using the current working directory");
            Ok(env::current_dir()?)
        }
    }
}

/// Directory that holds the SQLite database file
pub fn data_dir_path(app_name: &str) -> Result<PathBuf, Error> {
    match project_dirs(app_name) {
        Some(dir) => Ok(dir.data_local_dir().to_path_buf()),
        None => {
            warn!("Failed to get the path to the project's local data directory, using the current working directory");
            Ok(env::current_dir()?)
        }
    }
}
