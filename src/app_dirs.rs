use directories::ProjectDirs;
use std::path::PathBuf;

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    fn project() -> Option<ProjectDirs> {
        ProjectDirs::from("", "", "tread")
    }

    /// Mutable state lives under $HOME/.local/state/tread when HOME is set.
    fn state_dir() -> PathBuf {
        if let Ok(home) = std::env::var("HOME") {
            PathBuf::from(home)
                .join(".local")
                .join("state")
                .join("tread")
        } else if let Some(pd) = Self::project() {
            pd.data_local_dir().to_path_buf()
        } else {
            PathBuf::from(".")
        }
    }

    pub fn config_path() -> PathBuf {
        Self::project()
            .map(|pd| pd.config_dir().join("config.json"))
            .unwrap_or_else(|| PathBuf::from("tread_config.json"))
    }

    pub fn workouts_path() -> PathBuf {
        Self::state_dir().join("workouts.json")
    }

    pub fn log_path() -> PathBuf {
        Self::state_dir().join("tread.log")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_files_share_a_directory() {
        let workouts = AppDirs::workouts_path();
        let log = AppDirs::log_path();
        assert_eq!(workouts.parent(), log.parent());
        assert_eq!(workouts.file_name().unwrap(), "workouts.json");
        assert_eq!(log.file_name().unwrap(), "tread.log");
    }

    #[test]
    fn config_is_json() {
        assert_eq!(AppDirs::config_path().extension().unwrap(), "json");
    }
}
