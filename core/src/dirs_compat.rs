use std::path::PathBuf;

const APP_DIR_NAME: &str = "InterviewRoom";

pub fn data_dir() -> Option<PathBuf> {
    if cfg!(target_os = "windows") {
        return non_empty_env("APPDATA").map(PathBuf::from);
    }

    if cfg!(target_os = "macos") {
        return non_empty_env("HOME")
            .map(|home| PathBuf::from(home).join("Library").join("Application Support"));
    }

    if let Some(data_dir) = non_empty_env("XDG_DATA_HOME") {
        return Some(PathBuf::from(data_dir));
    }

    non_empty_env("HOME").map(|home| PathBuf::from(home).join(".local").join("share"))
}

/// 应用私有数据目录，例如 `~/.local/share/InterviewRoom`。
pub fn app_data_dir() -> Option<PathBuf> {
    data_dir().map(|dir| dir.join(APP_DIR_NAME))
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}
