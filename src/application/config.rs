use std::path::{Path, PathBuf};

pub const DEFAULT_ASSET_URL: &str = "chrome-extension://calendar-chroma";

pub struct Config {
    pub data_dir: PathBuf,
    pub db_path: PathBuf,
    pub activity_log: PathBuf,
    pub asset_base_url: String,
}

impl Config {
    pub fn from_env() -> Self {
        let data_dir = std::env::var("CALENDAR_CHROMA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::data_local_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("calendar-chroma")
            });

        let asset_base_url = std::env::var("CALENDAR_CHROMA_ASSET_URL")
            .unwrap_or_else(|_| DEFAULT_ASSET_URL.to_string());

        Self::with_data_dir(data_dir, asset_base_url)
    }

    pub fn with_data_dir(data_dir: impl AsRef<Path>, asset_base_url: impl Into<String>) -> Self {
        let data_dir = data_dir.as_ref().to_path_buf();

        Self {
            db_path: data_dir.join("themes.db"),
            activity_log: data_dir.join("activity.log"),
            data_dir,
            asset_base_url: asset_base_url.into(),
        }
    }
}
