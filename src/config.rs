use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

pub const DEFAULT_API_URL: &str = "https://vercel-backend-main-production.up.railway.app";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub data_dir: PathBuf,
    pub timeout: Duration,
}

impl Config {
    /// Resolve settings from the command line override and the environment.
    pub fn load(api_url: Option<&str>) -> Result<Self> {
        let api_url = match api_url {
            Some(url) => url.to_string(),
            None => std::env::var("JOBWISE_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
        };

        let timeout = match std::env::var("JOBWISE_TIMEOUT_SECS") {
            Ok(raw) => raw
                .trim()
                .parse::<u64>()
                .with_context(|| format!("JOBWISE_TIMEOUT_SECS must be a number of seconds, got '{}'", raw))?,
            Err(_) => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            api_url: normalize_url(&api_url),
            data_dir: Self::default_data_dir(),
            timeout: Duration::from_secs(timeout),
        })
    }

    fn default_data_dir() -> PathBuf {
        if let Ok(dir) = std::env::var("JOBWISE_DATA_DIR") {
            return PathBuf::from(dir);
        }
        // Use XDG data directory or fallback
        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "jobwise") {
            proj_dirs.data_dir().to_path_buf()
        } else {
            PathBuf::from(".jobwise")
        }
    }
}

fn normalize_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}
