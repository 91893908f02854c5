use std::env;
use std::path::PathBuf;

use anyhow::Context;

const DEFAULT_API_URL: &str = "http://localhost:8000";

#[derive(Debug, Clone)]
pub struct Settings {
    pub api_url: String,
    pub session_path: PathBuf,
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        let api_url = env::var("EDUPREDICT_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let session_path = match env::var_os("EDUPREDICT_SESSION_FILE") {
            Some(path) => PathBuf::from(path),
            None => default_session_path()?,
        };

        Ok(Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            session_path,
        })
    }
}

fn default_session_path() -> anyhow::Result<PathBuf> {
    let home = env::var_os("HOME")
        .context("HOME is not set; set EDUPREDICT_SESSION_FILE to a writable path")?;
    Ok(PathBuf::from(home).join(".edupredict").join("session.json"))
}
