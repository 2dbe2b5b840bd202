use std::path::PathBuf;

pub const HACKATHONS_URL: &str = "https://dash.hackathons.hackclub.com/api/v1/hackathons";
pub const HACKATIME_URL: &str = "https://hackatime.hackclub.com/api/v1/users";
pub const PROGRAMS_URL: &str = "https://ysws.hackclub.com/feed.xml";

/// Where each data source lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub hackathons: String,
    /// Base of the per-user stats path: `{hackatime}/{id}/stats`.
    pub hackatime: String,
    pub programs: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            hackathons: HACKATHONS_URL.to_string(),
            hackatime: HACKATIME_URL.to_string(),
            programs: PROGRAMS_URL.to_string(),
        }
    }
}

impl Endpoints {
    /// Defaults, overridden by `HACKDECK_*_URL` variables when set.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            hackathons: env_or("HACKDECK_HACKATHONS_URL", defaults.hackathons),
            hackatime: env_or("HACKDECK_HACKATIME_URL", defaults.hackatime),
            programs: env_or("HACKDECK_PROGRAMS_URL", defaults.programs),
        }
    }

    /// All three sources under one base URL, e.g. a local test server.
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            hackathons: format!("{base}/api/v1/hackathons"),
            hackatime: format!("{base}/api/v1/users"),
            programs: format!("{base}/feed.xml"),
        }
    }

    pub fn stats_url(&self, user_id: &str) -> String {
        format!("{}/{}/stats", self.hackatime.trim_end_matches('/'), user_id)
    }
}

fn env_or(key: &str, default: String) -> String {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or(default)
}

/// Directory holding local state.
/// `HACKDECK_DATA_DIR` wins, then `$XDG_DATA_HOME/hackdeck`, then
/// `~/.local/share/hackdeck`.
pub fn data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("HACKDECK_DATA_DIR") {
        return PathBuf::from(shellexpand::tilde(&dir).to_string());
    }
    if let Ok(xdg_data) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(xdg_data).join("hackdeck");
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".local/share/hackdeck")
}
