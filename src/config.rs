use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct WaypointConfig {
    /// Path of the SQLite database file
    pub database: Option<String>,
    /// `tracing` filter directive, e.g. `info` or `waypoint=debug`
    pub log_level: Option<String>,
}

impl WaypointConfig {
    /// Database path from the config, falling back to the default under `base`
    pub fn database_path(&self, base: &Path) -> PathBuf {
        self.database
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| default_database_path_in(base))
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("waypoint.toml")
}

pub fn default_database_path_in(base: &Path) -> PathBuf {
    base.join(".waypoint").join("waypoint.db")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<WaypointConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: WaypointConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &WaypointConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

pub fn ensure_db_dir(db_path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
