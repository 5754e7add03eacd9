use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::backend::DEFAULT_PX_BINARY;
use crate::error::{PxCurlError, Result};
use crate::query::{DEFAULT_MAX_ROWS, DEFAULT_START_TIME};

const CONFIG_DIR: &str = "pixie-to-curl";
const CONFIG_FILE: &str = "pixie-to-curl.toml";
const RC_FILE: &str = ".pixie-to-curlrc";

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub export: Option<ExportConfig>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ExportConfig {
    pub start_time: Option<String>,
    pub max_rows: Option<usize>,
    pub px_binary: Option<PathBuf>,
}

#[derive(Clone, Debug)]
pub struct ResolvedConfig {
    pub export: ResolvedExportConfig,
}

#[derive(Clone, Debug)]
pub struct ResolvedExportConfig {
    pub start_time: String,
    pub max_rows: usize,
    pub px_binary: PathBuf,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            export: ResolvedExportConfig::default(),
        }
    }
}

impl Default for ResolvedExportConfig {
    fn default() -> Self {
        Self {
            start_time: DEFAULT_START_TIME.to_string(),
            max_rows: DEFAULT_MAX_ROWS,
            px_binary: PathBuf::from(DEFAULT_PX_BINARY),
        }
    }
}

impl ResolvedConfig {
    pub fn from_config(config: &Config) -> Self {
        let mut resolved = Self::default();
        if let Some(cfg) = &config.export {
            resolved.export.apply(cfg);
        }
        resolved
    }
}

impl ResolvedExportConfig {
    fn apply(&mut self, cfg: &ExportConfig) {
        if let Some(value) = &cfg.start_time {
            self.start_time = value.clone();
        }
        if let Some(value) = cfg.max_rows {
            self.max_rows = value;
        }
        if let Some(value) = &cfg.px_binary {
            self.px_binary = value.clone();
        }
    }
}

/// Load and merge every config file on the search path. Later files win.
pub fn load_config() -> Result<Config> {
    load_config_from(&config_search_paths())
}

pub fn load_config_from(paths: &[PathBuf]) -> Result<Config> {
    let mut config = Config::default();
    for path in paths {
        if !path.exists() {
            continue;
        }
        let contents = fs::read_to_string(path).map_err(|err| {
            PxCurlError::Config(format!("Failed to read config {}: {}", path.display(), err))
        })?;
        let parsed: Config = toml::from_str(&contents).map_err(|err| {
            PxCurlError::Config(format!(
                "Failed to parse config {}: {}",
                path.display(),
                err
            ))
        })?;
        tracing::debug!(path = %path.display(), "loaded config");
        merge_config(&mut config, parsed);
    }
    Ok(config)
}

fn merge_config(base: &mut Config, other: Config) {
    merge_section(&mut base.export, other.export, ExportConfig::merge);
}

fn merge_section<T>(base: &mut Option<T>, other: Option<T>, merge: fn(&mut T, T)) {
    if let Some(other_section) = other {
        match base {
            Some(existing) => merge(existing, other_section),
            None => *base = Some(other_section),
        }
    }
}

impl ExportConfig {
    fn merge(&mut self, other: ExportConfig) {
        merge_opt(&mut self.start_time, other.start_time);
        merge_opt(&mut self.max_rows, other.max_rows);
        merge_opt(&mut self.px_binary, other.px_binary);
    }
}

fn merge_opt<T>(base: &mut Option<T>, other: Option<T>) {
    if other.is_some() {
        *base = other;
    }
}

fn config_search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Some(home) = home_dir() {
        paths.push(config_home_dir(&home).join(CONFIG_DIR).join(CONFIG_FILE));
        paths.push(home.join(RC_FILE));
    }

    if let Ok(cwd) = env::current_dir() {
        let mut dirs: Vec<&Path> = cwd.ancestors().collect();
        dirs.reverse();
        for dir in dirs {
            paths.push(dir.join(RC_FILE));
            paths.push(dir.join(CONFIG_FILE));
        }
    }

    paths
}

fn config_home_dir(home: &Path) -> PathBuf {
    env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| home.join(".config"))
}

fn home_dir() -> Option<PathBuf> {
    env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(|| env::var_os("USERPROFILE").map(PathBuf::from))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_without_files() {
        let resolved = ResolvedConfig::from_config(&Config::default());
        assert_eq!(resolved.export.start_time, "-5m");
        assert_eq!(resolved.export.max_rows, 2000);
        assert_eq!(resolved.export.px_binary, PathBuf::from("px"));
    }

    #[test]
    fn later_files_override_earlier_ones() {
        let tmp = TempDir::new().unwrap();
        let global = tmp.path().join("global.toml");
        let local = tmp.path().join("local.toml");
        fs::write(&global, "[export]\nstart_time = \"-1h\"\nmax_rows = 10\n").unwrap();
        fs::write(&local, "[export]\nmax_rows = 50\n").unwrap();

        let config =
            load_config_from(&[global, tmp.path().join("missing.toml"), local]).unwrap();
        let resolved = ResolvedConfig::from_config(&config);
        assert_eq!(resolved.export.start_time, "-1h");
        assert_eq!(resolved.export.max_rows, 50);
    }

    #[test]
    fn bad_toml_is_a_config_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bad.toml");
        fs::write(&path, "[export\nmax_rows = ").unwrap();
        let err = load_config_from(&[path]).unwrap_err();
        assert!(matches!(err, PxCurlError::Config(ref msg) if msg.contains("bad.toml")));
    }
}
