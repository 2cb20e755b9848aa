// Settings for the shell history: size and file location.
use std::{fs, path::{Path, PathBuf}};

use directories::ProjectDirs;
use serde::Deserialize;
use tracing::warn;

pub const DEFAULT_HISTORY_SIZE: usize = 100;
/// Every slot is allocated up front, so the size is bounded.
pub const MAX_HISTORY_SIZE: usize = 100_000;
pub const DEFAULT_HISTORY_FILE_NAME: &str = "shell_history.json";
const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub shell_history_size: usize,
    pub history_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            shell_history_size: DEFAULT_HISTORY_SIZE,
            history_file: None,
        }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "shellhist", "shellhist")
}

/// Platform config directory, e.g. `~/.config/shellhist` on Linux.
pub fn config_dir() -> Option<PathBuf> {
    project_dirs().map(|p| p.config_dir().to_path_buf())
}

impl Config {
    /// Reads `config.json` from the config directory, then applies
    /// `SHELLHIST_*` environment overrides.
    pub fn load() -> Self {
        let mut config = config_dir()
            .map(|dir| Self::from_file(&dir.join(CONFIG_FILE_NAME)))
            .unwrap_or_default();
        config.apply_env(|key| std::env::var(key).ok());
        config.validated()
    }

    /// Missing file means defaults; a malformed one is logged and ignored.
    pub fn from_file(path: &Path) -> Self {
        let Ok(text) = fs::read_to_string(path) else {
            return Self::default();
        };
        match serde_json::from_str(&text) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring malformed config file");
                Self::default()
            }
        }
    }

    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(size) = var("SHELLHIST_HISTORY_SIZE") {
            match size.trim().parse::<usize>() {
                Ok(n) => self.shell_history_size = n,
                Err(_) => warn!(value = %size, "ignoring invalid SHELLHIST_HISTORY_SIZE"),
            }
        }
        if let Some(file) = var("SHELLHIST_HISTORY_FILE") {
            if !file.is_empty() {
                self.history_file = Some(PathBuf::from(file));
            }
        }
    }

    /// The history buffer needs a capacity between 1 and [`MAX_HISTORY_SIZE`].
    pub fn validated(mut self) -> Self {
        if self.shell_history_size == 0 {
            warn!(default = DEFAULT_HISTORY_SIZE, "shell_history_size must be positive, using default");
            self.shell_history_size = DEFAULT_HISTORY_SIZE;
        } else if self.shell_history_size > MAX_HISTORY_SIZE {
            warn!(
                requested = self.shell_history_size,
                max = MAX_HISTORY_SIZE,
                "shell_history_size too large, capping"
            );
            self.shell_history_size = MAX_HISTORY_SIZE;
        }
        self
    }

    /// The configured history file, or `shell_history.json` in the config
    /// directory (the working directory if there is no home directory).
    pub fn history_file(&self) -> PathBuf {
        if let Some(path) = &self.history_file {
            return path.clone();
        }
        config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(DEFAULT_HISTORY_FILE_NAME)
    }
}

/// Creates the directory that will hold `path`.
///
/// Failure is only logged: the history still works in memory, and the later
/// save reports its own error.
pub fn ensure_parent_dir(path: &Path) -> bool {
    let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return true;
    };
    match fs::create_dir_all(parent) {
        Ok(()) => true,
        Err(e) => {
            warn!(dir = %parent.display(), error = %e, "could not create history directory");
            false
        }
    }
}
