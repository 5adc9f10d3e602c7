//! Bootstrap helpers for Aria.
//!
//! Secrets and tuning are read from the process environment. Two dotenv
//! files feed it before configuration is resolved: `./.env` and
//! `~/.aria/.env`. dotenvy never overwrites existing vars, so the effective
//! priority is:
//!
//!   explicit env vars > `./.env` > `~/.aria/.env`

use std::path::{Path, PathBuf};

/// Aria's home directory: `~/.aria`.
pub fn aria_home_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".aria")
}

/// Path to the Aria-specific `.env` file: `~/.aria/.env`.
pub fn aria_env_path() -> PathBuf {
    aria_home_dir().join(".env")
}

/// Load `./.env` then `~/.aria/.env`.
pub fn load_env_files() {
    let _ = dotenvy::dotenv();
    load_env_from(&aria_env_path());
}

/// Load a dotenv file if it exists. Returns whether anything was loaded.
pub fn load_env_from(path: &Path) -> bool {
    if !path.exists() {
        return false;
    }
    match dotenvy::from_path(path) {
        Ok(()) => true,
        Err(e) => {
            eprintln!("Warning: failed to load {}: {}", path.display(), e);
            false
        }
    }
}

/// Render env vars in quoted dotenv form.
///
/// Values are double-quoted so `#` and other shell-special characters
/// survive a round trip through dotenvy.
pub fn render_env_file(vars: &[(&str, &str)]) -> String {
    let mut content = String::new();
    for (key, value) in vars {
        // Escape backslashes and quotes so a value cannot break out and
        // inject a second variable.
        let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
        content.push_str(&format!("{}=\"{}\"\n", key, escaped));
    }
    content
}

/// Write env vars to `path`, creating parent directories.
pub fn save_env_file(path: &Path, vars: &[(&str, &str)]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, render_env_file(vars))
}
