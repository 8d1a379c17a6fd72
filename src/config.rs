//! Saved defaults and runtime sync settings.
//!
//! Defaults live in flag files holding the same tokens the command line
//! accepts: a global file under the user's config directory and a local
//! `.pagelinkrc` override. Command-line flags win over both.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};

/// How long a sync highlight stays visible.
pub const DEFAULT_HIGHLIGHT: Duration = Duration::from_millis(2000);

/// How long a programmatic scroll may echo back before the guard lifts.
pub const DEFAULT_ECHO_WINDOW: Duration = Duration::from_millis(150);

pub const DEFAULT_VIEWPORT_HEIGHT: u32 = 800;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigFlags {
    pub zoom: Option<u32>,
    pub viewport_height: Option<u32>,
    pub sync_scroll: bool,
    pub highlight_ms: Option<u64>,
    pub echo_window_ms: Option<u64>,
    pub perf: bool,
}

impl ConfigFlags {
    pub fn union(&self, other: &Self) -> Self {
        Self {
            zoom: other.zoom.or(self.zoom),
            viewport_height: other.viewport_height.or(self.viewport_height),
            sync_scroll: self.sync_scroll || other.sync_scroll,
            highlight_ms: other.highlight_ms.or(self.highlight_ms),
            echo_window_ms: other.echo_window_ms.or(self.echo_window_ms),
            perf: self.perf || other.perf,
        }
    }

    /// Controller settings with unset flags filled from the defaults.
    pub fn sync_config(&self) -> SyncConfig {
        let defaults = SyncConfig::default();
        SyncConfig {
            zoom_level: self.zoom.unwrap_or(defaults.zoom_level),
            viewport_height: self
                .viewport_height
                .map_or(defaults.viewport_height, f64::from),
            sync_scroll: self.sync_scroll,
            highlight_duration: self
                .highlight_ms
                .map_or(defaults.highlight_duration, Duration::from_millis),
            echo_window: self
                .echo_window_ms
                .map_or(defaults.echo_window, Duration::from_millis),
        }
    }
}

/// Settings the sync controller starts a session with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyncConfig {
    /// Initial PDF zoom, in percent.
    pub zoom_level: u32,
    /// Initial PDF viewport height, in pixels.
    pub viewport_height: f64,
    pub sync_scroll: bool,
    pub highlight_duration: Duration,
    pub echo_window: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            zoom_level: crate::scale::REFERENCE_ZOOM,
            viewport_height: f64::from(DEFAULT_VIEWPORT_HEIGHT),
            sync_scroll: false,
            highlight_duration: DEFAULT_HIGHLIGHT,
            echo_window: DEFAULT_ECHO_WINDOW,
        }
    }
}

pub fn global_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata).join("pagelink").join("config");
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("pagelink")
                .join("config");
        }
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
            return PathBuf::from(xdg).join("pagelink").join("config");
        }
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home)
                .join(".config")
                .join("pagelink")
                .join("config");
        }
    }

    local_override_path()
}

pub fn local_override_path() -> PathBuf {
    PathBuf::from(".pagelinkrc")
}

pub fn load_config_flags(path: &Path) -> Result<ConfigFlags> {
    if !path.exists() {
        return Ok(ConfigFlags::default());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let tokens = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .flat_map(|line| line.split_whitespace().map(ToOwned::to_owned))
        .collect::<Vec<_>>();
    Ok(parse_flag_tokens(&tokens))
}

pub fn save_config_flags(path: &Path, flags: &ConfigFlags) -> Result<()> {
    let mut lines = vec!["# pagelink defaults (saved with --save)".to_string()];
    if let Some(zoom) = flags.zoom {
        lines.push(format!("--zoom {zoom}"));
    }
    if let Some(height) = flags.viewport_height {
        lines.push(format!("--viewport-height {height}"));
    }
    if flags.sync_scroll {
        lines.push("--sync-scroll".to_string());
    }
    if let Some(ms) = flags.highlight_ms {
        lines.push(format!("--highlight-ms {ms}"));
    }
    if let Some(ms) = flags.echo_window_ms {
        lines.push(format!("--echo-window-ms {ms}"));
    }
    if flags.perf {
        lines.push("--perf".to_string());
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config dir {}", parent.display()))?;
    }
    fs::write(path, format!("{}\n", lines.join("\n")))
        .with_context(|| format!("Failed to write config {}", path.display()))
}

pub fn clear_config_flags(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path).with_context(|| format!("Failed to remove {}", path.display()))?;
    }
    Ok(())
}

/// Pick recognised flags out of a token list, ignoring everything else.
///
/// Values may follow as the next token or after `=`. Values that do not
/// parse leave the flag unset.
pub fn parse_flag_tokens(tokens: &[String]) -> ConfigFlags {
    let mut flags = ConfigFlags::default();
    let mut i = 0;
    while i < tokens.len() {
        let token = tokens[i].as_str();
        let (name, inline_value) = match token.split_once('=') {
            Some((name, value)) => (name, Some(value)),
            None => (token, None),
        };
        let mut value = || {
            inline_value.map(ToOwned::to_owned).or_else(|| {
                let next = tokens.get(i + 1).cloned();
                if next.is_some() {
                    i += 1;
                }
                next
            })
        };
        match name {
            "--sync-scroll" => flags.sync_scroll = true,
            "--perf" => flags.perf = true,
            "--zoom" => flags.zoom = value().and_then(|v| v.parse().ok()),
            "--viewport-height" => flags.viewport_height = value().and_then(|v| v.parse().ok()),
            "--highlight-ms" => flags.highlight_ms = value().and_then(|v| v.parse().ok()),
            "--echo-window-ms" => flags.echo_window_ms = value().and_then(|v| v.parse().ok()),
            _ => {}
        }
        i += 1;
    }
    flags
}
