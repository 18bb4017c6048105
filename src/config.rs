//! # Configuration Module
//!
//! Data directory setup and engine tunables for vibenav.
//!
//! ## Data Storage
//!
//! vibenav keeps its feedback log and optional config file in the
//! platform-standard data directory:
//! - Linux: `~/.local/share/vibenav/`
//! - macOS: `~/Library/Application Support/vibenav/`
//! - Windows: `%APPDATA%\vibenav\`
//!
//! ## Tunables
//!
//! Every distance, interval and playlist size the engine uses lives in
//! [`EngineConfig`]. `config.json` may set any subset of fields; missing ones
//! keep their defaults.

use crate::geo::GeoProgressTracker;
use crate::playlist::PlaylistConfig;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Returns the vibenav data directory, creating it if needed.
///
/// # Errors
///
/// This function will return an error if:
/// - The system data directory cannot be determined
/// - The vibenav subdirectory cannot be created due to permissions
pub fn get_data_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_dir().ok_or_else(|| {
        anyhow::anyhow!(
            "Could not determine system data directory. Please ensure your platform supports standard data directories."
        )
    })?;

    let app_dir = data_dir.join("vibenav");
    fs::create_dir_all(&app_dir).with_context(|| {
        format!(
            "Failed to create vibenav data directory at {}. Please check file permissions.",
            app_dir.display()
        )
    })?;

    Ok(app_dir)
}

/// Returns the path of the feedback database, `feedback.db` in the data directory.
///
/// # Errors
///
/// Same as [`get_data_dir`].
///
/// # Examples
///
/// ```no_run
/// use vibenav::config::get_db_path;
///
/// let db_path = get_db_path()?;
/// println!("Feedback log: {}", db_path.display());
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn get_db_path() -> Result<PathBuf> {
    Ok(get_data_dir()?.join("feedback.db"))
}

/// Engine tunables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Distance under which a maneuver counts as reached
    pub proximity_threshold_m: f64,
    /// Time between demo waypoints
    pub demo_tick_ms: u64,
    /// Trip length assumed by the demo when sizing playlists
    pub demo_trip_seconds: u64,
    pub playlist: PlaylistConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            proximity_threshold_m: 20.0,
            demo_tick_ms: 10_000,
            demo_trip_seconds: 1200,
            playlist: PlaylistConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load from `path`, or from `config.json` in the data directory.
    ///
    /// An explicit path must exist. The default location is optional and
    /// falls back to [`EngineConfig::default`].
    ///
    /// # Errors
    ///
    /// Unreadable file, invalid JSON, or values that fail [`Self::validate`].
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = get_data_dir()?.join("config.json");
                match default_path.exists() {
                    true => Self::from_file(&default_path)?,
                    false => {
                        log::debug!("No config at {}, using defaults", default_path.display());
                        Self::default()
                    }
                }
            }
        };

        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config at {}", path.display()))?;
        let config = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid config JSON at {}", path.display()))?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Reject values the engine can't work with.
    ///
    /// # Errors
    ///
    /// Describes the first offending field.
    pub fn validate(&self) -> Result<()> {
        let p = &self.playlist;
        if !(self.proximity_threshold_m.is_finite() && self.proximity_threshold_m > 0.0) {
            bail!("proximity_threshold_m must be a positive number, got {}", self.proximity_threshold_m);
        }
        if self.demo_tick_ms == 0 {
            bail!("demo_tick_ms must be greater than zero");
        }
        if p.pool_cap == 0 {
            bail!("playlist.pool_cap must be greater than zero");
        }
        if p.min_length == 0 || p.min_length > p.max_length {
            bail!("playlist.min_length ({}) must be between 1 and max_length ({})", p.min_length, p.max_length);
        }
        if p.pad_floor > p.pad_target || p.pad_target > p.max_length {
            bail!(
                "playlist padding must satisfy pad_floor ({}) <= pad_target ({}) <= max_length ({})",
                p.pad_floor,
                p.pad_target,
                p.max_length
            );
        }
        if p.minutes_per_song == 0 {
            bail!("playlist.minutes_per_song must be greater than zero");
        }
        Ok(())
    }

    #[must_use]
    pub const fn tracker(&self) -> GeoProgressTracker {
        GeoProgressTracker::new(self.proximity_threshold_m)
    }

    #[must_use]
    pub const fn demo_tick(&self) -> Duration {
        Duration::from_millis(self.demo_tick_ms)
    }
}
