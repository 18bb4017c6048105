//! Candidate tracks and the fallback sample library.
//!
//! Tracks are supplied by the catalog (the listener's library) and are never
//! mutated by the engine; they are only filtered and selected.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Per-track audio analysis, each value in `0.0..=1.0` except `tempo` (BPM)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AudioFeatures {
    pub valence: f64,
    pub energy: f64,
    pub danceability: f64,
    pub tempo: f64,
    pub acousticness: f64,
    pub instrumentalness: f64,
}

/// Where a candidate came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackSource {
    /// Liked / saved songs
    Saved,
    /// Listener's top tracks
    Top,
    /// Pulled from one of the listener's playlists
    Playlist,
    /// Built-in sample library
    #[default]
    Sample,
}

/// A track the recommender may choose
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackCandidate {
    pub id: String,
    pub name: String,
    pub artist: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_features: Option<AudioFeatures>,
    #[serde(default)]
    pub source: TrackSource,
}

impl TrackCandidate {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            artist: artist.into(),
            audio_features: None,
            source: TrackSource::Sample,
        }
    }

    #[must_use]
    pub fn with_features(mut self, features: AudioFeatures) -> Self {
        self.audio_features = Some(features);
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: TrackSource) -> Self {
        self.source = source;
        self
    }
}

#[allow(clippy::too_many_arguments)]
fn sample(
    id: &str,
    name: &str,
    artist: &str,
    valence: f64,
    energy: f64,
    danceability: f64,
    tempo: f64,
    acousticness: f64,
    instrumentalness: f64,
) -> TrackCandidate {
    TrackCandidate::new(id, name, artist).with_features(AudioFeatures {
        valence,
        energy,
        danceability,
        tempo,
        acousticness,
        instrumentalness,
    })
}

/// Built-in library used when the catalog is unavailable or empty.
#[must_use]
pub fn sample_tracks() -> Vec<TrackCandidate> {
    vec![
        sample("1", "Blinding Lights", "The Weeknd", 0.33, 0.73, 0.51, 171.0, 0.00, 0.00),
        sample("2", "Levitating", "Dua Lipa", 0.92, 0.83, 0.70, 103.0, 0.01, 0.00),
        sample("3", "Good 4 U", "Olivia Rodrigo", 0.69, 0.66, 0.56, 167.0, 0.34, 0.00),
        sample("4", "Heat Waves", "Glass Animals", 0.53, 0.53, 0.76, 81.0, 0.44, 0.00),
        sample("5", "Stay", "The Kid LAROI", 0.48, 0.76, 0.59, 170.0, 0.04, 0.00),
        sample("6", "Industry Baby", "Lil Nas X", 0.89, 0.70, 0.74, 150.0, 0.02, 0.00),
        sample("7", "Circles", "Post Malone", 0.55, 0.76, 0.70, 120.0, 0.19, 0.00),
        sample("8", "Sunflower", "Post Malone", 0.91, 0.48, 0.76, 90.0, 0.56, 0.00),
        sample("9", "Someone You Loved", "Lewis Capaldi", 0.45, 0.41, 0.50, 110.0, 0.75, 0.00),
        sample("10", "Perfect", "Ed Sheeran", 0.17, 0.45, 0.60, 95.0, 0.16, 0.00),
        sample("11", "Anti-Hero", "Taylor Swift", 0.53, 0.64, 0.64, 97.0, 0.13, 0.00),
        sample("12", "As It Was", "Harry Styles", 0.66, 0.73, 0.52, 174.0, 0.34, 0.00),
    ]
}

/// Use `library` if it has anything in it, the sample library otherwise.
///
/// Duplicate ids are dropped, first occurrence wins, order is preserved.
#[must_use]
pub fn resolve_pool(library: Option<Vec<TrackCandidate>>) -> Vec<TrackCandidate> {
    let tracks = match library {
        Some(tracks) if !tracks.is_empty() => tracks,
        _ => {
            log::warn!("Catalog unavailable or empty, using sample library");
            return sample_tracks();
        }
    };

    let mut seen = HashSet::new();
    tracks.into_iter().filter(|t| seen.insert(t.id.clone())).collect()
}

/// Read a JSON array of tracks exported from the catalog.
pub fn load_tracks_json(path: &Path) -> Result<Vec<TrackCandidate>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read track list at {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Track list at {} is not a JSON array of tracks", path.display()))
}
