use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// A trainer with a fixed location, ranked by proximity to a searched ZIP.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub name: String,
    pub zip: String,
    pub lat: f64,
    pub lon: f64,
    pub city: String,
    pub state: String,
}

impl Candidate {
    /// Location record for the candidate's own ZIP, used to seed the resolver.
    pub fn location(&self) -> LocationRecord {
        LocationRecord {
            lat: self.lat,
            lon: self.lon,
            city: self.city.clone(),
            state: self.state.clone(),
        }
    }
}

/// Coordinates and locality resolved for a ZIP code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationRecord {
    pub lat: f64,
    pub lon: f64,
    pub city: String,
    pub state: String,
}

/// A candidate augmented with search-specific data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedCandidate {
    #[serde(flatten)]
    pub candidate: Candidate,
    /// Distance from the searched ZIP, rounded to the nearest mile
    pub distance_miles: u32,
    /// Next slot label (`"Feb 1 (5 weeks)"`, `"Feb 1*"`) or `"Full"`
    pub next_available: String,
    /// Google Maps directions from the searched ZIP to the candidate
    pub directions_url: String,
}

/// Built-in roster used when no roster file is configured.
pub fn default_roster() -> Vec<Candidate> {
    let trainer = |name: &str, zip: &str, lat: f64, lon: f64, state: &str| Candidate {
        name: name.to_string(),
        zip: zip.to_string(),
        lat,
        lon,
        city: "Sample City".to_string(),
        state: state.to_string(),
    };

    vec![
        trainer("Trainer Alpha", "10001", 40.7506, -73.9972, "NY"),
        trainer("Trainer Bravo", "11201", 40.6943, -73.9928, "NY"),
        trainer("Trainer Charlie", "07030", 40.7440, -74.0324, "NJ"),
        trainer("Trainer Delta", "19103", 39.9526, -75.1652, "PA"),
        trainer("Trainer Echo", "21201", 39.2904, -76.6122, "MD"),
    ]
}

/// Load a roster from a JSON array of candidates.
pub fn load_roster(path: &Path) -> Result<Vec<Candidate>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read roster {}", path.display()))?;
    let roster: Vec<Candidate> = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse roster {}", path.display()))?;

    if roster.is_empty() {
        anyhow::bail!("Roster {} is empty", path.display());
    }
    Ok(roster)
}
