use std::path::PathBuf;

use thiserror::Error;

/// Failures while asking the geocoder about a ZIP. These never reach the
/// user: the resolver logs them and reports the ZIP as not found.
#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("HTTP error: {0}")]
    Http(#[from] wreq::Error),

    #[error("malformed geocoder response for {zip}: {source}")]
    Deserialize {
        zip: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid coordinate {value:?} for {zip}")]
    InvalidCoordinate { zip: String, value: String },
}

/// Failures while fetching the schedule feed. The previous table is kept.
#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("HTTP error: {0}")]
    Http(#[from] wreq::Error),

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("failed to read schedule file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
