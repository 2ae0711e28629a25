pub mod config;
pub mod error;
pub mod finder;
pub mod geo;
pub mod geocoder;
pub mod http;
pub mod location;
pub mod schedule;
pub mod source;
pub mod types;
pub mod zipcode;

pub use config::Config;
pub use error::{GeocodeError, ScheduleError};
pub use finder::{DEFAULT_TOP_N, Finder, SearchOutcome};
pub use geocoder::ZippopotamGeocoder;
pub use location::{Geocoder, LocationResolver};
pub use schedule::ScheduleTable;
pub use source::{FileScheduleSource, HttpScheduleSource, ScheduleSource, source_for};
pub use types::{Candidate, LocationRecord, RankedCandidate, default_roster, load_roster};
pub use zipcode::{ZipWatcher, extract_zip, is_valid_zip};
