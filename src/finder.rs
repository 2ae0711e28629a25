//! Ranking pipeline: resolve a ZIP, measure every trainer's distance, attach
//! the next schedule slot, and keep the closest few.

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::error::ScheduleError;
use crate::geo;
use crate::location::{Geocoder, LocationResolver};
use crate::schedule::ScheduleTable;
use crate::source::ScheduleSource;
use crate::types::{Candidate, LocationRecord, RankedCandidate};
use crate::zipcode::is_valid_zip;

/// Number of results returned when the caller does not ask for another count.
pub const DEFAULT_TOP_N: usize = 5;

const DIRECTIONS_URL: &str = "https://www.google.com/maps/dir/?api=1";

/// Characters JavaScript's `encodeURIComponent` leaves alone.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Result of a search.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SearchOutcome {
    /// Input was not a 5-digit ZIP; nothing was searched.
    Skipped,
    /// The ZIP could not be resolved to a location.
    ZipNotFound { zip: String },
    /// Closest trainers, nearest first.
    #[serde(rename = "ok")]
    Found {
        zip: String,
        origin: LocationRecord,
        results: Vec<RankedCandidate>,
    },
}

/// Owns the roster, the location resolver and the current schedule table.
///
/// Clones share the cache and the table.
#[derive(Clone)]
pub struct Finder {
    roster: Arc<Vec<Candidate>>,
    resolver: LocationResolver,
    schedule: Arc<RwLock<ScheduleTable>>,
}

impl Finder {
    /// Build a finder whose location cache is seeded with the roster's ZIPs.
    pub fn new(roster: Vec<Candidate>, geocoder: Arc<dyn Geocoder>) -> Self {
        let resolver = LocationResolver::seeded(geocoder, &roster);
        Self {
            roster: Arc::new(roster),
            resolver,
            schedule: Arc::new(RwLock::new(ScheduleTable::default())),
        }
    }

    pub fn roster(&self) -> &[Candidate] {
        &self.roster
    }

    pub fn resolver(&self) -> &LocationResolver {
        &self.resolver
    }

    /// Swap in a new schedule table wholesale.
    pub async fn replace_schedule(&self, table: ScheduleTable) {
        *self.schedule.write().await = table;
    }

    /// Rows in the current schedule table.
    pub async fn schedule_rows(&self) -> usize {
        self.schedule.read().await.len()
    }

    /// Fetch the schedule from `source` and replace the current table.
    ///
    /// On fetch failure the previous table stays in place. Returns the new
    /// row count.
    pub async fn refresh_schedule(&self, source: &dyn ScheduleSource) -> Result<usize, ScheduleError> {
        tracing::info!(source = %source.describe(), "fetching schedule");

        let text = source.fetch().await.inspect_err(|e| {
            tracing::error!(source = %source.describe(), error = %e, "schedule fetch failed");
        })?;

        let table = ScheduleTable::parse_csv(&text);
        let rows = table.len();
        self.replace_schedule(table).await;

        tracing::info!(rows, "schedule refreshed");
        Ok(rows)
    }

    /// Rank the roster around `zip` using today's local date for schedules.
    pub async fn rank(&self, zip: &str, top_n: usize) -> SearchOutcome {
        self.rank_on(zip, top_n, Local::now().date_naive()).await
    }

    /// Rank the roster around `zip`, treating `today` as the current date.
    pub async fn rank_on(&self, zip: &str, top_n: usize, today: NaiveDate) -> SearchOutcome {
        if !is_valid_zip(zip) {
            tracing::debug!(input = zip, "ignoring search for malformed ZIP");
            return SearchOutcome::Skipped;
        }

        let Some(origin) = self.resolver.resolve(zip).await else {
            return SearchOutcome::ZipNotFound {
                zip: zip.to_string(),
            };
        };

        let schedule = self.schedule.read().await;
        let mut results: Vec<RankedCandidate> = self
            .roster
            .iter()
            .map(|candidate| {
                let miles = geo::distance(origin.lat, origin.lon, candidate.lat, candidate.lon);
                RankedCandidate {
                    candidate: candidate.clone(),
                    distance_miles: miles.round() as u32,
                    next_available: schedule.next_slot(&candidate.name, today),
                    directions_url: directions_url(zip, &origin, candidate),
                }
            })
            .collect();
        drop(schedule);

        // Stable: equal distances keep roster order.
        results.sort_by_key(|r| r.distance_miles);
        results.truncate(top_n);

        tracing::info!(zip, results = results.len(), "search complete");
        SearchOutcome::Found {
            zip: zip.to_string(),
            origin,
            results,
        }
    }
}

/// Google Maps directions link from the searched ZIP to `candidate`.
pub fn directions_url(origin_zip: &str, origin: &LocationRecord, candidate: &Candidate) -> String {
    let from = format!("{}, {} {}, USA", origin.city, origin.state, origin_zip);
    let to = format!("{}, {} {}, USA", candidate.city, candidate.state, candidate.zip);
    format!(
        "{}&origin={}&destination={}",
        DIRECTIONS_URL,
        utf8_percent_encode(&from, URI_COMPONENT),
        utf8_percent_encode(&to, URI_COMPONENT)
    )
}
