use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row of the top-N snapshot (`GET /metrics/top10`).
///
/// Immutable once received; the whole set is replaced on each poll tick.
/// Order is server-defined (ranked by max_measurement descending) and
/// preserved as received.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntitySummary {
    /// Unique entity name, used as the key everywhere downstream
    pub name: String,

    pub mean_measurement: f64,
    pub min_measurement: f64,
    pub max_measurement: f64,

    /// Last known position/heading at aggregation time
    pub last_latitude: f64,
    pub last_longitude: f64,
    pub last_heading: f64,

    /// Number of samples aggregated into this row
    pub count: u64,
}

impl EntitySummary {
    /// Last known position as an interpolation endpoint
    pub fn last_position(&self) -> Position {
        Position {
            latitude: self.last_latitude,
            longitude: self.last_longitude,
            heading: self.last_heading,
        }
    }
}

/// Position-free summary row (`GET /summary-stats`)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub name: String,
    pub mean_measurement: f64,
    pub min_measurement: f64,
    pub max_measurement: f64,
    pub count: u64,
}

/// One inbound push event for a single entity.
///
/// Supersedes any prior sample for the same name (last-write-wins).
/// The wire field for the correlation id is `verification_id`; it is
/// opaque and used for diagnostics, not ordering enforcement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LiveSample {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Degrees, 0-360
    pub heading: f64,
    pub measurement: f64,
    #[serde(rename = "verification_id")]
    pub correlation_id: String,

    /// Stamped locally on decode; not part of the wire shape
    #[serde(skip, default = "Utc::now")]
    pub received_at: DateTime<Utc>,
}

impl LiveSample {
    pub fn position(&self) -> Position {
        Position {
            latitude: self.latitude,
            longitude: self.longitude,
            heading: self.heading,
        }
    }
}

/// A point on the map with an orientation; interpolation endpoint
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
    pub heading: f64,
}

/// Interpolated marker state for one animation tick.
///
/// Ephemeral: regenerated every frame, never authoritative.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderFrame {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub heading: f64,
}
