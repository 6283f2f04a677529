use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StationStatus {
    Active,
    Inactive,
    Maintenance,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StationType {
    Charging,
    Swap,
    Both,
}

impl StationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StationStatus::Active => "ACTIVE",
            StationStatus::Inactive => "INACTIVE",
            StationStatus::Maintenance => "MAINTENANCE",
        }
    }
}

impl StationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StationType::Charging => "CHARGING",
            StationType::Swap => "SWAP",
            StationType::Both => "BOTH",
        }
    }
}

impl FromStr for StationStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ACTIVE" => Ok(StationStatus::Active),
            "INACTIVE" => Ok(StationStatus::Inactive),
            "MAINTENANCE" => Ok(StationStatus::Maintenance),
            _ => Err(UnknownVariant(s.to_string())),
        }
    }
}

impl FromStr for StationType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CHARGING" => Ok(StationType::Charging),
            "SWAP" => Ok(StationType::Swap),
            "BOTH" => Ok(StationType::Both),
            _ => Err(UnknownVariant(s.to_string())),
        }
    }
}

impl fmt::Display for StationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for StationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognised value '{0}'")]
pub struct UnknownVariant(pub String);

/// Normalized station as used by every part of the engine.
///
/// Produced by [`crate::geo_mapper`] from whatever the station API returned.
/// Records are never mutated after mapping; selection lives in the explorer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StationRecord {
    pub id: String,
    pub name: String,
    pub address: String,
    pub status: StationStatus,
    #[serde(rename = "type")]
    pub station_type: StationType,
    pub lat: f64,
    pub lng: f64,
    pub capacity_kw: Option<f64>,
    pub last_heartbeat: Option<DateTime<Utc>>,
}

impl StationRecord {
    pub fn coordinate(&self) -> LatLng {
        LatLng {
            lat: self.lat,
            lng: self.lng,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

/// Visible map rectangle in degrees.
///
/// `west > east` means the rectangle crosses the antimeridian. The engine does
/// not normalize it, the station API receives it as reported by the map.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ViewportBounds {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl ViewportBounds {
    pub fn new(north: f64, south: f64, east: f64, west: f64) -> Self {
        Self {
            north,
            south,
            east,
            west,
        }
    }

    pub fn crosses_antimeridian(&self) -> bool {
        self.west > self.east
    }

    pub fn contains(&self, lat: f64, lng: f64) -> bool {
        if lat > self.north || lat < self.south {
            return false;
        }

        if self.crosses_antimeridian() {
            lng >= self.west || lng <= self.east
        } else {
            lng >= self.west && lng <= self.east
        }
    }
}

/// Aggregate station count for one hex-grid cell.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DensityCell {
    pub cell_id: String,
    pub count: u64,
}

/// One status transition as reported by the reliability history service.
///
/// The timestamp is kept as the raw string because the service does not
/// guarantee it parses; the calculator drops the ones that don't.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReliabilityEvent {
    pub timestamp: String,
    pub status: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UptimeSlot {
    pub slot_start: DateTime<Utc>,
    pub is_online: bool,
}
