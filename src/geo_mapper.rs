// Translates station payloads from the station API into normalized records

use crate::models::{StationRecord, StationStatus, StationType};
use chrono::{DateTime, Utc};
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StationDto {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub status: String,
    #[serde(rename = "type", default)]
    pub station_type: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub location: Option<DtoLocation>,
    pub capacity_kw: Option<f64>,
    pub last_heartbeat: Option<String>,
}

/// GeoJSON style position, `[lng, lat]`.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct DtoLocation {
    pub coordinates: Vec<f64>,
}

fn valid_coordinate(lat: f64, lng: f64) -> bool {
    lat.is_finite() && lng.is_finite() && (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lng)
}

fn dto_coordinate(dto: &StationDto) -> Option<(f64, f64)> {
    match (dto.lat, dto.lng) {
        (Some(lat), Some(lng)) => Some((lat, lng)),
        _ => match &dto.location {
            Some(location) if location.coordinates.len() >= 2 => {
                Some((location.coordinates[1], location.coordinates[0]))
            }
            _ => None,
        },
    }
}

pub fn to_station_record(dto: &StationDto) -> Option<StationRecord> {
    let (lat, lng) = dto_coordinate(dto)?;

    if !valid_coordinate(lat, lng) {
        return None;
    }

    let status = dto.status.parse::<StationStatus>().ok()?;
    let station_type = dto.station_type.parse::<StationType>().ok()?;

    let last_heartbeat = dto
        .last_heartbeat
        .as_deref()
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|dt| dt.with_timezone(&Utc));

    Some(StationRecord {
        id: dto.id.clone(),
        name: dto.name.clone(),
        address: dto.address.clone(),
        status,
        station_type,
        lat,
        lng,
        capacity_kw: dto.capacity_kw.filter(|kw| kw.is_finite()),
        last_heartbeat,
    })
}

pub fn to_station_records(dtos: &[StationDto]) -> Vec<StationRecord> {
    let records: Vec<StationRecord> = dtos.iter().filter_map(to_station_record).collect();

    let skipped = dtos.len() - records.len();
    if skipped > 0 {
        tracing::warn!(skipped, total = dtos.len(), "dropped unmappable station records");
    }

    records
}

pub fn station_point(record: &StationRecord) -> geo_types::Point<f64> {
    geo_types::Point::new(record.lng, record.lat)
}

/// Point features for the render surface, which does its own clustering.
pub fn stations_to_feature_collection(records: &[StationRecord]) -> FeatureCollection {
    let features = records
        .iter()
        .map(|record| {
            let mut properties = JsonObject::new();
            properties.insert("id".to_string(), record.id.clone().into());
            properties.insert("name".to_string(), record.name.clone().into());
            properties.insert("status".to_string(), record.status.as_str().into());
            properties.insert("type".to_string(), record.station_type.as_str().into());

            Feature {
                bbox: None,
                geometry: Some(Geometry::new(Value::from(&station_point(record)))),
                id: Some(geojson::feature::Id::String(record.id.clone())),
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}
