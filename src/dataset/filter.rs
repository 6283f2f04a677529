use crate::models::{StationRecord, StationStatus, StationType, UnknownVariant};
use std::str::FromStr;

/// Free-text query, trimmed and lowercased once on construction.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct SearchQuery(String);

impl SearchQuery {
    pub fn new(raw: &str) -> Self {
        SearchQuery(raw.trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Only(StationStatus),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TypeFilter {
    #[default]
    All,
    Only(StationType),
}

impl FromStr for StatusFilter {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(StatusFilter::All);
        }
        s.parse::<StationStatus>().map(StatusFilter::Only)
    }
}

impl FromStr for TypeFilter {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(TypeFilter::All);
        }
        s.parse::<StationType>().map(TypeFilter::Only)
    }
}

/// The status/type/text filter shared by the viewport and global result sets.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StationFilter {
    pub status: StatusFilter,
    pub station_type: TypeFilter,
    pub query: SearchQuery,
}

impl StationFilter {
    pub fn matches(&self, record: &StationRecord) -> bool {
        let status_ok = match self.status {
            StatusFilter::All => true,
            StatusFilter::Only(status) => record.status == status,
        };

        let type_ok = match self.station_type {
            TypeFilter::All => true,
            TypeFilter::Only(station_type) => record.station_type == station_type,
        };

        status_ok && type_ok && self.matches_text(record)
    }

    fn matches_text(&self, record: &StationRecord) -> bool {
        if self.query.is_empty() {
            return true;
        }

        let needle = self.query.as_str();

        record.name.to_lowercase().contains(needle)
            || record.address.to_lowercase().contains(needle)
            || record.id.to_lowercase().contains(needle)
    }

    pub fn apply(&self, records: &[StationRecord]) -> Vec<StationRecord> {
        records
            .iter()
            .filter(|record| self.matches(record))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn station(id: &str, name: &str, status: StationStatus, station_type: StationType) -> StationRecord {
        StationRecord {
            id: id.to_string(),
            name: name.to_string(),
            address: format!("{} Ring Rd", id),
            status,
            station_type,
            lat: 0.5,
            lng: 0.5,
            capacity_kw: Some(150.0),
            last_heartbeat: None,
        }
    }

    fn sample() -> Vec<StationRecord> {
        vec![
            station("A", "North Depot", StationStatus::Active, StationType::Charging),
            station("B", "Central Swap Hub", StationStatus::Inactive, StationType::Swap),
            station("C", "Airport", StationStatus::Maintenance, StationType::Both),
        ]
    }

    #[test]
    fn test_default_filter_is_identity() {
        let records = sample();
        assert_eq!(StationFilter::default().apply(&records), records);
    }

    #[test]
    fn test_query_is_trimmed_and_lowercased() {
        let query = SearchQuery::new("  SWAP ");
        assert_eq!(query.as_str(), "swap");
        assert!(SearchQuery::new("   ").is_empty());
    }

    #[test]
    fn test_text_matches_name_address_or_id() {
        let records = sample();
        let mut filter = StationFilter::default();

        filter.query = SearchQuery::new("swap");
        assert_eq!(filter.apply(&records)[0].id, "B");

        filter.query = SearchQuery::new("c ring");
        let hits = filter.apply(&records);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "C");

        filter.query = SearchQuery::new("a");
        assert_eq!(filter.apply(&records).len(), 3);
    }

    #[test]
    fn test_status_and_type_filters_combine() {
        let records = sample();
        let filter = StationFilter {
            status: StatusFilter::Only(StationStatus::Inactive),
            station_type: TypeFilter::Only(StationType::Swap),
            query: SearchQuery::default(),
        };
        let hits = filter.apply(&records);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "B");

        let filter = StationFilter {
            status: StatusFilter::Only(StationStatus::Inactive),
            station_type: TypeFilter::Only(StationType::Charging),
            query: SearchQuery::default(),
        };
        assert!(filter.apply(&records).is_empty());
    }

    #[test]
    fn test_filter_parsing() {
        assert_eq!("All".parse::<StatusFilter>(), Ok(StatusFilter::All));
        assert_eq!(
            "maintenance".parse::<StatusFilter>(),
            Ok(StatusFilter::Only(StationStatus::Maintenance))
        );
        assert_eq!("BOTH".parse::<TypeFilter>(), Ok(TypeFilter::Only(StationType::Both)));
        assert!("everything".parse::<TypeFilter>().is_err());
    }
}
