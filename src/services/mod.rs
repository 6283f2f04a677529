//! Interfaces of the external services the engine reads from.

pub mod http;

use crate::models::{DensityCell, ReliabilityEvent, StationRecord, ViewportBounds};
use std::future::Future;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("could not reach station service: {0}")]
    Transport(String),
    #[error("station service answered with status {code}")]
    Status { code: u16 },
    #[error("could not read station service response: {0}")]
    Decode(String),
}

/// The only two query shapes the engine sends.
#[derive(Clone, Debug, PartialEq)]
pub enum StationQueryParams {
    Bounds(ViewportBounds),
    Text(String),
}

pub trait StationQueryService: Send + Sync {
    fn fetch_stations(
        &self,
        params: StationQueryParams,
    ) -> impl Future<Output = Result<Vec<StationRecord>, FetchError>> + Send;
}

pub trait DensityService: Send + Sync {
    fn fetch_density(
        &self,
        resolution: u8,
    ) -> impl Future<Output = Result<Vec<DensityCell>, FetchError>> + Send;
}

pub trait ReliabilityHistoryService: Send + Sync {
    fn fetch_reliability_history(
        &self,
        station_id: &str,
    ) -> impl Future<Output = Result<Vec<ReliabilityEvent>, FetchError>> + Send;
}
