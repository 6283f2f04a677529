// REST adapter for the station API

use super::{
    DensityService, FetchError, ReliabilityHistoryService, StationQueryParams, StationQueryService,
};
use crate::geo_mapper::{StationDto, to_station_records};
use crate::models::{DensityCell, ReliabilityEvent, StationRecord};
use serde::de::DeserializeOwned;

#[derive(Deserialize)]
struct StationPage {
    records: Vec<StationDto>,
}

#[derive(Clone)]
pub struct HttpStationApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpStationApi {
    pub fn new(base_url: &str) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, FetchError> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(url = %url, status = status.as_u16(), "station api request failed");
            return Err(FetchError::Status {
                code: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        decode_body(&body)
    }
}

fn decode_body<T: DeserializeOwned>(body: &str) -> Result<T, FetchError> {
    serde_json::from_str(body).map_err(|e| FetchError::Decode(e.to_string()))
}

fn station_query_pairs(params: &StationQueryParams) -> Vec<(&'static str, String)> {
    match params {
        StationQueryParams::Bounds(bounds) => vec![
            ("north", bounds.north.to_string()),
            ("south", bounds.south.to_string()),
            ("east", bounds.east.to_string()),
            ("west", bounds.west.to_string()),
        ],
        StationQueryParams::Text(text) => vec![("q", text.clone())],
    }
}

impl StationQueryService for HttpStationApi {
    async fn fetch_stations(
        &self,
        params: StationQueryParams,
    ) -> Result<Vec<StationRecord>, FetchError> {
        let page: StationPage = self
            .get_json("/stations", &station_query_pairs(&params))
            .await?;

        Ok(to_station_records(&page.records))
    }
}

impl DensityService for HttpStationApi {
    async fn fetch_density(&self, resolution: u8) -> Result<Vec<DensityCell>, FetchError> {
        self.get_json("/stations/density", &[("resolution", resolution.to_string())])
            .await
    }
}

impl ReliabilityHistoryService for HttpStationApi {
    async fn fetch_reliability_history(
        &self,
        station_id: &str,
    ) -> Result<Vec<ReliabilityEvent>, FetchError> {
        let path = format!("/stations/{}/reliability", urlencoding::encode(station_id));
        self.get_json(&path, &[]).await
    }
}
