// Resolves map clicks into camera moves and popup state

use crate::dataset::UnionIndex;
use crate::models::{LatLng, StationRecord};

/// Which map the click came from. The two screens zoom in to different levels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MapContext {
    Overview,
    #[default]
    Explorer,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    pub overview_close_zoom: f64,
    pub explorer_close_zoom: f64,
    pub cluster_zoom_increment: f64,
    pub max_zoom: f64,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            overview_close_zoom: 12.0,
            explorer_close_zoom: 14.0,
            cluster_zoom_increment: 2.0,
            max_zoom: 20.0,
        }
    }
}

impl SelectionConfig {
    pub fn close_zoom(&self, context: MapContext) -> f64 {
        match context {
            MapContext::Overview => self.overview_close_zoom,
            MapContext::Explorer => self.explorer_close_zoom,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum MapClick {
    Station { id: String },
    Cluster { coordinate: LatLng },
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct CameraRequest {
    pub center: LatLng,
    pub zoom: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SelectionAction {
    FocusStation {
        station: StationRecord,
        camera: CameraRequest,
    },
    ZoomToCluster {
        camera: CameraRequest,
    },
    /// Click on an id the index no longer holds, e.g. a filter change raced it.
    Ignored,
}

pub fn resolve_click(
    click: &MapClick,
    index: &UnionIndex,
    context: MapContext,
    current_zoom: f64,
    config: &SelectionConfig,
) -> SelectionAction {
    match click {
        MapClick::Station { id } => match index.get(id) {
            Some(station) => SelectionAction::FocusStation {
                camera: CameraRequest {
                    center: station.coordinate(),
                    zoom: config.close_zoom(context),
                },
                station: station.clone(),
            },
            None => {
                tracing::debug!(station_id = %id, "click on station missing from index");
                SelectionAction::Ignored
            }
        },
        MapClick::Cluster { coordinate } => SelectionAction::ZoomToCluster {
            camera: CameraRequest {
                center: *coordinate,
                zoom: (current_zoom + config.cluster_zoom_increment).min(config.max_zoom),
            },
        },
    }
}
