//! Coverage heatmap: hex-cell counts to renderable polygons.

use crate::models::{DensityCell, LatLng};
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};
use std::str::FromStr;
use std::sync::Arc;

pub const DEFAULT_RESOLUTION: u8 = 5;

/// Hex-grid cell id to boundary vertices.
pub trait CellBoundaryResolver: Send + Sync {
    /// `None` when the id can't be converted.
    fn cell_to_boundary(&self, cell_id: &str) -> Option<Vec<LatLng>>;
}

/// H3 cells, ids in the usual 15 character hex form.
#[derive(Clone, Copy, Debug, Default)]
pub struct H3BoundaryResolver;

impl CellBoundaryResolver for H3BoundaryResolver {
    fn cell_to_boundary(&self, cell_id: &str) -> Option<Vec<LatLng>> {
        let cell = h3o::CellIndex::from_str(cell_id.trim()).ok()?;

        Some(
            cell.boundary()
                .iter()
                .map(|vertex| LatLng {
                    lat: vertex.lat(),
                    lng: vertex.lng(),
                })
                .collect(),
        )
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DensityPolygon {
    pub cell_id: String,
    pub count: u64,
    /// `count / max count` over the transformed set.
    pub weight: f64,
    /// Vertices as produced by the resolver. Not closed, not rewound.
    pub boundary: Vec<LatLng>,
}

pub fn transform_cells(cells: &[DensityCell], resolver: &dyn CellBoundaryResolver) -> Vec<DensityPolygon> {
    let max_count = cells.iter().map(|cell| cell.count).max().unwrap_or(0);

    let polygons: Vec<DensityPolygon> = cells
        .iter()
        .filter_map(|cell| {
            let Some(boundary) = resolver.cell_to_boundary(&cell.cell_id) else {
                tracing::warn!(cell_id = %cell.cell_id, "skipping density cell with bad id");
                return None;
            };

            let weight = if max_count == 0 {
                0.0
            } else {
                cell.count as f64 / max_count as f64
            };

            Some(DensityPolygon {
                cell_id: cell.cell_id.clone(),
                count: cell.count,
                weight,
                boundary,
            })
        })
        .collect();

    tracing::debug!(cells = cells.len(), polygons = polygons.len(), "density transform");

    polygons
}

/// Lazily computed overlay. Does no work while the overlay is switched off.
pub struct DensityOverlay {
    resolver: Arc<dyn CellBoundaryResolver>,
    enabled: bool,
    cells: Vec<DensityCell>,
    polygons: Option<Vec<DensityPolygon>>,
}

impl DensityOverlay {
    pub fn new(resolver: Arc<dyn CellBoundaryResolver>) -> Self {
        Self {
            resolver,
            enabled: false,
            cells: Vec::new(),
            polygons: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn set_cells(&mut self, cells: Vec<DensityCell>) {
        if cells != self.cells {
            self.cells = cells;
            self.polygons = None;
        }
    }

    pub fn has_cells(&self) -> bool {
        !self.cells.is_empty()
    }

    pub fn polygons(&mut self) -> &[DensityPolygon] {
        if !self.enabled {
            return &[];
        }

        let resolver = self.resolver.clone();
        let cells = &self.cells;
        self.polygons
            .get_or_insert_with(|| transform_cells(cells, resolver.as_ref()))
            .as_slice()
    }
}

pub fn polygons_to_feature_collection(polygons: &[DensityPolygon]) -> FeatureCollection {
    let features = polygons
        .iter()
        .filter(|polygon| !polygon.boundary.is_empty())
        .map(|polygon| {
            let mut ring: Vec<Vec<f64>> = polygon
                .boundary
                .iter()
                .map(|vertex| vec![vertex.lng, vertex.lat])
                .collect();
            // GeoJSON wants closed rings
            if ring.first() != ring.last() {
                if let Some(first) = ring.first().cloned() {
                    ring.push(first);
                }
            }

            let mut properties = JsonObject::new();
            properties.insert("cellId".to_string(), polygon.cell_id.clone().into());
            properties.insert("count".to_string(), polygon.count.into());
            properties.insert("weight".to_string(), polygon.weight.into());

            Feature {
                bbox: None,
                geometry: Some(Geometry::new(Value::Polygon(vec![ring]))),
                id: Some(geojson::feature::Id::String(polygon.cell_id.clone())),
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingResolver {
        calls: AtomicUsize,
    }

    impl CellBoundaryResolver for CountingResolver {
        fn cell_to_boundary(&self, cell_id: &str) -> Option<Vec<LatLng>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if cell_id == "bad" {
                return None;
            }
            Some(vec![
                LatLng { lat: 0.0, lng: 0.0 },
                LatLng { lat: 0.0, lng: 1.0 },
                LatLng { lat: 1.0, lng: 1.0 },
            ])
        }
    }

    fn cell(id: &str, count: u64) -> DensityCell {
        DensityCell {
            cell_id: id.to_string(),
            count,
        }
    }

    #[test]
    fn test_empty_cells_give_empty_collection() {
        let polygons = transform_cells(&[], &H3BoundaryResolver);
        assert!(polygons.is_empty());
        assert!(polygons_to_feature_collection(&polygons).features.is_empty());
    }

    #[test]
    fn test_bad_cell_is_skipped_not_fatal() {
        let resolver = CountingResolver {
            calls: AtomicUsize::new(0),
        };
        let polygons = transform_cells(&[cell("a", 4), cell("bad", 9), cell("b", 2)], &resolver);

        assert_eq!(polygons.len(), 2);
        assert_eq!(polygons[0].cell_id, "a");
        // max count still counts the skipped cell
        assert_eq!(polygons[0].weight, 4.0 / 9.0);
    }

    #[test]
    fn test_vertex_order_passes_through() {
        let resolver = CountingResolver {
            calls: AtomicUsize::new(0),
        };
        let polygons = transform_cells(&[cell("a", 0)], &resolver);
        assert_eq!(polygons[0].boundary.len(), 3);
        assert_eq!(polygons[0].boundary[1], LatLng { lat: 0.0, lng: 1.0 });
        assert_eq!(polygons[0].weight, 0.0);
    }

    #[test]
    fn test_h3_resolver_returns_hexagon() {
        let resolver = H3BoundaryResolver;
        let boundary = resolver.cell_to_boundary("85283473fffffff").unwrap();
        assert_eq!(boundary.len(), 6);
        for vertex in &boundary {
            assert!((37.0..38.5).contains(&vertex.lat));
            assert!((-122.5..-121.5).contains(&vertex.lng));
        }

        assert!(resolver.cell_to_boundary("not-a-cell").is_none());
    }

    #[test]
    fn test_overlay_does_no_work_while_disabled() {
        let resolver = Arc::new(CountingResolver {
            calls: AtomicUsize::new(0),
        });
        let mut overlay = DensityOverlay::new(resolver.clone());
        overlay.set_cells(vec![cell("a", 1), cell("b", 2)]);

        assert!(overlay.polygons().is_empty());
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 0);

        overlay.set_enabled(true);
        assert_eq!(overlay.polygons().len(), 2);
        assert_eq!(overlay.polygons().len(), 2);
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 2);

        overlay.set_cells(vec![cell("c", 1)]);
        assert_eq!(overlay.polygons().len(), 1);
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_feature_collection_closes_ring() {
        let resolver = CountingResolver {
            calls: AtomicUsize::new(0),
        };
        let polygons = transform_cells(&[cell("a", 3)], &resolver);
        let collection = polygons_to_feature_collection(&polygons);

        match &collection.features[0].geometry.as_ref().unwrap().value {
            Value::Polygon(rings) => {
                assert_eq!(rings[0].len(), 4);
                assert_eq!(rings[0].first(), rings[0].last());
            }
            other => panic!("expected polygon, got {:?}", other),
        }
    }
}
