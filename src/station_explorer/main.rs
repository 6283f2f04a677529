use anyhow::Context;
use clap::Parser;
use fleetmap::config::EngineConfig;
use fleetmap::dataset::filter::{StatusFilter, TypeFilter};
use fleetmap::density::{H3BoundaryResolver, polygons_to_feature_collection, transform_cells};
use fleetmap::explorer::{StationExplorer, station_reliability};
use fleetmap::geo_mapper::stations_to_feature_collection;
use fleetmap::models::ViewportBounds;
use fleetmap::services::DensityService;
use fleetmap::services::http::HttpStationApi;
use fleetmap::viewport::ViewportBoundsController;
use itertools::Itertools;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const DEFAULT_API_URL: &str = "http://localhost:8080/api";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// RON engine config, defaults are used when absent
    #[arg(long)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Stations inside a bounding box, falling back to a global search
    Search {
        #[arg(long, allow_hyphen_values = true)]
        north: f64,
        #[arg(long, allow_hyphen_values = true)]
        south: f64,
        #[arg(long, allow_hyphen_values = true)]
        east: f64,
        #[arg(long, allow_hyphen_values = true)]
        west: f64,
        #[arg(short, long, default_value = "")]
        query: String,
        #[arg(long, default_value = "all")]
        status: StatusFilter,
        #[arg(long = "type", default_value = "all")]
        station_type: TypeFilter,
        /// Print a GeoJSON FeatureCollection instead of a table
        #[arg(long)]
        geojson: bool,
    },
    /// Uptime over the configured window for one station
    Uptime { station_id: String },
    /// Coverage heatmap polygons as GeoJSON
    Density {
        #[arg(long)]
        resolution: Option<u8>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => EngineConfig::from_ron_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => EngineConfig::default(),
    };

    let api_url = std::env::var("FLEETMAP_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
    let api = HttpStationApi::new(&api_url);

    tracing::info!(api = %api.base_url(), "station explorer starting");

    match args.cmd {
        Command::Search {
            north,
            south,
            east,
            west,
            query,
            status,
            station_type,
            geojson,
        } => {
            let bounds = ViewportBounds::new(north, south, east, west);

            let mut controller = ViewportBoundsController::new(config.debounce());
            let mut committed_rx = controller.subscribe();
            controller.push(bounds);
            committed_rx
                .changed()
                .await
                .context("viewport controller closed before committing")?;
            let committed = (*committed_rx.borrow())
                .context("viewport controller committed nothing")?;
            controller.shutdown();

            let mut explorer = StationExplorer::new(config, Arc::new(H3BoundaryResolver));

            let mut requests = Vec::new();
            requests.extend(explorer.commit_bounds(committed));
            explorer.settle(&api, requests).await;

            // filters go in after the first load so the fallback sees real data
            let mut requests = Vec::new();
            requests.extend(explorer.set_status_filter(status));
            requests.extend(explorer.set_type_filter(station_type));
            requests.extend(explorer.set_query(&query));
            explorer.settle(&api, requests).await;

            let view = explorer.view();
            if let Some(error) = &view.error {
                eprintln!("warning: {}", error);
            }

            if geojson {
                let collection = stations_to_feature_collection(&view.stations);
                println!("{}", serde_json::to_string_pretty(&collection)?);
            } else {
                println!("mode: {:?}, {} stations", view.mode, view.stations.len());
                for station in &view.stations {
                    println!(
                        "{}\t{}\t{}\t{}\t{:.5},{:.5}",
                        station.id, station.name, station.status, station.station_type, station.lat, station.lng
                    );
                }
            }
        }
        Command::Uptime { station_id } => {
            let report = station_reliability(&api, &station_id, chrono::Utc::now(), &config).await;

            if let Some(error) = &report.error {
                eprintln!("warning: {}", error);
            }

            let bar = report
                .timeline
                .slots
                .iter()
                .map(|slot| if slot.is_online { "#" } else { "." })
                .join("");

            println!("{}", report.station_id);
            println!("[{}]", bar);
            println!(
                "uptime {}% ({}/{} slots), last status: {}",
                report.timeline.uptime_percent,
                report.timeline.online_slots,
                report.timeline.total_slots,
                report.last_status.as_deref().unwrap_or("unknown")
            );
        }
        Command::Density { resolution } => {
            let resolution = resolution.unwrap_or(config.density_resolution);
            let cells = api
                .fetch_density(resolution)
                .await
                .context("fetching density cells")?;

            let polygons = transform_cells(&cells, &H3BoundaryResolver);
            tracing::info!(cells = cells.len(), polygons = polygons.len(), "density overlay built");

            let collection = polygons_to_feature_collection(&polygons);
            println!("{}", serde_json::to_string_pretty(&collection)?);
        }
    }

    Ok(())
}
