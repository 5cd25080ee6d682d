use crate::aggregate::AggregateResult;
use crate::config::AppConfig;
use crate::export;
use crate::filter;
use crate::join::CensusDataset;
use crate::types::{JoinedRecord, RegionSelection, SubzoneKey};
use anyhow::{Context, Result};
use axum::{
    extract::{Query, State},
    response::Json,
    routing::get,
    Router,
};
use geo::{BoundingRect, Contains, Point};
use geojson::FeatureCollection;
use rstar::{RTree, RTreeObject, AABB};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::info;

// Wrapper for RTree indexing
struct AreaIndex {
    index: usize,
    aabb: AABB<[f64; 2]>,
}

impl RTreeObject for AreaIndex {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

/// Bounding-box index over subzone geometries for hover lookups.
pub struct SubzoneIndex {
    tree: RTree<AreaIndex>,
}

impl SubzoneIndex {
    pub fn build(records: &[JoinedRecord]) -> Self {
        let items: Vec<AreaIndex> = records
            .iter()
            .enumerate()
            .filter_map(|(index, record)| {
                let rect = record.geometry.bounding_rect()?;
                Some(AreaIndex {
                    index,
                    aabb: AABB::from_corners(
                        [rect.min().x, rect.min().y],
                        [rect.max().x, rect.max().y],
                    ),
                })
            })
            .collect();
        Self {
            tree: RTree::bulk_load(items),
        }
    }

    /// The subzone containing the point. `records` must be the slice the
    /// index was built from.
    pub fn locate<'a>(
        &self,
        records: &'a [JoinedRecord],
        lon: f64,
        lat: f64,
    ) -> Option<&'a JoinedRecord> {
        let point = Point::new(lon, lat);
        let envelope = AABB::from_point([lon, lat]);
        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .filter_map(|candidate| records.get(candidate.index))
            .find(|record| record.geometry.contains(&point))
    }
}

pub struct AppState {
    pub dataset: CensusDataset,
    pub index: SubzoneIndex,
    pub config: AppConfig,
}

#[derive(Deserialize)]
pub struct RegionParams {
    region: Option<String>,
}

impl RegionParams {
    fn selection(&self) -> RegionSelection {
        RegionSelection::from_param(self.region.as_deref())
    }
}

#[derive(Deserialize)]
pub struct QueryParams {
    lat: f64,
    lon: f64,
}

#[derive(Serialize)]
pub struct QueryResponse {
    subzone: SubzoneKey,
    region: Option<String>,
    planning_area: Option<String>,
    subzone_total: Option<f64>,
}

pub fn router(state: Arc<AppState>) -> Router {
    let static_dir = state.config.server.static_dir.clone();

    let mut app = Router::new()
        .route("/api/regions", get(regions_handler))
        .route("/api/summary", get(summary_handler))
        .route("/api/features", get(features_handler))
        .route("/api/query", get(query_handler));

    if let Some(dir) = static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    app.layer(CorsLayer::permissive()).with_state(state)
}

pub async fn start_server(config: AppConfig, dataset: CensusDataset) -> Result<()> {
    info!("building spatial index for hover lookups");
    let index = SubzoneIndex::build(dataset.records());

    let port = config.server.port;
    let state = Arc::new(AppState {
        dataset,
        index,
        config,
    });

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    info!("starting server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn regions_handler(State(state): State<Arc<AppState>>) -> Json<Vec<String>> {
    Json(filter::selector_options(state.dataset.records()))
}

async fn summary_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RegionParams>,
) -> Json<AggregateResult> {
    Json(
        state
            .dataset
            .summarize(&params.selection(), &state.config.processing),
    )
}

async fn features_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RegionParams>,
) -> Json<FeatureCollection> {
    let filtered = state.dataset.filter(&params.selection());
    Json(export::feature_collection(&filtered))
}

async fn query_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<QueryParams>,
) -> Json<Option<QueryResponse>> {
    let found = state
        .index
        .locate(state.dataset.records(), params.lon, params.lat)
        .map(|record| QueryResponse {
            subzone: record.subzone.clone(),
            region: record.region().map(str::to_string),
            planning_area: record.planning_area().map(str::to_string),
            subzone_total: record.subzone_total(),
        });
    Json(found)
}
