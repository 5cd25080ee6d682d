use crate::types::JoinedRecord;
use anyhow::{Context, Result};
use geojson::{Feature, FeatureCollection, GeoJson};
use std::fs;
use std::path::Path;
use tracing::info;

/// Choropleth input: one feature per record, census fields as properties.
pub fn feature_collection(records: &[&JoinedRecord]) -> FeatureCollection {
    records.iter().map(|record| feature(record)).collect()
}

fn feature(record: &JoinedRecord) -> Feature {
    let mut feature = Feature {
        bbox: None,
        geometry: Some(geojson::Geometry::new(geojson::Value::from(&record.geometry))),
        id: None,
        properties: None,
        foreign_members: None,
    };
    feature.set_property("Subzone", record.subzone.as_str());
    feature.set_property("Region", record.region());
    feature.set_property("Planning Area", record.planning_area());
    feature.set_property("Subzone Total", record.subzone_total());
    feature
}

pub fn write_feature_collection(path: &Path, records: &[&JoinedRecord]) -> Result<()> {
    let out = GeoJson::from(feature_collection(records));
    fs::write(path, out.to_string())
        .with_context(|| format!("Failed to write GeoJSON: {:?}", path))?;
    info!(features = records.len(), path = %path.display(), "wrote feature collection");
    Ok(())
}
