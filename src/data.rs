use crate::config::InputConfig;
use crate::error::LoadError;
use crate::types::{BoundaryRecord, Field, PopulationRecord, SubzoneKey};
use csv::ReaderBuilder;
use geo::MultiPolygon;
use geojson::{GeoJson, Value};
use shapefile::dbase::FieldValue;
use shapefile::Reader;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, info, instrument, warn};

const REGION_COLUMN: &str = "Region";
const PLANNING_AREA_COLUMN: &str = "Planning Area";

/// Loads both input files. Keys are normalized on the way in.
pub fn load_data(
    input: &InputConfig,
) -> Result<(Vec<BoundaryRecord>, Vec<PopulationRecord>), LoadError> {
    let population = load_population_csv(&input.population_csv, &input.join_column_csv)?;
    info!(rows = population.len(), "loaded census data");

    let boundaries = load_boundaries(&input.boundaries, &input.join_column_boundaries)?;
    info!(features = boundaries.len(), "loaded boundaries");

    Ok((boundaries, population))
}

#[instrument(skip(path, join_column), fields(path = %path.display()))]
pub fn load_population_csv(
    path: &Path,
    join_column: &str,
) -> Result<Vec<PopulationRecord>, LoadError> {
    let file = File::open(path).map_err(|source| LoadError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let mut rdr = ReaderBuilder::new().from_reader(file);
    let headers = rdr
        .headers()
        .map_err(|source| LoadError::Csv {
            path: path.to_path_buf(),
            source,
        })?
        .clone();

    let col_indices: HashMap<&str, usize> =
        headers.iter().enumerate().map(|(i, h)| (h, i)).collect();
    let column = |name: &str| {
        col_indices
            .get(name)
            .copied()
            .ok_or_else(|| LoadError::MissingColumn {
                path: path.to_path_buf(),
                column: name.to_string(),
            })
    };

    let key_idx = column(join_column)?;
    let region_idx = column(REGION_COLUMN)?;
    let planning_area_idx = column(PLANNING_AREA_COLUMN)?;
    let mut field_idx = [0usize; Field::ALL.len()];
    for (slot, field) in field_idx.iter_mut().zip(Field::ALL) {
        *slot = column(field.column())?;
    }
    debug!(columns = headers.len(), "resolved census columns");

    let mut records = Vec::new();
    let mut seen = HashSet::new();
    let mut skipped = 0usize;

    for (row, result) in rdr.records().enumerate() {
        let record = result.map_err(|source| LoadError::Csv {
            path: path.to_path_buf(),
            source,
        })?;

        let Some(subzone) = SubzoneKey::from_text(record.get(key_idx).unwrap_or("")) else {
            skipped += 1;
            continue;
        };
        if !seen.insert(subzone.clone()) {
            return Err(LoadError::DuplicateKey {
                path: path.to_path_buf(),
                key: subzone.to_string(),
            });
        }

        let mut values = [None; Field::ALL.len()];
        for ((value, &idx), field) in values.iter_mut().zip(&field_idx).zip(Field::ALL) {
            let raw = record.get(idx).unwrap_or("");
            *value = parse_count(raw).ok_or_else(|| LoadError::InvalidNumber {
                path: path.to_path_buf(),
                row: row + 1,
                column: field.column().to_string(),
                raw: raw.to_string(),
            })?;
        }
        let [subzone_total, total_males, total_females, total_chinese, total_malays, total_indians, total_others] =
            values;

        records.push(PopulationRecord {
            subzone,
            region: text_cell(record.get(region_idx)),
            planning_area: text_cell(record.get(planning_area_idx)),
            subzone_total,
            total_males,
            total_females,
            total_chinese,
            total_malays,
            total_indians,
            total_others,
        });
    }

    if skipped > 0 {
        warn!(skipped, "skipped census rows with an empty subzone key");
    }

    Ok(records)
}

fn text_cell(raw: Option<&str>) -> Option<String> {
    raw.filter(|s| !s.is_empty()).map(str::to_string)
}

/// `Some(None)` for an empty cell, `None` when the cell is not a usable count.
fn parse_count(raw: &str) -> Option<Option<f64>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Some(None);
    }
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Some(Some(v)),
        _ => None,
    }
}

/// Dispatches on the file extension, as GeoJSON or Shapefile.
pub fn load_boundaries(path: &Path, join_column: &str) -> Result<Vec<BoundaryRecord>, LoadError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_lowercase());

    match extension.as_deref() {
        Some("json") | Some("geojson") => load_geojson(path, join_column),
        Some("shp") => load_shapefile(path, join_column),
        _ => Err(LoadError::UnsupportedFormat {
            path: path.to_path_buf(),
        }),
    }
}

#[instrument(skip(path, join_column), fields(path = %path.display()))]
fn load_geojson(path: &Path, join_column: &str) -> Result<Vec<BoundaryRecord>, LoadError> {
    let file = File::open(path).map_err(|source| LoadError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let reader = BufReader::new(file);

    // Parse the whole collection; boundary files are a few MB at most.
    let geojson = GeoJson::from_reader(reader).map_err(|source| LoadError::GeoJson {
        path: path.to_path_buf(),
        source: geojson::Error::MalformedJson(source),
    })?;

    let collection = match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        _ => {
            return Err(LoadError::NotFeatureCollection {
                path: path.to_path_buf(),
            })
        }
    };

    let mut boundaries = Vec::with_capacity(collection.features.len());
    let mut seen = HashSet::new();
    let mut skipped = 0usize;

    for (index, feature) in collection.features.into_iter().enumerate() {
        let key = feature
            .properties
            .as_ref()
            .and_then(|props| props.get(join_column))
            .and_then(SubzoneKey::from_json);
        let Some(subzone) = key else {
            skipped += 1;
            continue;
        };

        let Some(geom) = feature.geometry else {
            return Err(LoadError::MissingGeometry {
                path: path.to_path_buf(),
                index,
                key: subzone.to_string(),
            });
        };
        match &geom.value {
            Value::Polygon(_) | Value::MultiPolygon(_) => {}
            other => return Err(unsupported(path, index, &subzone, geometry_kind(other))),
        }

        // geojson Value -> geo types -> MultiPolygon
        let geo_geom: geo::Geometry<f64> =
            geom.value.try_into().map_err(|source| LoadError::GeoJson {
                path: path.to_path_buf(),
                source,
            })?;
        let geometry = match geo_geom {
            geo::Geometry::MultiPolygon(mp) => mp,
            geo::Geometry::Polygon(p) => MultiPolygon::new(vec![p]),
            other => return Err(unsupported(path, index, &subzone, format!("{:?}", other))),
        };

        if !seen.insert(subzone.clone()) {
            return Err(LoadError::DuplicateKey {
                path: path.to_path_buf(),
                key: subzone.to_string(),
            });
        }
        boundaries.push(BoundaryRecord { subzone, geometry });
    }

    if skipped > 0 {
        warn!(skipped, "skipped features without a usable subzone key");
    }

    Ok(boundaries)
}

#[instrument(skip(path, join_column), fields(path = %path.display()))]
fn load_shapefile(path: &Path, join_column: &str) -> Result<Vec<BoundaryRecord>, LoadError> {
    let shapefile_err = |source: shapefile::Error| LoadError::Shapefile {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = Reader::from_path(path).map_err(shapefile_err)?;

    let mut boundaries = Vec::new();
    let mut seen = HashSet::new();
    let mut skipped = 0usize;

    for (index, result) in reader.iter_shapes_and_records().enumerate() {
        let (shape, record) = result.map_err(shapefile_err)?;

        // Find the join key in the dbase record
        let id_value = record
            .get(join_column)
            .ok_or_else(|| LoadError::MissingColumn {
                path: path.to_path_buf(),
                column: join_column.to_string(),
            })?;

        let key = match id_value {
            FieldValue::Character(s) => s.as_deref().and_then(SubzoneKey::from_text),
            FieldValue::Numeric(n) => n.and_then(SubzoneKey::from_number),
            FieldValue::Float(n) => n.and_then(|v| SubzoneKey::from_number(f64::from(v))),
            FieldValue::Integer(i) => SubzoneKey::from_number(f64::from(*i)),
            _ => {
                return Err(LoadError::InvalidKeyField {
                    path: path.to_path_buf(),
                    column: join_column.to_string(),
                })
            }
        };
        let Some(subzone) = key else {
            skipped += 1;
            continue;
        };

        let geometry: MultiPolygon<f64> = match shape {
            shapefile::Shape::Polygon(polygon) => polygon
                .try_into()
                .map_err(|e| unsupported(path, index, &subzone, format!("{:?}", e)))?,
            shapefile::Shape::PolygonM(polygon) => polygon
                .try_into()
                .map_err(|e| unsupported(path, index, &subzone, format!("{:?}", e)))?,
            shapefile::Shape::PolygonZ(polygon) => polygon
                .try_into()
                .map_err(|e| unsupported(path, index, &subzone, format!("{:?}", e)))?,
            shapefile::Shape::NullShape => {
                return Err(LoadError::MissingGeometry {
                    path: path.to_path_buf(),
                    index,
                    key: subzone.to_string(),
                })
            }
            other => {
                return Err(unsupported(
                    path,
                    index,
                    &subzone,
                    format!("{:?}", other.shapetype()),
                ))
            }
        };

        if !seen.insert(subzone.clone()) {
            return Err(LoadError::DuplicateKey {
                path: path.to_path_buf(),
                key: subzone.to_string(),
            });
        }
        boundaries.push(BoundaryRecord { subzone, geometry });
    }

    if skipped > 0 {
        warn!(skipped, "skipped shapes without a usable subzone key");
    }

    Ok(boundaries)
}

fn unsupported(path: &Path, index: usize, key: &SubzoneKey, kind: impl Into<String>) -> LoadError {
    LoadError::UnsupportedGeometry {
        path: path.to_path_buf(),
        index,
        key: key.to_string(),
        kind: kind.into(),
    }
}

fn geometry_kind(value: &Value) -> &'static str {
    match value {
        Value::Point(_) => "Point",
        Value::MultiPoint(_) => "MultiPoint",
        Value::LineString(_) => "LineString",
        Value::MultiLineString(_) => "MultiLineString",
        Value::Polygon(_) => "Polygon",
        Value::MultiPolygon(_) => "MultiPolygon",
        Value::GeometryCollection(_) => "GeometryCollection",
    }
}
