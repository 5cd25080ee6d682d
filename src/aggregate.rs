//! Dashboard metrics over a filtered selection.
//!
//! Every function here is pure. Null census values contribute nothing to a
//! sum and are never replaced by zero in the records themselves.

use crate::config::ProcessingConfig;
use crate::types::{Field, JoinedRecord, RegionSelection, SubzoneKey};
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;

/// Share of the nationwide population, or "N/A" when undefined.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Percentage {
    /// The `All` selection, always shown as a flat "100%".
    Nationwide,
    Value(f64),
    NotApplicable,
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Percentage::Nationwide => f.write_str("100%"),
            Percentage::Value(v) => write!(f, "{:.2}%", v),
            Percentage::NotApplicable => f.write_str("N/A"),
        }
    }
}

impl Serialize for Percentage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Percentage::Nationwide => serializer.serialize_f64(100.0),
            Percentage::Value(v) => serializer.serialize_f64(*v),
            Percentage::NotApplicable => serializer.serialize_str("N/A"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedSubzone {
    pub rank: usize, // 1-based
    pub subzone: SubzoneKey,
    pub region: Option<String>,
    pub subzone_total: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    pub name: String,
    pub color: String,
    pub column: Field,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Breakdown {
    pub name: String,
    pub categories: Vec<CategoryTotal>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateResult {
    pub region: String,
    pub total_population: f64,
    pub district_count: usize,
    pub subzone_count: usize,
    pub population_percentage: Percentage,
    pub top_subzones: Vec<RankedSubzone>,
    pub breakdowns: Vec<Breakdown>,
}

pub fn aggregate(
    filtered: &[&JoinedRecord],
    nationwide_total: f64,
    selection: &RegionSelection,
    processing: &ProcessingConfig,
) -> AggregateResult {
    let total = total_population(filtered);

    let breakdowns = processing
        .breakdowns
        .iter()
        .map(|(name, breakdown)| {
            let fields: Vec<Field> = breakdown.categories.iter().map(|c| c.column).collect();
            let sums = category_breakdown(filtered, &fields);
            Breakdown {
                name: name.clone(),
                categories: breakdown
                    .categories
                    .iter()
                    .zip(sums)
                    .map(|(category, (column, total))| CategoryTotal {
                        name: category.name.clone(),
                        color: category.color.clone(),
                        column,
                        total,
                    })
                    .collect(),
            }
        })
        .collect();

    AggregateResult {
        region: selection.to_string(),
        total_population: total,
        district_count: district_count(filtered),
        subzone_count: subzone_count(filtered),
        population_percentage: population_percentage(total, nationwide_total, selection),
        top_subzones: top_n_ranking(filtered, processing.top_n),
        breakdowns,
    }
}

/// Sum of a column, skipping nulls.
pub fn sum_field(records: &[&JoinedRecord], field: Field) -> f64 {
    records
        .iter()
        .filter_map(|r| r.value(field))
        .fold(0.0, |acc, v| acc + v)
}

pub fn total_population(records: &[&JoinedRecord]) -> f64 {
    sum_field(records, Field::SubzoneTotal)
}

/// Distinct non-null regions.
pub fn district_count(records: &[&JoinedRecord]) -> usize {
    records
        .iter()
        .filter_map(|r| r.region())
        .collect::<HashSet<_>>()
        .len()
}

pub fn subzone_count(records: &[&JoinedRecord]) -> usize {
    records
        .iter()
        .map(|r| &r.subzone)
        .collect::<HashSet<_>>()
        .len()
}

/// All: 100 when the nationwide total is positive. A region: its share when
/// both totals are positive. Anything else is N/A.
pub fn population_percentage(
    filtered_total: f64,
    nationwide_total: f64,
    selection: &RegionSelection,
) -> Percentage {
    if nationwide_total <= 0.0 {
        return Percentage::NotApplicable;
    }
    match selection {
        RegionSelection::All => Percentage::Nationwide,
        RegionSelection::Region(_) if filtered_total > 0.0 => {
            Percentage::Value(100.0 * filtered_total / nationwide_total)
        }
        RegionSelection::Region(_) => Percentage::NotApplicable,
    }
}

/// The `n` most populated subzones, descending.
///
/// Ties keep input order and records without a total sort last.
pub fn top_n_ranking(records: &[&JoinedRecord], n: usize) -> Vec<RankedSubzone> {
    let mut sorted: Vec<&JoinedRecord> = records.to_vec();
    sorted.sort_by(|a, b| match (a.subzone_total(), b.subzone_total()) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });

    sorted
        .into_iter()
        .take(n)
        .enumerate()
        .map(|(i, record)| RankedSubzone {
            rank: i + 1,
            subzone: record.subzone.clone(),
            region: record.region().map(str::to_string),
            subzone_total: record.subzone_total(),
        })
        .collect()
}

/// Null-skipping sum of each field, in the order given.
pub fn category_breakdown(records: &[&JoinedRecord], fields: &[Field]) -> Vec<(Field, f64)> {
    fields
        .iter()
        .map(|&field| (field, sum_field(records, field)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{filter_region, regions};
    use crate::types::PopulationRecord;
    use geo::MultiPolygon;

    fn record(key: &str, region: Option<&str>, total: Option<f64>) -> JoinedRecord {
        let subzone = SubzoneKey::from_text(key).unwrap();
        JoinedRecord {
            subzone: subzone.clone(),
            geometry: MultiPolygon::new(Vec::new()),
            population: Some(PopulationRecord {
                subzone,
                region: region.map(str::to_string),
                planning_area: None,
                subzone_total: total,
                total_males: total.map(|t| t * 0.5),
                total_females: total.map(|t| t * 0.5),
                total_chinese: None,
                total_malays: Some(1.0),
                total_indians: None,
                total_others: None,
            }),
        }
    }

    fn unmatched(key: &str) -> JoinedRecord {
        JoinedRecord {
            subzone: SubzoneKey::from_text(key).unwrap(),
            geometry: MultiPolygon::new(Vec::new()),
            population: None,
        }
    }

    fn refs(records: &[JoinedRecord]) -> Vec<&JoinedRecord> {
        records.iter().collect()
    }

    #[test]
    fn north_south_scenario() {
        let records = vec![
            record("A", Some("North"), Some(100.0)),
            record("B", Some("North"), Some(200.0)),
            record("C", Some("South"), None),
        ];
        let nationwide = total_population(&refs(&records));
        assert_eq!(nationwide, 300.0);

        let north = filter_region(&records, &RegionSelection::Region("North".into()));
        let south = filter_region(&records, &RegionSelection::Region("South".into()));
        assert_eq!(total_population(&north), 300.0);
        assert_eq!(total_population(&south), 0.0);
        assert_eq!(
            population_percentage(300.0, nationwide, &RegionSelection::Region("North".into())),
            Percentage::Value(100.0)
        );
        assert_eq!(
            population_percentage(300.0, nationwide, &RegionSelection::Region("North".into()))
                .to_string(),
            "100.00%"
        );
        assert_eq!(
            population_percentage(0.0, nationwide, &RegionSelection::Region("South".into())),
            Percentage::NotApplicable
        );
    }

    #[test]
    fn empty_selection_yields_zeroes() {
        let records = vec![record("A", Some("North"), Some(10.0))];
        let selection = RegionSelection::Region("Atlantis".into());
        let filtered = filter_region(&records, &selection);
        let result = aggregate(&filtered, 10.0, &selection, &ProcessingConfig::default());

        assert_eq!(result.total_population, 0.0);
        assert_eq!(result.district_count, 0);
        assert_eq!(result.subzone_count, 0);
        assert_eq!(result.population_percentage, Percentage::NotApplicable);
        assert_eq!(result.population_percentage.to_string(), "N/A");
        assert!(result.top_subzones.is_empty());
        assert!(result
            .breakdowns
            .iter()
            .all(|b| b.categories.iter().all(|c| c.total == 0.0)));
    }

    #[test]
    fn all_is_exactly_one_hundred_percent() {
        assert_eq!(
            population_percentage(42.0, 42.0, &RegionSelection::All),
            Percentage::Nationwide
        );
        assert_eq!(Percentage::Nationwide.to_string(), "100%");
        assert_eq!(Percentage::Value(100.0).to_string(), "100.00%");
        assert_eq!(Percentage::Value(12.3456).to_string(), "12.35%");
    }

    #[test]
    fn zero_nationwide_total_is_not_applicable() {
        assert_eq!(
            population_percentage(0.0, 0.0, &RegionSelection::All),
            Percentage::NotApplicable
        );
        assert_eq!(
            population_percentage(0.0, 0.0, &RegionSelection::Region("North".into())),
            Percentage::NotApplicable
        );
    }

    #[test]
    fn region_totals_partition_the_nationwide_total() {
        let records = vec![
            record("A", Some("North"), Some(10.0)),
            record("B", Some("East"), Some(20.5)),
            record("C", Some("North"), None),
            record("D", Some("West"), Some(7.0)),
            record("E", Some("East"), Some(1.5)),
        ];
        let all = total_population(&filter_region(&records, &RegionSelection::All));
        let by_region: f64 = regions(&records)
            .into_iter()
            .map(|r| total_population(&filter_region(&records, &RegionSelection::Region(r))))
            .sum();
        assert_eq!(all, 39.0);
        assert_eq!(by_region, all);
    }

    #[test]
    fn counts_skip_null_regions() {
        let records = vec![
            record("A", Some("North"), Some(1.0)),
            record("B", Some("North"), Some(1.0)),
            record("C", None, Some(1.0)),
            unmatched("D"),
        ];
        let all = refs(&records);
        assert_eq!(district_count(&all), 1);
        assert_eq!(subzone_count(&all), 4);
        assert_eq!(total_population(&all), 3.0);
    }

    #[test]
    fn ranking_is_descending_with_stable_ties() {
        let records = vec![
            record("A", Some("North"), Some(5.0)),
            unmatched("B"),
            record("C", Some("North"), Some(9.0)),
            record("D", Some("North"), Some(5.0)),
            record("E", Some("North"), Some(1.0)),
        ];
        let ranking = top_n_ranking(&refs(&records), 10);

        let keys: Vec<_> = ranking.iter().map(|r| r.subzone.as_str()).collect();
        assert_eq!(keys, vec!["C", "A", "D", "E", "B"]);
        let ranks: Vec<_> = ranking.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4, 5]);
        assert_eq!(ranking[4].subzone_total, None);
    }

    #[test]
    fn ranking_truncates_to_n() {
        let records: Vec<_> = (0..15)
            .map(|i| record(&format!("S{i}"), Some("North"), Some(i as f64)))
            .collect();
        let ranking = top_n_ranking(&refs(&records), 10);
        assert_eq!(ranking.len(), 10);
        assert_eq!(ranking[0].subzone.as_str(), "S14");
        assert_eq!(ranking[9].subzone.as_str(), "S5");
        assert!(ranking
            .windows(2)
            .all(|w| w[0].subzone_total >= w[1].subzone_total));
    }

    #[test]
    fn breakdown_preserves_field_order() {
        let records = vec![
            record("A", Some("North"), Some(10.0)),
            record("B", Some("North"), None),
        ];
        let sums = category_breakdown(
            &refs(&records),
            &[Field::TotalMalays, Field::TotalMales, Field::TotalChinese],
        );
        assert_eq!(
            sums,
            vec![
                (Field::TotalMalays, 2.0),
                (Field::TotalMales, 5.0),
                (Field::TotalChinese, 0.0),
            ]
        );
    }

    #[test]
    fn aggregate_reports_configured_breakdowns() {
        let records = vec![
            record("A", Some("North"), Some(10.0)),
            record("B", Some("South"), Some(30.0)),
        ];
        let selection = RegionSelection::Region("South".into());
        let filtered = filter_region(&records, &selection);
        let result = aggregate(&filtered, 40.0, &selection, &ProcessingConfig::default());

        assert_eq!(result.region, "South");
        assert_eq!(result.total_population, 30.0);
        assert_eq!(result.district_count, 1);
        assert_eq!(result.population_percentage, Percentage::Value(75.0));

        let gender = result.breakdowns.iter().find(|b| b.name == "Gender").unwrap();
        assert_eq!(gender.categories[0].name, "Males");
        assert_eq!(gender.categories[0].total, 15.0);
        assert_eq!(gender.categories[1].color, "#4A8123");
    }

    #[test]
    fn percentage_serializes_sentinel_as_text() {
        assert_eq!(
            serde_json::to_value(Percentage::NotApplicable).unwrap(),
            serde_json::json!("N/A")
        );
        assert_eq!(
            serde_json::to_value(Percentage::Value(12.5)).unwrap(),
            serde_json::json!(12.5)
        );
        assert_eq!(
            serde_json::to_value(Percentage::Nationwide).unwrap(),
            serde_json::json!(100.0)
        );
    }
}
